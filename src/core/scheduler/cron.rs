use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{info, warn};

use super::{
    JobAction, JobHandle, ScheduledJobInfo, Scheduler, Trigger, cron_expression, next_cron_fire,
    spawn_logged,
};
use crate::core::clock::Clock;

type JobRegistry = Arc<Mutex<HashMap<JobHandle, ScheduledJobInfo>>>;

/// One-shot jobs tick at whole seconds: the job becomes due at the wall
/// second `now` falls in plus the delay's whole seconds. Target the first
/// whole second at or after `fire_at` so a job never runs early and jobs a
/// second apart keep their order. Jobs due in the same second run in no
/// fixed order.
pub(super) fn whole_second_delay(now: DateTime<Utc>, fire_at: DateTime<Utc>) -> Duration {
    let due = fire_at.timestamp() + i64::from(fire_at.timestamp_subsec_nanos() > 0);
    Duration::from_secs(u64::try_from(due - now.timestamp()).unwrap_or(0))
}

/// [`Scheduler`] backed by `tokio-cron-scheduler`, with a side registry so
/// jobs can be listed and one-shots forget themselves after firing.
pub struct CronScheduler {
    inner: JobScheduler,
    registry: JobRegistry,
    clock: Arc<dyn Clock>,
}

impl CronScheduler {
    pub fn new(inner: JobScheduler, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner,
            registry: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    async fn register(&self, job: Job, info: ScheduledJobInfo) -> Result<JobHandle> {
        let handle = info.handle;
        // Registered before `add` so a zero-delay fire always finds its entry.
        self.registry.lock().await.insert(handle, info);
        if let Err(e) = self.inner.add(job).await {
            self.registry.lock().await.remove(&handle);
            return Err(e.into());
        }
        Ok(handle)
    }
}

#[async_trait]
impl Scheduler for CronScheduler {
    async fn schedule_once(
        &self,
        label: &str,
        fire_at: DateTime<Tz>,
        action: JobAction,
    ) -> Result<JobHandle> {
        let fire_at = fire_at.with_timezone(&Utc);
        let delay = whole_second_delay(self.clock.now(), fire_at);

        let registry = self.registry.clone();
        let job_label = label.to_string();
        let job = Job::new_one_shot_async(delay, move |uuid, _l| {
            let registry = registry.clone();
            let action = action.clone();
            let label = job_label.clone();
            Box::pin(async move {
                registry.lock().await.remove(&JobHandle(uuid));
                spawn_logged(label, action);
            })
        })?;

        let handle = JobHandle(job.guid());
        info!(
            "[scheduler] '{}' scheduled once at {} (in {}s)",
            label,
            fire_at,
            delay.as_secs()
        );
        self.register(
            job,
            ScheduledJobInfo {
                handle,
                label: label.to_string(),
                trigger: Trigger::Once { fire_at },
                tz: chrono_tz::UTC,
                next_fire: fire_at,
            },
        )
        .await
    }

    async fn schedule_cron(
        &self,
        label: &str,
        hour: u32,
        minute: u32,
        tz: Tz,
        action: JobAction,
    ) -> Result<JobHandle> {
        let expr = cron_expression(hour, minute)?;

        let registry = self.registry.clone();
        let job_label = label.to_string();
        let job = Job::new_async_tz(expr.as_str(), tz, move |uuid, _l| {
            let registry = registry.clone();
            let action = action.clone();
            let label = job_label.clone();
            Box::pin(async move {
                if let Some(info) = registry.lock().await.get_mut(&JobHandle(uuid)) {
                    info.next_fire = next_cron_fire(Utc::now(), hour, minute, tz);
                }
                spawn_logged(label, action);
            })
        })?;

        let handle = JobHandle(job.guid());
        info!(
            "[scheduler] '{}' scheduled daily at {:02}:{:02} {}",
            label, hour, minute, tz
        );
        self.register(
            job,
            ScheduledJobInfo {
                handle,
                label: label.to_string(),
                trigger: Trigger::Cron { hour, minute },
                tz,
                next_fire: next_cron_fire(self.clock.now(), hour, minute, tz),
            },
        )
        .await
    }

    async fn schedule_interval(
        &self,
        label: &str,
        period: Duration,
        tz: Tz,
        action: JobAction,
    ) -> Result<JobHandle> {
        if period.is_zero() {
            bail!("interval for '{}' must be non-zero", label);
        }
        let step = chrono::Duration::from_std(period)?;

        let registry = self.registry.clone();
        let job_label = label.to_string();
        let job = Job::new_repeated_async(period, move |uuid, _l| {
            let registry = registry.clone();
            let action = action.clone();
            let label = job_label.clone();
            Box::pin(async move {
                if let Some(info) = registry.lock().await.get_mut(&JobHandle(uuid)) {
                    info.next_fire = Utc::now() + step;
                }
                spawn_logged(label, action);
            })
        })?;

        let handle = JobHandle(job.guid());
        info!(
            "[scheduler] '{}' scheduled every {}s",
            label,
            period.as_secs()
        );
        self.register(
            job,
            ScheduledJobInfo {
                handle,
                label: label.to_string(),
                trigger: Trigger::Interval { period },
                tz,
                next_fire: self.clock.now() + step,
            },
        )
        .await
    }

    async fn cancel(&self, handle: JobHandle) -> Result<bool> {
        let known = self.registry.lock().await.remove(&handle).is_some();
        if !known {
            return Ok(false);
        }
        if let Err(e) = self.inner.remove(&handle.0).await {
            warn!("[scheduler] failed to remove job {}: {}", handle, e);
            return Err(e.into());
        }
        info!("[scheduler] cancelled job {}", handle);
        Ok(true)
    }

    async fn pending(&self) -> Vec<ScheduledJobInfo> {
        let mut jobs: Vec<ScheduledJobInfo> =
            self.registry.lock().await.values().cloned().collect();
        jobs.sort_by_key(|j| j.next_fire);
        jobs
    }
}
