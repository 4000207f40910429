use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::{
    JobAction, JobHandle, ScheduledJobInfo, Scheduler, Trigger, cron_expression, next_cron_fire,
    run_logged,
};
use crate::core::clock::{Clock, ManualClock};

struct ManualJob {
    info: ScheduledJobInfo,
    action: JobAction,
    seq: u64,
}

/// Deterministic [`Scheduler`] for tests: nothing fires until `advance` moves
/// the shared [`ManualClock`], and due jobs then run inline in fire order.
pub struct ManualScheduler {
    clock: ManualClock,
    jobs: Mutex<Vec<ManualJob>>,
    seq: AtomicU64,
}

impl ManualScheduler {
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            jobs: Mutex::new(Vec::new()),
            seq: AtomicU64::new(0),
        }
    }

    fn push(&self, info: ScheduledJobInfo, action: JobAction) -> JobHandle {
        let handle = info.handle;
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut jobs) = self.jobs.lock() {
            jobs.push(ManualJob { info, action, seq });
        }
        handle
    }

    /// Take the earliest job due at or before `until`, re-arming it when
    /// recurring. Returns the fire instant alongside the job's label and action.
    fn take_due(&self, until: DateTime<Utc>) -> Option<(DateTime<Utc>, String, JobAction)> {
        let mut jobs = self.jobs.lock().ok()?;
        let idx = jobs
            .iter()
            .enumerate()
            .filter(|(_, j)| j.info.next_fire <= until)
            .min_by_key(|(_, j)| (j.info.next_fire, j.seq))
            .map(|(i, _)| i)?;

        let fire_at = jobs[idx].info.next_fire;
        let label = jobs[idx].info.label.clone();
        let action = jobs[idx].action.clone();
        match jobs[idx].info.trigger.clone() {
            Trigger::Once { .. } => {
                jobs.remove(idx);
            }
            Trigger::Cron { hour, minute } => {
                let tz = jobs[idx].info.tz;
                jobs[idx].info.next_fire = next_cron_fire(fire_at, hour, minute, tz);
            }
            Trigger::Interval { period } => {
                let step = chrono::Duration::from_std(period).unwrap_or(chrono::Duration::zero());
                jobs[idx].info.next_fire = fire_at + step;
            }
        }
        Some((fire_at, label, action))
    }

    /// Move time forward by `by`, firing everything that comes due on the way.
    /// Jobs scheduled by a firing job are picked up in the same pass.
    pub async fn advance(&self, by: chrono::Duration) -> usize {
        let target = self.clock.now() + by;
        let mut fired = 0;
        while let Some((fire_at, label, action)) = self.take_due(target) {
            if fire_at > self.clock.now() {
                self.clock.set(fire_at);
            }
            run_logged(&label, &action).await;
            fired += 1;
        }
        self.clock.set(target);
        fired
    }

    /// Fire whatever is already due without moving the clock.
    pub async fn run_due(&self) -> usize {
        self.advance(chrono::Duration::zero()).await
    }
}

#[async_trait]
impl Scheduler for ManualScheduler {
    async fn schedule_once(
        &self,
        label: &str,
        fire_at: DateTime<Tz>,
        action: JobAction,
    ) -> Result<JobHandle> {
        let fire_at = fire_at.with_timezone(&Utc);
        Ok(self.push(
            ScheduledJobInfo {
                handle: JobHandle(uuid::Uuid::new_v4()),
                label: label.to_string(),
                trigger: Trigger::Once { fire_at },
                tz: chrono_tz::UTC,
                next_fire: fire_at,
            },
            action,
        ))
    }

    async fn schedule_cron(
        &self,
        label: &str,
        hour: u32,
        minute: u32,
        tz: Tz,
        action: JobAction,
    ) -> Result<JobHandle> {
        cron_expression(hour, minute)?;
        Ok(self.push(
            ScheduledJobInfo {
                handle: JobHandle(uuid::Uuid::new_v4()),
                label: label.to_string(),
                trigger: Trigger::Cron { hour, minute },
                tz,
                next_fire: next_cron_fire(self.clock.now(), hour, minute, tz),
            },
            action,
        ))
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
        Ok(self.push(
            ScheduledJobInfo {
                handle: JobHandle(uuid::Uuid::new_v4()),
                label: label.to_string(),
                trigger: Trigger::Interval { period },
                tz,
                next_fire: self.clock.now() + step,
            },
            action,
        ))
    }

    async fn cancel(&self, handle: JobHandle) -> Result<bool> {
        let mut jobs = match self.jobs.lock() {
            Ok(jobs) => jobs,
            Err(_) => bail!("manual scheduler poisoned"),
        };
        let before = jobs.len();
        jobs.retain(|j| j.info.handle != handle);
        Ok(jobs.len() != before)
    }

    async fn pending(&self) -> Vec<ScheduledJobInfo> {
        let mut out: Vec<(u64, ScheduledJobInfo)> = match self.jobs.lock() {
            Ok(jobs) => jobs.iter().map(|j| (j.seq, j.info.clone())).collect(),
            Err(_) => Vec::new(),
        };
        out.sort_by_key(|(seq, info)| (info.next_fire, *seq));
        out.into_iter().map(|(_, info)| info).collect()
    }
}
