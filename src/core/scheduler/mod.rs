mod cron;
#[cfg(test)]
mod manual;

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

pub use cron::CronScheduler;
#[cfg(test)]
pub use manual::ManualScheduler;

pub type JobFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// The callable a job runs on every fire. Cloned into the runtime for each
/// invocation, so captured state must be `Arc`-shared.
pub type JobAction = Arc<dyn Fn() -> JobFuture + Send + Sync>;

/// Wrap an async closure into a [`JobAction`].
pub fn action<F, Fut>(f: F) -> JobAction
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move || Box::pin(f()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobHandle(pub uuid::Uuid);

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    Once { fire_at: DateTime<Utc> },
    Cron { hour: u32, minute: u32 },
    Interval { period: Duration },
}

#[derive(Debug, Clone)]
pub struct ScheduledJobInfo {
    pub handle: JobHandle,
    pub label: String,
    pub trigger: Trigger,
    pub tz: Tz,
    pub next_fire: DateTime<Utc>,
}

/// Deferred and recurring work, bound to wall-clock time.
///
/// Implementations must never block on a firing job and must keep firing
/// other jobs when one fails. Nothing registered here outlives the process;
/// durable workflows re-register on startup.
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Run `action` once at `fire_at`. Past instants fire as soon as possible.
    async fn schedule_once(
        &self,
        label: &str,
        fire_at: DateTime<Tz>,
        action: JobAction,
    ) -> Result<JobHandle>;

    /// Run `action` every day at `hour:minute` local to `tz`.
    async fn schedule_cron(
        &self,
        label: &str,
        hour: u32,
        minute: u32,
        tz: Tz,
        action: JobAction,
    ) -> Result<JobHandle>;

    /// Run `action` every `period`, first fire one period from now.
    /// `tz` only tags the job for listings.
    async fn schedule_interval(
        &self,
        label: &str,
        period: Duration,
        tz: Tz,
        action: JobAction,
    ) -> Result<JobHandle>;

    /// Returns false when the handle is unknown or already fired.
    async fn cancel(&self, handle: JobHandle) -> Result<bool>;

    /// Registered jobs ordered by next fire time.
    async fn pending(&self) -> Vec<ScheduledJobInfo>;
}

/// Six-field cron expression (seconds first) as `tokio-cron-scheduler` expects.
pub fn cron_expression(hour: u32, minute: u32) -> Result<String> {
    if hour > 23 || minute > 59 {
        bail!("invalid daily time {:02}:{:02}", hour, minute);
    }
    Ok(format!("0 {} {} * * *", minute, hour))
}

/// First instant strictly after `after` that reads `hour:minute` on a wall
/// clock in `tz`. Days where that local time does not exist (DST gap) are
/// skipped.
pub fn next_cron_fire(after: DateTime<Utc>, hour: u32, minute: u32, tz: Tz) -> DateTime<Utc> {
    let local = after.with_timezone(&tz);
    let mut date = local.date_naive();
    for _ in 0..4 {
        if let Some(naive) = date.and_hms_opt(hour, minute, 0)
            && let Some(candidate) = tz.from_local_datetime(&naive).earliest()
        {
            let candidate = candidate.with_timezone(&Utc);
            if candidate > after {
                return candidate;
            }
        }
        date = match date.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }
    after + chrono::Duration::days(1)
}

/// Run one fire of a job, logging instead of propagating failure.
pub(crate) async fn run_logged(label: &str, action: &JobAction) {
    match action().await {
        Ok(()) => info!("[scheduler] job '{}' completed", label),
        Err(e) => error!("[scheduler] job '{}' failed: {:#}", label, e),
    }
}

/// Detach a fire onto the runtime so a slow or panicking job cannot hold up
/// the scheduler loop.
pub(crate) fn spawn_logged(label: String, action: JobAction) {
    tokio::spawn(async move {
        run_logged(&label, &action).await;
    });
}
