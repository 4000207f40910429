use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::render;
use super::{Engine, Reply, WorkflowResult};
use crate::core::config::Target;
use crate::core::notify::MessageHandle;
use crate::core::scheduler::{JobAction, action};

const START_MENU_SETTING: &str = "start_menu";

impl Engine {
    fn job<F, Fut>(self: &Arc<Self>, f: F) -> JobAction
    where
        F: Fn(Arc<Engine>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let engine = Arc::clone(self);
        action(move || f(Arc::clone(&engine)))
    }

    /// Register every recurring job.
    pub async fn register_jobs(self: &Arc<Self>) -> anyhow::Result<()> {
        let s = &self.config.schedule;
        let home = self.config.home_tz;

        self.scheduler
            .schedule_cron(
                "daily-question",
                s.question_hour,
                0,
                home,
                self.job(|e| async move { e.post_daily_question().await.map(|_| ()) }),
            )
            .await?;
        self.scheduler
            .schedule_cron(
                "random-dare",
                s.dare_hour,
                0,
                home,
                self.job(|e| async move { e.random_dare().await }),
            )
            .await?;
        self.scheduler
            .schedule_cron(
                "snap-planner",
                s.snap_planner_hour,
                0,
                chrono_tz::UTC,
                self.job(|e| async move { e.plan_today().await.map(|_| ()) }),
            )
            .await?;
        self.scheduler
            .schedule_interval(
                "backup",
                Duration::from_secs(s.backup_hours * 3600),
                home,
                self.job(|e| async move { e.run_backup().await.map(|_| ()) }),
            )
            .await?;
        self.scheduler
            .schedule_interval(
                "dashboard",
                Duration::from_secs(s.dashboard_secs),
                home,
                self.job(|e| async move { e.update_dashboard().await.map(|_| ()) }),
            )
            .await?;
        info!("[engine] Recurring jobs registered");
        Ok(())
    }

    /// Everything that happens once the chat connection is up. Only job
    /// registration and capsule recovery are fatal.
    pub async fn start(self: &Arc<Self>) -> anyhow::Result<()> {
        self.register_jobs().await?;
        self.recover_capsules().await?;
        if let Err(e) = self.plan_today().await {
            warn!("[engine] Startup snap planning failed: {:#}", e);
        }
        if let Err(e) = self.post_start_menu().await {
            warn!("[engine] Could not post the manual: {}", e);
        }
        if let Err(e) = self.update_dashboard().await {
            warn!("[engine] Could not post the dashboard: {:#}", e);
        }
        self.announce(Target::DebugLogs, render::systems_nominal())
            .await;
        info!("[engine] Systems nominal");
        Ok(())
    }

    pub async fn post_start_menu(&self) -> WorkflowResult<MessageHandle> {
        if let Some(previous) = self.store.get_setting(START_MENU_SETTING).await?
            && let Ok(handle) = previous.parse::<MessageHandle>()
            && let Err(e) = self.notifier.delete(handle).await
        {
            warn!("[engine] Could not remove old manual {}: {}", handle, e);
        }
        let handle = self.post_to(Target::StartHere, render::start_menu()).await?;
        self.store
            .set_setting(START_MENU_SETTING, &handle.to_string())
            .await?;
        Ok(handle)
    }

    /// `!update`: refresh the manual and the dashboard on demand.
    pub async fn refresh_boards(&self) -> WorkflowResult<Reply> {
        self.post_start_menu().await?;
        self.update_dashboard().await?;
        Ok(Reply::React("🔄".to_string()))
    }
}
