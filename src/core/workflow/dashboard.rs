use chrono::NaiveDate;
use tracing::{info, warn};

use super::render::{self, DashboardView};
use super::Engine;
use crate::core::config::Target;
use crate::core::notify::MessageHandle;

const DASHBOARD_SETTING: &str = "dashboard_message";

/// Whole days from `since` to `today`, never negative.
pub fn days_since(since: NaiveDate, today: NaiveDate) -> i64 {
    (today - since).num_days().max(0)
}

pub fn question_status(answers_today: i64) -> &'static str {
    match answers_today {
        0 => "⏳ Nobody yet",
        1 => "✍️ 1 of 2 answered",
        _ => "✅ Both answered",
    }
}

impl Engine {
    pub async fn dashboard_view(&self) -> anyhow::Result<DashboardView> {
        let now = self.now();
        let home = self.home_now();
        let today = home.date_naive();
        let stats = self
            .store
            .dashboard_stats(&today.format("%Y-%m-%d").to_string())
            .await?;
        let clocks = self
            .config
            .players
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    now.with_timezone(&p.tz).format("%H:%M · %a").to_string(),
                )
            })
            .collect();
        Ok(DashboardView {
            clocks,
            days_together: days_since(self.config.dates.relationship_start, today),
            days_apart: days_since(self.config.dates.last_seen, today),
            stats,
            question_status: question_status(stats.answers_today),
            updated: home.format("%H:%M").to_string(),
        })
    }

    /// Edit the dashboard in place, or post it when there is nothing to edit.
    pub async fn update_dashboard(&self) -> anyhow::Result<MessageHandle> {
        let message = render::dashboard(&self.dashboard_view().await?);
        if let Some(raw) = self.store.get_setting(DASHBOARD_SETTING).await?
            && let Ok(handle) = raw.parse::<MessageHandle>()
        {
            match self.notifier.edit(handle, message.clone()).await {
                Ok(()) => return Ok(handle),
                Err(e) => warn!("[dashboard] Edit failed, reposting: {}", e),
            }
        }
        let handle = self.post_to(Target::LiveStats, message).await?;
        self.store
            .set_setting(DASHBOARD_SETTING, &handle.to_string())
            .await?;
        info!("[dashboard] Posted new dashboard {}", handle);
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_counts_clamp_at_zero() {
        let a = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(days_since(a, b), 60);
        assert_eq!(days_since(b, a), 0);
    }

    #[test]
    fn question_status_by_count() {
        assert!(question_status(0).contains("Nobody"));
        assert!(question_status(1).contains("1 of 2"));
        assert!(question_status(2).contains("Both"));
    }
}
