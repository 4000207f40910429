use anyhow::Result;
use rusqlite::params;

use super::Store;
use super::types::DashboardStats;

impl Store {
    /// Counters for the live dashboard. `today` is `YYYY-MM-DD` in the home
    /// zone and matches the prefix of that day's round ids.
    pub async fn dashboard_stats(&self, today: &str) -> Result<DashboardStats> {
        let db = self.db.lock().await;
        let active_dares = db.query_row(
            "SELECT COUNT(*) FROM dares WHERE status IN ('IN_PROGRESS', 'WAITING_APPROVAL')",
            [],
            |row| row.get(0),
        )?;
        let open_bounties = db.query_row(
            "SELECT COUNT(*) FROM bounties WHERE status = 'OPEN'",
            [],
            |row| row.get(0),
        )?;
        let pending_capsules = db.query_row(
            "SELECT COUNT(*) FROM audio_capsules WHERE status = 'PENDING'",
            [],
            |row| row.get(0),
        )?;
        let answers_today = db.query_row(
            "SELECT COUNT(DISTINCT user_id) FROM answers WHERE question_id LIKE ?1",
            params![format!("{}%", today)],
            |row| row.get(0),
        )?;
        Ok(DashboardStats {
            active_dares,
            open_bounties,
            pending_capsules,
            answers_today,
        })
    }
}
