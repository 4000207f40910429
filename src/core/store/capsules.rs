use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};

use super::types::{Capsule, CapsuleStatus};
use super::{Store, bad_enum, parse_ts, ts};
use crate::core::notify::AttachmentRef;

const CAPSULE_COLUMNS: &str =
    "id, sender_id, attachment, label, deliver_at, status, created_at";

fn capsule_from_row(row: &Row<'_>) -> rusqlite::Result<Capsule> {
    let attachment: String = row.get(2)?;
    let deliver_at: Option<String> = row.get(4)?;
    let status: String = row.get(5)?;
    let created_at: String = row.get(6)?;
    Ok(Capsule {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        attachment: attachment.parse().map_err(|_| bad_enum(2, &attachment))?,
        label: row.get(3)?,
        deliver_at: deliver_at.as_deref().map(parse_ts).transpose()?,
        status: CapsuleStatus::from_status(&status).ok_or_else(|| bad_enum(5, &status))?,
        created_at: parse_ts(&created_at)?,
    })
}

impl Store {
    /// Store a capsule. `None` when the attachment is already stored; a
    /// voice note becomes at most one capsule.
    pub async fn add_capsule(
        &self,
        sender_id: u64,
        attachment: AttachmentRef,
        label: Option<&str>,
        deliver_at: Option<DateTime<Utc>>,
        status: CapsuleStatus,
        created_at: DateTime<Utc>,
    ) -> Result<Option<i64>> {
        let db = self.db.lock().await;
        let inserted = db.execute(
            "INSERT OR IGNORE INTO audio_capsules (sender_id, attachment, label, deliver_at, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                sender_id,
                attachment.to_string(),
                label,
                deliver_at.map(ts),
                status.as_str(),
                ts(created_at)
            ],
        )?;
        Ok((inserted == 1).then(|| db.last_insert_rowid()))
    }

    pub async fn get_capsule(&self, id: i64) -> Result<Option<Capsule>> {
        let db = self.db.lock().await;
        let capsule = db
            .query_row(
                &format!("SELECT {} FROM audio_capsules WHERE id = ?1", CAPSULE_COLUMNS),
                params![id],
                capsule_from_row,
            )
            .optional()?;
        Ok(capsule)
    }

    /// The capsule already filed for a backed-up recording, if any.
    pub async fn capsule_for_attachment(&self, attachment: AttachmentRef) -> Result<Option<Capsule>> {
        let db = self.db.lock().await;
        let capsule = db
            .query_row(
                &format!(
                    "SELECT {} FROM audio_capsules WHERE attachment = ?1 ORDER BY id ASC LIMIT 1",
                    CAPSULE_COLUMNS
                ),
                params![attachment.to_string()],
                capsule_from_row,
            )
            .optional()?;
        Ok(capsule)
    }

    /// Time-triggered capsules still waiting for delivery, for restart recovery.
    pub async fn list_pending_capsules(&self) -> Result<Vec<Capsule>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {} FROM audio_capsules WHERE status = 'PENDING' ORDER BY deliver_at ASC, id ASC",
            CAPSULE_COLUMNS
        ))?;
        let rows = stmt.query_map([], capsule_from_row)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Oldest undelivered capsule filed under `label`.
    pub async fn oldest_open_when(&self, label: &str) -> Result<Option<Capsule>> {
        let db = self.db.lock().await;
        let capsule = db
            .query_row(
                &format!(
                    "SELECT {} FROM audio_capsules WHERE label = ?1 AND status = 'OPEN_WHEN'
                     ORDER BY created_at ASC, id ASC LIMIT 1",
                    CAPSULE_COLUMNS
                ),
                params![label],
                capsule_from_row,
            )
            .optional()?;
        Ok(capsule)
    }

    /// Claim a capsule for delivery. Only the first caller sees `true`.
    pub async fn archive_capsule(&self, id: i64, from: CapsuleStatus) -> Result<bool> {
        let db = self.db.lock().await;
        let changed = db.execute(
            "UPDATE audio_capsules SET status = 'ARCHIVED' WHERE id = ?1 AND status = ?2",
            params![id, from.as_str()],
        )?;
        Ok(changed == 1)
    }

    /// Undo a claim whose delivery failed after the file was fetched.
    pub async fn restore_capsule(&self, id: i64, to: CapsuleStatus) -> Result<()> {
        let db = self.db.lock().await;
        db.execute(
            "UPDATE audio_capsules SET status = ?1 WHERE id = ?2 AND status = 'ARCHIVED'",
            params![to.as_str(), id],
        )?;
        Ok(())
    }

    /// Most recently created delivered capsules.
    pub async fn mixtape(&self, limit: usize) -> Result<Vec<Capsule>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {} FROM audio_capsules WHERE status = 'ARCHIVED'
             ORDER BY created_at DESC, id DESC LIMIT ?1",
            CAPSULE_COLUMNS
        ))?;
        let rows = stmt.query_map(params![limit as i64], capsule_from_row)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}
