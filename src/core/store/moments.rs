use anyhow::Result;
use rusqlite::{OptionalExtension, params};

use super::ledger::credit_on;
use super::types::{Moment, MomentSource};
use super::{Store, bad_enum};
use crate::core::notify::AttachmentRef;

impl Store {
    /// Record a moment and pay its reward together.
    pub async fn add_moment(
        &self,
        user_id: u64,
        caption: &str,
        attachment: AttachmentRef,
        timestamp: &str,
        source: MomentSource,
        reward: i64,
    ) -> Result<i64> {
        let mut db = self.db.lock().await;
        let tx = db.transaction()?;
        tx.execute(
            "INSERT INTO moments (user_id, caption, attachment, timestamp, source) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![user_id, caption, attachment.to_string(), timestamp, source.as_str()],
        )?;
        let id = tx.last_insert_rowid();
        if reward > 0 {
            credit_on(&tx, user_id, reward)?;
        }
        tx.commit()?;
        Ok(id)
    }

    pub async fn random_moment(&self) -> Result<Option<Moment>> {
        let db = self.db.lock().await;
        let moment = db
            .query_row(
                "SELECT moment_id, user_id, caption, attachment, timestamp, source
                 FROM moments ORDER BY RANDOM() LIMIT 1",
                [],
                |row| {
                    let attachment: Option<String> = row.get(3)?;
                    let source: String = row.get(5)?;
                    Ok(Moment {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        caption: row.get(2)?,
                        attachment: attachment.and_then(|a| a.parse().ok()),
                        timestamp: row.get(4)?,
                        source: MomentSource::from_source(&source)
                            .ok_or_else(|| bad_enum(5, &source))?,
                    })
                },
            )
            .optional()?;
        Ok(moment)
    }
}
