use anyhow::Result;
use rusqlite::{OptionalExtension, Row, params};

use super::ledger::credit_on;
use super::types::{Dare, DareStatus, Payout};
use super::{Store, bad_enum, parse_handle};
use crate::core::notify::MessageHandle;

fn dare_from_row(row: &Row<'_>) -> rusqlite::Result<Dare> {
    let status: String = row.get(5)?;
    Ok(Dare {
        id: row.get(0)?,
        challenger_id: row.get(1)?,
        victim_id: row.get(2)?,
        task: row.get(3)?,
        reward: row.get(4)?,
        status: DareStatus::from_status(&status).ok_or_else(|| bad_enum(5, &status))?,
        message: parse_handle(row.get(6)?),
    })
}

impl Store {
    pub async fn create_dare(
        &self,
        id: &str,
        challenger_id: u64,
        task: &str,
        reward: i64,
    ) -> Result<()> {
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO dares (dare_id, challenger_id, task, reward, status) VALUES (?1, ?2, ?3, ?4, 'PENDING')",
            params![id, challenger_id, task, reward],
        )?;
        Ok(())
    }

    pub async fn get_dare(&self, id: &str) -> Result<Option<Dare>> {
        let db = self.db.lock().await;
        let dare = db
            .query_row(
                "SELECT dare_id, challenger_id, victim_id, task, reward, status, message
                 FROM dares WHERE dare_id = ?1",
                params![id],
                dare_from_row,
            )
            .optional()?;
        Ok(dare)
    }

    pub async fn set_dare_message(&self, id: &str, handle: MessageHandle) -> Result<()> {
        let db = self.db.lock().await;
        db.execute(
            "UPDATE dares SET message = ?1 WHERE dare_id = ?2",
            params![handle.to_string(), id],
        )?;
        Ok(())
    }

    /// Conditional status change plus optional payment in one transaction.
    /// False when the dare already left `from` or `held_by` is no longer
    /// its victim.
    pub async fn apply_dare(
        &self,
        id: &str,
        from: DareStatus,
        held_by: Option<u64>,
        to: DareStatus,
        victim_id: Option<u64>,
        payout: Option<Payout>,
    ) -> Result<bool> {
        let mut db = self.db.lock().await;
        let tx = db.transaction()?;
        let changed = tx.execute(
            "UPDATE dares SET status = ?1, victim_id = ?2
             WHERE dare_id = ?3 AND status = ?4 AND victim_id IS ?5",
            params![to.as_str(), victim_id, id, from.as_str(), held_by],
        )?;
        if changed == 0 {
            return Ok(false);
        }
        if let Some(p) = payout {
            credit_on(&tx, p.user_id, p.amount)?;
        }
        tx.commit()?;
        Ok(true)
    }
}
