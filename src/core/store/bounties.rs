use anyhow::{Result, bail};
use rusqlite::{OptionalExtension, Row, params};

use super::ledger::{credit_on, debit_on};
use super::types::{Bounty, BountyStatus, Payout};
use super::{Store, bad_enum, parse_handle};
use crate::core::notify::MessageHandle;

fn bounty_from_row(row: &Row<'_>) -> rusqlite::Result<Bounty> {
    let status: String = row.get(5)?;
    Ok(Bounty {
        id: row.get(0)?,
        description: row.get(1)?,
        reward: row.get(2)?,
        employer_id: row.get(3)?,
        worker_id: row.get(4)?,
        status: BountyStatus::from_status(&status).ok_or_else(|| bad_enum(5, &status))?,
        message: parse_handle(row.get(6)?),
    })
}

impl Store {
    /// Escrow `reward` from the employer and open the bounty. `None` when the
    /// employer cannot cover it; nothing is written in that case.
    pub async fn open_bounty(
        &self,
        employer_id: u64,
        description: &str,
        reward: i64,
    ) -> Result<Option<i64>> {
        if reward <= 0 {
            bail!("bounty reward must be positive");
        }
        let mut db = self.db.lock().await;
        let tx = db.transaction()?;
        if !debit_on(&tx, employer_id, reward)? {
            return Ok(None);
        }
        tx.execute(
            "INSERT INTO bounties (description, reward, employer_id, status) VALUES (?1, ?2, ?3, 'OPEN')",
            params![description, reward, employer_id],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(Some(id))
    }

    pub async fn get_bounty(&self, id: i64) -> Result<Option<Bounty>> {
        let db = self.db.lock().await;
        let bounty = db
            .query_row(
                "SELECT id, description, reward, employer_id, worker_id, status, message
                 FROM bounties WHERE id = ?1",
                params![id],
                bounty_from_row,
            )
            .optional()?;
        Ok(bounty)
    }

    pub async fn set_bounty_message(&self, id: i64, handle: MessageHandle) -> Result<()> {
        let db = self.db.lock().await;
        db.execute(
            "UPDATE bounties SET message = ?1 WHERE id = ?2",
            params![handle.to_string(), id],
        )?;
        Ok(())
    }

    /// Move a bounty from `from` (held by `held_by`) to `to` and release
    /// `payout`, atomically. Returns false without touching money when the
    /// row is no longer in `from` or changed hands, which is how duplicate
    /// and stale clicks are absorbed.
    pub async fn apply_bounty(
        &self,
        id: i64,
        from: BountyStatus,
        held_by: Option<u64>,
        to: BountyStatus,
        worker_id: Option<u64>,
        payout: Option<Payout>,
    ) -> Result<bool> {
        let mut db = self.db.lock().await;
        let tx = db.transaction()?;
        let changed = tx.execute(
            "UPDATE bounties SET status = ?1, worker_id = ?2
             WHERE id = ?3 AND status = ?4 AND worker_id IS ?5",
            params![to.as_str(), worker_id, id, from.as_str(), held_by],
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
