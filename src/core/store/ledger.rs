use anyhow::{Result, bail};
use rusqlite::{Connection, OptionalExtension, params};

use super::Store;

/// Add `amount` to `user_id`, creating the wallet if needed. Runs on whatever
/// connection or transaction the caller holds.
pub(crate) fn credit_on(db: &Connection, user_id: u64, amount: i64) -> Result<()> {
    if amount <= 0 {
        bail!("credit amount must be positive, got {}", amount);
    }
    db.execute(
        "INSERT INTO users (user_id, balance) VALUES (?1, ?2)
         ON CONFLICT(user_id) DO UPDATE SET balance = balance + excluded.balance",
        params![user_id, amount],
    )?;
    Ok(())
}

/// Single conditional statement, so two concurrent debits can never both
/// pass the balance check.
pub(crate) fn debit_on(db: &Connection, user_id: u64, amount: i64) -> Result<bool> {
    if amount <= 0 {
        bail!("debit amount must be positive, got {}", amount);
    }
    let changed = db.execute(
        "UPDATE users SET balance = balance - ?1 WHERE user_id = ?2 AND balance >= ?1",
        params![amount, user_id],
    )?;
    Ok(changed == 1)
}

impl Store {
    pub async fn balance(&self, user_id: u64) -> Result<i64> {
        let db = self.db.lock().await;
        let balance = db
            .query_row(
                "SELECT balance FROM users WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(balance.unwrap_or(0))
    }

    pub async fn credit(&self, user_id: u64, amount: i64) -> Result<()> {
        let db = self.db.lock().await;
        credit_on(&db, user_id, amount)
    }

    /// Returns false, leaving the balance untouched, when it is below `amount`.
    pub async fn debit_if_sufficient(&self, user_id: u64, amount: i64) -> Result<bool> {
        let db = self.db.lock().await;
        debit_on(&db, user_id, amount)
    }
}
