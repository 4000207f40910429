use anyhow::Result;
use rusqlite::{OptionalExtension, params};

use super::Store;
use super::types::Poll;

impl Store {
    pub async fn save_poll(&self, poll: &Poll) -> Result<()> {
        let options_json = serde_json::to_string(&poll.options)?;
        let db = self.db.lock().await;
        db.execute(
            "INSERT OR REPLACE INTO polls (id, question, options_json) VALUES (?1, ?2, ?3)",
            params![poll.id, poll.question, options_json],
        )?;
        Ok(())
    }

    pub async fn get_poll(&self, id: &str) -> Result<Option<Poll>> {
        let row: Option<(String, String, String)> = {
            let db = self.db.lock().await;
            db.query_row(
                "SELECT id, question, options_json FROM polls WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?
        };
        match row {
            Some((id, question, options_json)) => Ok(Some(Poll {
                id,
                question,
                options: serde_json::from_str(&options_json)?,
            })),
            None => Ok(None),
        }
    }
}
