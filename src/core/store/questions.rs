use anyhow::Result;
use rusqlite::{OptionalExtension, params};

use super::ledger::credit_on;
use super::types::{Answer, QuestionRound, SavedAnswer};
use super::{Store, parse_handle};
use crate::core::notify::MessageHandle;

impl Store {
    /// Insert a round. Returns false if a round with this id already exists.
    pub async fn create_round(&self, id: &str, question: &str) -> Result<bool> {
        let db = self.db.lock().await;
        let changed = db.execute(
            "INSERT OR IGNORE INTO question_rounds (id, question) VALUES (?1, ?2)",
            params![id, question],
        )?;
        Ok(changed == 1)
    }

    pub async fn get_round(&self, id: &str) -> Result<Option<QuestionRound>> {
        let db = self.db.lock().await;
        let round = db
            .query_row(
                "SELECT id, question, revealed, message FROM question_rounds WHERE id = ?1",
                params![id],
                |row| {
                    Ok(QuestionRound {
                        id: row.get(0)?,
                        question: row.get(1)?,
                        revealed: row.get::<_, i64>(2)? != 0,
                        message: parse_handle(row.get(3)?),
                    })
                },
            )
            .optional()?;
        Ok(round)
    }

    pub async fn set_round_message(&self, id: &str, handle: MessageHandle) -> Result<()> {
        let db = self.db.lock().await;
        db.execute(
            "UPDATE question_rounds SET message = ?1 WHERE id = ?2",
            params![handle.to_string(), id],
        )?;
        Ok(())
    }

    /// Upsert the user's answer. The reward is paid only when this is their
    /// first answer for the round, inside the same transaction.
    pub async fn save_answer(
        &self,
        round_id: &str,
        user_id: u64,
        username: &str,
        content: &str,
        reward: i64,
    ) -> Result<SavedAnswer> {
        let mut db = self.db.lock().await;
        let tx = db.transaction()?;
        let existed: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM answers WHERE question_id = ?1 AND user_id = ?2)",
            params![round_id, user_id],
            |row| row.get(0),
        )?;
        tx.execute(
            "INSERT INTO answers (question_id, user_id, username, content) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(question_id, user_id) DO UPDATE SET content = excluded.content, username = excluded.username",
            params![round_id, user_id, username, content],
        )?;
        if !existed && reward > 0 {
            credit_on(&tx, user_id, reward)?;
        }
        let submitters: i64 = tx.query_row(
            "SELECT COUNT(DISTINCT user_id) FROM answers WHERE question_id = ?1",
            params![round_id],
            |row| row.get(0),
        )?;
        tx.commit()?;
        Ok(SavedAnswer {
            first_answer: !existed,
            submitters,
        })
    }

    pub async fn answers(&self, round_id: &str) -> Result<Vec<Answer>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT user_id, username, content FROM answers WHERE question_id = ?1 ORDER BY rowid ASC",
        )?;
        let rows = stmt.query_map(params![round_id], |row| {
            Ok(Answer {
                user_id: row.get(0)?,
                username: row.get(1)?,
                content: row.get(2)?,
            })
        })?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Flip the revealed flag 0 -> 1. Only one caller ever gets `true`.
    pub async fn mark_revealed(&self, round_id: &str) -> Result<bool> {
        let db = self.db.lock().await;
        let changed = db.execute(
            "UPDATE question_rounds SET revealed = 1 WHERE id = ?1 AND revealed = 0",
            params![round_id],
        )?;
        Ok(changed == 1)
    }
}
