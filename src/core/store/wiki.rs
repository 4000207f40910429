use anyhow::Result;
use rusqlite::{OptionalExtension, params};

use super::Store;
use super::types::WikiEntry;
use crate::core::notify::AttachmentRef;

impl Store {
    pub async fn set_wiki_entry(
        &self,
        key: &str,
        content: Option<&str>,
        attachment: Option<AttachmentRef>,
        added_by: &str,
    ) -> Result<()> {
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO wiki (key_name, content, attachment, added_by) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key_name) DO UPDATE SET
                content = excluded.content,
                attachment = excluded.attachment,
                added_by = excluded.added_by",
            params![
                key.to_lowercase(),
                content,
                attachment.map(|a| a.to_string()),
                added_by
            ],
        )?;
        Ok(())
    }

    pub async fn get_wiki_entry(&self, key: &str) -> Result<Option<WikiEntry>> {
        let db = self.db.lock().await;
        let entry = db
            .query_row(
                "SELECT key_name, content, attachment, added_by FROM wiki WHERE key_name = ?1",
                params![key.to_lowercase()],
                |row| {
                    let attachment: Option<String> = row.get(2)?;
                    Ok(WikiEntry {
                        key: row.get(0)?,
                        content: row.get(1)?,
                        attachment: attachment.and_then(|a| a.parse().ok()),
                        added_by: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }

    pub async fn wiki_keys(&self) -> Result<Vec<String>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare("SELECT key_name FROM wiki ORDER BY key_name ASC")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        let mut keys = Vec::new();
        for row in rows {
            keys.push(row?);
        }
        Ok(keys)
    }
}
