mod bounties;
mod capsules;
mod dares;
mod ledger;
mod moments;
mod polls;
mod questions;
mod settings;
mod stats;
pub mod types;
mod wiki;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::info;

use crate::core::notify::MessageHandle;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        user_id INTEGER PRIMARY KEY,
        balance INTEGER NOT NULL DEFAULT 0 CHECK (balance >= 0)
    )",
    "CREATE TABLE IF NOT EXISTS bounties (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        description TEXT NOT NULL,
        reward INTEGER NOT NULL,
        employer_id INTEGER NOT NULL,
        worker_id INTEGER,
        status TEXT NOT NULL DEFAULT 'OPEN',
        message TEXT
    )",
    "CREATE TABLE IF NOT EXISTS dares (
        dare_id TEXT PRIMARY KEY,
        challenger_id INTEGER NOT NULL,
        victim_id INTEGER,
        task TEXT NOT NULL,
        reward INTEGER NOT NULL,
        status TEXT NOT NULL DEFAULT 'PENDING',
        message TEXT
    )",
    "CREATE TABLE IF NOT EXISTS audio_capsules (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        sender_id INTEGER NOT NULL,
        attachment TEXT NOT NULL,
        label TEXT,
        deliver_at TEXT,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS question_rounds (
        id TEXT PRIMARY KEY,
        question TEXT NOT NULL,
        revealed INTEGER NOT NULL DEFAULT 0,
        message TEXT
    )",
    "CREATE TABLE IF NOT EXISTS answers (
        question_id TEXT NOT NULL,
        user_id INTEGER NOT NULL,
        username TEXT NOT NULL,
        content TEXT NOT NULL,
        PRIMARY KEY (question_id, user_id)
    )",
    "CREATE TABLE IF NOT EXISTS wiki (
        key_name TEXT PRIMARY KEY,
        content TEXT,
        attachment TEXT,
        added_by TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS moments (
        moment_id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        caption TEXT NOT NULL,
        attachment TEXT,
        timestamp TEXT NOT NULL,
        source TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS polls (
        id TEXT PRIMARY KEY,
        question TEXT NOT NULL,
        options_json TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS settings (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_capsules_status_label ON audio_capsules(status, label, created_at)",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_capsules_attachment ON audio_capsules(attachment)",
];

/// Durable state of the bot. One SQLite connection, serialized behind an
/// async mutex; every multi-row change runs in a transaction.
pub struct Store {
    db: Arc<Mutex<Connection>>,
}

impl Store {
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await?;
        }
        let db = Connection::open(path)
            .with_context(|| format!("opening database {}", path.display()))?;
        Self::init(&db)?;
        info!("[store] Opened {}", path.display());
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory()?;
        Self::init(&db)?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    fn init(db: &Connection) -> Result<()> {
        db.pragma_update(None, "foreign_keys", "ON")?;
        for stmt in SCHEMA {
            db.execute(stmt, [])?;
        }
        Ok(())
    }

    /// Write a consistent snapshot of the database to `dest`.
    pub async fn vacuum_into(&self, dest: &Path) -> Result<()> {
        if dest.exists() {
            fs::remove_file(dest).await?;
        }
        let db = self.db.lock().await;
        db.execute("VACUUM INTO ?1", [dest.to_string_lossy().as_ref()])?;
        Ok(())
    }
}

pub(crate) fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(crate) fn parse_ts(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))
}

pub(crate) fn parse_handle(raw: Option<String>) -> Option<MessageHandle> {
    raw.and_then(|r| r.parse().ok())
}

pub(crate) fn bad_enum(column: usize, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        rusqlite::types::Type::Text,
        format!("unknown value '{}'", value).into(),
    )
}

/// Create an in-memory store for testing.
#[cfg(test)]
pub fn test_store() -> Store {
    Store::open_in_memory().expect("in-memory store")
}
