use anyhow::Context;
use std::path::PathBuf;
use tracing::{info, warn};

use super::render;
use super::{Engine, Reply, WorkflowResult};
use crate::core::config::Target;
use crate::core::notify::FileAttachment;

pub fn backup_filename(stamp: &str) -> String {
    format!("echobot_backup_{}.db", stamp)
}

impl Engine {
    /// Snapshot the database and upload it to the backup channel.
    pub async fn run_backup(&self) -> anyhow::Result<String> {
        let channel = self.channel(Target::DatabaseBackup)?;
        let home = self.home_now();
        let filename = backup_filename(&home.format("%Y-%m-%d_%H-%M").to_string());
        let path: PathBuf = std::env::temp_dir().join(format!(
            "{}-{}",
            uuid::Uuid::new_v4().simple(),
            filename
        ));

        self.store.vacuum_into(&path).await?;
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("reading snapshot {}", path.display()))?;
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!("[backup] Could not remove {}: {}", path.display(), e);
        }

        let size = bytes.len();
        let file = FileAttachment {
            filename: filename.clone(),
            bytes,
        };
        self.notifier
            .post(
                channel,
                render::backup(file, &home.format("%Y-%m-%d %H:%M %Z").to_string()),
            )
            .await?;
        info!("[backup] Uploaded {} ({} bytes)", filename, size);
        Ok(filename)
    }

    /// `!backup`.
    pub async fn backup_command(&self) -> WorkflowResult<Reply> {
        let filename = self.run_backup().await?;
        Ok(Reply::say(format!("✅ Backup uploaded: `{}`", filename)))
    }
}
