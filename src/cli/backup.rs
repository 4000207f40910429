use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};

use crate::core::config::{BotConfig, data_dir};
use crate::core::store::Store;
use crate::core::terminal::{print_status, print_success};
use crate::core::workflow::backup_filename;

/// `echobot backup`: snapshot the database without connecting to Discord.
pub async fn offline_backup(config_path: &Path, out: Option<PathBuf>) -> Result<()> {
    let config = BotConfig::load(config_path).await?;
    let db_path = config.database_path();
    let store = Store::open(&db_path).await?;

    let stamp = Utc::now()
        .with_timezone(&config.home_tz)
        .format("%Y-%m-%d_%H-%M")
        .to_string();
    let dest = out.unwrap_or_else(|| data_dir().join("backups").join(backup_filename(&stamp)));
    if let Some(parent) = dest.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    store.vacuum_into(&dest).await?;
    print_status("Source", &db_path.display().to_string());
    print_success(&format!("Backup written to {}", dest.display()));
    Ok(())
}
