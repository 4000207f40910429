use anyhow::{Result, bail};
use std::path::Path;

use crate::core::config::{ALL_TARGETS, BotConfig, Secrets};
use crate::core::notify::describe_target;
use crate::core::store::Store;
use crate::core::terminal::{print_error, print_info, print_step, print_success, print_warn};

/// Check everything `run` needs before it connects.
/// Fails when at least one blocking problem was found.
pub async fn run_doctor(config_path: &Path) -> Result<()> {
    print_step("Checking echobot setup...");
    println!();

    let mut problems = 0;

    // 1. Config
    let config = match BotConfig::load(config_path).await {
        Ok(c) => {
            print_success(&format!("Config is valid: {}", config_path.display()));
            Some(c)
        }
        Err(e) => {
            print_error(&format!("Config: {:#}", e));
            problems += 1;
            None
        }
    };

    if let Some(config) = &config {
        // 2. Channels and players
        let missing: Vec<String> = ALL_TARGETS
            .iter()
            .filter(|t| config.channels.id(**t).is_none())
            .map(|t| describe_target(*t))
            .collect();
        if missing.is_empty() {
            print_success("All channels are configured.");
        } else {
            print_warn(&format!(
                "Channels not set (their features stay quiet): {}",
                missing.join(", ")
            ));
        }

        let players = config.players.iter().filter(|p| p.id != 0).count();
        if players == 2 {
            print_success("Both players are configured.");
        } else {
            print_warn(&format!("{} of 2 players have a Discord id.", players));
        }

        // 3. Database
        let db_path = config.database_path();
        match Store::open(&db_path).await {
            Ok(_) => print_success(&format!("Database opens: {}", db_path.display())),
            Err(e) => {
                print_error(&format!("Database {}: {:#}", db_path.display(), e));
                problems += 1;
            }
        }
    }

    // 4. Secrets
    match Secrets::from_env() {
        Ok(secrets) => {
            print_success("DISCORD_TOKEN is set.");
            if secrets.gemini_api_key.is_some() {
                print_success("GEMINI_API_KEY is set.");
            } else {
                print_warn("GEMINI_API_KEY is not set; generated text falls back to fixed lines.");
            }
        }
        Err(e) => {
            print_error(&format!("{:#}", e));
            problems += 1;
        }
    }

    println!();
    if problems > 0 {
        bail!("doctor found {} problem(s)", problems);
    }
    print_info("Everything looks ready. Start with `echobot run`.");
    Ok(())
}
