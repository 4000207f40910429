use anyhow::Result;
use console::style;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::core::clock::{Clock, SystemClock};
use crate::core::config::{BotConfig, Secrets};
use crate::core::lifecycle::LifecycleManager;
use crate::core::llm::TextGenerator;
use crate::core::llm::generic_provider::GeminiProvider;
use crate::core::notify::Notifier;
use crate::core::scheduler::CronScheduler;
use crate::core::store::Store;
use crate::core::terminal::{self, GuideSection};
use crate::core::workflow::Engine;
use crate::interfaces::discord::{DiscordChannel, DiscordNotifier};
use crate::logging;

/// Boot everything, then block until Ctrl+C.
pub async fn run_bot(config_path: &Path) -> Result<()> {
    let relay = logging::init();
    terminal::print_banner();

    let config = Arc::new(BotConfig::load(config_path).await?);
    let secrets = Secrets::from_env()?;
    let db_path = config.database_path();
    let store = Arc::new(Store::open(&db_path).await?);

    let text = match &secrets.gemini_api_key {
        Some(key) => TextGenerator::new(Arc::new(GeminiProvider::new(
            config.model.clone(),
            key.clone(),
        ))),
        None => TextGenerator::offline(),
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let mut lifecycle = LifecycleManager::new().await?;
    let scheduler = Arc::new(CronScheduler::new(
        lifecycle.scheduler.clone(),
        clock.clone(),
    ));
    let notifier: Arc<dyn Notifier> = Arc::new(DiscordNotifier::new(&secrets.discord_token));

    let engine = Arc::new(Engine::new(
        config.clone(),
        store,
        notifier.clone(),
        Arc::new(text),
        scheduler,
        clock,
    ));
    let discord = DiscordChannel::new(secrets.discord_token, engine, notifier, relay);
    lifecycle.attach(Arc::new(Mutex::new(discord)));

    GuideSection::new("echobot")
        .status("Config", &config_path.display().to_string())
        .status("Database", &db_path.display().to_string())
        .status("Home zone", config.home_tz.name())
        .blank()
        .status(
            "Press Ctrl+C to stop the bot.",
            &format!("{}", style("Ctrl+C").bold().yellow()),
        )
        .print();
    println!();

    lifecycle.start().await?;
    tokio::signal::ctrl_c().await?;
    info!("[run] Ctrl+C received, shutting down");
    lifecycle.shutdown().await?;
    terminal::print_goodbye();
    Ok(())
}
