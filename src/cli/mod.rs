mod backup;
mod doctor;
mod init;
mod run;

use anyhow::{Result, bail};
use console::style;
use std::path::PathBuf;

use crate::core::config::resolve_config_path;
use crate::core::terminal::{self, GuideSection};

fn print_help() {
    terminal::print_banner();

    GuideSection::new("Bot")
        .command("run", "Connect to Discord and start every schedule (default)")
        .print();

    GuideSection::new("Setup")
        .command("init", "Write a sample echobot.toml")
        .command("doctor", "Check config, secrets and the database")
        .print();

    GuideSection::new("Maintenance")
        .command("backup", "Snapshot the database to a file")
        .command("help", "Show this guide")
        .print();

    GuideSection::new("Options")
        .text("--config <path>   Config file (else ECHOBOT_CONFIG, else the data dir)")
        .text("--force           Let init overwrite an existing file")
        .text("--out <path>      Where backup writes the snapshot")
        .blank()
        .hint("echobot init --config ./echobot.toml", "")
        .hint("DISCORD_TOKEN=... echobot run", "")
        .print();

    println!(
        "\n {} {} <command> [options]\n",
        style("Usage:").bold(),
        style("echobot").green()
    );
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    Run,
    Init,
    Backup,
    Doctor,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CliArgs {
    pub command: Command,
    pub config: Option<PathBuf>,
    pub force: bool,
    pub out: Option<PathBuf>,
}

pub(crate) fn parse_args(args: &[String], start: usize) -> Result<CliArgs> {
    let mut command = None;
    let mut config = None;
    let mut force = false;
    let mut out = None;
    let mut i = start;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config = Some(PathBuf::from(&args[i + 1]));
                    i += 2;
                } else {
                    bail!("--config needs a path");
                }
            }
            "--out" | "-o" => {
                if i + 1 < args.len() {
                    out = Some(PathBuf::from(&args[i + 1]));
                    i += 2;
                } else {
                    bail!("--out needs a path");
                }
            }
            "--force" | "-f" => {
                force = true;
                i += 1;
            }
            "--help" | "-h" => {
                command = Some(Command::Help);
                i += 1;
            }
            other if command.is_none() => {
                command = Some(match other {
                    "run" => Command::Run,
                    "init" => Command::Init,
                    "backup" => Command::Backup,
                    "doctor" => Command::Doctor,
                    "help" => Command::Help,
                    _ => bail!("unknown command '{}' (try `echobot help`)", other),
                });
                i += 1;
            }
            other => bail!("unexpected argument '{}'", other),
        }
    }
    Ok(CliArgs {
        command: command.unwrap_or(Command::Run),
        config,
        force,
        out,
    })
}

pub async fn run_main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let parsed = parse_args(&args, 1)?;
    let config_path = resolve_config_path(parsed.config.clone());

    match parsed.command {
        Command::Help => {
            print_help();
            Ok(())
        }
        Command::Init => init::write_sample(&config_path, parsed.force).await,
        Command::Doctor => doctor::run_doctor(&config_path).await,
        Command::Backup => backup::offline_backup(&config_path, parsed.out).await,
        Command::Run => run::run_bot(&config_path).await,
    }
}
