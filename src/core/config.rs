use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// The chat channels the bot posts into. A zero id means "not configured";
/// anything routed there is logged and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    DailyQuestion,
    Moments,
    AudioCapsule,
    TruthOrDare,
    BountyBoard,
    DecisionRoom,
    Shop,
    LiveStats,
    DebugLogs,
    DatabaseBackup,
    StartHere,
    WatchParty,
}

impl Target {
    pub fn as_str(&self) -> &'static str {
        match self {
            Target::DailyQuestion => "daily_question",
            Target::Moments => "moments",
            Target::AudioCapsule => "audio_capsule",
            Target::TruthOrDare => "truth_or_dare",
            Target::BountyBoard => "bounty_board",
            Target::DecisionRoom => "decision_room",
            Target::Shop => "shop",
            Target::LiveStats => "live_stats",
            Target::DebugLogs => "debug_logs",
            Target::DatabaseBackup => "database_backup",
            Target::StartHere => "start_here",
            Target::WatchParty => "watch_party",
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default)]
    pub daily_question: u64,
    #[serde(default)]
    pub moments: u64,
    #[serde(default)]
    pub audio_capsule: u64,
    #[serde(default)]
    pub truth_or_dare: u64,
    #[serde(default)]
    pub bounty_board: u64,
    #[serde(default)]
    pub decision_room: u64,
    #[serde(default)]
    pub shop: u64,
    #[serde(default)]
    pub live_stats: u64,
    #[serde(default)]
    pub debug_logs: u64,
    #[serde(default)]
    pub database_backup: u64,
    #[serde(default)]
    pub start_here: u64,
    #[serde(default)]
    pub watch_party: u64,
}

impl ChannelConfig {
    pub fn id(&self, target: Target) -> Option<u64> {
        let id = match target {
            Target::DailyQuestion => self.daily_question,
            Target::Moments => self.moments,
            Target::AudioCapsule => self.audio_capsule,
            Target::TruthOrDare => self.truth_or_dare,
            Target::BountyBoard => self.bounty_board,
            Target::DecisionRoom => self.decision_room,
            Target::Shop => self.shop,
            Target::LiveStats => self.live_stats,
            Target::DebugLogs => self.debug_logs,
            Target::DatabaseBackup => self.database_backup,
            Target::StartHere => self.start_here,
            Target::WatchParty => self.watch_party,
        };
        (id != 0).then_some(id)
    }

    /// Reverse lookup used by the chat interface to route incoming messages.
    pub fn target_of(&self, channel_id: u64) -> Option<Target> {
        ALL_TARGETS
            .iter()
            .copied()
            .find(|t| self.id(*t) == Some(channel_id))
    }
}

pub const ALL_TARGETS: [Target; 12] = [
    Target::DailyQuestion,
    Target::Moments,
    Target::AudioCapsule,
    Target::TruthOrDare,
    Target::BountyBoard,
    Target::DecisionRoom,
    Target::Shop,
    Target::LiveStats,
    Target::DebugLogs,
    Target::DatabaseBackup,
    Target::StartHere,
    Target::WatchParty,
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: u64,
    pub tz: Tz,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatesConfig {
    #[serde(default = "default_date")]
    pub relationship_start: NaiveDate,
    #[serde(default = "default_date")]
    pub last_seen: NaiveDate,
}

fn default_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default()
}

impl Default for DatesConfig {
    fn default() -> Self {
        Self {
            relationship_start: default_date(),
            last_seen: default_date(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopItem {
    pub id: String,
    pub name: String,
    pub cost: i64,
}

fn default_shop() -> Vec<ShopItem> {
    [
        ("1", "Massage Coupon (30m)", 150),
        ("2", "Movie Night Choice", 300),
        ("3", "No Chores Day", 500),
        ("4", "Forgiveness Card", 1000),
    ]
    .into_iter()
    .map(|(id, name, cost)| ShopItem {
        id: id.to_string(),
        name: name.to_string(),
        cost,
    })
    .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardConfig {
    #[serde(default = "default_answer_reward")]
    pub answer: i64,
    #[serde(default = "default_snap_reward")]
    pub snap: i64,
    #[serde(default = "default_log_reward")]
    pub log: i64,
}

fn default_answer_reward() -> i64 {
    10
}
fn default_snap_reward() -> i64 {
    50
}
fn default_log_reward() -> i64 {
    5
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            answer: default_answer_reward(),
            snap: default_snap_reward(),
            log: default_log_reward(),
        }
    }
}

/// Who may sign off on a dare nobody issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DarePolicy {
    /// Pay system-issued dares as soon as the victim marks them done.
    #[serde(default = "default_true")]
    pub auto_approve_system_dares: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DarePolicy {
    fn default() -> Self {
        Self {
            auto_approve_system_dares: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_question_hour")]
    pub question_hour: u32,
    #[serde(default = "default_dare_hour")]
    pub dare_hour: u32,
    /// Planner runs at this UTC hour.
    #[serde(default)]
    pub snap_planner_hour: u32,
    #[serde(default = "default_snap_window_start")]
    pub snap_window_start: u32,
    #[serde(default = "default_snap_window_end")]
    pub snap_window_end: u32,
    #[serde(default = "default_snaps_per_day")]
    pub snaps_per_day: usize,
    #[serde(default = "default_snap_minutes")]
    pub snap_window_minutes: i64,
    #[serde(default = "default_backup_hours")]
    pub backup_hours: u64,
    #[serde(default = "default_dashboard_secs")]
    pub dashboard_secs: u64,
    #[serde(default = "default_first_light_hour")]
    pub first_light_hour: u32,
}

fn default_question_hour() -> u32 {
    9
}
fn default_dare_hour() -> u32 {
    18
}
fn default_snap_window_start() -> u32 {
    10
}
fn default_snap_window_end() -> u32 {
    22
}
fn default_snaps_per_day() -> usize {
    3
}
fn default_snap_minutes() -> i64 {
    15
}
fn default_backup_hours() -> u64 {
    12
}
fn default_dashboard_secs() -> u64 {
    60
}
fn default_first_light_hour() -> u32 {
    7
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            question_hour: default_question_hour(),
            dare_hour: default_dare_hour(),
            snap_planner_hour: 0,
            snap_window_start: default_snap_window_start(),
            snap_window_end: default_snap_window_end(),
            snaps_per_day: default_snaps_per_day(),
            snap_window_minutes: default_snap_minutes(),
            backup_hours: default_backup_hours(),
            dashboard_secs: default_dashboard_secs(),
            first_light_hour: default_first_light_hour(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_home_tz")]
    pub home_tz: Tz,
    #[serde(default)]
    pub channels: ChannelConfig,
    #[serde(default = "default_players")]
    pub players: Vec<Player>,
    #[serde(default)]
    pub dates: DatesConfig,
    #[serde(default = "default_shop")]
    pub shop: Vec<ShopItem>,
    #[serde(default)]
    pub rewards: RewardConfig,
    #[serde(default)]
    pub dares: DarePolicy,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// SQLite file; `ECHOBOT_DB` overrides it.
    #[serde(default)]
    pub database: Option<PathBuf>,
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_home_tz() -> Tz {
    chrono_tz::Asia::Kuala_Lumpur
}

fn default_players() -> Vec<Player> {
    vec![
        Player {
            id: 0,
            tz: chrono_tz::Asia::Kuala_Lumpur,
            name: "Partner A".to_string(),
        },
        Player {
            id: 0,
            tz: chrono_tz::Africa::Lusaka,
            name: "Partner B".to_string(),
        },
    ]
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            home_tz: default_home_tz(),
            channels: ChannelConfig::default(),
            players: default_players(),
            dates: DatesConfig::default(),
            shop: default_shop(),
            rewards: RewardConfig::default(),
            dares: DarePolicy::default(),
            schedule: ScheduleConfig::default(),
            database: None,
            model: default_model(),
        }
    }
}

impl BotConfig {
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!(
                "config file {} not found (run `echobot init` to create one)",
                path.display()
            );
        }
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let config = Self::parse(&content)?;
        info!("[config] Loaded {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: BotConfig = toml::from_str(content).context("invalid echobot.toml")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let s = &self.schedule;
        if s.question_hour > 23 || s.dare_hour > 23 || s.snap_planner_hour > 23 {
            bail!("schedule hours must be between 0 and 23");
        }
        if s.snap_window_start >= s.snap_window_end || s.snap_window_end > 24 {
            bail!(
                "snap window {}..{} is empty or out of range",
                s.snap_window_start,
                s.snap_window_end
            );
        }
        if s.snap_window_minutes <= 0 || s.backup_hours == 0 || s.dashboard_secs == 0 {
            bail!("snap window, backup and dashboard periods must be positive");
        }
        if let Some(item) = self.shop.iter().find(|i| i.cost <= 0) {
            bail!("shop item '{}' must cost more than zero", item.id);
        }
        for r in [self.rewards.answer, self.rewards.snap, self.rewards.log] {
            if r < 0 {
                bail!("rewards cannot be negative");
            }
        }
        Ok(())
    }

    pub fn player(&self, user_id: u64) -> Option<&Player> {
        self.players.iter().find(|p| p.id == user_id && p.id != 0)
    }

    /// The configured player who is not `user_id`.
    pub fn partner_of(&self, user_id: u64) -> Option<&Player> {
        self.players.iter().find(|p| p.id != user_id && p.id != 0)
    }

    pub fn shop_item(&self, id: &str) -> Option<&ShopItem> {
        self.shop.iter().find(|i| i.id == id.trim())
    }

    /// Resolve the SQLite path: `ECHOBOT_DB`, then the config, then beside
    /// the config in the data directory.
    pub fn database_path(&self) -> PathBuf {
        if let Ok(p) = std::env::var("ECHOBOT_DB")
            && !p.trim().is_empty()
        {
            return PathBuf::from(p);
        }
        self.database
            .clone()
            .unwrap_or_else(|| data_dir().join("echobot.db"))
    }
}

pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("echobot")
}

/// `--config` wins, then `ECHOBOT_CONFIG`, then the data directory.
pub fn resolve_config_path(flag: Option<PathBuf>) -> PathBuf {
    if let Some(p) = flag {
        return p;
    }
    if let Ok(p) = std::env::var("ECHOBOT_CONFIG")
        && !p.trim().is_empty()
    {
        return PathBuf::from(p);
    }
    data_dir().join("echobot.toml")
}

pub struct Secrets {
    pub discord_token: String,
    pub gemini_api_key: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Result<Self> {
        let discord_token = std::env::var("DISCORD_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .context("DISCORD_TOKEN is not set")?;
        let gemini_api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        Ok(Self {
            discord_token,
            gemini_api_key,
        })
    }
}

pub const SAMPLE_CONFIG: &str = r#"# echobot configuration
home_tz = "Asia/Kuala_Lumpur"
model = "gemini-2.0-flash"

[channels]
daily_question = 0
moments = 0
audio_capsule = 0
truth_or_dare = 0
bounty_board = 0
decision_room = 0
shop = 0
live_stats = 0
debug_logs = 0
database_backup = 0
start_here = 0
watch_party = 0

[[players]]
id = 0
tz = "Asia/Kuala_Lumpur"
name = "Partner A"

[[players]]
id = 0
tz = "Africa/Lusaka"
name = "Partner B"

[dates]
relationship_start = "2024-01-01"
last_seen = "2024-01-01"

[[shop]]
id = "1"
name = "Massage Coupon (30m)"
cost = 150

[[shop]]
id = "2"
name = "Movie Night Choice"
cost = 300

[[shop]]
id = "3"
name = "No Chores Day"
cost = 500

[[shop]]
id = "4"
name = "Forgiveness Card"
cost = 1000

[rewards]
answer = 10
snap = 50
log = 5

[dares]
auto_approve_system_dares = true

[schedule]
question_hour = 9
dare_hour = 18
snap_planner_hour = 0
snap_window_start = 10
snap_window_end = 22
snaps_per_day = 3
snap_window_minutes = 15
backup_hours = 12
dashboard_secs = 60
first_light_hour = 7
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_config_parses_to_defaults() {
        let cfg = BotConfig::parse(SAMPLE_CONFIG).unwrap();
        assert_eq!(cfg.home_tz, chrono_tz::Asia::Kuala_Lumpur);
        assert_eq!(cfg.players.len(), 2);
        assert_eq!(cfg.players[1].tz, chrono_tz::Africa::Lusaka);
        assert_eq!(cfg.shop, default_shop());
        assert_eq!(cfg.rewards.snap, 50);
        assert!(cfg.dares.auto_approve_system_dares);
        assert_eq!(cfg.schedule.snaps_per_day, 3);
    }

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = BotConfig::parse("").unwrap();
        assert_eq!(cfg.shop.len(), 4);
        assert_eq!(cfg.rewards.answer, 10);
        assert_eq!(cfg.schedule.backup_hours, 12);
        assert_eq!(cfg.channels.id(Target::Moments), None);
    }

    #[test]
    fn unknown_time_zone_is_rejected() {
        let toml = r#"
[[players]]
id = 1
tz = "Mars/Olympus_Mons"
name = "X"
"#;
        assert!(BotConfig::parse(toml).is_err());
    }

    #[test]
    fn empty_snap_window_is_rejected() {
        let toml = "[schedule]\nsnap_window_start = 22\nsnap_window_end = 10\n";
        assert!(BotConfig::parse(toml).is_err());
    }

    #[test]
    fn partner_lookup_skips_self_and_unset_players() {
        let toml = r#"
[[players]]
id = 11
tz = "Asia/Kuala_Lumpur"
name = "A"

[[players]]
id = 22
tz = "Africa/Lusaka"
name = "B"
"#;
        let cfg = BotConfig::parse(toml).unwrap();
        assert_eq!(cfg.partner_of(11).map(|p| p.id), Some(22));
        assert_eq!(cfg.partner_of(22).map(|p| p.id), Some(11));
        assert_eq!(cfg.player(33).map(|p| p.id), None);
        assert!(BotConfig::default().partner_of(5).is_none());
    }

    #[test]
    fn channel_reverse_lookup() {
        let cfg = BotConfig::parse("[channels]\nshop = 42\n").unwrap();
        assert_eq!(cfg.channels.target_of(42), Some(Target::Shop));
        assert_eq!(cfg.channels.target_of(0), None);
    }
}
