mod bounty;
mod capsule;
mod decision;
mod misc;
mod snap;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::*;
use crate::core::clock::ManualClock;
use crate::core::config::{ChannelConfig, Player};
use crate::core::llm::ScriptedProvider;
use crate::core::notify::{FileAttachment, OutboundMessage, RecordingNotifier};
use crate::core::scheduler::ManualScheduler;
use crate::core::store::test_store;

pub const ALICE: u64 = 11;
pub const BOB: u64 = 22;

pub const CH_QUESTION: u64 = 101;
pub const CH_MOMENTS: u64 = 102;
pub const CH_CAPSULE: u64 = 103;
pub const CH_DARE: u64 = 104;
pub const CH_BOUNTY: u64 = 105;
pub const CH_DECISION: u64 = 106;
pub const CH_SHOP: u64 = 107;
pub const CH_STATS: u64 = 108;
pub const CH_DEBUG: u64 = 109;
pub const CH_BACKUP: u64 = 110;
pub const CH_START: u64 = 111;
pub const CH_WATCH: u64 = 112;
/// A channel the bot has no role for.
pub const CH_GENERAL: u64 = 200;

pub struct Harness {
    pub engine: Arc<Engine>,
    pub store: Arc<Store>,
    pub notifier: Arc<RecordingNotifier>,
    pub provider: Arc<ScriptedProvider>,
    pub scheduler: Arc<ManualScheduler>,
    pub clock: ManualClock,
}

/// 08:30 in Kuala Lumpur, 02:30 in Lusaka.
pub fn start_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-03-02T00:30:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

pub fn test_config() -> BotConfig {
    BotConfig {
        channels: ChannelConfig {
            daily_question: CH_QUESTION,
            moments: CH_MOMENTS,
            audio_capsule: CH_CAPSULE,
            truth_or_dare: CH_DARE,
            bounty_board: CH_BOUNTY,
            decision_room: CH_DECISION,
            shop: CH_SHOP,
            live_stats: CH_STATS,
            debug_logs: CH_DEBUG,
            database_backup: CH_BACKUP,
            start_here: CH_START,
            watch_party: CH_WATCH,
        },
        players: vec![
            Player {
                id: ALICE,
                tz: chrono_tz::Asia::Kuala_Lumpur,
                name: "Alice".into(),
            },
            Player {
                id: BOB,
                tz: chrono_tz::Africa::Lusaka,
                name: "Bob".into(),
            },
        ],
        ..BotConfig::default()
    }
}

pub fn harness() -> Harness {
    harness_with(|_| {})
}

pub fn harness_with(tweak: impl FnOnce(&mut BotConfig)) -> Harness {
    let mut config = test_config();
    tweak(&mut config);
    let clock = ManualClock::new(start_time());
    let store = Arc::new(test_store());
    let notifier = Arc::new(RecordingNotifier::new());
    let provider = Arc::new(ScriptedProvider::default());
    let scheduler = Arc::new(ManualScheduler::new(clock.clone()));
    let engine = Arc::new(Engine::new(
        Arc::new(config),
        store.clone(),
        notifier.clone(),
        Arc::new(TextGenerator::new(provider.clone())),
        scheduler.clone(),
        Arc::new(clock.clone()),
    ));
    Harness {
        engine,
        store,
        notifier,
        provider,
        scheduler,
        clock,
    }
}

pub fn actor(id: u64) -> Actor {
    Actor {
        id,
        name: if id == ALICE { "Alice" } else { "Bob" }.to_string(),
    }
}

static NEXT_MESSAGE: AtomicU64 = AtomicU64::new(1);

pub fn message(channel_id: u64, author_id: u64, content: &str) -> IncomingMessage {
    IncomingMessage {
        handle: MessageHandle {
            channel_id,
            message_id: NEXT_MESSAGE.fetch_add(1, Ordering::SeqCst),
        },
        author_id,
        author_name: actor(author_id).name,
        content: content.to_string(),
        attachments: Vec::new(),
    }
}

pub fn with_photo(mut msg: IncomingMessage) -> IncomingMessage {
    msg.attachments.push(IncomingAttachment {
        filename: "photo.jpg".into(),
        content_type: Some("image/jpeg".into()),
    });
    msg
}

pub fn voice_note(h: &Harness, author_id: u64) -> IncomingMessage {
    let mut msg = message(CH_CAPSULE, author_id, "");
    msg.attachments.push(IncomingAttachment {
        filename: "note.ogg".into(),
        content_type: Some("audio/ogg".into()),
    });
    h.notifier.store_file(
        msg.handle,
        FileAttachment {
            filename: "note.ogg".into(),
            bytes: vec![1, 2, 3],
        },
    );
    msg
}

/// Plain text of a reply, whatever its shape.
pub fn reply_text(reply: &Reply) -> String {
    match reply {
        Reply::None => String::new(),
        Reply::Say(m) | Reply::Update(m) => message_text(m),
        Reply::Private(t) | Reply::React(t) => t.clone(),
        Reply::Modal(f) => f.title.clone(),
    }
}

/// Content plus every card string, for loose `contains` checks.
pub fn message_text(m: &OutboundMessage) -> String {
    let mut parts = Vec::new();
    if let Some(c) = &m.content {
        parts.push(c.clone());
    }
    if let Some(card) = &m.card {
        parts.extend(card.title.clone());
        parts.extend(card.description.clone());
        for f in &card.fields {
            parts.push(format!("{}: {}", f.name, f.value));
        }
        parts.extend(card.footer.clone());
    }
    parts.join("\n")
}

pub fn posted_text(h: &Harness, channel_id: u64) -> Vec<String> {
    h.notifier
        .posts_to(channel_id)
        .iter()
        .map(message_text)
        .collect()
}

/// The custom id of the first button whose id starts with `prefix`.
pub fn button_id(m: &OutboundMessage, prefix: &str) -> String {
    m.buttons
        .iter()
        .find(|b| b.custom_id.starts_with(prefix))
        .map(|b| b.custom_id.clone())
        .unwrap_or_else(|| panic!("no button starting with {prefix}"))
}
