use chrono::Duration;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::info;

use super::render;
use super::{Actor, Engine, Reply, WorkflowError, WorkflowResult};
use crate::core::config::Target;
use crate::core::notify::OutboundMessage;
use crate::core::scheduler::action;

const COUNTDOWN_FROM: i64 = 5;
/// Lobbies nobody finishes are dropped oldest first past this many.
const MAX_OPEN_LOBBIES: usize = 16;

struct Lobby {
    title: String,
    channel_id: u64,
    ready: HashSet<u64>,
    seq: u64,
}

#[derive(Default)]
struct OpenLobbies {
    by_id: HashMap<String, Lobby>,
    opened: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbyState {
    Waiting { title: String, missing: Vec<u64> },
    /// Everyone is in; the lobby has been closed.
    Complete { title: String, channel_id: u64 },
}

/// Watch-party lobbies waiting for everyone to click Ready.
#[derive(Default)]
pub struct WatchLobbies {
    lobbies: Mutex<OpenLobbies>,
}

impl WatchLobbies {
    pub fn open(&self, id: &str, title: &str, channel_id: u64) {
        let Ok(mut open) = self.lobbies.lock() else {
            return;
        };
        while open.by_id.len() >= MAX_OPEN_LOBBIES {
            let Some(oldest) = open
                .by_id
                .iter()
                .min_by_key(|(_, l)| l.seq)
                .map(|(id, _)| id.clone())
            else {
                break;
            };
            open.by_id.remove(&oldest);
            info!("[watch] Lobby {} expired unfinished", oldest);
        }
        open.opened += 1;
        let seq = open.opened;
        open.by_id.insert(
            id.to_string(),
            Lobby {
                title: title.to_string(),
                channel_id,
                ready: HashSet::new(),
                seq,
            },
        );
    }

    /// Mark `user_id` ready. `None` when the lobby is unknown or closed.
    pub fn ready(&self, id: &str, user_id: u64, required: &[u64]) -> Option<LobbyState> {
        let mut open = self.lobbies.lock().ok()?;
        let map = &mut open.by_id;
        let lobby = map.get_mut(id)?;
        lobby.ready.insert(user_id);
        let missing: Vec<u64> = required
            .iter()
            .copied()
            .filter(|u| !lobby.ready.contains(u))
            .collect();
        if missing.is_empty() {
            let lobby = map.remove(id)?;
            Some(LobbyState::Complete {
                title: lobby.title,
                channel_id: lobby.channel_id,
            })
        } else {
            Some(LobbyState::Waiting {
                title: lobby.title.clone(),
                missing,
            })
        }
    }
}

impl Engine {
    fn watchers(&self) -> Vec<u64> {
        self.config
            .players
            .iter()
            .map(|p| p.id)
            .filter(|id| *id != 0)
            .collect()
    }

    /// `!watch <title>` in the watch-party channel.
    pub async fn watch(&self, channel_id: u64, title: &str) -> WorkflowResult<Reply> {
        if !self.is_channel(Target::WatchParty, channel_id) {
            return Ok(Reply::None);
        }
        let title = match title.trim() {
            "" => "Movie Night",
            t => t,
        };
        let id = uuid::Uuid::new_v4().simple().to_string()[..12].to_string();
        self.lobbies.open(&id, title, channel_id);
        info!("[watch] Lobby {} for '{}'", id, title);
        Ok(Reply::Say(render::watch_lobby(&id, title, &self.watchers())))
    }

    pub async fn watch_ready(self: &Arc<Self>, actor: &Actor, lobby_id: &str) -> WorkflowResult<Reply> {
        match self.lobbies.ready(lobby_id, actor.id, &self.watchers()) {
            None => Err(WorkflowError::NotFound("Watch party".into())),
            Some(LobbyState::Waiting { title, missing }) => {
                Ok(Reply::Update(render::watch_lobby(lobby_id, &title, &missing)))
            }
            Some(LobbyState::Complete { title, channel_id }) => {
                self.schedule_countdown(channel_id).await?;
                info!("[watch] Lobby {} complete, counting down", lobby_id);
                Ok(Reply::Update(render::watch_starting(&title)))
            }
        }
    }

    /// One post per second: 5..1, then PLAY NOW.
    async fn schedule_countdown(self: &Arc<Self>, channel_id: u64) -> anyhow::Result<()> {
        let now = self.now();
        for step in 0..=COUNTDOWN_FROM {
            let text = if step < COUNTDOWN_FROM {
                format!("# {}...", COUNTDOWN_FROM - step)
            } else {
                "# ▶️ PLAY NOW!\nEnjoy the movie! 🎬".to_string()
            };
            let engine = Arc::clone(self);
            self.scheduler
                .schedule_once(
                    "watch-countdown",
                    (now + Duration::seconds(step)).with_timezone(&chrono_tz::UTC),
                    action(move || {
                        let engine = Arc::clone(&engine);
                        let message = OutboundMessage::text(text.clone());
                        async move {
                            engine.notifier.post(channel_id, message).await?;
                            Ok(())
                        }
                    }),
                )
                .await?;
        }
        Ok(())
    }
}
