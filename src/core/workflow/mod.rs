//! Multi-step workflows driven by commands, buttons, modals and scheduled
//! jobs. Each state machine is a pure transition function plus an `Engine`
//! method that re-reads the row, applies the transition with a conditional
//! update and then emits messages.

mod affordance;
mod backup;
mod bounty;
mod capsule;
mod commands;
mod dare;
mod dashboard;
mod decision;
mod question;
mod reminder;
pub mod render;
mod shop;
mod snap;
mod startup;
#[cfg(test)]
mod tests;
mod watch;
mod wiki;

pub use affordance::{Affordance, AffordanceKind};
pub use backup::backup_filename;
pub use bounty::{BountyEvent, BountyTransition, bounty_transition};
pub use capsule::{DeliveryMode, DeliveryOutcome};
pub use dare::{DareEvent, DareTransition, dare_transition};
pub use snap::{SnapBoard, SnapCheck, plan_snaps};
pub use watch::WatchLobbies;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::warn;

use crate::core::clock::Clock;
use crate::core::config::{BotConfig, Target};
use crate::core::llm::TextGenerator;
use crate::core::notify::{MessageHandle, Notifier, OutboundMessage, describe_target};
use crate::core::scheduler::Scheduler;
use crate::core::store::Store;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// The actor may not perform this event. The text is shown to them.
    #[error("{0}")]
    NotAllowed(&'static str),
    #[error("cannot {event} a {status} item")]
    InvalidState {
        event: &'static str,
        status: &'static str,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: i64, available: i64 },
    #[error("channel '{0}' is not configured")]
    ChannelMissing(Target),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Invalid(String),
    #[error("no time found in the request")]
    TimeParse,
    #[error("requested time is in the past")]
    PastTime,
    /// A conditional update matched no row: someone else moved first.
    #[error("state changed underneath the request")]
    Conflict,
    #[error(transparent)]
    Infra(#[from] anyhow::Error),
}

impl WorkflowError {
    /// What the acting user sees.
    pub fn user_message(&self) -> String {
        match self {
            WorkflowError::Transition(TransitionError::NotAllowed(msg)) => format!("❌ {}", msg),
            WorkflowError::Transition(TransitionError::InvalidState { .. }) | WorkflowError::Conflict => {
                "⚠️ That action is no longer available.".to_string()
            }
            WorkflowError::InsufficientFunds { needed, available } => format!(
                "💸 **Insufficient Funds!** You need **{}** Us-Bucks but have **{}**.",
                needed, available
            ),
            WorkflowError::ChannelMissing(target) => format!(
                "❌ Error: {} channel is not configured.",
                describe_target(*target)
            ),
            WorkflowError::NotFound(what) => format!("❌ {} not found.", what),
            WorkflowError::Invalid(msg) => msg.clone(),
            WorkflowError::TimeParse => {
                "❌ I couldn't understand the time. Try: `tomorrow at 5pm` or `in 2 hours`.".to_string()
            }
            WorkflowError::PastTime => "❌ That time has already passed!".to_string(),
            WorkflowError::Infra(_) => "⚠️ Something went wrong. Check the logs.".to_string(),
        }
    }
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

#[derive(Debug, Clone, PartialEq)]
pub struct ModalField {
    pub custom_id: String,
    pub label: String,
    pub placeholder: Option<String>,
    pub min_len: u16,
    pub max_len: u16,
    pub paragraph: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModalForm {
    pub custom_id: String,
    pub title: String,
    pub fields: Vec<ModalField>,
}

/// How the interface should answer the request that triggered a workflow.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    None,
    /// Public answer in the request's channel.
    Say(OutboundMessage),
    /// Seen only by the actor where the platform allows it.
    Private(String),
    /// Replace the message carrying the clicked button.
    Update(OutboundMessage),
    Modal(ModalForm),
    /// React to the command message with this emoji.
    React(String),
}

impl Reply {
    pub fn say(text: impl Into<String>) -> Self {
        Reply::Say(OutboundMessage::text(text))
    }

    pub fn private(text: impl Into<String>) -> Self {
        Reply::Private(text.into())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IncomingAttachment {
    pub filename: String,
    pub content_type: Option<String>,
}

impl IncomingAttachment {
    pub fn is_audio(&self) -> bool {
        if let Some(ct) = &self.content_type
            && ct.starts_with("audio/")
        {
            return true;
        }
        let name = self.filename.to_lowercase();
        [".mp3", ".wav", ".ogg", ".m4a"]
            .iter()
            .any(|ext| name.ends_with(ext))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IncomingMessage {
    pub handle: MessageHandle,
    pub author_id: u64,
    pub author_name: String,
    pub content: String,
    pub attachments: Vec<IncomingAttachment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub id: u64,
    pub name: String,
}

pub struct Engine {
    config: Arc<BotConfig>,
    store: Arc<Store>,
    notifier: Arc<dyn Notifier>,
    text: Arc<TextGenerator>,
    scheduler: Arc<dyn Scheduler>,
    clock: Arc<dyn Clock>,
    snaps: SnapBoard,
    lobbies: WatchLobbies,
}

impl Engine {
    pub fn new(
        config: Arc<BotConfig>,
        store: Arc<Store>,
        notifier: Arc<dyn Notifier>,
        text: Arc<TextGenerator>,
        scheduler: Arc<dyn Scheduler>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            store,
            notifier,
            text,
            scheduler,
            clock,
            snaps: SnapBoard::default(),
            lobbies: WatchLobbies::default(),
        }
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn home_now(&self) -> DateTime<Tz> {
        self.clock.now().with_timezone(&self.config.home_tz)
    }

    fn channel(&self, target: Target) -> WorkflowResult<u64> {
        self.config
            .channels
            .id(target)
            .ok_or(WorkflowError::ChannelMissing(target))
    }

    fn is_channel(&self, target: Target, channel_id: u64) -> bool {
        self.config.channels.id(target) == Some(channel_id)
    }

    async fn post_to(&self, target: Target, message: OutboundMessage) -> WorkflowResult<MessageHandle> {
        let channel = self.channel(target)?;
        Ok(self.notifier.post(channel, message).await?)
    }

    /// Post a follow-up whose failure must not undo a committed change.
    async fn announce(&self, target: Target, message: OutboundMessage) {
        if let Err(e) = self.post_to(target, message).await {
            warn!("[workflow] Could not post to {}: {}", target, e);
        }
    }
}
