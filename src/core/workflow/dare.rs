use rand::Rng;
use tracing::{info, warn};

use super::render::{self, mention};
use super::{Actor, Engine, Reply, TransitionError, WorkflowError, WorkflowResult};
use crate::core::config::{DarePolicy, Target};
use crate::core::notify::OutboundMessage;
use crate::core::store::types::{Dare, DareStatus, Payout, SYSTEM_CHALLENGER};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DareEvent {
    Accept,
    MarkDone,
    Approve,
    Reject,
}

impl DareEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            DareEvent::Accept => "accept",
            DareEvent::MarkDone => "done",
            DareEvent::Approve => "approve",
            DareEvent::Reject => "reject",
        }
    }

    pub fn from_action(s: &str) -> Option<Self> {
        match s {
            "accept" => Some(DareEvent::Accept),
            "done" => Some(DareEvent::MarkDone),
            "approve" => Some(DareEvent::Approve),
            "reject" => Some(DareEvent::Reject),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DareTransition {
    pub from: DareStatus,
    pub to: DareStatus,
    pub victim_id: Option<u64>,
    pub payout: Option<Payout>,
    /// Paid straight from IN_PROGRESS under the system-dare policy.
    pub auto_approved: bool,
}

/// Who may review: the challenger, or anyone but the victim when the bot
/// issued the dare.
fn check_reviewer(dare: &Dare, actor: u64) -> Result<(), TransitionError> {
    if dare.is_system() {
        if dare.victim_id == Some(actor) {
            return Err(TransitionError::NotAllowed("You can't verify your own dare!"));
        }
    } else if actor != dare.challenger_id {
        return Err(TransitionError::NotAllowed("Only the challenger can approve payment!"));
    }
    Ok(())
}

pub fn dare_transition(
    dare: &Dare,
    event: DareEvent,
    actor: u64,
    policy: &DarePolicy,
) -> Result<DareTransition, TransitionError> {
    let invalid = TransitionError::InvalidState {
        event: event.as_str(),
        status: dare.status.as_str(),
    };
    let pay = |victim: u64| Payout {
        user_id: victim,
        amount: dare.reward,
    };

    match (event, dare.status) {
        (DareEvent::Accept, DareStatus::Pending) => {
            if !dare.is_system() && actor == dare.challenger_id {
                return Err(TransitionError::NotAllowed("You can't accept your own dare!"));
            }
            Ok(DareTransition {
                from: dare.status,
                to: DareStatus::InProgress,
                victim_id: Some(actor),
                payout: None,
                auto_approved: false,
            })
        }
        (DareEvent::MarkDone, DareStatus::InProgress) => {
            if dare.victim_id != Some(actor) {
                return Err(TransitionError::NotAllowed("You aren't the one doing this dare!"));
            }
            let auto = dare.is_system() && policy.auto_approve_system_dares;
            Ok(DareTransition {
                from: dare.status,
                to: if auto {
                    DareStatus::Completed
                } else {
                    DareStatus::WaitingApproval
                },
                victim_id: Some(actor),
                payout: auto.then(|| pay(actor)),
                auto_approved: auto,
            })
        }
        (DareEvent::Approve, DareStatus::WaitingApproval) => {
            check_reviewer(dare, actor)?;
            let victim = dare.victim_id.ok_or(invalid)?;
            Ok(DareTransition {
                from: dare.status,
                to: DareStatus::Completed,
                victim_id: Some(victim),
                payout: Some(pay(victim)),
                auto_approved: false,
            })
        }
        (DareEvent::Reject, DareStatus::WaitingApproval) => {
            check_reviewer(dare, actor)?;
            Ok(DareTransition {
                from: dare.status,
                to: DareStatus::InProgress,
                victim_id: dare.victim_id,
                payout: None,
                auto_approved: false,
            })
        }
        _ => Err(invalid),
    }
}

/// Creation time plus a random suffix, so two dares in one second differ.
fn new_dare_id(now: chrono::DateTime<chrono::Utc>) -> String {
    let suffix: u16 = rand::thread_rng().gen_range(0..=u16::MAX);
    format!("{}-{:04x}", now.format("%Y%m%d%H%M%S"), suffix)
}

impl Engine {
    /// Generate a dare and post it. `challenger` 0 marks a system dare.
    pub async fn issue_dare(&self, channel_id: u64, challenger: u64) -> WorkflowResult<Dare> {
        let (task, reward) = self.text.dare().await;
        let id = new_dare_id(self.now());
        self.store.create_dare(&id, challenger, &task, reward).await?;
        let dare = self
            .store
            .get_dare(&id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("Dare {}", id)))?;
        let handle = self.notifier.post(channel_id, render::dare_message(&dare)).await?;
        self.store.set_dare_message(&id, handle).await?;
        info!("[dare] {} issued by {} for {}", id, challenger, reward);
        Ok(Dare {
            message: Some(handle),
            ..dare
        })
    }

    /// Daily job: the bot dares whoever accepts first.
    pub async fn random_dare(&self) -> anyhow::Result<()> {
        let channel = self.channel(Target::TruthOrDare)?;
        self.issue_dare(channel, SYSTEM_CHALLENGER).await?;
        Ok(())
    }

    pub async fn dare_event(&self, actor: &Actor, id: &str, event: DareEvent) -> WorkflowResult<Reply> {
        let dare = self
            .store
            .get_dare(id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound("Dare".to_string()))?;
        let t = dare_transition(&dare, event, actor.id, &self.config.dares)?;
        if !self
            .store
            .apply_dare(id, t.from, dare.victim_id, t.to, t.victim_id, t.payout)
            .await?
        {
            return Err(WorkflowError::Conflict);
        }
        info!(
            "[dare] {} {} -> {} by {}",
            id,
            t.from.as_str(),
            t.to.as_str(),
            actor.id
        );

        let updated = Dare {
            status: t.to,
            victim_id: t.victim_id,
            ..dare
        };
        let follow_up = match (t.to, t.payout) {
            (DareStatus::Completed, Some(p)) if t.auto_approved => Some(format!(
                "🤖 Bot says: Good job! {} earned **{} Us-Bucks**.",
                mention(p.user_id),
                p.amount
            )),
            (DareStatus::Completed, Some(p)) => Some(format!(
                "💸 **Cha-ching!** {} earned **{} Us-Bucks**.",
                mention(p.user_id),
                p.amount
            )),
            (DareStatus::WaitingApproval, _) if updated.is_system() => Some(format!(
                "🔔 Someone other than {} please verify this dare!",
                mention(actor.id)
            )),
            (DareStatus::WaitingApproval, _) => Some(format!(
                "🔔 {}, please verify the dare!",
                mention(updated.challenger_id)
            )),
            (DareStatus::InProgress, _) if event == DareEvent::Reject => updated
                .victim_id
                .map(|v| format!("⚠️ {}, that didn't count! Try again.", mention(v))),
            _ => None,
        };
        if let Some(text) = follow_up {
            let channel = updated.message.map(|h| h.channel_id);
            match channel {
                Some(c) => {
                    if let Err(e) = self.notifier.post(c, OutboundMessage::text(text)).await {
                        warn!("[dare] Follow-up for {} failed: {}", id, e);
                    }
                }
                None => self.announce(Target::TruthOrDare, OutboundMessage::text(text)).await,
            }
        }
        Ok(Reply::Update(render::dare_message(&updated)))
    }
}
