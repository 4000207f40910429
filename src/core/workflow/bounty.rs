use tracing::{info, warn};

use super::render::{self, mention};
use super::{Actor, Engine, Reply, TransitionError, WorkflowError, WorkflowResult};
use crate::core::config::Target;
use crate::core::notify::OutboundMessage;
use crate::core::store::types::{Bounty, BountyStatus, Payout};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BountyEvent {
    Claim,
    Submit,
    Approve,
    Reject,
    Cancel,
    Forfeit,
}

impl BountyEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            BountyEvent::Claim => "claim",
            BountyEvent::Submit => "submit",
            BountyEvent::Approve => "approve",
            BountyEvent::Reject => "reject",
            BountyEvent::Cancel => "cancel",
            BountyEvent::Forfeit => "forfeit",
        }
    }

    pub fn from_action(s: &str) -> Option<Self> {
        match s {
            "claim" => Some(BountyEvent::Claim),
            "submit" => Some(BountyEvent::Submit),
            "approve" => Some(BountyEvent::Approve),
            "reject" => Some(BountyEvent::Reject),
            "cancel" => Some(BountyEvent::Cancel),
            "forfeit" => Some(BountyEvent::Forfeit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BountyTransition {
    pub from: BountyStatus,
    pub to: BountyStatus,
    pub worker_id: Option<u64>,
    pub payout: Option<Payout>,
}

/// Decide what `event` by `actor` does to `bounty`. Pure: money only moves
/// when the store applies the returned payout.
pub fn bounty_transition(
    bounty: &Bounty,
    event: BountyEvent,
    actor: u64,
) -> Result<BountyTransition, TransitionError> {
    let invalid = TransitionError::InvalidState {
        event: event.as_str(),
        status: bounty.status.as_str(),
    };
    let is_employer = actor == bounty.employer_id;
    let is_worker = bounty.worker_id == Some(actor);
    let step = |to, worker_id, payout| BountyTransition {
        from: bounty.status,
        to,
        worker_id,
        payout,
    };

    match (event, bounty.status) {
        (BountyEvent::Claim, BountyStatus::Open) => {
            if is_employer {
                return Err(TransitionError::NotAllowed("You can't claim your own bounty!"));
            }
            Ok(step(BountyStatus::InProgress, Some(actor), None))
        }
        (BountyEvent::Submit, BountyStatus::InProgress) => {
            if !is_worker {
                return Err(TransitionError::NotAllowed("Only the worker can submit this bounty."));
            }
            Ok(step(BountyStatus::WaitingApproval, bounty.worker_id, None))
        }
        (BountyEvent::Forfeit, BountyStatus::InProgress) => {
            if !is_worker {
                return Err(TransitionError::NotAllowed("Only the worker can give up this bounty."));
            }
            Ok(step(BountyStatus::Open, None, None))
        }
        (BountyEvent::Approve, BountyStatus::WaitingApproval) => {
            if !is_employer {
                return Err(TransitionError::NotAllowed("Only the employer can approve payment!"));
            }
            let worker = bounty.worker_id.ok_or(invalid)?;
            Ok(step(
                BountyStatus::Completed,
                Some(worker),
                Some(Payout {
                    user_id: worker,
                    amount: bounty.reward,
                }),
            ))
        }
        (BountyEvent::Reject, BountyStatus::WaitingApproval) => {
            if !is_employer {
                return Err(TransitionError::NotAllowed("Only the employer can reject the work!"));
            }
            Ok(step(BountyStatus::InProgress, bounty.worker_id, None))
        }
        (BountyEvent::Cancel, BountyStatus::Open | BountyStatus::InProgress) => {
            if !is_employer {
                return Err(TransitionError::NotAllowed("Only the employer can cancel this bounty!"));
            }
            Ok(step(
                BountyStatus::Cancelled,
                bounty.worker_id,
                Some(Payout {
                    user_id: bounty.employer_id,
                    amount: bounty.reward,
                }),
            ))
        }
        _ => Err(invalid),
    }
}

impl Engine {
    /// `!bounty <reward> <task>`: escrow the reward and post the card.
    pub async fn create_bounty(&self, employer: &Actor, reward: i64, task: &str) -> WorkflowResult<Reply> {
        if reward <= 0 {
            return Err(WorkflowError::Invalid("❌ Reward must be a positive number.".into()));
        }
        let task = task.trim();
        if task.is_empty() {
            return Err(WorkflowError::Invalid("Usage: `!bounty <reward> <task>`".into()));
        }
        let channel = self.channel(Target::BountyBoard)?;

        let Some(id) = self.store.open_bounty(employer.id, task, reward).await? else {
            let available = self.store.balance(employer.id).await?;
            return Err(WorkflowError::InsufficientFunds {
                needed: reward,
                available,
            });
        };
        let bounty = self
            .store
            .get_bounty(id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("Bounty #{}", id)))?;

        match self.notifier.post(channel, render::bounty_message(&bounty)).await {
            Ok(handle) => self.store.set_bounty_message(id, handle).await?,
            Err(e) => {
                // Nobody can act on an unposted bounty; hand the escrow back.
                warn!("[bounty] Board post for #{} failed, refunding: {}", id, e);
                self.store
                    .apply_bounty(
                        id,
                        BountyStatus::Open,
                        None,
                        BountyStatus::Cancelled,
                        None,
                        Some(Payout {
                            user_id: employer.id,
                            amount: reward,
                        }),
                    )
                    .await?;
                return Err(WorkflowError::Infra(e));
            }
        }
        info!("[bounty] #{} opened by {} for {}", id, employer.id, reward);
        Ok(Reply::say(format!(
            "✅ Bounty posted! **{} Us-Bucks** are held in escrow.",
            reward
        )))
    }

    /// Apply a button event and return the re-rendered card.
    pub async fn bounty_event(&self, actor: &Actor, id: i64, event: BountyEvent) -> WorkflowResult<Reply> {
        let bounty = self
            .store
            .get_bounty(id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("Bounty #{}", id)))?;
        let t = bounty_transition(&bounty, event, actor.id)?;
        if !self
            .store
            .apply_bounty(id, t.from, bounty.worker_id, t.to, t.worker_id, t.payout)
            .await?
        {
            return Err(WorkflowError::Conflict);
        }
        info!(
            "[bounty] #{} {} -> {} by {}",
            id,
            t.from.as_str(),
            t.to.as_str(),
            actor.id
        );

        let updated = Bounty {
            status: t.to,
            worker_id: t.worker_id,
            ..bounty
        };
        match (event, t.payout) {
            (BountyEvent::Submit, _) => {
                self.announce(
                    Target::BountyBoard,
                    OutboundMessage::text(format!(
                        "🔔 {}, please review the work on **{}**!",
                        mention(updated.employer_id),
                        updated.description
                    )),
                )
                .await
            }
            (BountyEvent::Approve, Some(p)) => {
                self.announce(
                    Target::BountyBoard,
                    OutboundMessage::text(format!(
                        "💸 **Transaction Complete!** {} has received **{} Us-Bucks**.",
                        mention(p.user_id),
                        p.amount
                    )),
                )
                .await
            }
            (BountyEvent::Reject, _) => {
                if let Some(worker) = updated.worker_id {
                    self.announce(
                        Target::BountyBoard,
                        OutboundMessage::text(format!(
                            "⚠️ {}, the employer says it's not done yet. Keep going!",
                            mention(worker)
                        )),
                    )
                    .await
                }
            }
            _ => {}
        }
        Ok(Reply::Update(render::bounty_message(&updated)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPLOYER: u64 = 1;
    const WORKER: u64 = 2;

    fn bounty(status: BountyStatus, worker_id: Option<u64>) -> Bounty {
        Bounty {
            id: 7,
            description: "Fix the sink".into(),
            reward: 100,
            employer_id: EMPLOYER,
            worker_id,
            status,
            message: None,
        }
    }

    // --- Guards ---

    #[test]
    fn employer_cannot_claim_own_bounty() {
        let err = bounty_transition(&bounty(BountyStatus::Open, None), BountyEvent::Claim, EMPLOYER)
            .unwrap_err();
        assert!(matches!(err, TransitionError::NotAllowed(_)));
    }

    #[test]
    fn only_worker_submits_and_only_employer_approves() {
        let b = bounty(BountyStatus::InProgress, Some(WORKER));
        assert!(bounty_transition(&b, BountyEvent::Submit, EMPLOYER).is_err());
        let b = bounty(BountyStatus::WaitingApproval, Some(WORKER));
        assert!(bounty_transition(&b, BountyEvent::Approve, WORKER).is_err());
        assert!(bounty_transition(&b, BountyEvent::Reject, WORKER).is_err());
    }

    // --- Payouts ---

    #[test]
    fn approve_pays_worker_full_reward() {
        let b = bounty(BountyStatus::WaitingApproval, Some(WORKER));
        let t = bounty_transition(&b, BountyEvent::Approve, EMPLOYER).unwrap();
        assert_eq!(t.to, BountyStatus::Completed);
        assert_eq!(
            t.payout,
            Some(Payout {
                user_id: WORKER,
                amount: 100
            })
        );
    }

    #[test]
    fn cancel_refunds_employer_from_open_or_in_progress() {
        for b in [
            bounty(BountyStatus::Open, None),
            bounty(BountyStatus::InProgress, Some(WORKER)),
        ] {
            let t = bounty_transition(&b, BountyEvent::Cancel, EMPLOYER).unwrap();
            assert_eq!(t.to, BountyStatus::Cancelled);
            assert_eq!(t.payout.map(|p| p.user_id), Some(EMPLOYER));
        }
        let waiting = bounty(BountyStatus::WaitingApproval, Some(WORKER));
        assert!(bounty_transition(&waiting, BountyEvent::Cancel, EMPLOYER).is_err());
    }

    #[test]
    fn forfeit_reopens_without_money() {
        let b = bounty(BountyStatus::InProgress, Some(WORKER));
        let t = bounty_transition(&b, BountyEvent::Forfeit, WORKER).unwrap();
        assert_eq!(t.to, BountyStatus::Open);
        assert_eq!(t.worker_id, None);
        assert_eq!(t.payout, None);
    }

    #[test]
    fn terminal_states_reject_everything() {
        for status in [BountyStatus::Completed, BountyStatus::Cancelled] {
            let b = bounty(status, Some(WORKER));
            for event in [
                BountyEvent::Claim,
                BountyEvent::Submit,
                BountyEvent::Approve,
                BountyEvent::Reject,
                BountyEvent::Cancel,
                BountyEvent::Forfeit,
            ] {
                let err = bounty_transition(&b, event, EMPLOYER).unwrap_err();
                assert!(matches!(err, TransitionError::InvalidState { .. }));
            }
        }
    }
}
