use chrono::{DateTime, Utc};

use crate::core::notify::{AttachmentRef, MessageHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BountyStatus {
    Open,
    InProgress,
    WaitingApproval,
    Completed,
    Cancelled,
}

impl BountyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BountyStatus::Open => "OPEN",
            BountyStatus::InProgress => "IN_PROGRESS",
            BountyStatus::WaitingApproval => "WAITING_APPROVAL",
            BountyStatus::Completed => "COMPLETED",
            BountyStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn from_status(s: &str) -> Option<Self> {
        match s {
            "OPEN" => Some(BountyStatus::Open),
            "IN_PROGRESS" => Some(BountyStatus::InProgress),
            "WAITING_APPROVAL" => Some(BountyStatus::WaitingApproval),
            "COMPLETED" => Some(BountyStatus::Completed),
            "CANCELLED" => Some(BountyStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BountyStatus::Completed | BountyStatus::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bounty {
    pub id: i64,
    pub description: String,
    pub reward: i64,
    pub employer_id: u64,
    pub worker_id: Option<u64>,
    pub status: BountyStatus,
    pub message: Option<MessageHandle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DareStatus {
    Pending,
    InProgress,
    WaitingApproval,
    Completed,
}

impl DareStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DareStatus::Pending => "PENDING",
            DareStatus::InProgress => "IN_PROGRESS",
            DareStatus::WaitingApproval => "WAITING_APPROVAL",
            DareStatus::Completed => "COMPLETED",
        }
    }

    pub fn from_status(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(DareStatus::Pending),
            "IN_PROGRESS" => Some(DareStatus::InProgress),
            "WAITING_APPROVAL" => Some(DareStatus::WaitingApproval),
            "COMPLETED" => Some(DareStatus::Completed),
            _ => None,
        }
    }
}

/// Challenger id of dares the bot issued on its own.
pub const SYSTEM_CHALLENGER: u64 = 0;

#[derive(Debug, Clone, PartialEq)]
pub struct Dare {
    pub id: String,
    pub challenger_id: u64,
    pub victim_id: Option<u64>,
    pub task: String,
    pub reward: i64,
    pub status: DareStatus,
    pub message: Option<MessageHandle>,
}

impl Dare {
    pub fn is_system(&self) -> bool {
        self.challenger_id == SYSTEM_CHALLENGER
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapsuleStatus {
    Pending,
    OpenWhen,
    Archived,
}

impl CapsuleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapsuleStatus::Pending => "PENDING",
            CapsuleStatus::OpenWhen => "OPEN_WHEN",
            CapsuleStatus::Archived => "ARCHIVED",
        }
    }

    pub fn from_status(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(CapsuleStatus::Pending),
            "OPEN_WHEN" => Some(CapsuleStatus::OpenWhen),
            "ARCHIVED" => Some(CapsuleStatus::Archived),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Capsule {
    pub id: i64,
    pub sender_id: u64,
    pub attachment: AttachmentRef,
    pub label: Option<String>,
    pub deliver_at: Option<DateTime<Utc>>,
    pub status: CapsuleStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuestionRound {
    pub id: String,
    pub question: String,
    pub revealed: bool,
    pub message: Option<MessageHandle>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub user_id: u64,
    pub username: String,
    pub content: String,
}

/// What saving an answer changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedAnswer {
    /// The user had not answered this round before.
    pub first_answer: bool,
    /// Distinct users who have answered the round, this one included.
    pub submitters: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WikiEntry {
    pub key: String,
    pub content: Option<String>,
    pub attachment: Option<AttachmentRef>,
    pub added_by: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MomentSource {
    Snap,
    Log,
}

impl MomentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MomentSource::Snap => "SNAP",
            MomentSource::Log => "LOG",
        }
    }

    pub fn from_source(s: &str) -> Option<Self> {
        match s {
            "SNAP" => Some(MomentSource::Snap),
            "LOG" => Some(MomentSource::Log),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Moment {
    pub id: i64,
    pub user_id: u64,
    pub caption: String,
    pub attachment: Option<AttachmentRef>,
    pub timestamp: String,
    pub source: MomentSource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Poll {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub active_dares: i64,
    pub open_bounties: i64,
    pub pending_capsules: i64,
    pub answers_today: i64,
}

/// Money released by a state change, credited in the same transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payout {
    pub user_id: u64,
    pub amount: i64,
}
