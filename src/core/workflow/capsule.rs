use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use rand::Rng;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::render::{self, mention};
use super::{Actor, Engine, IncomingMessage, Reply, WorkflowError, WorkflowResult};
use crate::core::config::Target;
use crate::core::notify::{AttachmentRef, OutboundMessage};
use crate::core::scheduler::{JobHandle, action, next_cron_fire};
use crate::core::store::types::CapsuleStatus;

const SURPRISE_MIN_MINUTES: i64 = 60;
const SURPRISE_MAX_MINUTES: i64 = 4320;
const RECOVERY_DELAY_SECS: i64 = 10;
pub const MIXTAPE_SIZE: usize = 10;

/// The three delivery choices offered after an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    Surprise,
    FirstLight,
    OpenWhen,
}

impl DeliveryMode {
    pub fn from_action(s: &str) -> Option<Self> {
        match s {
            "surprise" => Some(DeliveryMode::Surprise),
            "morning" => Some(DeliveryMode::FirstLight),
            "label" => Some(DeliveryMode::OpenWhen),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// Another fire or request archived it first.
    AlreadyArchived,
    /// The backed-up message is gone; the capsule stays where it was.
    Lost,
    Missing,
}

pub fn surprise_delay<R: Rng>(rng: &mut R) -> Duration {
    Duration::minutes(rng.gen_range(SURPRISE_MIN_MINUTES..=SURPRISE_MAX_MINUTES))
}

/// Overdue capsules fire shortly after startup instead of being dropped.
pub fn recovery_fire_time(deliver_at: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if deliver_at <= now {
        now + Duration::seconds(RECOVERY_DELAY_SECS)
    } else {
        deliver_at
    }
}

/// Labels are matched case-insensitively and must be 2 to 20 characters.
pub fn normalize_label(raw: &str) -> Option<String> {
    let label = raw.trim().to_lowercase();
    let len = label.chars().count();
    (2..=20).contains(&len).then_some(label)
}

fn delivery_reason(label: Option<&str>) -> String {
    match label {
        Some("random") => "🎲 **Surprise Delivery!**".to_string(),
        Some("morning") => "☀️ **Good Morning!**".to_string(),
        Some(other) => format!("🏷️ **Open When You're {}**", title_case(other)),
        None => "📬 **Restored Delivery**".to_string(),
    }
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

impl Engine {
    /// An audio file landed in the capsule channel: back it up, remove the
    /// original and ask the sender how to deliver it.
    pub async fn capsule_upload(&self, msg: &IncomingMessage) -> WorkflowResult<Reply> {
        let backup_channel = self.channel(Target::DebugLogs)?;
        let file = self.notifier.fetch_attachment(AttachmentRef(msg.handle)).await?;
        let backup = self
            .notifier
            .post(backup_channel, render::capsule_backup(&msg.author_name, file))
            .await?;
        if let Err(e) = self.notifier.delete(msg.handle).await {
            warn!("[capsule] Could not delete original upload {}: {}", msg.handle, e);
        }
        let attachment = AttachmentRef(backup);
        info!("[capsule] Backed up upload from {} as {}", msg.author_id, attachment);

        if let Err(e) = self
            .notifier
            .direct(msg.author_id, render::capsule_choices(attachment))
            .await
        {
            warn!("[capsule] DM to {} failed: {}", msg.author_id, e);
            self.announce(
                Target::AudioCapsule,
                OutboundMessage::text(format!(
                    "{}, enable DMs so I can ask when to deliver your capsule!",
                    mention(msg.author_id)
                )),
            )
            .await;
        }
        Ok(Reply::None)
    }

    /// One of the three DM buttons was clicked.
    pub async fn capsule_choice(
        self: &Arc<Self>,
        actor: &Actor,
        mode: DeliveryMode,
        attachment: AttachmentRef,
    ) -> WorkflowResult<Reply> {
        if self.store.capsule_for_attachment(attachment).await?.is_some() {
            return Ok(Reply::private("📦 This capsule is already on its way."));
        }
        let now = self.now();
        match mode {
            DeliveryMode::Surprise => {
                let delay = surprise_delay(&mut rand::thread_rng());
                let deliver_at = now + delay;
                let Some(id) = self
                    .store
                    .add_capsule(
                        actor.id,
                        attachment,
                        Some("random"),
                        Some(deliver_at),
                        CapsuleStatus::Pending,
                        now,
                    )
                    .await?
                else {
                    return Ok(Reply::private("📦 This capsule is already on its way."));
                };
                self.schedule_capsule(id, deliver_at, delivery_reason(Some("random")))
                    .await?;
                Ok(Reply::private(format!(
                    "🤐 **Buried!** It will surface in about {} hours.",
                    delay.num_hours().max(1)
                )))
            }
            DeliveryMode::FirstLight => {
                let tz: Tz = self
                    .config
                    .partner_of(actor.id)
                    .map(|p| p.tz)
                    .unwrap_or(self.config.home_tz);
                let hour = self.config.schedule.first_light_hour;
                let deliver_at = next_cron_fire(now, hour, 0, tz);
                let Some(id) = self
                    .store
                    .add_capsule(
                        actor.id,
                        attachment,
                        Some("morning"),
                        Some(deliver_at),
                        CapsuleStatus::Pending,
                        now,
                    )
                    .await?
                else {
                    return Ok(Reply::private("📦 This capsule is already on its way."));
                };
                self.schedule_capsule(id, deliver_at, delivery_reason(Some("morning")))
                    .await?;
                Ok(Reply::private(format!(
                    "🌅 **Scheduled!** Delivery at {:02}:00 their time.",
                    hour
                )))
            }
            DeliveryMode::OpenWhen => Ok(Reply::Modal(render::capsule_label_form(attachment))),
        }
    }

    /// The Open When modal came back with a label.
    pub async fn capsule_label(&self, actor: &Actor, attachment: AttachmentRef, raw: &str) -> WorkflowResult<Reply> {
        let label = normalize_label(raw).ok_or_else(|| {
            WorkflowError::Invalid("❌ Labels must be 2 to 20 characters.".into())
        })?;
        if self.store.capsule_for_attachment(attachment).await?.is_some() {
            return Ok(Reply::private("📦 This capsule is already on its way."));
        }
        let stored = self
            .store
            .add_capsule(
                actor.id,
                attachment,
                Some(&label),
                None,
                CapsuleStatus::OpenWhen,
                self.now(),
            )
            .await?;
        if stored.is_none() {
            return Ok(Reply::private("📦 This capsule is already on its way."));
        }
        info!("[capsule] Open When '{}' saved by {}", label, actor.id);
        Ok(Reply::private(format!(
            "🏷️ **Saved!** Your partner can listen by typing `!need {}`.",
            label
        )))
    }

    async fn schedule_capsule(
        self: &Arc<Self>,
        id: i64,
        fire_at: DateTime<Utc>,
        reason: String,
    ) -> anyhow::Result<JobHandle> {
        let engine = Arc::clone(self);
        let handle = self
            .scheduler
            .schedule_once(
                &format!("capsule-{}", id),
                fire_at.with_timezone(&chrono_tz::UTC),
                action(move || {
                    let engine = Arc::clone(&engine);
                    let reason = reason.clone();
                    async move {
                        engine.deliver_capsule(id, &reason).await?;
                        Ok(())
                    }
                }),
            )
            .await?;
        info!("[capsule] #{} scheduled for {}", id, fire_at);
        Ok(handle)
    }

    /// Fetch, claim, post. Safe to call twice: the second call sees the
    /// capsule archived and does nothing.
    pub async fn deliver_capsule(&self, id: i64, reason: &str) -> anyhow::Result<DeliveryOutcome> {
        let Some(capsule) = self.store.get_capsule(id).await? else {
            warn!("[capsule] #{} vanished before delivery", id);
            return Ok(DeliveryOutcome::Missing);
        };
        if capsule.status == CapsuleStatus::Archived {
            info!("[capsule] #{} already delivered", id);
            return Ok(DeliveryOutcome::AlreadyArchived);
        }
        let channel = self.channel(Target::AudioCapsule)?;

        let file = match self.notifier.fetch_attachment(capsule.attachment).await {
            Ok(file) => file,
            Err(e) => {
                error!("[capsule] #{} source lost: {}", id, e);
                self.notifier
                    .post(
                        channel,
                        OutboundMessage::text(format!(
                            "⚠️ **Error:** A capsule from {} got lost in the mail (source message deleted).",
                            mention(capsule.sender_id)
                        )),
                    )
                    .await?;
                return Ok(DeliveryOutcome::Lost);
            }
        };

        if !self.store.archive_capsule(id, capsule.status).await? {
            return Ok(DeliveryOutcome::AlreadyArchived);
        }
        if let Err(e) = self
            .notifier
            .post(channel, render::capsule_delivery(&capsule, reason, file))
            .await
        {
            self.store.restore_capsule(id, capsule.status).await?;
            return Err(e);
        }
        info!("[capsule] #{} delivered", id);
        Ok(DeliveryOutcome::Delivered)
    }

    /// `!need <label>`: open the oldest matching Open When capsule.
    pub async fn need_capsule(&self, raw_label: &str) -> WorkflowResult<Reply> {
        let label = raw_label.trim().to_lowercase();
        if label.is_empty() {
            return Err(WorkflowError::Invalid("Usage: `!need <label>`".into()));
        }
        let Some(capsule) = self.store.oldest_open_when(&label).await? else {
            return Ok(Reply::say(format!(
                "💔 No capsules found for **'{}'**. Maybe ask your partner to record one?",
                label
            )));
        };
        match self
            .deliver_capsule(capsule.id, &delivery_reason(Some(&label)))
            .await?
        {
            DeliveryOutcome::Delivered => Ok(Reply::React("💌".to_string())),
            DeliveryOutcome::Lost => Ok(Reply::None),
            DeliveryOutcome::AlreadyArchived | DeliveryOutcome::Missing => Err(WorkflowError::Conflict),
        }
    }

    pub async fn mixtape(&self) -> WorkflowResult<Reply> {
        let capsules = self.store.mixtape(MIXTAPE_SIZE).await?;
        Ok(Reply::Say(render::mixtape(&capsules)))
    }

    /// Re-register every PENDING capsule after a restart.
    pub async fn recover_capsules(self: &Arc<Self>) -> anyhow::Result<usize> {
        let now = self.now();
        let pending = self.store.list_pending_capsules().await?;
        for capsule in &pending {
            let fire_at = recovery_fire_time(capsule.deliver_at.unwrap_or(now), now);
            self.schedule_capsule(capsule.id, fire_at, delivery_reason(capsule.label.as_deref()))
                .await?;
        }
        if !pending.is_empty() {
            info!("[capsule] Restored {} pending deliveries", pending.len());
        }
        Ok(pending.len())
    }
}
