use std::sync::Arc;
use tracing::{error, info};

use super::decision::preset;
use super::render;
use super::{
    Actor, Affordance, AffordanceKind, BountyEvent, DareEvent, DeliveryMode, Engine,
    IncomingMessage, Reply, WorkflowError, WorkflowResult,
};
use crate::core::config::Target;
use crate::core::notify::AttachmentRef;

const PREFIX: char = '!';

/// Split on whitespace, keeping double-quoted runs together.
pub(super) fn split_args(input: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut pending = false;
    for c in input.chars() {
        match c {
            '"' | '“' | '”' => {
                quoted = !quoted;
                pending = true;
            }
            c if c.is_whitespace() && !quoted => {
                if pending {
                    out.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            c => {
                current.push(c);
                pending = true;
            }
        }
    }
    if pending {
        out.push(current);
    }
    out
}

/// `!name rest` to `("name", "rest")`; the name is lower-cased.
pub(super) fn parse_command(content: &str) -> Option<(String, &str)> {
    let body = content.trim().strip_prefix(PREFIX)?;
    let (name, rest) = match body.split_once(char::is_whitespace) {
        Some((n, r)) => (n, r.trim()),
        None => (body, ""),
    };
    if name.is_empty() {
        return None;
    }
    Some((name.to_lowercase(), rest))
}

fn or_default<'a>(text: &'a str, fallback: &'a str) -> &'a str {
    if text.trim().is_empty() { fallback } else { text.trim() }
}

impl Engine {
    /// Every message the bot can see. Non-commands outside the capsule
    /// channel are ignored.
    pub async fn on_message(self: &Arc<Self>, msg: &IncomingMessage) -> Reply {
        let result = self.route_message(msg).await;
        self.finish("message", result)
    }

    pub async fn on_button(self: &Arc<Self>, actor: &Actor, custom_id: &str) -> Reply {
        let result = match Affordance::parse(custom_id) {
            Some(a) => self.route_button(actor, a).await,
            None => Err(WorkflowError::Transition(
                super::TransitionError::NotAllowed("This button has expired."),
            )),
        };
        self.finish(custom_id, result)
    }

    pub async fn on_modal(self: &Arc<Self>, actor: &Actor, custom_id: &str, values: &[String]) -> Reply {
        let result = match Affordance::parse(custom_id) {
            Some(a) => {
                let value = values.first().map(String::as_str).unwrap_or("");
                self.route_modal(actor, a, value).await
            }
            None => Err(WorkflowError::NotFound("Form".into())),
        };
        self.finish(custom_id, result)
    }

    fn finish(&self, context: &str, result: WorkflowResult<Reply>) -> Reply {
        match result {
            Ok(reply) => reply,
            Err(WorkflowError::Infra(e)) => {
                error!("[workflow] {} failed: {:#}", context, e);
                Reply::private(WorkflowError::Infra(e).user_message())
            }
            Err(e) => {
                info!("[workflow] {} refused: {}", context, e);
                Reply::private(e.user_message())
            }
        }
    }

    async fn route_message(self: &Arc<Self>, msg: &IncomingMessage) -> WorkflowResult<Reply> {
        let channel_id = msg.handle.channel_id;
        if self.is_channel(Target::AudioCapsule, channel_id)
            && msg.attachments.iter().any(|a| a.is_audio())
        {
            return self.capsule_upload(msg).await;
        }
        let Some((name, args)) = parse_command(&msg.content) else {
            return Ok(Reply::None);
        };
        let actor = Actor {
            id: msg.author_id,
            name: msg.author_name.clone(),
        };
        info!("[workflow] !{} from {}", name, msg.author_id);

        match name.as_str() {
            "bounty" => {
                let (reward, task) = args.split_once(char::is_whitespace).unwrap_or((args, ""));
                let reward: i64 = reward.trim().parse().map_err(|_| {
                    WorkflowError::Invalid("Usage: `!bounty <reward> <task>`".into())
                })?;
                self.create_bounty(&actor, reward, task).await
            }
            "dare" => {
                self.issue_dare(channel_id, msg.author_id).await?;
                Ok(Reply::None)
            }
            "food" | "movie" | "date" | "book" | "tv" => match preset(&name) {
                Some(p) => self.ai_poll(p, args).await,
                None => Ok(Reply::None),
            },
            "decide" => {
                let mut tokens = split_args(args).into_iter();
                let question = tokens.next().unwrap_or_default();
                self.create_poll(&question, tokens.collect()).await
            }
            "remind" => self.set_reminder(msg, args, false).await,
            "ping" => self.set_reminder(msg, args, true).await,
            "shop" => self.shop_command(channel_id).await,
            "wallet" | "balance" => self.wallet(&actor).await,
            "remember" => self.remember(msg, args).await,
            "wiki" => self.wiki_index().await,
            "get" => self.wiki_get(&actor, args).await,
            "snap" => self.snap_submit(msg, or_default(args, "Snap!")).await,
            "log" => self.log_moment(msg, or_default(args, "A moment")).await,
            "flashback" => self.flashback().await,
            "need" => self.need_capsule(args).await,
            "mixtape" => self.mixtape().await,
            "watch" => self.watch(channel_id, args).await,
            "backup" => self.backup_command().await,
            "update" => self.refresh_boards().await,
            "test_q" => {
                self.post_daily_question().await?;
                Ok(Reply::React("✅".to_string()))
            }
            "test_dare" => {
                self.random_dare().await?;
                Ok(Reply::React("✅".to_string()))
            }
            "test_snap" => {
                self.trigger_snap(msg.author_id).await?;
                Ok(Reply::React("✅".to_string()))
            }
            _ => Ok(Reply::None),
        }
    }

    async fn route_button(self: &Arc<Self>, actor: &Actor, a: Affordance) -> WorkflowResult<Reply> {
        let unknown = || WorkflowError::NotFound("Action".to_string());
        match a.kind {
            AffordanceKind::Bounty => {
                let event = BountyEvent::from_action(&a.action).ok_or_else(unknown)?;
                let id: i64 = a.entity_id.parse().map_err(|_| unknown())?;
                self.bounty_event(actor, id, event).await
            }
            AffordanceKind::Dare => {
                let event = DareEvent::from_action(&a.action).ok_or_else(unknown)?;
                self.dare_event(actor, &a.entity_id, event).await
            }
            AffordanceKind::Capsule => {
                let mode = DeliveryMode::from_action(&a.action).ok_or_else(unknown)?;
                let attachment: AttachmentRef = a.entity_id.parse().map_err(|_| unknown())?;
                self.capsule_choice(actor, mode, attachment).await
            }
            AffordanceKind::Question if a.action == "answer" => self.answer_form(&a.entity_id).await,
            AffordanceKind::Poll if a.action == "spin" => self.spin_poll(&a.entity_id).await,
            AffordanceKind::Shop if a.action == "buy" => Ok(Reply::Modal(render::purchase_form())),
            AffordanceKind::Shop if a.action == "wallet" => self.wallet(actor).await,
            AffordanceKind::Watch if a.action == "ready" => self.watch_ready(actor, &a.entity_id).await,
            _ => Err(unknown()),
        }
    }

    async fn route_modal(&self, actor: &Actor, a: Affordance, value: &str) -> WorkflowResult<Reply> {
        match (a.kind, a.action.as_str()) {
            (AffordanceKind::Capsule, "label") => {
                let attachment: AttachmentRef = a
                    .entity_id
                    .parse()
                    .map_err(|_| WorkflowError::NotFound("Capsule".into()))?;
                self.capsule_label(actor, attachment, value).await
            }
            (AffordanceKind::Question, "answer") => self.submit_answer(actor, &a.entity_id, value).await,
            (AffordanceKind::Shop, "purchase") => self.purchase(actor, value).await,
            _ => Err(WorkflowError::NotFound("Form".into())),
        }
    }
}
