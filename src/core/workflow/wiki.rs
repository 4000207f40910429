use tracing::{info, warn};

use super::commands::split_args;
use super::render;
use super::{Actor, Engine, IncomingMessage, Reply, WorkflowError, WorkflowResult};
use crate::core::notify::AttachmentRef;

impl Engine {
    /// `!remember <key> <value>`; an attached image is stored by reference.
    pub async fn remember(&self, msg: &IncomingMessage, args: &str) -> WorkflowResult<Reply> {
        let mut tokens = split_args(args).into_iter();
        let Some(key) = tokens.next() else {
            return Err(WorkflowError::Invalid(
                "Usage: `!remember <key> <value>` (attach an image to save it too)".into(),
            ));
        };
        let value = tokens.collect::<Vec<String>>().join(" ");
        let content = (!value.trim().is_empty()).then_some(value.trim());
        let attachment = (!msg.attachments.is_empty()).then_some(AttachmentRef(msg.handle));
        if content.is_none() && attachment.is_none() {
            return Err(WorkflowError::Invalid(
                "❌ You need to provide text or an image!".into(),
            ));
        }
        self.store
            .set_wiki_entry(&key, content, attachment, &msg.author_name)
            .await?;
        info!("[wiki] '{}' saved by {}", key.to_lowercase(), msg.author_id);
        Ok(Reply::React("✅".to_string()))
    }

    pub async fn wiki_index(&self) -> WorkflowResult<Reply> {
        let keys = self.store.wiki_keys().await?;
        Ok(Reply::Say(render::wiki_index(&keys)))
    }

    /// `!get <key>`: the entry is sent by DM.
    pub async fn wiki_get(&self, actor: &Actor, key: &str) -> WorkflowResult<Reply> {
        let key = key.trim().trim_matches('"');
        if key.is_empty() {
            return Err(WorkflowError::Invalid("Usage: `!get <key>`".into()));
        }
        let Some(entry) = self.store.get_wiki_entry(key).await? else {
            return Ok(Reply::say(format!("❌ Record not found: **{}**", key)));
        };
        let url = match entry.attachment {
            Some(a) => match self.notifier.attachment_url(a).await {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!("[wiki] Image for '{}' unavailable: {}", entry.key, e);
                    None
                }
            },
            None => None,
        };
        match self
            .notifier
            .direct(actor.id, render::wiki_entry(&entry, url))
            .await
        {
            Ok(_) => Ok(Reply::React("📩".to_string())),
            Err(e) => {
                warn!("[wiki] DM to {} failed: {}", actor.id, e);
                Ok(Reply::say("❌ I couldn't DM you. Enable DMs and try again!"))
            }
        }
    }
}
