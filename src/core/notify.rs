use anyhow::Result;
use async_trait::async_trait;
use std::str::FromStr;

use crate::core::config::Target;

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("malformed message reference '{0}'")]
pub struct BadReference(pub String);

/// A posted message, addressable for later edits. Persisted as
/// `channel_id|message_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageHandle {
    pub channel_id: u64,
    pub message_id: u64,
}

impl std::fmt::Display for MessageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}|{}", self.channel_id, self.message_id)
    }
}

impl FromStr for MessageHandle {
    type Err = BadReference;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (c, m) = s
            .split_once('|')
            .ok_or_else(|| BadReference(s.to_string()))?;
        let channel_id = c.trim().parse().map_err(|_| BadReference(s.to_string()))?;
        let message_id = m.trim().parse().map_err(|_| BadReference(s.to_string()))?;
        Ok(Self {
            channel_id,
            message_id,
        })
    }
}

/// The first attachment of a stored message. The message must stay alive for
/// the file to remain fetchable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttachmentRef(pub MessageHandle);

impl std::fmt::Display for AttachmentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for AttachmentRef {
    type Err = BadReference;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(AttachmentRef)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonStyle {
    Primary,
    Secondary,
    Success,
    Danger,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Button {
    pub custom_id: String,
    pub label: String,
    pub style: ButtonStyle,
}

impl Button {
    pub fn new(custom_id: impl Into<String>, label: &str, style: ButtonStyle) -> Self {
        Self {
            custom_id: custom_id.into(),
            label: label.to_string(),
            style,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CardField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Platform-neutral rich embed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Card {
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: u32,
    pub fields: Vec<CardField>,
    pub footer: Option<String>,
    pub image_url: Option<String>,
}

impl Card {
    pub fn new(title: impl Into<String>, color: u32) -> Self {
        Self {
            title: Some(title.into()),
            color,
            ..Default::default()
        }
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(CardField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(text.into());
        self
    }

    pub fn image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileAttachment {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutboundMessage {
    pub content: Option<String>,
    pub card: Option<Card>,
    pub buttons: Vec<Button>,
    pub file: Option<FileAttachment>,
}

impl OutboundMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn card(card: Card) -> Self {
        Self {
            card: Some(card),
            ..Default::default()
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_buttons(mut self, buttons: Vec<Button>) -> Self {
        self.buttons = buttons;
        self
    }

    pub fn with_file(mut self, file: FileAttachment) -> Self {
        self.file = Some(file);
        self
    }
}

/// Outbound side of the chat platform.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn post(&self, channel_id: u64, message: OutboundMessage) -> Result<MessageHandle>;

    async fn edit(&self, handle: MessageHandle, message: OutboundMessage) -> Result<()>;

    async fn delete(&self, handle: MessageHandle) -> Result<()>;

    async fn direct(&self, user_id: u64, message: OutboundMessage) -> Result<MessageHandle>;

    /// Download the first attachment of the referenced message.
    async fn fetch_attachment(&self, attachment: AttachmentRef) -> Result<FileAttachment>;

    /// A fresh URL for the first attachment of the referenced message.
    async fn attachment_url(&self, attachment: AttachmentRef) -> Result<String>;
}

#[cfg(test)]
pub use recording::{Delivery, RecordingNotifier};


/// Channel name as users see it, for operator-facing notices.
pub fn describe_target(target: Target) -> String {
    format!("#{}", target.as_str().replace('_', "-"))
}
