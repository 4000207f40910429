use anyhow::{Context as _, Result, anyhow};
use async_trait::async_trait;
use serenity::Client;
use serenity::all::{
    ActionRow, ActionRowComponent, ButtonStyle as DiscordButtonStyle, ChannelId,
    ComponentInteraction, Context, CreateActionRow, CreateAttachment, CreateButton, CreateEmbed,
    CreateEmbedFooter, CreateInputText, CreateInteractionResponse,
    CreateInteractionResponseMessage, CreateMessage, CreateModal, EditMessage, EventHandler,
    GatewayIntents, Http, InputTextStyle, Interaction, Message, MessageId, ModalInteraction,
    ReactionType, Ready, ShardManager, User, UserId,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::core::lifecycle::LifecycleComponent;
use crate::core::notify::{
    AttachmentRef, Button, ButtonStyle, Card, FileAttachment, MessageHandle, Notifier,
    OutboundMessage,
};
use crate::core::workflow::{
    Actor, Engine, IncomingAttachment, IncomingMessage, ModalForm, Reply,
};

const BUTTONS_PER_ROW: usize = 5;
const RELAY_LIMIT: usize = 1900;

fn button_style(style: ButtonStyle) -> DiscordButtonStyle {
    match style {
        ButtonStyle::Primary => DiscordButtonStyle::Primary,
        ButtonStyle::Secondary => DiscordButtonStyle::Secondary,
        ButtonStyle::Success => DiscordButtonStyle::Success,
        ButtonStyle::Danger => DiscordButtonStyle::Danger,
    }
}

fn action_rows(buttons: &[Button]) -> Vec<CreateActionRow> {
    buttons
        .chunks(BUTTONS_PER_ROW)
        .map(|row| {
            CreateActionRow::Buttons(
                row.iter()
                    .map(|b| {
                        CreateButton::new(b.custom_id.clone())
                            .label(b.label.clone())
                            .style(button_style(b.style))
                    })
                    .collect(),
            )
        })
        .collect()
}

fn embed(card: &Card) -> CreateEmbed {
    let mut e = CreateEmbed::new().color(card.color);
    if let Some(title) = &card.title {
        e = e.title(title.clone());
    }
    if let Some(description) = &card.description {
        e = e.description(description.clone());
    }
    for f in &card.fields {
        e = e.field(f.name.clone(), f.value.clone(), f.inline);
    }
    if let Some(footer) = &card.footer {
        e = e.footer(CreateEmbedFooter::new(footer.clone()));
    }
    if let Some(url) = &card.image_url {
        e = e.image(url.clone());
    }
    e
}

fn create_message(message: OutboundMessage) -> CreateMessage {
    let mut m = CreateMessage::new();
    if let Some(content) = message.content {
        m = m.content(content);
    }
    if let Some(card) = &message.card {
        m = m.embed(embed(card));
    }
    if !message.buttons.is_empty() {
        m = m.components(action_rows(&message.buttons));
    }
    if let Some(file) = message.file {
        m = m.add_file(CreateAttachment::bytes(file.bytes, file.filename));
    }
    m
}

/// Edits replace every part of the message, so absent parts are cleared.
fn edit_message(message: OutboundMessage) -> EditMessage {
    EditMessage::new()
        .content(message.content.unwrap_or_default())
        .embeds(message.card.iter().map(embed).collect())
        .components(action_rows(&message.buttons))
}

fn response_message(message: OutboundMessage, replace: bool) -> CreateInteractionResponseMessage {
    let mut m = CreateInteractionResponseMessage::new();
    if replace {
        m = m
            .content(message.content.unwrap_or_default())
            .embeds(message.card.iter().map(embed).collect())
            .components(action_rows(&message.buttons));
    } else {
        if let Some(content) = message.content {
            m = m.content(content);
        }
        if let Some(card) = &message.card {
            m = m.embed(embed(card));
        }
        if !message.buttons.is_empty() {
            m = m.components(action_rows(&message.buttons));
        }
    }
    if let Some(file) = message.file {
        m = m.add_file(CreateAttachment::bytes(file.bytes, file.filename));
    }
    m
}

fn modal(form: &ModalForm) -> CreateModal {
    let rows = form
        .fields
        .iter()
        .map(|f| {
            let style = if f.paragraph {
                InputTextStyle::Paragraph
            } else {
                InputTextStyle::Short
            };
            let mut input = CreateInputText::new(style, f.label.clone(), f.custom_id.clone())
                .min_length(f.min_len)
                .max_length(f.max_len);
            if let Some(p) = &f.placeholder {
                input = input.placeholder(p.clone());
            }
            CreateActionRow::InputText(input)
        })
        .collect();
    CreateModal::new(form.custom_id.clone(), form.title.clone()).components(rows)
}

fn modal_values(rows: &[ActionRow]) -> Vec<String> {
    rows.iter()
        .flat_map(|row| row.components.iter())
        .filter_map(|c| match c {
            ActionRowComponent::InputText(input) => Some(input.value.clone().unwrap_or_default()),
            _ => None,
        })
        .collect()
}

fn actor(user: &User) -> Actor {
    Actor {
        id: user.id.get(),
        name: user.global_name.clone().unwrap_or_else(|| user.name.clone()),
    }
}

fn incoming(msg: &Message) -> IncomingMessage {
    IncomingMessage {
        handle: MessageHandle {
            channel_id: msg.channel_id.get(),
            message_id: msg.id.get(),
        },
        author_id: msg.author.id.get(),
        author_name: actor(&msg.author).name,
        content: msg.content.clone(),
        attachments: msg
            .attachments
            .iter()
            .map(|a| IncomingAttachment {
                filename: a.filename.clone(),
                content_type: a.content_type.clone(),
            })
            .collect(),
    }
}

/// Relay lines go out as code blocks cut to fit a single message.
fn relay_text(line: &str) -> String {
    let clipped: String = line.chars().take(RELAY_LIMIT).collect();
    format!("```\n{}\n```", clipped.replace("```", "'''"))
}

/// Outbound Discord REST calls.
pub struct DiscordNotifier {
    http: Arc<Http>,
    downloads: reqwest::Client,
}

impl DiscordNotifier {
    pub fn new(token: &str) -> Self {
        Self {
            http: Arc::new(Http::new(token)),
            downloads: reqwest::Client::new(),
        }
    }

    async fn fetch(&self, handle: MessageHandle) -> Result<Message> {
        ChannelId::new(handle.channel_id)
            .message(self.http.as_ref(), MessageId::new(handle.message_id))
            .await
            .with_context(|| format!("fetching message {}", handle))
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn post(&self, channel_id: u64, message: OutboundMessage) -> Result<MessageHandle> {
        let sent = ChannelId::new(channel_id)
            .send_message(self.http.as_ref(), create_message(message))
            .await?;
        Ok(MessageHandle {
            channel_id,
            message_id: sent.id.get(),
        })
    }

    async fn edit(&self, handle: MessageHandle, message: OutboundMessage) -> Result<()> {
        ChannelId::new(handle.channel_id)
            .edit_message(
                self.http.as_ref(),
                MessageId::new(handle.message_id),
                edit_message(message),
            )
            .await?;
        Ok(())
    }

    async fn delete(&self, handle: MessageHandle) -> Result<()> {
        ChannelId::new(handle.channel_id)
            .delete_message(self.http.as_ref(), MessageId::new(handle.message_id))
            .await?;
        Ok(())
    }

    async fn direct(&self, user_id: u64, message: OutboundMessage) -> Result<MessageHandle> {
        let dm = UserId::new(user_id)
            .create_dm_channel(self.http.as_ref())
            .await?;
        let sent = dm
            .id
            .send_message(self.http.as_ref(), create_message(message))
            .await?;
        Ok(MessageHandle {
            channel_id: dm.id.get(),
            message_id: sent.id.get(),
        })
    }

    async fn fetch_attachment(&self, attachment: AttachmentRef) -> Result<FileAttachment> {
        let msg = self.fetch(attachment.0).await?;
        let file = msg
            .attachments
            .first()
            .ok_or_else(|| anyhow!("message {} has no attachment", attachment))?;
        let bytes = self
            .downloads
            .get(&file.url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(FileAttachment {
            filename: file.filename.clone(),
            bytes: bytes.to_vec(),
        })
    }

    async fn attachment_url(&self, attachment: AttachmentRef) -> Result<String> {
        let msg = self.fetch(attachment.0).await?;
        msg.attachments
            .first()
            .map(|a| a.url.clone())
            .ok_or_else(|| anyhow!("message {} has no attachment", attachment))
    }
}

struct Handler {
    engine: Arc<Engine>,
    started: Arc<AtomicBool>,
}

impl Handler {
    async fn answer_component(&self, ctx: &Context, component: &ComponentInteraction) {
        let reply = self
            .engine
            .on_button(&actor(&component.user), &component.data.custom_id)
            .await;
        let response = match reply {
            Reply::Modal(form) => CreateInteractionResponse::Modal(modal(&form)),
            other => interaction_response(other),
        };
        if let Err(e) = component.create_response(&ctx.http, response).await {
            error!("[discord] Failed to answer button {}: {}", component.data.custom_id, e);
        }
    }

    async fn answer_modal(&self, ctx: &Context, submit: &ModalInteraction) {
        let values = modal_values(&submit.data.components);
        let reply = self
            .engine
            .on_modal(&actor(&submit.user), &submit.data.custom_id, &values)
            .await;
        let response = match reply {
            Reply::Modal(_) => {
                warn!("[discord] A modal cannot open another modal");
                CreateInteractionResponse::Acknowledge
            }
            other => interaction_response(other),
        };
        if let Err(e) = submit.create_response(&ctx.http, response).await {
            error!("[discord] Failed to answer form {}: {}", submit.data.custom_id, e);
        }
    }
}

fn interaction_response(reply: Reply) -> CreateInteractionResponse {
    match reply {
        Reply::Say(message) => CreateInteractionResponse::Message(response_message(message, false)),
        Reply::Private(text) => CreateInteractionResponse::Message(
            CreateInteractionResponseMessage::new()
                .content(text)
                .ephemeral(true),
        ),
        Reply::Update(message) => {
            CreateInteractionResponse::UpdateMessage(response_message(message, true))
        }
        Reply::React(emoji) => CreateInteractionResponse::Message(
            CreateInteractionResponseMessage::new()
                .content(emoji)
                .ephemeral(true),
        ),
        Reply::None | Reply::Modal(_) => CreateInteractionResponse::Acknowledge,
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        let reply = self.engine.on_message(&incoming(&msg)).await;
        let outcome = match reply {
            Reply::None => Ok(()),
            Reply::Say(message) => msg
                .channel_id
                .send_message(&ctx.http, create_message(message))
                .await
                .map(|_| ()),
            Reply::Private(text) => msg.reply(&ctx.http, text).await.map(|_| ()),
            Reply::React(emoji) => msg
                .react(&ctx.http, ReactionType::Unicode(emoji))
                .await
                .map(|_| ()),
            Reply::Update(_) | Reply::Modal(_) => {
                warn!("[discord] Dropping interaction-only reply to a plain message");
                Ok(())
            }
        };
        if let Err(e) = outcome {
            error!("[discord] Failed to reply in {}: {}", msg.channel_id, e);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Component(component) => self.answer_component(&ctx, &component).await,
            Interaction::Modal(submit) => self.answer_modal(&ctx, &submit).await,
            _ => {}
        }
    }

    async fn ready(&self, _: Context, ready: Ready) {
        info!("[discord] Connected as {}", ready.user.name);
        // Reconnects fire `ready` again; jobs are registered once.
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.engine.start().await {
            error!("[discord] Startup sequence failed: {:#}", e);
        }
    }
}

/// Gateway connection plus the WARN relay into the debug channel.
pub struct DiscordChannel {
    token: String,
    engine: Arc<Engine>,
    notifier: Arc<dyn Notifier>,
    relay: broadcast::Sender<String>,
    debug_channel: Option<u64>,
    shard_manager: Option<Arc<ShardManager>>,
    tasks: Vec<JoinHandle<()>>,
}

impl DiscordChannel {
    pub fn new(
        token: String,
        engine: Arc<Engine>,
        notifier: Arc<dyn Notifier>,
        relay: broadcast::Sender<String>,
    ) -> Self {
        let debug_channel = engine
            .config()
            .channels
            .id(crate::core::config::Target::DebugLogs);
        Self {
            token,
            engine,
            notifier,
            relay,
            debug_channel,
            shard_manager: None,
            tasks: Vec::new(),
        }
    }

    fn spawn_relay(&mut self) {
        let Some(channel) = self.debug_channel else {
            info!("[discord] No debug channel configured, log relay disabled");
            return;
        };
        let mut rx = self.relay.subscribe();
        let notifier = self.notifier.clone();
        self.tasks.push(tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    // Failures here are not logged: they would feed the relay.
                    Ok(line) => {
                        let _ = notifier
                            .post(channel, OutboundMessage::text(relay_text(&line)))
                            .await;
                    }
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        }));
    }
}

#[async_trait]
impl LifecycleComponent for DiscordChannel {
    async fn on_init(&mut self) -> Result<()> {
        info!("[discord] Channel interface initializing...");
        Ok(())
    }

    async fn on_start(&mut self) -> Result<()> {
        let handler = Handler {
            engine: self.engine.clone(),
            started: Arc::new(AtomicBool::new(false)),
        };

        let intents = GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT;

        let mut client = Client::builder(&self.token, intents)
            .event_handler(handler)
            .await
            .context("creating Discord client")?;
        self.shard_manager = Some(client.shard_manager.clone());

        self.spawn_relay();
        self.tasks.push(tokio::spawn(async move {
            if let Err(why) = client.start().await {
                error!("[discord] Client error: {:?}", why);
            }
        }));
        info!("[discord] Gateway client started");
        Ok(())
    }

    async fn on_shutdown(&mut self) -> Result<()> {
        info!("[discord] Channel interface shutting down...");
        if let Some(manager) = self.shard_manager.take() {
            manager.shutdown_all().await;
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
        Ok(())
    }
}
