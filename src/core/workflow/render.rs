//! Cards, buttons and forms for every workflow message.

use chrono::DateTime;
use chrono_tz::Tz;

use super::affordance::{AffordanceKind, custom_id};
use super::{ModalField, ModalForm};
use crate::core::config::ShopItem;
use crate::core::notify::{AttachmentRef, Button, ButtonStyle, Card, FileAttachment, OutboundMessage};
use crate::core::store::types::{
    Answer, Bounty, BountyStatus, Capsule, Dare, DareStatus, DashboardStats, Moment, MomentSource,
    Poll, WikiEntry,
};

pub const BLUE: u32 = 0x3498db;
pub const GREEN: u32 = 0x2ecc71;
pub const ORANGE: u32 = 0xe67e22;
pub const RED: u32 = 0xe74c3c;
pub const GOLD: u32 = 0xf1c40f;
pub const TEAL: u32 = 0x1abc9c;
pub const PURPLE: u32 = 0x9b59b6;
pub const MAGENTA: u32 = 0xad1457;
pub const PINK: u32 = 0xff69b4;
pub const GREY: u32 = 0x979c9f;
pub const BLURPLE: u32 = 0x5865f2;

pub fn mention(user_id: u64) -> String {
    format!("<@{}>", user_id)
}

// --- Bounty ---

pub fn bounty_message(bounty: &Bounty) -> OutboundMessage {
    let worker = bounty.worker_id.map(mention).unwrap_or_default();
    let (status, color) = match bounty.status {
        BountyStatus::Open => ("🟢 OPEN".to_string(), BLUE),
        BountyStatus::InProgress => (format!("🚧 In Progress by {}", worker), ORANGE),
        BountyStatus::WaitingApproval => (
            format!("⏳ Pending Approval from {}", mention(bounty.employer_id)),
            GOLD,
        ),
        BountyStatus::Completed => (format!("💰 PAID to {}", worker), GREEN),
        BountyStatus::Cancelled => ("❌ CANCELLED (Refunded)".to_string(), RED),
    };
    let card = Card::new("📜 WANTED: Task Assistance", color)
        .description(format!("**Task:** {}", bounty.description))
        .field("Status", status, true)
        .field("Reward", format!("💰 {} Us-Bucks", bounty.reward), true)
        .field("Employer", mention(bounty.employer_id), true)
        .footer(format!("Bounty #{}", bounty.id));

    let id = bounty.id;
    let button = |action: &str, label: &str, style| {
        Button::new(custom_id(AffordanceKind::Bounty, action, id), label, style)
    };
    let buttons = match bounty.status {
        BountyStatus::Open => vec![
            button("claim", "🙋 I'll do it!", ButtonStyle::Success),
            button("cancel", "🗑️ Cancel & Refund", ButtonStyle::Danger),
        ],
        BountyStatus::InProgress => vec![
            button("submit", "📩 Submit for Approval", ButtonStyle::Primary),
            button("forfeit", "🏳️ I Give Up (Unclaim)", ButtonStyle::Secondary),
            button("cancel", "🗑️ Force Cancel (Refund)", ButtonStyle::Danger),
        ],
        BountyStatus::WaitingApproval => vec![
            button("approve", "✅ Approve & Pay", ButtonStyle::Success),
            button("reject", "❌ Reject (Not Done)", ButtonStyle::Danger),
        ],
        BountyStatus::Completed | BountyStatus::Cancelled => Vec::new(),
    };
    OutboundMessage::card(card).with_buttons(buttons)
}

// --- Dare ---

pub fn dare_message(dare: &Dare) -> OutboundMessage {
    let (title, base_color) = if dare.is_system() {
        ("🎲 Random Daily Dare!", PURPLE)
    } else {
        ("🔥 New Dare!", RED)
    };
    let victim = dare.victim_id.map(mention).unwrap_or_default();
    let (status, color) = match dare.status {
        DareStatus::Pending => ("🟡 Waiting for a victim...".to_string(), base_color),
        DareStatus::InProgress => (format!("🚧 **IN PROGRESS** by {}", victim), ORANGE),
        DareStatus::WaitingApproval if dare.is_system() => (
            format!("⏳ **WAITING REVIEW** (anyone but {})", victim),
            GOLD,
        ),
        DareStatus::WaitingApproval => (
            format!("⏳ **WAITING REVIEW** from {}", mention(dare.challenger_id)),
            GOLD,
        ),
        DareStatus::Completed => (
            format!("🎉 **COMPLETED!** Paid {} Us-Bucks to {}", dare.reward, victim),
            GREEN,
        ),
    };
    let card = Card::new(title, color)
        .description(format!(
            "## **{}**\n\n💰 **Reward:** {} Us-Bucks",
            dare.task, dare.reward
        ))
        .field("Status", status, false);

    let id = dare.id.as_str();
    let button = |action: &str, label: &str, style| {
        Button::new(custom_id(AffordanceKind::Dare, action, id), label, style)
    };
    let buttons = match dare.status {
        DareStatus::Pending => vec![button("accept", "😈 I Accept", ButtonStyle::Danger)],
        DareStatus::InProgress => vec![button("done", "✅ I Did It (Mark Done)", ButtonStyle::Primary)],
        DareStatus::WaitingApproval => vec![
            button("approve", "💰 Verify & Pay", ButtonStyle::Success),
            button("reject", "❌ Not Done Yet", ButtonStyle::Danger),
        ],
        DareStatus::Completed => Vec::new(),
    };
    OutboundMessage::card(card).with_buttons(buttons)
}

// --- Audio capsules ---

pub fn capsule_choices(attachment: AttachmentRef) -> OutboundMessage {
    let button = |action: &str, label: &str, style| {
        Button::new(
            custom_id(AffordanceKind::Capsule, action, attachment),
            label,
            style,
        )
    };
    OutboundMessage::text("🎙️ **Capsule Secured!** How should I deliver this?").with_buttons(vec![
        button("surprise", "🎲 Surprise Me", ButtonStyle::Primary),
        button("morning", "🌅 First Light", ButtonStyle::Success),
        button("label", "🏷️ Open When...", ButtonStyle::Secondary),
    ])
}

pub fn capsule_label_form(attachment: AttachmentRef) -> ModalForm {
    ModalForm {
        custom_id: custom_id(AffordanceKind::Capsule, "label", attachment),
        title: "Label This Capsule".to_string(),
        fields: vec![ModalField {
            custom_id: "label".to_string(),
            label: "Open When You're...".to_string(),
            placeholder: Some("sad, bored, missing me".to_string()),
            min_len: 2,
            max_len: 20,
            paragraph: false,
        }],
    }
}

pub fn capsule_backup(sender_name: &str, file: FileAttachment) -> OutboundMessage {
    OutboundMessage::text(format!("💾 **Audio Backup** from {}", sender_name)).with_file(file)
}

pub fn capsule_delivery(capsule: &Capsule, reason: &str, file: FileAttachment) -> OutboundMessage {
    let card = Card::new("📬 Audio Capsule Delivery", PINK)
        .description(format!("{}\nA message from {}", reason, mention(capsule.sender_id)))
        .footer(format!(
            "Recorded {}",
            capsule.created_at.format("%Y-%m-%d %H:%M UTC")
        ));
    OutboundMessage::card(card).with_file(file)
}

pub fn mixtape(capsules: &[Capsule]) -> OutboundMessage {
    if capsules.is_empty() {
        return OutboundMessage::text("📼 The mixtape is empty. Record a capsule first!");
    }
    let lines: Vec<String> = capsules
        .iter()
        .map(|c| {
            format!(
                "• {} · {} · {}",
                c.created_at.format("%b %d"),
                c.label.as_deref().unwrap_or("unlabelled"),
                mention(c.sender_id)
            )
        })
        .collect();
    OutboundMessage::card(Card::new("📼 Mixtape", MAGENTA).description(lines.join("\n")))
}

// --- Daily question ---

pub fn question_message(round_id: &str, question: &str) -> OutboundMessage {
    let card = Card::new("🌞 Question of the Day", GOLD)
        .description(format!("**{}**", question))
        .footer("Answers stay hidden until you both reply.");
    OutboundMessage::card(card).with_buttons(vec![Button::new(
        custom_id(AffordanceKind::Question, "answer", round_id),
        "✍️ Answer Secretly",
        ButtonStyle::Primary,
    )])
}

pub fn answer_form(round_id: &str) -> ModalForm {
    ModalForm {
        custom_id: custom_id(AffordanceKind::Question, "answer", round_id),
        title: "Your Secret Answer".to_string(),
        fields: vec![ModalField {
            custom_id: "answer".to_string(),
            label: "Answer".to_string(),
            placeholder: None,
            min_len: 2,
            max_len: 1000,
            paragraph: true,
        }],
    }
}

pub fn reveal_message(question: &str, answers: &[Answer]) -> OutboundMessage {
    let card = answers.iter().fold(
        Card::new("🔓 Answers Revealed!", GREEN).description(format!("**Q:** {}", question)),
        |card, a| card.field(a.username.clone(), a.content.clone(), false),
    );
    OutboundMessage::card(card)
}

// --- Decision room ---

const NUMBERS: [&str; 10] = ["1️⃣", "2️⃣", "3️⃣", "4️⃣", "5️⃣", "6️⃣", "7️⃣", "8️⃣", "9️⃣", "🔟"];

pub fn poll_message(poll: &Poll, footer: &str) -> OutboundMessage {
    let lines: Vec<String> = poll
        .options
        .iter()
        .zip(NUMBERS.iter())
        .map(|(opt, n)| format!("{} {}", n, opt))
        .collect();
    let card = Card::new(format!("📊 {}", poll.question), BLUE)
        .description(lines.join("\n\n"))
        .footer(footer.to_string());
    OutboundMessage::card(card).with_buttons(vec![Button::new(
        custom_id(AffordanceKind::Poll, "spin", &poll.id),
        "🎰 Spin the Wheel",
        ButtonStyle::Primary,
    )])
}

pub fn max_poll_options() -> usize {
    NUMBERS.len()
}

// --- Shop ---

pub fn shop_menu(items: &[ShopItem]) -> OutboundMessage {
    let card = items.iter().fold(
        Card::new("🛒 The Us-Bucks Shop", GOLD)
            .description("Spend your hard-earned Us-Bucks. Click **Buy** and enter the item ID."),
        |card, item| {
            card.field(
                format!("#{} · {}", item.id, item.name),
                format!("💰 {} Us-Bucks", item.cost),
                false,
            )
        },
    );
    OutboundMessage::card(card).with_buttons(vec![
        Button::new(
            custom_id(AffordanceKind::Shop, "buy", "menu"),
            "🛍️ Buy Item",
            ButtonStyle::Success,
        ),
        Button::new(
            custom_id(AffordanceKind::Shop, "wallet", "menu"),
            "💳 Check Wallet",
            ButtonStyle::Secondary,
        ),
    ])
}

pub fn purchase_form() -> ModalForm {
    ModalForm {
        custom_id: custom_id(AffordanceKind::Shop, "purchase", "menu"),
        title: "Purchase Item".to_string(),
        fields: vec![ModalField {
            custom_id: "item_id".to_string(),
            label: "Item ID".to_string(),
            placeholder: Some("1".to_string()),
            min_len: 1,
            max_len: 3,
            paragraph: false,
        }],
    }
}

pub fn receipt(buyer_id: u64, item: &ShopItem, balance: i64) -> OutboundMessage {
    let card = Card::new("🧾 Receipt", GREEN)
        .description(format!("{} bought **{}**!", mention(buyer_id), item.name))
        .field("Paid", format!("{} Us-Bucks", item.cost), true)
        .field("Remaining", format!("{} Us-Bucks", balance), true)
        .footer("Show this to your partner to redeem.");
    OutboundMessage::card(card)
}

// --- Reminders ---

pub fn reminder_set(task: &str, at: DateTime<Tz>, scheduled: usize) -> OutboundMessage {
    let card = Card::new("⏰ Reminder Set", TEAL)
        .description(format!("**{}**", task))
        .field("When", at.format("%a %d %b, %H:%M %Z").to_string(), true)
        .field("Alerts", format!("{} scheduled", scheduled), true);
    OutboundMessage::card(card)
}

pub fn reminder_alert(who: &str, task: &str, minutes_left: i64) -> OutboundMessage {
    if minutes_left == 0 {
        OutboundMessage::text(format!("🚨 {} **IT'S TIME:** {}", who, task))
    } else {
        OutboundMessage::text(format!(
            "⏳ {} **{} minutes** until: {}",
            who, minutes_left, task
        ))
    }
}

// --- Moments ---

pub fn snap_ping(user_id: u64, minutes: i64) -> OutboundMessage {
    OutboundMessage::text(format!(
        "📸 **SNAP TIME!** {}\n⚠️ **What are you doing right now?**\nReply with `!snap <caption>` and a photo within **{} minutes**!",
        mention(user_id),
        minutes
    ))
}

pub fn moment_saved(source: MomentSource, caption: &str, reward: i64) -> OutboundMessage {
    let (title, color) = match source {
        MomentSource::Snap => ("⚡ SNAP CHALLENGE COMPLETE!", GOLD),
        MomentSource::Log => ("📝 Moment Logged", TEAL),
    };
    let card = Card::new(title, color)
        .description(format!("*\"{}\"*", caption))
        .footer(format!("+{} Us-Bucks", reward));
    OutboundMessage::card(card)
}

pub fn flashback(moment: &Moment, image_url: Option<String>) -> OutboundMessage {
    let mut card = Card::new("⏪ Flashback", PURPLE)
        .description(format!("*\"{}\"*\n— {}", moment.caption, mention(moment.user_id)))
        .field("When", moment.timestamp.clone(), true)
        .field("Type", moment.source.as_str(), true);
    card = match image_url {
        Some(url) => card.image(url),
        None => card.footer("⚠️ Image lost (Message deleted?)"),
    };
    OutboundMessage::card(card)
}

// --- Wiki ---

pub fn wiki_entry(entry: &WikiEntry, image_url: Option<String>) -> OutboundMessage {
    let mut card = Card::new(format!("📂 {}", entry.key), BLUE)
        .footer(format!("Added by {}", entry.added_by));
    if let Some(content) = &entry.content {
        card = card.description(content.clone());
    }
    match (entry.attachment, image_url) {
        (Some(_), Some(url)) => card = card.image(url),
        (Some(_), None) => card = card.field("Image", "⚠️ Image not found (Original message was deleted?)", false),
        (None, _) => {}
    }
    OutboundMessage::card(card)
}

pub fn wiki_index(keys: &[String]) -> OutboundMessage {
    if keys.is_empty() {
        return OutboundMessage::text("📂 The Wiki is empty! Use `!remember <key> <value>`.");
    }
    let list: Vec<String> = keys.iter().map(|k| format!("`{}`", k)).collect();
    OutboundMessage::card(
        Card::new("📂 Shared Wiki", BLUE)
            .description(list.join(", "))
            .footer("Use !get <key> to read an entry"),
    )
}

// --- Dashboard ---

pub struct DashboardView {
    pub clocks: Vec<(String, String)>,
    pub days_together: i64,
    pub days_apart: i64,
    pub stats: DashboardStats,
    pub question_status: &'static str,
    pub updated: String,
}

pub fn dashboard(view: &DashboardView) -> OutboundMessage {
    let card = view
        .clocks
        .iter()
        .fold(Card::new("💞 Live Dashboard", PINK), |card, (name, time)| {
            card.field(format!("🕰️ {}", name), time.clone(), true)
        })
        .field("❤️ Together", format!("{} days", view.days_together), true)
        .field("✈️ Apart", format!("{} days", view.days_apart), true)
        .field("🔥 Active Dares", view.stats.active_dares.to_string(), true)
        .field("📜 Open Bounties", view.stats.open_bounties.to_string(), true)
        .field("🎙️ Pending Capsules", view.stats.pending_capsules.to_string(), true)
        .field("🌞 Today's Question", view.question_status, true)
        .footer(format!("Auto-updates every minute • Last: {}", view.updated));
    OutboundMessage::card(card)
}

// --- Watch party ---

pub fn watch_lobby(lobby_id: &str, title: &str, waiting: &[u64]) -> OutboundMessage {
    let waiting_for: Vec<String> = waiting.iter().copied().map(mention).collect();
    let card = Card::new(format!("🍿 Watch Party: {}", title), BLURPLE)
        .description(format!(
            "Waiting for: {} to grab popcorn...",
            waiting_for.join(", ")
        ));
    OutboundMessage::card(card).with_buttons(vec![Button::new(
        custom_id(AffordanceKind::Watch, "ready", lobby_id),
        "✅ Ready",
        ButtonStyle::Success,
    )])
}

pub fn watch_starting(title: &str) -> OutboundMessage {
    OutboundMessage::card(
        Card::new(format!("🍿 Watch Party: {}", title), GREEN)
            .description("✅ **EVERYONE READY!** Starting countdown..."),
    )
}

// --- Operations ---

pub fn backup(file: FileAttachment, taken: &str) -> OutboundMessage {
    let card = Card::new("☁️ Database Backup", GREY)
        .field("Time", taken.to_string(), true)
        .field("File", file.filename.clone(), true)
        .footer("Restore by replacing echobot.db with this file");
    OutboundMessage::card(card).with_file(file)
}

pub fn start_menu() -> OutboundMessage {
    let card = Card::new("📖 EchoBot Manual", BLURPLE)
        .description("Everything you can do here, channel by channel.")
        .field(
            "🌞 Daily Question",
            "A new question every morning. Click **Answer Secretly**; answers reveal when you both reply (+10).",
            false,
        )
        .field(
            "📸 Moments",
            "`!snap <caption>` + photo when pinged (+50), `!log <caption>` anytime (+5), `!flashback`.",
            false,
        )
        .field(
            "🎙️ Audio Capsules",
            "Drop a voice note in the capsule channel. `!need <label>` opens an Open When capsule, `!mixtape` lists old ones.",
            false,
        )
        .field(
            "🔥 Dares & 📜 Bounties",
            "`!dare` for a random dare, `!bounty <reward> <task>` to hire your partner.",
            false,
        )
        .field(
            "🤔 Decisions",
            "`!food`, `!movie`, `!date`, `!book`, `!tv` or `!decide \"question\" a b c`.",
            false,
        )
        .field(
            "⏰ Reminders",
            "`!remind <what and when>` for you, `!ping <what and when>` for everyone.",
            false,
        )
        .field(
            "📂 Wiki & 🛒 Shop",
            "`!remember <key> <value>`, `!get <key>`, `!wiki`. Spend Us-Bucks in the shop.",
            false,
        )
        .field("🍿 Watch Party", "`!watch <title>` and both click Ready.", false);
    OutboundMessage::card(card)
}

pub fn systems_nominal() -> OutboundMessage {
    OutboundMessage::text("🤖 **EchoBot** | Manual Posted | Backups Active | Systems Nominal")
}
