use chrono::{Duration, NaiveDate};

use super::*;
use crate::core::notify::Delivery;

// --- Shop ---

#[tokio::test]
async fn purchase_debits_posts_receipt_and_moves_menu() {
    let h = harness();
    h.store.credit(BOB, 400).await.unwrap();
    let menu = h.engine.post_shop_menu().await.unwrap();

    let form = h.engine.on_button(&actor(BOB), "shop:buy:menu").await;
    assert!(matches!(form, Reply::Modal(ref f) if f.custom_id == "shop:purchase:menu"));

    let bought = h
        .engine
        .on_modal(&actor(BOB), "shop:purchase:menu", &[" 2 ".to_string()])
        .await;
    assert_eq!(
        reply_text(&bought),
        "🎉 You bought **Movie Night Choice**! Remaining balance: **100 Us-Bucks**."
    );
    assert_eq!(h.store.balance(BOB).await.unwrap(), 100);

    let posts = posted_text(&h, CH_SHOP);
    assert_eq!(posts.len(), 3);
    assert!(posts[1].contains("Receipt"));
    assert!(posts[2].contains("The Us-Bucks Shop"));
    assert!(h.notifier.deliveries().contains(&Delivery::Delete(menu)));
}

#[tokio::test]
async fn purchase_refusals_leave_balance_alone() {
    let h = harness();
    h.store.credit(ALICE, 100).await.unwrap();
    let poor = h
        .engine
        .on_modal(&actor(ALICE), "shop:purchase:menu", &["1".to_string()])
        .await;
    assert!(reply_text(&poor).contains("need **150** Us-Bucks but have **100**"));

    let unknown = h
        .engine
        .on_modal(&actor(ALICE), "shop:purchase:menu", &["99".to_string()])
        .await;
    assert_eq!(reply_text(&unknown), "❌ Item '99' not found.");
    assert_eq!(h.store.balance(ALICE).await.unwrap(), 100);
    assert!(h.notifier.posts_to(CH_SHOP).is_empty());
}

#[tokio::test]
async fn wallet_and_shop_channel_gating() {
    let h = harness();
    h.store.credit(ALICE, 42).await.unwrap();
    let wallet = h.engine.on_button(&actor(ALICE), "shop:wallet:menu").await;
    assert_eq!(reply_text(&wallet), "💳 Your Balance: **42 Us-Bucks**");
    let balance = h
        .engine
        .on_message(&message(CH_GENERAL, ALICE, "!balance"))
        .await;
    assert_eq!(reply_text(&balance), "💳 Your Balance: **42 Us-Bucks**");

    h.engine.on_message(&message(CH_GENERAL, ALICE, "!shop")).await;
    assert!(h.notifier.posts_to(CH_SHOP).is_empty());
    h.engine.on_message(&message(CH_SHOP, ALICE, "!shop")).await;
    h.engine.on_message(&message(CH_SHOP, ALICE, "!shop")).await;
    assert_eq!(h.notifier.posts_to(CH_SHOP).len(), 2);
    assert_eq!(
        h.notifier
            .deliveries()
            .iter()
            .filter(|d| matches!(d, Delivery::Delete(_)))
            .count(),
        1
    );
}

// --- Wiki ---

#[tokio::test]
async fn remembered_entries_are_sent_by_dm() {
    let h = harness();
    let saved = h
        .engine
        .on_message(&message(CH_GENERAL, ALICE, r#"!remember Wifi "hunter2 on the fridge""#))
        .await;
    assert_eq!(saved, Reply::React("✅".to_string()));

    let got = h.engine.on_message(&message(CH_GENERAL, BOB, "!get wifi")).await;
    assert_eq!(got, Reply::React("📩".to_string()));
    let dm = &h.notifier.directs_to(BOB)[0];
    let card = dm.card.as_ref().unwrap();
    assert_eq!(card.title.as_deref(), Some("📂 wifi"));
    assert_eq!(card.description.as_deref(), Some("hunter2 on the fridge"));
    assert_eq!(card.footer.as_deref(), Some("Added by Alice"));

    let index = h.engine.on_message(&message(CH_GENERAL, BOB, "!wiki")).await;
    assert!(reply_text(&index).contains("`wifi`"));
}

#[tokio::test]
async fn wiki_image_and_missing_cases() {
    let h = harness();
    let empty = h.engine.on_message(&message(CH_GENERAL, BOB, "!wiki")).await;
    assert!(reply_text(&empty).contains("empty"));

    let nothing = h
        .engine
        .on_message(&message(CH_GENERAL, ALICE, "!remember passport"))
        .await;
    assert!(reply_text(&nothing).contains("provide text or an image"));

    // Image saved, then its message deleted.
    h.engine
        .on_message(&with_photo(message(CH_GENERAL, ALICE, "!remember passport")))
        .await;
    h.engine.on_message(&message(CH_GENERAL, BOB, "!get passport")).await;
    let card = h.notifier.directs_to(BOB)[0].card.clone().unwrap();
    assert!(card.field_value("Image").unwrap().contains("Image not found"));

    let missing = h.engine.on_message(&message(CH_GENERAL, BOB, "!get visa")).await;
    assert_eq!(reply_text(&missing), "❌ Record not found: **visa**");
}

// --- Dashboard ---

#[tokio::test]
async fn dashboard_is_posted_once_then_edited() {
    let h = harness_with(|c| {
        c.dates.relationship_start = NaiveDate::from_ymd_opt(2026, 2, 20).unwrap();
        c.dates.last_seen = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
    });
    h.store.credit(ALICE, 50).await.unwrap();
    h.engine
        .create_bounty(&actor(ALICE), 20, "Water the plants")
        .await
        .unwrap();

    let first = h.engine.update_dashboard().await.unwrap();
    let posted = h.notifier.posts_to(CH_STATS);
    assert_eq!(posted.len(), 1);
    let card = posted[0].card.as_ref().unwrap();
    assert_eq!(card.field_value("🕰️ Alice"), Some("08:30 · Mon"));
    assert_eq!(card.field_value("🕰️ Bob"), Some("02:30 · Mon"));
    assert_eq!(card.field_value("❤️ Together"), Some("10 days"));
    assert_eq!(card.field_value("✈️ Apart"), Some("1 days"));
    assert_eq!(card.field_value("📜 Open Bounties"), Some("1"));
    assert_eq!(card.field_value("🌞 Today's Question"), Some("⏳ Nobody yet"));

    let second = h.engine.update_dashboard().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(h.notifier.posts_to(CH_STATS).len(), 1);
    assert_eq!(h.notifier.edits().len(), 1);
}

// --- Watch party ---

#[tokio::test]
async fn watch_party_counts_down_when_everyone_is_ready() {
    let h = harness();
    let outside = h
        .engine
        .on_message(&message(CH_GENERAL, ALICE, "!watch Dune"))
        .await;
    assert_eq!(outside, Reply::None);

    let lobby = h
        .engine
        .on_message(&message(CH_WATCH, ALICE, "!watch Dune"))
        .await;
    let Reply::Say(card) = lobby else {
        panic!("expected lobby card");
    };
    let ready = button_id(&card, "watch:ready:");

    let waiting = h.engine.on_button(&actor(ALICE), &ready).await;
    let text = reply_text(&waiting);
    assert!(text.contains(&format!("<@{}>", BOB)));
    assert!(!text.contains(&format!("<@{}>", ALICE)));

    let go = h.engine.on_button(&actor(BOB), &ready).await;
    assert!(reply_text(&go).contains("EVERYONE READY"));
    assert!(h.notifier.posts_to(CH_WATCH).is_empty());

    h.scheduler.advance(Duration::seconds(6)).await;
    let posts = posted_text(&h, CH_WATCH);
    assert_eq!(posts.len(), 6);
    assert_eq!(posts[0], "# 5...");
    assert_eq!(posts[4], "# 1...");
    assert!(posts[5].contains("PLAY NOW"));

    let stale = h.engine.on_button(&actor(BOB), &ready).await;
    assert!(matches!(stale, Reply::Private(_)));
}

// --- Operations ---

#[tokio::test]
async fn backup_uploads_a_snapshot() {
    let h = harness();
    h.store.credit(ALICE, 7).await.unwrap();
    let reply = h.engine.on_message(&message(CH_GENERAL, ALICE, "!backup")).await;
    assert_eq!(
        reply_text(&reply),
        "✅ Backup uploaded: `echobot_backup_2026-03-02_08-30.db`"
    );
    let posts = h.notifier.posts_to(CH_BACKUP);
    let file = posts[0].file.as_ref().unwrap();
    assert_eq!(file.filename, "echobot_backup_2026-03-02_08-30.db");
    assert!(file.bytes.starts_with(b"SQLite format 3"));
}

#[tokio::test]
async fn startup_registers_jobs_and_posts_boards() {
    let h = harness();
    h.engine.start().await.unwrap();

    let labels: Vec<String> = h
        .scheduler
        .pending()
        .await
        .into_iter()
        .map(|j| j.label)
        .collect();
    for label in ["daily-question", "random-dare", "snap-planner", "backup", "dashboard"] {
        assert!(labels.iter().any(|l| l == label), "{label} missing");
    }
    assert_eq!(labels.iter().filter(|l| l.starts_with("snap-")).count(), 7);

    assert!(posted_text(&h, CH_START)[0].contains("EchoBot Manual"));
    assert_eq!(h.notifier.posts_to(CH_STATS).len(), 1);
    assert!(posted_text(&h, CH_DEBUG)[0].contains("Systems Nominal"));

    // 09:00 in Kuala Lumpur is half an hour away.
    h.scheduler.advance(Duration::minutes(31)).await;
    assert_eq!(h.notifier.posts_to(CH_QUESTION).len(), 1);
    assert_eq!(h.notifier.posts_to(CH_STATS).len(), 1);
    assert!(h.notifier.edits().len() >= 30);
}

#[tokio::test]
async fn restart_replaces_the_manual() {
    let h = harness();
    let first = h.engine.post_start_menu().await.unwrap();
    let reply = h.engine.on_message(&message(CH_GENERAL, ALICE, "!update")).await;
    assert_eq!(reply, Reply::React("🔄".to_string()));
    assert!(h.notifier.deliveries().contains(&Delivery::Delete(first)));
    assert_eq!(h.notifier.posts_to(CH_START).len(), 2);
}
