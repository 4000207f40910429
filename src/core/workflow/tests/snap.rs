use chrono::Duration;

use super::*;

#[tokio::test]
async fn challenge_then_photo_pays_out() {
    let h = harness();
    h.engine.trigger_snap(ALICE).await.unwrap();
    assert!(posted_text(&h, CH_MOMENTS)[0].contains("15 minutes"));

    h.clock.advance(Duration::minutes(5));
    let reply = h
        .engine
        .on_message(&with_photo(message(CH_MOMENTS, ALICE, "!snap Making coffee")))
        .await;
    let text = reply_text(&reply);
    assert!(text.contains("SNAP CHALLENGE COMPLETE"), "{text}");
    assert!(text.contains("Making coffee"));
    assert_eq!(h.store.balance(ALICE).await.unwrap(), 50);

    // The window is spent.
    let again = h
        .engine
        .on_message(&with_photo(message(CH_MOMENTS, ALICE, "!snap Again")))
        .await;
    assert!(reply_text(&again).contains("haven't been challenged"));
    assert_eq!(h.store.balance(ALICE).await.unwrap(), 50);
}

#[tokio::test]
async fn missing_photo_keeps_the_window_open() {
    let h = harness();
    h.engine.trigger_snap(BOB).await.unwrap();
    let bare = h
        .engine
        .on_message(&message(CH_MOMENTS, BOB, "!snap"))
        .await;
    assert!(reply_text(&bare).contains("forgot the photo"));

    let retry = h
        .engine
        .on_message(&with_photo(message(CH_MOMENTS, BOB, "!snap")))
        .await;
    assert!(reply_text(&retry).contains("Snap!"));
    assert_eq!(h.store.balance(BOB).await.unwrap(), 50);
}

#[tokio::test]
async fn late_submission_is_refused() {
    let h = harness();
    h.engine.trigger_snap(ALICE).await.unwrap();
    h.clock.advance(Duration::minutes(16));
    let late = h
        .engine
        .on_message(&with_photo(message(CH_MOMENTS, ALICE, "!snap Sunset")))
        .await;
    assert!(reply_text(&late).contains("Too late"));
    assert_eq!(h.store.balance(ALICE).await.unwrap(), 0);

    let after = h
        .engine
        .on_message(&with_photo(message(CH_MOMENTS, ALICE, "!snap Sunset")))
        .await;
    assert!(reply_text(&after).contains("haven't been challenged"));
}

#[tokio::test]
async fn planner_schedules_pings_for_both_players() {
    let h = harness();
    assert_eq!(h.engine.plan_today().await.unwrap(), 6);
    let pending = h.scheduler.pending().await;
    assert_eq!(pending.len(), 6);
    assert_eq!(
        pending.iter().filter(|j| j.label == format!("snap-{}", ALICE)).count(),
        3
    );

    // Everything lands before midnight in Lusaka.
    h.scheduler.advance(Duration::hours(24)).await;
    assert_eq!(h.notifier.posts_to(CH_MOMENTS).len(), 6);
}

#[tokio::test]
async fn log_needs_a_photo_and_pays_less() {
    let h = harness();
    let bare = h
        .engine
        .on_message(&message(CH_GENERAL, ALICE, "!log Dinner"))
        .await;
    assert!(reply_text(&bare).contains("Attach a photo"));

    let logged = h
        .engine
        .on_message(&with_photo(message(CH_GENERAL, ALICE, "!log")))
        .await;
    let text = reply_text(&logged);
    assert!(text.contains("Moment Logged"));
    assert!(text.contains("A moment"));
    assert_eq!(h.store.balance(ALICE).await.unwrap(), 5);
}

#[tokio::test]
async fn flashback_shows_image_when_source_survives() {
    let h = harness();
    let empty = h.engine.on_message(&message(CH_GENERAL, BOB, "!flashback")).await;
    assert!(reply_text(&empty).contains("No moments yet"));

    let msg = with_photo(message(CH_MOMENTS, ALICE, "!log Beach day"));
    h.notifier.store_file(
        msg.handle,
        FileAttachment {
            filename: "photo.jpg".into(),
            bytes: vec![9],
        },
    );
    h.engine.on_message(&msg).await;

    let reply = h.engine.on_message(&message(CH_GENERAL, BOB, "!flashback")).await;
    let Reply::Say(m) = reply else {
        panic!("expected flashback card");
    };
    let card = m.card.unwrap();
    assert!(card.image_url.as_deref().unwrap().ends_with("photo.jpg"));
    assert_eq!(card.field_value("Type"), Some("LOG"));
}

#[tokio::test]
async fn flashback_survives_deleted_photo() {
    let h = harness();
    h.engine
        .on_message(&with_photo(message(CH_MOMENTS, ALICE, "!log Gone")))
        .await;
    let reply = h.engine.on_message(&message(CH_GENERAL, BOB, "!flashback")).await;
    let text = reply_text(&reply);
    assert!(text.contains("Gone"));
    assert!(text.contains("Image lost"));
}
