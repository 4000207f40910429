use chrono::Duration;

use super::*;
use crate::core::notify::{AttachmentRef, Delivery};
use crate::core::store::types::CapsuleStatus;

/// Upload a voice note and return the DM'd choice buttons' custom ids.
async fn upload(h: &Harness, author: u64) -> (String, String, String) {
    let msg = voice_note(h, author);
    let reply = h.engine.on_message(&msg).await;
    assert_eq!(reply, Reply::None);
    let dm = h.notifier.directs_to(author).pop().expect("choice DM");
    (
        button_id(&dm, "capsule:surprise:"),
        button_id(&dm, "capsule:morning:"),
        button_id(&dm, "capsule:label:"),
    )
}

#[tokio::test]
async fn upload_is_backed_up_and_original_removed() {
    let h = harness();
    let msg = voice_note(&h, ALICE);
    h.engine.on_message(&msg).await;

    let backups = h.notifier.posts_to(CH_DEBUG);
    assert_eq!(backups.len(), 1);
    assert_eq!(backups[0].file.as_ref().unwrap().filename, "note.ogg");
    assert!(
        h.notifier
            .deliveries()
            .contains(&Delivery::Delete(msg.handle))
    );
    let dm = &h.notifier.directs_to(ALICE)[0];
    assert_eq!(dm.buttons.len(), 3);
}

#[tokio::test]
async fn text_in_capsule_channel_is_not_a_capsule() {
    let h = harness();
    let reply = h
        .engine
        .on_message(&message(CH_CAPSULE, ALICE, "hello"))
        .await;
    assert_eq!(reply, Reply::None);
    assert!(h.notifier.deliveries().is_empty());
}

#[tokio::test]
async fn surprise_capsule_surfaces_once() {
    let h = harness();
    let (surprise, _, _) = upload(&h, ALICE).await;
    let reply = h.engine.on_button(&actor(ALICE), &surprise).await;
    assert!(reply_text(&reply).contains("Buried"));

    let capsule = h.store.get_capsule(1).await.unwrap().unwrap();
    assert_eq!(capsule.status, CapsuleStatus::Pending);
    assert_eq!(capsule.label.as_deref(), Some("random"));
    let at = capsule.deliver_at.unwrap();
    assert!(at >= start_time() + Duration::minutes(60));
    assert!(at <= start_time() + Duration::minutes(4320));

    // A second click does not bury it twice.
    let again = h.engine.on_button(&actor(ALICE), &surprise).await;
    assert!(reply_text(&again).contains("already"));
    assert_eq!(h.scheduler.pending().await.len(), 1);

    h.scheduler.advance(Duration::hours(73)).await;
    let delivered = h.notifier.posts_to(CH_CAPSULE);
    assert_eq!(delivered.len(), 1);
    assert!(delivered[0].file.is_some());
    assert!(message_text(&delivered[0]).contains("Surprise"));
    assert_eq!(
        h.store.get_capsule(1).await.unwrap().unwrap().status,
        CapsuleStatus::Archived
    );

    let second = h.engine.deliver_capsule(1, "again").await.unwrap();
    assert_eq!(second, DeliveryOutcome::AlreadyArchived);
    assert_eq!(h.notifier.posts_to(CH_CAPSULE).len(), 1);
}

#[tokio::test]
async fn first_light_targets_partner_morning() {
    let h = harness();
    let (_, morning, _) = upload(&h, ALICE).await;
    h.engine.on_button(&actor(ALICE), &morning).await;

    // 02:30 in Lusaka, so the next 07:00 there is 05:00 UTC the same day.
    let capsule = h.store.get_capsule(1).await.unwrap().unwrap();
    assert_eq!(capsule.label.as_deref(), Some("morning"));
    assert_eq!(
        capsule.deliver_at.unwrap(),
        start_time() + Duration::hours(4) + Duration::minutes(30)
    );
}

#[tokio::test]
async fn open_when_sad_round_trip() {
    let h = harness();
    let (_, _, label) = upload(&h, ALICE).await;
    let form = h.engine.on_button(&actor(ALICE), &label).await;
    let Reply::Modal(form) = form else {
        panic!("expected label modal, got {form:?}");
    };
    assert_eq!(form.custom_id, label);

    let saved = h
        .engine
        .on_modal(&actor(ALICE), &form.custom_id, &["Sad".to_string()])
        .await;
    assert!(reply_text(&saved).contains("!need sad"));
    let capsule = h.store.get_capsule(1).await.unwrap().unwrap();
    assert_eq!(capsule.status, CapsuleStatus::OpenWhen);
    assert_eq!(capsule.deliver_at, None);

    let opened = h
        .engine
        .on_message(&message(CH_GENERAL, BOB, "!need sad"))
        .await;
    assert_eq!(opened, Reply::React("💌".to_string()));
    let delivered = posted_text(&h, CH_CAPSULE);
    assert_eq!(delivered.len(), 1);
    assert!(delivered[0].contains("Open When You're Sad"));
    assert_eq!(
        h.store.get_capsule(1).await.unwrap().unwrap().status,
        CapsuleStatus::Archived
    );

    let empty = h
        .engine
        .on_message(&message(CH_GENERAL, BOB, "!need sad"))
        .await;
    assert!(reply_text(&empty).contains("No capsules found"));
}

#[tokio::test]
async fn short_labels_are_refused() {
    let h = harness();
    let (_, _, label) = upload(&h, ALICE).await;
    let reply = h
        .engine
        .on_modal(&actor(ALICE), &label, &["x".to_string()])
        .await;
    assert!(reply_text(&reply).contains("2 to 20"));
    assert!(h.store.get_capsule(1).await.unwrap().is_none());
}

#[tokio::test]
async fn oldest_open_when_capsule_is_delivered_first() {
    let h = harness();
    for (i, sender) in [ALICE, BOB].into_iter().enumerate() {
        let handle = MessageHandle {
            channel_id: CH_DEBUG,
            message_id: 500 + i as u64,
        };
        h.notifier.store_file(
            handle,
            FileAttachment {
                filename: format!("{i}.ogg"),
                bytes: vec![i as u8],
            },
        );
        h.store
            .add_capsule(
                sender,
                AttachmentRef(handle),
                Some("bored"),
                None,
                CapsuleStatus::OpenWhen,
                start_time() + Duration::minutes(i as i64),
            )
            .await
            .unwrap();
    }
    h.engine
        .on_message(&message(CH_GENERAL, BOB, "!need Bored"))
        .await;
    let first = h.notifier.posts_to(CH_CAPSULE);
    assert_eq!(first[0].file.as_ref().unwrap().filename, "0.ogg");
    assert_eq!(
        h.store.get_capsule(2).await.unwrap().unwrap().status,
        CapsuleStatus::OpenWhen
    );
}

#[tokio::test]
async fn lost_source_leaves_capsule_pending() {
    let h = harness();
    let gone = AttachmentRef(MessageHandle {
        channel_id: CH_DEBUG,
        message_id: 9,
    });
    let id = h
        .store
        .add_capsule(
            ALICE,
            gone,
            Some("random"),
            Some(start_time()),
            CapsuleStatus::Pending,
            start_time(),
        )
        .await
        .unwrap()
        .unwrap();
    let outcome = h.engine.deliver_capsule(id, "test").await.unwrap();
    assert_eq!(outcome, DeliveryOutcome::Lost);
    assert!(posted_text(&h, CH_CAPSULE)[0].contains("lost in the mail"));
    assert_eq!(
        h.store.get_capsule(id).await.unwrap().unwrap().status,
        CapsuleStatus::Pending
    );
}

#[tokio::test]
async fn recovery_reschedules_overdue_and_future_capsules() {
    let h = harness();
    for (i, offset) in [Duration::hours(-1), Duration::hours(2)].into_iter().enumerate() {
        let handle = MessageHandle {
            channel_id: CH_DEBUG,
            message_id: 700 + i as u64,
        };
        h.notifier.store_file(
            handle,
            FileAttachment {
                filename: "note.ogg".into(),
                bytes: vec![0],
            },
        );
        h.store
            .add_capsule(
                ALICE,
                AttachmentRef(handle),
                Some("random"),
                Some(start_time() + offset),
                CapsuleStatus::Pending,
                start_time() - Duration::days(1),
            )
            .await
            .unwrap();
    }

    assert_eq!(h.engine.recover_capsules().await.unwrap(), 2);
    let pending = h.scheduler.pending().await;
    assert_eq!(pending[0].next_fire, start_time() + Duration::seconds(10));
    assert_eq!(pending[1].next_fire, start_time() + Duration::hours(2));

    h.scheduler.advance(Duration::seconds(11)).await;
    assert_eq!(h.notifier.posts_to(CH_CAPSULE).len(), 1);
    h.scheduler.advance(Duration::hours(2)).await;
    assert_eq!(h.notifier.posts_to(CH_CAPSULE).len(), 2);
    assert!(h.store.list_pending_capsules().await.unwrap().is_empty());
}

#[tokio::test]
async fn mixtape_lists_delivered_capsules() {
    let h = harness();
    let empty = h.engine.on_message(&message(CH_GENERAL, BOB, "!mixtape")).await;
    assert!(reply_text(&empty).contains("empty"));

    let (_, _, label) = upload(&h, ALICE).await;
    h.engine
        .on_modal(&actor(ALICE), &label, &["missing me".to_string()])
        .await;
    h.engine
        .on_message(&message(CH_GENERAL, BOB, "!need missing me"))
        .await;
    let listed = h.engine.on_message(&message(CH_GENERAL, BOB, "!mixtape")).await;
    assert!(reply_text(&listed).contains("missing me"));
}
