use super::*;
use crate::core::store::types::BountyStatus;

async fn open_bounty(h: &Harness, reward: i64) -> i64 {
    let reply = h
        .engine
        .on_message(&message(CH_GENERAL, ALICE, &format!("!bounty {} Fix the sink", reward)))
        .await;
    assert!(reply_text(&reply).contains("escrow"), "{reply:?}");
    1
}

#[tokio::test]
async fn escrow_end_to_end() {
    let h = harness();
    h.store.credit(ALICE, 150).await.unwrap();

    let id = open_bounty(&h, 100).await;
    assert_eq!(h.store.balance(ALICE).await.unwrap(), 50);
    let board = h.notifier.posts_to(CH_BOUNTY);
    assert_eq!(board.len(), 1);
    assert_eq!(button_id(&board[0], "bounty:claim"), format!("bounty:claim:{}", id));
    assert!(h.store.get_bounty(id).await.unwrap().unwrap().message.is_some());

    let claimed = h.engine.on_button(&actor(BOB), "bounty:claim:1").await;
    assert!(reply_text(&claimed).contains("In Progress"), "{claimed:?}");
    h.engine.on_button(&actor(BOB), "bounty:submit:1").await;
    assert!(posted_text(&h, CH_BOUNTY).iter().any(|t| t.contains("please review")));

    let approved = h.engine.on_button(&actor(ALICE), "bounty:approve:1").await;
    match &approved {
        Reply::Update(m) => assert!(m.buttons.is_empty()),
        other => panic!("expected card update, got {other:?}"),
    }
    assert_eq!(h.store.balance(BOB).await.unwrap(), 100);
    assert_eq!(h.store.balance(ALICE).await.unwrap(), 50);

    // A duplicate click on a stale card pays nothing.
    let again = h.engine.on_button(&actor(ALICE), "bounty:approve:1").await;
    assert!(matches!(again, Reply::Private(_)));
    assert_eq!(h.store.balance(BOB).await.unwrap(), 100);
    assert_eq!(
        h.store.get_bounty(id).await.unwrap().unwrap().status,
        BountyStatus::Completed
    );
}

#[tokio::test]
async fn insufficient_funds_creates_nothing() {
    let h = harness();
    h.store.credit(ALICE, 30).await.unwrap();
    let err = h
        .engine
        .create_bounty(&actor(ALICE), 100, "Paint the fence")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::InsufficientFunds {
            needed: 100,
            available: 30
        }
    ));
    assert_eq!(h.store.balance(ALICE).await.unwrap(), 30);
    assert!(h.notifier.posts_to(CH_BOUNTY).is_empty());
    assert!(h.store.get_bounty(1).await.unwrap().is_none());
}

#[tokio::test]
async fn non_positive_reward_is_rejected() {
    let h = harness();
    h.store.credit(ALICE, 30).await.unwrap();
    let reply = h
        .engine
        .on_message(&message(CH_GENERAL, ALICE, "!bounty -5 Steal money"))
        .await;
    assert!(reply_text(&reply).contains("positive"));
    assert_eq!(h.store.balance(ALICE).await.unwrap(), 30);
}

#[tokio::test]
async fn cancel_refunds_exactly_once() {
    let h = harness();
    h.store.credit(ALICE, 100).await.unwrap();
    open_bounty(&h, 100).await;
    assert_eq!(h.store.balance(ALICE).await.unwrap(), 0);

    h.engine.on_button(&actor(BOB), "bounty:claim:1").await;
    let refused = h.engine.on_button(&actor(BOB), "bounty:cancel:1").await;
    assert!(reply_text(&refused).contains("Only the employer"));

    h.engine.on_button(&actor(ALICE), "bounty:cancel:1").await;
    h.engine.on_button(&actor(ALICE), "bounty:cancel:1").await;
    assert_eq!(h.store.balance(ALICE).await.unwrap(), 100);
    assert_eq!(h.store.balance(BOB).await.unwrap(), 0);
}

#[tokio::test]
async fn forfeit_reopens_without_moving_money() {
    let h = harness();
    h.store.credit(ALICE, 100).await.unwrap();
    open_bounty(&h, 100).await;
    h.engine.on_button(&actor(BOB), "bounty:claim:1").await;
    h.engine.on_button(&actor(BOB), "bounty:forfeit:1").await;

    let b = h.store.get_bounty(1).await.unwrap().unwrap();
    assert_eq!(b.status, BountyStatus::Open);
    assert_eq!(b.worker_id, None);
    assert_eq!(h.store.balance(ALICE).await.unwrap(), 0);
    assert_eq!(h.store.balance(BOB).await.unwrap(), 0);

    let reclaimed = h.engine.on_button(&actor(BOB), "bounty:claim:1").await;
    assert!(matches!(reclaimed, Reply::Update(_)));
}

#[tokio::test]
async fn employer_cannot_claim_and_rejection_sends_work_back() {
    let h = harness();
    h.store.credit(ALICE, 100).await.unwrap();
    open_bounty(&h, 100).await;

    let own = h.engine.on_button(&actor(ALICE), "bounty:claim:1").await;
    assert_eq!(reply_text(&own), "❌ You can't claim your own bounty!");

    h.engine.on_button(&actor(BOB), "bounty:claim:1").await;
    h.engine.on_button(&actor(BOB), "bounty:submit:1").await;
    h.engine.on_button(&actor(ALICE), "bounty:reject:1").await;
    assert_eq!(
        h.store.get_bounty(1).await.unwrap().unwrap().status,
        BountyStatus::InProgress
    );
    assert_eq!(h.store.balance(BOB).await.unwrap(), 0);
}

#[tokio::test]
async fn unknown_bounty_and_garbage_ids_are_refused() {
    let h = harness();
    assert!(matches!(
        h.engine.on_button(&actor(BOB), "bounty:claim:99").await,
        Reply::Private(_)
    ));
    assert!(matches!(
        h.engine.on_button(&actor(BOB), "bounty:claim:abc").await,
        Reply::Private(_)
    ));
    assert!(matches!(
        h.engine.on_button(&actor(BOB), "nonsense").await,
        Reply::Private(_)
    ));
}
