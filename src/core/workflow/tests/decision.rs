use super::*;

fn spin_id(h: &Harness) -> String {
    let posts = h.notifier.posts_to(CH_DECISION);
    button_id(posts.last().expect("poll posted"), "poll:spin:")
}

#[tokio::test]
async fn movie_poll_uses_criteria_and_spins_to_an_option() {
    let h = harness();
    h.provider.push("1. The Conjuring\n2. Hereditary\n3. The Others");
    let reply = h
        .engine
        .on_message(&message(CH_GENERAL, ALICE, "!movie horror"))
        .await;
    assert_eq!(reply_text(&reply), "✅ Poll created in #decision-room!");

    let prompt = &h.provider.prompts()[0];
    assert!(prompt.contains("Movie"));
    assert!(prompt.contains("Genre/Vibe: horror. Specific movie titles."));

    let posted = posted_text(&h, CH_DECISION);
    assert!(posted[0].contains("Movie Night"));
    assert!(posted[0].contains("1️⃣ The Conjuring"));
    assert!(posted[0].contains("3️⃣ The Others"));

    let spin = h.engine.on_button(&actor(BOB), &spin_id(&h)).await;
    let text = reply_text(&spin);
    assert!(text.starts_with("🎰 The Wheel spins"));
    assert!(
        ["The Conjuring", "Hereditary", "The Others"]
            .iter()
            .any(|t| text.contains(t)),
        "{text}"
    );
}

#[tokio::test]
async fn garbled_model_output_falls_back_to_placeholders() {
    let h = harness();
    h.provider.push("Just one idea");
    h.engine.on_message(&message(CH_GENERAL, ALICE, "!food")).await;
    let posted = posted_text(&h, CH_DECISION);
    assert!(posted[0].contains("Option A"));
    assert!(posted[0].contains("Criteria: Surprise us"));
}

#[tokio::test]
async fn manual_poll_keeps_quoted_options() {
    let h = harness();
    h.engine
        .on_message(&message(
            CH_GENERAL,
            BOB,
            r#"!decide "Where to eat?" Ramen "Taco Bell" Sushi"#,
        ))
        .await;
    let posted = posted_text(&h, CH_DECISION);
    assert!(posted[0].contains("Where to eat?"));
    assert!(posted[0].contains("2️⃣ Taco Bell"));
    assert!(h.provider.prompts().is_empty());
}

#[tokio::test]
async fn manual_poll_validation() {
    let h = harness();
    let one = h
        .engine
        .on_message(&message(CH_GENERAL, BOB, r#"!decide "Pizza?" yes"#))
        .await;
    assert!(reply_text(&one).contains("at least 2 options"));

    let many = (1..=11).map(|i| format!("o{i}")).collect::<Vec<_>>().join(" ");
    let crowded = h
        .engine
        .on_message(&message(CH_GENERAL, BOB, &format!("!decide Q {many}")))
        .await;
    assert!(reply_text(&crowded).contains("At most 10"));
    assert!(h.notifier.posts_to(CH_DECISION).is_empty());

    let gone = h.engine.on_button(&actor(BOB), "poll:spin:missing").await;
    assert!(reply_text(&gone).contains("Poll not found"));
}
