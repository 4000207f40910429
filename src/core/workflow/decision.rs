use rand::seq::SliceRandom;
use tracing::info;

use super::render;
use super::{Engine, Reply, WorkflowError, WorkflowResult};
use crate::core::config::Target;
use crate::core::notify::describe_target;
use crate::core::store::types::Poll;

/// An AI-assisted poll preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPreset {
    pub command: &'static str,
    pub category: &'static str,
    pub title: &'static str,
    pub default_criteria: &'static str,
    criteria_template: &'static str,
}

impl PollPreset {
    pub fn criteria(&self, user_input: &str) -> String {
        let input = user_input.trim();
        let input = if input.is_empty() {
            self.default_criteria
        } else {
            input
        };
        self.criteria_template.replace("{}", input)
    }
}

pub const PRESETS: [PollPreset; 5] = [
    PollPreset {
        command: "food",
        category: "Food/Meal",
        title: "Food Plan",
        default_criteria: "Surprise us",
        criteria_template: "{}",
    },
    PollPreset {
        command: "movie",
        category: "Movie",
        title: "Movie Night",
        default_criteria: "Any Genre",
        criteria_template: "Genre/Vibe: {}. Specific movie titles.",
    },
    PollPreset {
        command: "date",
        category: "Date Idea",
        title: "Date Night",
        default_criteria: "Any type",
        criteria_template: "User Preference: {}. Keep it romantic/fun. STRICTLY NO ALCOHOL.",
    },
    PollPreset {
        command: "book",
        category: "Book",
        title: "Book Recommendation",
        default_criteria: "Any Genre",
        criteria_template: "Genre/Topic: {}. Specific book titles with authors.",
    },
    PollPreset {
        command: "tv",
        category: "TV Show",
        title: "TV Show Night",
        default_criteria: "Any Genre",
        criteria_template: "Genre/Vibe: {}. Specific series titles.",
    },
];

pub fn preset(command: &str) -> Option<&'static PollPreset> {
    PRESETS.iter().find(|p| p.command == command)
}

fn new_poll_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..12].to_string()
}

impl Engine {
    /// `!food`, `!movie`, ...: three generated options in a poll.
    pub async fn ai_poll(&self, preset: &PollPreset, criteria: &str) -> WorkflowResult<Reply> {
        let criteria = preset.criteria(criteria);
        let options = self.text.options(preset.category, &criteria).await;
        let footer = format!("AI suggestions • Criteria: {}", criteria);
        self.publish_poll(preset.title.to_string(), options, &footer)
            .await
    }

    /// `!decide <question> <option> <option> ...`.
    pub async fn create_poll(&self, question: &str, options: Vec<String>) -> WorkflowResult<Reply> {
        if question.trim().is_empty() || options.len() < 2 {
            return Err(WorkflowError::Invalid(
                "❌ Usage: `!decide \"Question\" option1 option2 ...` (at least 2 options)".into(),
            ));
        }
        if options.len() > render::max_poll_options() {
            return Err(WorkflowError::Invalid(format!(
                "❌ At most {} options, please.",
                render::max_poll_options()
            )));
        }
        self.publish_poll(question.trim().to_string(), options, "Click Spin to let fate decide")
            .await
    }

    async fn publish_poll(&self, question: String, options: Vec<String>, footer: &str) -> WorkflowResult<Reply> {
        let poll = Poll {
            id: new_poll_id(),
            question,
            options,
        };
        self.store.save_poll(&poll).await?;
        self.post_to(Target::DecisionRoom, render::poll_message(&poll, footer))
            .await?;
        info!("[decision] Poll {} '{}'", poll.id, poll.question);
        Ok(Reply::say(format!(
            "✅ Poll created in {}!",
            describe_target(Target::DecisionRoom)
        )))
    }

    pub async fn spin_poll(&self, poll_id: &str) -> WorkflowResult<Reply> {
        let poll = self
            .store
            .get_poll(poll_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound("Poll".into()))?;
        let choice = poll
            .options
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| WorkflowError::NotFound("Poll option".into()))?;
        Ok(Reply::say(format!(
            "🎰 The Wheel spins... and lands on:\n# 🎉 **{}** 🎉",
            choice
        )))
    }
}
