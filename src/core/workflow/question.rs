use chrono::DateTime;
use chrono_tz::Tz;
use tracing::{info, warn};

use super::render;
use super::{Actor, Engine, Reply, WorkflowError, WorkflowResult};
use crate::core::config::Target;

/// Distinct submitters needed before answers are shown.
const REVEAL_AT: i64 = 2;

/// Round ids are the home-zone creation time, second resolution.
pub fn round_id(at: DateTime<Tz>) -> String {
    at.format("%Y-%m-%d_%H-%M-%S").to_string()
}

impl Engine {
    /// Create today's round and post it. Returns the round id.
    pub async fn post_daily_question(&self) -> anyhow::Result<String> {
        let channel = self.channel(Target::DailyQuestion)?;
        let id = round_id(self.home_now());
        let question = self.text.daily_question().await;
        if !self.store.create_round(&id, &question).await? {
            warn!("[question] Round {} already exists, skipping", id);
            return Ok(id);
        }
        let handle = self
            .notifier
            .post(channel, render::question_message(&id, &question))
            .await?;
        self.store.set_round_message(&id, handle).await?;
        info!("[question] Posted round {}", id);
        Ok(id)
    }

    pub async fn answer_form(&self, round: &str) -> WorkflowResult<Reply> {
        if self.store.get_round(round).await?.is_none() {
            return Err(WorkflowError::NotFound("Question".into()));
        }
        Ok(Reply::Modal(render::answer_form(round)))
    }

    /// Save (or overwrite) an answer; reveal when the second person answers.
    pub async fn submit_answer(&self, actor: &Actor, round: &str, text: &str) -> WorkflowResult<Reply> {
        let text = text.trim();
        if text.chars().count() < 2 {
            return Err(WorkflowError::Invalid("❌ Answers need at least 2 characters.".into()));
        }
        let Some(q) = self.store.get_round(round).await? else {
            return Err(WorkflowError::NotFound("Question".into()));
        };
        let reward = self.config.rewards.answer;
        let saved = self
            .store
            .save_answer(round, actor.id, &actor.name, text, reward)
            .await?;
        info!(
            "[question] {} answered {} ({} submitters)",
            actor.id, round, saved.submitters
        );

        let revealed = saved.submitters >= REVEAL_AT && self.store.mark_revealed(round).await?;
        if revealed {
            let answers = self.store.answers(round).await?;
            let message = render::reveal_message(&q.question, &answers);
            match q.message {
                Some(handle) => {
                    if let Err(e) = self.notifier.post(handle.channel_id, message).await {
                        warn!("[question] Reveal for {} failed: {}", round, e);
                    }
                }
                None => self.announce(Target::DailyQuestion, message).await,
            }
            info!("[question] Revealed {}", round);
        }

        let paid = if saved.first_answer && reward > 0 {
            format!(" (+{} Us-Bucks)", reward)
        } else {
            String::new()
        };
        let status = if revealed || q.revealed {
            "Both answers are in!"
        } else {
            "Waiting for your partner..."
        };
        Ok(Reply::private(format!("✅ Answer saved!{} {}", paid, status)))
    }
}
