pub mod generic_provider;
pub mod prompts;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use rand::seq::SliceRandom;
use std::sync::Arc;
use tracing::{info, warn};

use prompts::{
    FALLBACK_DARE, FALLBACK_OPTIONS, FALLBACK_QUESTION, QUESTION_THEMES, dare_prompt,
    options_prompt, parse_dare, parse_event_time, parse_options, parse_question, question_prompt,
    time_prompt,
};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SamplingParams {
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
}

impl SamplingParams {
    /// High-variety settings for questions and dares.
    pub fn creative() -> Self {
        Self {
            temperature: Some(1.1),
            top_p: Some(0.95),
            top_k: Some(40),
        }
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str, sampling: &SamplingParams) -> Result<String>;
}

/// Every call site the bot has for generated text. Output is parsed strictly
/// and replaced by a fixed fallback when the provider fails or the parse
/// does.
pub struct TextGenerator {
    provider: Option<Arc<dyn LlmProvider>>,
}

impl TextGenerator {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        info!("[llm] Using provider: {}", provider.name());
        Self {
            provider: Some(provider),
        }
    }

    /// No provider configured: every call yields its fallback.
    pub fn offline() -> Self {
        warn!("[llm] No provider configured, using fallbacks only");
        Self { provider: None }
    }

    async fn raw(&self, prompt: &str, sampling: SamplingParams) -> Result<String> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| anyhow!("no text provider configured"))?;
        provider.generate(prompt, &sampling).await
    }

    pub async fn daily_question(&self) -> String {
        let theme = QUESTION_THEMES
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(QUESTION_THEMES[0]);
        match self.raw(&question_prompt(theme), SamplingParams::creative()).await {
            Ok(text) => match parse_question(&text) {
                Ok(q) => return q,
                Err(e) => warn!("[llm] Question rejected: {}", e),
            },
            Err(e) => warn!("[llm] Question generation failed: {:#}", e),
        }
        FALLBACK_QUESTION.to_string()
    }

    pub async fn dare(&self) -> (String, i64) {
        match self.raw(&dare_prompt(), SamplingParams::creative()).await {
            Ok(text) => match parse_dare(&text) {
                Ok(dare) => return dare,
                Err(e) => warn!("[llm] Dare rejected: {}", e),
            },
            Err(e) => warn!("[llm] Dare generation failed: {:#}", e),
        }
        (FALLBACK_DARE.0.to_string(), FALLBACK_DARE.1)
    }

    pub async fn options(&self, category: &str, criteria: &str) -> Vec<String> {
        match self
            .raw(&options_prompt(category, criteria), SamplingParams::default())
            .await
        {
            Ok(text) => match parse_options(&text) {
                Ok(options) => return options,
                Err(e) => warn!("[llm] Options rejected: {}", e),
            },
            Err(e) => warn!("[llm] Options generation failed: {:#}", e),
        }
        FALLBACK_OPTIONS.iter().map(|s| s.to_string()).collect()
    }

    /// Wall-clock time (in the zone `now` is expressed in) the user meant,
    /// or `None` when nothing usable came back.
    pub async fn event_time(&self, input: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
        match self.raw(&time_prompt(input, now), SamplingParams::default()).await {
            Ok(text) => match parse_event_time(&text) {
                Ok(t) => t,
                Err(e) => {
                    warn!("[llm] Time rejected: {}", e);
                    None
                }
            },
            Err(e) => {
                warn!("[llm] Time extraction failed: {:#}", e);
                None
            }
        }
    }
}

#[cfg(test)]
pub use scripted::ScriptedProvider;
