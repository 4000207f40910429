//! Prompt text and the strict parsers that turn generated text into typed
//! values. A parser either returns the whole value or an error; callers
//! substitute the fixed fallback on error.

use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::LazyLock;

static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\d{1,2}[.):]|[-*•])\s*").expect("static pattern"));

pub const FALLBACK_QUESTION: &str = "If we could teleport anywhere right now, where would we go?";
pub const FALLBACK_DARE: (&str, i64) = ("Send a selfie making a funny face.", 50);
pub const FALLBACK_OPTIONS: [&str; 3] = ["Option A", "Option B", "Option C"];
/// Price of a generated dare that came back without one.
pub const DEFAULT_DARE_PRICE: i64 = 30;
const MAX_DARE_PRICE: i64 = 1000;
const MAX_LINE: usize = 300;

pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParseError {
    #[error("empty response")]
    Empty,
    #[error("expected a single line, got {0}")]
    MultiLine(usize),
    #[error("response too long ({0} chars)")]
    TooLong(usize),
    #[error("invalid price '{0}'")]
    BadPrice(String),
    #[error("expected {expected} options, got {got}")]
    WrongCount { expected: usize, got: usize },
    #[error("unparseable timestamp '{0}'")]
    BadTimestamp(String),
}

pub const QUESTION_THEMES: &[&str] = &[
    "DEEP: Ask about a childhood memory, a core value, or a fear.",
    "SPICY: Ask about a turn-on, an attractive trait, or a romantic wish.",
    "FUTURE: Ask about a specific future scenario (kids, house, travel, aging).",
    "HYPOTHETICAL: Ask a 'What if we were...' or 'Zombie apocalypse' style question.",
    "NOSTALGIA: Ask about a specific happy memory from our relationship.",
    "GRATITUDE: Ask what is one small thing they appreciate today.",
];

pub fn question_prompt(theme: &str) -> String {
    format!(
        "You are a relationship coach for a couple.\n\
         Generate ONE unique question for them based on this theme:\n{}\n\n\
         Do NOT ask about wrestling, fighting, or superpowers.\n\
         Output ONLY the question text on a single line. Keep it short and engaging.",
        theme
    )
}

pub fn dare_prompt() -> String {
    "Generate ONE fun relationship dare.\n\
     Format: DARE_TEXT | PRICE_INT\n\
     Example: Do a chicken dance | 50\n\n\
     Constraints:\n\
     - No touch (long distance).\n\
     - No strangers.\n\
     - Fun but slightly embarrassing or physically active."
        .to_string()
}

pub fn options_prompt(category: &str, criteria: &str) -> String {
    format!(
        "Give me 3 distinct options for: {}\n\
         Based on these preferences: {}\n\n\
         Output ONLY a list of exactly 3 items, one per line, nothing else.",
        category, criteria
    )
}

pub fn time_prompt(input: &str, now: NaiveDateTime) -> String {
    format!(
        "Current Time: {}\n\
         User Input: \"{}\"\n\n\
         Extract the target datetime from the input.\n\
         Format: YYYY-MM-DD HH:MM:SS\n\n\
         If no time is found, output: None",
        now.format(TIME_FORMAT),
        input
    )
}

fn clean(raw: &str) -> String {
    raw.replace(['*', '"'], "").trim().to_string()
}

fn single_line(raw: &str) -> Result<String, ParseError> {
    let text = clean(raw);
    if text.is_empty() {
        return Err(ParseError::Empty);
    }
    let lines = text.lines().filter(|l| !l.trim().is_empty()).count();
    if lines > 1 {
        return Err(ParseError::MultiLine(lines));
    }
    if text.chars().count() > MAX_LINE {
        return Err(ParseError::TooLong(text.chars().count()));
    }
    Ok(text)
}

pub fn parse_question(raw: &str) -> Result<String, ParseError> {
    single_line(raw)
}

/// `TEXT | PRICE`. A bare line with no pipe is accepted at the default price;
/// a pipe followed by anything but a sane integer is rejected.
pub fn parse_dare(raw: &str) -> Result<(String, i64), ParseError> {
    let line = single_line(raw)?;
    match line.split_once('|') {
        None => Ok((line, DEFAULT_DARE_PRICE)),
        Some((text, price)) => {
            let text = text.trim();
            if text.is_empty() {
                return Err(ParseError::Empty);
            }
            let price_str = price.trim();
            let price: i64 = price_str
                .parse()
                .map_err(|_| ParseError::BadPrice(price_str.to_string()))?;
            if !(1..=MAX_DARE_PRICE).contains(&price) {
                return Err(ParseError::BadPrice(price_str.to_string()));
            }
            Ok((text.to_string(), price))
        }
    }
}

/// Exactly three non-empty items; list markers like `1.`, `-`, `*` are
/// stripped.
pub fn parse_options(raw: &str) -> Result<Vec<String>, ParseError> {
    let items: Vec<String> = raw
        .lines()
        .map(|l| {
            LIST_MARKER
                .replace(l.trim(), "")
                .replace(['*', '"'], "")
                .trim()
                .to_string()
        })
        .filter(|l| !l.is_empty())
        .collect();
    if items.is_empty() {
        return Err(ParseError::Empty);
    }
    if items.len() != 3 {
        return Err(ParseError::WrongCount {
            expected: 3,
            got: items.len(),
        });
    }
    Ok(items)
}

/// `Ok(None)` when the model explicitly found no time.
pub fn parse_event_time(raw: &str) -> Result<Option<NaiveDateTime>, ParseError> {
    let text = raw.trim().trim_matches('`').trim();
    if text.is_empty() {
        return Err(ParseError::Empty);
    }
    if text.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    NaiveDateTime::parse_from_str(text, TIME_FORMAT)
        .map(Some)
        .map_err(|_| ParseError::BadTimestamp(text.to_string()))
}
