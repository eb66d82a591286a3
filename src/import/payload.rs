//! Trivia payload models.
//!
//! One payload line is a JSON object in the Open Trivia DB response
//! shape (<https://opentdb.com/api_config.php>): a `results` array of
//! items carrying a category, a question and its correct/incorrect
//! answers. The upstream API HTML-escapes all text, so every string goes
//! through entity decoding before insertion.

use serde::Deserialize;

/// One line of the downloaded payload.
#[derive(Debug, Clone, Deserialize)]
pub struct TriviaPayload {
    #[serde(default)]
    pub results: Vec<TriviaItem>,
}

/// A single trivia question. Fields the engine does not consume
/// (`type`, `difficulty`) are ignored by the deserializer.
#[derive(Debug, Clone, Deserialize)]
pub struct TriviaItem {
    pub category: String,
    pub question: String,
    pub correct_answer: String,
    #[serde(default)]
    pub incorrect_answers: Vec<String>,
}

/// Decode HTML entities (`&quot;`, `&#039;`, ...) left in by the API.
pub fn decode_entities(s: &str) -> String {
    html_escape::decode_html_entities(s).into_owned()
}
