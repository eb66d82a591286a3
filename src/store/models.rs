//! Data models for the quiz engine

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A named collection of questions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSet {
    pub set_id: i64,
    /// Globally unique display name
    pub name: String,
}

impl QuestionSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            set_id: 0,
            name: name.into(),
        }
    }
}

/// A question belonging to a set.
///
/// `status` encodes the minimum day-gap before the question becomes due
/// again: it grows by one on every correct answer and falls back to 1 on
/// a failure. `last_shown_date` is an ISO date string, empty while the
/// question has never been shown.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question_id: i64,
    pub set_id: i64,
    pub content: String,
    #[serde(default = "default_status")]
    pub status: i64,
    #[serde(default)]
    pub last_shown_date: String,
}

fn default_status() -> i64 {
    1
}

impl Question {
    pub fn new(set_id: i64, content: impl Into<String>) -> Self {
        Self {
            question_id: 0,
            set_id,
            content: content.into(),
            status: default_status(),
            last_shown_date: String::new(),
        }
    }

    /// Date the question was last shown, `None` when never shown or the
    /// stored string does not parse as an ISO date.
    pub fn last_shown(&self) -> Option<NaiveDate> {
        parse_iso_date(&self.last_shown_date)
    }
}

/// One answer choice for a question.
///
/// A question with a single answer is free-text: the user must type the
/// stored text. With two or more answers it is multiple-choice and the
/// `correct` flags mark the exact subset the user has to select.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub answer_id: i64,
    pub question_id: i64,
    pub answer: String,
    pub correct: bool,
}

impl Answer {
    pub fn new(question_id: i64, answer: impl Into<String>, correct: bool) -> Self {
        Self {
            answer_id: 0,
            question_id,
            answer: answer.into(),
            correct,
        }
    }
}

/// Per-set training statistics, one row per set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SetStatistics {
    pub set_id: i64,
    #[serde(default)]
    pub correct_count: i64,
    #[serde(default)]
    pub total_asked: i64,
    #[serde(default)]
    pub last_trained_date: String,
}

impl SetStatistics {
    pub fn new(set_id: i64) -> Self {
        Self {
            set_id,
            correct_count: 0,
            total_asked: 0,
            last_trained_date: String::new(),
        }
    }

    /// Date the set was last trained, `None` when never trained.
    pub fn last_trained(&self) -> Option<NaiveDate> {
        parse_iso_date(&self.last_trained_date)
    }
}

/// Parse an ISO `YYYY-MM-DD` date string, treating empty or malformed
/// values as absent.
pub fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_question_has_default_state() {
        let q = Question::new(1, "What is Pi?");
        assert_eq!(q.status, 1);
        assert_eq!(q.last_shown_date, "");
        assert_eq!(q.last_shown(), None);
    }

    #[test]
    fn parse_iso_date_handles_empty_and_garbage() {
        assert_eq!(parse_iso_date(""), None);
        assert_eq!(parse_iso_date("not-a-date"), None);
        assert_eq!(
            parse_iso_date("2024-01-31"),
            NaiveDate::from_ymd_opt(2024, 1, 31)
        );
    }

    #[test]
    fn models_serialize_camel_case() {
        let set = QuestionSet {
            set_id: 3,
            name: "Math".into(),
        };
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json["setId"], 3);
        assert_eq!(json["name"], "Math");
    }
}
