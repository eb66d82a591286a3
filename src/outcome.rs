//! Answer validation and outcome transitions.
//!
//! Validation decides whether a submitted answer counts as a success;
//! the transitions then rewrite the question's scheduling state and its
//! set's statistics. All functions here are pure; persistence happens in
//! the engine through a single store transaction per outcome.

use chrono::NaiveDate;

use crate::store::{Answer, Question, SetStatistics};

/// Validate a free-text submission against a single-answer question.
///
/// The comparison is case-insensitive against the stored correct answer.
pub fn check_single_answer(user_answer: &str, answers: &[Answer]) -> bool {
    answers
        .iter()
        .find(|a| a.correct)
        .map(|a| user_answer.to_lowercase() == a.answer.to_lowercase())
        .unwrap_or(false)
}

/// Validate a multiple-choice submission.
///
/// Succeeds only when the selected answer ids are exactly the ids marked
/// correct: every correct answer selected, no incorrect answer selected.
pub fn check_selected_answers(selected_ids: &[i64], answers: &[Answer]) -> bool {
    !answers.is_empty()
        && answers
            .iter()
            .all(|a| selected_ids.contains(&a.answer_id) == a.correct)
}

/// Apply the success transition: the question waits one day longer next
/// time, and the set records a correct attempt.
pub fn apply_success(question: &mut Question, stats: &mut SetStatistics, today: NaiveDate) {
    question.status += 1;
    question.last_shown_date = today.to_string();

    stats.correct_count += 1;
    stats.total_asked += 1;
    stats.last_trained_date = today.to_string();
}

/// Apply the failure transition: the question falls back to the shortest
/// interval. Revealing the answer and running out of time both take this
/// path.
pub fn apply_failure(question: &mut Question, stats: &mut SetStatistics, today: NaiveDate) {
    question.status = 1;
    question.last_shown_date = today.to_string();

    stats.total_asked += 1;
    stats.last_trained_date = today.to_string();
}
