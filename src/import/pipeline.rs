//! Line-oriented trivia import.
//!
//! The payload is a newline-delimited sequence of JSON objects. Each
//! line becomes one question set: the set and its zero-valued statistics
//! row are created first (one transaction), then questions and answers
//! are inserted item by item, and finally the set is renamed after its
//! category. A failing line is reported and skipped; the remaining lines
//! still run. Rows committed before a mid-line failure are kept.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;

use super::payload::{decode_entities, TriviaPayload};
use crate::store::{Answer, EntityStore, Question, QuestionSet, StoreError};

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("payload line could not be interpreted")]
    Unparseable,

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, ImportError>;

/// Summary of one successfully imported line.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedSet {
    pub set_id: i64,
    pub name: String,
    pub question_count: usize,
}

/// Outcome of one payload line, 1-based line numbers.
#[derive(Debug)]
pub struct LineOutcome {
    pub line: usize,
    pub result: Result<ImportedSet>,
}

/// Import a single payload line into a fresh question set.
pub fn import_line(store: &mut EntityStore, line: &str) -> Result<ImportedSet> {
    let payload: TriviaPayload =
        serde_json::from_str(line).map_err(|_| ImportError::Unparseable)?;
    if payload.results.is_empty() {
        return Err(ImportError::Unparseable);
    }

    // Placeholder name keeps the set unique until the category rename;
    // set and statistics land together before any question insert.
    let placeholder = Utc::now().timestamp_micros().to_string();
    let set_id = store.create_set_with_statistics(&placeholder)?;

    let first_category = &payload.results[0].category;
    let mut multiple_categories = false;

    for item in &payload.results {
        if item.category != *first_category {
            multiple_categories = true;
        }

        let content = decode_entities(&item.question);
        let question_id = store.insert_question(&Question::new(set_id, content))?;

        // The correct answer first, then the wrong ones in payload order
        let correct = decode_entities(&item.correct_answer);
        store.insert_answer(&Answer::new(question_id, correct, true))?;
        for incorrect in &item.incorrect_answers {
            let text = decode_entities(incorrect);
            store.insert_answer(&Answer::new(question_id, text, false))?;
        }
    }

    let name = if multiple_categories {
        format!("Multi-theme set {}", set_id)
    } else {
        format!("{} {}", decode_entities(first_category), set_id)
    };
    store.update_set(&QuestionSet {
        set_id,
        name: name.clone(),
    })?;

    Ok(ImportedSet {
        set_id,
        name,
        question_count: payload.results.len(),
    })
}

/// Import every non-blank line of a payload, collecting per-line
/// outcomes. A failed line never stops the following ones.
pub fn import_payload(store: &mut EntityStore, payload: &str) -> Vec<LineOutcome> {
    let mut outcomes = Vec::new();
    for (idx, line) in payload.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let line_no = idx + 1;
        let result = import_line(store, line);
        match &result {
            Ok(set) => log::info!(
                "imported line {}: set '{}' with {} questions",
                line_no,
                set.name,
                set.question_count
            ),
            Err(e) => log::warn!("import line {} failed: {}", line_no, e),
        }
        outcomes.push(LineOutcome {
            line: line_no,
            result,
        });
    }
    outcomes
}

/// Progress events emitted by a background import.
#[derive(Debug, Clone)]
pub enum ImportEvent {
    LineImported {
        line: usize,
        set_id: i64,
        name: String,
        question_count: usize,
    },
    LineFailed {
        line: usize,
        message: String,
    },
    /// Terminal event; also sent after an abort, with the counts of
    /// whatever lines completed before it.
    Finished {
        imported: usize,
        failed: usize,
        aborted: bool,
    },
}

/// Handle to a background import task.
///
/// The task runs on a blocking thread, reports per-line events over a
/// channel, and checks an abort flag between lines. A fully-committed
/// line is never rolled back by an abort.
pub struct ImportTask {
    abort: Arc<AtomicBool>,
}

impl ImportTask {
    /// Spawn the import of `payload` against the shared store.
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        store: Arc<Mutex<EntityStore>>,
        payload: String,
    ) -> (Self, mpsc::Receiver<ImportEvent>) {
        let (tx, rx) = mpsc::channel(32);
        let abort = Arc::new(AtomicBool::new(false));
        let abort_flag = Arc::clone(&abort);

        tokio::task::spawn_blocking(move || {
            let mut imported = 0usize;
            let mut failed = 0usize;
            let mut aborted = false;

            for (idx, line) in payload.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                if abort_flag.load(Ordering::SeqCst) {
                    log::info!("import aborted after {} lines", imported + failed);
                    aborted = true;
                    break;
                }
                let line_no = idx + 1;
                let result = {
                    let mut store = store.lock().expect("store mutex poisoned");
                    import_line(&mut store, line)
                };
                let event = match result {
                    Ok(set) => {
                        imported += 1;
                        ImportEvent::LineImported {
                            line: line_no,
                            set_id: set.set_id,
                            name: set.name,
                            question_count: set.question_count,
                        }
                    }
                    Err(e) => {
                        failed += 1;
                        log::warn!("import line {} failed: {}", line_no, e);
                        ImportEvent::LineFailed {
                            line: line_no,
                            message: e.to_string(),
                        }
                    }
                };
                if tx.blocking_send(event).is_err() {
                    // Receiver dropped, nobody is listening anymore
                    return;
                }
            }

            let _ = tx.blocking_send(ImportEvent::Finished {
                imported,
                failed,
                aborted,
            });
        });

        (Self { abort }, rx)
    }

    /// Request the task to stop before the next line.
    pub fn abort(&self) {
        self.abort.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> EntityStore {
        EntityStore::open_in_memory().unwrap()
    }

    fn line(items: &[(&str, &str, &str, &[&str])]) -> String {
        let results: Vec<serde_json::Value> = items
            .iter()
            .map(|(category, question, correct, incorrect)| {
                serde_json::json!({
                    "category": category,
                    "type": "multiple",
                    "difficulty": "easy",
                    "question": question,
                    "correct_answer": correct,
                    "incorrect_answers": incorrect,
                })
            })
            .collect();
        serde_json::json!({ "response_code": 0, "results": results }).to_string()
    }

    #[test]
    fn single_category_line_names_set_after_category() {
        let mut store = store();
        let payload = line(&[
            ("Math", "What is 1 + 1?", "2", &["3", "4"]),
            ("Math", "What is 2 + 2?", "4", &["5", "6"]),
        ]);

        let imported = import_line(&mut store, &payload).unwrap();
        assert_eq!(imported.name, format!("Math {}", imported.set_id));
        assert_eq!(imported.question_count, 2);

        let set = store.set_by_id(imported.set_id).unwrap();
        assert_eq!(set.name, imported.name);

        let questions = store.questions_for_set(imported.set_id).unwrap();
        assert_eq!(questions.len(), 2);
        for q in &questions {
            assert_eq!(q.status, 1);
            assert_eq!(q.last_shown_date, "");
            let answers = store.answers_for_question(q.question_id).unwrap();
            assert_eq!(answers.iter().filter(|a| a.correct).count(), 1);
            assert_eq!(answers.len(), 3);
        }

        // Zero-valued statistics row came with the set
        let stats = store.statistics_for_set(imported.set_id).unwrap();
        assert_eq!(stats.total_asked, 0);
    }

    #[test]
    fn mixed_categories_name_multi_theme_set() {
        let mut store = store();
        let payload = line(&[
            ("Math", "What is 1 + 1?", "2", &["3"]),
            ("History", "First man on the moon?", "Armstrong", &["Aldrin"]),
        ]);

        let imported = import_line(&mut store, &payload).unwrap();
        assert_eq!(imported.name, format!("Multi-theme set {}", imported.set_id));
    }

    #[test]
    fn html_entities_are_decoded_everywhere() {
        let mut store = store();
        let payload = line(&[(
            "Art &amp; Culture",
            "Who painted the &quot;Mona Lisa&quot;?",
            "Leonardo da Vinci",
            &["Michelangelo", "Rapha&#235;l"],
        )]);

        let imported = import_line(&mut store, &payload).unwrap();
        assert_eq!(
            imported.name,
            format!("Art & Culture {}", imported.set_id)
        );
        let questions = store.questions_for_set(imported.set_id).unwrap();
        assert_eq!(questions[0].content, "Who painted the \"Mona Lisa\"?");
        let answers = store
            .answers_for_question(questions[0].question_id)
            .unwrap();
        assert!(answers.iter().any(|a| a.answer == "Raphaël"));
    }

    #[test]
    fn answers_preserve_payload_order() {
        let mut store = store();
        let payload = line(&[("Math", "What is 1 + 1?", "2", &["11", "0", "5"])]);
        let imported = import_line(&mut store, &payload).unwrap();
        let questions = store.questions_for_set(imported.set_id).unwrap();
        let answers = store
            .answers_for_question(questions[0].question_id)
            .unwrap();
        let texts: Vec<&str> = answers.iter().map(|a| a.answer.as_str()).collect();
        assert_eq!(texts, vec!["2", "11", "0", "5"]);
        assert!(answers[0].correct);
    }

    #[test]
    fn empty_results_is_unparseable() {
        let mut store = store();
        let err = import_line(&mut store, r#"{"response_code":0,"results":[]}"#).unwrap_err();
        assert!(matches!(err, ImportError::Unparseable));
        assert!(store.all_sets().unwrap().is_empty());
    }

    #[test]
    fn malformed_json_is_unparseable() {
        let mut store = store();
        let err = import_line(&mut store, "{not json").unwrap_err();
        assert!(matches!(err, ImportError::Unparseable));
    }

    #[test]
    fn duplicate_item_fails_line_but_keeps_prior_rows() {
        let mut store = store();
        let payload = line(&[
            ("Math", "What is 1 + 1?", "2", &["3"]),
            ("Math", "What is 1 + 1?", "2", &["3"]),
        ]);

        let err = import_line(&mut store, &payload).unwrap_err();
        assert!(matches!(err, ImportError::Store(StoreError::Duplicate(_))));

        // The set and the first question survive under the placeholder name
        let sets = store.all_sets().unwrap();
        assert_eq!(sets.len(), 1);
        let questions = store.questions_for_set(sets[0].set_id).unwrap();
        assert_eq!(questions.len(), 1);
    }

    #[test]
    fn bad_line_does_not_stop_following_lines() {
        let mut store = store();
        let payload = format!(
            "{}\n{}\n{}",
            line(&[("Math", "What is 1 + 1?", "2", &["3"])]),
            "{broken",
            line(&[("History", "First man on the moon?", "Armstrong", &["Aldrin"])]),
        );

        let outcomes = import_payload(&mut store, &payload);
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].result.is_ok());
        assert!(outcomes[1].result.is_err());
        assert!(outcomes[2].result.is_ok());
        assert_eq!(store.all_sets().unwrap().len(), 2);
    }

    #[test]
    fn blank_lines_are_skipped() {
        let mut store = store();
        let payload = format!("\n{}\n   \n", line(&[("Math", "What is 1 + 1?", "2", &["3"])]));
        let outcomes = import_payload(&mut store, &payload);
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].line, 2);
    }

    #[tokio::test]
    async fn background_import_reports_events() {
        let store = Arc::new(Mutex::new(store()));
        let payload = format!(
            "{}\n{}",
            line(&[("Math", "What is 1 + 1?", "2", &["3"])]),
            "{broken"
        );

        let (_task, mut rx) = ImportTask::spawn(Arc::clone(&store), payload);

        let mut imported = 0;
        let mut failed = 0;
        while let Some(event) = rx.recv().await {
            match event {
                ImportEvent::LineImported { .. } => imported += 1,
                ImportEvent::LineFailed { .. } => failed += 1,
                ImportEvent::Finished {
                    imported: done,
                    failed: bad,
                    aborted,
                } => {
                    assert_eq!(done, 1);
                    assert_eq!(bad, 1);
                    assert!(!aborted);
                }
            }
        }
        assert_eq!(imported, 1);
        assert_eq!(failed, 1);
        assert_eq!(store.lock().unwrap().all_sets().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn aborted_import_keeps_committed_lines() {
        let store = Arc::new(Mutex::new(store()));
        // Abort before spawning is the deterministic way to exercise the
        // between-lines check: no line should run at all.
        let payload = line(&[("Math", "What is 1 + 1?", "2", &["3"])]);
        let (task, mut rx) = ImportTask::spawn(Arc::clone(&store), payload);
        task.abort();

        let mut finished = None;
        while let Some(event) = rx.recv().await {
            if let ImportEvent::Finished {
                imported,
                failed,
                aborted,
            } = event
            {
                finished = Some((imported, failed, aborted));
            }
        }
        let (imported, failed, aborted) = finished.unwrap();
        // Either the single line beat the abort flag or nothing ran;
        // both leave the store consistent with the reported counts.
        assert_eq!(failed, 0);
        if aborted {
            assert_eq!(imported, 0);
            assert!(store.lock().unwrap().all_sets().unwrap().is_empty());
        } else {
            assert_eq!(imported, 1);
            assert_eq!(store.lock().unwrap().all_sets().unwrap().len(), 1);
        }
    }
}
