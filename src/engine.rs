//! Quiz engine service layer.
//!
//! `QuizEngine` owns the shared entity store and exposes the command and
//! query surface the presentation layer talks to: set/question/answer
//! CRUD, due-question scheduling, answer outcomes and statistics. The
//! scheduling and transition logic itself lives in the pure
//! [`crate::scheduler`], [`crate::outcome`] and [`crate::stats`] modules;
//! the engine only loads snapshots, applies them and persists the result.
//!
//! Writers emit [`ChangeEvent`]s over a broadcast channel so interested
//! components can refresh instead of polling.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::import::{self, ImportError, ImportEvent, ImportTask, ImportedSet, LineOutcome};
use crate::outcome;
use crate::scheduler;
use crate::stats::{self, TotalStatistics};
use crate::store::{
    Answer, EntityStore, Question, QuestionSet, Result, SetStatistics, StoreError,
};

/// Entity kinds a change subscriber can react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Set,
    Question,
    Answer,
    Statistics,
}

/// Notification that entities of a kind changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: EntityKind,
}

/// A set's statistics together with its training recency.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetOverview {
    pub statistics: SetStatistics,
    pub days_since_training: Option<i64>,
}

pub struct QuizEngine {
    store: Arc<Mutex<EntityStore>>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl QuizEngine {
    pub fn new(store: EntityStore) -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            store: Arc::new(Mutex::new(store)),
            changes,
        }
    }

    /// Shared handle to the underlying store, for background tasks.
    pub fn shared_store(&self) -> Arc<Mutex<EntityStore>> {
        Arc::clone(&self.store)
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, EntityStore> {
        self.store.lock().expect("store mutex poisoned")
    }

    fn notify(&self, kind: EntityKind) {
        let _ = self.changes.send(ChangeEvent { kind });
    }

    // ==================== Set / Question / Answer Commands ====================

    /// Create a set with its paired statistics row. Returns the set id.
    pub fn create_set(&self, name: &str) -> Result<i64> {
        let set_id = self.lock().create_set_with_statistics(name)?;
        self.notify(EntityKind::Set);
        self.notify(EntityKind::Statistics);
        Ok(set_id)
    }

    /// Delete a set; its questions, answers and statistics cascade.
    pub fn delete_set(&self, set_id: i64) -> Result<()> {
        self.lock().delete_set(set_id)?;
        self.notify(EntityKind::Set);
        self.notify(EntityKind::Question);
        self.notify(EntityKind::Answer);
        self.notify(EntityKind::Statistics);
        Ok(())
    }

    /// Add a question to a set with the default scheduling state.
    pub fn add_question(&self, set_id: i64, content: &str) -> Result<i64> {
        let question_id = self.lock().insert_question(&Question::new(set_id, content))?;
        self.notify(EntityKind::Question);
        Ok(question_id)
    }

    /// Rewrite a question's text and status. The status keeps its floor
    /// of one day.
    pub fn update_question(&self, question_id: i64, content: &str, status: i64) -> Result<()> {
        {
            let mut store = self.lock();
            let mut question = store.question_by_id(question_id)?;
            question.content = content.to_string();
            question.status = status.max(1);
            store.update_question(&question)?;
        }
        self.notify(EntityKind::Question);
        Ok(())
    }

    pub fn delete_question(&self, question_id: i64) -> Result<()> {
        self.lock().delete_question(question_id)?;
        self.notify(EntityKind::Question);
        self.notify(EntityKind::Answer);
        Ok(())
    }

    pub fn add_answer(&self, question_id: i64, text: &str, correct: bool) -> Result<i64> {
        let answer_id = self
            .lock()
            .insert_answer(&Answer::new(question_id, text, correct))?;
        self.notify(EntityKind::Answer);
        Ok(answer_id)
    }

    pub fn update_answer(&self, answer_id: i64, text: &str, correct: bool) -> Result<()> {
        {
            let mut store = self.lock();
            let mut answer = store.answer_by_id(answer_id)?;
            answer.answer = text.to_string();
            answer.correct = correct;
            store.update_answer(&answer)?;
        }
        self.notify(EntityKind::Answer);
        Ok(())
    }

    // ==================== Read Accessors ====================

    pub fn sets(&self) -> Result<Vec<QuestionSet>> {
        self.lock().all_sets()
    }

    pub fn set(&self, set_id: i64) -> Result<QuestionSet> {
        self.lock().set_by_id(set_id)
    }

    pub fn question(&self, question_id: i64) -> Result<Question> {
        self.lock().question_by_id(question_id)
    }

    pub fn questions_for_set(&self, set_id: i64) -> Result<Vec<Question>> {
        self.lock().questions_for_set(set_id)
    }

    pub fn answers_for_question(&self, question_id: i64) -> Result<Vec<Answer>> {
        self.lock().answers_for_question(question_id)
    }

    // ==================== Scheduling ====================

    /// Questions of a set due on `today`.
    pub fn due_questions(&self, set_id: i64, today: NaiveDate) -> Result<Vec<Question>> {
        let questions = self.lock().questions_for_set(set_id)?;
        Ok(scheduler::due_questions(&questions, today)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Every set with at least one due question on `today`.
    pub fn sets_with_due_questions(&self, today: NaiveDate) -> Result<Vec<QuestionSet>> {
        let store = self.lock();
        let mut due_sets = Vec::new();
        for set in store.all_sets()? {
            let questions = store.questions_for_set(set.set_id)?;
            if questions.iter().any(|q| scheduler::is_due(q, today)) {
                due_sets.push(set);
            }
        }
        Ok(due_sets)
    }

    /// One uniformly-random due question of a set, `None` when the set
    /// has nothing due.
    pub fn pick_random_due(&self, set_id: i64, today: NaiveDate) -> Result<Option<Question>> {
        let questions = self.lock().questions_for_set(set_id)?;
        let mut rng = rand::thread_rng();
        Ok(scheduler::pick_random_due(&questions, today, &mut rng).cloned())
    }

    // ==================== Answer Outcomes ====================

    /// Record a correct answer: longer interval for the question, one
    /// more correct attempt for the set. Both updates commit together.
    pub fn record_success(&self, question_id: i64, today: NaiveDate) -> Result<Question> {
        self.record_outcome(question_id, today, outcome::apply_success)
    }

    /// Record a failed attempt; revealing the answer and timing out are
    /// recorded the same way. The question falls back to a one-day
    /// interval.
    pub fn record_failure(&self, question_id: i64, today: NaiveDate) -> Result<Question> {
        self.record_outcome(question_id, today, outcome::apply_failure)
    }

    fn record_outcome(
        &self,
        question_id: i64,
        today: NaiveDate,
        transition: fn(&mut Question, &mut SetStatistics, NaiveDate),
    ) -> Result<Question> {
        let question = {
            let mut store = self.lock();
            let mut question = store.question_by_id(question_id)?;
            let mut statistics = store.statistics_for_set(question.set_id)?;
            transition(&mut question, &mut statistics, today);
            store.apply_outcome(&question, &statistics)?;
            question
        };
        self.notify(EntityKind::Question);
        self.notify(EntityKind::Statistics);
        Ok(question)
    }

    /// Validate a free-text submission and record the outcome.
    /// Returns whether the answer counted as a success.
    pub fn submit_single_answer(
        &self,
        question_id: i64,
        user_answer: &str,
        today: NaiveDate,
    ) -> Result<bool> {
        let answers = self.lock().answers_for_question(question_id)?;
        let success = outcome::check_single_answer(user_answer, &answers);
        if success {
            self.record_success(question_id, today)?;
        } else {
            self.record_failure(question_id, today)?;
        }
        Ok(success)
    }

    /// Validate a multiple-choice selection and record the outcome.
    pub fn submit_selected_answers(
        &self,
        question_id: i64,
        selected_ids: &[i64],
        today: NaiveDate,
    ) -> Result<bool> {
        let answers = self.lock().answers_for_question(question_id)?;
        let success = outcome::check_selected_answers(selected_ids, &answers);
        if success {
            self.record_success(question_id, today)?;
        } else {
            self.record_failure(question_id, today)?;
        }
        Ok(success)
    }

    // ==================== Statistics ====================

    /// Totals across every set.
    pub fn aggregate_all(&self, today: NaiveDate) -> Result<TotalStatistics> {
        let all = self.lock().all_statistics()?;
        Ok(stats::aggregate(&all, today))
    }

    /// One set's statistics with its training recency.
    pub fn aggregate_for_set(&self, set_id: i64, today: NaiveDate) -> Result<SetOverview> {
        let statistics = self.lock().statistics_for_set(set_id)?;
        let days_since_training = stats::days_since_trained(&statistics, today);
        Ok(SetOverview {
            statistics,
            days_since_training,
        })
    }

    /// Run the all-sets aggregation off the caller's thread. The result
    /// arrives on the returned one-shot channel. Must be called from
    /// within a tokio runtime.
    pub fn spawn_aggregate_all(
        &self,
        today: NaiveDate,
    ) -> oneshot::Receiver<std::result::Result<TotalStatistics, StoreError>> {
        let (tx, rx) = oneshot::channel();
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || {
            let result = store
                .lock()
                .expect("store mutex poisoned")
                .all_statistics()
                .map(|all| stats::aggregate(&all, today));
            let _ = tx.send(result);
        });
        rx
    }

    // ==================== Import ====================

    /// Import one payload line into a fresh question set.
    pub fn submit_import_line(
        &self,
        line: &str,
    ) -> std::result::Result<ImportedSet, ImportError> {
        let imported = import::import_line(&mut self.lock(), line)?;
        self.notify(EntityKind::Set);
        self.notify(EntityKind::Question);
        self.notify(EntityKind::Answer);
        self.notify(EntityKind::Statistics);
        Ok(imported)
    }

    /// Import a whole payload synchronously, one outcome per line.
    pub fn import_payload(&self, payload: &str) -> Vec<LineOutcome> {
        let outcomes = import::import_payload(&mut self.lock(), payload);
        if outcomes.iter().any(|o| o.result.is_ok()) {
            self.notify(EntityKind::Set);
            self.notify(EntityKind::Question);
            self.notify(EntityKind::Answer);
            self.notify(EntityKind::Statistics);
        }
        outcomes
    }

    /// Import a payload on a background task; per-line events arrive on
    /// the returned channel and the task can be aborted between lines.
    /// Must be called from within a tokio runtime.
    pub fn import_payload_async(
        &self,
        payload: String,
    ) -> (ImportTask, mpsc::Receiver<ImportEvent>) {
        ImportTask::spawn(self.shared_store(), payload)
    }

    // ==================== Sample Data ====================

    /// Seed the starter sets on an empty store. Returns whether anything
    /// was inserted.
    pub fn seed_sample_data(&self) -> Result<bool> {
        if !self.lock().all_sets()?.is_empty() {
            return Ok(false);
        }

        let math = self.create_set("Math Formulas")?;
        let french = self.create_set("French Vocabulary")?;

        let pi = self.add_question(math, "What is Pi?")?;
        self.add_answer(pi, "3.14", true)?;
        self.add_answer(pi, "trois-point-quatorze", true)?;
        self.add_answer(pi, "3.14159265359", true)?;
        self.add_answer(pi, "4.13", false)?;

        let sum = self.add_question(math, "What is 1 + 1")?;
        self.add_answer(sum, "2", true)?;

        let apple = self.add_question(french, "What is 'apple' in French?")?;
        self.add_answer(apple, "pomme", true)?;

        let strawberry = self.add_question(french, "What is 'Strawberry' in French?")?;
        self.add_answer(strawberry, "Cerise", false)?;
        self.add_answer(strawberry, "Fraise", true)?;
        self.add_answer(strawberry, "Framboise", false)?;

        log::info!("seeded sample question sets");
        Ok(true)
    }
}
