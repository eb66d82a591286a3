//! SQLite-backed entity store.
//!
//! Four tables back the quiz engine: question sets, questions, answers
//! and per-set statistics. Uniqueness and foreign-key constraints live in
//! the schema; constraint violations are mapped onto the error taxonomy
//! so callers see `Duplicate` / `NotFound` instead of raw SQLite codes.
//!
//! Compound writes (set + statistics creation, question + statistics
//! outcome updates) run inside explicit transactions so readers never
//! observe one half of a pair.

use std::path::Path;

use rusqlite::{ffi, params, Connection, OptionalExtension, Row};
use thiserror::Error;

use super::models::{Answer, Question, QuestionSet, SetStatistics};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("duplicate entry: {0}")]
    Duplicate(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Map a failed insert onto the error taxonomy.
///
/// Unique-index violations become `Duplicate`; a missing foreign-key
/// target becomes `NotFound`. Everything else is a persistence failure.
fn map_constraint_err(err: rusqlite::Error, what: &str) -> StoreError {
    if let rusqlite::Error::SqliteFailure(e, _) = &err {
        match e.extended_code {
            ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                return StoreError::Duplicate(what.to_string());
            }
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                return StoreError::NotFound(what.to_string());
            }
            _ => {}
        }
    }
    StoreError::Sqlite(err)
}

/// Entity store over a single SQLite connection
pub struct EntityStore {
    conn: Connection,
}

impl EntityStore {
    /// Open (or create) the store at the given path.
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        Self::init(conn)
    }

    /// Open a transient in-memory store.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS question_sets (
                set_id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS questions (
                question_id INTEGER PRIMARY KEY AUTOINCREMENT,
                set_id INTEGER NOT NULL
                    REFERENCES question_sets(set_id) ON DELETE CASCADE,
                content TEXT NOT NULL,
                status INTEGER NOT NULL DEFAULT 1,
                last_shown_date TEXT NOT NULL DEFAULT '',
                UNIQUE(content, set_id)
            );

            CREATE TABLE IF NOT EXISTS answers (
                answer_id INTEGER PRIMARY KEY AUTOINCREMENT,
                question_id INTEGER NOT NULL
                    REFERENCES questions(question_id) ON DELETE CASCADE,
                answer TEXT NOT NULL,
                correct INTEGER NOT NULL,
                UNIQUE(answer, question_id)
            );

            -- One statistics row per set, created alongside the set
            CREATE TABLE IF NOT EXISTS question_set_statistics (
                set_id INTEGER PRIMARY KEY
                    REFERENCES question_sets(set_id) ON DELETE CASCADE,
                correct_count INTEGER NOT NULL DEFAULT 0,
                total_asked INTEGER NOT NULL DEFAULT 0,
                last_trained_date TEXT NOT NULL DEFAULT ''
            );

            CREATE INDEX IF NOT EXISTS idx_questions_set_id ON questions(set_id);
            CREATE INDEX IF NOT EXISTS idx_answers_question_id ON answers(question_id);
            "#,
        )?;
        Ok(Self { conn })
    }

    // ==================== Question Set Operations ====================

    /// Insert a set on its own. Most callers want
    /// `create_set_with_statistics` instead, which also creates the
    /// paired statistics row.
    pub fn insert_set(&mut self, set: &QuestionSet) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO question_sets (name) VALUES (?1)",
                params![set.name],
            )
            .map_err(|e| {
                map_constraint_err(e, &format!("question set '{}' already exists", set.name))
            })?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Create a set together with its zero-valued statistics row in one
    /// transaction. Returns the generated set id.
    pub fn create_set_with_statistics(&mut self, name: &str) -> Result<i64> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO question_sets (name) VALUES (?1)",
            params![name],
        )
        .map_err(|e| map_constraint_err(e, &format!("question set '{}' already exists", name)))?;
        let set_id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO question_set_statistics
                 (set_id, correct_count, total_asked, last_trained_date)
             VALUES (?1, 0, 0, '')",
            params![set_id],
        )?;
        tx.commit()?;
        Ok(set_id)
    }

    pub fn update_set(&mut self, set: &QuestionSet) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE question_sets SET name = ?1 WHERE set_id = ?2",
                params![set.name, set.set_id],
            )
            .map_err(|e| {
                map_constraint_err(e, &format!("question set '{}' already exists", set.name))
            })?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!(
                "question set {}",
                set.set_id
            )));
        }
        Ok(())
    }

    /// Delete a set. Questions, answers and statistics cascade.
    pub fn delete_set(&mut self, set_id: i64) -> Result<()> {
        let changed = self.conn.execute(
            "DELETE FROM question_sets WHERE set_id = ?1",
            params![set_id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("question set {}", set_id)));
        }
        Ok(())
    }

    pub fn set_by_id(&self, set_id: i64) -> Result<QuestionSet> {
        self.conn
            .query_row(
                "SELECT set_id, name FROM question_sets WHERE set_id = ?1",
                params![set_id],
                set_from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("question set {}", set_id)))
    }

    pub fn set_id_by_name(&self, name: &str) -> Result<Option<i64>> {
        Ok(self
            .conn
            .query_row(
                "SELECT set_id FROM question_sets WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?)
    }

    pub fn all_sets(&self) -> Result<Vec<QuestionSet>> {
        let mut stmt = self
            .conn
            .prepare("SELECT set_id, name FROM question_sets")?;
        let sets = stmt
            .query_map([], set_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(sets)
    }

    // ==================== Question Operations ====================

    pub fn insert_question(&mut self, question: &Question) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO questions (set_id, content, status, last_shown_date)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    question.set_id,
                    question.content,
                    question.status,
                    question.last_shown_date
                ],
            )
            .map_err(|e| {
                map_constraint_err(
                    e,
                    &format!("question already exists in set {}", question.set_id),
                )
            })?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update_question(&mut self, question: &Question) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE questions
                 SET content = ?1, status = ?2, last_shown_date = ?3
                 WHERE question_id = ?4",
                params![
                    question.content,
                    question.status,
                    question.last_shown_date,
                    question.question_id
                ],
            )
            .map_err(|e| {
                map_constraint_err(
                    e,
                    &format!("question already exists in set {}", question.set_id),
                )
            })?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!(
                "question {}",
                question.question_id
            )));
        }
        Ok(())
    }

    /// Delete a question. Its answers cascade.
    pub fn delete_question(&mut self, question_id: i64) -> Result<()> {
        let changed = self.conn.execute(
            "DELETE FROM questions WHERE question_id = ?1",
            params![question_id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("question {}", question_id)));
        }
        Ok(())
    }

    pub fn question_by_id(&self, question_id: i64) -> Result<Question> {
        self.conn
            .query_row(
                "SELECT question_id, set_id, content, status, last_shown_date
                 FROM questions WHERE question_id = ?1",
                params![question_id],
                question_from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("question {}", question_id)))
    }

    pub fn questions_for_set(&self, set_id: i64) -> Result<Vec<Question>> {
        let mut stmt = self.conn.prepare(
            "SELECT question_id, set_id, content, status, last_shown_date
             FROM questions WHERE set_id = ?1",
        )?;
        let questions = stmt
            .query_map(params![set_id], question_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(questions)
    }

    pub fn all_questions(&self) -> Result<Vec<Question>> {
        let mut stmt = self.conn.prepare(
            "SELECT question_id, set_id, content, status, last_shown_date FROM questions",
        )?;
        let questions = stmt
            .query_map([], question_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(questions)
    }

    // ==================== Answer Operations ====================

    pub fn insert_answer(&mut self, answer: &Answer) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO answers (question_id, answer, correct) VALUES (?1, ?2, ?3)",
                params![answer.question_id, answer.answer, answer.correct],
            )
            .map_err(|e| {
                map_constraint_err(
                    e,
                    &format!("answer already exists for question {}", answer.question_id),
                )
            })?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update_answer(&mut self, answer: &Answer) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE answers SET answer = ?1, correct = ?2 WHERE answer_id = ?3",
                params![answer.answer, answer.correct, answer.answer_id],
            )
            .map_err(|e| {
                map_constraint_err(
                    e,
                    &format!("answer already exists for question {}", answer.question_id),
                )
            })?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("answer {}", answer.answer_id)));
        }
        Ok(())
    }

    pub fn answer_by_id(&self, answer_id: i64) -> Result<Answer> {
        self.conn
            .query_row(
                "SELECT answer_id, question_id, answer, correct
                 FROM answers WHERE answer_id = ?1",
                params![answer_id],
                answer_from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("answer {}", answer_id)))
    }

    pub fn answers_for_question(&self, question_id: i64) -> Result<Vec<Answer>> {
        let mut stmt = self.conn.prepare(
            "SELECT answer_id, question_id, answer, correct
             FROM answers WHERE question_id = ?1 ORDER BY answer_id",
        )?;
        let answers = stmt
            .query_map(params![question_id], answer_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(answers)
    }

    // ==================== Statistics Operations ====================

    pub fn statistics_for_set(&self, set_id: i64) -> Result<SetStatistics> {
        self.conn
            .query_row(
                "SELECT set_id, correct_count, total_asked, last_trained_date
                 FROM question_set_statistics WHERE set_id = ?1",
                params![set_id],
                statistics_from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("statistics for set {}", set_id)))
    }

    pub fn all_statistics(&self) -> Result<Vec<SetStatistics>> {
        let mut stmt = self.conn.prepare(
            "SELECT set_id, correct_count, total_asked, last_trained_date
             FROM question_set_statistics",
        )?;
        let stats = stmt
            .query_map([], statistics_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(stats)
    }

    pub fn update_statistics(&mut self, stats: &SetStatistics) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE question_set_statistics
             SET correct_count = ?1, total_asked = ?2, last_trained_date = ?3
             WHERE set_id = ?4",
            params![
                stats.correct_count,
                stats.total_asked,
                stats.last_trained_date,
                stats.set_id
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!(
                "statistics for set {}",
                stats.set_id
            )));
        }
        Ok(())
    }

    /// Persist an answer outcome: the question update and its paired
    /// statistics update commit together or not at all.
    pub fn apply_outcome(&mut self, question: &Question, stats: &SetStatistics) -> Result<()> {
        let tx = self.conn.transaction()?;
        let changed = tx.execute(
            "UPDATE questions
             SET content = ?1, status = ?2, last_shown_date = ?3
             WHERE question_id = ?4",
            params![
                question.content,
                question.status,
                question.last_shown_date,
                question.question_id
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!(
                "question {}",
                question.question_id
            )));
        }
        let changed = tx.execute(
            "UPDATE question_set_statistics
             SET correct_count = ?1, total_asked = ?2, last_trained_date = ?3
             WHERE set_id = ?4",
            params![
                stats.correct_count,
                stats.total_asked,
                stats.last_trained_date,
                stats.set_id
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!(
                "statistics for set {}",
                stats.set_id
            )));
        }
        tx.commit()?;
        Ok(())
    }
}

fn set_from_row(row: &Row) -> rusqlite::Result<QuestionSet> {
    Ok(QuestionSet {
        set_id: row.get(0)?,
        name: row.get(1)?,
    })
}

fn question_from_row(row: &Row) -> rusqlite::Result<Question> {
    Ok(Question {
        question_id: row.get(0)?,
        set_id: row.get(1)?,
        content: row.get(2)?,
        status: row.get(3)?,
        last_shown_date: row.get(4)?,
    })
}

fn answer_from_row(row: &Row) -> rusqlite::Result<Answer> {
    Ok(Answer {
        answer_id: row.get(0)?,
        question_id: row.get(1)?,
        answer: row.get(2)?,
        correct: row.get(3)?,
    })
}

fn statistics_from_row(row: &Row) -> rusqlite::Result<SetStatistics> {
    Ok(SetStatistics {
        set_id: row.get(0)?,
        correct_count: row.get(1)?,
        total_asked: row.get(2)?,
        last_trained_date: row.get(3)?,
    })
}
