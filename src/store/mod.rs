//! Entity storage for the quiz engine
//!
//! This module provides:
//! - Data models for sets, questions, answers and per-set statistics
//! - A SQLite-backed store with uniqueness and cascade-delete constraints
//! - Transactional compound writes for the set/statistics and
//!   question/statistics pairs

mod models;
mod sqlite;

pub use models::*;
pub use sqlite::{EntityStore, Result, StoreError};
