//! Trivia payload import
//!
//! This module provides:
//! - Serde models for the newline-delimited trivia payload
//! - HTML entity decoding for API-escaped text
//! - A per-line import pipeline with category-based set naming
//! - An abortable background task reporting per-line outcomes

mod payload;
mod pipeline;

pub use payload::{decode_entities, TriviaItem, TriviaPayload};
pub use pipeline::{
    import_line, import_payload, ImportError, ImportEvent, ImportTask, ImportedSet, LineOutcome,
};
