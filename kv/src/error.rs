//! Error type shared by every `KvEngine` implementation.
//!
//! # Design
//! `NotFound` is its own variant because the todo store maps it to a
//! distinct outcome (missing counter means zero, missing record means 404).
//! Everything else is an engine failure the caller cannot fix.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KvError {
    /// The requested key is not present.
    #[error("key not found")]
    NotFound,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The data file holds a record that cannot be replayed.
    #[error("corrupt record at offset {offset}: {reason}")]
    Corrupt { offset: u64, reason: String },

    /// An earlier write failed and could not be rolled back; the store
    /// must be reopened before it accepts writes again.
    #[error("store stopped accepting writes after an unrecoverable write error")]
    Failed,

    #[error("key of {0} bytes exceeds the record format limit")]
    KeyTooLarge(usize),

    #[error("value of {0} bytes exceeds the record format limit")]
    ValueTooLarge(usize),
}

impl KvError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, KvError::NotFound)
    }
}
