//! Errors returned by `TodoStore`.
//!
//! # Design
//! `NotFound` is separate from engine failures so the HTTP layer can answer
//! 404 instead of 500. Decode failures carry the offending key; a listing
//! aborts on the first one rather than hiding a damaged record.

use thiserror::Error;
use todo_kv::KvError;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The key-value engine failed (I/O or a damaged data file).
    #[error("storage unavailable: {0}")]
    Storage(#[from] KvError),

    /// Bytes stored under `key` are not a valid todo record.
    #[error("cannot decode record {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The id counter does not hold exactly 8 bytes.
    #[error("id counter holds {len} bytes, expected 8")]
    CorruptCounter { len: usize },

    /// The counter reached `u64::MAX`; no further ids can be issued.
    #[error("id space exhausted")]
    IdsExhausted,

    /// No todo with this id exists.
    #[error("todo {0} not found")]
    NotFound(u64),

    #[error("cannot encode record: {0}")]
    Encode(#[source] serde_json::Error),
}
