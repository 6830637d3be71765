//! The todo record as held in memory and as stored in the key-value engine.
//!
//! # Design
//! The stored form is a JSON object with the fields `id`, `title` and `done`.
//! Field order in the derived `Ord` puts `id` first, so sorting a listing
//! orders it by id; the remaining fields only break ties between records
//! that could never coexist in one store.

use serde::{Deserialize, Serialize};

/// A single todo item.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Todo {
    pub id: u64,
    pub title: String,
    pub done: bool,
}

impl Todo {
    /// A fresh, not-yet-done item. The id is left at zero until the store
    /// assigns one.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: 0,
            title: title.into(),
            done: false,
        }
    }

    pub fn toggle_done(&mut self) {
        self.done = !self.done;
    }

    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
