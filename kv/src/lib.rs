//! Embedded key-value engines backing the todo store.
//!
//! # Overview
//! `KvEngine` is the narrow contract the todo store consumes: point
//! get/put/delete on string keys plus a full-key fold in unspecified order.
//!
//! # Design
//! - `LogStore` is the persistent engine: a single append-only data file
//!   with an in-memory key directory, replayed on open and compacted once
//!   enough stale bytes pile up.
//! - `MemoryEngine` keeps everything in a `HashMap` and exists for tests
//!   and throwaway instances.
//! - Both are `Send + Sync` and take `&self`, so one handle is shared by
//!   every request worker.

pub mod engine;
pub mod error;
pub mod log;
pub mod memory;

pub use engine::KvEngine;
pub use error::KvError;
pub use log::{LogOptions, LogStore};
pub use memory::MemoryEngine;
