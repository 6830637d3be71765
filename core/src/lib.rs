//! Persistence core of the todo application.
//!
//! # Overview
//! Todos live in a `KvEngine` as JSON records under `todo_<id>`, next to an
//! 8-byte big-endian `nextid` counter. `TodoStore` is the only code that
//! touches either.
//!
//! # Design
//! - Ids are unique and increase monotonically; they are never reused, and
//!   gaps are tolerated (a failed write after allocation strands its id).
//! - Allocation and record read-modify-write are each serialized in-process.
//!   Only one process may open a given data directory.
//! - `list` sorts after scanning; engine iteration order means nothing.

pub mod alloc;
pub mod error;
pub mod keys;
pub mod store;
pub mod types;

pub use alloc::IdAllocator;
pub use error::StoreError;
pub use store::TodoStore;
pub use types::Todo;
