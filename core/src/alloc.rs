//! Monotonic id allocation backed by the `nextid` counter key.
//!
//! # Design
//! The counter's read-then-write is serialized behind one mutex, and the
//! incremented value is persisted before the id is handed out. A caller
//! that fails to write its record afterwards leaves a gap in the sequence,
//! but no later allocation can ever return the same id.

use std::sync::Arc;

use parking_lot::Mutex;
use todo_kv::{KvEngine, KvError};
use tracing::debug;

use crate::error::StoreError;
use crate::keys::NEXT_ID_KEY;

/// Sole writer of the counter key.
pub struct IdAllocator<E> {
    engine: Arc<E>,
    lock: Mutex<()>,
}

impl<E: KvEngine> IdAllocator<E> {
    pub fn new(engine: Arc<E>) -> Self {
        Self {
            engine,
            lock: Mutex::new(()),
        }
    }

    /// The id the next allocation will return. A missing counter reads as 0.
    pub fn peek(&self) -> Result<u64, StoreError> {
        let _guard = self.lock.lock();
        self.read_counter()
    }

    /// Reserve and return the next id.
    ///
    /// On `Ok`, the counter already points past the returned id.
    pub fn allocate_next(&self) -> Result<u64, StoreError> {
        let _guard = self.lock.lock();
        let id = self.read_counter()?;
        let next = id.checked_add(1).ok_or(StoreError::IdsExhausted)?;
        self.engine.put(NEXT_ID_KEY, &next.to_be_bytes())?;
        debug!(id, "allocated id");
        Ok(id)
    }

    fn read_counter(&self) -> Result<u64, StoreError> {
        match self.engine.get(NEXT_ID_KEY) {
            Ok(raw) => {
                let bytes: [u8; 8] = raw
                    .as_slice()
                    .try_into()
                    .map_err(|_| StoreError::CorruptCounter { len: raw.len() })?;
                Ok(u64::from_be_bytes(bytes))
            }
            Err(KvError::NotFound) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}
