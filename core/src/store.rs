//! Todo persistence on top of a `KvEngine`.
//!
//! # Design
//! `TodoStore` owns the `todo_<id>` namespace and, through `IdAllocator`,
//! the `nextid` counter. Every call blocks on engine I/O; async callers are
//! expected to run it on a blocking-capable thread.
//!
//! - `add` reserves the id before writing the record, so a failed record
//!   write only burns an id.
//! - `toggle` and `delete` share one record lock. A toggle racing a delete
//!   cannot write a deleted record back, and two toggles never lose a flip.
//! - `list` takes no lock. Keys that disappear between the scan and the
//!   read are skipped; any record that fails to decode aborts the listing.

use std::sync::Arc;

use parking_lot::Mutex;
use todo_kv::{KvEngine, KvError};
use tracing::{debug, error, warn};

use crate::alloc::IdAllocator;
use crate::error::StoreError;
use crate::keys::{parse_todo_key, todo_key, NEXT_ID_KEY};
use crate::types::Todo;

pub struct TodoStore<E> {
    engine: Arc<E>,
    ids: IdAllocator<E>,
    records: Mutex<()>,
}

impl<E: KvEngine> TodoStore<E> {
    pub fn new(engine: E) -> Self {
        Self::from_shared(Arc::new(engine))
    }

    pub fn from_shared(engine: Arc<E>) -> Self {
        Self {
            ids: IdAllocator::new(engine.clone()),
            engine,
            records: Mutex::new(()),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The id the next `add` will assign.
    pub fn next_id(&self) -> Result<u64, StoreError> {
        self.ids.peek()
    }

    /// Every todo, ascending by id.
    pub fn list(&self) -> Result<Vec<Todo>, StoreError> {
        let mut todos = Vec::new();

        self.engine.fold(|key| -> Result<(), StoreError> {
            if key == NEXT_ID_KEY {
                return Ok(());
            }
            if parse_todo_key(key).is_none() {
                warn!(key, "ignoring key outside the todo namespace");
                return Ok(());
            }

            match self.engine.get(key) {
                Ok(bytes) => {
                    todos.push(decode(key, &bytes)?);
                    Ok(())
                }
                Err(KvError::NotFound) => {
                    debug!(key, "todo removed during listing");
                    Ok(())
                }
                Err(e) => {
                    error!(key, error = %e, "error getting todo");
                    Err(e.into())
                }
            }
        })?;

        // The engine iterates in no particular order.
        todos.sort();
        Ok(todos)
    }

    pub fn get(&self, id: u64) -> Result<Todo, StoreError> {
        self.read(id)
    }

    /// Create a todo under a freshly allocated id.
    pub fn add(&self, title: impl Into<String>) -> Result<Todo, StoreError> {
        let mut todo = Todo::new(title);
        todo.id = self.ids.allocate_next()?;

        if let Err(e) = self.write(&todo) {
            warn!(id = todo.id, error = %e, "record write failed, id stays unused");
            return Err(e);
        }
        debug!(id = todo.id, "added todo");
        Ok(todo)
    }

    /// Flip `done` and return the record as stored afterwards.
    pub fn toggle(&self, id: u64) -> Result<Todo, StoreError> {
        let todo = self.update(id, Todo::toggle_done)?;
        debug!(id, done = todo.done, "toggled todo");
        Ok(todo)
    }

    pub fn delete(&self, id: u64) -> Result<(), StoreError> {
        let _guard = self.records.lock();
        self.engine.delete(&todo_key(id)).map_err(|e| match e {
            KvError::NotFound => StoreError::NotFound(id),
            other => StoreError::from(other),
        })?;
        debug!(id, "deleted todo");
        Ok(())
    }

    /// Read-modify-write of one record, serialized against other updates
    /// and deletes.
    fn update(&self, id: u64, change: impl FnOnce(&mut Todo)) -> Result<Todo, StoreError> {
        let _guard = self.records.lock();
        let mut todo = self.read(id)?;
        change(&mut todo);
        self.write(&todo)?;
        Ok(todo)
    }

    fn read(&self, id: u64) -> Result<Todo, StoreError> {
        let key = todo_key(id);
        match self.engine.get(&key) {
            Ok(bytes) => decode(&key, &bytes),
            Err(KvError::NotFound) => Err(StoreError::NotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, todo: &Todo) -> Result<(), StoreError> {
        let bytes = todo.encode().map_err(StoreError::Encode)?;
        self.engine.put(&todo_key(todo.id), &bytes)?;
        Ok(())
    }
}

fn decode(key: &str, bytes: &[u8]) -> Result<Todo, StoreError> {
    Todo::decode(bytes).map_err(|source| {
        error!(key, error = %source, "error unmarshaling todo");
        StoreError::Decode {
            key: key.to_string(),
            source,
        }
    })
}
