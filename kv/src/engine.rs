use crate::error::KvError;

/// Storage primitives consumed by the todo store.
///
/// Implementations must be safe to share across threads. No operation
/// spans more than one key, so callers needing read-modify-write
/// atomicity serialize it themselves.
pub trait KvEngine: Send + Sync {
    /// Return the value stored under `key`, or `KvError::NotFound`.
    fn get(&self, key: &str) -> Result<Vec<u8>, KvError>;

    /// Store `value` under `key`, replacing any previous value.
    fn put(&self, key: &str, value: &[u8]) -> Result<(), KvError>;

    /// Remove `key`. Removing an absent key is `KvError::NotFound`.
    fn delete(&self, key: &str) -> Result<(), KvError>;

    /// Snapshot of every key currently present, in unspecified order.
    fn keys(&self) -> Result<Vec<String>, KvError>;

    /// Visit every key present when the fold starts, stopping at the first
    /// error returned by `visit`.
    ///
    /// The key set is snapshotted up front, so `visit` may call back into
    /// the engine. Keys removed after the snapshot are still visited.
    fn fold<E, F>(&self, mut visit: F) -> Result<(), E>
    where
        Self: Sized,
        E: From<KvError>,
        F: FnMut(&str) -> Result<(), E>,
    {
        for key in self.keys()? {
            visit(&key)?;
        }
        Ok(())
    }
}
