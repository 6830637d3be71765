//! Layout of the store's key namespace.

/// Key of the 8-byte big-endian id counter.
pub const NEXT_ID_KEY: &str = "nextid";

const TODO_PREFIX: &str = "todo_";

pub fn todo_key(id: u64) -> String {
    format!("{TODO_PREFIX}{id}")
}

/// Id encoded in a record key, if `key` is exactly what `todo_key` produces.
pub fn parse_todo_key(key: &str) -> Option<u64> {
    let digits = key.strip_prefix(TODO_PREFIX)?;
    let id = digits.parse::<u64>().ok()?;
    // Reject "+1", "007" and the like so each id maps to a single key.
    (id.to_string() == digits).then_some(id)
}
