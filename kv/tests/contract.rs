//! Both engines must satisfy the same contract the todo store relies on.

use todo_kv::{KvEngine, KvError, LogOptions, LogStore, MemoryEngine};

fn exercise<E: KvEngine>(engine: &E) {
    assert!(engine.get("nextid").unwrap_err().is_not_found());

    engine.put("nextid", &3u64.to_be_bytes()).unwrap();
    engine.put("todo_0", br#"{"id":0}"#).unwrap();
    engine.put("todo_1", br#"{"id":1}"#).unwrap();
    assert_eq!(engine.get("nextid").unwrap(), 3u64.to_be_bytes());

    engine.delete("todo_0").unwrap();
    assert!(matches!(engine.delete("todo_0"), Err(KvError::NotFound)));

    let mut keys = Vec::new();
    engine
        .fold(|key| {
            keys.push(key.to_string());
            Ok::<_, KvError>(())
        })
        .unwrap();
    keys.sort();
    assert_eq!(keys, vec!["nextid", "todo_1"]);
}

#[test]
fn memory_engine_contract() {
    exercise(&MemoryEngine::new());
}

#[test]
fn log_store_contract() {
    let dir = tempfile::tempdir().unwrap();
    let store = LogStore::open(dir.path(), LogOptions::default()).unwrap();
    exercise(&store);
}
