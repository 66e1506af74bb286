use std::collections::HashMap;
use std::sync::Mutex;

use super::{DocumentStore, StoreError, VersionedDoc, WriteOp};

/// In-process store: one mutex over a map of `(collection, id)` documents.
/// Commits validate every expected version before applying anything, so a
/// batch is all-or-nothing under the lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<(String, String), VersionedDoc>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryStore {
    fn read(&self, collection: &str, id: &str) -> Result<Option<VersionedDoc>, StoreError> {
        let docs = self.docs.lock().unwrap();
        Ok(docs.get(&(collection.to_string(), id.to_string())).cloned())
    }

    fn list(&self, collection: &str) -> Result<Vec<(String, VersionedDoc)>, StoreError> {
        let docs = self.docs.lock().unwrap();
        let mut out: Vec<(String, VersionedDoc)> = docs
            .iter()
            .filter(|((coll, _), _)| coll == collection)
            .map(|((_, id), doc)| (id.clone(), doc.clone()))
            .collect();
        out.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(out)
    }

    fn commit(&self, writes: Vec<WriteOp>) -> Result<(), StoreError> {
        let mut docs = self.docs.lock().unwrap();

        // Validation pass: every precondition must hold before any write.
        for op in &writes {
            let (collection, id, expected) = match op {
                WriteOp::Put { collection, id, expected_version, .. } => {
                    (collection, id, *expected_version)
                }
                WriteOp::Delete { collection, id, expected_version } => {
                    (collection, id, *expected_version)
                }
            };
            let current = docs.get(&(collection.clone(), id.clone())).map(|d| d.version);
            let ok = match (expected, current) {
                (None, None) => !matches!(op, WriteOp::Delete { .. }),
                (None, Some(_)) => matches!(op, WriteOp::Delete { .. }),
                (Some(want), Some(have)) => want == have,
                (Some(_), None) => false,
            };
            if !ok {
                return Err(StoreError::Conflict {
                    collection: collection.clone(),
                    id: id.clone(),
                });
            }
        }

        for op in writes {
            match op {
                WriteOp::Put { collection, id, expected_version, data } => {
                    let version = expected_version.map_or(1, |v| v + 1);
                    docs.insert((collection, id), VersionedDoc { version, data });
                }
                WriteOp::Delete { collection, id, .. } => {
                    docs.remove(&(collection, id));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_then_update_bumps_version() {
        let store = MemoryStore::new();
        store
            .commit(vec![WriteOp::put("scrims", "s1", None, json!({"n": 1}))])
            .unwrap();
        let doc = store.read("scrims", "s1").unwrap().unwrap();
        assert_eq!(doc.version, 1);

        store
            .commit(vec![WriteOp::put("scrims", "s1", Some(1), json!({"n": 2}))])
            .unwrap();
        let doc = store.read("scrims", "s1").unwrap().unwrap();
        assert_eq!(doc.version, 2);
        assert_eq!(doc.data["n"], 2);
    }

    #[test]
    fn stale_version_conflicts_and_applies_nothing() {
        let store = MemoryStore::new();
        store
            .commit(vec![WriteOp::put("scrims", "s1", None, json!({"n": 1}))])
            .unwrap();

        let err = store
            .commit(vec![
                WriteOp::put("scrims", "s1", Some(99), json!({"n": 2})),
                WriteOp::put("matches", "m1", None, json!({})),
            ])
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        // Nothing from the failed batch landed.
        assert_eq!(store.read("scrims", "s1").unwrap().unwrap().data["n"], 1);
        assert!(store.read("matches", "m1").unwrap().is_none());
    }

    #[test]
    fn create_conflicts_when_document_exists() {
        let store = MemoryStore::new();
        store.commit(vec![WriteOp::put("scrims", "s1", None, json!({}))]).unwrap();
        let err = store
            .commit(vec![WriteOp::put("scrims", "s1", None, json!({}))])
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[test]
    fn delete_requires_matching_version() {
        let store = MemoryStore::new();
        store.commit(vec![WriteOp::put("scrims", "s1", None, json!({}))]).unwrap();

        let err = store
            .commit(vec![WriteOp::delete("scrims", "s1", Some(7))])
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));

        store.commit(vec![WriteOp::delete("scrims", "s1", Some(1))]).unwrap();
        assert!(store.read("scrims", "s1").unwrap().is_none());
    }

    #[test]
    fn list_is_id_ordered_per_collection() {
        let store = MemoryStore::new();
        store
            .commit(vec![
                WriteOp::put("matches", "b", None, json!({})),
                WriteOp::put("matches", "a", None, json!({})),
                WriteOp::put("scrims", "s", None, json!({})),
            ])
            .unwrap();
        let ids: Vec<String> = store.list("matches").unwrap().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
