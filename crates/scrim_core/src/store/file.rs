use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{DocumentStore, StoreError, VersionedDoc, WriteOp};

#[derive(Debug, Serialize, Deserialize)]
struct FileDoc {
    version: u64,
    data: Value,
}

/// Directory-backed store: `<root>/<collection>/<id>.json` per document.
///
/// A commit validates every expected version under the lock, then writes each
/// document to a temp file and renames it into place, so individual documents
/// are always intact on disk. Single-process only; the mutex is the
/// serialization point, not the filesystem.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root, lock: Mutex::new(()) })
    }

    fn doc_path(&self, collection: &str, id: &str) -> PathBuf {
        self.root.join(collection).join(format!("{}.json", id))
    }

    fn load(&self, path: &Path) -> Result<Option<FileDoc>, StoreError> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, path: &Path, doc: &FileDoc) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(doc)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl DocumentStore for FileStore {
    fn read(&self, collection: &str, id: &str) -> Result<Option<VersionedDoc>, StoreError> {
        let _guard = self.lock.lock().unwrap();
        let doc = self.load(&self.doc_path(collection, id))?;
        Ok(doc.map(|d| VersionedDoc { version: d.version, data: d.data }))
    }

    fn list(&self, collection: &str) -> Result<Vec<(String, VersionedDoc)>, StoreError> {
        let _guard = self.lock.lock().unwrap();
        let dir = self.root.join(collection);
        let mut out = Vec::new();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(out),
            Err(err) => return Err(err.into()),
        };
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()).map(String::from) else {
                continue;
            };
            if let Some(doc) = self.load(&path)? {
                out.push((id, VersionedDoc { version: doc.version, data: doc.data }));
            }
        }
        out.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(out)
    }

    fn commit(&self, writes: Vec<WriteOp>) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap();

        for op in &writes {
            let (collection, id, expected, is_delete) = match op {
                WriteOp::Put { collection, id, expected_version, .. } => {
                    (collection, id, *expected_version, false)
                }
                WriteOp::Delete { collection, id, expected_version } => {
                    (collection, id, *expected_version, true)
                }
            };
            let current = self.load(&self.doc_path(collection, id))?.map(|d| d.version);
            let ok = match (expected, current) {
                (None, None) => !is_delete,
                (None, Some(_)) => is_delete,
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
                    let path = self.doc_path(&collection, &id);
                    self.save(&path, &FileDoc { version, data })?;
                }
                WriteOp::Delete { collection, id, .. } => {
                    let path = self.doc_path(&collection, &id);
                    match fs::remove_file(&path) {
                        Ok(()) => {}
                        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                        Err(err) => return Err(err.into()),
                    }
                }
            }
        }
        log::debug!("file store commit applied under {}", self.root.display());
        Ok(())
    }
}
