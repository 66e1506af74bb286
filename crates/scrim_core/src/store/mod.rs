//! Transactional document store boundary.
//!
//! Documents are schemaless JSON values versioned per document. A commit is
//! a batch of compare-and-swap writes applied atomically: if any expected
//! version does not match, the whole batch fails with `Conflict` and nothing
//! is applied. That is the only primitive the coordinator needs to make
//! read-compute-write cycles race-free.

mod file;
mod memory;

use serde_json::Value;
use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;

pub const SCRIMS_COLLECTION: &str = "scrims";
pub const MATCHES_COLLECTION: &str = "matches";

#[derive(Debug, Clone, PartialEq)]
pub struct VersionedDoc {
    pub version: u64,
    pub data: Value,
}

#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Write a document. `expected_version: None` means the document must
    /// not exist yet (create); `Some(v)` means it must currently be at `v`.
    Put {
        collection: String,
        id: String,
        expected_version: Option<u64>,
        data: Value,
    },
    /// Delete a document, conditionally on its current version.
    Delete {
        collection: String,
        id: String,
        expected_version: Option<u64>,
    },
}

impl WriteOp {
    pub fn put(collection: &str, id: &str, expected_version: Option<u64>, data: Value) -> Self {
        WriteOp::Put {
            collection: collection.to_string(),
            id: id.to_string(),
            expected_version,
            data,
        }
    }

    pub fn delete(collection: &str, id: &str, expected_version: Option<u64>) -> Self {
        WriteOp::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
            expected_version,
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("write conflict on {collection}/{id}")]
    Conflict { collection: String, id: String },

    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub trait DocumentStore: Send + Sync {
    fn read(&self, collection: &str, id: &str) -> Result<Option<VersionedDoc>, StoreError>;

    /// All documents in a collection, id-ordered. Fine for side tables like
    /// match history; scrims are always addressed by id.
    fn list(&self, collection: &str) -> Result<Vec<(String, VersionedDoc)>, StoreError>;

    /// Apply the batch atomically or not at all.
    fn commit(&self, writes: Vec<WriteOp>) -> Result<(), StoreError>;
}
