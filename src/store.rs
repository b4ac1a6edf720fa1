//! Embedded key-value storage, the leaf the partitioned match store sits
//! on. Keys are strings, values are JSON-encoded bytes. Key absence is a
//! normal `Ok(None)`, never an error; only backend failures surface as
//! `StoreError`.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::RwLock;

use rocksdb::{Options, WriteBatch, DB};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend: {0}")]
    Backend(#[from] rocksdb::Error),
    #[error("value encoding: {0}")]
    Codec(#[from] serde_json::Error),
}

/// A single operation inside an atomic batch.
#[derive(Debug, Clone)]
pub enum BatchOp {
    Put { key: String, value: Vec<u8> },
    Delete { key: String },
}

impl BatchOp {
    pub fn put_json<T: Serialize>(key: impl Into<String>, value: &T) -> Result<Self, StoreError> {
        Ok(BatchOp::Put {
            key: key.into(),
            value: serde_json::to_vec(value)?,
        })
    }

    pub fn delete(key: impl Into<String>) -> Self {
        BatchOp::Delete { key: key.into() }
    }
}

/// Ordered, persistent string-keyed storage.
///
/// A batch applies all of its operations or none of them; deleting an
/// absent key succeeds.
pub trait KeyValue: Send + Sync {
    fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    fn put_raw(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;

    fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Read several keys in one round trip, preserving input order.
    fn multi_get(&self, keys: &[&str]) -> Result<Vec<Option<Vec<u8>>>, StoreError>;

    /// Atomic multi-key write.
    fn write_batch(&self, ops: Vec<BatchOp>) -> Result<(), StoreError>;
}

/// JSON value decoding over the raw byte API.
pub fn get_json<T: DeserializeOwned>(
    store: &dyn KeyValue,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.get_raw(key)? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// JSON value encoding over the raw byte API.
pub fn put_json<T: Serialize>(
    store: &dyn KeyValue,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    store.put_raw(key, serde_json::to_vec(value)?)
}

/// RocksDB-backed store, the production engine.
pub struct RocksStore {
    db: DB,
}

impl RocksStore {
    /// Open or create the database directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);
        let db = DB::open(&opts, path)?;
        Ok(Self { db })
    }
}

impl KeyValue for RocksStore {
    fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.db.get(key.as_bytes())?)
    }

    fn put_raw(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        Ok(self.db.put(key.as_bytes(), value)?)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        Ok(self.db.delete(key.as_bytes())?)
    }

    fn multi_get(&self, keys: &[&str]) -> Result<Vec<Option<Vec<u8>>>, StoreError> {
        self.db
            .multi_get(keys.iter().map(|k| k.as_bytes()))
            .into_iter()
            .map(|res| res.map_err(StoreError::from))
            .collect()
    }

    fn write_batch(&self, ops: Vec<BatchOp>) -> Result<(), StoreError> {
        let mut batch = WriteBatch::default();
        for op in ops {
            match op {
                BatchOp::Put { key, value } => batch.put(key.as_bytes(), value),
                BatchOp::Delete { key } => batch.delete(key.as_bytes()),
            }
        }
        Ok(self.db.write(batch)?)
    }
}

/// In-memory store for tests: same ordering guarantees as the production
/// engine, no disk.
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValue for MemoryStore {
    fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.data.read().expect("store lock poisoned").get(key).cloned())
    }

    fn put_raw(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.data
            .write()
            .expect("store lock poisoned")
            .insert(key.to_owned(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.data.write().expect("store lock poisoned").remove(key);
        Ok(())
    }

    fn multi_get(&self, keys: &[&str]) -> Result<Vec<Option<Vec<u8>>>, StoreError> {
        let data = self.data.read().expect("store lock poisoned");
        Ok(keys.iter().map(|k| data.get(*k).cloned()).collect())
    }

    fn write_batch(&self, ops: Vec<BatchOp>) -> Result<(), StoreError> {
        let mut data = self.data.write().expect("store lock poisoned");
        for op in ops {
            match op {
                BatchOp::Put { key, value } => {
                    data.insert(key, value);
                }
                BatchOp::Delete { key } => {
                    data.remove(&key);
                }
            }
        }
        Ok(())
    }
}
