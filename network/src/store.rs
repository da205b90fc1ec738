// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared key-value store with change notifications
//!
//! The session protocol only needs a handful of operations from its backing
//! store: whole-value reads and writes, partial field updates, a
//! read-modify-write transaction and per-key change notifications. Any
//! eventually consistent realtime database can sit behind [`SharedStore`].
//! [`MemoryStore`] keeps everything in process and can emulate the quirks of
//! such databases.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

/// Transport-level failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store cannot be reached
    #[error("shared store unavailable")]
    Unavailable,

    /// A partial update targeted something that is not an object
    #[error("value at {0} is not an object")]
    NotAnObject(String),

    /// A value could not be encoded for the store
    #[error("failed to encode value: {0}")]
    Encoding(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Encoding(err.to_string())
    }
}

/// Decision returned by a transaction closure
#[derive(Debug, Clone, PartialEq)]
pub enum Transaction {
    /// Write this value
    Commit(Value),
    /// Delete the key
    Remove,
    /// Leave the key as it is
    Abort,
}

/// Result of a transaction
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionOutcome {
    /// Whether a write or delete happened
    pub committed: bool,
    /// The value under the key once the transaction finished
    pub value: Option<Value>,
}

/// Closure deciding a transaction from the current value
pub type TransactionFn<'a> = &'a (dyn Fn(Option<Value>) -> Transaction + Send + Sync);

/// An eventually consistent key-value store with push notifications
#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Read the value under `key`
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Replace the value under `key`
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Write the given top-level fields, leaving the others untouched. A null
    /// field deletes it. Creates the value when absent.
    async fn update_fields(&self, key: &str, fields: Map<String, Value>) -> Result<(), StoreError>;

    /// Atomically read-modify-write the value under `key`
    async fn transaction(&self, key: &str, decide: TransactionFn<'_>) -> Result<TransactionOutcome, StoreError>;

    /// Delete `key`
    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Keys starting with `prefix`, in ascending order
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Receive every later value of `key`; `None` when it is deleted
    fn subscribe(&self, key: &str) -> broadcast::Receiver<Option<Value>>;
}

/// Behaviour switches for [`MemoryStore`]
#[derive(Debug, Clone)]
pub struct MemoryStoreOptions {
    /// Store arrays the way realtime databases do: arrays with holes become
    /// index-keyed objects, and nulls and empty containers are dropped.
    pub sparse_arrays: bool,
    /// Deliver every notification twice
    pub duplicate_notifications: bool,
    /// Capacity of each per-key notification channel
    pub notification_buffer: usize,
}

impl Default for MemoryStoreOptions {
    fn default() -> Self {
        Self {
            sparse_arrays: false,
            duplicate_notifications: false,
            notification_buffer: 64,
        }
    }
}

struct Inner {
    data: Mutex<BTreeMap<String, Value>>,
    watchers: Mutex<HashMap<String, broadcast::Sender<Option<Value>>>>,
    available: AtomicBool,
    options: MemoryStoreOptions,
}

/// In-process [`SharedStore`]. Clones share the same data.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("keys", &self.inner.data.lock().len())
            .field("available", &self.is_available())
            .field("options", &self.inner.options)
            .finish()
    }
}

impl MemoryStore {
    /// Create an empty store with default options
    pub fn new() -> Self {
        Self::with_options(MemoryStoreOptions::default())
    }

    /// Create an empty store
    pub fn with_options(options: MemoryStoreOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                data: Mutex::new(BTreeMap::new()),
                watchers: Mutex::new(HashMap::new()),
                available: AtomicBool::new(true),
                options,
            }),
        }
    }

    /// Simulate an outage: while unavailable every operation fails
    pub fn set_available(&self, available: bool) {
        tracing::info!(available, "Memory store availability changed");
        self.inner.available.store(available, Ordering::SeqCst);
    }

    /// Whether operations currently succeed
    pub fn is_available(&self) -> bool {
        self.inner.available.load(Ordering::SeqCst)
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.is_available() {
            Ok(())
        } else {
            Err(StoreError::Unavailable)
        }
    }

    /// Apply storage coercion and write or delete `key`. Caller holds the
    /// data lock so notifications go out in write order.
    fn write_locked(&self, data: &mut BTreeMap<String, Value>, key: &str, value: Option<Value>) -> Option<Value> {
        let stored = value.and_then(|v| {
            if self.inner.options.sparse_arrays {
                coerce_sparse(v)
            } else if v.is_null() {
                None
            } else {
                Some(v)
            }
        });

        match &stored {
            Some(v) => {
                data.insert(key.to_string(), v.clone());
            }
            None => {
                data.remove(key);
            }
        }
        self.notify(key, &stored);
        stored
    }

    fn notify(&self, key: &str, value: &Option<Value>) {
        let watchers = self.inner.watchers.lock();
        let Some(tx) = watchers.get(key) else { return };
        let copies = if self.inner.options.duplicate_notifications { 2 } else { 1 };
        for _ in 0..copies {
            // No receivers left is not an error for the writer.
            let _ = tx.send(value.clone());
        }
    }
}

/// Realtime-database storage rules: nulls vanish, empty containers vanish,
/// arrays with holes turn into objects keyed by index.
fn coerce_sparse(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Array(items) => {
            let has_holes = items.iter().any(Value::is_null);
            let kept: Vec<(usize, Value)> = items
                .into_iter()
                .enumerate()
                .filter_map(|(i, v)| coerce_sparse(v).map(|v| (i, v)))
                .collect();
            if kept.is_empty() {
                None
            } else if has_holes || kept.iter().enumerate().any(|(pos, (i, _))| pos != *i) {
                Some(Value::Object(kept.into_iter().map(|(i, v)| (i.to_string(), v)).collect()))
            } else {
                Some(Value::Array(kept.into_iter().map(|(_, v)| v).collect()))
            }
        }
        Value::Object(fields) => {
            let kept: Map<String, Value> = fields
                .into_iter()
                .filter_map(|(k, v)| coerce_sparse(v).map(|v| (k, v)))
                .collect();
            if kept.is_empty() {
                None
            } else {
                Some(Value::Object(kept))
            }
        }
        other => Some(other),
    }
}

#[async_trait]
impl SharedStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.ensure_available()?;
        Ok(self.inner.data.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.ensure_available()?;
        let mut data = self.inner.data.lock();
        self.write_locked(&mut data, key, Some(value));
        Ok(())
    }

    async fn update_fields(&self, key: &str, fields: Map<String, Value>) -> Result<(), StoreError> {
        self.ensure_available()?;
        let mut data = self.inner.data.lock();
        let mut current = match data.get(key).cloned() {
            Some(Value::Object(map)) => map,
            Some(_) => return Err(StoreError::NotAnObject(key.to_string())),
            None => Map::new(),
        };
        for (field, value) in fields {
            if value.is_null() {
                current.remove(&field);
            } else {
                current.insert(field, value);
            }
        }
        self.write_locked(&mut data, key, Some(Value::Object(current)));
        Ok(())
    }

    async fn transaction(&self, key: &str, decide: TransactionFn<'_>) -> Result<TransactionOutcome, StoreError> {
        self.ensure_available()?;
        let mut data = self.inner.data.lock();
        let current = data.get(key).cloned();
        let outcome = match decide(current.clone()) {
            Transaction::Commit(value) => TransactionOutcome {
                committed: true,
                value: self.write_locked(&mut data, key, Some(value)),
            },
            Transaction::Remove => TransactionOutcome {
                committed: true,
                value: self.write_locked(&mut data, key, None),
            },
            Transaction::Abort => TransactionOutcome {
                committed: false,
                value: current,
            },
        };
        Ok(outcome)
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.ensure_available()?;
        let mut data = self.inner.data.lock();
        if data.contains_key(key) {
            self.write_locked(&mut data, key, None);
        }
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.ensure_available()?;
        Ok(self
            .inner
            .data
            .lock()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn subscribe(&self, key: &str) -> broadcast::Receiver<Option<Value>> {
        let mut watchers = self.inner.watchers.lock();
        watchers
            .entry(key.to_string())
            .or_insert_with(|| broadcast::channel(self.inner.options.notification_buffer.max(1)).0)
            .subscribe()
    }
}
