//! In-memory key/value database. Every connection sees the same store.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use rq_container::BoxError;
use serde_json::Value;

use crate::database::Database;

#[derive(Clone, Default)]
pub struct MemoryDatabase {
    store: Arc<RwLock<BTreeMap<String, Value>>>,
    next_id: Arc<AtomicU64>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connections opened so far.
    pub fn connections_opened(&self) -> u64 {
        self.next_id.load(Ordering::Relaxed)
    }
}

impl Database for MemoryDatabase {
    type Connection = MemoryConnection;

    async fn new_connection(&self) -> Result<MemoryConnection, BoxError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(MemoryConnection {
            id,
            store: self.store.clone(),
        })
    }
}

pub struct MemoryConnection {
    id: u64,
    store: Arc<RwLock<BTreeMap<String, Value>>>,
}

impl MemoryConnection {
    /// 1-based id, unique per database.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.store.read().get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.store.write().insert(key.into(), value)
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.store.write().remove(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.store.read().keys().cloned().collect()
    }

    /// Add `by` to an integer value (missing counts as 0) and return the result.
    pub fn increment(&self, key: &str, by: i64) -> i64 {
        let mut store = self.store.write();
        let current = store.get(key).and_then(Value::as_i64).unwrap_or(0);
        let next = current + by;
        store.insert(key.to_string(), Value::from(next));
        next
    }
}

impl std::fmt::Debug for MemoryConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryConnection").field("id", &self.id).finish()
    }
}
