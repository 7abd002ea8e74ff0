use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use carton_shared::{CartonError, Result};

use crate::RecordStore;

type Records = HashMap<(String, String), String>;

/// Process-local [`RecordStore`]. Clones share the same records.
#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<Records>>,
    writes: Arc<AtomicUsize>,
    fail_writes: Arc<AtomicBool>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = self.records.read().map(|r| r.len()).unwrap_or(0);
        f.debug_struct("MemoryStore")
            .field("records", &len)
            .field("writes", &self.writes())
            .finish()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `store_raw` and `delete` calls so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make every subsequent write fail with a storage error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn poisoned() -> CartonError {
        CartonError::Storage("memory store lock poisoned".into())
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CartonError::Storage("memory store rejected write".into()));
        }
        Ok(())
    }
}

impl RecordStore for MemoryStore {
    async fn fetch_raw(&self, bucket: &str, id: &str) -> Result<Option<String>> {
        let guard = self.records.read().map_err(|_| Self::poisoned())?;
        Ok(guard.get(&(bucket.to_string(), id.to_string())).cloned())
    }

    async fn store_raw(&self, bucket: &str, id: &str, body: &str) -> Result<()> {
        self.check_writable()?;
        let mut guard = self.records.write().map_err(|_| Self::poisoned())?;
        guard.insert((bucket.to_string(), id.to_string()), body.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, bucket: &str, id: &str) -> Result<()> {
        self.check_writable()?;
        let mut guard = self.records.write().map_err(|_| Self::poisoned())?;
        guard.remove(&(bucket.to_string(), id.to_string()));
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list_ids(&self, bucket: &str) -> Result<Vec<String>> {
        let guard = self.records.read().map_err(|_| Self::poisoned())?;
        let ids: BTreeMap<&str, ()> = guard
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, id)| (id.as_str(), ()))
            .collect();
        Ok(ids.into_keys().map(String::from).collect())
    }
}
