//! In-memory record store.

use crate::domain::{ClaimRecord, ClaimState, StateGuard, StoreError};
use crate::ports::RecordStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Record store backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<HashMap<String, ClaimRecord>>,
    should_fail: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `Unclaimed` records for `codes`.
    pub fn with_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        {
            let mut records = store.records.write();
            for code in codes {
                let record = ClaimRecord::unclaimed(code, 0);
                records.insert(record.code.clone(), record);
            }
        }
        store
    }

    /// Fail every call.
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    /// Fail compare-and-set only; reads keep working.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Overwrite a record unconditionally (crash simulation).
    pub fn put(&self, record: ClaimRecord) {
        self.records.write().insert(record.code.clone(), record);
    }

    /// Synchronous read for assertions.
    pub fn snapshot(&self, code: &str) -> Option<ClaimRecord> {
        self.records.read().get(code).cloned()
    }

    /// Successful compare-and-set writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("Mock failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn get(&self, code: &str) -> Result<Option<ClaimRecord>, StoreError> {
        self.check_available()?;
        Ok(self.records.read().get(code).cloned())
    }

    async fn compare_and_set(
        &self,
        code: &str,
        expected: StateGuard,
        new: ClaimRecord,
    ) -> Result<bool, StoreError> {
        self.check_available()?;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("Mock write failure".to_string()));
        }

        let mut records = self.records.write();
        match records.get_mut(code) {
            Some(current) if expected.matches(current) => {
                *current = new;
                self.writes.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_if_absent(&self, record: ClaimRecord) -> Result<bool, StoreError> {
        self.check_available()?;
        let mut records = self.records.write();
        if records.contains_key(&record.code) {
            return Ok(false);
        }
        records.insert(record.code.clone(), record);
        Ok(true)
    }

    async fn list_by_state(&self, state: ClaimState) -> Result<Vec<ClaimRecord>, StoreError> {
        self.check_available()?;
        let mut out: Vec<ClaimRecord> = self
            .records
            .read()
            .values()
            .filter(|r| r.state == state)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(out)
    }
}
