//! In-memory store for unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::catalog::{FlagRecord, RecordKey};

use super::errors::{Result, StoreError};
use super::{RecordFilter, RecordStore};

/// One call made against the store, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Delete(RecordKey),
    Insert(usize),
    Find,
}

#[derive(Default)]
struct Inner {
    records: Vec<FlagRecord>,
    calls: Vec<StoreCall>,
    fail_inserts: bool,
}

/// Shared-state store; clones observe the same records.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<FlagRecord>) -> Self {
        let store = Self::new();
        store.lock().records = records;
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory store lock should not be poisoned")
    }

    pub fn records(&self) -> Vec<FlagRecord> {
        self.lock().records.clone()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    /// Make every following `insert_many` fail.
    pub fn fail_inserts(&self) {
        self.lock().fail_inserts = true;
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn delete_matching(&self, key: &RecordKey) -> Result<u64> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::Delete(key.clone()));
        let before = inner.records.len();
        inner.records.retain(|r| r.key() != *key);
        Ok((before - inner.records.len()) as u64)
    }

    async fn insert_many(&self, records: &[FlagRecord]) -> Result<u64> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::Insert(records.len()));
        if inner.fail_inserts {
            return Err(StoreError::corrupt("insert rejected by test store"));
        }
        inner.records.extend_from_slice(records);
        Ok(records.len() as u64)
    }

    async fn find(&self, filter: &RecordFilter) -> Result<Vec<FlagRecord>> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::Find);
        let mut found: Vec<FlagRecord> = inner
            .records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            (&a.service, a.team, a.round, &a.description)
                .cmp(&(&b.service, b.team, b.round, &b.description))
        });
        Ok(found)
    }
}
