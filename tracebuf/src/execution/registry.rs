//! Execution Registry
//!
//! Maps execution ids to their records. Structural changes (register,
//! remove, sweep) take the write lock; lookups take the read lock and hand out an
//! `Arc` so callers never hold the map lock while reading a record.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::record::{ExecutionRecord, RecordWriter};
use crate::domain::ExecutionId;

#[derive(Debug, Default)]
pub struct ExecutionRegistry {
    records: RwLock<HashMap<ExecutionId, Arc<ExecutionRecord>>>,
}

impl ExecutionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a `Running` record under a fresh id and insert it
    ///
    /// The id is drawn until it does not collide with a live entry; the check
    /// and the insert happen under the same write lock.
    #[must_use]
    pub fn register(&self, max_lines: usize) -> (Arc<ExecutionRecord>, RecordWriter) {
        let mut records = self.records.write();
        let id = loop {
            let candidate = ExecutionId::generate();
            if !records.contains_key(&candidate) {
                break candidate;
            }
        };
        let (record, writer) = ExecutionRecord::create(id.clone(), max_lines, Instant::now());
        records.insert(id, Arc::clone(&record));
        (record, writer)
    }

    /// Insert an existing record under its own id, replacing nothing
    ///
    /// Returns false if the id is already taken.
    #[cfg(test)]
    pub(crate) fn insert(&self, record: Arc<ExecutionRecord>) -> bool {
        let mut records = self.records.write();
        if records.contains_key(record.id()) {
            return false;
        }
        records.insert(record.id().clone(), record);
        true
    }

    #[must_use]
    pub fn lookup(&self, id: &str) -> Option<Arc<ExecutionRecord>> {
        self.records.read().get(id).cloned()
    }

    pub fn remove(&self, id: &str) -> Option<Arc<ExecutionRecord>> {
        self.records.write().remove(id)
    }

    /// Remove every record with `now - created_at > retention`, whatever its
    /// status. Returns the removed records.
    pub fn sweep(&self, now: Instant, retention: Duration) -> Vec<Arc<ExecutionRecord>> {
        let mut records = self.records.write();
        let expired: Vec<ExecutionId> = records
            .iter()
            .filter(|(_, record)| record.age(now) > retention)
            .map(|(id, _)| id.clone())
            .collect();

        expired.iter().filter_map(|id| records.remove(id)).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    #[cfg(test)]
    pub(crate) fn ids(&self) -> Vec<ExecutionId> {
        self.records.read().keys().cloned().collect()
    }
}
