//! In-process session store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::record::{LookupField, SessionRecord};
use crate::storage::SessionStore;
use crate::{Result, StoreError};

/// Session store backed by a map behind one lock.
///
/// Every operation, `atomic_replace` included, runs entirely under that lock,
/// which gives the same all-or-nothing guarantee the SQLite backend gets from
/// a single statement.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, SessionRecord>>,
    offline: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: while offline every call fails with `Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Snapshot of every stored record, in no particular order.
    pub fn records(&self) -> Vec<SessionRecord> {
        self.records.lock().values().cloned().collect()
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        Ok(())
    }
}

impl SessionStore for MemoryStore {
    fn insert(&self, record: &SessionRecord) -> Result<()> {
        self.check_online()?;
        let mut records = self.records.lock();
        if records.contains_key(&record.session_id) {
            return Err(StoreError::DuplicateKey(record.session_id.clone()));
        }
        records.insert(record.session_id.clone(), record.clone());
        Ok(())
    }

    fn find_one_by(&self, field: LookupField, value: &str) -> Result<Option<SessionRecord>> {
        self.check_online()?;
        let records = self.records.lock();
        let found = match field {
            LookupField::SessionId => records.get(value).cloned(),
            LookupField::PreviousId => records
                .values()
                .find(|r| r.previous_id == value)
                .cloned(),
        };
        Ok(found)
    }

    fn atomic_replace(
        &self,
        match_session_id: &str,
        match_updated: DateTime<Utc>,
        record: &SessionRecord,
    ) -> Result<SessionRecord> {
        self.check_online()?;
        let mut records = self.records.lock();

        match records.get(match_session_id) {
            Some(current) if current.updated == match_updated => {}
            _ => return Err(StoreError::NoMatch(match_session_id.to_string())),
        }
        if record.session_id != match_session_id && records.contains_key(&record.session_id) {
            return Err(StoreError::DuplicateKey(record.session_id.clone()));
        }

        records.remove(match_session_id);
        records.insert(record.session_id.clone(), record.clone());
        Ok(record.clone())
    }

    fn delete_by(&self, field: LookupField, value: &str) -> Result<usize> {
        self.check_online()?;
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|_, r| field.value_of(r) != value);
        Ok(before - records.len())
    }

    fn delete_where_updated_before(&self, threshold: DateTime<Utc>) -> Result<usize> {
        self.check_online()?;
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|_, r| r.updated >= threshold);
        Ok(before - records.len())
    }

    fn count(&self) -> Result<usize> {
        self.check_online()?;
        Ok(self.records.lock().len())
    }

    fn count_updated_before(&self, threshold: DateTime<Utc>) -> Result<usize> {
        self.check_online()?;
        Ok(self
            .records
            .lock()
            .values()
            .filter(|r| r.updated < threshold)
            .count())
    }

    fn list(&self, limit: usize) -> Result<Vec<SessionRecord>> {
        self.check_online()?;
        let mut all: Vec<_> = self.records.lock().values().cloned().collect();
        all.sort_by(|a, b| b.updated.cmp(&a.updated));
        all.truncate(limit);
        Ok(all)
    }
}
