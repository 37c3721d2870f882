//! Probabilistic sweep of expired session records.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use satchel_store::{SessionStore, StoreError};
use tracing::{debug, info, warn};

use crate::validate::expiry_threshold;

/// Deletes records that have been idle longer than the expiration window.
///
/// Runs inline after writes with a configurable chance, or on demand via
/// [`sweep`](Self::sweep) from a scheduled job.
#[derive(Clone)]
pub struct GarbageCollector {
    store: Arc<dyn SessionStore>,
    probability: u8,
    expiration: Duration,
}

impl std::fmt::Debug for GarbageCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GarbageCollector")
            .field("probability", &self.probability)
            .field("expiration", &self.expiration)
            .finish_non_exhaustive()
    }
}

impl GarbageCollector {
    /// `probability` is a percentage; values above 100 behave like 100.
    pub fn new(store: Arc<dyn SessionStore>, probability: u8, expiration: Duration) -> Self {
        Self {
            store,
            probability: probability.min(100),
            expiration,
        }
    }

    pub fn probability(&self) -> u8 {
        self.probability
    }

    /// Records updated strictly before this instant are expired at `now`.
    pub fn threshold(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        expiry_threshold(self.expiration, now)
    }

    /// Roll the dice: `true` with `probability` percent chance.
    pub fn should_sweep(&self) -> bool {
        rand::rng().random_range(0..100u8) < self.probability
    }

    /// Sweep with the configured probability. Failures are logged and dropped.
    ///
    /// Returns the number of deleted records if a sweep ran and succeeded.
    pub fn maybe_sweep(&self, now: DateTime<Utc>) -> Option<usize> {
        if !self.should_sweep() {
            return None;
        }
        match self.sweep(now) {
            Ok(deleted) => Some(deleted),
            Err(e) => {
                warn!(error = %e, "Session sweep failed");
                None
            }
        }
    }

    /// Delete every expired record now.
    pub fn sweep(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let threshold = self.threshold(now);
        let deleted = self.store.delete_where_updated_before(threshold)?;
        if deleted > 0 {
            info!(deleted, %threshold, "Swept expired sessions");
        } else {
            debug!(%threshold, "Session sweep found nothing to delete");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use satchel_store::{LookupField, MemoryStore, SessionRecord};

    fn seeded(now: DateTime<Utc>) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for (id, age) in [("stale", 7300), ("edge", 7200), ("fresh", 10)] {
            let at = now - TimeDelta::seconds(age);
            store
                .insert(&SessionRecord {
                    session_id: id.to_string(),
                    previous_id: id.to_string(),
                    ip_hash: String::new(),
                    user_agent: String::new(),
                    created: at,
                    updated: at,
                    payload: String::new(),
                })
                .unwrap();
        }
        store
    }

    #[test]
    fn test_always_sweeps_only_expired() {
        let now = Utc::now();
        let store = seeded(now);
        let gc = GarbageCollector::new(store.clone(), 100, Duration::from_secs(7200));

        assert_eq!(gc.maybe_sweep(now), Some(1));
        assert!(store.find_one_by(LookupField::SessionId, "stale").unwrap().is_none());
        // updated == threshold is not strictly before it
        assert!(store.find_one_by(LookupField::SessionId, "edge").unwrap().is_some());
        assert!(store.find_one_by(LookupField::SessionId, "fresh").unwrap().is_some());
    }

    #[test]
    fn test_zero_probability_never_sweeps() {
        let now = Utc::now();
        let store = seeded(now);
        let gc = GarbageCollector::new(store.clone(), 0, Duration::from_secs(7200));

        for _ in 0..500 {
            assert_eq!(gc.maybe_sweep(now), None);
        }
        assert_eq!(store.count().unwrap(), 3);
    }

    #[test]
    fn test_full_probability_always_fires() {
        let gc = GarbageCollector::new(Arc::new(MemoryStore::new()), 250, Duration::from_secs(1));
        assert_eq!(gc.probability(), 100);
        assert!((0..500).all(|_| gc.should_sweep()));
    }

    #[test]
    fn test_failures_are_swallowed() {
        let now = Utc::now();
        let store = seeded(now);
        store.set_offline(true);
        let gc = GarbageCollector::new(store.clone(), 100, Duration::from_secs(7200));

        assert_eq!(gc.maybe_sweep(now), None);
        assert!(gc.sweep(now).is_err());
    }
}
