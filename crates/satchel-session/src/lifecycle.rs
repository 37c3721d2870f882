//! The session lifecycle: create, read, write and destroy.
//!
//! ```text
//! SessionDriver (shared, one per process)
//!     └── start() ──► StoreSession (one per request)
//!                         read ──► resolve ──► validate ──► decode
//!                         write ──► rotate? ──► encode ──► atomic_replace ──► gc
//! ```

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use satchel_config::SessionConfig;
use satchel_store::{
    LookupField, SessionKeys, SessionRecord, SessionStore, SqliteStore, StoreError,
};
use satchel_types::{
    Clock, CookieTransport, Fingerprint, IdGenerator, RandomIdGenerator, RequestContext,
    SystemClock,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::codec::{self, Map};
use crate::error::{Error, Result};
use crate::gc::GarbageCollector;
use crate::rotation;
use crate::validate::{Invalidity, validate};

// ─────────────────────────────────────────────────────────────────────────────
// Capability
// ─────────────────────────────────────────────────────────────────────────────

/// Where a request's session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing loaded yet, or destroyed.
    Uninitialized,
    /// Backed by a stored record.
    Active,
    /// The presented record was unusable; a new one is about to be created.
    Invalid,
}

/// Result of [`SessionLifecycle::write`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Nothing to persist.
    Skipped,
    /// The record was replaced; `rotated` if the token changed.
    Written { rotated: bool },
    /// Another request replaced the record first. The client keeps its token.
    Conflict,
}

/// The operations a request performs on its session.
pub trait SessionLifecycle {
    /// Start a brand-new session and send its token to the client.
    fn create(&mut self) -> Result<()>;

    /// Load the session the client presents, creating one if there is none
    /// or it is unusable. `force` skips the lookup and always creates.
    fn read(&mut self, force: bool) -> Result<()>;

    /// Persist the in-memory session.
    fn write(&mut self) -> Result<WriteOutcome>;

    /// Delete the stored session and forget the in-memory one.
    fn destroy(&mut self) -> Result<()>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Driver
// ─────────────────────────────────────────────────────────────────────────────

/// Long-lived, shareable half of the driver.
///
/// Holds the validated configuration and collaborators; hand out one
/// [`StoreSession`] per request with [`start`](Self::start).
#[derive(Clone)]
pub struct SessionDriver {
    config: Arc<SessionConfig>,
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    gc: GarbageCollector,
}

impl std::fmt::Debug for SessionDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionDriver")
            .field("config", &self.config)
            .field("gc", &self.gc)
            .finish_non_exhaustive()
    }
}

impl SessionDriver {
    /// Build a driver over `store` with the system clock and random ids.
    pub fn new(config: SessionConfig, store: Arc<dyn SessionStore>) -> Self {
        let gc = GarbageCollector::new(
            Arc::clone(&store),
            config.gc_probability,
            config.expiration_time,
        );
        Self {
            config: Arc::new(config),
            store,
            clock: Arc::new(SystemClock),
            ids: Arc::new(RandomIdGenerator),
            gc,
        }
    }

    /// Open the SQLite database named by `config` and build a driver over it.
    pub fn open(config: SessionConfig) -> Result<Self> {
        let store = SqliteStore::connect(&config.database_path, &config.collection)?;
        info!(
            database = %config.database,
            collection = %config.collection,
            "Session driver ready"
        );
        Ok(Self::new(config, Arc::new(store)))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn gc(&self) -> &GarbageCollector {
        &self.gc
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Begin handling one request.
    pub fn start<'r>(
        &'r self,
        cookies: &'r dyn CookieTransport,
        request: &'r dyn RequestContext,
    ) -> StoreSession<'r> {
        StoreSession {
            driver: self,
            cookies,
            request,
            state: SessionState::Uninitialized,
            keys: None,
            data: Map::new(),
            flash: Map::new(),
            rotate_pending: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Per-request session
// ─────────────────────────────────────────────────────────────────────────────

/// A request's view of its session, backed by the driver's store.
///
/// `keys`, `data` and `flash` are a projection of the stored record that is
/// only valid for the current request. Nothing is persisted until
/// [`write`](SessionLifecycle::write).
pub struct StoreSession<'r> {
    driver: &'r SessionDriver,
    cookies: &'r dyn CookieTransport,
    request: &'r dyn RequestContext,
    state: SessionState,
    keys: Option<SessionKeys>,
    data: Map,
    flash: Map,
    rotate_pending: bool,
}

impl std::fmt::Debug for StoreSession<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreSession")
            .field("state", &self.state)
            .field("keys", &self.keys)
            .field("rotate_pending", &self.rotate_pending)
            .finish_non_exhaustive()
    }
}

impl StoreSession<'_> {
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn keys(&self) -> Option<&SessionKeys> {
        self.keys.as_ref()
    }

    /// Current token, if a session is loaded.
    pub fn session_id(&self) -> Option<&str> {
        self.keys.as_ref().map(|k| k.session_id.as_str())
    }

    pub fn data(&self) -> &Map {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Map {
        &mut self.data
    }

    pub fn flash(&self) -> &Map {
        &self.flash
    }

    pub fn flash_mut(&mut self) -> &mut Map {
        &mut self.flash
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    /// Ask for a new token on the next write.
    ///
    /// With `force` the rotation always happens (e.g. after a privilege
    /// change); otherwise only if the rotation policy says it is due.
    /// Returns whether a rotation is now pending.
    pub fn rotate(&mut self, force: bool) -> bool {
        let due = self.keys.as_ref().is_some_and(|k| {
            rotation::is_due(self.driver.config.rotation, k.created, self.driver.now())
        });
        self.rotate_pending |= force || due;
        self.rotate_pending
    }

    /// Look the token up by `session_id`, then by `previous_id`.
    fn resolve(&self, token: &str) -> Result<Option<SessionRecord>> {
        let store = &self.driver.store;
        if let Some(record) = store.find_one_by(LookupField::SessionId, token)? {
            return Ok(Some(record));
        }
        let record = store.find_one_by(LookupField::PreviousId, token)?;
        if let Some(record) = &record {
            debug!(
                presented = %token,
                session_id = %record.session_id,
                "Resolved rotated token"
            );
        }
        Ok(record)
    }

    /// Validate a stored record and decode its payload.
    fn load(&self, record: &SessionRecord) -> std::result::Result<(Map, Map), Invalidity> {
        let fingerprint = Fingerprint::of(self.request);
        validate(&self.driver.config, record, &fingerprint, self.driver.now())?;

        codec::decode(&record.payload).map_err(|e| {
            warn!(session_id = %record.session_id, error = %e, "Discarding undecodable session payload");
            Invalidity::Corrupt
        })
    }

    /// Insert a fresh record with an empty payload, retrying once on a
    /// duplicate id. In-memory data is left alone.
    fn mint(&mut self) -> Result<()> {
        let now = self.driver.now();
        let fingerprint = Fingerprint::of(self.request);
        let mut attempt = 0;

        let keys = loop {
            attempt += 1;
            let id = self.driver.ids.new_id();
            let keys = SessionKeys {
                session_id: id.clone(),
                previous_id: id,
                ip_hash: fingerprint.ip_hash.clone(),
                user_agent: fingerprint.user_agent.clone(),
                created: now,
                updated: now,
            };
            match self
                .driver
                .store
                .insert(&SessionRecord::from_keys(keys.clone(), String::new()))
            {
                Ok(()) => break keys,
                Err(StoreError::DuplicateKey(id)) if attempt < 2 => {
                    warn!(session_id = %id, "Generated session id already taken, retrying");
                }
                Err(StoreError::DuplicateKey(id)) => return Err(Error::IdCollision(id)),
                Err(e) => return Err(e.into()),
            }
        };

        debug!(session_id = %keys.session_id, "Created session");
        self.cookies.set(&keys.session_id);
        self.keys = Some(keys);
        self.state = SessionState::Active;
        self.rotate_pending = false;
        Ok(())
    }
}

impl SessionLifecycle for StoreSession<'_> {
    fn create(&mut self) -> Result<()> {
        self.data.clear();
        self.flash.clear();
        self.mint()
    }

    fn read(&mut self, force: bool) -> Result<()> {
        let token = if force {
            None
        } else {
            self.cookies.get().filter(|t| !t.is_empty())
        };
        let Some(token) = token else {
            return self.create();
        };

        let Some(record) = self.resolve(&token)? else {
            debug!(presented = %token, "Unknown session token");
            return self.create();
        };

        match self.load(&record) {
            Ok((data, flash)) => {
                self.keys = Some(record.keys());
                self.data = data;
                self.flash = flash;
                self.state = SessionState::Active;
                Ok(())
            }
            Err(reason) => {
                debug!(session_id = %record.session_id, %reason, "Stored session rejected");
                self.state = SessionState::Invalid;
                self.keys = None;
                self.create()
            }
        }
    }

    fn write(&mut self) -> Result<WriteOutcome> {
        if self.keys.is_none() {
            if self.data.is_empty() && self.flash.is_empty() {
                return Ok(WriteOutcome::Skipped);
            }
            self.mint()?;
        }
        let Some(held) = self.keys.clone() else {
            return Ok(WriteOutcome::Skipped);
        };

        let now = self.driver.now();
        let fingerprint = Fingerprint::of(self.request);
        let rotated =
            self.rotate_pending || rotation::is_due(self.driver.config.rotation, held.created, now);

        let mut next = held.clone();
        if rotated {
            rotation::rotate(&mut next, self.driver.ids.new_id(), now);
        }
        // `updated` doubles as the version stamp, so every write must move it.
        next.updated = if now > held.updated {
            now
        } else {
            held.updated + TimeDelta::nanoseconds(1)
        };
        next.ip_hash = fingerprint.ip_hash;
        next.user_agent = fingerprint.user_agent;

        let payload = codec::encode(&self.data, &self.flash)?;
        let record = SessionRecord::from_keys(next, payload);

        let replaced = self
            .driver
            .store
            .atomic_replace(&held.session_id, held.updated, &record);
        let outcome = match replaced {
            Ok(stored) => {
                self.cookies.set(&stored.session_id);
                if rotated {
                    debug!(
                        previous_id = %stored.previous_id,
                        session_id = %stored.session_id,
                        "Rotated session token"
                    );
                }
                self.keys = Some(stored.keys());
                self.rotate_pending = false;
                WriteOutcome::Written { rotated }
            }
            Err(StoreError::NoMatch(id)) => {
                warn!(session_id = %id, "Session changed by a concurrent request, write dropped");
                WriteOutcome::Conflict
            }
            Err(StoreError::DuplicateKey(id)) => return Err(Error::IdCollision(id)),
            Err(e) => return Err(e.into()),
        };

        self.driver.gc.maybe_sweep(now);
        Ok(outcome)
    }

    fn destroy(&mut self) -> Result<()> {
        let deleted = match self.keys.take() {
            Some(keys) => self
                .driver
                .store
                .delete_by(LookupField::SessionId, &keys.session_id)
                .map(|n| {
                    debug!(session_id = %keys.session_id, deleted = n, "Destroyed session");
                }),
            None => Ok(()),
        };

        self.data.clear();
        self.flash.clear();
        self.rotate_pending = false;
        self.state = SessionState::Uninitialized;
        deleted.map_err(Error::from)
    }
}
