//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [session]                     # lifecycle policy
//! [session.store]               # document store driver
//! [database]                    # active database name
//! [database.connections.main]   # named connections
//! ```
//!
//! Driver options are kept as raw [`toml::Value`]s where the validator has to
//! tell "wrong type" apart from "missing" (a non-numeric `gc_probability`
//! falls back to its default instead of failing the whole file).

use std::collections::BTreeMap;

use serde::Deserialize;

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SatchelConfig {
    /// Session lifecycle and driver settings.
    pub session: Option<SessionSection>,

    /// Database connections.
    pub database: Option<DatabaseSection>,
}

impl SatchelConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: SatchelConfig) {
        if let Some(layer) = other.session {
            match self.session.as_mut() {
                Some(base) => base.merge(layer),
                None => self.session = Some(layer),
            }
        }

        if let Some(layer) = other.database {
            match self.database.as_mut() {
                Some(base) => base.merge(layer),
                None => self.database = Some(layer),
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// Session lifecycle configuration.
///
/// ```toml
/// [session]
/// expiration_time = 7200
/// match_ip = false
/// match_ua = true
/// rotation_time = 300      # 0 = every write, false or negative = never
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Seconds of inactivity before a session expires.
    pub expiration_time: Option<i64>,
    /// Reject sessions presented from a different client address.
    pub match_ip: Option<bool>,
    /// Reject sessions presented by a different user agent.
    pub match_ua: Option<bool>,
    /// Seconds between token rotations.
    pub rotation_time: Option<toml::Value>,
    /// Document store driver settings.
    pub store: Option<StoreSection>,
}

impl SessionSection {
    fn merge(&mut self, other: SessionSection) {
        if other.expiration_time.is_some() {
            self.expiration_time = other.expiration_time;
        }
        if other.match_ip.is_some() {
            self.match_ip = other.match_ip;
        }
        if other.match_ua.is_some() {
            self.match_ua = other.match_ua;
        }
        if other.rotation_time.is_some() {
            self.rotation_time = other.rotation_time;
        }
        if let Some(layer) = other.store {
            match self.store.as_mut() {
                Some(base) => base.merge(layer),
                None => self.store = Some(layer),
            }
        }
    }
}

/// Document store driver configuration.
///
/// ```toml
/// [session.store]
/// cookie_name = "satcheldid"
/// collection = "sessions"
/// database = "main"
/// gc_probability = 5
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Name of the client-side token.
    pub cookie_name: Option<toml::Value>,
    /// Collection (table) holding session documents. Required.
    pub collection: Option<toml::Value>,
    /// Connection name; falls back to `[database] active`.
    pub database: Option<toml::Value>,
    /// Percentage chance (0–100) that a write triggers a sweep.
    pub gc_probability: Option<toml::Value>,
}

impl StoreSection {
    fn merge(&mut self, other: StoreSection) {
        if other.cookie_name.is_some() {
            self.cookie_name = other.cookie_name;
        }
        if other.collection.is_some() {
            self.collection = other.collection;
        }
        if other.database.is_some() {
            self.database = other.database;
        }
        if other.gc_probability.is_some() {
            self.gc_probability = other.gc_probability;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Database
// ─────────────────────────────────────────────────────────────────────────────

/// Database connection registry.
///
/// ```toml
/// [database]
/// active = "main"
///
/// [database.connections.main]
/// path = "sessions.db"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// Connection used when the driver does not name one.
    pub active: Option<String>,
    /// Named connections.
    pub connections: BTreeMap<String, ConnectionConfig>,
}

impl DatabaseSection {
    fn merge(&mut self, other: DatabaseSection) {
        if other.active.is_some() {
            self.active = other.active;
        }
        for (name, conn) in other.connections {
            self.connections.insert(name, conn);
        }
    }
}

/// A single SQLite connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectionConfig {
    /// Database file path, or `:memory:`.
    pub path: String,
}
