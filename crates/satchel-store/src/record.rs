//! The persisted session document and its in-memory key projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A session document.
///
/// Persisted shape: `{session_id, previous_id, ip_hash, user_agent, created,
/// updated, payload}`. The record is the only durable copy of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    /// `session_id` before the last rotation; equal to it if never rotated.
    pub previous_id: String,
    pub ip_hash: String,
    pub user_agent: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    /// Encoded `(data, flash)`; empty when the session holds nothing.
    pub payload: String,
}

impl SessionRecord {
    /// Assemble a record from its keys and an encoded payload.
    pub fn from_keys(keys: SessionKeys, payload: impl Into<String>) -> Self {
        Self {
            session_id: keys.session_id,
            previous_id: keys.previous_id,
            ip_hash: keys.ip_hash,
            user_agent: keys.user_agent,
            created: keys.created,
            updated: keys.updated,
            payload: payload.into(),
        }
    }

    /// Everything but the payload.
    pub fn keys(&self) -> SessionKeys {
        SessionKeys {
            session_id: self.session_id.clone(),
            previous_id: self.previous_id.clone(),
            ip_hash: self.ip_hash.clone(),
            user_agent: self.user_agent.clone(),
            created: self.created,
            updated: self.updated,
        }
    }

    /// Whether the token has been rotated at least once.
    pub fn is_rotated(&self) -> bool {
        self.session_id != self.previous_id
    }
}

/// Key fields of a session, held in memory for the current request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionKeys {
    pub session_id: String,
    pub previous_id: String,
    pub ip_hash: String,
    pub user_agent: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// Document fields that can be used as a lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupField {
    SessionId,
    PreviousId,
}

impl LookupField {
    /// Column / document field name.
    pub fn column(self) -> &'static str {
        match self {
            LookupField::SessionId => "session_id",
            LookupField::PreviousId => "previous_id",
        }
    }

    /// Read this field from a record.
    pub fn value_of(self, record: &SessionRecord) -> &str {
        match self {
            LookupField::SessionId => &record.session_id,
            LookupField::PreviousId => &record.previous_id,
        }
    }
}

impl std::fmt::Display for LookupField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}
