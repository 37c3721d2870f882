//! SQLite-backed session store.
//!
//! Each collection is a table of its own. Timestamps are stored as RFC 3339
//! text with fixed nanosecond precision so lexical order is time order.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{Connection, ErrorCode, OpenFlags, OptionalExtension, Row, TransactionBehavior, params};
use satchel_types::is_collection_name;
use tracing::{debug, info};

use crate::record::{LookupField, SessionRecord};
use crate::storage::SessionStore;
use crate::{Result, StoreError};

/// Path understood as "no file, keep everything in this process".
pub const IN_MEMORY_PATH: &str = ":memory:";

/// How long a writer waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const COLUMNS: &str = "session_id, previous_id, ip_hash, user_agent, created, updated, payload";

// ─────────────────────────────────────────────────────────────────────────────
// Store
// ─────────────────────────────────────────────────────────────────────────────

/// Session store backed by one SQLite table.
///
/// Uses WAL mode so sweeps and reads from other processes do not block
/// request traffic.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    collection: String,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open or create the database at `path` and make sure `collection`
    /// exists in it.
    pub fn open(path: impl AsRef<Path>, collection: &str) -> Result<Self> {
        let path = path.as_ref();
        check_collection_name(collection)?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Unavailable(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )?;
        let store = Self::from_connection(conn, collection)?;

        info!(path = %path.display(), collection, "Session store opened");
        Ok(store)
    }

    /// Create a private in-memory store (useful for testing).
    pub fn open_in_memory(collection: &str) -> Result<Self> {
        check_collection_name(collection)?;
        let conn = Connection::open_in_memory()?;
        let store = Self::from_connection(conn, collection)?;

        debug!(collection, "In-memory session store created");
        Ok(store)
    }

    /// Open by configured path; [`IN_MEMORY_PATH`] selects an in-memory store.
    pub fn connect(path: &str, collection: &str) -> Result<Self> {
        if path == IN_MEMORY_PATH {
            Self::open_in_memory(collection)
        } else {
            Self::open(path, collection)
        }
    }

    /// Name of the table this store reads and writes.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn from_connection(conn: Connection, collection: &str) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        // journal_mode answers with a row, so it can't go through execute().
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;

        let store = Self {
            conn: Mutex::new(conn),
            collection: collection.to_string(),
        };
        store.ensure_collection()?;
        Ok(store)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SessionStore
// ─────────────────────────────────────────────────────────────────────────────

impl SessionStore for SqliteStore {
    fn ensure_collection(&self) -> Result<()> {
        let c = &self.collection;
        let conn = self.conn.lock();
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {c} (
                session_id  TEXT PRIMARY KEY NOT NULL,
                previous_id TEXT NOT NULL,
                ip_hash     TEXT NOT NULL,
                user_agent  TEXT NOT NULL,
                created     TEXT NOT NULL,
                updated     TEXT NOT NULL,
                payload     TEXT NOT NULL DEFAULT ''
            );
            CREATE INDEX IF NOT EXISTS {c}_previous_id ON {c}(previous_id);
            CREATE INDEX IF NOT EXISTS {c}_updated ON {c}(updated);
            "#
        ))?;
        Ok(())
    }

    fn insert(&self, record: &SessionRecord) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            &format!(
                "INSERT INTO {} ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                self.collection
            ),
            params![
                record.session_id,
                record.previous_id,
                record.ip_hash,
                record.user_agent,
                encode_time(record.created),
                encode_time(record.updated),
                record.payload,
            ],
        )
        .map_err(|e| duplicate_or(e, &record.session_id))?;

        debug!(session_id = %record.session_id, "Inserted session record");
        Ok(())
    }

    fn find_one_by(&self, field: LookupField, value: &str) -> Result<Option<SessionRecord>> {
        let conn = self.conn.lock();
        let record = conn
            .query_row(
                &format!(
                    "SELECT {COLUMNS} FROM {} WHERE {} = ?1 LIMIT 1",
                    self.collection,
                    field.column()
                ),
                params![value],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    fn atomic_replace(
        &self,
        match_session_id: &str,
        match_updated: DateTime<Utc>,
        record: &SessionRecord,
    ) -> Result<SessionRecord> {
        let mut conn = self.conn.lock();
        // Take the write lock up front so a concurrent writer makes us wait
        // instead of failing on a stale snapshot.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let stored = tx
            .query_row(
                &format!(
                    r#"
                    UPDATE {} SET
                        session_id = ?1, previous_id = ?2, ip_hash = ?3, user_agent = ?4,
                        created = ?5, updated = ?6, payload = ?7
                    WHERE session_id = ?8 AND updated = ?9
                    RETURNING {COLUMNS}
                    "#,
                    self.collection
                ),
                params![
                    record.session_id,
                    record.previous_id,
                    record.ip_hash,
                    record.user_agent,
                    encode_time(record.created),
                    encode_time(record.updated),
                    record.payload,
                    match_session_id,
                    encode_time(match_updated),
                ],
                row_to_record,
            )
            .optional()
            .map_err(|e| duplicate_or(e, &record.session_id))?;
        tx.commit()?;

        stored.ok_or_else(|| StoreError::NoMatch(match_session_id.to_string()))
    }

    fn delete_by(&self, field: LookupField, value: &str) -> Result<usize> {
        let conn = self.conn.lock();
        let deleted = conn.execute(
            &format!(
                "DELETE FROM {} WHERE {} = ?1",
                self.collection,
                field.column()
            ),
            params![value],
        )?;
        Ok(deleted)
    }

    fn delete_where_updated_before(&self, threshold: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn.lock();
        let deleted = conn.execute(
            &format!("DELETE FROM {} WHERE updated < ?1", self.collection),
            params![encode_time(threshold)],
        )?;
        Ok(deleted)
    }

    fn count(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let n: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.collection),
            [],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }

    fn count_updated_before(&self, threshold: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn.lock();
        let n: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {} WHERE updated < ?1", self.collection),
            params![encode_time(threshold)],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }

    fn list(&self, limit: usize) -> Result<Vec<SessionRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM {} ORDER BY updated DESC LIMIT ?1",
            self.collection
        ))?;
        let records = stmt
            .query_map(params![limit as i64], row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn check_collection_name(name: &str) -> Result<()> {
    if is_collection_name(name) {
        Ok(())
    } else {
        Err(StoreError::InvalidCollection(name.to_string()))
    }
}

fn duplicate_or(err: rusqlite::Error, session_id: &str) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(ref e, _) if e.code == ErrorCode::ConstraintViolation => {
            StoreError::DuplicateKey(session_id.to_string())
        }
        other => StoreError::Database(other),
    }
}

fn encode_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn decode_time(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<SessionRecord> {
    Ok(SessionRecord {
        session_id: row.get(0)?,
        previous_id: row.get(1)?,
        ip_hash: row.get(2)?,
        user_agent: row.get(3)?,
        created: decode_time(row, 4)?,
        updated: decode_time(row, 5)?,
        payload: row.get(6)?,
    })
}
