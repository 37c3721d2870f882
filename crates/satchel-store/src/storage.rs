//! Storage abstraction for session documents.
//!
//! ```text
//! SessionStore (trait)     - CRUD + atomic replace over one collection
//!     └── SqliteStore      - SQLite table per collection
//!     └── MemoryStore      - In-process map, for tests and embedding
//! ```

use chrono::{DateTime, Utc};

use crate::Result;
use crate::record::{LookupField, SessionRecord};

/// A collection of session documents.
///
/// All operations block until the backend answers. Backend failures come
/// back as [`StoreError::Database`](crate::StoreError::Database) or
/// [`StoreError::Unavailable`](crate::StoreError::Unavailable).
pub trait SessionStore: Send + Sync {
    /// Create the collection and its indices if they do not exist yet.
    fn ensure_collection(&self) -> Result<()> {
        Ok(())
    }

    /// Persist a brand-new record.
    ///
    /// Fails with `DuplicateKey` if a document with the same `session_id`
    /// already exists.
    fn insert(&self, record: &SessionRecord) -> Result<()>;

    /// Find the document whose `field` equals `value`.
    fn find_one_by(&self, field: LookupField, value: &str) -> Result<Option<SessionRecord>>;

    /// Replace the document whose `session_id` is `match_session_id` and
    /// whose `updated` is still `match_updated` with `record`, returning the
    /// stored result.
    ///
    /// Must be a single indivisible compare-and-update: two callers that read
    /// the same document can never both succeed, rotated or not. Returns
    /// `NoMatch` when no document carries that key and timestamp (a
    /// concurrent writer got there first), and `DuplicateKey` if
    /// `record.session_id` would collide with another document.
    fn atomic_replace(
        &self,
        match_session_id: &str,
        match_updated: DateTime<Utc>,
        record: &SessionRecord,
    ) -> Result<SessionRecord>;

    /// Delete every document whose `field` equals `value`.
    fn delete_by(&self, field: LookupField, value: &str) -> Result<usize>;

    /// Delete every document last updated strictly before `threshold`.
    fn delete_where_updated_before(&self, threshold: DateTime<Utc>) -> Result<usize>;

    /// Number of documents in the collection.
    fn count(&self) -> Result<usize>;

    /// Number of documents last updated strictly before `threshold`.
    fn count_updated_before(&self, threshold: DateTime<Utc>) -> Result<usize>;

    /// Most recently updated documents first.
    fn list(&self, limit: usize) -> Result<Vec<SessionRecord>>;
}
