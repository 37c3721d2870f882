//! Session document storage for Satchel.
//!
//! One document per live session, keyed by `session_id`. Besides plain CRUD
//! the store offers a single compare-and-replace primitive,
//! [`SessionStore::atomic_replace`], which is the only coordination point
//! between concurrent requests sharing a session.

pub mod error;
pub mod memory;
pub mod record;
pub mod sqlite;
pub mod storage;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use record::{LookupField, SessionKeys, SessionRecord};
pub use sqlite::SqliteStore;
pub use storage::SessionStore;
