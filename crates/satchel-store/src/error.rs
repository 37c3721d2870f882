use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A document with this `session_id` already exists.
    #[error("Duplicate session id: {0}")]
    DuplicateKey(String),

    /// No document matched the replace key; another writer got there first.
    #[error("No session matched id: {0}")]
    NoMatch(String),

    #[error("Invalid collection name: {0}")]
    InvalidCollection(String),
}

impl StoreError {
    /// Whether this error reports an I/O or backend failure rather than a
    /// per-document outcome.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Database(_) | StoreError::Unavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
