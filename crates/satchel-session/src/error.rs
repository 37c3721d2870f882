//! Error types for session lifecycle operations.

use satchel_config::ConfigError;
use satchel_store::StoreError;

use crate::codec::CodecError;

/// Error type for session lifecycle operations.
///
/// Validation failures and write conflicts are not errors: the former send
/// `read()` back to creation, the latter surface as
/// [`WriteOutcome::Conflict`](crate::WriteOutcome::Conflict).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The driver configuration could not be validated.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The backing store failed or could not be reached.
    #[error("Session store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// Two freshly minted ids in a row were already taken.
    #[error("Session id collision: {0}")]
    IdCollision(String),

    /// The in-memory data could not be encoded.
    #[error("Payload codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Result type for session lifecycle operations.
pub type Result<T> = std::result::Result<T, Error>;
