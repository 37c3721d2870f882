//! Configuration error types.

/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Missing required field.
    #[error("missing required field '{field}' in {context}")]
    MissingField { field: String, context: String },

    /// Collection name cannot be used as a table name.
    #[error("invalid collection name '{0}': use letters, digits and underscores")]
    InvalidCollection(String),

    /// Neither the driver nor `[database] active` names a database.
    #[error("no database configured: set session.store.database or database.active")]
    NoDatabase,

    /// The resolved database has no connection entry.
    #[error("database '{0}' not found under [database.connections]")]
    UnknownDatabase(String),
}
