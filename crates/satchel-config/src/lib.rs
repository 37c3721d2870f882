//! Configuration system for the Satchel session driver.
//!
//! Provides TOML-based configuration with:
//! - A `[session]` section for lifecycle policy (expiry, fingerprinting, rotation)
//! - A `[session.store]` section for the document store driver
//! - Named database connections under `[database.connections]`
//! - Config file layering (XDG user config + project-local overrides)
//!
//! Raw TOML is loaded into [`SatchelConfig`] and then checked once, at
//! startup, by [`validate_config`] into an immutable [`SessionConfig`].

pub mod discovery;
pub mod error;
pub mod types;
pub mod validate;

pub use discovery::{ConfigSource, LoadedConfig, load_config, load_config_file, xdg_config_dir};
pub use error::{ConfigError, Result};
pub use types::*;
pub use validate::{MEMORY_DATABASE, RotationPolicy, SessionConfig, validate_config};
