//! Startup validation of the raw TOML into an immutable [`SessionConfig`].
//!
//! Validation happens once, before any request is served. Hard failures
//! (no collection, no resolvable database) abort driver construction; soft
//! problems (an unusable cookie name, an out-of-range probability) fall back
//! to defaults.

use std::time::Duration;

use satchel_types::{defaults, is_collection_name};

use crate::{ConfigError, DatabaseSection, Result, SatchelConfig, StoreSection};

/// In-memory SQLite path accepted by the store.
pub const MEMORY_DATABASE: &str = ":memory:";

/// When a session token is swapped for a fresh one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationPolicy {
    /// Keep the token for the lifetime of the session.
    Never,
    /// Mint a new token on every successful write.
    EveryWrite,
    /// Mint a new token once the current one is at least this old.
    Interval(Duration),
}

/// Validated driver configuration.
///
/// Built once by [`validate_config`] (or the builder methods, for embedding
/// and tests) and shared read-only by every request.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Name of the client-side token.
    pub cookie_name: String,
    /// Collection (table) holding session documents.
    pub collection: String,
    /// Resolved connection name.
    pub database: String,
    /// Path of the resolved connection.
    pub database_path: String,
    /// Percentage chance (0–100) that a write triggers a sweep.
    pub gc_probability: u8,
    /// Inactivity window after which a session is expired.
    pub expiration_time: Duration,
    /// Validate the client address on read.
    pub match_ip: bool,
    /// Validate the user agent on read.
    pub match_ua: bool,
    /// Token rotation policy applied on write.
    pub rotation: RotationPolicy,
}

impl SessionConfig {
    /// Create a configuration for `collection` backed by an in-memory database.
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            cookie_name: defaults::COOKIE_NAME.to_string(),
            collection: collection.into(),
            database: "memory".to_string(),
            database_path: MEMORY_DATABASE.to_string(),
            gc_probability: defaults::GC_PROBABILITY,
            expiration_time: defaults::expiration_time(),
            match_ip: defaults::MATCH_IP,
            match_ua: defaults::MATCH_UA,
            rotation: RotationPolicy::Interval(defaults::rotation_time()),
        }
    }

    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Point at a named database connection.
    pub fn with_database(mut self, name: impl Into<String>, path: impl Into<String>) -> Self {
        self.database = name.into();
        self.database_path = path.into();
        self
    }

    /// Set the sweep probability, clamped to 100.
    pub fn with_gc_probability(mut self, percent: u8) -> Self {
        self.gc_probability = percent.min(100);
        self
    }

    pub fn with_expiration_time(mut self, expiration: Duration) -> Self {
        self.expiration_time = expiration;
        self
    }

    pub fn with_match_ip(mut self, enabled: bool) -> Self {
        self.match_ip = enabled;
        self
    }

    pub fn with_match_ua(mut self, enabled: bool) -> Self {
        self.match_ua = enabled;
        self
    }

    pub fn with_rotation(mut self, rotation: RotationPolicy) -> Self {
        self.rotation = rotation;
        self
    }
}

/// Validate a loaded config and resolve it into a [`SessionConfig`].
pub fn validate_config(config: &SatchelConfig) -> Result<SessionConfig> {
    let session = config.session.clone().unwrap_or_default();
    let store = session.store.clone().unwrap_or_default();

    let collection = validate_collection(&store)?;
    let (database, database_path) = resolve_database(&store, config.database.as_ref())?;

    let expiration_time = match session.expiration_time {
        Some(secs) if secs > 0 => Duration::from_secs(secs as u64),
        _ => defaults::expiration_time(),
    };

    Ok(SessionConfig {
        cookie_name: cookie_name(&store),
        collection,
        database,
        database_path,
        gc_probability: gc_probability(&store),
        expiration_time,
        match_ip: session.match_ip.unwrap_or(defaults::MATCH_IP),
        match_ua: session.match_ua.unwrap_or(defaults::MATCH_UA),
        rotation: rotation_policy(session.rotation_time.as_ref()),
    })
}

fn cookie_name(store: &StoreSection) -> String {
    match &store.cookie_name {
        Some(toml::Value::String(name)) if !name.trim().is_empty() => name.clone(),
        _ => defaults::COOKIE_NAME.to_string(),
    }
}

fn validate_collection(store: &StoreSection) -> Result<String> {
    let name = match &store.collection {
        Some(toml::Value::String(name)) if !name.is_empty() => name,
        _ => {
            return Err(ConfigError::MissingField {
                field: "collection".to_string(),
                context: "[session.store]".to_string(),
            });
        }
    };

    if !is_collection_name(name) {
        return Err(ConfigError::InvalidCollection(name.clone()));
    }
    Ok(name.clone())
}

fn resolve_database(
    store: &StoreSection,
    databases: Option<&DatabaseSection>,
) -> Result<(String, String)> {
    let named = match &store.database {
        Some(toml::Value::String(name)) if !name.is_empty() => Some(name.clone()),
        _ => None,
    };

    let name = named
        .or_else(|| {
            databases
                .and_then(|db| db.active.clone())
                .filter(|active| !active.is_empty())
        })
        .ok_or(ConfigError::NoDatabase)?;

    let path = databases
        .and_then(|db| db.connections.get(&name))
        .map(|conn| conn.path.clone())
        .ok_or_else(|| ConfigError::UnknownDatabase(name.clone()))?;

    Ok((name, path))
}

fn gc_probability(store: &StoreSection) -> u8 {
    let value = match &store.gc_probability {
        Some(toml::Value::Integer(n)) => Some(*n as f64),
        Some(toml::Value::Float(f)) => Some(*f),
        Some(toml::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match value {
        Some(p) if (0.0..=100.0).contains(&p) => p.round() as u8,
        _ => defaults::GC_PROBABILITY,
    }
}

fn rotation_policy(value: Option<&toml::Value>) -> RotationPolicy {
    match value {
        None => RotationPolicy::Interval(defaults::rotation_time()),
        Some(toml::Value::Boolean(false)) => RotationPolicy::Never,
        Some(toml::Value::Integer(0)) => RotationPolicy::EveryWrite,
        Some(toml::Value::Integer(secs)) if *secs > 0 => {
            RotationPolicy::Interval(Duration::from_secs(*secs as u64))
        }
        Some(toml::Value::Integer(_)) => RotationPolicy::Never,
        Some(_) => RotationPolicy::Interval(defaults::rotation_time()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> SatchelConfig {
        SatchelConfig::from_toml(toml_str).unwrap()
    }

    const MINIMAL: &str = r#"
[session.store]
collection = "sessions"

[database]
active = "main"

[database.connections.main]
path = ":memory:"
"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = validate_config(&parse(MINIMAL)).unwrap();
        assert_eq!(config.cookie_name, "satcheldid");
        assert_eq!(config.collection, "sessions");
        assert_eq!(config.database, "main");
        assert_eq!(config.database_path, ":memory:");
        assert_eq!(config.gc_probability, 5);
        assert_eq!(config.expiration_time, Duration::from_secs(7200));
        assert!(!config.match_ip);
        assert!(config.match_ua);
        assert_eq!(
            config.rotation,
            RotationPolicy::Interval(Duration::from_secs(300))
        );
    }

    #[test]
    fn test_missing_collection_is_fatal() {
        let err = validate_config(&parse(
            r#"
[database]
active = "main"

[database.connections.main]
path = ":memory:"
"#,
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { ref field, .. } if field == "collection"));
    }

    #[test]
    fn test_non_string_collection_is_fatal() {
        let err = validate_config(&parse(
            r#"
[session.store]
collection = 42
database = "main"
"#,
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { .. }));
    }

    #[test]
    fn test_collection_must_be_identifier() {
        let err = validate_config(&parse(
            r#"
[session.store]
collection = "sessions; DROP TABLE x"
"#,
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCollection(_)));
    }

    #[test]
    fn test_collection_rejects_sqlite_namespace() {
        let text = MINIMAL.replace("collection = \"sessions\"", "collection = \"sqlite_sessions\"");
        let err = validate_config(&parse(&text)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCollection(ref name) if name == "sqlite_sessions"));
    }

    #[test]
    fn test_database_unresolved_is_fatal() {
        let err = validate_config(&parse(
            r#"
[session.store]
collection = "sessions"
"#,
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigError::NoDatabase));
    }

    #[test]
    fn test_database_must_have_connection() {
        let err = validate_config(&parse(
            r#"
[session.store]
collection = "sessions"
database = "missing"
"#,
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownDatabase(ref n) if n == "missing"));
    }

    #[test]
    fn test_driver_database_overrides_active() {
        let config = validate_config(&parse(
            r#"
[session.store]
collection = "sessions"
database = "replica"

[database]
active = "main"

[database.connections.main]
path = "main.db"

[database.connections.replica]
path = "replica.db"
"#,
        ))
        .unwrap();
        assert_eq!(config.database, "replica");
        assert_eq!(config.database_path, "replica.db");
    }

    #[test]
    fn test_gc_probability_fallbacks() {
        let cases = [
            ("50", 50),
            ("0", 0),
            ("100", 100),
            ("101", 5),
            ("-1", 5),
            ("\"25\"", 25),
            ("\"lots\"", 5),
            ("true", 5),
            ("12.9", 13),
            ("12.4", 12),
            ("\"0.5\"", 1),
        ];
        for (raw, expected) in cases {
            let text = MINIMAL.replace(
                "collection = \"sessions\"",
                &format!("collection = \"sessions\"\ngc_probability = {raw}"),
            );
            let config = validate_config(&parse(&text)).unwrap();
            assert_eq!(config.gc_probability, expected, "gc_probability = {raw}");
        }
    }

    #[test]
    fn test_cookie_name_fallbacks() {
        for (raw, expected) in [("\"sid\"", "sid"), ("\"\"", "satcheldid"), ("7", "satcheldid")] {
            let text = MINIMAL.replace(
                "collection = \"sessions\"",
                &format!("collection = \"sessions\"\ncookie_name = {raw}"),
            );
            let config = validate_config(&parse(&text)).unwrap();
            assert_eq!(config.cookie_name, expected);
        }
    }

    #[test]
    fn test_expiration_and_fingerprint_options() {
        let text = format!(
            "[session]\nexpiration_time = 60\nmatch_ip = true\nmatch_ua = false\n{MINIMAL}"
        );
        let config = validate_config(&parse(&text)).unwrap();
        assert_eq!(config.expiration_time, Duration::from_secs(60));
        assert!(config.match_ip);
        assert!(!config.match_ua);

        let text = format!("[session]\nexpiration_time = 0\n{MINIMAL}");
        let config = validate_config(&parse(&text)).unwrap();
        assert_eq!(config.expiration_time, Duration::from_secs(7200));
    }

    #[test]
    fn test_rotation_policy_parsing() {
        let cases = [
            ("0", RotationPolicy::EveryWrite),
            ("false", RotationPolicy::Never),
            ("-5", RotationPolicy::Never),
            ("60", RotationPolicy::Interval(Duration::from_secs(60))),
        ];
        for (raw, expected) in cases {
            let text = format!("[session]\nrotation_time = {raw}\n{MINIMAL}");
            let config = validate_config(&parse(&text)).unwrap();
            assert_eq!(config.rotation, expected, "rotation_time = {raw}");
        }
    }

    #[test]
    fn test_builder_clamps_probability() {
        let config = SessionConfig::new("sessions").with_gc_probability(250);
        assert_eq!(config.gc_probability, 100);
        assert_eq!(config.database_path, MEMORY_DATABASE);
    }
}
