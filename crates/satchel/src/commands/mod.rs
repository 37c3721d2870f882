//! CLI command handlers.

pub mod destroy;
pub mod init;
pub mod list;
pub mod show;
pub mod stats;
pub mod sweep;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use satchel_config::{SessionConfig, load_config, load_config_file, validate_config};
use satchel_session::SessionDriver;
use tracing::{debug, warn};

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Explicit config file, applied over the discovered layers.
    pub config_path: Option<PathBuf>,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Discover, merge and validate the configuration.
    pub fn session_config(&self) -> Result<SessionConfig> {
        let mut loaded = load_config(None).context("failed to discover configuration")?;
        for warning in &loaded.warnings {
            warn!("{warning}");
        }
        for path in loaded.loaded_from() {
            debug!(path = %path.display(), "Loaded config layer");
        }

        if let Some(path) = &self.config_path {
            let explicit = load_config_file(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            loaded.config.merge(explicit);
        }

        validate_config(&loaded.config).context("invalid session configuration")
    }

    /// Validate the configuration and open the configured store.
    ///
    /// Blocks on the store; async handlers go through [`Context::open_driver`]
    /// or [`Context::with_driver`].
    pub fn driver(&self) -> Result<SessionDriver> {
        let config = self.session_config()?;
        let path = config.database_path.clone();
        SessionDriver::open(config).with_context(|| format!("failed to open session store at {path}"))
    }

    /// [`Context::driver`] on the blocking pool.
    pub async fn open_driver(&self) -> Result<SessionDriver> {
        let ctx = self.clone();
        blocking(move || ctx.driver()).await
    }

    /// Open the store and run `f` against it on the blocking pool.
    pub async fn with_driver<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&SessionDriver) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let ctx = self.clone();
        blocking(move || f(&ctx.driver()?)).await
    }
}

/// Run store work off the async runtime's worker threads.
pub async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .context("store task panicked")?
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn context(dir: &TempDir) -> Context {
        let path = dir.path().join("satchel.toml");
        std::fs::write(
            &path,
            r#"
[session.store]
collection = "cli_sessions"
database = "scratch"

[database.connections.scratch]
path = ":memory:"
"#,
        )
        .unwrap();
        Context {
            config_path: Some(path),
            json_output: false,
            verbose: false,
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_store_work_runs_off_runtime_thread() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        let runtime_thread = std::thread::current().id();

        let (collection, thread) = ctx
            .with_driver(|driver| {
                driver.store().count()?;
                Ok((driver.config().collection.clone(), std::thread::current().id()))
            })
            .await
            .unwrap();
        assert_eq!(collection, "cli_sessions");
        assert_ne!(thread, runtime_thread);
    }

    #[tokio::test]
    async fn test_store_errors_propagate_from_blocking_pool() {
        let err = blocking(|| -> Result<()> { anyhow::bail!("store offline") })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "store offline");

        let dir = TempDir::new().unwrap();
        let ctx = Context {
            config_path: Some(dir.path().join("missing.toml")),
            json_output: false,
            verbose: false,
        };
        assert!(ctx.open_driver().await.is_err());
    }
}
