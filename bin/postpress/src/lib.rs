//! Postpress CLI Library
//!
//! Command implementations for the postpress binary, exposed as a library so
//! they can be exercised from tests.
//!
//! # Modules
//!
//! - [`cmd`] - Command implementations (build, list, new)

use std::path::Path;

use color_eyre::eyre::{Result, WrapErr, bail};

pub mod cmd;

// Re-export core types for convenience
pub use postpress_core::{Config, PostId, PostRecord};
pub use postpress_generator::{BuildStats, Builder, DirectoryDiscovery};

/// Configuration file read when `--config` is not given.
pub const DEFAULT_CONFIG: &str = "postpress.toml";

/// Load the configuration, layered with `POSTPRESS__*` environment variables.
///
/// An explicitly requested file must exist; the default file is optional.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) if !path.exists() => {
            bail!("Configuration file not found: {}", path.display())
        }
        Some(path) => path,
        None => Path::new(DEFAULT_CONFIG),
    };

    let config = Config::load_with_env(path)
        .wrap_err_with(|| format!("Failed to load configuration from {}", path.display()))?;
    tracing::debug!(?config, "Loaded configuration");
    Ok(config)
}

/// Initialize tracing with the specified verbosity level.
///
/// # Arguments
///
/// * `verbose` - Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE)
pub fn init_tracing(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_missing_config_is_error() {
        let err = load_config(Some(Path::new("/nonexistent/postpress.toml"))).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_explicit_config_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.toml");
        std::fs::write(&path, "[post]\ncontent_file = \"index.md\"\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.post.content_file, "index.md");
    }
}
