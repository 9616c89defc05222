//! TOML configuration for extratod.
//!
//! Layered: the `EXTRATOD_CONFIG` environment variable wins, then the
//! standard system location, then compiled-in defaults.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for the extratod process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub extrato: ExtratoConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Try to load configuration from, in order:
    /// 1. The path specified by the `EXTRATOD_CONFIG` environment variable.
    /// 2. `/etc/extratod/extratod.toml`.
    /// 3. Fall back to compiled-in defaults.
    pub fn load_or_default() -> Self {
        // 1. Environment variable override.
        if let Ok(env_path) = std::env::var("EXTRATOD_CONFIG") {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "EXTRATOD_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        // 2. Standard system location.
        let system_path = Path::new("/etc/extratod/extratod.toml");
        if system_path.exists() {
            match Self::load(system_path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %system_path.display(),
                        error = %e,
                        "system config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        // 3. Defaults.
        debug!("no config file found, using compiled-in defaults");
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// HTTP API listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address and port for the JSON API listener.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// SQLite storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: "data/extratod.db".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Extrato
// ---------------------------------------------------------------------------

/// Generation guard and dispatch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtratoConfig {
    /// Run generation synchronously on the triggering caller instead of a
    /// background worker. Meant for tests and diagnostics.
    pub disable_background: bool,
    /// The guard refuses to run before this day of the month, leaving room
    /// for late postings from the previous month.
    pub min_day_of_month: u32,
    /// Upper bound on generation workers in flight at once.
    pub max_concurrent_runs: usize,
    /// How often the resident check loop re-evaluates the guard.
    pub check_interval_hours: u64,
}

impl Default for ExtratoConfig {
    fn default() -> Self {
        Self {
            disable_background: false,
            min_day_of_month: 2,
            max_concurrent_runs: 1,
            check_interval_hours: 6,
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let cfg = Config::default();

        assert_eq!(cfg.server.bind, "0.0.0.0:8080");
        assert_eq!(cfg.storage.db_path, "data/extratod.db");

        assert!(!cfg.extrato.disable_background);
        assert_eq!(cfg.extrato.min_day_of_month, 2);
        assert_eq!(cfg.extrato.max_concurrent_runs, 1);
        assert_eq!(cfg.extrato.check_interval_hours, 6);

        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn test_parse_example_toml() {
        let toml_str = r#"
[server]
bind = "127.0.0.1:9090"

[storage]
db_path = "/var/lib/extratod/ledger.db"

[extrato]
disable_background = true
min_day_of_month = 3
max_concurrent_runs = 2
check_interval_hours = 12

[logging]
level = "debug"
"#;

        let cfg: Config = toml::from_str(toml_str).unwrap();

        assert_eq!(cfg.server.bind, "127.0.0.1:9090");
        assert_eq!(cfg.storage.db_path, "/var/lib/extratod/ledger.db");
        assert!(cfg.extrato.disable_background);
        assert_eq!(cfg.extrato.min_day_of_month, 3);
        assert_eq!(cfg.extrato.max_concurrent_runs, 2);
        assert_eq!(cfg.extrato.check_interval_hours, 12);
        assert_eq!(cfg.logging.level, "debug");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
[extrato]
min_day_of_month = 5
"#;

        let cfg: Config = toml::from_str(toml_str).unwrap();

        // Explicit override.
        assert_eq!(cfg.extrato.min_day_of_month, 5);

        // Everything else should be defaults.
        assert_eq!(cfg.server.bind, "0.0.0.0:8080");
        assert_eq!(cfg.storage.db_path, "data/extratod.db");
        assert!(!cfg.extrato.disable_background);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        let defaults = Config::default();

        assert_eq!(cfg.server.bind, defaults.server.bind);
        assert_eq!(cfg.storage.db_path, defaults.storage.db_path);
        assert_eq!(
            cfg.extrato.check_interval_hours,
            defaults.extrato.check_interval_hours
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("extratod.toml");
        std::fs::write(
            &path,
            r#"
[server]
bind = "0.0.0.0:9999"
"#,
        )
        .unwrap();

        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.server.bind, "0.0.0.0:9999");
    }

    #[test]
    fn test_load_missing_file_errors() {
        let result = Config::load(Path::new("/nonexistent/path/extratod.toml"));
        assert!(result.is_err());
    }
}
