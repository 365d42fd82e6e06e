//! # Application Configuration
//!
//! Settings for the binaries and for embedding applications.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Environment variables (highest priority)                            │
//! │     SALESBOOK_DB_PATH, SALESBOOK_OWNER_ID, SALESBOOK_LEGACY_SNAPSHOT,   │
//! │     SALESBOOK_MAX_CONNECTIONS, SALESBOOK_LOG                            │
//! │                                                                         │
//! │  2. TOML file                                                           │
//! │     ~/.config/salesbook/salesbook.toml (Linux)                          │
//! │     ~/Library/Application Support/com.salesbook.salesbook/... (macOS)   │
//! │                                                                         │
//! │  3. Defaults (lowest priority)                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## File Format
//! ```toml
//! [database]
//! path = "/var/lib/salesbook/salesbook.db"
//! max_connections = 5
//! run_migrations = true
//!
//! [identity]
//! owner_id = "5f0c6a2e-..."
//!
//! [legacy]
//! snapshot_path = "/home/me/salesbook-export.json"
//!
//! [logging]
//! filter = "info,salesbook=debug,sqlx=warn"
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::{DbError, DbResult};
use crate::identity::StaticIdentity;
use crate::pool::DbConfig;

const CONFIG_FILE: &str = "salesbook.toml";
const DATABASE_FILE: &str = "salesbook.db";
const DEFAULT_LOG_FILTER: &str = "info,salesbook=debug,sqlx=warn";

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Defaults to `salesbook.db` in the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

fn default_max_connections() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
            run_migrations: true,
        }
    }
}

/// The acting owner for SQLite operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentitySettings {
    #[serde(default)]
    pub owner_id: Option<String>,
}

/// Location of the legacy local snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LegacySettings {
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directives. `RUST_LOG` still wins.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: default_log_filter(),
        }
    }
}

// =============================================================================
// AppConfig
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub identity: IdentitySettings,
    #[serde(default)]
    pub legacy: LegacySettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl AppConfig {
    /// Loads defaults, then the TOML file (explicit path or the platform
    /// default), then environment overrides, and validates the result.
    pub fn load(config_path: Option<PathBuf>) -> DbResult<Self> {
        let mut config = AppConfig::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)
                    .map_err(|e| DbError::Config(format!("{}: {}", path.display(), e)))?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Writes the configuration as TOML, creating parent directories.
    pub fn save(&self, config_path: Option<PathBuf>) -> DbResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| DbError::Config("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            toml::to_string_pretty(self).map_err(|e| DbError::Config(e.to_string()))?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(())
    }

    pub fn validate(&self) -> DbResult<()> {
        if self.database.max_connections == 0 {
            return Err(DbError::Config(
                "database.max_connections must be at least 1".into(),
            ));
        }

        if let Some(owner) = &self.identity.owner_id {
            if owner.trim().is_empty() {
                return Err(DbError::Config("identity.owner_id must not be blank".into()));
            }
        }

        EnvFilter::try_new(&self.logging.filter).map_err(|e| {
            DbError::Config(format!("invalid logging.filter '{}': {}", self.logging.filter, e))
        })?;

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("SALESBOOK_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(owner) = lookup("SALESBOOK_OWNER_ID") {
            debug!("Overriding owner id from environment");
            self.identity.owner_id = Some(owner);
        }

        if let Some(path) = lookup("SALESBOOK_LEGACY_SNAPSHOT") {
            self.legacy.snapshot_path = Some(PathBuf::from(path));
        }

        if let Some(max) = lookup("SALESBOOK_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid SALESBOOK_MAX_CONNECTIONS"),
            }
        }

        if let Some(filter) = lookup("SALESBOOK_LOG") {
            self.logging.filter = filter;
        }
    }

    /// Platform config directory + `salesbook.toml`.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "salesbook", "salesbook")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Configured database path, or `salesbook.db` in the platform data
    /// directory (the working directory when there is none).
    pub fn database_path(&self) -> PathBuf {
        if let Some(path) = &self.database.path {
            return path.clone();
        }
        directories::ProjectDirs::from("com", "salesbook", "salesbook")
            .map(|dirs| dirs.data_dir().join(DATABASE_FILE))
            .unwrap_or_else(|| PathBuf::from(DATABASE_FILE))
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path())
            .max_connections(self.database.max_connections)
            .run_migrations(self.database.run_migrations)
    }

    /// Identity from `[identity]`; anonymous when no owner is configured.
    pub fn identity(&self) -> StaticIdentity {
        match &self.identity.owner_id {
            Some(owner) => StaticIdentity::new(owner.trim()),
            None => StaticIdentity::anonymous(),
        }
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `settings.filter`. Calling this twice is
/// harmless; the second call is ignored.
pub fn init_tracing(settings: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.filter));

    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_err()
    {
        debug!("Tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.database.max_connections, 5);
        assert!(config.database.run_migrations);
        assert_eq!(config.logging.filter, DEFAULT_LOG_FILTER);
        assert!(config.database_path().ends_with("salesbook.db"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("salesbook.toml");
        std::fs::write(
            &path,
            r#"
            [database]
            path = "/tmp/shop.db"
            max_connections = 3

            [identity]
            owner_id = "owner-42"
            "#,
        )
        .unwrap();

        let config = AppConfig::load(Some(path)).unwrap();
        assert_eq!(config.database.path, Some(PathBuf::from("/tmp/shop.db")));
        assert_eq!(config.db_config().max_connections, 3);
        assert!(config.db_config().run_migrations);
        assert_eq!(config.identity.owner_id.as_deref(), Some("owner-42"));
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("salesbook.toml");
        std::fs::write(&path, "[database\npath = ").unwrap();

        assert!(matches!(AppConfig::load(Some(path)), Err(DbError::Config(_))));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("SALESBOOK_DB_PATH", "/data/override.db"),
            ("SALESBOOK_OWNER_ID", "env-owner"),
            ("SALESBOOK_MAX_CONNECTIONS", "not-a-number"),
            ("SALESBOOK_LOG", "warn"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.database_path(), PathBuf::from("/data/override.db"));
        assert_eq!(config.identity.owner_id.as_deref(), Some("env-owner"));
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.logging.filter, "warn");
    }

    #[test]
    fn test_validation_failures() {
        let mut config = AppConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.identity.owner_id = Some("  ".into());
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_identity_from_config() {
        use crate::identity::IdentityProvider;

        let mut config = AppConfig::default();
        assert!(config.identity().current_owner().await.is_err());

        config.identity.owner_id = Some(" owner-7 ".into());
        assert_eq!(config.identity().current_owner().await.unwrap(), "owner-7");
    }

    #[test]
    fn test_roundtrip_through_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("salesbook.toml");

        let mut config = AppConfig::default();
        config.legacy.snapshot_path = Some(PathBuf::from("/tmp/legacy.json"));
        config.save(Some(path.clone())).unwrap();

        let loaded = AppConfig::load(Some(path)).unwrap();
        assert_eq!(loaded.legacy.snapshot_path, Some(PathBuf::from("/tmp/legacy.json")));
    }
}
