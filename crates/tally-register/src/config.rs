//! # Register Configuration
//!
//! Configuration for the reconciliation engine and its binaries.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TALLY_DB_PATH=/var/lib/tally/tally.db                              │
//! │     TALLY_DB_MAX_CONNECTIONS=5                                         │
//! │     TALLY_LOG=info,tally=debug                                         │
//! │     TALLY_HISTORY_ORDER=ascending                                      │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/tally-register/register.toml (Linux)                     │
//! │     ~/Library/Application Support/com.tally.register/register.toml     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "tally.db"
//! max_connections = 5
//!
//! [logging]
//! filter = "info,tally=debug,sqlx=warn"
//!
//! [history]
//! default_order = "descending"
//! max_days = 366
//!
//! [[actors]]
//! id = "ali"
//! role = "cashier"
//!
//! [[actors]]
//! id = "sara"
//! role = "admin"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use tally_core::{HistoryOrder, MAX_HISTORY_DAYS};
use tally_db::DbConfig;

use crate::error::{RegisterError, RegisterResult};

// =============================================================================
// Database Settings
// =============================================================================

/// Where the drawer database lives and how many connections it gets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path, or `:memory:`.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a writer waits on a locked database (milliseconds).
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("com", "tally", "register")
        .map(|dirs| dirs.data_dir().join("tally.db"))
        .unwrap_or_else(|| PathBuf::from("tally.db"))
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout() -> u64 {
    5_000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

impl DatabaseSettings {
    /// Builds the pool configuration for these settings.
    pub fn to_db_config(&self) -> DbConfig {
        if self.path.as_os_str() == ":memory:" {
            return DbConfig::in_memory();
        }

        DbConfig::new(&self.path)
            .max_connections(self.max_connections)
            .busy_timeout(std::time::Duration::from_millis(self.busy_timeout_ms))
    }
}

// =============================================================================
// Logging Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directives used when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

pub(crate) fn default_log_filter() -> String {
    "info,tally=debug,sqlx=warn".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: default_log_filter(),
        }
    }
}

// =============================================================================
// History Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySettings {
    /// Order used when a caller does not pick one.
    #[serde(default)]
    pub default_order: HistoryOrder,

    /// Longest span, in days, a single history query may cover.
    #[serde(default = "default_max_days")]
    pub max_days: u32,
}

fn default_max_days() -> u32 {
    MAX_HISTORY_DAYS
}

impl Default for HistorySettings {
    fn default() -> Self {
        HistorySettings {
            default_order: HistoryOrder::default(),
            max_days: default_max_days(),
        }
    }
}

// =============================================================================
// Actors
// =============================================================================

/// One `[[actors]]` entry. The role is parsed leniently; unknown names
/// become the unprivileged staff role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorEntry {
    pub id: String,
    pub role: String,
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete register configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub logging: LoggingSettings,

    #[serde(default)]
    pub history: HistorySettings,

    #[serde(default)]
    pub actors: Vec<ActorEntry>,
}

impl RegisterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (register.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> RegisterResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading register config from file");
                config = Self::from_file(&path)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load register config: {}. Using defaults.", e);
            Self::default()
        })
    }

    fn from_file(path: &Path) -> RegisterResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> RegisterResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| RegisterError::Config("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Register config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> RegisterResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(RegisterError::Config("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(RegisterError::Config(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.history.max_days == 0 {
            return Err(RegisterError::Config(
                "history.max_days must be greater than 0".into(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for actor in &self.actors {
            if actor.id.trim().is_empty() {
                return Err(RegisterError::Config("actor id must not be empty".into()));
            }
            if !seen.insert(actor.id.as_str()) {
                return Err(RegisterError::Config(format!(
                    "actor '{}' is listed more than once",
                    actor.id
                )));
            }
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("TALLY_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(max) = std::env::var("TALLY_DB_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid TALLY_DB_MAX_CONNECTIONS"),
            }
        }

        if let Ok(filter) = std::env::var("TALLY_LOG") {
            self.logging.filter = filter;
        }

        if let Ok(order) = std::env::var("TALLY_HISTORY_ORDER") {
            match order.to_lowercase().as_str() {
                "asc" | "ascending" => self.history.default_order = HistoryOrder::Ascending,
                "desc" | "descending" => self.history.default_order = HistoryOrder::Descending,
                _ => warn!(order = %order, "Unknown history order in environment"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "tally", "register")
            .map(|dirs| dirs.config_dir().join("register.toml"))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const ENV_KEYS: [&str; 4] = [
        "TALLY_DB_PATH",
        "TALLY_DB_MAX_CONNECTIONS",
        "TALLY_LOG",
        "TALLY_HISTORY_ORDER",
    ];

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("tally-config-{}-{}", std::process::id(), name))
    }

    fn cleared<F: FnOnce()>(f: F) {
        temp_env::with_vars_unset(ENV_KEYS, f);
    }

    #[test]
    fn test_default_config() {
        let config = RegisterConfig::default();
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.logging.filter, "info,tally=debug,sqlx=warn");
        assert_eq!(config.history.default_order, HistoryOrder::Descending);
        assert_eq!(config.history.max_days, 366);
        assert!(config.actors.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let path = temp_path("load.toml");
        std::fs::write(
            &path,
            r#"
            [database]
            path = "/tmp/tally-test.db"

            [history]
            default_order = "ascending"

            [[actors]]
            id = "ali"
            role = "cashier"

            [[actors]]
            id = "sara"
            role = "Admin"
            "#,
        )
        .unwrap();

        cleared(|| {
            let config = RegisterConfig::load(Some(path.clone())).unwrap();
            assert_eq!(config.database.path, PathBuf::from("/tmp/tally-test.db"));
            assert_eq!(config.database.max_connections, 5);
            assert_eq!(config.history.default_order, HistoryOrder::Ascending);
            assert_eq!(config.actors.len(), 2);
            assert_eq!(config.actors[1].role, "Admin");
        });

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_env_overrides_file() {
        let path = temp_path("env.toml");
        std::fs::write(&path, "[database]\npath = \"/tmp/from-file.db\"\n").unwrap();

        temp_env::with_vars(
            [
                ("TALLY_DB_PATH", Some("/tmp/from-env.db")),
                ("TALLY_DB_MAX_CONNECTIONS", Some("2")),
                ("TALLY_LOG", Some("warn")),
                ("TALLY_HISTORY_ORDER", Some("asc")),
            ],
            || {
                let config = RegisterConfig::load(Some(path.clone())).unwrap();
                assert_eq!(config.database.path, PathBuf::from("/tmp/from-env.db"));
                assert_eq!(config.database.max_connections, 2);
                assert_eq!(config.logging.filter, "warn");
                assert_eq!(config.history.default_order, HistoryOrder::Ascending);
            },
        );

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_invalid_env_values_are_ignored() {
        let missing = temp_path("missing.toml");
        temp_env::with_vars(
            [
                ("TALLY_DB_PATH", None),
                ("TALLY_LOG", None),
                ("TALLY_DB_MAX_CONNECTIONS", Some("many")),
                ("TALLY_HISTORY_ORDER", Some("sideways")),
            ],
            || {
                let config = RegisterConfig::load(Some(missing.clone())).unwrap();
                assert_eq!(config.database.max_connections, 5);
                assert_eq!(config.history.default_order, HistoryOrder::Descending);
            },
        );
    }

    #[test]
    fn test_zero_connections_fails_validation() {
        temp_env::with_vars(
            [
                ("TALLY_DB_PATH", None),
                ("TALLY_LOG", None),
                ("TALLY_HISTORY_ORDER", None),
                ("TALLY_DB_MAX_CONNECTIONS", Some("0")),
            ],
            || {
                let err = RegisterConfig::load(Some(temp_path("zero.toml"))).unwrap_err();
                assert!(matches!(err, RegisterError::Config(_)));

                let config = RegisterConfig::load_or_default(Some(temp_path("zero.toml")));
                assert_eq!(config.database.max_connections, 5);
            },
        );
    }

    #[test]
    fn test_duplicate_actor_rejected() {
        let mut config = RegisterConfig::default();
        config.actors = vec![
            ActorEntry {
                id: "ali".to_string(),
                role: "cashier".to_string(),
            },
            ActorEntry {
                id: "ali".to_string(),
                role: "admin".to_string(),
            },
        ];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let path = temp_path("bad.toml");
        std::fs::write(&path, "[database\npath = 1").unwrap();

        cleared(|| {
            let err = RegisterConfig::load(Some(path.clone())).unwrap_err();
            assert!(matches!(err, RegisterError::ConfigParse(_)));
        });

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_save_then_load() {
        let path = temp_path("saved/register.toml");
        let mut config = RegisterConfig::default();
        config.database.path = PathBuf::from("/tmp/saved.db");
        config.actors.push(ActorEntry {
            id: "owner-1".to_string(),
            role: "owner".to_string(),
        });

        config.save(Some(path.clone())).unwrap();

        cleared(|| {
            let loaded = RegisterConfig::load(Some(path.clone())).unwrap();
            assert_eq!(loaded.database.path, PathBuf::from("/tmp/saved.db"));
            assert_eq!(loaded.actors, config.actors);
        });

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_memory_path_maps_to_in_memory_pool() {
        let settings = DatabaseSettings {
            path: PathBuf::from(":memory:"),
            ..DatabaseSettings::default()
        };
        assert!(settings.to_db_config().is_in_memory());
    }
}
