//! Configuration loading from file and environment variables.

use serde::Deserialize;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::event::VISIT;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OblogConfig {
    /// Event logger settings.
    #[serde(default)]
    pub logger: LoggerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Diagnostic logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings captured by an [`EventLogger`](crate::EventLogger) at construction.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggerConfig {
    /// Environment tag applied to every event.
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Event type used when a call does not supply one.
    #[serde(default = "default_event_type")]
    pub default_event_type: String,

    /// Name of the enricher to use. `None` selects the no-op enricher.
    #[serde(default)]
    pub enricher: Option<String>,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file, or `:memory:`.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Diagnostic logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "oblog=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_environment() -> String {
    "prod".to_string()
}

fn default_event_type() -> String {
    VISIT.to_string()
}

fn default_db_path() -> String {
    "oblog.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            default_event_type: default_event_type(),
            enricher: None,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl DatabaseConfig {
    /// Settings for a private in-memory database.
    pub fn in_memory() -> Self {
        Self {
            path: oblog_db::MEMORY_PATH.to_string(),
            ..Self::default()
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration or building a logger
/// from it.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// The environment tag was empty.
    #[error("logger environment must not be empty")]
    EmptyEnvironment,

    /// The default event type was empty.
    #[error("default event type must not be empty")]
    EmptyDefaultEventType,

    /// The configured enricher is not registered.
    #[error("unknown enricher '{0}'")]
    UnknownEnricher(String),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `OBLOG_ENV` overrides `logger.environment`
/// - `OBLOG_DEFAULT_EVENT_TYPE` overrides `logger.default_event_type`
/// - `OBLOG_ENRICHER` overrides `logger.enricher`
/// - `OBLOG_DB_PATH` overrides `database.path`
/// - `OBLOG_LOG_LEVEL` overrides `logging.level`
/// - `OBLOG_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<OblogConfig, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                OblogConfig::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => OblogConfig::default(),
    };

    apply_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Applies `OBLOG_*` overrides read through `lookup`.
pub fn apply_overrides<F>(config: &mut OblogConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(env) = lookup("OBLOG_ENV") {
        config.logger.environment = env;
    }
    if let Some(event_type) = lookup("OBLOG_DEFAULT_EVENT_TYPE") {
        config.logger.default_event_type = event_type;
    }
    if let Some(enricher) = lookup("OBLOG_ENRICHER") {
        config.logger.enricher = Some(enricher).filter(|name| !name.is_empty());
    }
    if let Some(db_path) = lookup("OBLOG_DB_PATH") {
        config.database.path = db_path;
    }
    if let Some(level) = lookup("OBLOG_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("OBLOG_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
}

/// Installs a global `tracing` subscriber for `config`.
///
/// Does nothing if a subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let result = if config.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_documented_values() {
        let config = OblogConfig::default();
        assert_eq!(config.logger.environment, "prod");
        assert_eq!(config.logger.default_event_type, "visit");
        assert!(config.logger.enricher.is_none());
        assert_eq!(config.database.path, "oblog.db");
        assert_eq!(config.database.busy_timeout_ms, 5_000);
        assert_eq!(config.database.pool_max_size, 8);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: OblogConfig = toml::from_str(
            r#"
            [logger]
            environment = "staging"
            enricher = "request"

            [database]
            path = "/var/lib/oblog/events.db"
            "#,
        )
        .expect("should parse");

        assert_eq!(config.logger.environment, "staging");
        assert_eq!(config.logger.default_event_type, "visit");
        assert_eq!(config.logger.enricher.as_deref(), Some("request"));
        assert_eq!(config.database.path, "/var/lib/oblog/events.db");
        assert_eq!(config.database.pool_max_size, 8);
    }

    #[test]
    fn overrides_replace_file_values() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("OBLOG_ENV", "test"),
            ("OBLOG_DEFAULT_EVENT_TYPE", "click"),
            ("OBLOG_ENRICHER", ""),
            ("OBLOG_DB_PATH", ":memory:"),
            ("OBLOG_LOG_JSON", "1"),
        ]);
        let mut config = OblogConfig::default();
        config.logger.enricher = Some("request".to_string());

        apply_overrides(&mut config, |key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.logger.environment, "test");
        assert_eq!(config.logger.default_event_type, "click");
        assert!(config.logger.enricher.is_none(), "empty name clears enricher");
        assert_eq!(config.database.path, ":memory:");
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.json);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("absent.toml");
        let config = load_config(Some(path.to_str().expect("utf-8 path")))
            .expect("missing file is not an error");
        assert_eq!(config.database.busy_timeout_ms, 5_000);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[logger\nenvironment = ").expect("write config");

        let err = load_config(Some(path.to_str().expect("utf-8 path")))
            .expect_err("should fail to parse");
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn init_tracing_tolerates_repeat_calls() {
        let config = LoggingConfig {
            level: "not a valid filter [".to_string(),
            json: false,
        };
        init_tracing(&config);
        init_tracing(&LoggingConfig::default());
    }
}
