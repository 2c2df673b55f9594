//! Runtime configuration for hosts embedding the forum core.
//!
//! # Responsibility
//! - Parse host configuration from JSON and supply defaults.
//! - Turn configuration into an open database and active logging.
//!
//! # Invariants
//! - Every field is optional in the JSON source; absent fields take the
//!   `Default` value.
//! - An absent `db_path` selects an in-memory database.

use crate::db::{open_db, open_db_in_memory, DbError, DEFAULT_BUSY_TIMEOUT};
use crate::logging::{default_log_level, init_logging, normalize_level, LoggingError};
use crate::service::user_service::LATEST_LIMIT;
use rusqlite::Connection;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForumConfig {
    pub db_path: Option<PathBuf>,
    pub busy_timeout_ms: u64,
    pub log_level: String,
    /// Absolute directory for rotating log files; `None` disables file logs.
    pub log_dir: Option<PathBuf>,
    /// Size of latest-topics and latest-replies views.
    pub latest_limit: u32,
}

impl Default for ForumConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            busy_timeout_ms: u64::try_from(DEFAULT_BUSY_TIMEOUT.as_millis()).unwrap_or(u64::MAX),
            log_level: default_log_level().to_string(),
            log_dir: None,
            latest_limit: LATEST_LIMIT,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
    /// A field parsed but holds an unusable value.
    Invalid { field: &'static str, message: String },
    Logging(LoggingError),
    Db(DbError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "cannot read `{}`: {source}", path.display()),
            Self::Parse(err) => write!(f, "invalid config: {err}"),
            Self::Invalid { field, message } => write!(f, "invalid `{field}`: {message}"),
            Self::Logging(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Logging(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Invalid { .. } => None,
        }
    }
}

impl From<LoggingError> for ConfigError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}

impl From<DbError> for ConfigError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl ForumConfig {
    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(source).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&source)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Opens and migrates the configured database.
    pub fn open_database(&self) -> Result<Connection, ConfigError> {
        let conn = match &self.db_path {
            Some(path) => open_db(path, self.busy_timeout())?,
            None => open_db_in_memory()?,
        };
        Ok(conn)
    }

    /// Starts file logging when `log_dir` is set.
    ///
    /// Returns whether logging is active afterwards.
    pub fn init_logging(&self) -> Result<bool, ConfigError> {
        match &self.log_dir {
            Some(dir) => {
                init_logging(&self.log_level, dir)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        normalize_level(&self.log_level).map_err(|err| ConfigError::Invalid {
            field: "log_level",
            message: err.to_string(),
        })?;
        if self.latest_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "latest_limit",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, ForumConfig};
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn empty_object_yields_defaults() {
        let config = ForumConfig::from_json_str("{}").unwrap();
        assert_eq!(config, ForumConfig::default());
        assert_eq!(config.latest_limit, 10);
        assert_eq!(config.busy_timeout(), Duration::from_secs(5));
        assert!(config.db_path.is_none());
    }

    #[test]
    fn explicit_fields_override_defaults() {
        let config = ForumConfig::from_json_str(
            r#"{ "db_path": "/var/lib/forum.db", "busy_timeout_ms": 250, "log_level": "warn", "latest_limit": 3 }"#,
        )
        .unwrap();
        assert_eq!(config.db_path, Some(PathBuf::from("/var/lib/forum.db")));
        assert_eq!(config.busy_timeout(), Duration::from_millis(250));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.latest_limit, 3);
    }

    #[test]
    fn unknown_fields_and_bad_values_are_rejected() {
        assert!(matches!(
            ForumConfig::from_json_str(r#"{ "db": "x" }"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            ForumConfig::from_json_str(r#"{ "log_level": "loud" }"#),
            Err(ConfigError::Invalid {
                field: "log_level",
                ..
            })
        ));
        assert!(matches!(
            ForumConfig::from_json_str(r#"{ "latest_limit": 0 }"#),
            Err(ConfigError::Invalid {
                field: "latest_limit",
                ..
            })
        ));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        assert!(matches!(
            ForumConfig::load(&missing),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn in_memory_database_when_no_path_is_configured() {
        let conn = ForumConfig::default().open_database().unwrap();
        let version: u32 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert!(version > 0);
    }
}
