//! # Database Configuration
//!
//! Pool settings and message locale for [`crate::Database`].
//!
//! ```text
//! CRM_DB_PATH                  ./crm.db
//! CRM_DB_MAX_CONNECTIONS       5
//! CRM_DB_MIN_CONNECTIONS       1
//! CRM_DB_CONNECT_TIMEOUT_SECS  30
//! CRM_LOCALE                   pt-BR | en
//! ```

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::messages::Locale;

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/crm/crm.db")
///     .max_connections(10)
///     .locale(Locale::En);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Connection (acquire) timeout.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,

    /// Language of the failure messages.
    pub locale: Locale,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    ///
    /// The file is created on first connect if it does not exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
            locale: Locale::default(),
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    pub fn locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let db = Database::new(DbConfig::in_memory()).await?;
    /// ```
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1, // In-memory requires single connection
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            run_migrations: true,
            locale: Locale::default(),
        }
    }

    /// Builds a configuration from `CRM_*` environment variables.
    ///
    /// Unset variables keep the [`DbConfig::new`] defaults; the path defaults
    /// to `./crm.db`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let path = lookup("CRM_DB_PATH").unwrap_or_else(|| "./crm.db".to_string());
        let mut config = DbConfig::new(path);

        if let Some(max) = parse_var(&lookup, "CRM_DB_MAX_CONNECTIONS")? {
            config.max_connections = max;
        }
        if let Some(min) = parse_var(&lookup, "CRM_DB_MIN_CONNECTIONS")? {
            config.min_connections = min;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "CRM_DB_CONNECT_TIMEOUT_SECS")? {
            config.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(locale) = lookup("CRM_LOCALE") {
            config.locale = locale.parse()?;
        }

        if config.max_connections == 0 || config.min_connections > config.max_connections {
            return Err(ConfigError::InvalidValue(
                "CRM_DB_MIN_CONNECTIONS".to_string(),
            ));
        }

        Ok(config)
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/test.db")
            .max_connections(10)
            .min_connections(2)
            .locale(Locale::En);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.locale, Locale::En);
    }

    #[test]
    fn test_from_env_defaults() {
        let config = DbConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.database_path, PathBuf::from("./crm.db"));
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.locale, Locale::PtBr);
    }

    #[test]
    fn test_from_env_values() {
        let config = DbConfig::from_lookup(lookup(&[
            ("CRM_DB_PATH", "/data/crm.db"),
            ("CRM_DB_MAX_CONNECTIONS", "8"),
            ("CRM_DB_MIN_CONNECTIONS", "2"),
            ("CRM_DB_CONNECT_TIMEOUT_SECS", "3"),
            ("CRM_LOCALE", "en"),
        ]))
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/data/crm.db"));
        assert_eq!(config.max_connections, 8);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.locale, Locale::En);
    }

    #[test]
    fn test_from_env_rejects_garbage() {
        let err = DbConfig::from_lookup(lookup(&[("CRM_DB_MAX_CONNECTIONS", "many")]))
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for CRM_DB_MAX_CONNECTIONS");

        assert!(DbConfig::from_lookup(lookup(&[
            ("CRM_DB_MAX_CONNECTIONS", "2"),
            ("CRM_DB_MIN_CONNECTIONS", "4"),
        ]))
        .is_err());
    }
}
