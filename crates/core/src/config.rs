//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services. Request
//! handling never reads process-wide environment variables.

use crate::constants::{DEFAULT_BUSY_TIMEOUT_MS, DEFAULT_DATABASE_PATH};
use crate::{ClinicError, ClinicResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    database_path: PathBuf,
    busy_timeout: Duration,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `ClinicError::InvalidConfig` if the database path is empty or the busy timeout is
    /// zero.
    pub fn new(database_path: PathBuf, busy_timeout: Duration) -> ClinicResult<Self> {
        if database_path.as_os_str().is_empty() {
            return Err(ClinicError::InvalidConfig(
                "database path cannot be empty".into(),
            ));
        }
        if busy_timeout.is_zero() {
            return Err(ClinicError::InvalidConfig(
                "busy timeout must be greater than zero".into(),
            ));
        }

        Ok(Self {
            database_path,
            busy_timeout,
        })
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn busy_timeout(&self) -> Duration {
        self.busy_timeout
    }
}

/// Resolve the database path from an optional environment value.
///
/// Empty or whitespace-only values fall back to [`DEFAULT_DATABASE_PATH`].
pub fn database_path_from_env_value(value: Option<String>) -> PathBuf {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH))
}

/// Parse the busy timeout (milliseconds) from an optional environment value.
///
/// If `value` is `None` or blank, returns [`DEFAULT_BUSY_TIMEOUT_MS`].
pub fn busy_timeout_from_env_value(value: Option<String>) -> ClinicResult<Duration> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let millis = match value {
        Some(v) => v.parse::<u64>().map_err(|e| {
            ClinicError::InvalidConfig(format!("busy timeout '{v}' is not a number: {e}"))
        })?,
        None => DEFAULT_BUSY_TIMEOUT_MS,
    };

    Ok(Duration::from_millis(millis))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_empty_path() {
        let result = CoreConfig::new(PathBuf::new(), Duration::from_secs(1));
        assert!(matches!(result, Err(ClinicError::InvalidConfig(_))));
    }

    #[test]
    fn test_new_rejects_zero_timeout() {
        let result = CoreConfig::new(PathBuf::from("x.db"), Duration::ZERO);
        assert!(matches!(result, Err(ClinicError::InvalidConfig(_))));
    }

    #[test]
    fn test_database_path_defaults_when_blank() {
        assert_eq!(
            database_path_from_env_value(Some("  ".into())),
            PathBuf::from(DEFAULT_DATABASE_PATH)
        );
        assert_eq!(
            database_path_from_env_value(None),
            PathBuf::from(DEFAULT_DATABASE_PATH)
        );
        assert_eq!(
            database_path_from_env_value(Some("/var/lib/clinic.db".into())),
            PathBuf::from("/var/lib/clinic.db")
        );
    }

    #[test]
    fn test_busy_timeout_parsing() {
        assert_eq!(
            busy_timeout_from_env_value(None).unwrap(),
            Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS)
        );
        assert_eq!(
            busy_timeout_from_env_value(Some("250".into())).unwrap(),
            Duration::from_millis(250)
        );
        assert!(matches!(
            busy_timeout_from_env_value(Some("soon".into())),
            Err(ClinicError::InvalidConfig(_))
        ));
    }
}
