//! Configuration for [`Db`](crate::Db) handles.

use std::time::Duration;

use crate::dialect::Dialect;
use crate::model::SoftDeleteMode;

/// Level SQL statements are logged at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SqlLogLevel {
    Trace,
    #[default]
    Debug,
    Info,
}

/// SQL logging settings. Only effective with the `tracing` feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlLogConfig {
    /// Whether executed statements are logged.
    pub enabled: bool,
    /// Event level for successful statements. Failures always log at `warn`.
    pub level: SqlLogLevel,
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for SqlLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: SqlLogLevel::Debug,
            max_sql_length: Some(200),
        }
    }
}

impl SqlLogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Override the event level.
    pub fn level(mut self, level: SqlLogLevel) -> Self {
        self.level = level;
        self
    }

    /// Set maximum SQL length to display.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    pub(crate) fn truncate<'a>(&self, sql: &'a str) -> std::borrow::Cow<'a, str> {
        match self.max_sql_length {
            Some(max) if sql.len() > max => {
                let mut end = max;
                while end > 0 && !sql.is_char_boundary(end) {
                    end -= 1;
                }
                format!("{}...", &sql[..end]).into()
            }
            _ => sql.into(),
        }
    }
}

/// Settings for a [`Db`](crate::Db) handle.
///
/// There are no compiled-in connection secrets: connection strings go to the driver or pool.
#[derive(Debug, Clone, Default)]
pub struct DbConfig {
    /// Per-statement timeout. `None` means no timeout (default).
    pub query_timeout: Option<Duration>,
    /// Render for this dialect instead of the one reported by the client.
    pub dialect_override: Option<Dialect>,
    /// Soft-delete visibility for builders created by the handle.
    pub soft_delete: SoftDeleteMode,
    /// Let `new_delete` builders run without conditions.
    pub allow_delete_all: bool,
    pub log: SqlLogConfig,
}

impl DbConfig {
    /// Create a new configuration with defaults (no timeout, client dialect, live rows only).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the query timeout duration.
    ///
    /// Statements exceeding it fail with [`OrmError::Timeout`](crate::OrmError::Timeout).
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect_override = Some(dialect);
        self
    }

    pub fn with_soft_delete(mut self, mode: SoftDeleteMode) -> Self {
        self.soft_delete = mode;
        self
    }

    pub fn with_allow_delete_all(mut self, allow: bool) -> Self {
        self.allow_delete_all = allow;
        self
    }

    pub fn with_log(mut self, log: SqlLogConfig) -> Self {
        self.log = log;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_char_boundaries() {
        let log = SqlLogConfig::new().max_sql_length(4);
        assert_eq!(log.truncate("SELECT 1"), "SELE...");
        assert_eq!(log.truncate("abcé"), "abc...");
        assert_eq!(log.truncate("abc"), "abc");
        assert_eq!(SqlLogConfig::new().no_truncate().truncate("SELECT 1"), "SELECT 1");
    }

    #[test]
    fn builder_setters() {
        let config = DbConfig::new()
            .with_query_timeout(Duration::from_secs(2))
            .with_dialect(Dialect::Oracle)
            .with_allow_delete_all(true);
        assert_eq!(config.query_timeout, Some(Duration::from_secs(2)));
        assert_eq!(config.dialect_override, Some(Dialect::Oracle));
        assert!(config.allow_delete_all);
        assert_eq!(config.soft_delete, SoftDeleteMode::Exclude);
    }
}
