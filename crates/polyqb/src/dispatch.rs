//! Per-dialect dispatch tables.
//!
//! A [`Dispatch`] holds at most one closure per backend plus an optional default. Resolution picks the
//! backend entry, then the default, and otherwise fails with [`OrmError::UnsupportedDialect`]. A missing
//! handler is always an error: silently dropping a fragment would corrupt the statement.
//!
//! ```ignore
//! let sql = Dispatch::new("modulo")
//!     .oracle(|| Expr::template("MOD(?, ?)", [a, b]))
//!     .default(|| Expr::template("(? % ?)", [a, b]))
//!     .expr(dialect);
//! ```

use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::expr::Expr;

type Handler<'a, R> = Box<dyn FnOnce() -> R + 'a>;

/// A dispatch table for one operation.
#[must_use]
pub struct Dispatch<'a, R> {
    op: &'static str,
    postgres: Option<Handler<'a, R>>,
    mysql: Option<Handler<'a, R>>,
    sqlite: Option<Handler<'a, R>>,
    oracle: Option<Handler<'a, R>>,
    sqlserver: Option<Handler<'a, R>>,
    default: Option<Handler<'a, R>>,
}

impl<'a, R> Dispatch<'a, R> {
    /// Start a table for the operation named `op` (used in error messages).
    pub fn new(op: &'static str) -> Self {
        Self {
            op,
            postgres: None,
            mysql: None,
            sqlite: None,
            oracle: None,
            sqlserver: None,
            default: None,
        }
    }

    pub fn postgres(mut self, f: impl FnOnce() -> R + 'a) -> Self {
        self.postgres = Some(Box::new(f));
        self
    }

    pub fn mysql(mut self, f: impl FnOnce() -> R + 'a) -> Self {
        self.mysql = Some(Box::new(f));
        self
    }

    pub fn sqlite(mut self, f: impl FnOnce() -> R + 'a) -> Self {
        self.sqlite = Some(Box::new(f));
        self
    }

    pub fn oracle(mut self, f: impl FnOnce() -> R + 'a) -> Self {
        self.oracle = Some(Box::new(f));
        self
    }

    pub fn sqlserver(mut self, f: impl FnOnce() -> R + 'a) -> Self {
        self.sqlserver = Some(Box::new(f));
        self
    }

    /// Fallback used by every dialect without its own entry.
    pub fn default(mut self, f: impl FnOnce() -> R + 'a) -> Self {
        self.default = Some(Box::new(f));
        self
    }

    /// Run exactly one handler for `dialect`.
    pub fn resolve(self, dialect: Dialect) -> OrmResult<R> {
        let specific = match dialect {
            Dialect::Postgres => self.postgres,
            Dialect::MySql => self.mysql,
            Dialect::Sqlite => self.sqlite,
            Dialect::Oracle => self.oracle,
            Dialect::SqlServer => self.sqlserver,
        };
        match specific.or(self.default) {
            Some(handler) => Ok(handler()),
            None => Err(OrmError::unsupported(self.op, dialect)),
        }
    }
}

impl Dispatch<'_, Expr> {
    /// Resolve to a fragment. A missing handler yields an invalid fragment that fails at render time.
    pub fn expr(self, dialect: Dialect) -> Expr {
        self.resolve(dialect).unwrap_or_else(Expr::invalid)
    }
}

impl Dispatch<'_, ()> {
    /// Resolve and run a side-effecting handler.
    pub fn run(self, dialect: Dialect) -> OrmResult<()> {
        self.resolve(dialect)
    }
}

impl Dispatch<'_, OrmResult<()>> {
    /// Resolve and run a handler that may itself fail.
    pub fn try_run(self, dialect: Dialect) -> OrmResult<()> {
        self.resolve(dialect)?
    }
}

impl Dispatch<'_, String> {
    /// Resolve to raw SQL text.
    pub fn raw(self, dialect: Dialect) -> OrmResult<String> {
        self.resolve(dialect)
    }
}
