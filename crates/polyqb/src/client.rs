//! Generic client trait for unified database access.

use std::future::Future;

use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::row::Row;
use crate::value::Value;

/// A trait that unifies database clients and transactions across backends.
///
/// Builders render for one [`Dialect`] and refuse to run on a client reporting another. Parameters are
/// passed as backend-neutral [`Value`]s and rows come back decoded into [`Row`].
pub trait GenericClient: Send + Sync {
    /// Backend this client talks to.
    fn dialect(&self) -> Dialect;

    /// Execute a query and return all rows.
    fn query(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = OrmResult<Vec<Row>>> + Send;

    /// Execute a statement and return the affected row count.
    fn execute(&self, sql: &str, params: &[Value]) -> impl Future<Output = OrmResult<u64>> + Send;

    /// Execute a query and require that it returns **exactly one** row.
    ///
    /// Semantics:
    /// - 0 rows: returns [`OrmError::NotFound`]
    /// - 1 row: returns that row
    /// - multiple rows: returns [`OrmError::TooManyRows`]
    fn query_one(&self, sql: &str, params: &[Value]) -> impl Future<Output = OrmResult<Row>> + Send {
        async move {
            let mut rows = self.query(sql, params).await?;
            match rows.len() {
                0 => Err(OrmError::not_found("Expected 1 row, got 0")),
                1 => rows
                    .pop()
                    .ok_or_else(|| OrmError::not_found("Expected 1 row, got 0")),
                got => Err(OrmError::TooManyRows(got)),
            }
        }
    }

    /// Execute a query and return the row, if any. More than one row is [`OrmError::TooManyRows`].
    fn query_opt(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = OrmResult<Option<Row>>> + Send {
        async move {
            let mut rows = self.query(sql, params).await?;
            match rows.len() {
                0 | 1 => Ok(rows.pop()),
                got => Err(OrmError::TooManyRows(got)),
            }
        }
    }
}

impl<C: GenericClient> GenericClient for &C {
    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    fn query(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = OrmResult<Vec<Row>>> + Send {
        (**self).query(sql, params)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> impl Future<Output = OrmResult<u64>> + Send {
        (**self).execute(sql, params)
    }

    fn query_one(&self, sql: &str, params: &[Value]) -> impl Future<Output = OrmResult<Row>> + Send {
        (**self).query_one(sql, params)
    }

    fn query_opt(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = OrmResult<Option<Row>>> + Send {
        (**self).query_opt(sql, params)
    }
}
