//! Trait definitions for query builders.

use std::future::Future;

use crate::client::GenericClient;
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::row::{FromRow, Row};
use crate::value::Value;

/// Base trait for all query builders.
///
/// Rendering borrows the builder; execution consumes it.
pub trait SqlQb: Sized + Send {
    /// Dialect the builder renders for.
    fn dialect(&self) -> Dialect;

    /// Render SQL text and parameters. Pure: repeated calls give identical output.
    fn to_sql(&self) -> OrmResult<(String, Vec<Value>)>;

    /// Check that the builder renders.
    fn validate(&self) -> OrmResult<()> {
        self.to_sql().map(|_| ())
    }

    /// Execute query and return all rows.
    fn query(self, conn: &impl GenericClient) -> impl Future<Output = OrmResult<Vec<Row>>> + Send {
        async move {
            let (sql, params) = prepare(&self, conn)?;
            conn.query(&sql, &params).await
        }
    }

    /// Execute query and return at most one row.
    fn query_opt(
        self,
        conn: &impl GenericClient,
    ) -> impl Future<Output = OrmResult<Option<Row>>> + Send {
        async move {
            let (sql, params) = prepare(&self, conn)?;
            conn.query_opt(&sql, &params).await
        }
    }

    /// Execute query and return exactly one row.
    fn query_one(self, conn: &impl GenericClient) -> impl Future<Output = OrmResult<Row>> + Send {
        async move {
            let (sql, params) = prepare(&self, conn)?;
            conn.query_one(&sql, &params).await
        }
    }

    /// Execute query and map all rows to `T`.
    fn fetch_all<T: FromRow>(
        self,
        conn: &impl GenericClient,
    ) -> impl Future<Output = OrmResult<Vec<T>>> + Send {
        async move {
            let rows = self.query(conn).await?;
            rows.iter().map(T::from_row).collect()
        }
    }

    /// Execute query and map at most one row to `T`.
    fn fetch_opt<T: FromRow>(
        self,
        conn: &impl GenericClient,
    ) -> impl Future<Output = OrmResult<Option<T>>> + Send {
        async move {
            let row = self.query_opt(conn).await?;
            row.as_ref().map(T::from_row).transpose()
        }
    }

    /// Execute query and map exactly one row to `T`.
    fn fetch_one<T: FromRow>(
        self,
        conn: &impl GenericClient,
    ) -> impl Future<Output = OrmResult<T>> + Send {
        async move {
            let row = self.query_one(conn).await?;
            T::from_row(&row)
        }
    }
}

/// Trait for mutation builders (INSERT/UPDATE/DELETE/MERGE).
pub trait MutationQb: SqlQb {
    /// Execute and return affected row count.
    fn execute(self, conn: &impl GenericClient) -> impl Future<Output = OrmResult<u64>> + Send {
        async move {
            let (sql, params) = prepare(&self, conn)?;
            conn.execute(&sql, &params).await
        }
    }

    /// Execute and map the `RETURNING` / `OUTPUT` rows to `T`.
    fn fetch_returning<T: FromRow>(
        self,
        conn: &impl GenericClient,
    ) -> impl Future<Output = OrmResult<Vec<T>>> + Send {
        self.fetch_all(conn)
    }
}

/// Render `qb` for execution on `conn`, rejecting a dialect mismatch.
pub(crate) fn prepare(
    qb: &impl SqlQb,
    conn: &impl GenericClient,
) -> OrmResult<(String, Vec<Value>)> {
    let built = qb.dialect();
    let actual = conn.dialect();
    if built != actual {
        return Err(OrmError::DialectMismatch { built, actual });
    }
    qb.to_sql()
}
