//! The [`Db`] handle: a client plus the dialect and settings builders are created with.

use std::future::Future;
use std::time::{Duration, Instant};

use crate::client::GenericClient;
use crate::condition::ConditionBuilder;
use crate::config::DbConfig;
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::expr::ExprBuilder;
use crate::qb::{DeleteQb, InsertQb, MergeQb, SelectQb, UpdateQb};
use crate::row::Row;
use crate::value::Value;

/// A database handle.
///
/// Builders obtained here carry the handle's dialect and defaults. Statements executed through the
/// handle honour the configured timeout and are logged on the `polyqb.sql` target when the `tracing`
/// feature is enabled.
///
/// ```ignore
/// let db = Db::new(client);
/// let top: Vec<Post> = db
///     .new_select()
///     .model::<Post>()
///     .gt("view_count", 50)
///     .order_by_desc("view_count")
///     .limit(3)
///     .fetch_all(&db)
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct Db<C> {
    client: C,
    dialect: Dialect,
    config: DbConfig,
}

impl<C: GenericClient> Db<C> {
    pub fn new(client: C) -> Self {
        Self::with_config(client, DbConfig::default())
    }

    pub fn with_config(client: C, config: DbConfig) -> Self {
        let dialect = config
            .dialect_override
            .unwrap_or_else(|| client.dialect());
        Self {
            client,
            dialect,
            config,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn into_inner(self) -> C {
        self.client
    }

    pub fn new_select(&self) -> SelectQb {
        SelectQb::new(self.dialect).soft_delete_mode(self.config.soft_delete)
    }

    pub fn new_insert(&self) -> InsertQb {
        InsertQb::new(self.dialect)
    }

    pub fn new_update(&self) -> UpdateQb {
        UpdateQb::new(self.dialect).soft_delete_mode(self.config.soft_delete)
    }

    pub fn new_delete(&self) -> DeleteQb {
        let qb = DeleteQb::new(self.dialect).soft_delete_mode(self.config.soft_delete);
        if self.config.allow_delete_all {
            qb.allow_delete_all()
        } else {
            qb
        }
    }

    pub fn new_merge(&self) -> MergeQb {
        MergeQb::new(self.dialect)
    }

    pub fn expr(&self) -> ExprBuilder {
        ExprBuilder::new(self.dialect)
    }

    pub fn condition(&self) -> ConditionBuilder {
        ConditionBuilder::new(self.dialect)
    }

    async fn run<T>(
        &self,
        sql: &str,
        param_count: usize,
        fut: impl Future<Output = OrmResult<T>>,
    ) -> OrmResult<T> {
        let start = Instant::now();
        let result = match self.config.query_timeout {
            Some(limit) => match tokio::time::timeout(limit, fut).await {
                Ok(result) => result,
                Err(_) => Err(OrmError::Timeout(limit)),
            },
            None => fut.await,
        };
        self.log(sql, param_count, start.elapsed(), &result);
        result
    }

    #[cfg(feature = "tracing")]
    fn log<T>(&self, sql: &str, param_count: usize, elapsed: Duration, result: &OrmResult<T>) {
        use crate::config::SqlLogLevel;

        /// Dispatch a tracing event at a runtime-determined level.
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    SqlLogLevel::Trace => tracing::trace!($($field)*),
                    SqlLogLevel::Debug => tracing::debug!($($field)*),
                    SqlLogLevel::Info => tracing::info!($($field)*),
                }
            };
        }

        let log = &self.config.log;
        if !log.enabled {
            return;
        }
        let op = StatementKind::from_sql(sql).as_str();
        let sql = log.truncate(sql);
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        match result {
            Ok(_) => emit_at_level!(
                log.level,
                target: "polyqb.sql",
                dialect = %self.dialect,
                op,
                param_count,
                elapsed_ms,
                sql = %sql,
                "statement executed"
            ),
            Err(error) => tracing::warn!(
                target: "polyqb.sql",
                dialect = %self.dialect,
                op,
                param_count,
                elapsed_ms,
                sql = %sql,
                %error,
                "statement failed"
            ),
        }
    }

    #[cfg(not(feature = "tracing"))]
    fn log<T>(&self, _sql: &str, _param_count: usize, _elapsed: Duration, _result: &OrmResult<T>) {}
}

impl<C: GenericClient> GenericClient for Db<C> {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        self.run(sql, params.len(), self.client.query(sql, params))
            .await
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        self.run(sql, params.len(), self.client.execute(sql, params))
            .await
    }
}

/// Statement kind, as reported in SQL logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Merge,
    Other,
}

impl StatementKind {
    /// Detect the kind from SQL text. For CTEs (`WITH ...`) the keyword after the last top-level
    /// parenthesis decides.
    pub fn from_sql(sql: &str) -> Self {
        let trimmed = sql.trim_start();
        match first_keyword(trimmed).to_ascii_uppercase().as_str() {
            "SELECT" => StatementKind::Select,
            "INSERT" => StatementKind::Insert,
            "UPDATE" => StatementKind::Update,
            "DELETE" => StatementKind::Delete,
            "MERGE" => StatementKind::Merge,
            "WITH" => Self::from_sql_after_ctes(trimmed),
            _ => StatementKind::Other,
        }
    }

    fn from_sql_after_ctes(sql: &str) -> Self {
        let bytes = sql.as_bytes();
        let mut depth: i32 = 0;
        let mut last_top_level = 0;
        let mut in_string = false;
        for (i, b) in bytes.iter().enumerate() {
            match (*b, in_string) {
                (b'\'', _) => in_string = !in_string,
                (b'(', false) => depth += 1,
                (b')', false) => {
                    depth -= 1;
                    if depth == 0 {
                        last_top_level = i + 1;
                    }
                }
                _ => {}
            }
        }
        match Self::from_sql(&sql[last_top_level..]) {
            // `WITH` was the only keyword found.
            StatementKind::Other if last_top_level == 0 => StatementKind::Other,
            kind => kind,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatementKind::Select => "select",
            StatementKind::Insert => "insert",
            StatementKind::Update => "update",
            StatementKind::Delete => "delete",
            StatementKind::Merge => "merge",
            StatementKind::Other => "other",
        }
    }
}

fn first_keyword(sql: &str) -> &str {
    let end = sql
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(sql.len());
    &sql[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DbConfig;
    use crate::model::SoftDeleteMode;
    use crate::qb::SqlQb;
    use std::sync::Arc;

    struct SlowClient {
        delay: Duration,
    }

    impl GenericClient for SlowClient {
        fn dialect(&self) -> Dialect {
            Dialect::Sqlite
        }

        async fn query(&self, _sql: &str, _params: &[Value]) -> OrmResult<Vec<Row>> {
            tokio::time::sleep(self.delay).await;
            Ok(vec![Row::new(Arc::from(vec!["n".to_string()]), vec![Value::Int(1)])])
        }

        async fn execute(&self, _sql: &str, _params: &[Value]) -> OrmResult<u64> {
            tokio::time::sleep(self.delay).await;
            Ok(1)
        }
    }

    #[test]
    fn statement_kind_detection() {
        assert_eq!(StatementKind::from_sql("  select 1"), StatementKind::Select);
        assert_eq!(
            StatementKind::from_sql("WITH t AS (SELECT ')') DELETE FROM x"),
            StatementKind::Delete
        );
        assert_eq!(
            StatementKind::from_sql("MERGE INTO t USING s ON t.id = s.id"),
            StatementKind::Merge
        );
        assert_eq!(StatementKind::from_sql("VACUUM"), StatementKind::Other);
    }

    #[test]
    fn builders_inherit_dialect_and_defaults() {
        let db = Db::with_config(
            SlowClient {
                delay: Duration::ZERO,
            },
            DbConfig::new()
                .with_dialect(Dialect::Postgres)
                .with_allow_delete_all(true)
                .with_soft_delete(SoftDeleteMode::Include),
        );
        assert_eq!(db.dialect(), Dialect::Postgres);
        let (sql, _) = db.new_delete().table("logs").to_sql().unwrap();
        assert_eq!(sql, "DELETE FROM logs");
        assert_eq!(db.new_select().dialect(), Dialect::Postgres);
    }

    #[tokio::test]
    async fn slow_statements_time_out() {
        let db = Db::with_config(
            SlowClient {
                delay: Duration::from_millis(200),
            },
            DbConfig::new().with_query_timeout(Duration::from_millis(5)),
        );
        let err = db.query("SELECT 1", &[]).await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn fast_statements_pass_through() {
        let db = Db::with_config(
            SlowClient {
                delay: Duration::ZERO,
            },
            DbConfig::new().with_query_timeout(Duration::from_secs(5)),
        );
        let n: i64 = db
            .new_select()
            .table("t")
            .column_expr(db.expr().lit(1), "n")
            .fetch_scalar(&db)
            .await
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(db.execute("DELETE FROM t", &[]).await.unwrap(), 1);
    }
}
