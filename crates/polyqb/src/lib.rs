//! # polyqb
//!
//! A cross-dialect SQL expression and query builder.
//!
//! One builder API renders correct SQL for PostgreSQL, MySQL, SQLite, Oracle and SQL Server.
//!
//! ## Features
//!
//! - **Dialect-aware fragments**: [`ExprBuilder`] emits the right spelling per backend (JSON access,
//!   date arithmetic, string functions, aggregates, window functions)
//! - **Statement builders**: SELECT, INSERT (with upserts), UPDATE, DELETE and MERGE
//! - **Parameters are always bound**: values never reach the SQL text; placeholders follow the dialect
//!   (`$1`, `?`, `:1`, `@p1`)
//! - **Safe defaults**: DELETE without conditions matches nothing, UPDATE requires SET, soft-deleted rows
//!   are hidden
//! - **Explicit unsupported paths**: a construct a dialect cannot express fails with
//!   [`OrmError::UnsupportedDialect`] instead of producing invalid SQL
//! - **Model metadata**: `#[derive(Model)]` describes a table, its alias, keys and soft-delete column
//!
//! ## Query Builder (qb)
//!
//! ```ignore
//! use polyqb::prelude::*;
//!
//! let db = Db::new(client);
//!
//! // SELECT
//! let posts: Vec<Post> = db
//!     .new_select()
//!     .model::<Post>()
//!     .gt("view_count", 50)
//!     .order_by_desc("view_count")
//!     .limit(3)
//!     .fetch_all(&db)
//!     .await?;
//!
//! // INSERT .. ON CONFLICT
//! db.new_insert()
//!     .model::<Post>()
//!     .set("id", 7)
//!     .set("title", "hello")
//!     .on_conflict(["id"])
//!     .do_update()
//!     .set_excluded("title")
//!     .finish()
//!     .execute(&db)
//!     .await?;
//!
//! // Render without executing
//! let (sql, params) = SelectQb::new(Dialect::SqlServer)
//!     .table("posts")
//!     .limit(3)
//!     .to_sql()?;
//! ```

pub mod client;
pub mod condition;
pub mod config;
pub mod db;
pub mod dialect;
pub mod dispatch;
pub mod error;
pub mod expr;
pub mod ident;
pub mod model;
pub mod pg;
pub mod prelude;
pub mod qb;
pub mod row;
pub mod value;

pub use client::GenericClient;
pub use condition::ConditionBuilder;
pub use config::{DbConfig, SqlLogConfig, SqlLogLevel};
pub use db::{Db, StatementKind};
pub use dialect::Dialect;
pub use dispatch::Dispatch;
pub use error::{DriverError, ErrorKind, OrmError, OrmResult, classify_error};
pub use expr::{
    AggFunc, AggregateBuilder, CaseBuilder, CastType, ColumnRef, DatePart, Expr, ExprBuilder,
    FrameBound, FrameMode, IntoColumn, IntoExpr, JsonArg, JsonPath, LikePattern, Renderer,
    WindowBuilder, WindowFunc, col, col_param,
};
pub use ident::{Ident, IdentPart, IntoIdent};
pub use model::{ColumnMeta, Model, PkInput, PrimaryKeyField, SoftDeleteMode, TableMeta};
pub use row::{FromRow, Row};
pub use value::{FromValue, Value};

// Re-export qb module for easy access
pub use qb::{
    DeleteQb, InsertQb, JoinKind, LockWait, MergeAction, MergeQb, MergeWhen, MutationQb, Nulls,
    OnConflictQb, OnConflictUpdateQb, Order, Pagination, SelectQb, SetOp, SqlQb, UpdateQb,
};

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(feature = "pool")]
pub use pool::{
    create_pool, create_pool_with_config, create_pool_with_manager_config, create_pool_with_tls,
};

#[cfg(feature = "derive")]
pub use polyqb_derive::{FromRow, Model};
