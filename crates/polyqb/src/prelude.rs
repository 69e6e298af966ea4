//! Convenient imports for typical `polyqb` usage.
//!
//! ```ignore
//! use polyqb::prelude::*;
//! ```

pub use crate::{
    ConditionBuilder, Db, DbConfig, Dialect, Expr, ExprBuilder, FromRow, GenericClient, Model,
    MutationQb, OrmError, OrmResult, Row, SelectQb, SoftDeleteMode, SqlQb, Value, col,
};
pub use crate::{DeleteQb, InsertQb, MergeAction, MergeQb, Nulls, Order, UpdateQb};

#[cfg(feature = "pool")]
pub use crate::{create_pool, create_pool_with_config};
