//! Statement builders.
//!
//! Every builder is an owned value for one dialect. Clause methods consume and return the builder;
//! [`SqlQb::to_sql`] renders without consuming it, and the execution methods consume it.
//!
//! ```ignore
//! use polyqb::prelude::*;
//!
//! let posts: Vec<Post> = SelectQb::new(Dialect::Postgres)
//!     .model::<Post>()
//!     .gt("view_count", 50)
//!     .order_by_desc("view_count")
//!     .limit(3)
//!     .fetch_all(&client)
//!     .await?;
//! ```

mod cte;
mod delete;
mod insert;
mod merge;
pub(crate) mod param;
mod select;
mod traits;
mod update;

#[cfg(test)]
mod tests;

use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::expr::{Expr, IntoExpr, Renderer, col};
use crate::ident::Ident;
use crate::model::TableMeta;

pub use delete::DeleteQb;
pub use insert::{InsertQb, OnConflictQb, OnConflictUpdateQb};
pub use merge::{MergeAction, MergeQb, MergeWhen};
pub use param::ParamList;
pub use select::SelectQb;
pub use traits::{MutationQb, SqlQb};
pub use update::UpdateQb;

/// Join flavour for [`SelectQb::join_subquery`] and [`SelectQb::join_model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl JoinKind {
    fn keyword(self, dialect: Dialect) -> OrmResult<&'static str> {
        match self {
            JoinKind::Inner => Ok("INNER JOIN"),
            JoinKind::Left => Ok("LEFT JOIN"),
            JoinKind::Right => Ok("RIGHT JOIN"),
            JoinKind::Full if dialect == Dialect::MySql => {
                Err(OrmError::unsupported("full_join", dialect))
            }
            JoinKind::Full => Ok("FULL OUTER JOIN"),
            JoinKind::Cross => Ok("CROSS JOIN"),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

/// Placement of NULLs in a sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nulls {
    First,
    Last,
}

/// Behaviour when a locked row is encountered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LockWait {
    #[default]
    Wait,
    NoWait,
    SkipLocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LockMode {
    Update,
    Share,
}

/// Compound query operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOp {
    Union,
    UnionAll,
    Intersect,
    IntersectAll,
    Except,
    ExceptAll,
}

impl SetOp {
    fn keyword(self, dialect: Dialect) -> OrmResult<&'static str> {
        let all_supported = matches!(dialect, Dialect::Postgres | Dialect::MySql);
        match self {
            SetOp::Union => Ok("UNION"),
            SetOp::UnionAll => Ok("UNION ALL"),
            SetOp::Intersect => Ok("INTERSECT"),
            SetOp::IntersectAll if all_supported => Ok("INTERSECT ALL"),
            SetOp::IntersectAll => Err(OrmError::unsupported("intersect_all", dialect)),
            SetOp::Except if dialect == Dialect::Oracle => Ok("MINUS"),
            SetOp::Except => Ok("EXCEPT"),
            SetOp::ExceptAll if all_supported => Ok("EXCEPT ALL"),
            SetOp::ExceptAll => Err(OrmError::unsupported("except_all", dialect)),
        }
    }
}

/// Page-based pagination. Pages are 1-based; page 0 is treated as page 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub per_page: u64,
}

impl Pagination {
    pub fn new(page: u64, per_page: u64) -> Self {
        Self { page, per_page }
    }

    pub fn limit(&self) -> u64 {
        self.per_page
    }

    pub fn offset(&self) -> u64 {
        self.page.max(1).saturating_sub(1).saturating_mul(self.per_page)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
        }
    }
}

/// One `ORDER BY` item.
#[derive(Debug, Clone)]
pub(crate) struct OrderItem {
    expr: Expr,
    order: Order,
    nulls: Option<Nulls>,
}

impl OrderItem {
    pub(crate) fn new(expr: Expr, order: Order, nulls: Option<Nulls>) -> Self {
        Self { expr, order, nulls }
    }

    /// Render the item. MySQL and SQL Server have no `NULLS FIRST/LAST`, so a `CASE` sort key is
    /// emitted ahead of the expression.
    fn render(&self, r: &mut Renderer) -> OrmResult<()> {
        let dir = match self.order {
            Order::Asc => "",
            Order::Desc => " DESC",
        };
        let Some(nulls) = self.nulls else {
            r.push_expr(&self.expr)?;
            r.push(dir);
            return Ok(());
        };
        match r.dialect() {
            Dialect::MySql | Dialect::SqlServer => {
                let key = match nulls {
                    Nulls::First => "CASE WHEN ? IS NULL THEN 0 ELSE 1 END, ",
                    Nulls::Last => "CASE WHEN ? IS NULL THEN 1 ELSE 0 END, ",
                };
                r.push_expr(&Expr::template(key, [self.expr.clone()]))?;
                r.push_expr(&self.expr)?;
                r.push(dir);
            }
            Dialect::Postgres | Dialect::Sqlite | Dialect::Oracle => {
                r.push_expr(&self.expr)?;
                r.push(dir);
                r.push(match nulls {
                    Nulls::First => " NULLS FIRST",
                    Nulls::Last => " NULLS LAST",
                });
            }
        }
        Ok(())
    }
}

pub(crate) fn render_order(items: &[OrderItem], r: &mut Renderer) -> OrmResult<()> {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            r.push(", ");
        }
        item.render(r)?;
    }
    Ok(())
}

/// Split `"name"`, `"name alias"` or `"name AS alias"` into identifiers.
pub(crate) fn parse_table(s: &str) -> OrmResult<(Ident, Option<Ident>)> {
    let parts: Vec<&str> = s.split_whitespace().collect();
    match parts.as_slice() {
        [name] => Ok((Ident::parse(name)?, None)),
        [name, alias] => Ok((Ident::parse(name)?, Some(Ident::parse(alias)?))),
        [name, kw, alias] if kw.eq_ignore_ascii_case("as") => {
            Ok((Ident::parse(name)?, Some(Ident::parse(alias)?)))
        }
        _ => Err(OrmError::validation(format!("invalid table reference {s:?}"))),
    }
}

/// Table identifier and the alias rendered after it for a model. No alias is rendered when it
/// equals the table name.
pub(crate) fn model_table(meta: &TableMeta) -> OrmResult<(Ident, Option<Ident>)> {
    let name = Ident::parse(meta.name())?;
    let alias = if meta.alias() == meta.name() {
        None
    } else {
        Some(Ident::parse(meta.alias())?)
    };
    Ok((name, alias))
}

/// `RETURNING` / `OUTPUT` column list. Validated when added.
#[derive(Debug, Clone, Default)]
pub(crate) struct Returning {
    columns: Vec<String>,
}

impl Returning {
    pub(crate) fn push(&mut self, column: &str) -> OrmResult<()> {
        if let Some(err) = col(column).into_expr().error() {
            return Err(err.clone());
        }
        self.columns.push(column.to_string());
        Ok(())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// SQL Server `OUTPUT` clause, placed before the statement's source or `WHERE`.
    pub(crate) fn render_output(&self, pseudo: &str, r: &mut Renderer) -> OrmResult<()> {
        if self.is_empty() || r.dialect() != Dialect::SqlServer {
            return Ok(());
        }
        let cols = self
            .columns
            .iter()
            .map(|c| col(&format!("{pseudo}.{c}")).unqualified().into_expr());
        r.push(" OUTPUT ");
        r.push_expr(&Expr::join(", ", cols))
    }

    /// Trailing `RETURNING` clause on Postgres and SQLite. SQL Server is handled by
    /// [`render_output`](Self::render_output); MySQL and Oracle fail.
    pub(crate) fn render_returning(&self, r: &mut Renderer) -> OrmResult<()> {
        if self.is_empty() {
            return Ok(());
        }
        match r.dialect() {
            Dialect::Postgres | Dialect::Sqlite => {
                let cols = self.columns.iter().map(|c| col(c).unqualified().into_expr());
                r.push(" RETURNING ");
                r.push_expr(&Expr::join(", ", cols))
            }
            Dialect::SqlServer => Ok(()),
            d @ (Dialect::MySql | Dialect::Oracle) => Err(OrmError::unsupported("returning", d)),
        }
    }
}

/// Keep the first construction error.
pub(crate) fn record(slot: &mut Option<OrmError>, err: OrmError) {
    if slot.is_none() {
        *slot = Some(err);
    }
}

/// Filtering shortcuts shared by builders with a `conditions: ConditionBuilder` field and a
/// `build_error` slot.
macro_rules! impl_where_shortcuts {
    ($ty:ty) => {
        impl $ty {
            /// Add predicates through a [`ConditionBuilder`](crate::ConditionBuilder).
            pub fn where_(mut self, f: impl FnOnce(&mut crate::condition::ConditionBuilder)) -> Self {
                f(&mut self.conditions);
                self
            }

            pub fn eq(
                mut self,
                column: impl crate::expr::IntoColumn,
                value: impl crate::expr::IntoExpr,
            ) -> Self {
                self.conditions.eq(column, value);
                self
            }

            pub fn ne(
                mut self,
                column: impl crate::expr::IntoColumn,
                value: impl crate::expr::IntoExpr,
            ) -> Self {
                self.conditions.ne(column, value);
                self
            }

            pub fn gt(
                mut self,
                column: impl crate::expr::IntoColumn,
                value: impl crate::expr::IntoExpr,
            ) -> Self {
                self.conditions.gt(column, value);
                self
            }

            pub fn gte(
                mut self,
                column: impl crate::expr::IntoColumn,
                value: impl crate::expr::IntoExpr,
            ) -> Self {
                self.conditions.gte(column, value);
                self
            }

            pub fn lt(
                mut self,
                column: impl crate::expr::IntoColumn,
                value: impl crate::expr::IntoExpr,
            ) -> Self {
                self.conditions.lt(column, value);
                self
            }

            pub fn lte(
                mut self,
                column: impl crate::expr::IntoColumn,
                value: impl crate::expr::IntoExpr,
            ) -> Self {
                self.conditions.lte(column, value);
                self
            }

            pub fn in_list<I, V>(mut self, column: impl crate::expr::IntoColumn, values: I) -> Self
            where
                I: IntoIterator<Item = V>,
                V: crate::expr::IntoExpr,
            {
                self.conditions.in_list(column, values);
                self
            }

            pub fn is_null(mut self, column: impl crate::expr::IntoColumn) -> Self {
                self.conditions.is_null(column);
                self
            }

            pub fn is_not_null(mut self, column: impl crate::expr::IntoColumn) -> Self {
                self.conditions.is_not_null(column);
                self
            }

            /// Match one primary key of the bound model.
            pub fn where_pk(mut self, key: impl Into<crate::model::PkInput>) -> Self {
                let predicate = match self.meta {
                    Some(meta) => meta.pk_predicate(self.dialect, key.into()),
                    None => Err(crate::error::OrmError::validation(
                        "where_pk requires a model",
                    )),
                };
                match predicate {
                    Ok(e) => {
                        self.conditions.expr(e);
                    }
                    Err(err) => crate::qb::record(&mut self.build_error, err),
                }
                self
            }

            /// Match any of `keys`. An empty list matches no rows.
            pub fn where_pk_in<I, K>(mut self, keys: I) -> Self
            where
                I: IntoIterator<Item = K>,
                K: Into<crate::model::PkInput>,
            {
                let keys = keys.into_iter().map(Into::into).collect();
                let predicate = match self.meta {
                    Some(meta) => meta.pk_in_predicate(self.dialect, keys),
                    None => Err(crate::error::OrmError::validation(
                        "where_pk_in requires a model",
                    )),
                };
                match predicate {
                    Ok(e) => {
                        self.conditions.expr(e);
                    }
                    Err(err) => crate::qb::record(&mut self.build_error, err),
                }
                self
            }

            /// Bind the identifier used by [`col_param(key)`](crate::col_param) references.
            pub fn bind_ident(mut self, key: &str, name: &str) -> Self {
                match crate::ident::Ident::parse(name) {
                    Ok(ident) => {
                        self.named.insert(key.to_string(), ident);
                    }
                    Err(err) => crate::qb::record(&mut self.build_error, err),
                }
                self
            }

            /// The expression factory for this builder's dialect.
            pub fn expr_builder(&self) -> crate::expr::ExprBuilder {
                crate::expr::ExprBuilder::new(self.dialect)
            }
        }
    };
}

pub(crate) use impl_where_shortcuts;

/// `a = ?` list for `SET` clauses.
pub(crate) fn render_assignments(sets: &[(Ident, Expr)], r: &mut Renderer) -> OrmResult<()> {
    for (i, (column, value)) in sets.iter().enumerate() {
        if i > 0 {
            r.push(", ");
        }
        r.push_ident(column);
        r.push(" = ");
        r.push_expr(value)?;
    }
    Ok(())
}

/// Convert a row count to a bindable integer.
pub(crate) fn count_value(n: u64) -> OrmResult<Expr> {
    i64::try_from(n)
        .map(|n| n.into_expr())
        .map_err(|_| OrmError::validation(format!("row count {n} out of range")))
}
