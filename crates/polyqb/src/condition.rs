//! Boolean condition trees for WHERE, HAVING, ON, MERGE guards and aggregate filters.
//!
//! A [`ConditionBuilder`] collects predicates in call order and joins them with `AND` (or `OR` inside an
//! [`or_group`](ConditionBuilder::or_group)). Groups with more than one member render parenthesized; empty
//! groups render nothing.
//!
//! ```ignore
//! qb.where_(|w| {
//!     w.eq("status", "active").or_group(|g| {
//!         g.gt("score", 90).is_null("banned_at");
//!     });
//! })
//! ```

use std::borrow::Cow;

use crate::dialect::Dialect;
use crate::expr::{Expr, ExprBuilder, IntoColumn, IntoExpr, LikePattern};
use crate::qb::SelectQb;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Joiner {
    And,
    Or,
}

/// Ordered predicate list.
#[derive(Clone, Debug)]
pub struct ConditionBuilder {
    dialect: Dialect,
    joiner: Joiner,
    items: Vec<Expr>,
}

impl ConditionBuilder {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            joiner: Joiner::And,
            items: Vec::new(),
        }
    }

    fn child(&self, joiner: Joiner) -> Self {
        Self {
            dialect: self.dialect,
            joiner,
            items: Vec::new(),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn eb(&self) -> ExprBuilder {
        ExprBuilder::new(self.dialect)
    }

    fn push(&mut self, e: Expr) -> &mut Self {
        self.items.push(e);
        self
    }

    pub fn eq(&mut self, column: impl IntoColumn, value: impl IntoExpr) -> &mut Self {
        let e = self.eb().eq(column.into_column(), value);
        self.push(e)
    }

    pub fn ne(&mut self, column: impl IntoColumn, value: impl IntoExpr) -> &mut Self {
        let e = self.eb().ne(column.into_column(), value);
        self.push(e)
    }

    pub fn gt(&mut self, column: impl IntoColumn, value: impl IntoExpr) -> &mut Self {
        let e = self.eb().gt(column.into_column(), value);
        self.push(e)
    }

    pub fn gte(&mut self, column: impl IntoColumn, value: impl IntoExpr) -> &mut Self {
        let e = self.eb().gte(column.into_column(), value);
        self.push(e)
    }

    pub fn lt(&mut self, column: impl IntoColumn, value: impl IntoExpr) -> &mut Self {
        let e = self.eb().lt(column.into_column(), value);
        self.push(e)
    }

    pub fn lte(&mut self, column: impl IntoColumn, value: impl IntoExpr) -> &mut Self {
        let e = self.eb().lte(column.into_column(), value);
        self.push(e)
    }

    pub fn between(
        &mut self,
        column: impl IntoColumn,
        low: impl IntoExpr,
        high: impl IntoExpr,
    ) -> &mut Self {
        let e = self.eb().between(column.into_column(), low, high);
        self.push(e)
    }

    pub fn not_between(
        &mut self,
        column: impl IntoColumn,
        low: impl IntoExpr,
        high: impl IntoExpr,
    ) -> &mut Self {
        let e = self.eb().not_between(column.into_column(), low, high);
        self.push(e)
    }

    /// `column IN (..)`. An empty list is a validation error at render time.
    pub fn in_list<I, V>(&mut self, column: impl IntoColumn, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: IntoExpr,
    {
        let e = self.eb().in_list(column.into_column(), values);
        self.push(e)
    }

    pub fn not_in_list<I, V>(&mut self, column: impl IntoColumn, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: IntoExpr,
    {
        let e = self.eb().not_in_list(column.into_column(), values);
        self.push(e)
    }

    pub fn in_subquery(&mut self, column: impl IntoColumn, query: SelectQb) -> &mut Self {
        let e = self.eb().in_subquery(column.into_column(), query);
        self.push(e)
    }

    pub fn not_in_subquery(&mut self, column: impl IntoColumn, query: SelectQb) -> &mut Self {
        let e = self.eb().not_in_subquery(column.into_column(), query);
        self.push(e)
    }

    pub fn is_null(&mut self, column: impl IntoColumn) -> &mut Self {
        let e = self.eb().is_null(column.into_column());
        self.push(e)
    }

    pub fn is_not_null(&mut self, column: impl IntoColumn) -> &mut Self {
        let e = self.eb().is_not_null(column.into_column());
        self.push(e)
    }

    pub fn is_true(&mut self, column: impl IntoColumn) -> &mut Self {
        let e = self.eb().is_true(column.into_column());
        self.push(e)
    }

    pub fn is_false(&mut self, column: impl IntoColumn) -> &mut Self {
        let e = self.eb().is_false(column.into_column());
        self.push(e)
    }

    /// `column LIKE pattern`, pattern used as given.
    pub fn like(&mut self, column: impl IntoColumn, pattern: impl IntoExpr) -> &mut Self {
        let e = self.eb().like(column.into_column(), pattern);
        self.push(e)
    }

    pub fn starts_with(&mut self, column: impl IntoColumn, pattern: impl Into<LikePattern>) -> &mut Self {
        let e = self.eb().starts_with(column.into_column(), pattern);
        self.push(e)
    }

    pub fn ends_with(&mut self, column: impl IntoColumn, pattern: impl Into<LikePattern>) -> &mut Self {
        let e = self.eb().ends_with(column.into_column(), pattern);
        self.push(e)
    }

    pub fn contains(&mut self, column: impl IntoColumn, pattern: impl Into<LikePattern>) -> &mut Self {
        let e = self.eb().contains(column.into_column(), pattern);
        self.push(e)
    }

    pub fn starts_with_ignore_case(
        &mut self,
        column: impl IntoColumn,
        pattern: impl Into<LikePattern>,
    ) -> &mut Self {
        let e = self.eb().starts_with_ignore_case(column.into_column(), pattern);
        self.push(e)
    }

    pub fn ends_with_ignore_case(
        &mut self,
        column: impl IntoColumn,
        pattern: impl Into<LikePattern>,
    ) -> &mut Self {
        let e = self.eb().ends_with_ignore_case(column.into_column(), pattern);
        self.push(e)
    }

    pub fn contains_ignore_case(
        &mut self,
        column: impl IntoColumn,
        pattern: impl Into<LikePattern>,
    ) -> &mut Self {
        let e = self.eb().contains_ignore_case(column.into_column(), pattern);
        self.push(e)
    }

    /// `EXISTS (subquery)`. Reference outer columns with dotted names to correlate.
    pub fn exists(&mut self, query: SelectQb) -> &mut Self {
        let e = self.eb().exists(query);
        self.push(e)
    }

    pub fn not_exists(&mut self, query: SelectQb) -> &mut Self {
        let e = self.eb().not_exists(query);
        self.push(e)
    }

    pub fn compare_any(&mut self, column: impl IntoColumn, op: &str, query: SelectQb) -> &mut Self {
        let e = self.eb().compare_any(column.into_column(), op, query);
        self.push(e)
    }

    pub fn compare_all(&mut self, column: impl IntoColumn, op: &str, query: SelectQb) -> &mut Self {
        let e = self.eb().compare_all(column.into_column(), op, query);
        self.push(e)
    }

    /// Any boolean expression.
    pub fn expr(&mut self, e: impl IntoExpr) -> &mut Self {
        self.push(e.into_expr())
    }

    /// Raw SQL predicate, emitted verbatim.
    pub fn raw(&mut self, sql: impl Into<Cow<'static, str>>) -> &mut Self {
        self.push(Expr::raw(sql))
    }

    pub fn and_group(&mut self, f: impl FnOnce(&mut ConditionBuilder)) -> &mut Self {
        self.group(Joiner::And, false, f)
    }

    pub fn or_group(&mut self, f: impl FnOnce(&mut ConditionBuilder)) -> &mut Self {
        self.group(Joiner::Or, false, f)
    }

    /// `NOT (..)` over an AND group.
    pub fn not_group(&mut self, f: impl FnOnce(&mut ConditionBuilder)) -> &mut Self {
        self.group(Joiner::And, true, f)
    }

    fn group(
        &mut self,
        joiner: Joiner,
        negate: bool,
        f: impl FnOnce(&mut ConditionBuilder),
    ) -> &mut Self {
        let mut child = self.child(joiner);
        f(&mut child);
        let single = child.items.len() == 1;
        let Some(inner) = child.into_expr() else {
            return self;
        };
        let e = match (negate, single) {
            (true, _) => Expr::template("NOT (?)", [inner]),
            (false, true) => inner,
            (false, false) => Expr::template("(?)", [inner]),
        };
        self.push(e)
    }

    /// The joined predicate, or `None` when nothing was added.
    pub fn into_expr(self) -> Option<Expr> {
        if self.items.is_empty() {
            return None;
        }
        let sep = match self.joiner {
            Joiner::And => " AND ",
            Joiner::Or => " OR ",
        };
        Some(Expr::join(sep, self.items))
    }

    /// Like [`into_expr`](Self::into_expr) without consuming the builder.
    pub(crate) fn to_expr(&self) -> Option<Expr> {
        self.clone().into_expr()
    }
}
