//! Arithmetic, comparison and boolean logic.

use crate::dispatch::Dispatch;
use crate::error::{OrmError, OrmResult};
use crate::qb::SelectQb;

use super::{Expr, ExprBuilder, IntoExpr, t};

/// Normalize a comparison operator accepted by [`ExprBuilder::compare`] and ANY/ALL predicates.
pub(crate) fn comparison_op(op: &str) -> OrmResult<&'static str> {
    match op.trim() {
        "=" => Ok("="),
        "<>" | "!=" => Ok("<>"),
        "<" => Ok("<"),
        "<=" => Ok("<="),
        ">" => Ok(">"),
        ">=" => Ok(">="),
        other => Err(OrmError::validation(format!(
            "unknown comparison operator '{other}'"
        ))),
    }
}

impl ExprBuilder {
    pub fn add(&self, a: impl IntoExpr, b: impl IntoExpr) -> Expr {
        t("(? + ?)", [a.into_expr(), b.into_expr()])
    }

    pub fn sub(&self, a: impl IntoExpr, b: impl IntoExpr) -> Expr {
        t("(? - ?)", [a.into_expr(), b.into_expr()])
    }

    pub fn mul(&self, a: impl IntoExpr, b: impl IntoExpr) -> Expr {
        t("(? * ?)", [a.into_expr(), b.into_expr()])
    }

    /// Division that never truncates: both operands are cast to a floating type on backends where
    /// `int / int` is integer division.
    pub fn div(&self, a: impl IntoExpr, b: impl IntoExpr) -> Expr {
        let (a, b) = (a.into_expr(), b.into_expr());
        Dispatch::new("div")
            .postgres(|| {
                t(
                    "(CAST(? AS DOUBLE PRECISION) / CAST(? AS DOUBLE PRECISION))",
                    [a.clone(), b.clone()],
                )
            })
            .sqlite(|| t("(CAST(? AS REAL) / CAST(? AS REAL))", [a.clone(), b.clone()]))
            .sqlserver(|| t("(CAST(? AS FLOAT) / CAST(? AS FLOAT))", [a.clone(), b.clone()]))
            .default(|| t("(? / ?)", [a.clone(), b.clone()]))
            .expr(self.dialect)
    }

    pub fn modulo(&self, a: impl IntoExpr, b: impl IntoExpr) -> Expr {
        let (a, b) = (a.into_expr(), b.into_expr());
        Dispatch::new("modulo")
            .oracle(|| t("MOD(?, ?)", [a.clone(), b.clone()]))
            .default(|| t("(? % ?)", [a.clone(), b.clone()]))
            .expr(self.dialect)
    }

    pub fn neg(&self, a: impl IntoExpr) -> Expr {
        t("(-?)", [a.into_expr()])
    }

    /// `a <op> b` for one of `= <> != < <= > >=`.
    pub fn compare(&self, a: impl IntoExpr, op: &str, b: impl IntoExpr) -> Expr {
        let op = match comparison_op(op) {
            Ok(op) => op,
            Err(err) => return Expr::invalid(err),
        };
        Expr::template(format!("? {op} ?"), [a.into_expr(), b.into_expr()])
    }

    pub fn eq(&self, a: impl IntoExpr, b: impl IntoExpr) -> Expr {
        t("? = ?", [a.into_expr(), b.into_expr()])
    }

    pub fn ne(&self, a: impl IntoExpr, b: impl IntoExpr) -> Expr {
        t("? <> ?", [a.into_expr(), b.into_expr()])
    }

    pub fn gt(&self, a: impl IntoExpr, b: impl IntoExpr) -> Expr {
        t("? > ?", [a.into_expr(), b.into_expr()])
    }

    pub fn gte(&self, a: impl IntoExpr, b: impl IntoExpr) -> Expr {
        t("? >= ?", [a.into_expr(), b.into_expr()])
    }

    pub fn lt(&self, a: impl IntoExpr, b: impl IntoExpr) -> Expr {
        t("? < ?", [a.into_expr(), b.into_expr()])
    }

    pub fn lte(&self, a: impl IntoExpr, b: impl IntoExpr) -> Expr {
        t("? <= ?", [a.into_expr(), b.into_expr()])
    }

    pub fn between(&self, a: impl IntoExpr, low: impl IntoExpr, high: impl IntoExpr) -> Expr {
        t(
            "? BETWEEN ? AND ?",
            [a.into_expr(), low.into_expr(), high.into_expr()],
        )
    }

    pub fn not_between(&self, a: impl IntoExpr, low: impl IntoExpr, high: impl IntoExpr) -> Expr {
        t(
            "? NOT BETWEEN ? AND ?",
            [a.into_expr(), low.into_expr(), high.into_expr()],
        )
    }

    /// `a IN (..)`. An empty list is rejected instead of rendering `IN ()`.
    pub fn in_list<I, V>(&self, a: impl IntoExpr, values: I) -> Expr
    where
        I: IntoIterator<Item = V>,
        V: IntoExpr,
    {
        in_list(a.into_expr(), values, "IN")
    }

    /// `a NOT IN (..)`. An empty list is rejected.
    pub fn not_in_list<I, V>(&self, a: impl IntoExpr, values: I) -> Expr
    where
        I: IntoIterator<Item = V>,
        V: IntoExpr,
    {
        in_list(a.into_expr(), values, "NOT IN")
    }

    pub fn in_subquery(&self, a: impl IntoExpr, query: SelectQb) -> Expr {
        t("? IN ?", [a.into_expr(), Expr::subquery(query)])
    }

    pub fn not_in_subquery(&self, a: impl IntoExpr, query: SelectQb) -> Expr {
        t("? NOT IN ?", [a.into_expr(), Expr::subquery(query)])
    }

    pub fn is_null(&self, a: impl IntoExpr) -> Expr {
        t("? IS NULL", [a.into_expr()])
    }

    pub fn is_not_null(&self, a: impl IntoExpr) -> Expr {
        t("? IS NOT NULL", [a.into_expr()])
    }

    /// `IS TRUE`, or `= 1` on backends that store booleans as integers.
    pub fn is_true(&self, a: impl IntoExpr) -> Expr {
        let a = a.into_expr();
        if self.dialect.has_native_bool() {
            t("? IS TRUE", [a])
        } else {
            t("? = 1", [a])
        }
    }

    /// `IS FALSE`, or `= 0` on backends that store booleans as integers.
    pub fn is_false(&self, a: impl IntoExpr) -> Expr {
        let a = a.into_expr();
        if self.dialect.has_native_bool() {
            t("? IS FALSE", [a])
        } else {
            t("? = 0", [a])
        }
    }

    pub fn and(&self, a: impl IntoExpr, b: impl IntoExpr) -> Expr {
        t("(? AND ?)", [a.into_expr(), b.into_expr()])
    }

    pub fn or(&self, a: impl IntoExpr, b: impl IntoExpr) -> Expr {
        t("(? OR ?)", [a.into_expr(), b.into_expr()])
    }

    pub fn not(&self, a: impl IntoExpr) -> Expr {
        t("NOT (?)", [a.into_expr()])
    }

    pub fn exists(&self, query: SelectQb) -> Expr {
        t("EXISTS ?", [Expr::subquery(query)])
    }

    pub fn not_exists(&self, query: SelectQb) -> Expr {
        t("NOT EXISTS ?", [Expr::subquery(query)])
    }

    /// `a <op> ANY (subquery)`. SQLite has no quantified comparisons.
    pub fn compare_any(&self, a: impl IntoExpr, op: &str, query: SelectQb) -> Expr {
        self.quantified("compare_any", "ANY", a.into_expr(), op, query)
    }

    /// `a <op> ALL (subquery)`. SQLite has no quantified comparisons.
    pub fn compare_all(&self, a: impl IntoExpr, op: &str, query: SelectQb) -> Expr {
        self.quantified("compare_all", "ALL", a.into_expr(), op, query)
    }

    fn quantified(
        &self,
        name: &'static str,
        quantifier: &str,
        a: Expr,
        op: &str,
        query: SelectQb,
    ) -> Expr {
        let sub = Expr::subquery(query);
        let build = || match comparison_op(op) {
            Ok(op) => Expr::template(format!("? {op} {quantifier} ?"), [a.clone(), sub.clone()]),
            Err(err) => Expr::invalid(err),
        };
        Dispatch::new(name)
            .sqlite(|| Expr::invalid(OrmError::unsupported(name, self.dialect)))
            .default(build)
            .expr(self.dialect)
    }
}

fn in_list<I, V>(a: Expr, values: I, keyword: &str) -> Expr
where
    I: IntoIterator<Item = V>,
    V: IntoExpr,
{
    let values: Vec<Expr> = values.into_iter().map(IntoExpr::into_expr).collect();
    if values.is_empty() {
        return Expr::invalid(OrmError::validation(format!(
            "{keyword} requires at least one value"
        )));
    }
    let list = Expr::join(", ", values);
    Expr::template(format!("? {keyword} (?)"), [a, list])
}
