//! Numeric functions.

use crate::dispatch::Dispatch;

use super::{Expr, ExprBuilder, IntoExpr, t};

impl ExprBuilder {
    pub fn abs(&self, n: impl IntoExpr) -> Expr {
        t("ABS(?)", [n.into_expr()])
    }

    /// Smallest integer not less than `n`. SQLite builds it from an integer cast.
    pub fn ceil(&self, n: impl IntoExpr) -> Expr {
        let n = n.into_expr();
        Dispatch::new("ceil")
            .sqlite(|| {
                t(
                    "(CAST(? AS INTEGER) + (? > CAST(? AS INTEGER)))",
                    [n.clone(), n.clone(), n.clone()],
                )
            })
            .sqlserver(|| t("CEILING(?)", [n.clone()]))
            .default(|| t("CEIL(?)", [n.clone()]))
            .expr(self.dialect)
    }

    /// Largest integer not greater than `n`.
    pub fn floor(&self, n: impl IntoExpr) -> Expr {
        let n = n.into_expr();
        Dispatch::new("floor")
            .sqlite(|| {
                t(
                    "(CAST(? AS INTEGER) - (? < CAST(? AS INTEGER)))",
                    [n.clone(), n.clone(), n.clone()],
                )
            })
            .default(|| t("FLOOR(?)", [n.clone()]))
            .expr(self.dialect)
    }

    pub fn round(&self, n: impl IntoExpr, digits: i32) -> Expr {
        Expr::template(format!("ROUND(?, {digits})"), [n.into_expr()])
    }

    pub fn power(&self, base: impl IntoExpr, exp: impl IntoExpr) -> Expr {
        t("POWER(?, ?)", [base.into_expr(), exp.into_expr()])
    }

    pub fn sqrt(&self, n: impl IntoExpr) -> Expr {
        t("SQRT(?)", [n.into_expr()])
    }

    pub fn sign(&self, n: impl IntoExpr) -> Expr {
        t("SIGN(?)", [n.into_expr()])
    }

    /// Largest of the arguments. SQLite's multi-argument `MAX` is the scalar form.
    pub fn greatest<I, V>(&self, values: I) -> Expr
    where
        I: IntoIterator<Item = V>,
        V: IntoExpr,
    {
        self.extreme("greatest", values.into_iter().map(IntoExpr::into_expr).collect(), true)
    }

    /// Smallest of the arguments.
    pub fn least<I, V>(&self, values: I) -> Expr
    where
        I: IntoIterator<Item = V>,
        V: IntoExpr,
    {
        self.extreme("least", values.into_iter().map(IntoExpr::into_expr).collect(), false)
    }

    fn extreme(&self, op: &'static str, values: Vec<Expr>, max: bool) -> Expr {
        let (native, sqlite, agg) = if max {
            ("GREATEST", "MAX", "MAX")
        } else {
            ("LEAST", "MIN", "MIN")
        };
        Dispatch::new(op)
            .sqlite(|| Expr::template(format!("{sqlite}(?)"), [Expr::join(", ", values.clone())]))
            .sqlserver(|| {
                let rows = values
                    .iter()
                    .map(|v| t("(?)", [v.clone()]))
                    .collect::<Vec<_>>();
                Expr::template(
                    format!("(SELECT {agg}(v) FROM (VALUES ?) AS x(v))"),
                    [Expr::join(", ", rows)],
                )
            })
            .default(|| Expr::template(format!("{native}(?)"), [Expr::join(", ", values.clone())]))
            .expr(self.dialect)
    }

    /// A uniformly distributed value in `[0, 1)`.
    pub fn random(&self) -> Expr {
        Dispatch::new("random")
            .postgres(|| Expr::raw("RANDOM()"))
            .sqlite(|| Expr::raw("(ABS(RANDOM()) / 9223372036854775808.0)"))
            .oracle(|| Expr::raw("DBMS_RANDOM.VALUE"))
            .default(|| Expr::raw("RAND()"))
            .expr(self.dialect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::expr::col;

    #[test]
    fn ceil_emulated_on_sqlite() {
        let eb = ExprBuilder::new(Dialect::Sqlite);
        assert_eq!(
            eb.ceil(col("x")).to_sql(Dialect::Sqlite).unwrap().0,
            "(CAST(x AS INTEGER) + (x > CAST(x AS INTEGER)))"
        );
        let eb = ExprBuilder::new(Dialect::SqlServer);
        assert_eq!(eb.ceil(col("x")).to_sql(Dialect::SqlServer).unwrap().0, "CEILING(x)");
    }

    #[test]
    fn greatest_variants() {
        let pg = ExprBuilder::new(Dialect::Postgres);
        assert_eq!(
            pg.greatest([col("a"), col("b")]).to_sql(Dialect::Postgres).unwrap().0,
            "GREATEST(a, b)"
        );
        let lite = ExprBuilder::new(Dialect::Sqlite);
        assert_eq!(
            lite.least([col("a"), col("b")]).to_sql(Dialect::Sqlite).unwrap().0,
            "MIN(a, b)"
        );
        let ms = ExprBuilder::new(Dialect::SqlServer);
        assert_eq!(
            ms.greatest([col("a"), col("b")]).to_sql(Dialect::SqlServer).unwrap().0,
            "(SELECT MAX(v) FROM (VALUES (a), (b)) AS x(v))"
        );
    }
}
