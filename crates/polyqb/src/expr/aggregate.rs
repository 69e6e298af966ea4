//! Aggregate functions.
//!
//! `FILTER (WHERE ..)` is native on Postgres and SQLite. Elsewhere the filtered argument becomes
//! `CASE WHEN cond THEN arg END`, which aggregates ignore when NULL.

use crate::condition::ConditionBuilder;
use crate::dialect::Dialect;
use crate::dispatch::Dispatch;
use crate::error::OrmError;

use super::{Expr, ExprBuilder, IntoColumn, IntoExpr, WindowBuilder, t};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggFunc {
    Count,
    CountAll,
    Sum,
    Avg,
    Min,
    Max,
    /// Concatenate values with the given separator.
    StringAgg(String),
    JsonAgg,
}

impl AggFunc {
    fn op(&self) -> &'static str {
        match self {
            AggFunc::Count => "count",
            AggFunc::CountAll => "count_all",
            AggFunc::Sum => "sum",
            AggFunc::Avg => "avg",
            AggFunc::Min => "min",
            AggFunc::Max => "max",
            AggFunc::StringAgg(_) => "string_agg",
            AggFunc::JsonAgg => "json_agg",
        }
    }

    fn ordered(&self) -> bool {
        matches!(self, AggFunc::StringAgg(_) | AggFunc::JsonAgg)
    }
}

/// An aggregate call with optional `DISTINCT`, filter, ordering and window.
#[derive(Clone, Debug)]
#[must_use]
pub struct AggregateBuilder {
    dialect: Dialect,
    func: AggFunc,
    arg: Expr,
    distinct: bool,
    filter: Option<Expr>,
    order: Vec<(Expr, bool)>,
    over: Option<WindowBuilder>,
}

impl AggregateBuilder {
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Only aggregate rows matching the condition.
    pub fn filter(mut self, f: impl FnOnce(&mut ConditionBuilder)) -> Self {
        let mut cond = ConditionBuilder::new(self.dialect);
        f(&mut cond);
        self.filter = cond.into_expr();
        self
    }

    /// Ordering inside the aggregate (`string_agg`, `json_agg`).
    pub fn order_by(mut self, e: impl IntoColumn) -> Self {
        self.order.push((e.into_column(), false));
        self
    }

    pub fn order_by_desc(mut self, e: impl IntoColumn) -> Self {
        self.order.push((e.into_column(), true));
        self
    }

    /// Evaluate as a window aggregate.
    pub fn over(mut self, window: WindowBuilder) -> Self {
        self.over = Some(window);
        self
    }

    fn order_clause(&self) -> Option<Expr> {
        if self.order.is_empty() {
            return None;
        }
        let items = self.order.iter().map(|(e, desc)| {
            if *desc {
                t("? DESC", [e.clone()])
            } else {
                e.clone()
            }
        });
        Some(t("ORDER BY ?", [Expr::join(", ", items)]))
    }

    pub fn build(self) -> Expr {
        let dialect = self.dialect;
        if !self.order.is_empty() && !self.func.ordered() {
            return Expr::invalid(OrmError::validation(format!(
                "{} does not take an ORDER BY",
                self.func.op()
            )));
        }
        let native_filter = matches!(dialect, Dialect::Postgres | Dialect::Sqlite);

        let mut arg = match self.func {
            AggFunc::CountAll if self.filter.is_some() && !native_filter => Expr::raw("1"),
            _ => self.arg.clone(),
        };
        if let (Some(cond), false) = (&self.filter, native_filter) {
            arg = t("CASE WHEN ? THEN ? END", [cond.clone(), arg]);
        }
        let count_star = self.func == AggFunc::CountAll && (self.filter.is_none() || native_filter);
        let d = if self.distinct { "DISTINCT " } else { "" };
        let order = self.order_clause();

        let call = match &self.func {
            AggFunc::Count | AggFunc::CountAll if count_star => Expr::raw("COUNT(*)"),
            AggFunc::Count | AggFunc::CountAll => Expr::template(format!("COUNT({d}?)"), [arg]),
            AggFunc::Sum => Expr::template(format!("SUM({d}?)"), [arg]),
            AggFunc::Avg => Expr::template(format!("AVG({d}?)"), [arg]),
            AggFunc::Min => t("MIN(?)", [arg]),
            AggFunc::Max => t("MAX(?)", [arg]),
            AggFunc::StringAgg(sep) => self.string_agg(sep, d, arg, order),
            AggFunc::JsonAgg => self.json_agg(d, arg, order),
        };

        let mut out = call;
        if let (Some(cond), true) = (&self.filter, native_filter) {
            out = t("? FILTER (WHERE ?)", [out, cond.clone()]);
        }
        if let Some(window) = &self.over {
            out = t("? ?", [out, window.over_clause()]);
        }
        out
    }

    fn string_agg(&self, sep: &str, d: &str, arg: Expr, order: Option<Expr>) -> Expr {
        let sep = Expr::raw(self.dialect.string_literal(sep));
        let tail = order.clone().map(|o| t(" ?", [o]));
        let sep_then_order = Expr::join("", std::iter::once(sep.clone()).chain(tail.clone()));
        Dispatch::new("string_agg")
            .postgres(|| {
                Expr::template(
                    format!("STRING_AGG({d}?, ?)"),
                    [arg.clone(), sep_then_order.clone()],
                )
            })
            .mysql(|| {
                let inner = Expr::join("", std::iter::once(arg.clone()).chain(tail.clone()));
                Expr::template(format!("GROUP_CONCAT({d}? SEPARATOR ?)"), [inner, sep.clone()])
            })
            .sqlite(|| {
                if self.distinct {
                    return Expr::invalid(OrmError::validation(
                        "SQLite cannot combine DISTINCT with a string_agg separator",
                    ));
                }
                t("GROUP_CONCAT(?, ?)", [arg.clone(), sep_then_order.clone()])
            })
            .oracle(|| {
                Expr::template(
                    format!("LISTAGG({d}?, ?)?"),
                    [arg.clone(), sep.clone(), within_group(&order)],
                )
            })
            .sqlserver(|| {
                if self.distinct {
                    return Expr::invalid(OrmError::unsupported(
                        "string_agg_distinct",
                        Dialect::SqlServer,
                    ));
                }
                t("STRING_AGG(?, ?)?", [arg.clone(), sep.clone(), within_group(&order)])
            })
            .expr(self.dialect)
    }

    fn json_agg(&self, d: &str, arg: Expr, order: Option<Expr>) -> Expr {
        let inner = Expr::join("", std::iter::once(arg).chain(order.map(|o| t(" ?", [o]))));
        Dispatch::new("json_agg")
            .postgres(|| Expr::template(format!("JSONB_AGG({d}?)"), [inner.clone()]))
            .mysql(|| {
                if self.order.is_empty() {
                    Expr::template(format!("JSON_ARRAYAGG({d}?)"), [inner.clone()])
                } else {
                    Expr::invalid(OrmError::unsupported("json_agg_order_by", Dialect::MySql))
                }
            })
            .sqlite(|| Expr::template(format!("JSON_GROUP_ARRAY({d}?)"), [inner.clone()]))
            .oracle(|| Expr::template(format!("JSON_ARRAYAGG({d}?)"), [inner.clone()]))
            .expr(self.dialect)
    }
}

fn within_group(order: &Option<Expr>) -> Expr {
    match order {
        Some(o) => t(" WITHIN GROUP (?)", [o.clone()]),
        None => Expr::raw(""),
    }
}

impl From<AggregateBuilder> for Expr {
    fn from(agg: AggregateBuilder) -> Self {
        agg.build()
    }
}

impl IntoExpr for AggregateBuilder {
    fn into_expr(self) -> Expr {
        self.build()
    }
}

impl ExprBuilder {
    /// Start an aggregate call. `arg` is ignored for [`AggFunc::CountAll`].
    pub fn aggregate(&self, func: AggFunc, arg: impl IntoExpr) -> AggregateBuilder {
        AggregateBuilder {
            dialect: self.dialect,
            func,
            arg: arg.into_expr(),
            distinct: false,
            filter: None,
            order: Vec::new(),
            over: None,
        }
    }

    pub fn count(&self, e: impl IntoExpr) -> Expr {
        self.aggregate(AggFunc::Count, e).build()
    }

    pub fn count_all(&self) -> Expr {
        self.aggregate(AggFunc::CountAll, Expr::raw("*")).build()
    }

    pub fn count_distinct(&self, e: impl IntoExpr) -> Expr {
        self.aggregate(AggFunc::Count, e).distinct().build()
    }

    pub fn sum(&self, e: impl IntoExpr) -> Expr {
        self.aggregate(AggFunc::Sum, e).build()
    }

    pub fn avg(&self, e: impl IntoExpr) -> Expr {
        self.aggregate(AggFunc::Avg, e).build()
    }

    pub fn min(&self, e: impl IntoExpr) -> Expr {
        self.aggregate(AggFunc::Min, e).build()
    }

    pub fn max(&self, e: impl IntoExpr) -> Expr {
        self.aggregate(AggFunc::Max, e).build()
    }

    pub fn string_agg(&self, e: impl IntoExpr, separator: &str) -> Expr {
        self.aggregate(AggFunc::StringAgg(separator.to_string()), e)
            .build()
    }

    pub fn json_agg(&self, e: impl IntoExpr) -> Expr {
        self.aggregate(AggFunc::JsonAgg, e).build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::col;

    fn render(dialect: Dialect, e: Expr) -> String {
        e.to_sql(dialect).unwrap().0
    }

    #[test]
    fn filter_native_or_case() {
        for dialect in Dialect::ALL {
            let e = ExprBuilder::new(dialect)
                .aggregate(AggFunc::Sum, col("amount"))
                .filter(|c| {
                    c.eq("status", "paid");
                })
                .build();
            let sql = render(dialect, e);
            match dialect {
                Dialect::Postgres => assert_eq!(sql, "SUM(amount) FILTER (WHERE status = $1)"),
                Dialect::Sqlite => assert_eq!(sql, "SUM(amount) FILTER (WHERE status = ?)"),
                Dialect::MySql => assert_eq!(sql, "SUM(CASE WHEN status = ? THEN amount END)"),
                Dialect::Oracle => assert_eq!(sql, "SUM(CASE WHEN status = :1 THEN amount END)"),
                Dialect::SqlServer => {
                    assert_eq!(sql, "SUM(CASE WHEN status = @p1 THEN amount END)")
                }
            }
        }
    }

    #[test]
    fn filtered_count_all_counts_ones() {
        let e = ExprBuilder::new(Dialect::MySql)
            .aggregate(AggFunc::CountAll, Expr::raw("*"))
            .filter(|c| {
                c.is_not_null("email");
            })
            .build();
        assert_eq!(
            render(Dialect::MySql, e),
            "COUNT(CASE WHEN email IS NOT NULL THEN 1 END)"
        );
        assert_eq!(
            render(Dialect::Postgres, ExprBuilder::new(Dialect::Postgres).count_all()),
            "COUNT(*)"
        );
    }

    #[test]
    fn ordered_string_agg() {
        let agg = |d: Dialect| {
            ExprBuilder::new(d)
                .aggregate(AggFunc::StringAgg(", ".into()), col("name"))
                .order_by("name")
                .build()
        };
        assert_eq!(
            render(Dialect::Postgres, agg(Dialect::Postgres)),
            "STRING_AGG(name, ', ' ORDER BY name)"
        );
        assert_eq!(
            render(Dialect::MySql, agg(Dialect::MySql)),
            "GROUP_CONCAT(name ORDER BY name SEPARATOR ', ')"
        );
        assert_eq!(
            render(Dialect::Sqlite, agg(Dialect::Sqlite)),
            "GROUP_CONCAT(name, ', ' ORDER BY name)"
        );
        assert_eq!(
            render(Dialect::Oracle, agg(Dialect::Oracle)),
            "LISTAGG(name, ', ') WITHIN GROUP (ORDER BY name)"
        );
        assert_eq!(
            render(Dialect::SqlServer, agg(Dialect::SqlServer)),
            "STRING_AGG(name, ', ') WITHIN GROUP (ORDER BY name)"
        );
    }

    #[test]
    fn ordered_json_agg() {
        let agg = |d: Dialect| {
            ExprBuilder::new(d)
                .aggregate(AggFunc::JsonAgg, col("tag"))
                .order_by_desc("created_at")
                .build()
                .to_sql(d)
        };
        assert_eq!(
            agg(Dialect::Postgres).unwrap().0,
            "JSONB_AGG(tag ORDER BY created_at DESC)"
        );
        assert_eq!(
            agg(Dialect::Sqlite).unwrap().0,
            "JSON_GROUP_ARRAY(tag ORDER BY created_at DESC)"
        );
        assert_eq!(
            agg(Dialect::Oracle).unwrap().0,
            "JSON_ARRAYAGG(tag ORDER BY created_at DESC)"
        );
        assert!(matches!(
            agg(Dialect::MySql),
            Err(OrmError::UnsupportedDialect { op: "json_agg_order_by", .. })
        ));
        assert!(matches!(
            agg(Dialect::SqlServer),
            Err(OrmError::UnsupportedDialect { op: "json_agg", .. })
        ));
    }

    #[test]
    fn ordered_distinct_string_agg_binds_nothing() {
        let (sql, params) = ExprBuilder::new(Dialect::Postgres)
            .aggregate(AggFunc::StringAgg("|".into()), col("name"))
            .distinct()
            .order_by("name")
            .build()
            .to_sql(Dialect::Postgres)
            .unwrap();
        assert_eq!(sql, "STRING_AGG(DISTINCT name, '|' ORDER BY name)");
        assert!(params.is_empty());
    }

    #[test]
    fn separator_is_escaped() {
        let e = ExprBuilder::new(Dialect::Sqlite).string_agg(col("n"), "','");
        assert_eq!(render(Dialect::Sqlite, e), "GROUP_CONCAT(n, ''',''')");
    }

    #[test]
    fn window_aggregate() {
        let eb = ExprBuilder::new(Dialect::Postgres);
        let e = eb
            .aggregate(AggFunc::Sum, col("amount"))
            .over(eb.over().partition_by("account_id"))
            .build();
        assert_eq!(
            render(Dialect::Postgres, e),
            "SUM(amount) OVER (PARTITION BY account_id)"
        );
    }

    #[test]
    fn json_agg_missing_on_sqlserver() {
        let e = ExprBuilder::new(Dialect::SqlServer).json_agg(col("x"));
        assert!(e.to_sql(Dialect::SqlServer).unwrap_err().is_unsupported_dialect());
    }
}
