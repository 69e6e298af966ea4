//! Window functions and `OVER (..)` specifications.

use crate::dialect::Dialect;
use crate::dispatch::Dispatch;
use crate::error::{OrmError, OrmResult};

use super::{Expr, ExprBuilder, IntoColumn, IntoExpr, t};

/// Ranking and value functions usable with [`ExprBuilder::window`].
#[derive(Clone, Debug)]
pub enum WindowFunc {
    RowNumber,
    Rank,
    DenseRank,
    PercentRank,
    CumeDist,
    Ntile(u32),
    /// Expression, offset, optional default.
    Lag(Expr, u32, Option<Expr>),
    Lead(Expr, u32, Option<Expr>),
    FirstValue(Expr),
    LastValue(Expr),
    NthValue(Expr, u32),
}

impl WindowFunc {
    pub fn lag(e: impl IntoExpr) -> Self {
        WindowFunc::Lag(e.into_expr(), 1, None)
    }

    pub fn lead(e: impl IntoExpr) -> Self {
        WindowFunc::Lead(e.into_expr(), 1, None)
    }

    fn render(&self, dialect: Dialect) -> Expr {
        match self {
            WindowFunc::RowNumber => Expr::raw("ROW_NUMBER()"),
            WindowFunc::Rank => Expr::raw("RANK()"),
            WindowFunc::DenseRank => Expr::raw("DENSE_RANK()"),
            WindowFunc::PercentRank => Expr::raw("PERCENT_RANK()"),
            WindowFunc::CumeDist => Expr::raw("CUME_DIST()"),
            WindowFunc::Ntile(n) => Expr::raw(format!("NTILE({n})")),
            WindowFunc::Lag(e, offset, default) => shift("LAG", e, *offset, default.as_ref()),
            WindowFunc::Lead(e, offset, default) => shift("LEAD", e, *offset, default.as_ref()),
            WindowFunc::FirstValue(e) => t("FIRST_VALUE(?)", [e.clone()]),
            WindowFunc::LastValue(e) => t("LAST_VALUE(?)", [e.clone()]),
            WindowFunc::NthValue(e, n) => Dispatch::new("nth_value")
                .postgres(|| nth(e, *n))
                .mysql(|| nth(e, *n))
                .sqlite(|| nth(e, *n))
                .oracle(|| nth(e, *n))
                .expr(dialect),
        }
    }
}

fn shift(func: &str, e: &Expr, offset: u32, default: Option<&Expr>) -> Expr {
    match default {
        Some(d) => Expr::template(format!("{func}(?, {offset}, ?)"), [e.clone(), d.clone()]),
        None => Expr::template(format!("{func}(?, {offset})"), [e.clone()]),
    }
}

fn nth(e: &Expr, n: u32) -> Expr {
    Expr::template(format!("NTH_VALUE(?, {n})"), [e.clone()])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameMode {
    Rows,
    Range,
    Groups,
}

/// One end of a window frame. Offsets are inlined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameBound {
    UnboundedPreceding,
    Preceding(u32),
    CurrentRow,
    Following(u32),
    UnboundedFollowing,
}

impl FrameBound {
    /// Position relative to the current row, negative before it.
    fn position(self) -> i64 {
        match self {
            FrameBound::UnboundedPreceding => i64::MIN,
            FrameBound::Preceding(n) => -i64::from(n),
            FrameBound::CurrentRow => 0,
            FrameBound::Following(n) => i64::from(n),
            FrameBound::UnboundedFollowing => i64::MAX,
        }
    }

    fn has_offset(self) -> bool {
        matches!(self, FrameBound::Preceding(_) | FrameBound::Following(_))
    }

    fn sql(self) -> String {
        match self {
            FrameBound::UnboundedPreceding => "UNBOUNDED PRECEDING".to_string(),
            FrameBound::Preceding(n) => format!("{n} PRECEDING"),
            FrameBound::CurrentRow => "CURRENT ROW".to_string(),
            FrameBound::Following(n) => format!("{n} FOLLOWING"),
            FrameBound::UnboundedFollowing => "UNBOUNDED FOLLOWING".to_string(),
        }
    }
}

/// A window function call with its `OVER (..)` clause, or a bare window for
/// [`AggregateBuilder::over`](super::AggregateBuilder::over).
#[derive(Clone, Debug)]
#[must_use]
pub struct WindowBuilder {
    dialect: Dialect,
    func: Option<WindowFunc>,
    partition: Vec<Expr>,
    order: Vec<(Expr, bool)>,
    frame: Option<(FrameMode, FrameBound, FrameBound)>,
}

impl WindowBuilder {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            func: None,
            partition: Vec::new(),
            order: Vec::new(),
            frame: None,
        }
    }

    pub fn partition_by(mut self, e: impl IntoColumn) -> Self {
        self.partition.push(e.into_column());
        self
    }

    pub fn order_by(mut self, e: impl IntoColumn) -> Self {
        self.order.push((e.into_column(), false));
        self
    }

    pub fn order_by_desc(mut self, e: impl IntoColumn) -> Self {
        self.order.push((e.into_column(), true));
        self
    }

    pub fn rows(self, start: FrameBound, end: FrameBound) -> Self {
        self.frame(FrameMode::Rows, start, end)
    }

    pub fn range(self, start: FrameBound, end: FrameBound) -> Self {
        self.frame(FrameMode::Range, start, end)
    }

    /// Peer-group frames: Postgres, SQLite and Oracle only.
    pub fn groups(self, start: FrameBound, end: FrameBound) -> Self {
        self.frame(FrameMode::Groups, start, end)
    }

    fn frame(mut self, mode: FrameMode, start: FrameBound, end: FrameBound) -> Self {
        self.frame = Some((mode, start, end));
        self
    }

    fn frame_sql(&self) -> OrmResult<Option<String>> {
        let Some((mode, start, end)) = self.frame else {
            return Ok(None);
        };
        if start == FrameBound::UnboundedFollowing
            || end == FrameBound::UnboundedPreceding
            || start.position() > end.position()
        {
            return Err(OrmError::validation(format!(
                "invalid window frame: {} to {}",
                start.sql(),
                end.sql()
            )));
        }
        let keyword = match mode {
            FrameMode::Rows => "ROWS",
            FrameMode::Range => {
                if self.dialect == Dialect::SqlServer && (start.has_offset() || end.has_offset()) {
                    return Err(OrmError::unsupported("range_offset_frame", self.dialect));
                }
                "RANGE"
            }
            FrameMode::Groups => Dispatch::new("groups_frame")
                .postgres(|| "GROUPS")
                .sqlite(|| "GROUPS")
                .oracle(|| "GROUPS")
                .resolve(self.dialect)?,
        };
        Ok(Some(format!("{keyword} BETWEEN {} AND {}", start.sql(), end.sql())))
    }

    /// The `OVER (..)` clause alone.
    pub(crate) fn over_clause(&self) -> Expr {
        let frame = match self.frame_sql() {
            Ok(frame) => frame,
            Err(err) => return Expr::invalid(err),
        };
        let mut parts = Vec::new();
        if !self.partition.is_empty() {
            parts.push(t(
                "PARTITION BY ?",
                [Expr::join(", ", self.partition.iter().cloned())],
            ));
        }
        if !self.order.is_empty() {
            let items = self.order.iter().map(|(e, desc)| {
                if *desc {
                    t("? DESC", [e.clone()])
                } else {
                    e.clone()
                }
            });
            parts.push(t("ORDER BY ?", [Expr::join(", ", items)]));
        }
        if let Some(frame) = frame {
            parts.push(Expr::raw(frame));
        }
        t("OVER (?)", [Expr::join(" ", parts)])
    }

    pub fn build(self) -> Expr {
        let Some(func) = &self.func else {
            return Expr::invalid(OrmError::validation("window has no function"));
        };
        t("? ?", [func.render(self.dialect), self.over_clause()])
    }
}

impl From<WindowBuilder> for Expr {
    fn from(w: WindowBuilder) -> Self {
        w.build()
    }
}

impl IntoExpr for WindowBuilder {
    fn into_expr(self) -> Expr {
        self.build()
    }
}

impl ExprBuilder {
    /// Start a window function call.
    pub fn window(&self, func: WindowFunc) -> WindowBuilder {
        let mut w = WindowBuilder::new(self.dialect);
        w.func = Some(func);
        w
    }

    /// An empty window for use with aggregates.
    pub fn over(&self) -> WindowBuilder {
        WindowBuilder::new(self.dialect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::col;

    #[test]
    fn row_number_with_partition_and_order() {
        let eb = ExprBuilder::new(Dialect::Postgres);
        let e = eb
            .window(WindowFunc::RowNumber)
            .partition_by("dept")
            .order_by_desc("salary")
            .build();
        assert_eq!(
            e.to_sql(Dialect::Postgres).unwrap().0,
            "ROW_NUMBER() OVER (PARTITION BY dept ORDER BY salary DESC)"
        );
    }

    #[test]
    fn frame_offsets_are_inlined() {
        let eb = ExprBuilder::new(Dialect::MySql);
        let e = eb
            .window(WindowFunc::LastValue(col("x").into_expr()))
            .order_by("ts")
            .rows(FrameBound::Preceding(2), FrameBound::CurrentRow)
            .build();
        let (sql, params) = e.to_sql(Dialect::MySql).unwrap();
        assert_eq!(
            sql,
            "LAST_VALUE(x) OVER (ORDER BY ts ROWS BETWEEN 2 PRECEDING AND CURRENT ROW)"
        );
        assert!(params.is_empty());
    }

    #[test]
    fn frame_start_must_not_follow_end() {
        let frame = |start, end| {
            ExprBuilder::new(Dialect::Postgres)
                .window(WindowFunc::Rank)
                .order_by("ts")
                .rows(start, end)
                .build()
                .to_sql(Dialect::Postgres)
        };
        assert!(frame(FrameBound::Preceding(2), FrameBound::Preceding(5)).is_err());
        assert!(frame(FrameBound::Following(3), FrameBound::Following(1)).is_err());
        assert!(frame(FrameBound::CurrentRow, FrameBound::Preceding(1)).is_err());
        assert_eq!(
            frame(FrameBound::Preceding(5), FrameBound::Preceding(2)).unwrap().0,
            "RANK() OVER (ORDER BY ts ROWS BETWEEN 5 PRECEDING AND 2 PRECEDING)"
        );
        assert!(frame(FrameBound::Following(1), FrameBound::Following(3)).is_ok());
    }

    #[test]
    fn groups_only_where_supported() {
        for dialect in Dialect::ALL {
            let e = ExprBuilder::new(dialect)
                .window(WindowFunc::Rank)
                .order_by("score")
                .groups(FrameBound::UnboundedPreceding, FrameBound::CurrentRow)
                .build();
            let ok = e.to_sql(dialect).is_ok();
            let expected = matches!(dialect, Dialect::Postgres | Dialect::Sqlite | Dialect::Oracle);
            assert_eq!(ok, expected, "{dialect}");
        }
    }

    #[test]
    fn sqlserver_rejects_range_offsets_and_nth_value() {
        let eb = ExprBuilder::new(Dialect::SqlServer);
        let range = eb
            .window(WindowFunc::Rank)
            .order_by("score")
            .range(FrameBound::Preceding(1), FrameBound::CurrentRow)
            .build();
        assert!(range.to_sql(Dialect::SqlServer).unwrap_err().is_unsupported_dialect());

        let nth = eb
            .window(WindowFunc::NthValue(col("x").into_expr(), 2))
            .order_by("score")
            .build();
        assert!(nth.to_sql(Dialect::SqlServer).unwrap_err().is_unsupported_dialect());

        let unbounded = eb
            .window(WindowFunc::Rank)
            .order_by("score")
            .range(FrameBound::UnboundedPreceding, FrameBound::CurrentRow)
            .build();
        assert!(unbounded.to_sql(Dialect::SqlServer).is_ok());
    }

    #[test]
    fn inverted_frame_is_rejected() {
        let e = ExprBuilder::new(Dialect::Postgres)
            .window(WindowFunc::Rank)
            .rows(FrameBound::Following(1), FrameBound::Preceding(1))
            .build();
        assert!(matches!(
            e.to_sql(Dialect::Postgres),
            Err(OrmError::Validation(_))
        ));
    }

    #[test]
    fn lag_with_default() {
        let e = ExprBuilder::new(Dialect::Oracle)
            .window(WindowFunc::Lag(col("price").into_expr(), 1, Some(Expr::value(0))))
            .order_by("day")
            .build();
        assert_eq!(
            e.to_sql(Dialect::Oracle).unwrap().0,
            "LAG(price, 1, :1) OVER (ORDER BY day)"
        );
    }
}
