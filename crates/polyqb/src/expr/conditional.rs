//! CASE and NULL handling.

use super::{Expr, ExprBuilder, IntoExpr, t};

/// Searched `CASE WHEN .. THEN .. [ELSE ..] END`.
#[derive(Clone, Debug, Default)]
#[must_use]
pub struct CaseBuilder {
    branches: Vec<(Expr, Expr)>,
    otherwise: Option<Expr>,
}

impl CaseBuilder {
    pub fn when(mut self, cond: impl IntoExpr, then: impl IntoExpr) -> Self {
        self.branches.push((cond.into_expr(), then.into_expr()));
        self
    }

    pub fn else_(mut self, value: impl IntoExpr) -> Self {
        self.otherwise = Some(value.into_expr());
        self
    }

    pub fn build(self) -> Expr {
        if self.branches.is_empty() {
            return self.otherwise.unwrap_or_else(Expr::null);
        }
        let mut sql = String::from("CASE");
        let mut args = Vec::with_capacity(self.branches.len() * 2 + 1);
        for (cond, then) in self.branches {
            sql.push_str(" WHEN ? THEN ?");
            args.push(cond);
            args.push(then);
        }
        if let Some(otherwise) = self.otherwise {
            sql.push_str(" ELSE ?");
            args.push(otherwise);
        }
        sql.push_str(" END");
        Expr::template(sql, args)
    }
}

impl From<CaseBuilder> for Expr {
    fn from(case: CaseBuilder) -> Self {
        case.build()
    }
}

impl IntoExpr for CaseBuilder {
    fn into_expr(self) -> Expr {
        self.build()
    }
}

impl ExprBuilder {
    pub fn case_when(&self) -> CaseBuilder {
        CaseBuilder::default()
    }

    /// `CASE WHEN cond THEN a ELSE b END`.
    pub fn if_else(&self, cond: impl IntoExpr, a: impl IntoExpr, b: impl IntoExpr) -> Expr {
        self.case_when().when(cond, a).else_(b).build()
    }

    pub fn coalesce<I, V>(&self, values: I) -> Expr
    where
        I: IntoIterator<Item = V>,
        V: IntoExpr,
    {
        let values = values.into_iter().map(IntoExpr::into_expr);
        t("COALESCE(?)", [Expr::join(", ", values)])
    }

    pub fn nullif(&self, a: impl IntoExpr, b: impl IntoExpr) -> Expr {
        t("NULLIF(?, ?)", [a.into_expr(), b.into_expr()])
    }
}
