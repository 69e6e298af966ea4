//! Type conversion.

use crate::dispatch::Dispatch;

use super::{Expr, ExprBuilder, IntoExpr, t};

/// Target type of [`ExprBuilder::cast`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastType {
    Text,
    Integer,
    /// Precision and scale.
    Decimal(u8, u8),
    Float,
    Bool,
    Date,
    Time,
    Timestamp,
    Json,
}

impl ExprBuilder {
    /// Convert `e` to `ty` using the backend's own syntax.
    pub fn cast(&self, e: impl IntoExpr, ty: CastType) -> Expr {
        let e = e.into_expr();
        Dispatch::new("cast")
            .postgres(|| {
                let target = match ty {
                    CastType::Text => "TEXT".to_string(),
                    CastType::Integer => "BIGINT".to_string(),
                    CastType::Decimal(p, s) => format!("NUMERIC({p}, {s})"),
                    CastType::Float => "DOUBLE PRECISION".to_string(),
                    CastType::Bool => "BOOLEAN".to_string(),
                    CastType::Date => "DATE".to_string(),
                    CastType::Time => "TIME".to_string(),
                    CastType::Timestamp => "TIMESTAMP".to_string(),
                    CastType::Json => "JSONB".to_string(),
                };
                Expr::template(format!("(?)::{target}"), [e.clone()])
            })
            .mysql(|| match ty {
                CastType::Bool => t("(CAST(? AS SIGNED) <> 0)", [e.clone()]),
                other => {
                    let target = match other {
                        CastType::Text => "CHAR".to_string(),
                        CastType::Integer => "SIGNED".to_string(),
                        CastType::Decimal(p, s) => format!("DECIMAL({p}, {s})"),
                        CastType::Float => "DOUBLE".to_string(),
                        CastType::Date => "DATE".to_string(),
                        CastType::Time => "TIME".to_string(),
                        CastType::Json => "JSON".to_string(),
                        _ => "DATETIME".to_string(),
                    };
                    Expr::template(format!("CAST(? AS {target})"), [e.clone()])
                }
            })
            .sqlite(|| match ty {
                CastType::Text => t("CAST(? AS TEXT)", [e.clone()]),
                CastType::Integer => t("CAST(? AS INTEGER)", [e.clone()]),
                CastType::Decimal(_, s) => {
                    Expr::template(format!("ROUND(CAST(? AS REAL), {s})"), [e.clone()])
                }
                CastType::Float => t("CAST(? AS REAL)", [e.clone()]),
                CastType::Bool => t("(CAST(? AS INTEGER) <> 0)", [e.clone()]),
                CastType::Date => t("DATE(?)", [e.clone()]),
                CastType::Time => t("TIME(?)", [e.clone()]),
                CastType::Timestamp => t("DATETIME(?)", [e.clone()]),
                CastType::Json => t("JSON(?)", [e.clone()]),
            })
            .oracle(|| match ty {
                CastType::Text => t("TO_CHAR(?)", [e.clone()]),
                CastType::Integer => t("CAST(? AS NUMBER(19))", [e.clone()]),
                CastType::Decimal(p, s) => {
                    Expr::template(format!("CAST(? AS NUMBER({p}, {s}))"), [e.clone()])
                }
                CastType::Float => t("CAST(? AS BINARY_DOUBLE)", [e.clone()]),
                CastType::Bool => t("CASE WHEN ? <> 0 THEN 1 ELSE 0 END", [e.clone()]),
                CastType::Date => t("CAST(? AS DATE)", [e.clone()]),
                CastType::Time => t("TO_CHAR(?, 'HH24:MI:SS')", [e.clone()]),
                CastType::Timestamp => t("CAST(? AS TIMESTAMP)", [e.clone()]),
                CastType::Json => t("JSON(?)", [e.clone()]),
            })
            .sqlserver(|| {
                let target = match ty {
                    CastType::Text | CastType::Json => "NVARCHAR(MAX)".to_string(),
                    CastType::Integer => "BIGINT".to_string(),
                    CastType::Decimal(p, s) => format!("DECIMAL({p}, {s})"),
                    CastType::Float => "FLOAT".to_string(),
                    CastType::Bool => "BIT".to_string(),
                    CastType::Date => "DATE".to_string(),
                    CastType::Time => "TIME".to_string(),
                    CastType::Timestamp => "DATETIME2".to_string(),
                };
                Expr::template(format!("CAST(? AS {target})"), [e.clone()])
            })
            .expr(self.dialect)
    }
}
