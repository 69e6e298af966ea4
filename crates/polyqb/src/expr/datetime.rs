//! Date and time functions.
//!
//! Each backend is handled with the primitives it actually has: SQLite stores timestamps as text and
//! measures spans with `JULIANDAY`, Oracle adds months with `ADD_MONTHS`, SQL Server uses `DATEADD` and
//! `DATEDIFF`.

use crate::dispatch::Dispatch;

use super::cast::CastType;
use super::{Expr, ExprBuilder, IntoExpr, t};

/// A calendar unit for extraction, truncation, intervals and differences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePart {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl DatePart {
    fn keyword(self) -> &'static str {
        match self {
            DatePart::Year => "YEAR",
            DatePart::Month => "MONTH",
            DatePart::Day => "DAY",
            DatePart::Hour => "HOUR",
            DatePart::Minute => "MINUTE",
            DatePart::Second => "SECOND",
        }
    }

    fn strftime(self) -> &'static str {
        match self {
            DatePart::Year => "%Y",
            DatePart::Month => "%m",
            DatePart::Day => "%d",
            DatePart::Hour => "%H",
            DatePart::Minute => "%M",
            DatePart::Second => "%S",
        }
    }

    fn sqlite_modifier(self) -> &'static str {
        match self {
            DatePart::Year => "years",
            DatePart::Month => "months",
            DatePart::Day => "days",
            DatePart::Hour => "hours",
            DatePart::Minute => "minutes",
            DatePart::Second => "seconds",
        }
    }

    /// Seconds per unit for the fixed-length units.
    fn seconds(self) -> Option<i64> {
        match self {
            DatePart::Day => Some(86_400),
            DatePart::Hour => Some(3_600),
            DatePart::Minute => Some(60),
            DatePart::Second => Some(1),
            DatePart::Year | DatePart::Month => None,
        }
    }
}

impl ExprBuilder {
    pub fn now(&self) -> Expr {
        Dispatch::new("now")
            .oracle(|| Expr::raw("SYSTIMESTAMP"))
            .sqlserver(|| Expr::raw("SYSDATETIME()"))
            .default(|| Expr::raw("CURRENT_TIMESTAMP"))
            .expr(self.dialect)
    }

    pub fn current_date(&self) -> Expr {
        Dispatch::new("current_date")
            .sqlite(|| Expr::raw("DATE('now')"))
            .oracle(|| Expr::raw("TRUNC(SYSDATE)"))
            .sqlserver(|| Expr::raw("CAST(GETDATE() AS DATE)"))
            .default(|| Expr::raw("CURRENT_DATE"))
            .expr(self.dialect)
    }

    /// Extract an integer calendar field.
    pub fn extract(&self, part: DatePart, d: impl IntoExpr) -> Expr {
        let d = d.into_expr();
        let kw = part.keyword();
        Dispatch::new("extract")
            .postgres(|| {
                Expr::template(format!("CAST(EXTRACT({kw} FROM ?) AS INTEGER)"), [d.clone()])
            })
            .sqlite(|| {
                Expr::template(
                    format!("CAST(STRFTIME('{}', ?) AS INTEGER)", part.strftime()),
                    [d.clone()],
                )
            })
            .oracle(|| match part {
                DatePart::Year | DatePart::Month | DatePart::Day => {
                    Expr::template(format!("EXTRACT({kw} FROM ?)"), [d.clone()])
                }
                _ => Expr::template(
                    format!("TRUNC(EXTRACT({kw} FROM CAST(? AS TIMESTAMP)))"),
                    [d.clone()],
                ),
            })
            .sqlserver(|| Expr::template(format!("DATEPART({kw}, ?)"), [d.clone()]))
            .default(|| Expr::template(format!("EXTRACT({kw} FROM ?)"), [d.clone()]))
            .expr(self.dialect)
    }

    pub fn year(&self, d: impl IntoExpr) -> Expr {
        self.extract(DatePart::Year, d)
    }

    pub fn month(&self, d: impl IntoExpr) -> Expr {
        self.extract(DatePart::Month, d)
    }

    pub fn day(&self, d: impl IntoExpr) -> Expr {
        self.extract(DatePart::Day, d)
    }

    pub fn hour(&self, d: impl IntoExpr) -> Expr {
        self.extract(DatePart::Hour, d)
    }

    pub fn minute(&self, d: impl IntoExpr) -> Expr {
        self.extract(DatePart::Minute, d)
    }

    pub fn second(&self, d: impl IntoExpr) -> Expr {
        self.extract(DatePart::Second, d)
    }

    /// Truncate a timestamp to the start of `part`.
    pub fn date_trunc(&self, part: DatePart, d: impl IntoExpr) -> Expr {
        let d = d.into_expr();
        Dispatch::new("date_trunc")
            .postgres(|| {
                Expr::template(
                    format!("DATE_TRUNC('{}', ?)", part.keyword().to_lowercase()),
                    [d.clone()],
                )
            })
            .mysql(|| {
                let fmt = match part {
                    DatePart::Year => "%Y-01-01 00:00:00",
                    DatePart::Month => "%Y-%m-01 00:00:00",
                    DatePart::Day => "%Y-%m-%d 00:00:00",
                    DatePart::Hour => "%Y-%m-%d %H:00:00",
                    DatePart::Minute => "%Y-%m-%d %H:%i:00",
                    DatePart::Second => "%Y-%m-%d %H:%i:%s",
                };
                Expr::template(
                    format!("CAST(DATE_FORMAT(?, '{fmt}') AS DATETIME)"),
                    [d.clone()],
                )
            })
            .sqlite(|| {
                let fmt = match part {
                    DatePart::Year => "%Y-01-01 00:00:00",
                    DatePart::Month => "%Y-%m-01 00:00:00",
                    DatePart::Day => "%Y-%m-%d 00:00:00",
                    DatePart::Hour => "%Y-%m-%d %H:00:00",
                    DatePart::Minute => "%Y-%m-%d %H:%M:00",
                    DatePart::Second => "%Y-%m-%d %H:%M:%S",
                };
                Expr::template(format!("STRFTIME('{fmt}', ?)"), [d.clone()])
            })
            .oracle(|| match part {
                DatePart::Second => t("CAST(? AS DATE)", [d.clone()]),
                _ => {
                    let fmt = match part {
                        DatePart::Year => "YYYY",
                        DatePart::Month => "MM",
                        DatePart::Day => "DD",
                        DatePart::Hour => "HH24",
                        _ => "MI",
                    };
                    Expr::template(format!("TRUNC(?, '{fmt}')"), [d.clone()])
                }
            })
            .sqlserver(|| {
                let kw = part.keyword();
                Expr::template(
                    format!(
                        "DATEADD({kw}, DATEDIFF({kw}, CAST('2000-01-01' AS DATETIME2), ?), \
                         CAST('2000-01-01' AS DATETIME2))"
                    ),
                    [d.clone()],
                )
            })
            .expr(self.dialect)
    }

    /// `d + amount part`. `amount` may be negative or an expression.
    pub fn date_add(&self, d: impl IntoExpr, amount: impl IntoExpr, part: DatePart) -> Expr {
        self.shift(d.into_expr(), amount.into_expr(), part)
    }

    /// `d - amount part`.
    pub fn date_sub(&self, d: impl IntoExpr, amount: impl IntoExpr, part: DatePart) -> Expr {
        let amount = self.neg(amount);
        self.shift(d.into_expr(), amount, part)
    }

    fn shift(&self, d: Expr, n: Expr, part: DatePart) -> Expr {
        let kw = part.keyword();
        Dispatch::new("date_add")
            .postgres(|| {
                Expr::template(
                    format!("(? + (? * INTERVAL '1 {}'))", kw.to_lowercase()),
                    [d.clone(), n.clone()],
                )
            })
            .mysql(|| Expr::template(format!("DATE_ADD(?, INTERVAL ? {kw})"), [d.clone(), n.clone()]))
            .sqlite(|| {
                Expr::template(
                    format!("DATETIME(?, (? || ' {}'))", part.sqlite_modifier()),
                    [d.clone(), n.clone()],
                )
            })
            .oracle(|| match part {
                DatePart::Year => t("ADD_MONTHS(?, (?) * 12)", [d.clone(), n.clone()]),
                DatePart::Month => t("ADD_MONTHS(?, ?)", [d.clone(), n.clone()]),
                _ => Expr::template(
                    format!("(? + NUMTODSINTERVAL(?, '{kw}'))"),
                    [d.clone(), n.clone()],
                ),
            })
            .sqlserver(|| Expr::template(format!("DATEADD({kw}, ?, ?)"), [n.clone(), d.clone()]))
            .expr(self.dialect)
    }

    /// Whole `part`s elapsed from `start` to `end` (negative when `end` is earlier).
    pub fn date_diff(&self, part: DatePart, start: impl IntoExpr, end: impl IntoExpr) -> Expr {
        let (s, e) = (start.into_expr(), end.into_expr());
        Dispatch::new("date_diff")
            .postgres(|| match part {
                DatePart::Year => t("CAST(EXTRACT(YEAR FROM AGE(?, ?)) AS INTEGER)", [e.clone(), s.clone()]),
                DatePart::Month => t(
                    "CAST(EXTRACT(YEAR FROM AGE(?, ?)) * 12 + EXTRACT(MONTH FROM AGE(?, ?)) AS INTEGER)",
                    [e.clone(), s.clone(), e.clone(), s.clone()],
                ),
                other => Expr::template(
                    format!(
                        "CAST(TRUNC(EXTRACT(EPOCH FROM (CAST(? AS TIMESTAMP) - CAST(? AS TIMESTAMP))) / {}) AS INTEGER)",
                        other.seconds().unwrap_or(1)
                    ),
                    [e.clone(), s.clone()],
                ),
            })
            .mysql(|| {
                Expr::template(
                    format!("TIMESTAMPDIFF({}, ?, ?)", part.keyword()),
                    [s.clone(), e.clone()],
                )
            })
            .sqlite(|| match part {
                DatePart::Year | DatePart::Month => {
                    let months = t(
                        "((CAST(STRFTIME('%Y', ?) AS INTEGER) - CAST(STRFTIME('%Y', ?) AS INTEGER)) * 12 \
                         + CAST(STRFTIME('%m', ?) AS INTEGER) - CAST(STRFTIME('%m', ?) AS INTEGER) \
                         - (CASE WHEN STRFTIME('%d %H:%M:%S', ?) < STRFTIME('%d %H:%M:%S', ?) THEN 1 ELSE 0 END))",
                        [e.clone(), s.clone(), e.clone(), s.clone(), e.clone(), s.clone()],
                    );
                    if part == DatePart::Year {
                        t("(? / 12)", [months])
                    } else {
                        months
                    }
                }
                other => Expr::template(
                    format!(
                        "CAST((JULIANDAY(?) - JULIANDAY(?)) * {} AS INTEGER)",
                        86_400 / other.seconds().unwrap_or(86_400)
                    ),
                    [e.clone(), s.clone()],
                ),
            })
            .oracle(|| match part {
                DatePart::Year => t("TRUNC(MONTHS_BETWEEN(?, ?) / 12)", [e.clone(), s.clone()]),
                DatePart::Month => t("TRUNC(MONTHS_BETWEEN(?, ?))", [e.clone(), s.clone()]),
                other => Expr::template(
                    format!(
                        "TRUNC((CAST(? AS DATE) - CAST(? AS DATE)) * {})",
                        86_400 / other.seconds().unwrap_or(86_400)
                    ),
                    [e.clone(), s.clone()],
                ),
            })
            .sqlserver(|| match part {
                DatePart::Year | DatePart::Month => {
                    let kw = part.keyword();
                    Expr::template(
                        format!(
                            "(DATEDIFF({kw}, ?, ?) - CASE WHEN DATEADD({kw}, DATEDIFF({kw}, ?, ?), ?) > ? \
                             THEN 1 ELSE 0 END)"
                        ),
                        [s.clone(), e.clone(), s.clone(), e.clone(), s.clone(), e.clone()],
                    )
                }
                other => Expr::template(
                    format!("(DATEDIFF_BIG(SECOND, ?, ?) / {})", other.seconds().unwrap_or(1)),
                    [s.clone(), e.clone()],
                ),
            })
            .expr(self.dialect)
    }

    /// Human-readable span from `start` to `end`.
    ///
    /// Postgres returns its native `AGE` interval. Elsewhere the span is assembled as text
    /// `"<y> years <m> mons <d> days"`: whole years first, then whole months counted from the
    /// year-advanced anchor, then days counted from the month-advanced anchor. Re-anchoring at each step
    /// keeps month lengths from drifting.
    pub fn age(&self, start: impl IntoExpr, end: impl IntoExpr) -> Expr {
        let (s, e) = (start.into_expr(), end.into_expr());
        Dispatch::new("age")
            .postgres(|| t("AGE(?, ?)", [e.clone(), s.clone()]))
            .default(|| {
                let years = self.date_diff(DatePart::Year, s.clone(), e.clone());
                let year_anchor = self.date_add(s.clone(), years.clone(), DatePart::Year);
                let months = self.date_diff(DatePart::Month, year_anchor.clone(), e.clone());
                let month_anchor = self.date_add(year_anchor, months.clone(), DatePart::Month);
                let days = self.date_diff(DatePart::Day, month_anchor, e.clone());
                self.concat([
                    self.cast(years, CastType::Text),
                    Expr::raw("' years '"),
                    self.cast(months, CastType::Text),
                    Expr::raw("' mons '"),
                    self.cast(days, CastType::Text),
                    Expr::raw("' days'"),
                ])
            })
            .expr(self.dialect)
    }
}
