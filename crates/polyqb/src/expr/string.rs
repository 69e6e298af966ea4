//! String functions and LIKE-based fuzzy matching.

use crate::dialect::Dialect;
use crate::dispatch::Dispatch;

use super::{ColumnRef, Expr, ExprBuilder, IntoExpr, t};

/// Escape character used in every generated `LIKE .. ESCAPE` clause.
const LIKE_ESCAPE: char = '!';

/// The right-hand side of a fuzzy match.
///
/// A literal pattern is escaped and assembled in Rust, then bound as a single parameter. An expression
/// pattern is concatenated with `%` in SQL and is not escaped.
#[derive(Clone, Debug)]
pub enum LikePattern {
    Literal(String),
    Expr(Expr),
}

impl From<&str> for LikePattern {
    fn from(s: &str) -> Self {
        LikePattern::Literal(s.to_string())
    }
}

impl From<String> for LikePattern {
    fn from(s: String) -> Self {
        LikePattern::Literal(s)
    }
}

impl From<Expr> for LikePattern {
    fn from(e: Expr) -> Self {
        LikePattern::Expr(e)
    }
}

impl From<ColumnRef> for LikePattern {
    fn from(c: ColumnRef) -> Self {
        LikePattern::Expr(c.into_expr())
    }
}

/// Escape `%`, `_` and the escape character itself.
pub fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if ch == '%' || ch == '_' || ch == LIKE_ESCAPE {
            out.push(LIKE_ESCAPE);
        }
        out.push(ch);
    }
    out
}

#[derive(Clone, Copy)]
enum Anchor {
    Start,
    End,
    Anywhere,
}

impl ExprBuilder {
    /// Concatenate strings: `||`, `CONCAT(..)` on MySQL and SQL Server.
    pub fn concat<I, V>(&self, parts: I) -> Expr
    where
        I: IntoIterator<Item = V>,
        V: IntoExpr,
    {
        let parts: Vec<Expr> = parts.into_iter().map(IntoExpr::into_expr).collect();
        Dispatch::new("concat")
            .mysql(|| t("CONCAT(?)", [Expr::join(", ", parts.clone())]))
            .sqlserver(|| t("CONCAT(?)", [Expr::join(", ", parts.clone())]))
            .default(|| t("(?)", [Expr::join(" || ", parts.clone())]))
            .expr(self.dialect)
    }

    pub fn upper(&self, s: impl IntoExpr) -> Expr {
        t("UPPER(?)", [s.into_expr()])
    }

    pub fn lower(&self, s: impl IntoExpr) -> Expr {
        t("LOWER(?)", [s.into_expr()])
    }

    /// Length in characters.
    pub fn length(&self, s: impl IntoExpr) -> Expr {
        let s = s.into_expr();
        Dispatch::new("length")
            .postgres(|| t("CHAR_LENGTH(?)", [s.clone()]))
            .mysql(|| t("CHAR_LENGTH(?)", [s.clone()]))
            .sqlserver(|| t("LEN(?)", [s.clone()]))
            .default(|| t("LENGTH(?)", [s.clone()]))
            .expr(self.dialect)
    }

    pub fn trim(&self, s: impl IntoExpr) -> Expr {
        let s = s.into_expr();
        Dispatch::new("trim")
            .sqlserver(|| t("LTRIM(RTRIM(?))", [s.clone()]))
            .default(|| t("TRIM(?)", [s.clone()]))
            .expr(self.dialect)
    }

    pub fn ltrim(&self, s: impl IntoExpr) -> Expr {
        t("LTRIM(?)", [s.into_expr()])
    }

    pub fn rtrim(&self, s: impl IntoExpr) -> Expr {
        t("RTRIM(?)", [s.into_expr()])
    }

    /// 1-based substring of `len` characters.
    pub fn substring(&self, s: impl IntoExpr, start: impl IntoExpr, len: impl IntoExpr) -> Expr {
        let args = [s.into_expr(), start.into_expr(), len.into_expr()];
        Dispatch::new("substring")
            .postgres(|| t("SUBSTRING(? FROM ? FOR ?)", args.clone()))
            .sqlite(|| t("SUBSTR(?, ?, ?)", args.clone()))
            .oracle(|| t("SUBSTR(?, ?, ?)", args.clone()))
            .default(|| t("SUBSTRING(?, ?, ?)", args.clone()))
            .expr(self.dialect)
    }

    pub fn replace(&self, s: impl IntoExpr, from: impl IntoExpr, to: impl IntoExpr) -> Expr {
        t(
            "REPLACE(?, ?, ?)",
            [s.into_expr(), from.into_expr(), to.into_expr()],
        )
    }

    /// First `n` characters.
    pub fn left(&self, s: impl IntoExpr, n: impl IntoExpr) -> Expr {
        let (s, n) = (s.into_expr(), n.into_expr());
        Dispatch::new("left")
            .sqlite(|| t("SUBSTR(?, 1, ?)", [s.clone(), n.clone()]))
            .oracle(|| t("SUBSTR(?, 1, ?)", [s.clone(), n.clone()]))
            .default(|| t("LEFT(?, ?)", [s.clone(), n.clone()]))
            .expr(self.dialect)
    }

    /// Last `n` characters.
    pub fn right(&self, s: impl IntoExpr, n: impl IntoExpr) -> Expr {
        let (s, n) = (s.into_expr(), n.into_expr());
        Dispatch::new("right")
            .sqlite(|| t("SUBSTR(?, -(?))", [s.clone(), n.clone()]))
            .oracle(|| t("SUBSTR(?, -(?))", [s.clone(), n.clone()]))
            .default(|| t("RIGHT(?, ?)", [s.clone(), n.clone()]))
            .expr(self.dialect)
    }

    /// Repeat `s` `n` times. SQLite has no REPEAT; it is built from a zero blob of `n` bytes.
    pub fn repeat(&self, s: impl IntoExpr, n: impl IntoExpr) -> Expr {
        let (s, n) = (s.into_expr(), n.into_expr());
        Dispatch::new("repeat")
            .sqlite(|| t("REPLACE(HEX(ZEROBLOB(?)), '00', ?)", [n.clone(), s.clone()]))
            .oracle(|| {
                t(
                    "RPAD(?, LENGTH(?) * ?, ?)",
                    [s.clone(), s.clone(), n.clone(), s.clone()],
                )
            })
            .sqlserver(|| t("REPLICATE(?, ?)", [s.clone(), n.clone()]))
            .default(|| t("REPEAT(?, ?)", [s.clone(), n.clone()]))
            .expr(self.dialect)
    }

    /// 1-based position of `needle` in `haystack`, 0 when absent.
    pub fn position(&self, needle: impl IntoExpr, haystack: impl IntoExpr) -> Expr {
        let (needle, haystack) = (needle.into_expr(), haystack.into_expr());
        Dispatch::new("position")
            .postgres(|| t("STRPOS(?, ?)", [haystack.clone(), needle.clone()]))
            .mysql(|| t("LOCATE(?, ?)", [needle.clone(), haystack.clone()]))
            .sqlserver(|| t("CHARINDEX(?, ?)", [needle.clone(), haystack.clone()]))
            .default(|| t("INSTR(?, ?)", [haystack.clone(), needle.clone()]))
            .expr(self.dialect)
    }

    /// Reverse a string. Not available on SQLite.
    pub fn reverse(&self, s: impl IntoExpr) -> Expr {
        let s = s.into_expr();
        Dispatch::new("reverse")
            .postgres(|| t("REVERSE(?)", [s.clone()]))
            .mysql(|| t("REVERSE(?)", [s.clone()]))
            .oracle(|| t("REVERSE(?)", [s.clone()]))
            .sqlserver(|| t("REVERSE(?)", [s.clone()]))
            .expr(self.dialect)
    }

    /// `s LIKE pattern` with a caller-supplied pattern (no escaping applied).
    pub fn like(&self, s: impl IntoExpr, pattern: impl IntoExpr) -> Expr {
        t("? LIKE ?", [s.into_expr(), pattern.into_expr()])
    }

    pub fn starts_with(&self, s: impl IntoExpr, pattern: impl Into<LikePattern>) -> Expr {
        self.fuzzy(s.into_expr(), pattern.into(), Anchor::Start, false)
    }

    pub fn ends_with(&self, s: impl IntoExpr, pattern: impl Into<LikePattern>) -> Expr {
        self.fuzzy(s.into_expr(), pattern.into(), Anchor::End, false)
    }

    pub fn contains(&self, s: impl IntoExpr, pattern: impl Into<LikePattern>) -> Expr {
        self.fuzzy(s.into_expr(), pattern.into(), Anchor::Anywhere, false)
    }

    pub fn starts_with_ignore_case(&self, s: impl IntoExpr, pattern: impl Into<LikePattern>) -> Expr {
        self.fuzzy(s.into_expr(), pattern.into(), Anchor::Start, true)
    }

    pub fn ends_with_ignore_case(&self, s: impl IntoExpr, pattern: impl Into<LikePattern>) -> Expr {
        self.fuzzy(s.into_expr(), pattern.into(), Anchor::End, true)
    }

    pub fn contains_ignore_case(&self, s: impl IntoExpr, pattern: impl Into<LikePattern>) -> Expr {
        self.fuzzy(s.into_expr(), pattern.into(), Anchor::Anywhere, true)
    }

    fn fuzzy(&self, s: Expr, pattern: LikePattern, anchor: Anchor, ignore_case: bool) -> Expr {
        let native_ilike = ignore_case && self.dialect == Dialect::Postgres;
        let (lead, trail) = match anchor {
            Anchor::Start => (false, true),
            Anchor::End => (true, false),
            Anchor::Anywhere => (true, true),
        };

        let (pattern, escaped) = match pattern {
            LikePattern::Literal(text) => {
                let text = if ignore_case && !native_ilike {
                    text.to_lowercase()
                } else {
                    text
                };
                let mut built = String::with_capacity(text.len() + 2);
                if lead {
                    built.push('%');
                }
                built.push_str(&escape_like(&text));
                if trail {
                    built.push('%');
                }
                (Expr::value(built), true)
            }
            LikePattern::Expr(expr) => {
                let expr = if ignore_case && !native_ilike {
                    self.lower(expr)
                } else {
                    expr
                };
                let mut parts = Vec::with_capacity(3);
                if lead {
                    parts.push(Expr::raw("'%'"));
                }
                parts.push(expr);
                if trail {
                    parts.push(Expr::raw("'%'"));
                }
                (self.concat(parts), false)
            }
        };

        let subject = if ignore_case && !native_ilike {
            self.lower(s)
        } else {
            s
        };
        let op = if native_ilike { "ILIKE" } else { "LIKE" };
        let sql = if escaped {
            format!("? {op} ? ESCAPE '{LIKE_ESCAPE}'")
        } else {
            format!("? {op} ?")
        };
        Expr::template(sql, [subject, pattern])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::col;
    use crate::value::Value;

    #[test]
    fn literal_patterns_are_prebuilt_and_bound() {
        let eb = ExprBuilder::new(Dialect::MySql);
        let (sql, params) = eb.contains(col("title"), "50%_off").to_sql(Dialect::MySql).unwrap();
        assert_eq!(sql, "title LIKE ? ESCAPE '!'");
        assert_eq!(params, vec![Value::Text("%50!%!_off%".into())]);
    }

    #[test]
    fn case_insensitive_variants() {
        let pg = ExprBuilder::new(Dialect::Postgres);
        let (sql, params) = pg
            .contains_ignore_case(col("title"), "ABC")
            .to_sql(Dialect::Postgres)
            .unwrap();
        assert_eq!(sql, "title ILIKE $1 ESCAPE '!'");
        assert_eq!(params, vec![Value::Text("%ABC%".into())]);

        for dialect in [Dialect::MySql, Dialect::Sqlite, Dialect::Oracle, Dialect::SqlServer] {
            let eb = ExprBuilder::new(dialect);
            let (sql, params) = eb
                .contains_ignore_case(col("title"), "ABC")
                .to_sql(dialect)
                .unwrap();
            assert!(sql.starts_with("LOWER(title) LIKE "), "{dialect}: {sql}");
            assert_eq!(params, vec![Value::Text("%abc%".into())]);
        }
    }

    #[test]
    fn contains_and_ignore_case_match_the_same_pattern() {
        // Both forms bind the same pattern once the case-insensitive side is lowered.
        for dialect in Dialect::ALL {
            let eb = ExprBuilder::new(dialect);
            let (_, exact) = eb.contains(col("c"), "abc").to_sql(dialect).unwrap();
            let (_, folded) = eb.contains_ignore_case(col("c"), "ABC").to_sql(dialect).unwrap();
            if dialect == Dialect::Postgres {
                assert_eq!(folded, vec![Value::Text("%ABC%".into())]);
            } else {
                assert_eq!(exact, folded);
            }
        }
    }

    #[test]
    fn dynamic_patterns_concatenate() {
        let sqlite = ExprBuilder::new(Dialect::Sqlite);
        assert_eq!(
            sqlite
                .starts_with(col("name"), col("prefix"))
                .to_sql(Dialect::Sqlite)
                .unwrap()
                .0,
            "name LIKE (prefix || '%')"
        );
        let mssql = ExprBuilder::new(Dialect::SqlServer);
        assert_eq!(
            mssql
                .ends_with(col("name"), col("suffix"))
                .to_sql(Dialect::SqlServer)
                .unwrap()
                .0,
            "name LIKE CONCAT('%', suffix)"
        );
    }

    #[test]
    fn repeat_is_emulated_on_sqlite() {
        let eb = ExprBuilder::new(Dialect::Sqlite);
        assert_eq!(
            eb.repeat("ab", 3).to_sql(Dialect::Sqlite).unwrap().0,
            "REPLACE(HEX(ZEROBLOB(?)), '00', ?)"
        );
    }

    #[test]
    fn reverse_fails_on_sqlite() {
        let eb = ExprBuilder::new(Dialect::Sqlite);
        assert!(eb.reverse(col("name")).to_sql(Dialect::Sqlite).unwrap_err().is_unsupported_dialect());
    }
}
