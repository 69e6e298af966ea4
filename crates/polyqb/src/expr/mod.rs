//! Composable SQL expression fragments.
//!
//! An [`Expr`] is an immutable fragment: a text template with ordered child fragments, a bound value, a
//! column reference, or a nested subquery. Nothing is rendered until the owning statement renders, so
//! fragments can be built up front and nested freely.
//!
//! Dialect-specific fragments come from [`ExprBuilder`]:
//!
//! ```ignore
//! use polyqb::{col, Dialect, ExprBuilder};
//!
//! let eb = ExprBuilder::new(Dialect::Sqlite);
//! let ratio = eb.div(col("likes"), col("views"));      // CAST(.. AS REAL) / CAST(.. AS REAL)
//! let city = eb.json_extract_text(col("profile"), "address.city");
//! ```

mod aggregate;
mod arith;
mod cast;
mod conditional;
mod datetime;
mod json;
mod math;
pub mod render;
mod string;
mod window;

use std::borrow::Cow;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::ident::Ident;
use crate::qb::SelectQb;
use crate::value::Value;

pub use aggregate::{AggFunc, AggregateBuilder};
pub use cast::CastType;
pub use conditional::CaseBuilder;
pub use datetime::DatePart;
pub use json::{JsonArg, JsonPath};
pub use render::Renderer;
pub use string::LikePattern;
pub use window::{FrameBound, FrameMode, WindowBuilder, WindowFunc};

/// A renderable SQL fragment.
#[derive(Clone, Debug)]
pub struct Expr(Node);

#[derive(Clone, Debug)]
enum Node {
    /// `?` marks the next argument, `??` is a literal `?`.
    Template {
        sql: Cow<'static, str>,
        args: Vec<Expr>,
    },
    /// Items separated by `sep`, which is emitted verbatim.
    List {
        sep: Cow<'static, str>,
        items: Vec<Expr>,
    },
    Value(Value),
    Column(ColumnRef),
    Ident(Ident),
    Raw(Cow<'static, str>),
    Subquery(Box<SelectQb>),
    Invalid(OrmError),
}

impl Expr {
    /// Build a fragment from a template. Each `?` consumes the next argument.
    pub fn template(sql: impl Into<Cow<'static, str>>, args: impl IntoIterator<Item = Expr>) -> Self {
        Expr(Node::Template {
            sql: sql.into(),
            args: args.into_iter().collect(),
        })
    }

    /// Raw SQL, emitted verbatim. Never pass user input here.
    pub fn raw(sql: impl Into<Cow<'static, str>>) -> Self {
        Expr(Node::Raw(sql.into()))
    }

    /// A bound parameter.
    pub fn value(value: impl Into<Value>) -> Self {
        Expr(Node::Value(value.into()))
    }

    pub fn ident(ident: Ident) -> Self {
        Expr(Node::Ident(ident))
    }

    /// A parenthesized scalar or row subquery.
    pub fn subquery(query: SelectQb) -> Self {
        Expr(Node::Subquery(Box::new(query)))
    }

    /// A fragment that failed to build. The error surfaces when the statement renders.
    pub fn invalid(err: OrmError) -> Self {
        Expr(Node::Invalid(err))
    }

    pub(crate) fn null() -> Self {
        Expr::raw("NULL")
    }

    /// `exprs` joined by `sep`, e.g. an argument list.
    pub fn join(sep: impl Into<Cow<'static, str>>, exprs: impl IntoIterator<Item = Expr>) -> Self {
        Expr(Node::List {
            sep: sep.into(),
            items: exprs.into_iter().collect(),
        })
    }

    /// The construction error carried by this fragment or any child.
    pub fn error(&self) -> Option<&OrmError> {
        match &self.0 {
            Node::Invalid(err) => Some(err),
            Node::Template { args, .. } => args.iter().find_map(Expr::error),
            Node::List { items, .. } => items.iter().find_map(Expr::error),
            Node::Column(col) => col.error(),
            _ => None,
        }
    }

    /// The bound value, if this fragment is a plain parameter.
    pub(crate) fn as_value(&self) -> Option<&Value> {
        match &self.0 {
            Node::Value(v) => Some(v),
            _ => None,
        }
    }

    pub(crate) fn render(&self, r: &mut Renderer) -> OrmResult<()> {
        match &self.0 {
            Node::Template { sql, args } => render_template(sql, args, r),
            Node::List { sep, items } => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        r.push(sep);
                    }
                    item.render(r)?;
                }
                Ok(())
            }
            Node::Value(v) => {
                r.push_bind(v.clone());
                Ok(())
            }
            Node::Column(col) => col.render(r),
            Node::Ident(ident) => {
                r.push_ident(ident);
                Ok(())
            }
            Node::Raw(sql) => {
                r.push(sql);
                Ok(())
            }
            Node::Subquery(query) => {
                r.push("(");
                query.render_into(r)?;
                r.push(")");
                Ok(())
            }
            Node::Invalid(err) => Err(err.clone()),
        }
    }

    /// Render standalone, mostly useful in tests and logs.
    pub fn to_sql(&self, dialect: Dialect) -> OrmResult<(String, Vec<Value>)> {
        let mut r = Renderer::new(dialect);
        self.render(&mut r)?;
        Ok(r.finish())
    }
}

fn render_template(sql: &str, args: &[Expr], r: &mut Renderer) -> OrmResult<()> {
    let mut args = args.iter();
    let mut rest = sql;
    while let Some(pos) = rest.find('?') {
        r.push(&rest[..pos]);
        rest = &rest[pos + 1..];
        if let Some(stripped) = rest.strip_prefix('?') {
            r.push("?");
            rest = stripped;
            continue;
        }
        match args.next() {
            Some(arg) => arg.render(r)?,
            None => {
                return Err(OrmError::validation(format!(
                    "template {sql:?} has more slots than arguments"
                )));
            }
        }
    }
    r.push(rest);
    if args.next().is_some() {
        return Err(OrmError::validation(format!(
            "template {sql:?} has more arguments than slots"
        )));
    }
    Ok(())
}

/// A column reference.
///
/// A bare name is qualified with the statement's current alias at render time unless
/// [`unqualified`](ColumnRef::unqualified) is called. Dotted names are used as written.
#[derive(Clone, Debug)]
pub struct ColumnRef {
    kind: ColumnKind,
    qualify: bool,
}

#[derive(Clone, Debug)]
enum ColumnKind {
    Named(Ident),
    Star(Option<Ident>),
    Dynamic(String),
    Invalid(OrmError),
}

/// Reference a column: `col("name")`, `col("u.name")`, `col("*")`, `col("u.*")`.
pub fn col(name: &str) -> ColumnRef {
    let kind = if name == "*" {
        ColumnKind::Star(None)
    } else if let Some(table) = name.strip_suffix(".*") {
        match Ident::parse(table) {
            Ok(table) => ColumnKind::Star(Some(table)),
            Err(err) => ColumnKind::Invalid(err),
        }
    } else {
        match Ident::parse(name) {
            Ok(ident) => ColumnKind::Named(ident),
            Err(err) => ColumnKind::Invalid(err),
        }
    };
    ColumnRef {
        kind,
        qualify: true,
    }
}

/// A column whose name is supplied later through the statement's `bind_ident(key, ..)`.
pub fn col_param(key: &str) -> ColumnRef {
    ColumnRef {
        kind: ColumnKind::Dynamic(key.to_string()),
        qualify: true,
    }
}

impl ColumnRef {
    /// Do not inherit the enclosing statement's alias.
    pub fn unqualified(mut self) -> Self {
        self.qualify = false;
        self
    }

    /// The final name part, if statically known.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            ColumnKind::Named(ident) => Some(ident.last()),
            _ => None,
        }
    }

    fn error(&self) -> Option<&OrmError> {
        match &self.kind {
            ColumnKind::Invalid(err) => Some(err),
            _ => None,
        }
    }

    fn render(&self, r: &mut Renderer) -> OrmResult<()> {
        let ident = match &self.kind {
            ColumnKind::Named(ident) => ident.clone(),
            ColumnKind::Dynamic(key) => r.named(key)?.clone(),
            ColumnKind::Star(table) => {
                if let Some(table) = table {
                    r.push_ident(table);
                    r.push(".");
                }
                r.push("*");
                return Ok(());
            }
            ColumnKind::Invalid(err) => return Err(err.clone()),
        };
        if self.qualify && !ident.is_qualified() {
            if let Some(alias) = r.alias().cloned() {
                r.push_ident(&alias);
                r.push(".");
            }
        }
        r.push_ident(&ident);
        Ok(())
    }
}

/// Anything usable as an expression operand.
///
/// Scalars become bound parameters. Strings are values, not columns: use [`col`] for columns.
pub trait IntoExpr {
    fn into_expr(self) -> Expr;
}

impl IntoExpr for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}

impl IntoExpr for &Expr {
    fn into_expr(self) -> Expr {
        self.clone()
    }
}

impl IntoExpr for ColumnRef {
    fn into_expr(self) -> Expr {
        Expr(Node::Column(self))
    }
}

impl IntoExpr for Value {
    fn into_expr(self) -> Expr {
        Expr::value(self)
    }
}

impl IntoExpr for SelectQb {
    fn into_expr(self) -> Expr {
        Expr::subquery(self)
    }
}

macro_rules! impl_into_expr_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoExpr for $ty {
                fn into_expr(self) -> Expr {
                    Expr::value(self)
                }
            }
        )*
    };
}

impl_into_expr_value!(
    bool,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    f32,
    f64,
    &str,
    String,
    &String,
    Decimal,
    Vec<u8>,
    serde_json::Value,
    NaiveDate,
    NaiveTime,
    NaiveDateTime,
    DateTime<Utc>,
    Uuid,
);

impl<T: Into<Value>> IntoExpr for Option<T> {
    fn into_expr(self) -> Expr {
        Expr::value(self)
    }
}

/// Left-hand operands of predicates: a string here names a column.
pub trait IntoColumn {
    fn into_column(self) -> Expr;
}

impl IntoColumn for &str {
    fn into_column(self) -> Expr {
        col(self).into_expr()
    }
}

impl IntoColumn for String {
    fn into_column(self) -> Expr {
        col(&self).into_expr()
    }
}

impl IntoColumn for &String {
    fn into_column(self) -> Expr {
        col(self).into_expr()
    }
}

impl IntoColumn for ColumnRef {
    fn into_column(self) -> Expr {
        self.into_expr()
    }
}

impl IntoColumn for Expr {
    fn into_column(self) -> Expr {
        self
    }
}

impl IntoColumn for &Expr {
    fn into_column(self) -> Expr {
        self.clone()
    }
}

/// Factory for dialect-aware fragments. Cheap to copy; obtain one from a statement builder, a
/// [`Db`](crate::Db) handle or [`ExprBuilder::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExprBuilder {
    dialect: Dialect,
}

impl ExprBuilder {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// A column reference (same as [`col`]).
    pub fn col(&self, name: &str) -> Expr {
        col(name).into_expr()
    }

    /// A bound literal.
    pub fn lit(&self, value: impl Into<Value>) -> Expr {
        Expr::value(value)
    }
}

pub(crate) fn t<const N: usize>(sql: &'static str, args: [Expr; N]) -> Expr {
    Expr::template(sql, args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_bind_in_order() {
        let e = t("(? + ?)", [col("a").into_expr(), Expr::value(2)]);
        let (sql, params) = e.to_sql(Dialect::Postgres).unwrap();
        assert_eq!(sql, "(a + $1)");
        assert_eq!(params, vec![Value::Int(2)]);
    }

    #[test]
    fn double_question_mark_is_literal() {
        let e = Expr::template("? ?? 'k'", [col("doc").into_expr()]);
        assert_eq!(e.to_sql(Dialect::Postgres).unwrap().0, "doc ? 'k'");
    }

    #[test]
    fn slot_mismatch_is_an_error() {
        let e = Expr::template("? = ?", [Expr::value(1)]);
        assert!(e.to_sql(Dialect::MySql).is_err());
    }

    #[test]
    fn invalid_column_surfaces() {
        let e = col("name; drop").into_expr();
        assert!(e.error().is_some());
        assert!(e.to_sql(Dialect::Sqlite).is_err());
    }

    #[test]
    fn join_without_separator_keeps_every_item() {
        let e = Expr::join("", [Expr::value(1), Expr::raw(" + "), Expr::value(2)]);
        assert_eq!(e.to_sql(Dialect::Postgres).unwrap().0, "$1 + $2");

        let e = Expr::join(" ? ", [col("a").into_expr(), col("b").into_expr()]);
        assert_eq!(e.to_sql(Dialect::Postgres).unwrap().0, "a ? b");
    }

    #[test]
    fn placeholder_styles() {
        let e = Expr::join(", ", [Expr::value(1), Expr::value(2)]);
        let rendered: Vec<String> = Dialect::ALL
            .iter()
            .map(|d| e.to_sql(*d).unwrap().0)
            .collect();
        assert_eq!(rendered, ["$1, $2", "?, ?", "?, ?", ":1, :2", "@p1, @p2"]);
    }
}
