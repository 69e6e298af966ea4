//! JSON construction, extraction, introspection and mutation.
//!
//! Paths are written once in dotted form (`address.city`, `tags.0`) and converted to each backend's
//! syntax: a text array on Postgres (`{address,city}`), a `$.address.city` path elsewhere. Oracle only
//! accepts literal paths, so there the path is inlined after validation.
//!
//! `json_length` follows one rule on every backend: arrays count elements, objects count keys, any
//! other JSON value counts as `1`, and SQL `NULL` stays `NULL`.

use crate::dialect::Dialect;
use crate::dispatch::Dispatch;
use crate::error::{OrmError, OrmResult};
use crate::value::Value;

use super::{ColumnRef, Expr, ExprBuilder, IntoExpr, t};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

/// A parsed dotted JSON path. Numeric segments address array elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    segments: Vec<Segment>,
}

fn is_simple_key(key: &str) -> bool {
    let mut chars = key.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// One dotted part: `key`, `0`, or `key` followed by `[n]` subscripts.
fn parse_segment(part: &str, path: &str, out: &mut Vec<Segment>) -> OrmResult<()> {
    let malformed = || OrmError::validation(format!("malformed subscript in JSON path '{path}'"));
    let (head, mut rest) = match part.find('[') {
        Some(pos) => part.split_at(pos),
        None => (part, ""),
    };
    if head.contains(']') {
        return Err(malformed());
    }
    if !head.is_empty() {
        match head.parse::<usize>() {
            Ok(i) => out.push(Segment::Index(i)),
            Err(_) => out.push(Segment::Key(head.to_string())),
        }
    }
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[').ok_or_else(malformed)?;
        let close = inner.find(']').ok_or_else(malformed)?;
        let index = inner[..close].parse::<usize>().map_err(|_| malformed())?;
        out.push(Segment::Index(index));
        rest = &inner[close + 1..];
    }
    Ok(())
}

impl JsonPath {
    /// Parse a dotted path. Array elements are addressed as `tags.0` or `tags[0]`.
    pub fn parse(path: &str) -> OrmResult<Self> {
        let path = path.trim();
        let path = path
            .strip_prefix("$.")
            .or_else(|| path.strip_prefix('$').filter(|p| p.starts_with('[')))
            .unwrap_or(path);
        if path.is_empty() {
            return Err(OrmError::validation("JSON path cannot be empty"));
        }
        let mut segments = Vec::new();
        for part in path.split('.') {
            if part.is_empty() {
                return Err(OrmError::validation(format!(
                    "empty segment in JSON path '{path}'"
                )));
            }
            if part.chars().any(|c| c == '\'' || c == '\0' || c.is_control()) {
                return Err(OrmError::validation(format!(
                    "invalid character in JSON path segment '{part}'"
                )));
            }
            parse_segment(part, path, &mut segments)?;
        }
        Ok(Self { segments })
    }

    /// Postgres text-array form: `{a,b,0}`.
    pub fn to_pg_array(&self) -> String {
        let items: Vec<String> = self
            .segments
            .iter()
            .map(|s| match s {
                Segment::Index(i) => i.to_string(),
                Segment::Key(k) if is_simple_key(k) => k.clone(),
                Segment::Key(k) => {
                    format!("\"{}\"", k.replace('\\', "\\\\").replace('"', "\\\""))
                }
            })
            .collect();
        format!("{{{}}}", items.join(","))
    }

    /// SQL/JSON form: `$.a.b[0]`, quoting keys that are not plain identifiers.
    pub fn to_dollar(&self) -> String {
        let mut out = String::from("$");
        for s in &self.segments {
            match s {
                Segment::Index(i) => out.push_str(&format!("[{i}]")),
                Segment::Key(k) if is_simple_key(k) => {
                    out.push('.');
                    out.push_str(k);
                }
                Segment::Key(k) => {
                    out.push_str(".\"");
                    out.push_str(&k.replace('"', "\\\""));
                    out.push('"');
                }
            }
        }
        out
    }
}

/// A value written into a JSON document.
///
/// `Json` values are bound as JSON documents. `Sql` values are SQL scalars or JSON-typed columns and are
/// converted by the backend.
#[derive(Clone, Debug)]
pub enum JsonArg {
    Json(serde_json::Value),
    Sql(Expr),
}

impl From<serde_json::Value> for JsonArg {
    fn from(v: serde_json::Value) -> Self {
        JsonArg::Json(v)
    }
}

impl From<Expr> for JsonArg {
    fn from(e: Expr) -> Self {
        JsonArg::Sql(e)
    }
}

impl From<ColumnRef> for JsonArg {
    fn from(c: ColumnRef) -> Self {
        JsonArg::Sql(c.into_expr())
    }
}

macro_rules! impl_json_arg {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for JsonArg {
                fn from(v: $ty) -> Self {
                    JsonArg::Json(serde_json::Value::from(v))
                }
            }
        )*
    };
}

impl_json_arg!(bool, i32, i64, f64, &str, String);

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mutation {
    Set,
    Insert,
    Replace,
    Append,
}

impl Mutation {
    fn op(self) -> &'static str {
        match self {
            Mutation::Set => "json_set",
            Mutation::Insert => "json_insert",
            Mutation::Replace => "json_replace",
            Mutation::Append => "json_array_append",
        }
    }
}

/// Postgres cannot infer parameter types inside variadic JSON builders.
fn pg_typed(e: Expr) -> Expr {
    let ty = match e.as_value() {
        None => return e,
        Some(v) => match v {
            Value::Null | Value::Text(_) => "TEXT",
            Value::Bool(_) => "BOOLEAN",
            Value::Int(_) => "BIGINT",
            Value::Float(_) => "DOUBLE PRECISION",
            Value::Decimal(_) => "NUMERIC",
            Value::Bytes(_) => "BYTEA",
            Value::Json(_) => "JSONB",
            Value::Date(_) => "DATE",
            Value::Time(_) => "TIME",
            Value::Timestamp(_) => "TIMESTAMP",
            Value::TimestampTz(_) => "TIMESTAMPTZ",
            Value::Uuid(_) => "UUID",
        },
    };
    Expr::template(format!("CAST(? AS {ty})"), [e])
}

impl ExprBuilder {
    fn path_param(&self, path: &str) -> Result<Expr, Expr> {
        let path = JsonPath::parse(path).map_err(Expr::invalid)?;
        Ok(match self.dialect {
            Dialect::Postgres => t("CAST(? AS TEXT[])", [Expr::value(path.to_pg_array())]),
            Dialect::Oracle => Expr::raw(self.dialect.string_literal(&path.to_dollar())),
            Dialect::MySql | Dialect::Sqlite | Dialect::SqlServer => Expr::value(path.to_dollar()),
        })
    }

    /// `JSON_OBJECT` from key/value pairs.
    pub fn json_object<'k, I, V>(&self, pairs: I) -> Expr
    where
        I: IntoIterator<Item = (&'k str, V)>,
        V: IntoExpr,
    {
        let pairs: Vec<(Expr, Expr)> = pairs
            .into_iter()
            .map(|(k, v)| (Expr::value(k), v.into_expr()))
            .collect();
        Dispatch::new("json_object")
            .postgres(|| {
                let args = pairs
                    .iter()
                    .flat_map(|(k, v)| [pg_typed(k.clone()), pg_typed(v.clone())]);
                t("JSONB_BUILD_OBJECT(?)", [Expr::join(", ", args)])
            })
            .oracle(|| {
                let args = pairs
                    .iter()
                    .map(|(k, v)| t("KEY ? VALUE ?", [k.clone(), v.clone()]));
                t("JSON_OBJECT(?)", [Expr::join(", ", args)])
            })
            .sqlserver(|| {
                let args = pairs.iter().map(|(k, v)| t("?: ?", [k.clone(), v.clone()]));
                t("JSON_OBJECT(?)", [Expr::join(", ", args)])
            })
            .default(|| {
                let args = pairs.iter().flat_map(|(k, v)| [k.clone(), v.clone()]);
                t("JSON_OBJECT(?)", [Expr::join(", ", args)])
            })
            .expr(self.dialect)
    }

    pub fn json_array<I, V>(&self, values: I) -> Expr
    where
        I: IntoIterator<Item = V>,
        V: IntoExpr,
    {
        let values: Vec<Expr> = values.into_iter().map(IntoExpr::into_expr).collect();
        Dispatch::new("json_array")
            .postgres(|| {
                let args = values.iter().cloned().map(pg_typed);
                t("JSONB_BUILD_ARRAY(?)", [Expr::join(", ", args)])
            })
            .default(|| t("JSON_ARRAY(?)", [Expr::join(", ", values.clone())]))
            .expr(self.dialect)
    }

    /// The JSON value at `path` (objects and arrays stay JSON, scalars come back as JSON scalars).
    pub fn json_extract(&self, doc: impl IntoExpr, path: &str) -> Expr {
        let doc = doc.into_expr();
        let path = match self.path_param(path) {
            Ok(p) => p,
            Err(invalid) => return invalid,
        };
        Dispatch::new("json_extract")
            .postgres(|| t("(? #> ?)", [doc.clone(), path.clone()]))
            .oracle(|| {
                t(
                    "COALESCE(JSON_QUERY(?, ?), JSON_VALUE(?, ?))",
                    [doc.clone(), path.clone(), doc.clone(), path.clone()],
                )
            })
            .sqlserver(|| {
                t(
                    "COALESCE(JSON_QUERY(?, ?), JSON_VALUE(?, ?))",
                    [doc.clone(), path.clone(), doc.clone(), path.clone()],
                )
            })
            .default(|| t("JSON_EXTRACT(?, ?)", [doc.clone(), path.clone()]))
            .expr(self.dialect)
    }

    /// The value at `path` as SQL text.
    pub fn json_extract_text(&self, doc: impl IntoExpr, path: &str) -> Expr {
        let doc = doc.into_expr();
        let path = match self.path_param(path) {
            Ok(p) => p,
            Err(invalid) => return invalid,
        };
        Dispatch::new("json_extract_text")
            .postgres(|| t("(? #>> ?)", [doc.clone(), path.clone()]))
            .mysql(|| t("JSON_UNQUOTE(JSON_EXTRACT(?, ?))", [doc.clone(), path.clone()]))
            .sqlite(|| t("JSON_EXTRACT(?, ?)", [doc.clone(), path.clone()]))
            .default(|| t("JSON_VALUE(?, ?)", [doc.clone(), path.clone()]))
            .expr(self.dialect)
    }

    /// Whether `path` exists in `doc`.
    pub fn json_exists(&self, doc: impl IntoExpr, path: &str) -> Expr {
        let doc = doc.into_expr();
        let path = match self.path_param(path) {
            Ok(p) => p,
            Err(invalid) => return invalid,
        };
        Dispatch::new("json_exists")
            .postgres(|| t("(? #> ?) IS NOT NULL", [doc.clone(), path.clone()]))
            .mysql(|| t("JSON_CONTAINS_PATH(?, 'one', ?) = 1", [doc.clone(), path.clone()]))
            .sqlite(|| t("JSON_TYPE(?, ?) IS NOT NULL", [doc.clone(), path.clone()]))
            .oracle(|| t("JSON_EXISTS(?, ?)", [doc.clone(), path.clone()]))
            .sqlserver(|| {
                t(
                    "(JSON_VALUE(?, ?) IS NOT NULL OR JSON_QUERY(?, ?) IS NOT NULL)",
                    [doc.clone(), path.clone(), doc.clone(), path.clone()],
                )
            })
            .expr(self.dialect)
    }

    /// Whether `doc` contains `candidate`.
    ///
    /// Postgres and MySQL use native containment. SQLite and SQL Server compare the top-level members
    /// of both documents. Oracle compares the elements of two arrays.
    pub fn json_contains(&self, doc: impl IntoExpr, candidate: impl Into<JsonArg>) -> Expr {
        let doc = doc.into_expr();
        let candidate = match candidate.into() {
            JsonArg::Json(v) => Expr::value(Value::Json(v)),
            JsonArg::Sql(e) => e,
        };
        Dispatch::new("json_contains")
            .postgres(|| t("(? @> CAST(? AS JSONB))", [doc.clone(), candidate.clone()]))
            .mysql(|| t("JSON_CONTAINS(?, ?)", [doc.clone(), candidate.clone()]))
            .sqlite(|| {
                t(
                    "NOT EXISTS (SELECT 1 FROM JSON_EACH(?) AS c WHERE NOT EXISTS (\
                     SELECT 1 FROM JSON_EACH(?) AS d \
                     WHERE (JSON_TYPE(?) = 'array' OR d.key = c.key) AND d.value IS c.value))",
                    [candidate.clone(), doc.clone(), doc.clone()],
                )
            })
            .oracle(|| {
                t(
                    "NOT EXISTS (SELECT 1 FROM JSON_TABLE(?, '$[*]' COLUMNS (v VARCHAR2(4000) \
                     FORMAT JSON PATH '$')) c WHERE NOT EXISTS (SELECT 1 FROM JSON_TABLE(?, '$[*]' \
                     COLUMNS (v VARCHAR2(4000) FORMAT JSON PATH '$')) d WHERE JSON_EQUAL(d.v, c.v)))",
                    [candidate.clone(), doc.clone()],
                )
            })
            .sqlserver(|| {
                t(
                    "NOT EXISTS (SELECT 1 FROM OPENJSON(?) AS c WHERE NOT EXISTS (\
                     SELECT 1 FROM OPENJSON(?) AS d \
                     WHERE (LEFT(LTRIM(?), 1) = '[' OR d.[key] = c.[key]) AND d.[value] = c.[value]))",
                    [candidate.clone(), doc.clone(), doc.clone()],
                )
            })
            .expr(self.dialect)
    }

    /// Keys of a JSON object as a JSON array. Not available on Oracle.
    pub fn json_keys(&self, doc: impl IntoExpr) -> Expr {
        let doc = doc.into_expr();
        Dispatch::new("json_keys")
            .postgres(|| t("(SELECT JSONB_AGG(k) FROM JSONB_OBJECT_KEYS(?) AS k)", [doc.clone()]))
            .mysql(|| t("JSON_KEYS(?)", [doc.clone()]))
            .sqlite(|| t("(SELECT JSON_GROUP_ARRAY(key) FROM JSON_EACH(?))", [doc.clone()]))
            .sqlserver(|| {
                t(
                    "(SELECT '[' + STRING_AGG('\"' + STRING_ESCAPE([key], 'json') + '\"', ',') + ']' \
                     FROM OPENJSON(?))",
                    [doc.clone()],
                )
            })
            .expr(self.dialect)
    }

    /// Number of elements (arrays) or keys (objects); other JSON values count as 1, SQL NULL is NULL.
    pub fn json_length(&self, doc: impl IntoExpr) -> Expr {
        let d = doc.into_expr();
        Dispatch::new("json_length")
            .postgres(|| {
                t(
                    "CASE WHEN ? IS NULL THEN NULL \
                     WHEN JSONB_TYPEOF(?) = 'array' THEN JSONB_ARRAY_LENGTH(?) \
                     WHEN JSONB_TYPEOF(?) = 'object' THEN (SELECT COUNT(*) FROM JSONB_OBJECT_KEYS(?)) \
                     ELSE 1 END",
                    [d.clone(), d.clone(), d.clone(), d.clone(), d.clone()],
                )
            })
            .mysql(|| t("JSON_LENGTH(?)", [d.clone()]))
            .sqlite(|| {
                t(
                    "CASE WHEN ? IS NULL THEN NULL \
                     WHEN JSON_TYPE(?) = 'array' THEN JSON_ARRAY_LENGTH(?) \
                     WHEN JSON_TYPE(?) = 'object' THEN (SELECT COUNT(*) FROM JSON_EACH(?)) \
                     ELSE 1 END",
                    [d.clone(), d.clone(), d.clone(), d.clone(), d.clone()],
                )
            })
            .oracle(|| {
                t(
                    "CASE WHEN ? IS NULL THEN NULL \
                     WHEN JSON_VALUE(?, '$.type()') = 'array' THEN JSON_VALUE(?, '$.size()' RETURNING NUMBER) \
                     WHEN JSON_VALUE(?, '$.type()') = 'object' THEN \
                     (SELECT COUNT(*) FROM JSON_TABLE(?, '$.*' COLUMNS (v VARCHAR2(1) PATH '$'))) \
                     ELSE 1 END",
                    [d.clone(), d.clone(), d.clone(), d.clone(), d.clone()],
                )
            })
            .sqlserver(|| {
                t(
                    "CASE WHEN ? IS NULL THEN NULL \
                     WHEN LEFT(LTRIM(?), 1) IN ('[', '{') THEN (SELECT COUNT(*) FROM OPENJSON(?)) \
                     ELSE 1 END",
                    [d.clone(), d.clone(), d.clone()],
                )
            })
            .expr(self.dialect)
    }

    /// [`json_length`](Self::json_length) of the value at `path`.
    pub fn json_length_at(&self, doc: impl IntoExpr, path: &str) -> Expr {
        let inner = self.json_extract(doc, path);
        self.json_length(inner)
    }

    /// One of `object array string number boolean null`, or NULL for SQL NULL.
    pub fn json_type(&self, doc: impl IntoExpr) -> Expr {
        let d = doc.into_expr();
        Dispatch::new("json_type")
            .postgres(|| t("JSONB_TYPEOF(?)", [d.clone()]))
            .mysql(|| {
                t(
                    "CASE WHEN ? IS NULL THEN NULL ELSE CASE JSON_TYPE(?) \
                     WHEN 'OBJECT' THEN 'object' WHEN 'ARRAY' THEN 'array' \
                     WHEN 'BOOLEAN' THEN 'boolean' WHEN 'NULL' THEN 'null' \
                     WHEN 'INTEGER' THEN 'number' WHEN 'UNSIGNED INTEGER' THEN 'number' \
                     WHEN 'DOUBLE' THEN 'number' WHEN 'DECIMAL' THEN 'number' \
                     ELSE 'string' END END",
                    [d.clone(), d.clone()],
                )
            })
            .sqlite(|| {
                t(
                    "CASE JSON_TYPE(?) WHEN 'integer' THEN 'number' WHEN 'real' THEN 'number' \
                     WHEN 'text' THEN 'string' WHEN 'true' THEN 'boolean' WHEN 'false' THEN 'boolean' \
                     ELSE JSON_TYPE(?) END",
                    [d.clone(), d.clone()],
                )
            })
            .oracle(|| t("JSON_VALUE(?, '$.type()')", [d.clone()]))
            .sqlserver(|| {
                t(
                    "CASE WHEN ? IS NULL THEN NULL \
                     WHEN LEFT(LTRIM(?), 1) = '[' THEN 'array' \
                     WHEN LEFT(LTRIM(?), 1) = '{' THEN 'object' \
                     WHEN LEFT(LTRIM(?), 1) = '\"' THEN 'string' \
                     WHEN LTRIM(RTRIM(?)) IN ('true', 'false') THEN 'boolean' \
                     WHEN LTRIM(RTRIM(?)) = 'null' THEN 'null' \
                     ELSE 'number' END",
                    [d.clone(), d.clone(), d.clone(), d.clone(), d.clone(), d.clone()],
                )
            })
            .expr(self.dialect)
    }

    /// Set `path` to `value`, creating it when missing.
    pub fn json_set(&self, doc: impl IntoExpr, path: &str, value: impl Into<JsonArg>) -> Expr {
        self.json_mutate(Mutation::Set, doc.into_expr(), path, value.into())
    }

    /// Set `path` only when it does not exist yet.
    pub fn json_insert(&self, doc: impl IntoExpr, path: &str, value: impl Into<JsonArg>) -> Expr {
        self.json_mutate(Mutation::Insert, doc.into_expr(), path, value.into())
    }

    /// Set `path` only when it already exists.
    pub fn json_replace(&self, doc: impl IntoExpr, path: &str, value: impl Into<JsonArg>) -> Expr {
        self.json_mutate(Mutation::Replace, doc.into_expr(), path, value.into())
    }

    /// Append `value` to the array at `path`.
    pub fn json_array_append(
        &self,
        doc: impl IntoExpr,
        path: &str,
        value: impl Into<JsonArg>,
    ) -> Expr {
        self.json_mutate(Mutation::Append, doc.into_expr(), path, value.into())
    }

    fn json_mutate(&self, m: Mutation, doc: Expr, path: &str, value: JsonArg) -> Expr {
        let parsed = match JsonPath::parse(path) {
            Ok(p) => p,
            Err(err) => return Expr::invalid(err),
        };
        let dollar = parsed.to_dollar();
        let value_expr = |dialect: Dialect| match &value {
            JsonArg::Json(v) => match dialect {
                Dialect::Postgres => t("CAST(? AS JSONB)", [Expr::value(Value::Json(v.clone()))]),
                Dialect::MySql => t("CAST(? AS JSON)", [Expr::value(Value::Json(v.clone()))]),
                Dialect::Sqlite => t("JSON(?)", [Expr::value(Value::Json(v.clone()))]),
                Dialect::Oracle => t("? FORMAT JSON", [Expr::value(Value::Json(v.clone()))]),
                Dialect::SqlServer if v.is_object() || v.is_array() => {
                    t("JSON_QUERY(?)", [Expr::value(Value::Json(v.clone()))])
                }
                Dialect::SqlServer => Expr::value(Value::from_json_scalar(v.clone())),
            },
            JsonArg::Sql(e) if dialect == Dialect::Postgres => t("TO_JSONB(?)", [e.clone()]),
            JsonArg::Sql(e) => e.clone(),
        };

        Dispatch::new(m.op())
            .postgres(|| {
                let p = t("CAST(? AS TEXT[])", [Expr::value(parsed.to_pg_array())]);
                let v = value_expr(Dialect::Postgres);
                match m {
                    Mutation::Set => t("JSONB_SET(?, ?, ?, TRUE)", [doc.clone(), p, v]),
                    Mutation::Replace => t("JSONB_SET(?, ?, ?, FALSE)", [doc.clone(), p, v]),
                    Mutation::Insert => t(
                        "CASE WHEN (? #> ?) IS NULL THEN JSONB_SET(?, ?, ?, TRUE) ELSE ? END",
                        [doc.clone(), p.clone(), doc.clone(), p, v, doc.clone()],
                    ),
                    Mutation::Append => t(
                        "JSONB_SET(?, ?, COALESCE(? #> ?, '[]'::JSONB) || JSONB_BUILD_ARRAY(?), TRUE)",
                        [doc.clone(), p.clone(), doc.clone(), p, v],
                    ),
                }
            })
            .mysql(|| {
                let func = match m {
                    Mutation::Set => "JSON_SET",
                    Mutation::Insert => "JSON_INSERT",
                    Mutation::Replace => "JSON_REPLACE",
                    Mutation::Append => "JSON_ARRAY_APPEND",
                };
                Expr::template(
                    format!("{func}(?, ?, ?)"),
                    [doc.clone(), Expr::value(dollar.clone()), value_expr(Dialect::MySql)],
                )
            })
            .sqlite(|| {
                let (func, p) = match m {
                    Mutation::Set => ("JSON_SET", dollar.clone()),
                    Mutation::Insert => ("JSON_INSERT", dollar.clone()),
                    Mutation::Replace => ("JSON_REPLACE", dollar.clone()),
                    Mutation::Append => ("JSON_INSERT", format!("{dollar}[#]")),
                };
                Expr::template(
                    format!("{func}(?, ?, ?)"),
                    [doc.clone(), Expr::value(p), value_expr(Dialect::Sqlite)],
                )
            })
            .oracle(|| {
                let op = match m {
                    Mutation::Set => "SET",
                    Mutation::Insert => "INSERT",
                    Mutation::Replace => "REPLACE",
                    Mutation::Append => "APPEND",
                };
                let handler = match m {
                    Mutation::Insert => " IGNORE ON EXISTING",
                    Mutation::Append => " CREATE ON MISSING",
                    Mutation::Set | Mutation::Replace => "",
                };
                Expr::template(
                    format!("JSON_TRANSFORM(?, {op} ? = ?{handler})"),
                    [
                        doc.clone(),
                        Expr::raw(Dialect::Oracle.string_literal(&dollar)),
                        value_expr(Dialect::Oracle),
                    ],
                )
            })
            .sqlserver(|| {
                let v = value_expr(Dialect::SqlServer);
                let p = Expr::value(dollar.clone());
                match m {
                    Mutation::Set => t("JSON_MODIFY(?, ?, ?)", [doc.clone(), p, v]),
                    Mutation::Append => t(
                        "JSON_MODIFY(?, ?, ?)",
                        [doc.clone(), Expr::value(format!("append {dollar}")), v],
                    ),
                    Mutation::Insert => t(
                        "CASE WHEN JSON_VALUE(?, ?) IS NULL AND JSON_QUERY(?, ?) IS NULL \
                         THEN JSON_MODIFY(?, ?, ?) ELSE ? END",
                        [
                            doc.clone(),
                            p.clone(),
                            doc.clone(),
                            p.clone(),
                            doc.clone(),
                            p,
                            v,
                            doc.clone(),
                        ],
                    ),
                    Mutation::Replace => t(
                        "CASE WHEN JSON_VALUE(?, ?) IS NOT NULL OR JSON_QUERY(?, ?) IS NOT NULL \
                         THEN JSON_MODIFY(?, ?, ?) ELSE ? END",
                        [
                            doc.clone(),
                            p.clone(),
                            doc.clone(),
                            p.clone(),
                            doc.clone(),
                            p,
                            v,
                            doc.clone(),
                        ],
                    ),
                }
            })
            .expr(self.dialect)
    }
}
