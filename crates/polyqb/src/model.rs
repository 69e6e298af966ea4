//! Table metadata and the [`Model`] trait.
//!
//! `#[derive(Model)]` implements [`Model`] with a `OnceLock`-cached [`TableMeta`] and plain fn-pointer
//! accessors for primary-key fields, so statement builders never need runtime reflection.

use crate::error::{OrmError, OrmResult};
use crate::dialect::Dialect;
use crate::expr::{Expr, ExprBuilder, IntoExpr, col};
use crate::value::Value;

/// One mapped column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    name: &'static str,
    field: &'static str,
    primary_key: bool,
    readonly: bool,
}

impl ColumnMeta {
    pub const fn new(name: &'static str, field: &'static str) -> Self {
        Self {
            name,
            field,
            primary_key: false,
            readonly: false,
        }
    }

    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Read-only columns are selected but never written.
    pub const fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The Rust field the column maps to.
    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }
}

/// Static description of a mapped table.
#[derive(Debug, Clone)]
pub struct TableMeta {
    name: &'static str,
    alias: Option<&'static str>,
    columns: Vec<ColumnMeta>,
    soft_delete: Option<&'static str>,
}

impl TableMeta {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            alias: None,
            columns: Vec::new(),
            soft_delete: None,
        }
    }

    pub fn with_alias(mut self, alias: &'static str) -> Self {
        self.alias = Some(alias);
        self
    }

    pub fn with_column(mut self, column: ColumnMeta) -> Self {
        self.columns.push(column);
        self
    }

    /// Mark the table as soft-deleting through a nullable timestamp column.
    pub fn with_soft_delete(mut self, column: &'static str) -> Self {
        self.soft_delete = Some(column);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Statement alias: the declared alias, or the table name.
    pub fn alias(&self) -> &'static str {
        self.alias.unwrap_or(self.name)
    }

    pub fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    /// Primary-key column names in declaration order.
    pub fn primary_key(&self) -> Vec<&'static str> {
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name)
            .collect()
    }

    pub fn soft_delete(&self) -> Option<&'static str> {
        self.soft_delete
    }

    pub fn column(&self, name: &str) -> OrmResult<&ColumnMeta> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| OrmError::UnknownColumn {
                table: self.name.to_string(),
                column: name.to_string(),
            })
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Resolve primary-key input to `(column, value)` pairs.
    pub(crate) fn resolve_pk(&self, input: PkInput) -> OrmResult<Vec<(&'static str, Value)>> {
        let pk = self.primary_key();
        if pk.is_empty() {
            return Err(OrmError::MissingPrimaryKey {
                model: self.name.to_string(),
            });
        }
        match input {
            PkInput::Value(v) if pk.len() == 1 => Ok(vec![(pk[0], v)]),
            PkInput::Value(_) => Err(OrmError::MissingKey {
                field: pk[1].to_string(),
            }),
            PkInput::Map(mut pairs) => {
                let mut resolved = Vec::with_capacity(pk.len());
                for key in &pk {
                    let pos = pairs
                        .iter()
                        .position(|(k, _)| k.as_str() == *key)
                        .ok_or_else(|| OrmError::MissingKey {
                            field: key.to_string(),
                        })?;
                    resolved.push((*key, pairs.swap_remove(pos).1));
                }
                if let Some((extra, _)) = pairs.into_iter().next() {
                    return Err(OrmError::UnknownColumn {
                        table: self.name.to_string(),
                        column: extra,
                    });
                }
                Ok(resolved)
            }
        }
    }

    /// Predicate matching one primary key.
    pub(crate) fn pk_predicate(&self, dialect: Dialect, input: PkInput) -> OrmResult<Expr> {
        let eb = ExprBuilder::new(dialect);
        let parts = self
            .resolve_pk(input)?
            .into_iter()
            .map(|(c, v)| eb.eq(col(c), v));
        Ok(Expr::join(" AND ", parts))
    }

    /// Predicate matching any of `inputs`. An empty list matches nothing.
    pub(crate) fn pk_in_predicate(&self, dialect: Dialect, inputs: Vec<PkInput>) -> OrmResult<Expr> {
        let pk = self.primary_key();
        if pk.is_empty() {
            return Err(OrmError::MissingPrimaryKey {
                model: self.name.to_string(),
            });
        }
        if inputs.is_empty() {
            return Ok(Expr::raw("1 = 0"));
        }
        let eb = ExprBuilder::new(dialect);
        if pk.len() == 1 {
            let values = inputs
                .into_iter()
                .map(|input| Ok(self.resolve_pk(input)?.remove(0).1))
                .collect::<OrmResult<Vec<Value>>>()?;
            return Ok(eb.in_list(col(pk[0]), values));
        }
        let groups = inputs
            .into_iter()
            .map(|input| Ok(Expr::template("(?)", [self.pk_predicate(dialect, input)?])))
            .collect::<OrmResult<Vec<Expr>>>()?;
        if groups.len() == 1 {
            return Ok(groups.into_iter().next().unwrap_or_else(|| Expr::raw("1 = 0")));
        }
        Ok(Expr::template("(?)", [Expr::join(" OR ", groups)]))
    }
}

/// Which rows of a soft-deleting table a statement sees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SoftDeleteMode {
    /// Only live rows.
    #[default]
    Exclude,
    /// Live and deleted rows.
    Include,
    /// Only deleted rows.
    Only,
}

impl SoftDeleteMode {
    /// The filter for `column`, or `None` when every row is visible.
    pub fn predicate(self, column: &str) -> Option<Expr> {
        let c = col(column);
        match self {
            SoftDeleteMode::Exclude => Some(Expr::template("? IS NULL", [c.into_expr()])),
            SoftDeleteMode::Only => Some(Expr::template("? IS NOT NULL", [c.into_expr()])),
            SoftDeleteMode::Include => None,
        }
    }
}

/// Primary-key input for `where_pk`/`where_pk_in`.
#[derive(Debug, Clone, PartialEq)]
pub enum PkInput {
    /// A single-column key.
    Value(Value),
    /// A composite key as `(column, value)` pairs.
    Map(Vec<(String, Value)>),
}

impl PkInput {
    pub fn map<K, V, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        PkInput::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

macro_rules! impl_pk_input {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for PkInput {
                fn from(v: $ty) -> Self {
                    PkInput::Value(Value::from(v))
                }
            }
        )*
    };
}

impl_pk_input!(i16, i32, i64, u32, &str, String, uuid::Uuid, Value);

/// Accessors for one primary-key field of `M`.
pub struct PrimaryKeyField<M> {
    pub column: &'static str,
    pub getter: fn(&M) -> Value,
    pub setter: fn(&mut M, Value) -> OrmResult<()>,
}

impl<M> PrimaryKeyField<M> {
    pub fn get(&self, model: &M) -> Value {
        (self.getter)(model)
    }

    pub fn set(&self, model: &mut M, value: Value) -> OrmResult<()> {
        (self.setter)(model, value)
    }
}

impl<M> Clone for PrimaryKeyField<M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M> Copy for PrimaryKeyField<M> {}

impl<M> std::fmt::Debug for PrimaryKeyField<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrimaryKeyField")
            .field("column", &self.column)
            .finish()
    }
}

/// A struct mapped to a table. Usually derived with `#[derive(Model)]`.
pub trait Model: Sized + Send + Sync + 'static {
    fn table_meta() -> &'static TableMeta;

    /// Writable column values, in declaration order. Read-only columns are skipped.
    fn values(&self) -> Vec<(&'static str, Value)>;

    fn primary_key_fields() -> &'static [PrimaryKeyField<Self>] {
        &[]
    }

    fn pk_values(&self) -> OrmResult<Vec<(&'static str, Value)>> {
        let fields = Self::primary_key_fields();
        if fields.is_empty() {
            return Err(OrmError::MissingPrimaryKey {
                model: Self::table_meta().name().to_string(),
            });
        }
        Ok(fields.iter().map(|f| (f.column, f.get(self))).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;

    struct Account {
        tenant: i64,
        id: i64,
        name: String,
    }

    impl Model for Account {
        fn table_meta() -> &'static TableMeta {
            static META: OnceLock<TableMeta> = OnceLock::new();
            META.get_or_init(|| {
                TableMeta::new("accounts")
                    .with_alias("a")
                    .with_column(ColumnMeta::new("tenant", "tenant").primary_key())
                    .with_column(ColumnMeta::new("id", "id").primary_key())
                    .with_column(ColumnMeta::new("name", "name"))
            })
        }

        fn values(&self) -> Vec<(&'static str, Value)> {
            vec![
                ("tenant", self.tenant.into()),
                ("id", self.id.into()),
                ("name", self.name.clone().into()),
            ]
        }

        fn primary_key_fields() -> &'static [PrimaryKeyField<Self>] {
            const FIELDS: &[PrimaryKeyField<Account>] = &[
                PrimaryKeyField {
                    column: "tenant",
                    getter: |m| Value::Int(m.tenant),
                    setter: |m, v| {
                        m.tenant = crate::value::FromValue::from_value(v)?;
                        Ok(())
                    },
                },
                PrimaryKeyField {
                    column: "id",
                    getter: |m| Value::Int(m.id),
                    setter: |m, v| {
                        m.id = crate::value::FromValue::from_value(v)?;
                        Ok(())
                    },
                },
            ];
            FIELDS
        }
    }

    #[test]
    fn metadata_lookup() {
        let meta = Account::table_meta();
        assert_eq!(meta.alias(), "a");
        assert_eq!(meta.primary_key(), ["tenant", "id"]);
        assert!(meta.column("name").is_ok());
        assert!(matches!(
            meta.column("nope"),
            Err(OrmError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn composite_key_requires_every_field() {
        let meta = Account::table_meta();
        let err = meta.resolve_pk(PkInput::from(5)).unwrap_err();
        assert!(matches!(err, OrmError::MissingKey { field } if field == "id"));

        let err = meta
            .resolve_pk(PkInput::map([("tenant", 1)]))
            .unwrap_err();
        assert!(matches!(err, OrmError::MissingKey { field } if field == "id"));

        let ok = meta
            .resolve_pk(PkInput::map([("id", 2), ("tenant", 1)]))
            .unwrap();
        assert_eq!(ok, vec![("tenant", Value::Int(1)), ("id", Value::Int(2))]);
    }

    #[test]
    fn composite_key_rejects_unknown_columns() {
        let meta = Account::table_meta();
        let err = meta
            .resolve_pk(PkInput::map([("tenant", 1), ("id", 2), ("region", 3)]))
            .unwrap_err();
        assert!(matches!(err, OrmError::UnknownColumn { column, .. } if column == "region"));

        let err = meta
            .pk_in_predicate(
                Dialect::MySql,
                vec![PkInput::map([("tenant", 1), ("id", 2), ("idd", 2)])],
            )
            .unwrap_err();
        assert!(matches!(err, OrmError::UnknownColumn { column, .. } if column == "idd"));
    }

    #[test]
    fn pk_in_needs_a_primary_key_even_when_empty() {
        let keyless = TableMeta::new("events").with_column(ColumnMeta::new("payload", "payload"));
        let err = keyless.pk_in_predicate(Dialect::Sqlite, Vec::new()).unwrap_err();
        assert!(matches!(err, OrmError::MissingPrimaryKey { model } if model == "events"));

        let e = Account::table_meta()
            .pk_in_predicate(Dialect::Sqlite, Vec::new())
            .unwrap();
        assert_eq!(e.to_sql(Dialect::Sqlite).unwrap().0, "1 = 0");
    }

    #[test]
    fn pk_accessors_round_trip() {
        let mut a = Account {
            tenant: 1,
            id: 2,
            name: "x".into(),
        };
        assert_eq!(
            a.pk_values().unwrap(),
            vec![("tenant", Value::Int(1)), ("id", Value::Int(2))]
        );
        Account::primary_key_fields()[1].set(&mut a, Value::Int(9)).unwrap();
        assert_eq!(a.id, 9);
        assert_eq!(a.name, "x");
    }

    #[test]
    fn composite_pk_in_renders_or_groups() {
        let meta = Account::table_meta();
        let e = meta
            .pk_in_predicate(
                Dialect::Postgres,
                vec![
                    PkInput::map([("tenant", 1), ("id", 2)]),
                    PkInput::map([("tenant", 1), ("id", 3)]),
                ],
            )
            .unwrap();
        assert_eq!(
            e.to_sql(Dialect::Postgres).unwrap().0,
            "((tenant = $1 AND id = $2) OR (tenant = $3 AND id = $4))"
        );
    }

    #[test]
    fn soft_delete_modes() {
        assert!(SoftDeleteMode::Include.predicate("deleted_at").is_none());
        let e = SoftDeleteMode::Exclude.predicate("deleted_at").unwrap();
        assert_eq!(e.to_sql(Dialect::MySql).unwrap().0, "deleted_at IS NULL");
    }
}
