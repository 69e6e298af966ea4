//! INSERT query builder.

use serde::Serialize;

use crate::condition::ConditionBuilder;
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::expr::{Expr, IntoExpr, Renderer};
use crate::ident::Ident;
use crate::model::{Model, TableMeta};
use crate::value::Value;

use super::traits::{MutationQb, SqlQb};
use super::{Returning, SelectQb, record, render_assignments};

#[derive(Clone, Debug)]
enum ConflictSet {
    /// Take the value proposed for insertion.
    Excluded,
    Expr(Expr),
}

#[derive(Clone, Debug)]
enum ConflictAction {
    Nothing,
    Update {
        sets: Vec<(Ident, ConflictSet)>,
        condition: Option<Expr>,
    },
}

#[derive(Clone, Debug)]
struct Conflict {
    target: Vec<Ident>,
    action: ConflictAction,
}

/// INSERT query builder.
///
/// Columns come from [`set`](Self::set) calls or from the first [`values`](Self::values) row; later rows
/// must supply the same columns.
#[derive(Clone, Debug)]
#[must_use]
pub struct InsertQb {
    dialect: Dialect,
    table: Option<Ident>,
    meta: Option<&'static TableMeta>,
    columns: Vec<Ident>,
    rows: Vec<Vec<Expr>>,
    select: Option<Box<SelectQb>>,
    conflict: Option<Conflict>,
    returning: Returning,
    build_error: Option<OrmError>,
}

impl InsertQb {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            table: None,
            meta: None,
            columns: Vec::new(),
            rows: Vec::new(),
            select: None,
            conflict: None,
            returning: Returning::default(),
            build_error: None,
        }
    }

    fn fail(&mut self, err: OrmError) {
        record(&mut self.build_error, err);
    }

    pub fn table(mut self, table: &str) -> Self {
        match Ident::parse(table) {
            Ok(ident) => self.table = Some(ident),
            Err(err) => self.fail(err),
        }
        self
    }

    /// Insert into a model's table.
    pub fn model<M: Model>(mut self) -> Self {
        self.bind_model(M::table_meta());
        self
    }

    fn bind_model(&mut self, meta: &'static TableMeta) {
        match Ident::parse(meta.name()) {
            Ok(ident) => self.table = Some(ident),
            Err(err) => self.fail(err),
        }
        self.meta = Some(meta);
    }

    fn assign(&mut self, column: &str, value: Expr) {
        let ident = match Ident::parse(column) {
            Ok(ident) => ident,
            Err(err) => return self.fail(err),
        };
        if self.rows.len() > 1 {
            return self.fail(OrmError::validation(
                "set cannot be combined with multi-row values",
            ));
        }
        if self.rows.is_empty() {
            self.rows.push(Vec::new());
        }
        match self.columns.iter().position(|c| *c == ident) {
            Some(pos) => self.rows[0][pos] = value,
            None => {
                self.columns.push(ident);
                self.rows[0].push(value);
            }
        }
    }

    /// Set one column of a single-row insert to a bound value.
    pub fn set(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.assign(column, Expr::value(value));
        self
    }

    /// Set one column to an expression.
    pub fn set_expr(mut self, column: &str, expr: impl IntoExpr) -> Self {
        self.assign(column, expr.into_expr());
        self
    }

    /// Set one column to the JSON encoding of `value`.
    pub fn set_json(mut self, column: &str, value: &impl Serialize) -> Self {
        match serde_json::to_value(value) {
            Ok(json) => self.assign(column, Expr::value(Value::Json(json))),
            Err(err) => self.fail(err.into()),
        }
        self
    }

    fn push_row(&mut self, pairs: Vec<(String, Expr)>) -> OrmResult<()> {
        let mut parsed = pairs
            .into_iter()
            .map(|(k, v)| Ok((Ident::parse(&k)?, v)))
            .collect::<OrmResult<Vec<_>>>()?;
        if self.rows.is_empty() {
            let (columns, values) = parsed.into_iter().unzip();
            self.columns = columns;
            self.rows.push(values);
            return Ok(());
        }
        if parsed.len() != self.columns.len() {
            return Err(OrmError::validation(format!(
                "insert row has {} columns, expected {}",
                parsed.len(),
                self.columns.len()
            )));
        }
        let mut row = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let pos = parsed.iter().position(|(c, _)| c == column).ok_or_else(|| {
                OrmError::validation(format!(
                    "insert row is missing column '{}'",
                    column.last()
                ))
            })?;
            row.push(parsed.swap_remove(pos).1);
        }
        self.rows.push(row);
        Ok(())
    }

    /// Add a row of `(column, value)` pairs.
    pub fn values<I, K, V>(mut self, row: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: IntoExpr,
    {
        let pairs = row
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.into_expr()))
            .collect();
        if let Err(err) = self.push_row(pairs) {
            self.fail(err);
        }
        self
    }

    /// Add a row from a model's writable columns.
    pub fn model_value<M: Model>(mut self, model: &M) -> Self {
        if self.table.is_none() {
            self.bind_model(M::table_meta());
        }
        let pairs = model
            .values()
            .into_iter()
            .map(|(k, v)| (k.to_string(), Expr::value(v)))
            .collect();
        if let Err(err) = self.push_row(pairs) {
            self.fail(err);
        }
        self
    }

    pub fn model_values<'m, M: Model>(self, models: impl IntoIterator<Item = &'m M>) -> Self {
        models
            .into_iter()
            .fold(self, |qb, model| qb.model_value(model))
    }

    /// `INSERT INTO t (cols) SELECT ..`.
    pub fn from_select(mut self, columns: &[&str], query: SelectQb) -> Self {
        match columns
            .iter()
            .map(|c| Ident::parse(c))
            .collect::<OrmResult<Vec<_>>>()
        {
            Ok(columns) => {
                self.columns = columns;
                self.rows.clear();
                self.select = Some(Box::new(query));
            }
            Err(err) => self.fail(err),
        }
        self
    }

    /// Columns to return. Postgres and SQLite use `RETURNING`, SQL Server `OUTPUT INSERTED.*`.
    pub fn returning<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for c in columns {
            if let Err(err) = self.returning.push(c.as_ref()) {
                self.fail(err);
            }
        }
        self
    }

    /// Start a conflict clause for the given unique columns.
    pub fn on_conflict<I, S>(mut self, columns: I) -> OnConflictQb
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut target = Vec::new();
        for c in columns {
            match Ident::parse(c.as_ref()) {
                Ok(ident) => target.push(ident),
                Err(err) => self.fail(err),
            }
        }
        OnConflictQb {
            insert: self,
            target,
        }
    }

    fn render(&self, r: &mut Renderer) -> OrmResult<()> {
        if let Some(err) = &self.build_error {
            return Err(err.clone());
        }
        let Some(table) = &self.table else {
            return Err(OrmError::validation("insert has no target table"));
        };
        let dialect = r.dialect();
        let ignore = dialect == Dialect::MySql
            && matches!(
                self.conflict,
                Some(Conflict {
                    action: ConflictAction::Nothing,
                    ..
                })
            );
        r.push(if ignore { "INSERT IGNORE INTO " } else { "INSERT INTO " });
        r.push_ident(table);

        if let Some(select) = &self.select {
            self.render_columns(r);
            self.returning.render_output("INSERTED", r)?;
            r.push(" ");
            select.render_into(r)?;
        } else if self.columns.is_empty() {
            match dialect {
                Dialect::MySql => {
                    r.push(" () VALUES ()");
                }
                Dialect::Oracle => return Err(OrmError::unsupported("default_values", dialect)),
                _ => {
                    self.returning.render_output("INSERTED", r)?;
                    r.push(" DEFAULT VALUES");
                }
            }
        } else {
            self.render_columns(r);
            self.returning.render_output("INSERTED", r)?;
            self.render_rows(r)?;
        }

        self.render_conflict(r)?;
        self.returning.render_returning(r)
    }

    fn render_columns(&self, r: &mut Renderer) {
        r.push(" (");
        for (i, c) in self.columns.iter().enumerate() {
            if i > 0 {
                r.push(", ");
            }
            r.push_ident(c);
        }
        r.push(")");
    }

    fn render_rows(&self, r: &mut Renderer) -> OrmResult<()> {
        // Oracle has no multi-row VALUES.
        if r.dialect() == Dialect::Oracle && self.rows.len() > 1 {
            for (i, row) in self.rows.iter().enumerate() {
                r.push(if i == 0 { " SELECT " } else { " UNION ALL SELECT " });
                r.push_list(row, ", ")?;
                r.push(" FROM DUAL");
            }
            return Ok(());
        }
        r.push(" VALUES ");
        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 {
                r.push(", ");
            }
            r.push("(");
            r.push_list(row, ", ")?;
            r.push(")");
        }
        Ok(())
    }

    fn render_conflict(&self, r: &mut Renderer) -> OrmResult<()> {
        let Some(conflict) = &self.conflict else {
            return Ok(());
        };
        let dialect = r.dialect();
        match dialect {
            Dialect::Oracle | Dialect::SqlServer => {
                Err(OrmError::unsupported("on_conflict", dialect))
            }
            Dialect::MySql => match &conflict.action {
                ConflictAction::Nothing => Ok(()),
                ConflictAction::Update { condition: Some(_), .. } => {
                    Err(OrmError::unsupported("on_conflict_where", dialect))
                }
                ConflictAction::Update { sets, .. } => {
                    r.push(" ON DUPLICATE KEY UPDATE ");
                    render_conflict_sets(sets, "VALUES(?)", r)
                }
            },
            Dialect::Postgres | Dialect::Sqlite => {
                r.push(" ON CONFLICT");
                if !conflict.target.is_empty() {
                    r.push(" (");
                    for (i, c) in conflict.target.iter().enumerate() {
                        if i > 0 {
                            r.push(", ");
                        }
                        r.push_ident(c);
                    }
                    r.push(")");
                }
                match &conflict.action {
                    ConflictAction::Nothing => {
                        r.push(" DO NOTHING");
                        Ok(())
                    }
                    ConflictAction::Update { sets, condition } => {
                        if conflict.target.is_empty() {
                            return Err(OrmError::validation(
                                "ON CONFLICT DO UPDATE needs conflict columns",
                            ));
                        }
                        r.push(" DO UPDATE SET ");
                        render_conflict_sets(sets, "EXCLUDED.?", r)?;
                        if let Some(condition) = condition {
                            r.push(" WHERE ");
                            r.push_expr(condition)?;
                        }
                        Ok(())
                    }
                }
            }
        }
    }
}

fn render_conflict_sets(
    sets: &[(Ident, ConflictSet)],
    excluded: &'static str,
    r: &mut Renderer,
) -> OrmResult<()> {
    if sets.is_empty() {
        return Err(OrmError::validation("conflict update has no assignments"));
    }
    let assignments: Vec<(Ident, Expr)> = sets
        .iter()
        .map(|(c, set)| {
            let value = match set {
                ConflictSet::Excluded => Expr::template(excluded, [Expr::ident(c.clone())]),
                ConflictSet::Expr(e) => e.clone(),
            };
            (c.clone(), value)
        })
        .collect();
    render_assignments(&assignments, r)
}

/// Conflict clause under construction. Finish with [`do_nothing`](Self::do_nothing) or
/// [`do_update`](Self::do_update).
#[must_use]
pub struct OnConflictQb {
    insert: InsertQb,
    target: Vec<Ident>,
}

impl OnConflictQb {
    /// Skip conflicting rows (`INSERT IGNORE` on MySQL).
    pub fn do_nothing(mut self) -> InsertQb {
        self.insert.conflict = Some(Conflict {
            target: self.target,
            action: ConflictAction::Nothing,
        });
        self.insert
    }

    /// Update conflicting rows.
    pub fn do_update(self) -> OnConflictUpdateQb {
        let conditions = ConditionBuilder::new(self.insert.dialect);
        OnConflictUpdateQb {
            insert: self.insert,
            target: self.target,
            sets: Vec::new(),
            conditions,
        }
    }
}

/// Assignments for `DO UPDATE` / `ON DUPLICATE KEY UPDATE`, rendered in call order.
#[must_use]
pub struct OnConflictUpdateQb {
    insert: InsertQb,
    target: Vec<Ident>,
    sets: Vec<(Ident, ConflictSet)>,
    conditions: ConditionBuilder,
}

impl OnConflictUpdateQb {
    fn push(&mut self, column: &str, set: ConflictSet) {
        match Ident::parse(column) {
            Ok(ident) => self.sets.push((ident, set)),
            Err(err) => record(&mut self.insert.build_error, err),
        }
    }

    pub fn set(mut self, column: &str, value: impl IntoExpr) -> Self {
        self.push(column, ConflictSet::Expr(value.into_expr()));
        self
    }

    /// Overwrite `column` with the value proposed for insertion.
    pub fn set_excluded(mut self, column: &str) -> Self {
        self.push(column, ConflictSet::Excluded);
        self
    }

    /// Only update rows matching the condition. Postgres and SQLite only.
    pub fn where_(mut self, f: impl FnOnce(&mut ConditionBuilder)) -> Self {
        f(&mut self.conditions);
        self
    }

    pub fn finish(mut self) -> InsertQb {
        self.insert.conflict = Some(Conflict {
            target: self.target,
            action: ConflictAction::Update {
                sets: self.sets,
                condition: self.conditions.into_expr(),
            },
        });
        self.insert
    }
}

impl SqlQb for InsertQb {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn to_sql(&self) -> OrmResult<(String, Vec<Value>)> {
        let mut r = Renderer::new(self.dialect);
        self.render(&mut r)?;
        Ok(r.finish())
    }
}

impl MutationQb for InsertQb {}
