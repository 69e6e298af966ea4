//! UPDATE query builder.

use std::collections::HashMap;

use serde::Serialize;

use crate::condition::ConditionBuilder;
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::expr::{Expr, IntoExpr, Renderer};
use crate::ident::Ident;
use crate::model::{Model, SoftDeleteMode, TableMeta};
use crate::value::Value;

use super::traits::{MutationQb, SqlQb};
use super::{Returning, impl_where_shortcuts, record, render_assignments};

/// UPDATE query builder. Renders without a table alias.
#[derive(Clone, Debug)]
#[must_use]
pub struct UpdateQb {
    dialect: Dialect,
    table: Option<Ident>,
    meta: Option<&'static TableMeta>,
    sets: Vec<(Ident, Expr)>,
    conditions: ConditionBuilder,
    returning: Returning,
    soft_delete: SoftDeleteMode,
    named: HashMap<String, Ident>,
    build_error: Option<OrmError>,
}

impl UpdateQb {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            table: None,
            meta: None,
            sets: Vec::new(),
            conditions: ConditionBuilder::new(dialect),
            returning: Returning::default(),
            soft_delete: SoftDeleteMode::default(),
            named: HashMap::new(),
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
        self.meta = None;
        self
    }

    pub fn model<M: Model>(mut self) -> Self {
        let meta = M::table_meta();
        match Ident::parse(meta.name()) {
            Ok(ident) => self.table = Some(ident),
            Err(err) => self.fail(err),
        }
        self.meta = Some(meta);
        self
    }

    fn assign(&mut self, column: &str, value: Expr) {
        match Ident::parse(column) {
            Ok(ident) => match self.sets.iter().position(|(c, _)| *c == ident) {
                Some(pos) => self.sets[pos].1 = value,
                None => self.sets.push((ident, value)),
            },
            Err(err) => self.fail(err),
        }
    }

    pub fn set(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.assign(column, Expr::value(value));
        self
    }

    /// `column = expr`, e.g. `eb.add(col("views"), 1)`.
    pub fn set_expr(mut self, column: &str, expr: impl IntoExpr) -> Self {
        self.assign(column, expr.into_expr());
        self
    }

    pub fn set_json(mut self, column: &str, value: &impl Serialize) -> Self {
        match serde_json::to_value(value) {
            Ok(json) => self.assign(column, Expr::value(Value::Json(json))),
            Err(err) => self.fail(err.into()),
        }
        self
    }

    /// Assign every writable column of `model` except its primary key.
    pub fn set_model<M: Model>(mut self, model: &M) -> Self {
        if self.table.is_none() {
            self = self.model::<M>();
        }
        let meta = M::table_meta();
        for (column, value) in model.values() {
            let is_pk = meta.column(column).is_ok_and(|c| c.is_primary_key());
            if !is_pk {
                self.assign(column, Expr::value(value));
            }
        }
        self
    }

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

    /// Also update soft-deleted rows.
    pub fn with_deleted(mut self) -> Self {
        self.soft_delete = SoftDeleteMode::Include;
        self
    }

    /// Only update soft-deleted rows.
    pub fn only_deleted(mut self) -> Self {
        self.soft_delete = SoftDeleteMode::Only;
        self
    }

    pub fn soft_delete_mode(mut self, mode: SoftDeleteMode) -> Self {
        self.soft_delete = mode;
        self
    }

    fn render(&self, r: &mut Renderer) -> OrmResult<()> {
        if let Some(err) = &self.build_error {
            return Err(err.clone());
        }
        let Some(table) = &self.table else {
            return Err(OrmError::validation("update has no target table"));
        };
        if self.sets.is_empty() {
            return Err(OrmError::validation("update has no SET assignments"));
        }
        r.scoped(None, &self.named, |r| {
            r.push("UPDATE ");
            r.push_ident(table);
            r.push(" SET ");
            render_assignments(&self.sets, r)?;
            self.returning.render_output("INSERTED", r)?;

            let mut predicates = Vec::new();
            predicates.extend(self.conditions.to_expr());
            if let Some(column) = self.meta.and_then(TableMeta::soft_delete) {
                predicates.extend(self.soft_delete.predicate(column));
            }
            if !predicates.is_empty() {
                r.push(" WHERE ");
                r.push_expr(&Expr::join(" AND ", predicates))?;
            }
            self.returning.render_returning(r)
        })
    }
}

impl_where_shortcuts!(UpdateQb);

impl SqlQb for UpdateQb {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn to_sql(&self) -> OrmResult<(String, Vec<Value>)> {
        let mut r = Renderer::new(self.dialect);
        self.render(&mut r)?;
        Ok(r.finish())
    }
}

impl MutationQb for UpdateQb {}
