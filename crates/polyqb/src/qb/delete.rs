//! DELETE query builder.

use std::collections::HashMap;

use crate::condition::ConditionBuilder;
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::expr::{Expr, ExprBuilder, Renderer};
use crate::ident::Ident;
use crate::model::{Model, SoftDeleteMode, TableMeta};
use crate::value::Value;

use super::traits::{MutationQb, SqlQb};
use super::{Returning, impl_where_shortcuts, record};

/// DELETE query builder.
///
/// A delete without conditions matches nothing (`WHERE 1=0`) unless
/// [`allow_delete_all`](Self::allow_delete_all) is set. On soft-deleting models the statement becomes an
/// `UPDATE` of the soft-delete column unless [`force_delete`](Self::force_delete) is set. Both forms
/// honor the [`SoftDeleteMode`]: by default only live rows are touched.
#[derive(Clone, Debug)]
#[must_use]
pub struct DeleteQb {
    dialect: Dialect,
    table: Option<Ident>,
    meta: Option<&'static TableMeta>,
    conditions: ConditionBuilder,
    allow_all: bool,
    force: bool,
    soft_delete: SoftDeleteMode,
    returning: Returning,
    named: HashMap<String, Ident>,
    build_error: Option<OrmError>,
}

impl DeleteQb {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            table: None,
            meta: None,
            conditions: ConditionBuilder::new(dialect),
            allow_all: false,
            force: false,
            soft_delete: SoftDeleteMode::default(),
            returning: Returning::default(),
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

    /// Permit a delete without conditions.
    pub fn allow_delete_all(mut self) -> Self {
        self.allow_all = true;
        self
    }

    /// Physically delete rows of a soft-deleting model.
    pub fn force_delete(mut self) -> Self {
        self.force = true;
        self
    }

    /// Also match soft-deleted rows. A soft delete keeps their original deletion time.
    pub fn with_deleted(mut self) -> Self {
        self.soft_delete = SoftDeleteMode::Include;
        self
    }

    /// Only match soft-deleted rows. Requires [`force_delete`](Self::force_delete).
    pub fn only_deleted(mut self) -> Self {
        self.soft_delete = SoftDeleteMode::Only;
        self
    }

    pub fn soft_delete_mode(mut self, mode: SoftDeleteMode) -> Self {
        self.soft_delete = mode;
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

    fn render(&self, r: &mut Renderer) -> OrmResult<()> {
        if let Some(err) = &self.build_error {
            return Err(err.clone());
        }
        let Some(table) = &self.table else {
            return Err(OrmError::validation("delete has no target table"));
        };
        let column = self.meta.and_then(TableMeta::soft_delete);
        let soft = column.filter(|_| !self.force);
        if soft.is_some() && self.soft_delete == SoftDeleteMode::Only {
            return Err(OrmError::validation(
                "only_deleted rows are already soft-deleted; use force_delete to remove them",
            ));
        }

        r.scoped(None, &self.named, |r| {
            let mut predicates = Vec::new();
            match self.conditions.to_expr() {
                Some(e) => predicates.push(e),
                None if self.allow_all => {}
                None => predicates.push(Expr::raw("1=0")),
            }
            if let Some(column) = column {
                predicates.extend(self.soft_delete.predicate(column));
            }

            match soft {
                Some(column) => {
                    let ident = Ident::parse(column)?;
                    r.push("UPDATE ");
                    r.push_ident(table);
                    r.push(" SET ");
                    r.push_ident(&ident);
                    r.push(" = ");
                    let now = ExprBuilder::new(r.dialect()).now();
                    let stamp = match self.soft_delete {
                        SoftDeleteMode::Exclude => now,
                        _ => Expr::template("COALESCE(?, ?)", [Expr::ident(ident.clone()), now]),
                    };
                    r.push_expr(&stamp)?;
                    self.returning.render_output("INSERTED", r)?;
                }
                None => {
                    r.push("DELETE FROM ");
                    r.push_ident(table);
                    self.returning.render_output("DELETED", r)?;
                }
            }

            if !predicates.is_empty() {
                r.push(" WHERE ");
                r.push_expr(&Expr::join(" AND ", predicates))?;
            }
            self.returning.render_returning(r)
        })
    }
}

impl_where_shortcuts!(DeleteQb);

impl SqlQb for DeleteQb {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn to_sql(&self) -> OrmResult<(String, Vec<Value>)> {
        let mut r = Renderer::new(self.dialect);
        self.render(&mut r)?;
        Ok(r.finish())
    }
}

impl MutationQb for DeleteQb {}
