//! MERGE query builder.
//!
//! Postgres (15+, `NOT MATCHED BY SOURCE` from 17) and SQL Server take the standard form. Oracle only
//! accepts one matched `UPDATE` (optionally followed by `DELETE WHERE`) and one not-matched `INSERT`, with
//! guards written as `WHERE`. MySQL and SQLite have no MERGE.

use std::fmt;

use crate::condition::ConditionBuilder;
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::expr::{Expr, IntoExpr, Renderer};
use crate::ident::Ident;
use crate::model::Model;
use crate::value::Value;

use super::traits::{MutationQb, SqlQb};
use super::{SelectQb, model_table, record, render_assignments};

/// What a `WHEN` branch does.
#[derive(Clone, Debug)]
pub enum MergeAction {
    /// `UPDATE SET col = expr, ..`
    Update(Vec<(String, Expr)>),
    /// `INSERT (cols) VALUES (exprs)`
    Insert(Vec<String>, Vec<Expr>),
    Delete,
    /// Postgres only.
    DoNothing,
}

impl MergeAction {
    pub fn update<I, K, V>(sets: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: IntoExpr,
    {
        MergeAction::Update(
            sets.into_iter()
                .map(|(k, v)| (k.into(), v.into_expr()))
                .collect(),
        )
    }

    pub fn insert<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: IntoExpr,
    {
        let (columns, values) = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into_expr()))
            .unzip();
        MergeAction::Insert(columns, values)
    }
}

type Guard = Box<dyn FnOnce(&mut ConditionBuilder) + Send>;

/// One `WHEN` branch: an action with an optional extra condition.
pub struct MergeWhen {
    action: MergeAction,
    guard: Option<Guard>,
}

impl MergeWhen {
    pub fn new(action: MergeAction) -> Self {
        Self {
            action,
            guard: None,
        }
    }

    /// `WHEN .. AND <condition> THEN`.
    pub fn and_(mut self, f: impl FnOnce(&mut ConditionBuilder) + Send + 'static) -> Self {
        self.guard = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for MergeWhen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergeWhen")
            .field("action", &self.action)
            .field("guarded", &self.guard.is_some())
            .finish()
    }
}

impl From<MergeAction> for MergeWhen {
    fn from(action: MergeAction) -> Self {
        MergeWhen::new(action)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Branch {
    Matched,
    NotMatched,
    NotMatchedBySource,
}

#[derive(Clone, Debug)]
struct Clause {
    branch: Branch,
    guard: Option<Expr>,
    action: MergeAction,
}

#[derive(Clone, Debug)]
enum MergeSource {
    Table { name: Ident, alias: Ident },
    Subquery { query: Box<SelectQb>, alias: Ident },
}

/// MERGE query builder. Reference target and source columns with dotted names (`t.id`, `s.id`).
#[derive(Clone, Debug)]
#[must_use]
pub struct MergeQb {
    dialect: Dialect,
    target: Option<(Ident, Option<Ident>)>,
    source: Option<MergeSource>,
    on: Option<Expr>,
    clauses: Vec<Clause>,
    build_error: Option<OrmError>,
}

impl MergeQb {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            target: None,
            source: None,
            on: None,
            clauses: Vec::new(),
            build_error: None,
        }
    }

    fn fail(&mut self, err: OrmError) {
        record(&mut self.build_error, err);
    }

    pub fn into(mut self, table: &str) -> Self {
        match Ident::parse(table) {
            Ok(name) => self.target = Some((name, None)),
            Err(err) => self.fail(err),
        }
        self
    }

    pub fn into_as(mut self, table: &str, alias: &str) -> Self {
        match (Ident::parse(table), Ident::parse(alias)) {
            (Ok(name), Ok(alias)) => self.target = Some((name, Some(alias))),
            (Err(err), _) | (_, Err(err)) => self.fail(err),
        }
        self
    }

    /// Merge into a model's table under its alias.
    pub fn into_model<M: Model>(mut self) -> Self {
        match model_table(M::table_meta()) {
            Ok(target) => self.target = Some(target),
            Err(err) => self.fail(err),
        }
        self
    }

    pub fn using_table(mut self, table: &str, alias: &str) -> Self {
        match (Ident::parse(table), Ident::parse(alias)) {
            (Ok(name), Ok(alias)) => self.source = Some(MergeSource::Table { name, alias }),
            (Err(err), _) | (_, Err(err)) => self.fail(err),
        }
        self
    }

    pub fn using_subquery(mut self, query: SelectQb, alias: &str) -> Self {
        match Ident::parse(alias) {
            Ok(alias) => {
                self.source = Some(MergeSource::Subquery {
                    query: Box::new(query),
                    alias,
                })
            }
            Err(err) => self.fail(err),
        }
        self
    }

    /// The join condition between target and source.
    pub fn on(mut self, f: impl FnOnce(&mut ConditionBuilder)) -> Self {
        let mut c = ConditionBuilder::new(self.dialect);
        f(&mut c);
        self.on = c.into_expr();
        self
    }

    fn push_clause(mut self, branch: Branch, when: MergeWhen) -> Self {
        let guard = when.guard.and_then(|f| {
            let mut c = ConditionBuilder::new(self.dialect);
            f(&mut c);
            c.into_expr()
        });
        let allowed = match (&when.action, branch) {
            (MergeAction::DoNothing, _) => true,
            (MergeAction::Insert(..), Branch::NotMatched) => true,
            (MergeAction::Insert(..), _) => false,
            (MergeAction::Update(_) | MergeAction::Delete, Branch::NotMatched) => false,
            (MergeAction::Update(_) | MergeAction::Delete, _) => true,
        };
        if !allowed {
            self.fail(OrmError::validation(format!(
                "merge action {} is not valid for {branch:?}",
                action_name(&when.action)
            )));
            return self;
        }
        self.clauses.push(Clause {
            branch,
            guard,
            action: when.action,
        });
        self
    }

    pub fn when_matched(self, when: impl Into<MergeWhen>) -> Self {
        self.push_clause(Branch::Matched, when.into())
    }

    pub fn when_not_matched(self, when: impl Into<MergeWhen>) -> Self {
        self.push_clause(Branch::NotMatched, when.into())
    }

    /// Target rows without a source match. Postgres 17+ and SQL Server.
    pub fn when_not_matched_by_source(self, when: impl Into<MergeWhen>) -> Self {
        self.push_clause(Branch::NotMatchedBySource, when.into())
    }

    fn render(&self, r: &mut Renderer) -> OrmResult<()> {
        if let Some(err) = &self.build_error {
            return Err(err.clone());
        }
        let dialect = r.dialect();
        if matches!(dialect, Dialect::MySql | Dialect::Sqlite) {
            return Err(OrmError::unsupported("merge", dialect));
        }
        let Some((table, alias)) = &self.target else {
            return Err(OrmError::validation("merge has no target table"));
        };
        let Some(source) = &self.source else {
            return Err(OrmError::validation("merge has no source"));
        };
        let Some(on) = &self.on else {
            return Err(OrmError::validation("merge has no ON condition"));
        };
        if self.clauses.is_empty() {
            return Err(OrmError::validation("merge has no WHEN clauses"));
        }

        r.push("MERGE INTO ");
        r.push_ident(table);
        if let Some(alias) = alias {
            r.push_table_alias(alias);
        }
        r.push(" USING ");
        match source {
            MergeSource::Table { name, alias } => {
                r.push_ident(name);
                r.push_table_alias(alias);
            }
            MergeSource::Subquery { query, alias } => {
                r.push("(");
                query.render_into(r)?;
                r.push(")");
                r.push_table_alias(alias);
            }
        }

        if dialect == Dialect::Oracle {
            r.push(" ON (");
            r.push_expr(on)?;
            r.push(")");
            return self.render_oracle_clauses(r);
        }

        r.push(" ON ");
        r.push_expr(on)?;
        for clause in &self.clauses {
            r.push(match (clause.branch, dialect) {
                (Branch::Matched, _) => " WHEN MATCHED",
                (Branch::NotMatched, Dialect::SqlServer) => " WHEN NOT MATCHED BY TARGET",
                (Branch::NotMatched, _) => " WHEN NOT MATCHED",
                (Branch::NotMatchedBySource, _) => " WHEN NOT MATCHED BY SOURCE",
            });
            if let Some(guard) = &clause.guard {
                r.push(" AND ");
                r.push_expr(guard)?;
            }
            r.push(" THEN ");
            render_action(&clause.action, r)?;
        }
        if dialect == Dialect::SqlServer {
            r.push(";");
        }
        Ok(())
    }

    fn render_oracle_clauses(&self, r: &mut Renderer) -> OrmResult<()> {
        let shape_error = || OrmError::unsupported("merge_clause_shape", Dialect::Oracle);
        let mut update: Option<&Clause> = None;
        let mut delete: Option<&Clause> = None;
        let mut insert: Option<&Clause> = None;
        for clause in &self.clauses {
            let slot = match (&clause.action, clause.branch) {
                (MergeAction::Update(_), Branch::Matched) => &mut update,
                (MergeAction::Delete, Branch::Matched) if update.is_some() => &mut delete,
                (MergeAction::Insert(..), Branch::NotMatched) => &mut insert,
                _ => return Err(shape_error()),
            };
            if slot.replace(clause).is_some() {
                return Err(shape_error());
            }
        }

        if let Some(clause) = update {
            r.push(" WHEN MATCHED THEN ");
            render_action(&clause.action, r)?;
            if let Some(guard) = &clause.guard {
                r.push(" WHERE ");
                r.push_expr(guard)?;
            }
            if let Some(delete) = delete {
                r.push(" DELETE WHERE ");
                match &delete.guard {
                    Some(guard) => r.push_expr(guard)?,
                    None => {
                        r.push("1=1");
                    }
                }
            }
        }
        if let Some(clause) = insert {
            r.push(" WHEN NOT MATCHED THEN ");
            render_action(&clause.action, r)?;
            if let Some(guard) = &clause.guard {
                r.push(" WHERE ");
                r.push_expr(guard)?;
            }
        }
        Ok(())
    }
}

fn action_name(action: &MergeAction) -> &'static str {
    match action {
        MergeAction::Update(_) => "UPDATE",
        MergeAction::Insert(..) => "INSERT",
        MergeAction::Delete => "DELETE",
        MergeAction::DoNothing => "DO NOTHING",
    }
}

fn render_action(action: &MergeAction, r: &mut Renderer) -> OrmResult<()> {
    match action {
        MergeAction::Update(sets) => {
            if sets.is_empty() {
                return Err(OrmError::validation("merge UPDATE has no assignments"));
            }
            let sets = sets
                .iter()
                .map(|(c, v)| Ok((Ident::parse(c)?, v.clone())))
                .collect::<OrmResult<Vec<_>>>()?;
            r.push("UPDATE SET ");
            render_assignments(&sets, r)
        }
        MergeAction::Insert(columns, values) => {
            if columns.is_empty() || columns.len() != values.len() {
                return Err(OrmError::validation(
                    "merge INSERT needs one value per column",
                ));
            }
            r.push("INSERT (");
            for (i, c) in columns.iter().enumerate() {
                if i > 0 {
                    r.push(", ");
                }
                r.push_ident(&Ident::parse(c)?);
            }
            r.push(") VALUES (");
            r.push_list(values, ", ")?;
            r.push(")");
            Ok(())
        }
        MergeAction::Delete => {
            r.push("DELETE");
            Ok(())
        }
        MergeAction::DoNothing => match r.dialect() {
            Dialect::Postgres => {
                r.push("DO NOTHING");
                Ok(())
            }
            d => Err(OrmError::unsupported("merge_do_nothing", d)),
        },
    }
}

impl SqlQb for MergeQb {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn to_sql(&self) -> OrmResult<(String, Vec<Value>)> {
        let mut r = Renderer::new(self.dialect);
        self.render(&mut r)?;
        Ok(r.finish())
    }
}

impl MutationQb for MergeQb {}
