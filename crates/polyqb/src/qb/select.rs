//! SELECT query builder.

use std::collections::HashMap;

use crate::client::GenericClient;
use crate::condition::ConditionBuilder;
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::expr::{Expr, IntoColumn, IntoExpr, Renderer, col};
use crate::ident::Ident;
use crate::model::{Model, SoftDeleteMode, TableMeta};
use crate::value::{FromValue, Value};

use super::cte::{Cte, render_with};
use super::traits::SqlQb;
use super::{
    JoinKind, LockMode, LockWait, Nulls, Order, OrderItem, Pagination, SetOp, count_value,
    impl_where_shortcuts, model_table, parse_table, record, render_order,
};

#[derive(Clone, Debug)]
enum Source {
    Table { name: Ident, alias: Option<Ident> },
    Subquery { query: Box<SelectQb>, alias: Ident },
    Expr { expr: Expr, alias: Ident },
}

#[derive(Clone, Debug)]
enum JoinTarget {
    Table { name: Ident, alias: Option<Ident> },
    Subquery { query: Box<SelectQb>, alias: Ident },
}

#[derive(Clone, Debug)]
struct Join {
    kind: JoinKind,
    target: JoinTarget,
    on: Option<Expr>,
}

/// SELECT query builder.
///
/// Bare column names are qualified with the source alias when there is one: the model alias for
/// [`model`](Self::model), the given alias for [`table_as`](Self::table_as) and subqueries. Use dotted
/// names (`u.name`) to reference joined tables.
#[derive(Clone, Debug)]
#[must_use]
pub struct SelectQb {
    dialect: Dialect,
    ctes: Vec<Cte>,
    source: Option<Source>,
    scope: Option<Ident>,
    meta: Option<&'static TableMeta>,
    joins: Vec<Join>,
    distinct: bool,
    projection: Vec<Expr>,
    excluded: Vec<String>,
    conditions: ConditionBuilder,
    group_by: Vec<Expr>,
    having: ConditionBuilder,
    order: Vec<OrderItem>,
    limit: Option<u64>,
    offset: Option<u64>,
    lock: Option<(LockMode, LockWait)>,
    set_ops: Vec<(SetOp, SelectQb)>,
    soft_delete: SoftDeleteMode,
    named: HashMap<String, Ident>,
    build_error: Option<OrmError>,
}

impl SelectQb {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            ctes: Vec::new(),
            source: None,
            scope: None,
            meta: None,
            joins: Vec::new(),
            distinct: false,
            projection: Vec::new(),
            excluded: Vec::new(),
            conditions: ConditionBuilder::new(dialect),
            group_by: Vec::new(),
            having: ConditionBuilder::new(dialect),
            order: Vec::new(),
            limit: None,
            offset: None,
            lock: None,
            set_ops: Vec::new(),
            soft_delete: SoftDeleteMode::default(),
            named: HashMap::new(),
            build_error: None,
        }
    }

    fn fail(&mut self, err: OrmError) {
        record(&mut self.build_error, err);
    }

    // ==================== Sources ====================

    /// Select from a model's table under the model alias.
    pub fn model<M: Model>(mut self) -> Self {
        let meta = M::table_meta();
        match (model_table(meta), Ident::parse(meta.alias())) {
            (Ok((name, alias)), Ok(scope)) => {
                self.source = Some(Source::Table { name, alias });
                self.scope = Some(scope);
            }
            (Err(err), _) | (_, Err(err)) => self.fail(err),
        }
        self.meta = Some(meta);
        self
    }

    /// Select from `"table"` or `"table alias"`.
    pub fn table(mut self, table: &str) -> Self {
        match parse_table(table) {
            Ok((name, alias)) => {
                self.scope = alias.clone();
                self.source = Some(Source::Table { name, alias });
            }
            Err(err) => self.fail(err),
        }
        self.meta = None;
        self
    }

    pub fn table_as(mut self, table: &str, alias: &str) -> Self {
        match (Ident::parse(table), Ident::parse(alias)) {
            (Ok(name), Ok(alias)) => {
                self.scope = Some(alias.clone());
                self.source = Some(Source::Table {
                    name,
                    alias: Some(alias),
                });
            }
            (Err(err), _) | (_, Err(err)) => self.fail(err),
        }
        self.meta = None;
        self
    }

    /// `FROM (subquery) alias`.
    pub fn from_subquery(mut self, query: SelectQb, alias: &str) -> Self {
        match Ident::parse(alias) {
            Ok(alias) => {
                self.scope = Some(alias.clone());
                self.source = Some(Source::Subquery {
                    query: Box::new(query),
                    alias,
                });
            }
            Err(err) => self.fail(err),
        }
        self.meta = None;
        self
    }

    /// `FROM expr alias`, e.g. a table-valued function.
    pub fn from_expr(mut self, expr: impl IntoExpr, alias: &str) -> Self {
        match Ident::parse(alias) {
            Ok(alias) => {
                self.scope = Some(alias.clone());
                self.source = Some(Source::Expr {
                    expr: expr.into_expr(),
                    alias,
                });
            }
            Err(err) => self.fail(err),
        }
        self.meta = None;
        self
    }

    // ==================== CTEs ====================

    pub fn with(self, name: &str, query: SelectQb) -> Self {
        self.with_columns(name, &[], query)
    }

    /// `WITH name (cols) AS (query)`.
    pub fn with_columns(mut self, name: &str, columns: &[&str], query: SelectQb) -> Self {
        match cte_header(name, columns) {
            Ok((name, columns)) => self.ctes.push(Cte::new(name, columns, query)),
            Err(err) => self.fail(err),
        }
        self
    }

    /// `WITH RECURSIVE name (cols) AS (base UNION ALL recursive)`. Oracle needs the column list.
    pub fn with_recursive(
        mut self,
        name: &str,
        columns: &[&str],
        base: SelectQb,
        recursive: SelectQb,
    ) -> Self {
        match cte_header(name, columns) {
            Ok((name, columns)) => self
                .ctes
                .push(Cte::recursive(name, columns, base, recursive)),
            Err(err) => self.fail(err),
        }
        self
    }

    // ==================== Joins ====================

    fn on_clause(&self, on: impl FnOnce(&mut ConditionBuilder)) -> Option<Expr> {
        let mut c = ConditionBuilder::new(self.dialect);
        on(&mut c);
        c.into_expr()
    }

    fn push_join(mut self, kind: JoinKind, table: &str, on: Option<Expr>) -> Self {
        match parse_table(table) {
            Ok((name, alias)) => self.joins.push(Join {
                kind,
                target: JoinTarget::Table { name, alias },
                on,
            }),
            Err(err) => self.fail(err),
        }
        self
    }

    /// `INNER JOIN table ON ..`. `table` may carry an alias: `"users u"`.
    pub fn inner_join(self, table: &str, on: impl FnOnce(&mut ConditionBuilder)) -> Self {
        let on = self.on_clause(on);
        self.push_join(JoinKind::Inner, table, on)
    }

    pub fn left_join(self, table: &str, on: impl FnOnce(&mut ConditionBuilder)) -> Self {
        let on = self.on_clause(on);
        self.push_join(JoinKind::Left, table, on)
    }

    pub fn right_join(self, table: &str, on: impl FnOnce(&mut ConditionBuilder)) -> Self {
        let on = self.on_clause(on);
        self.push_join(JoinKind::Right, table, on)
    }

    /// `FULL OUTER JOIN`. MySQL has none and fails at render time.
    pub fn full_join(self, table: &str, on: impl FnOnce(&mut ConditionBuilder)) -> Self {
        let on = self.on_clause(on);
        self.push_join(JoinKind::Full, table, on)
    }

    pub fn cross_join(self, table: &str) -> Self {
        self.push_join(JoinKind::Cross, table, None)
    }

    /// Join a derived table.
    pub fn join_subquery(
        mut self,
        kind: JoinKind,
        query: SelectQb,
        alias: &str,
        on: impl FnOnce(&mut ConditionBuilder),
    ) -> Self {
        let on = if kind == JoinKind::Cross {
            None
        } else {
            self.on_clause(on)
        };
        match Ident::parse(alias) {
            Ok(alias) => self.joins.push(Join {
                kind,
                target: JoinTarget::Subquery {
                    query: Box::new(query),
                    alias,
                },
                on,
            }),
            Err(err) => self.fail(err),
        }
        self
    }

    /// Join a model's table under its alias.
    pub fn join_model<M: Model>(
        mut self,
        kind: JoinKind,
        on: impl FnOnce(&mut ConditionBuilder),
    ) -> Self {
        let on = if kind == JoinKind::Cross {
            None
        } else {
            self.on_clause(on)
        };
        match model_table(M::table_meta()) {
            Ok((name, alias)) => self.joins.push(Join {
                kind,
                target: JoinTarget::Table { name, alias },
                on,
            }),
            Err(err) => self.fail(err),
        }
        self
    }

    // ==================== Projection ====================

    pub fn column(mut self, column: impl IntoColumn) -> Self {
        self.projection.push(column.into_column());
        self
    }

    pub fn columns<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: IntoColumn,
    {
        self.projection
            .extend(columns.into_iter().map(IntoColumn::into_column));
        self
    }

    /// `expr AS alias`.
    pub fn column_expr(mut self, expr: impl IntoExpr, alias: &str) -> Self {
        match Ident::parse(alias) {
            Ok(alias) => self.projection.push(Expr::template(
                "? AS ?",
                [expr.into_expr(), Expr::ident(alias)],
            )),
            Err(err) => self.fail(err),
        }
        self
    }

    /// Select every model column except `columns`. Requires [`model`](Self::model).
    pub fn exclude<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    // ==================== Grouping and ordering ====================

    pub fn group_by(mut self, column: impl IntoColumn) -> Self {
        self.group_by.push(column.into_column());
        self
    }

    pub fn having(mut self, f: impl FnOnce(&mut ConditionBuilder)) -> Self {
        f(&mut self.having);
        self
    }

    pub fn order_by(mut self, column: impl IntoColumn) -> Self {
        self.order
            .push(OrderItem::new(column.into_column(), Order::Asc, None));
        self
    }

    pub fn order_by_desc(mut self, column: impl IntoColumn) -> Self {
        self.order
            .push(OrderItem::new(column.into_column(), Order::Desc, None));
        self
    }

    /// Order by any expression with explicit NULL placement.
    pub fn order_by_expr(mut self, expr: impl IntoExpr, order: Order, nulls: Option<Nulls>) -> Self {
        self.order.push(OrderItem::new(expr.into_expr(), order, nulls));
        self
    }

    // ==================== Pagination ====================

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    pub fn paginate(mut self, page: Pagination) -> Self {
        self.limit = Some(page.limit());
        self.offset = Some(page.offset());
        self
    }

    // ==================== Locking ====================

    /// `FOR UPDATE`. SQL Server renders `WITH (UPDLOCK, ROWLOCK)` table hints instead; SQLite fails.
    pub fn for_update(mut self, wait: LockWait) -> Self {
        self.lock = Some((LockMode::Update, wait));
        self
    }

    /// `FOR SHARE`. Oracle and SQLite fail.
    pub fn for_share(mut self, wait: LockWait) -> Self {
        self.lock = Some((LockMode::Share, wait));
        self
    }

    // ==================== Set operations ====================

    fn set_op(mut self, op: SetOp, query: SelectQb) -> Self {
        self.set_ops.push((op, query));
        self
    }

    pub fn union(self, query: SelectQb) -> Self {
        self.set_op(SetOp::Union, query)
    }

    pub fn union_all(self, query: SelectQb) -> Self {
        self.set_op(SetOp::UnionAll, query)
    }

    pub fn intersect(self, query: SelectQb) -> Self {
        self.set_op(SetOp::Intersect, query)
    }

    pub fn intersect_all(self, query: SelectQb) -> Self {
        self.set_op(SetOp::IntersectAll, query)
    }

    /// `EXCEPT` (`MINUS` on Oracle).
    pub fn except(self, query: SelectQb) -> Self {
        self.set_op(SetOp::Except, query)
    }

    pub fn except_all(self, query: SelectQb) -> Self {
        self.set_op(SetOp::ExceptAll, query)
    }

    // ==================== Soft delete ====================

    /// Include soft-deleted rows.
    pub fn with_deleted(mut self) -> Self {
        self.soft_delete = SoftDeleteMode::Include;
        self
    }

    /// Only soft-deleted rows.
    pub fn only_deleted(mut self) -> Self {
        self.soft_delete = SoftDeleteMode::Only;
        self
    }

    pub fn soft_delete_mode(mut self, mode: SoftDeleteMode) -> Self {
        self.soft_delete = mode;
        self
    }

    // ==================== Rendering ====================

    /// Render into a shared renderer, e.g. as a subquery of another statement.
    pub(crate) fn render_into(&self, r: &mut Renderer) -> OrmResult<()> {
        if let Some(err) = &self.build_error {
            return Err(err.clone());
        }
        r.scoped(self.scope.clone(), &self.named, |r| self.render_scoped(r))
    }

    fn render_scoped(&self, r: &mut Renderer) -> OrmResult<()> {
        if self.lock.is_some() && !self.set_ops.is_empty() {
            return Err(OrmError::validation(
                "row locks cannot be combined with set operations",
            ));
        }
        render_with(&self.ctes, r)?;
        self.render_core(r)?;
        for (op, query) in &self.set_ops {
            let keyword = op.keyword(r.dialect())?;
            r.push(" ");
            r.push(keyword);
            r.push(" ");
            query.render_operand(r)?;
        }
        if !self.order.is_empty() {
            r.push(" ORDER BY ");
            render_order(&self.order, r)?;
        }
        self.render_pagination(r)?;
        self.render_lock(r)
    }

    fn render_operand(&self, r: &mut Renderer) -> OrmResult<()> {
        if !self.order.is_empty()
            || self.limit.is_some()
            || self.offset.is_some()
            || self.lock.is_some()
            || !self.ctes.is_empty()
            || !self.set_ops.is_empty()
        {
            return Err(OrmError::validation(
                "set operation operands cannot carry ORDER BY, LIMIT, locks, CTEs or nested set operations",
            ));
        }
        self.render_into(r)
    }

    fn render_core(&self, r: &mut Renderer) -> OrmResult<()> {
        r.push("SELECT ");
        if self.distinct {
            r.push("DISTINCT ");
        }
        self.render_projection(r)?;
        r.push(" FROM ");
        match &self.source {
            None => return Err(OrmError::validation("select has no table source")),
            Some(Source::Table { name, alias }) => {
                r.push_ident(name);
                if let Some(alias) = alias {
                    r.push_table_alias(alias);
                }
                self.render_table_hint(r)?;
            }
            Some(Source::Subquery { query, alias }) => {
                r.push("(");
                query.render_into(r)?;
                r.push(")");
                r.push_table_alias(alias);
            }
            Some(Source::Expr { expr, alias }) => {
                r.push_expr(expr)?;
                r.push_table_alias(alias);
            }
        }
        if self.dialect == Dialect::SqlServer
            && self.lock.is_some()
            && !matches!(self.source, Some(Source::Table { .. }))
        {
            return Err(OrmError::validation(
                "SQL Server row locks need a table source",
            ));
        }

        for join in &self.joins {
            self.render_join(join, r)?;
        }

        let mut predicates = Vec::new();
        predicates.extend(self.conditions.to_expr());
        predicates.extend(self.soft_delete_predicate());
        if !predicates.is_empty() {
            r.push(" WHERE ");
            r.push_expr(&Expr::join(" AND ", predicates))?;
        }

        if !self.group_by.is_empty() {
            r.push(" GROUP BY ");
            r.push_list(&self.group_by, ", ")?;
        }
        if let Some(having) = self.having.to_expr() {
            r.push(" HAVING ");
            r.push_expr(&having)?;
        }
        Ok(())
    }

    fn render_projection(&self, r: &mut Renderer) -> OrmResult<()> {
        if self.excluded.is_empty() {
            if self.projection.is_empty() {
                r.push("*");
                return Ok(());
            }
            return r.push_list(&self.projection, ", ");
        }
        if !self.projection.is_empty() {
            return Err(OrmError::validation(
                "exclude cannot be combined with explicit columns",
            ));
        }
        let Some(meta) = self.meta else {
            return Err(OrmError::validation("exclude requires a model"));
        };
        for name in &self.excluded {
            meta.column(name)?;
        }
        let columns: Vec<Expr> = meta
            .columns()
            .iter()
            .filter(|c| !self.excluded.iter().any(|e| e == c.name()))
            .map(|c| col(c.name()).into_expr())
            .collect();
        if columns.is_empty() {
            return Err(OrmError::validation("exclude removed every column"));
        }
        r.push_list(&columns, ", ")
    }

    fn render_join(&self, join: &Join, r: &mut Renderer) -> OrmResult<()> {
        let keyword = join.kind.keyword(r.dialect())?;
        r.push(" ");
        r.push(keyword);
        r.push(" ");
        match &join.target {
            JoinTarget::Table { name, alias } => {
                r.push_ident(name);
                if let Some(alias) = alias {
                    r.push_table_alias(alias);
                }
            }
            JoinTarget::Subquery { query, alias } => {
                r.push("(");
                query.render_into(r)?;
                r.push(")");
                r.push_table_alias(alias);
            }
        }
        match (&join.on, join.kind) {
            (_, JoinKind::Cross) => Ok(()),
            (Some(on), _) => {
                r.push(" ON ");
                r.push_expr(on)
            }
            (None, _) => Err(OrmError::validation("join without an ON condition")),
        }
    }

    fn soft_delete_predicate(&self) -> Option<Expr> {
        let column = self.meta?.soft_delete()?;
        self.soft_delete.predicate(column)
    }

    fn render_pagination(&self, r: &mut Renderer) -> OrmResult<()> {
        if self.limit.is_none() && self.offset.is_none() {
            return Ok(());
        }
        let limit = self.limit.map(count_value).transpose()?;
        let offset = self.offset.map(count_value).transpose()?;
        match r.dialect() {
            d @ (Dialect::Postgres | Dialect::MySql | Dialect::Sqlite) => {
                match (&limit, d) {
                    (Some(limit), _) => {
                        r.push(" LIMIT ");
                        r.push_expr(limit)?;
                    }
                    // MySQL and SQLite cannot OFFSET without a LIMIT.
                    (None, Dialect::MySql) => {
                        r.push(" LIMIT 18446744073709551615");
                    }
                    (None, Dialect::Sqlite) => {
                        r.push(" LIMIT -1");
                    }
                    (None, _) => {}
                }
                if let Some(offset) = &offset {
                    r.push(" OFFSET ");
                    r.push_expr(offset)?;
                }
            }
            Dialect::Oracle => {
                if let Some(offset) = &offset {
                    r.push(" OFFSET ");
                    r.push_expr(offset)?;
                    r.push(" ROWS");
                }
                if let Some(limit) = &limit {
                    r.push(" FETCH NEXT ");
                    r.push_expr(limit)?;
                    r.push(" ROWS ONLY");
                }
            }
            Dialect::SqlServer => {
                if self.order.is_empty() {
                    r.push(" ORDER BY (SELECT NULL)");
                }
                r.push(" OFFSET ");
                r.push_expr(&offset.unwrap_or_else(|| 0i64.into_expr()))?;
                r.push(" ROWS");
                if let Some(limit) = &limit {
                    r.push(" FETCH NEXT ");
                    r.push_expr(limit)?;
                    r.push(" ROWS ONLY");
                }
            }
        }
        Ok(())
    }

    fn render_lock(&self, r: &mut Renderer) -> OrmResult<()> {
        let Some((mode, wait)) = self.lock else {
            return Ok(());
        };
        let dialect = r.dialect();
        match (dialect, mode) {
            (Dialect::SqlServer, _) => return Ok(()),
            (Dialect::Sqlite, _) => return Err(OrmError::unsupported("row_lock", dialect)),
            (Dialect::Oracle, LockMode::Share) => {
                return Err(OrmError::unsupported("for_share", dialect));
            }
            (_, LockMode::Update) => r.push(" FOR UPDATE"),
            (_, LockMode::Share) => r.push(" FOR SHARE"),
        };
        match wait {
            LockWait::Wait => {}
            LockWait::NoWait => {
                r.push(" NOWAIT");
            }
            LockWait::SkipLocked => {
                r.push(" SKIP LOCKED");
            }
        }
        Ok(())
    }

    /// SQL Server expresses row locks as table hints after the FROM source.
    fn render_table_hint(&self, r: &mut Renderer) -> OrmResult<()> {
        let Some((mode, wait)) = self.lock else {
            return Ok(());
        };
        if r.dialect() != Dialect::SqlServer {
            return Ok(());
        }
        r.push(match mode {
            LockMode::Update => " WITH (UPDLOCK, ROWLOCK",
            LockMode::Share => " WITH (HOLDLOCK, ROWLOCK",
        });
        r.push(match wait {
            LockWait::Wait => ")",
            LockWait::NoWait => ", NOWAIT)",
            LockWait::SkipLocked => ", READPAST)",
        });
        Ok(())
    }

    // ==================== Terminals ====================

    /// The same query reduced to `projection`, ignoring ordering, pagination and locks. Grouped,
    /// distinct and compound queries are wrapped in a derived table so the result has one row.
    fn reduced(&self, projection: Expr) -> SelectQb {
        let mut inner = self.clone();
        inner.order.clear();
        inner.limit = None;
        inner.offset = None;
        inner.lock = None;
        if inner.group_by.is_empty() && !inner.distinct && inner.set_ops.is_empty() {
            inner.projection = vec![projection];
            inner.excluded.clear();
            return inner;
        }
        let ctes = std::mem::take(&mut inner.ctes);
        let mut outer = SelectQb::new(self.dialect).from_subquery(inner, "t");
        outer.ctes = ctes;
        outer.projection = vec![projection];
        outer
    }

    /// The `COUNT(*)` query run by [`count`](Self::count).
    pub fn count_query(&self) -> SelectQb {
        self.reduced(Expr::raw("COUNT(*)"))
    }

    /// Count matching rows, ignoring ordering and pagination.
    pub async fn count(self, conn: &impl GenericClient) -> OrmResult<i64> {
        self.count_query().fetch_scalar(conn).await
    }

    /// Whether at least one row matches.
    pub async fn exists(self, conn: &impl GenericClient) -> OrmResult<bool> {
        let rows = self.reduced(Expr::raw("1")).limit(1).query(conn).await?;
        Ok(!rows.is_empty())
    }

    /// First column of the single result row.
    pub async fn fetch_scalar<T: FromValue>(self, conn: &impl GenericClient) -> OrmResult<T> {
        let row = self.query_one(conn).await?;
        row.try_get(0)
    }
}

fn cte_header(name: &str, columns: &[&str]) -> OrmResult<(Ident, Vec<Ident>)> {
    let name = Ident::parse(name)?;
    let columns = columns
        .iter()
        .map(|c| Ident::parse(c))
        .collect::<OrmResult<Vec<_>>>()?;
    Ok((name, columns))
}

impl_where_shortcuts!(SelectQb);

impl SqlQb for SelectQb {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn to_sql(&self) -> OrmResult<(String, Vec<Value>)> {
        let mut r = Renderer::new(self.dialect);
        self.render_into(&mut r)?;
        Ok(r.finish())
    }
}
