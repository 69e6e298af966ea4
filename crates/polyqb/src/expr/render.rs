//! Single-pass SQL rendering.
//!
//! Every fragment of a statement (CTEs, subqueries, joins, conditions) renders into one [`Renderer`], so
//! placeholder numbering and parameter order always match the text, whatever the dialect's placeholder
//! style.

use std::collections::HashMap;

use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::ident::Ident;
use crate::qb::param::ParamList;
use crate::value::Value;

use super::Expr;

/// Accumulates SQL text and bound parameters for one statement.
#[derive(Debug)]
pub struct Renderer {
    dialect: Dialect,
    sql: String,
    params: ParamList,
    alias: Option<Ident>,
    named: HashMap<String, Ident>,
}

impl Renderer {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            sql: String::with_capacity(128),
            params: ParamList::new(),
            alias: None,
            named: HashMap::new(),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Alias that bare column references are qualified with.
    pub fn alias(&self) -> Option<&Ident> {
        self.alias.as_ref()
    }

    pub fn push(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    /// Bind `value` and append its placeholder.
    pub fn push_bind(&mut self, value: impl Into<Value>) -> &mut Self {
        let index = self.params.push(value);
        let placeholder = self.dialect.placeholder(index);
        self.sql.push_str(&placeholder);
        self
    }

    pub fn push_ident(&mut self, ident: &Ident) -> &mut Self {
        ident.write_sql(self.dialect, &mut self.sql);
        self
    }

    /// Append a table alias. Oracle rejects `AS` before table aliases, so none of the dialects use it.
    pub fn push_table_alias(&mut self, alias: &Ident) -> &mut Self {
        self.sql.push(' ');
        self.push_ident(alias)
    }

    pub fn push_expr(&mut self, expr: &Expr) -> OrmResult<()> {
        expr.render(self)
    }

    /// Render `exprs` separated by `sep`.
    pub fn push_list<'e>(
        &mut self,
        exprs: impl IntoIterator<Item = &'e Expr>,
        sep: &str,
    ) -> OrmResult<()> {
        for (i, expr) in exprs.into_iter().enumerate() {
            if i > 0 {
                self.sql.push_str(sep);
            }
            expr.render(self)?;
        }
        Ok(())
    }

    /// Look up a dynamic identifier bound with `bind_ident`.
    pub(crate) fn named(&self, key: &str) -> OrmResult<&Ident> {
        self.named.get(key).ok_or_else(|| {
            OrmError::validation(format!("no identifier bound for dynamic column '{key}'"))
        })
    }

    /// Render a nested statement with its own alias and identifier bindings.
    ///
    /// Bindings of the enclosing statement stay visible unless shadowed.
    pub(crate) fn scoped<T>(
        &mut self,
        alias: Option<Ident>,
        named: &HashMap<String, Ident>,
        f: impl FnOnce(&mut Self) -> OrmResult<T>,
    ) -> OrmResult<T> {
        let outer_alias = std::mem::replace(&mut self.alias, alias);
        let outer_named = if named.is_empty() {
            None
        } else {
            let mut merged = self.named.clone();
            merged.extend(named.iter().map(|(k, v)| (k.clone(), v.clone())));
            Some(std::mem::replace(&mut self.named, merged))
        };
        let result = f(self);
        self.alias = outer_alias;
        if let Some(outer) = outer_named {
            self.named = outer;
        }
        result
    }

    /// Number of parameters bound so far.
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn finish(self) -> (String, Vec<Value>) {
        (self.sql, self.params.into_vec())
    }
}
