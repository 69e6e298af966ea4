//! Common table expressions.

use crate::dialect::Dialect;
use crate::error::OrmResult;
use crate::expr::Renderer;
use crate::ident::Ident;

use super::SelectQb;

#[derive(Clone, Debug)]
enum CteBody {
    Query(Box<SelectQb>),
    /// `base UNION ALL recursive`.
    Recursive {
        base: Box<SelectQb>,
        recursive: Box<SelectQb>,
    },
}

/// One named `WITH` entry.
#[derive(Clone, Debug)]
pub(crate) struct Cte {
    name: Ident,
    columns: Vec<Ident>,
    body: CteBody,
}

impl Cte {
    pub(crate) fn new(name: Ident, columns: Vec<Ident>, query: SelectQb) -> Self {
        Self {
            name,
            columns,
            body: CteBody::Query(Box::new(query)),
        }
    }

    pub(crate) fn recursive(
        name: Ident,
        columns: Vec<Ident>,
        base: SelectQb,
        recursive: SelectQb,
    ) -> Self {
        Self {
            name,
            columns,
            body: CteBody::Recursive {
                base: Box::new(base),
                recursive: Box::new(recursive),
            },
        }
    }

    fn is_recursive(&self) -> bool {
        matches!(self.body, CteBody::Recursive { .. })
    }

    fn render(&self, r: &mut Renderer) -> OrmResult<()> {
        r.push_ident(&self.name);
        if !self.columns.is_empty() {
            r.push(" (");
            for (i, c) in self.columns.iter().enumerate() {
                if i > 0 {
                    r.push(", ");
                }
                r.push_ident(c);
            }
            r.push(")");
        }
        r.push(" AS (");
        match &self.body {
            CteBody::Query(q) => q.render_into(r)?,
            CteBody::Recursive { base, recursive } => {
                base.render_into(r)?;
                r.push(" UNION ALL ");
                recursive.render_into(r)?;
            }
        }
        r.push(")");
        Ok(())
    }
}

/// Render `WITH [RECURSIVE] a AS (..), b AS (..) `. Oracle and SQL Server infer recursion and reject
/// the keyword.
pub(crate) fn render_with(ctes: &[Cte], r: &mut Renderer) -> OrmResult<()> {
    if ctes.is_empty() {
        return Ok(());
    }
    r.push("WITH ");
    let keyword = matches!(
        r.dialect(),
        Dialect::Postgres | Dialect::MySql | Dialect::Sqlite
    );
    if keyword && ctes.iter().any(Cte::is_recursive) {
        r.push("RECURSIVE ");
    }
    for (i, cte) in ctes.iter().enumerate() {
        if i > 0 {
            r.push(", ");
        }
        cte.render(r)?;
    }
    r.push(" ");
    Ok(())
}
