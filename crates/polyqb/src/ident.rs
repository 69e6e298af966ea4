//! SQL identifiers.
//!
//! [`Ident`] is a dotted identifier (`schema.table.column`). Unquoted parts must match
//! `[A-Za-z_][A-Za-z0-9_$]*` and render verbatim. Quoted parts (`"Mixed Case"`) render with the active
//! dialect's quote characters.

use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};

/// A part of a SQL identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentPart {
    Unquoted(String),
    Quoted(String),
}

impl IdentPart {
    pub fn name(&self) -> &str {
        match self {
            IdentPart::Unquoted(s) | IdentPart::Quoted(s) => s,
        }
    }
}

/// A SQL identifier (column, table, or schema name).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident {
    pub parts: Vec<IdentPart>,
}

fn is_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

fn is_continue(c: char) -> bool {
    c == '_' || c == '$' || c.is_ascii_alphanumeric()
}

impl Ident {
    /// A single quoted part.
    pub fn quoted(name: &str) -> OrmResult<Self> {
        if name.is_empty() || name.contains('\0') {
            return Err(OrmError::validation(format!(
                "invalid quoted identifier {name:?}"
            )));
        }
        Ok(Self {
            parts: vec![IdentPart::Quoted(name.to_string())],
        })
    }

    /// Parse `schema.table`, `"Quoted".col` and similar forms.
    pub fn parse(s: &str) -> OrmResult<Self> {
        if s.is_empty() {
            return Err(OrmError::validation("Identifier cannot be empty"));
        }
        if s.contains('\0') {
            return Err(OrmError::validation(
                "Identifier cannot contain NUL character",
            ));
        }

        let mut parts = Vec::new();
        let mut chars = s.chars().peekable();
        loop {
            if chars.peek() == Some(&'"') {
                chars.next();
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('"') if chars.peek() == Some(&'"') => {
                            chars.next();
                            name.push('"');
                        }
                        Some('"') => break,
                        Some(c) => name.push(c),
                        None => return Err(OrmError::validation("Unclosed quoted identifier")),
                    }
                }
                if name.is_empty() {
                    return Err(OrmError::validation("Empty quoted identifier"));
                }
                parts.push(IdentPart::Quoted(name));
            } else {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if c == '.' {
                        break;
                    }
                    let ok = if name.is_empty() { is_start(c) } else { is_continue(c) };
                    if !ok {
                        return Err(OrmError::validation(format!(
                            "Invalid character '{c}' in identifier {s:?}"
                        )));
                    }
                    name.push(c);
                    chars.next();
                }
                if name.is_empty() {
                    return Err(OrmError::validation(format!(
                        "Empty identifier segment in {s:?}"
                    )));
                }
                parts.push(IdentPart::Unquoted(name));
            }

            match chars.next() {
                None => break,
                Some('.') if chars.peek().is_some() => continue,
                Some('.') => return Err(OrmError::validation("Trailing '.' in identifier")),
                Some(c) => {
                    return Err(OrmError::validation(format!(
                        "Expected '.' between identifier parts, got '{c}'"
                    )));
                }
            }
        }

        Ok(Self { parts })
    }

    /// The last part, i.e. the bare column or table name.
    pub fn last(&self) -> &str {
        self.parts.last().map(IdentPart::name).unwrap_or_default()
    }

    /// Split `alias.column` into its qualifier and the final part.
    pub(crate) fn split_last(&self) -> (Option<Ident>, Ident) {
        let mut parts = self.parts.clone();
        let last = parts.pop().map(|p| vec![p]).unwrap_or_default();
        let qualifier = (!parts.is_empty()).then_some(Ident { parts });
        (qualifier, Ident { parts: last })
    }

    pub fn is_qualified(&self) -> bool {
        self.parts.len() > 1
    }

    pub fn write_sql(&self, dialect: Dialect, out: &mut String) {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            match part {
                IdentPart::Unquoted(s) => out.push_str(s),
                IdentPart::Quoted(s) => dialect.write_quoted(s, out),
            }
        }
    }

    /// Render the identifier for `dialect`.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        let mut out = String::new();
        self.write_sql(dialect, &mut out);
        out
    }
}

/// Convert an input into an [`Ident`].
pub trait IntoIdent {
    fn into_ident(self) -> OrmResult<Ident>;
}

impl IntoIdent for Ident {
    fn into_ident(self) -> OrmResult<Ident> {
        Ok(self)
    }
}

impl IntoIdent for &str {
    fn into_ident(self) -> OrmResult<Ident> {
        Ident::parse(self)
    }
}

impl IntoIdent for String {
    fn into_ident(self) -> OrmResult<Ident> {
        Ident::parse(&self)
    }
}

impl IntoIdent for &String {
    fn into_ident(self) -> OrmResult<Ident> {
        Ident::parse(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dotted_and_quoted() {
        let ident = Ident::parse(r#"app."User Table".id"#).unwrap();
        assert_eq!(ident.parts.len(), 3);
        assert_eq!(ident.to_sql(Dialect::Postgres), r#"app."User Table".id"#);
        assert_eq!(ident.to_sql(Dialect::MySql), "app.`User Table`.id");
        assert_eq!(ident.to_sql(Dialect::SqlServer), "app.[User Table].id");
    }

    #[test]
    fn rejects_injection() {
        assert!(Ident::parse("id; DROP TABLE users").is_err());
        assert!(Ident::parse("a.").is_err());
        assert!(Ident::parse("1abc").is_err());
        assert!(Ident::parse("\"open").is_err());
    }

    #[test]
    fn split_last_separates_qualifier() {
        let (q, last) = Ident::parse("p.view_count").unwrap().split_last();
        assert_eq!(q.unwrap().to_sql(Dialect::Postgres), "p");
        assert_eq!(last.last(), "view_count");
    }
}
