//! The closed set of supported SQL backends.
//!
//! Everything that differs between backends is either a method here (placeholders, identifier quoting)
//! or a [`Dispatch`](crate::Dispatch) table at the call site.

use std::fmt;
use std::str::FromStr;

use crate::error::OrmError;

/// A SQL backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Postgres,
    MySql,
    Sqlite,
    Oracle,
    SqlServer,
}

impl Dialect {
    /// Every supported dialect, in declaration order.
    pub const ALL: [Dialect; 5] = [
        Dialect::Postgres,
        Dialect::MySql,
        Dialect::Sqlite,
        Dialect::Oracle,
        Dialect::SqlServer,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::MySql => "mysql",
            Dialect::Sqlite => "sqlite",
            Dialect::Oracle => "oracle",
            Dialect::SqlServer => "sqlserver",
        }
    }

    /// Placeholder for the 1-based parameter `index`.
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::MySql | Dialect::Sqlite => "?".to_string(),
            Dialect::Oracle => format!(":{index}"),
            Dialect::SqlServer => format!("@p{index}"),
        }
    }

    /// Write `name` as a quoted identifier, escaping embedded quote characters.
    pub fn write_quoted(self, name: &str, out: &mut String) {
        let (open, close) = match self {
            Dialect::Postgres | Dialect::Sqlite | Dialect::Oracle => ('"', '"'),
            Dialect::MySql => ('`', '`'),
            Dialect::SqlServer => ('[', ']'),
        };
        out.push(open);
        for ch in name.chars() {
            if ch == close {
                out.push(close);
            }
            out.push(ch);
        }
        out.push(close);
    }

    /// Quote a single identifier part.
    pub fn quote_ident(self, name: &str) -> String {
        let mut out = String::with_capacity(name.len() + 2);
        self.write_quoted(name, &mut out);
        out
    }

    /// Whether the backend has a boolean type that supports `IS TRUE` / `IS FALSE`.
    pub fn has_native_bool(self) -> bool {
        match self {
            Dialect::Postgres | Dialect::MySql => true,
            Dialect::Sqlite | Dialect::Oracle | Dialect::SqlServer => false,
        }
    }

    /// Escape a string literal for inline use (`'` doubled; MySQL also escapes backslashes).
    pub fn string_literal(self, value: &str) -> String {
        let mut out = String::with_capacity(value.len() + 2);
        out.push('\'');
        for ch in value.chars() {
            match ch {
                '\'' => out.push_str("''"),
                '\\' if self == Dialect::MySql => out.push_str("\\\\"),
                _ => out.push(ch),
            }
        }
        out.push('\'');
        out
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            "oracle" => Ok(Dialect::Oracle),
            "sqlserver" | "mssql" => Ok(Dialect::SqlServer),
            other => Err(OrmError::validation(format!("unknown dialect '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders() {
        let rendered: Vec<String> = Dialect::ALL.iter().map(|d| d.placeholder(2)).collect();
        assert_eq!(rendered, ["$2", "?", "?", ":2", "@p2"]);
    }

    #[test]
    fn quoting_escapes_closing_char() {
        assert_eq!(Dialect::Postgres.quote_ident("a\"b"), "\"a\"\"b\"");
        assert_eq!(Dialect::MySql.quote_ident("order"), "`order`");
        assert_eq!(Dialect::SqlServer.quote_ident("a]b"), "[a]]b]");
    }

    #[test]
    fn string_literals() {
        assert_eq!(Dialect::Postgres.string_literal("it's"), "'it''s'");
        assert_eq!(Dialect::MySql.string_literal("a\\b"), "'a\\\\b'");
        assert_eq!(Dialect::Sqlite.string_literal("a\\b"), "'a\\b'");
    }

    #[test]
    fn parses_aliases() {
        assert_eq!("PostgreSQL".parse::<Dialect>().unwrap(), Dialect::Postgres);
        assert_eq!("mariadb".parse::<Dialect>().unwrap(), Dialect::MySql);
        assert_eq!("mssql".parse::<Dialect>().unwrap(), Dialect::SqlServer);
        assert!("db2".parse::<Dialect>().is_err());
    }
}
