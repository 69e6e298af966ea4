//! Row mapping traits and utilities

use std::sync::Arc;

use crate::error::{OrmError, OrmResult};
use crate::value::{FromValue, Value};

/// A decoded result row, independent of the driver that produced it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Build a row. Drivers share `columns` across every row of one result set.
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Position of `column`, compared case-insensitively (Oracle reports upper-case names).
    pub fn index_of(&self, column: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c == column)
            .or_else(|| self.columns.iter().position(|c| c.eq_ignore_ascii_case(column)))
    }

    /// Raw value by position.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Raw value by column name.
    pub fn get_value(&self, column: &str) -> Option<&Value> {
        self.index_of(column).and_then(|i| self.values.get(i))
    }

    /// Try to get a column value, returning OrmError::Decode on failure
    pub fn try_get_column<T: FromValue>(&self, column: &str) -> OrmResult<T> {
        let value = self
            .get_value(column)
            .cloned()
            .ok_or_else(|| OrmError::decode(column, "column not found"))?;
        T::from_value(value).map_err(|e| with_column(e, column))
    }

    /// Try to get a value by position.
    pub fn try_get<T: FromValue>(&self, index: usize) -> OrmResult<T> {
        let value = self
            .values
            .get(index)
            .cloned()
            .ok_or_else(|| OrmError::decode(index.to_string(), "index out of range"))?;
        let name = self.columns.get(index).map(String::as_str).unwrap_or("?");
        T::from_value(value).map_err(|e| with_column(e, name))
    }
}

fn with_column(err: OrmError, column: &str) -> OrmError {
    match err {
        OrmError::Decode { message, .. } => OrmError::decode(column, message),
        other => other,
    }
}

/// Trait for converting a database row into a Rust struct
///
/// This trait should typically be derived using `#[derive(FromRow)]`
/// from the `polyqb-derive` crate.
///
/// # Example
///
/// ```ignore
/// use polyqb::FromRow;
///
/// #[derive(FromRow)]
/// struct Post {
///     id: i64,
///     title: String,
///     view_count: i64,
/// }
/// ```
pub trait FromRow: Sized {
    /// Convert a database row into Self
    fn from_row(row: &Row) -> OrmResult<Self>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> OrmResult<Self> {
        Ok(row.clone())
    }
}

macro_rules! impl_from_row_scalar {
    ($($ty:ty),*) => {
        $(
            impl FromRow for $ty {
                fn from_row(row: &Row) -> OrmResult<Self> {
                    row.try_get(0)
                }
            }
        )*
    };
}

impl_from_row_scalar!(
    bool,
    i16,
    i32,
    i64,
    f64,
    String,
    Value,
    serde_json::Value,
    rust_decimal::Decimal,
    uuid::Uuid,
    chrono::NaiveDate,
    chrono::NaiveDateTime
);

macro_rules! impl_from_row_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: FromValue),+> FromRow for ($($name,)+) {
            fn from_row(row: &Row) -> OrmResult<Self> {
                Ok(($(row.try_get::<$name>($idx)?,)+))
            }
        }
    };
}

impl_from_row_tuple!(A: 0, B: 1);
impl_from_row_tuple!(A: 0, B: 1, C: 2);
impl_from_row_tuple!(A: 0, B: 1, C: 2, D: 3);

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> Row {
        Row::new(
            Arc::from(vec!["ID".to_string(), "name".to_string()]),
            vec![Value::Int(7), Value::Text("ada".into())],
        )
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let row = row();
        assert_eq!(row.try_get_column::<i64>("id").unwrap(), 7);
        assert_eq!(row.try_get_column::<String>("name").unwrap(), "ada");
    }

    #[test]
    fn decode_errors_name_the_column() {
        let err = row().try_get_column::<i64>("name").unwrap_err();
        match err {
            OrmError::Decode { column, .. } => assert_eq!(column, "name"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn tuples() {
        let (id, name) = <(i64, String)>::from_row(&row()).unwrap();
        assert_eq!((id, name.as_str()), (7, "ada"));
    }
}
