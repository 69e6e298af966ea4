//! Derive macros for polyqb
//!
//! Provides `#[derive(FromRow)]` and `#[derive(Model)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod attrs;
mod from_row;
mod model;

/// Derive `FromRow` for a struct with named fields.
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
///     #[orm(column = "views")]
///     view_count: i64,
/// }
/// ```
///
/// # Attributes
///
/// - `#[orm(column = "name")]` - Map field to a different column name
#[proc_macro_derive(FromRow, attributes(orm))]
pub fn derive_from_row(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    from_row::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Derive `Model` table metadata for a struct.
///
/// # Example
///
/// ```ignore
/// use polyqb::Model;
///
/// #[derive(Model)]
/// #[orm(table = "posts", alias = "p", soft_delete = "deleted_at")]
/// struct Post {
///     #[orm(id, readonly)]
///     id: i64,
///     title: String,
///     deleted_at: Option<chrono::DateTime<chrono::Utc>>,
/// }
/// ```
///
/// # Attributes
///
/// - `#[orm(table = "name")]` - Table name (defaults to the snake_case struct name)
/// - `#[orm(alias = "a")]` - Alias used to qualify columns in statements
/// - `#[orm(soft_delete = "column")]` - Nullable timestamp column marking deleted rows
/// - `#[orm(id)]` - Primary key field (repeat for composite keys)
/// - `#[orm(column = "name")]` - Map field to a different column name
/// - `#[orm(readonly)]` - Selected but never written (e.g. generated ids)
#[proc_macro_derive(Model, attributes(orm))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    model::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
