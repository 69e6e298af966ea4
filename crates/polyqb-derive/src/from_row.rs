//! FromRow derive macro implementation

use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Result};

use crate::attrs::parse_fields;

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let field_extracts: Vec<_> = parse_fields(&input, "FromRow")?
        .into_iter()
        .map(|field| {
            let ident = field.ident;
            let column = field.column;
            quote! {
                #ident: row.try_get_column(#column)?
            }
        })
        .collect();

    Ok(quote! {
        impl #impl_generics polyqb::FromRow for #name #ty_generics #where_clause {
            fn from_row(row: &polyqb::Row) -> polyqb::OrmResult<Self> {
                Ok(Self {
                    #(#field_extracts),*
                })
            }
        }
    })
}
