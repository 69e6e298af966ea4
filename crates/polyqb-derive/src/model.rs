//! Model derive macro implementation
//!
//! Generates a `OnceLock`-cached `TableMeta`, the writable column values, and fn-pointer accessors for
//! primary-key fields.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Result};

use crate::attrs::{parse_fields, parse_table};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Model cannot be derived for generic structs",
        ));
    }

    let table = parse_table(&input)?;
    let fields = parse_fields(&input, "Model")?;

    let table_name = &table.table;
    let alias = table.alias.as_ref().map(|a| quote!(.with_alias(#a)));
    let soft_delete = table.soft_delete.as_ref().map(|c| {
        quote!(.with_soft_delete(#c))
    });
    if let Some(column) = &table.soft_delete {
        if !fields.iter().any(|f| &f.column == column) {
            return Err(syn::Error::new_spanned(
                &input.ident,
                format!("soft_delete column `{column}` is not a field of the struct"),
            ));
        }
    }

    let columns = fields.iter().map(|f| {
        let column = &f.column;
        let field = f.ident.to_string();
        let pk = f.is_id.then(|| quote!(.primary_key()));
        let readonly = f.readonly.then(|| quote!(.readonly()));
        quote! {
            .with_column(polyqb::ColumnMeta::new(#column, #field) #pk #readonly)
        }
    });

    let values = fields.iter().filter(|f| !f.readonly).map(|f| {
        let column = &f.column;
        let ident = &f.ident;
        quote! {
            (#column, polyqb::Value::from(::std::clone::Clone::clone(&self.#ident)))
        }
    });

    let pk_fields = fields.iter().filter(|f| f.is_id).map(|f| {
        let column = &f.column;
        let ident = &f.ident;
        let ty = &f.ty;
        quote! {
            polyqb::PrimaryKeyField {
                column: #column,
                getter: |m: &#name| polyqb::Value::from(::std::clone::Clone::clone(&m.#ident)),
                setter: |m: &mut #name, v: polyqb::Value| {
                    m.#ident = <#ty as polyqb::FromValue>::from_value(v)?;
                    Ok(())
                },
            }
        }
    });

    Ok(quote! {
        impl polyqb::Model for #name {
            fn table_meta() -> &'static polyqb::TableMeta {
                static META: ::std::sync::OnceLock<polyqb::TableMeta> = ::std::sync::OnceLock::new();
                META.get_or_init(|| {
                    polyqb::TableMeta::new(#table_name)
                        #alias
                        #soft_delete
                        #(#columns)*
                })
            }

            fn values(&self) -> ::std::vec::Vec<(&'static str, polyqb::Value)> {
                vec![#(#values),*]
            }

            fn primary_key_fields() -> &'static [polyqb::PrimaryKeyField<Self>] {
                static FIELDS: &[polyqb::PrimaryKeyField<#name>] = &[#(#pk_fields),*];
                FIELDS
            }
        }
    })
}
