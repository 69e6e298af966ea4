//! `#[orm(...)]` attribute parsing shared by the derives.

use heck::ToSnakeCase;
use syn::punctuated::Punctuated;
use syn::{Data, DeriveInput, Fields, Meta, Result, Token};

/// Struct-level options.
pub(crate) struct TableAttr {
    pub table: String,
    pub alias: Option<String>,
    pub soft_delete: Option<String>,
}

/// Field-level options.
pub(crate) struct FieldAttr {
    pub ident: syn::Ident,
    pub ty: syn::Type,
    pub column: String,
    pub is_id: bool,
    pub readonly: bool,
}

fn orm_metas(attrs: &[syn::Attribute]) -> Result<Vec<Meta>> {
    let mut metas = Vec::new();
    for attr in attrs {
        if attr.path().is_ident("orm") {
            let nested = attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;
            metas.extend(nested);
        }
    }
    Ok(metas)
}

fn lit_str(meta: &syn::MetaNameValue) -> Result<String> {
    match &meta.value {
        syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Str(lit),
            ..
        }) => Ok(lit.value()),
        other => Err(syn::Error::new_spanned(other, "expected a string literal")),
    }
}

pub(crate) fn parse_table(input: &DeriveInput) -> Result<TableAttr> {
    let mut attr = TableAttr {
        table: input.ident.to_string().to_snake_case(),
        alias: None,
        soft_delete: None,
    };
    for meta in orm_metas(&input.attrs)? {
        match &meta {
            Meta::NameValue(nv) if nv.path.is_ident("table") => attr.table = lit_str(nv)?,
            Meta::NameValue(nv) if nv.path.is_ident("alias") => attr.alias = Some(lit_str(nv)?),
            Meta::NameValue(nv) if nv.path.is_ident("soft_delete") => {
                attr.soft_delete = Some(lit_str(nv)?)
            }
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "unknown attribute, expected `table`, `alias` or `soft_delete`",
                ));
            }
        }
    }
    Ok(attr)
}

pub(crate) fn parse_fields(input: &DeriveInput, derive: &str) -> Result<Vec<FieldAttr>> {
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    format!("{derive} can only be derived for structs with named fields"),
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                format!("{derive} can only be derived for structs"),
            ));
        }
    };

    fields
        .iter()
        .map(|field| {
            let ident = field
                .ident
                .clone()
                .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
            let mut attr = FieldAttr {
                column: ident.to_string(),
                ident,
                ty: field.ty.clone(),
                is_id: false,
                readonly: false,
            };
            for meta in orm_metas(&field.attrs)? {
                match &meta {
                    Meta::Path(p) if p.is_ident("id") => attr.is_id = true,
                    Meta::Path(p) if p.is_ident("readonly") => attr.readonly = true,
                    Meta::NameValue(nv) if nv.path.is_ident("column") => {
                        attr.column = lit_str(nv)?
                    }
                    other => {
                        return Err(syn::Error::new_spanned(
                            other,
                            "unknown attribute, expected `id`, `readonly` or `column`",
                        ));
                    }
                }
            }
            Ok(attr)
        })
        .collect()
}
