//! `#[derive(Config)]` expansion.
//!
//! Generates two impls for the annotated struct:
//! - `Config`: the schema, one `FieldSchema` per field in declaration order,
//!   and `field_mut`, mapping each schema position to the field's slot
//! - `Field`: so the struct can be nested in other configurations and
//!   used as a sequence element

use proc_macro2::{Literal, TokenStream};
use quote::quote;
use syn::{parse_quote, Data, DataStruct, DeriveInput, Fields, Path};

use crate::parse::{ContainerAttrs, FieldAttrs};

/// Expands `#[derive(Config)]`.
pub fn expand_config(input: TokenStream) -> syn::Result<TokenStream> {
    let mut input: DeriveInput = syn::parse2(input)?;
    let container = ContainerAttrs::from_attributes(&input.attrs)?;
    let krate: Path = container
        .krate
        .clone()
        .unwrap_or_else(|| parse_quote!(::confmap));

    let fields = match &input.data {
        Data::Struct(DataStruct {
            fields: Fields::Named(named),
            ..
        }) => named.named.clone(),
        Data::Struct(_) => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "Config can only be derived for structs with named fields",
            ))
        }
        Data::Enum(data) => {
            return Err(syn::Error::new_spanned(
                data.enum_token,
                "Config cannot be derived for enums",
            ))
        }
        Data::Union(data) => {
            return Err(syn::Error::new_spanned(
                data.union_token,
                "Config cannot be derived for unions",
            ))
        }
    };

    let mut schema_fields = Vec::with_capacity(fields.len());
    let mut slot_arms = Vec::with_capacity(fields.len());
    let mut field_types = Vec::new();

    for (index, field) in fields.iter().enumerate() {
        let attrs = FieldAttrs::from_attributes(&field.attrs)?;
        let Some(field_ident) = field.ident.as_ref() else {
            return Err(syn::Error::new_spanned(field, "expected a named field"));
        };
        let ident = field_ident.to_string();
        let ident = ident.trim_start_matches("r#");
        let ty = &field.ty;

        if attrs.skip {
            if attrs.name.is_some() || attrs.default.is_some() {
                return Err(syn::Error::new_spanned(
                    field_ident,
                    "`skip` cannot be combined with `name` or `default`",
                ));
            }
            schema_fields.push(quote! {
                .field(#krate::FieldSchema::skipped::<#ty>(#ident))
            });
            continue;
        }

        let tag = attrs.name.unwrap_or_else(|| container.tag_for(ident));
        let default = attrs
            .default
            .map(|literal| quote! { .with_default(#literal) });
        let position = Literal::usize_unsuffixed(index);

        schema_fields.push(quote! {
            .field(#krate::FieldSchema::of::<#ty>(#ident, #tag) #default)
        });
        slot_arms.push(quote! {
            #position => #krate::Field::slot(&mut self.#field_ident),
        });
        field_types.push(ty.clone());
    }

    // Generic parameters must themselves be decodable.
    if !input.generics.params.is_empty() {
        let where_clause = input.generics.make_where_clause();
        for ty in &field_types {
            where_clause
                .predicates
                .push(parse_quote!(#ty: #krate::Field));
        }
        where_clause.predicates.push(parse_quote!(Self: ::core::default::Default));
    }

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics #krate::Config for #name #ty_generics #where_clause {
            fn schema() -> #krate::StructSchema {
                #krate::StructSchema::new(::core::any::type_name::<Self>())
                    #(#schema_fields)*
            }

            fn field_mut(&mut self, index: usize) -> #krate::Slot<'_> {
                match index {
                    #(#slot_arms)*
                    _ => #krate::Slot::Opaque,
                }
            }
        }

        impl #impl_generics #krate::Field for #name #ty_generics #where_clause {
            fn kind() -> #krate::FieldKind {
                #krate::FieldKind::Struct(<Self as #krate::Config>::schema)
            }

            fn slot(&mut self) -> #krate::Slot<'_> {
                #krate::Slot::Struct(self)
            }
        }
    })
}
