use proc_macro2::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, Result};

/// First non-empty doc comment line
fn doc_description(attrs: &[Attribute]) -> Option<String> {
    attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            syn::Meta::NameValue(meta) => match &meta.value {
                syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Str(lit_str),
                    ..
                }) => Some(lit_str.value().trim().to_string()),
                _ => None,
            },
            _ => None,
        })
        .find(|doc| !doc.is_empty())
}

pub fn impl_command_enum(input: DeriveInput) -> Result<TokenStream> {
    let enum_name = &input.ident;
    let variants = match &input.data {
        Data::Enum(data_enum) => &data_enum.variants,
        _ => {
            return Err(syn::Error::new_spanned(
                enum_name,
                "#[command_enum] can only be used on enums",
            ));
        }
    };

    if variants.is_empty() {
        return Err(syn::Error::new_spanned(
            enum_name,
            "#[command_enum] needs at least one variant",
        ));
    }

    let mut idents = Vec::new();
    let mut names = Vec::new();
    let mut descriptions = Vec::new();

    for variant in variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "#[command_enum] only supports unit variants",
            ));
        }

        idents.push(&variant.ident);
        names.push(variant.ident.to_string().to_lowercase());
        descriptions.push(match doc_description(&variant.attrs) {
            Some(doc) => quote! { ::std::option::Option::Some(#doc) },
            None => quote! { ::std::option::Option::None },
        });
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        #input

        impl #impl_generics ::cmdtree::parser::CommandEnum for #enum_name #ty_generics #where_clause {
            fn variants() -> &'static [Self] {
                &[#(#enum_name::#idents),*]
            }

            fn name(&self) -> &'static str {
                match self {
                    #(#enum_name::#idents => #names,)*
                }
            }

            fn description(&self) -> ::std::option::Option<&'static str> {
                match self {
                    #(#enum_name::#idents => #descriptions,)*
                }
            }
        }

        impl #impl_generics ::std::str::FromStr for #enum_name #ty_generics #where_clause {
            type Err = String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                <Self as ::cmdtree::parser::CommandEnum>::from_name(s)
                    .ok_or_else(|| format!("Unknown {}: {}", stringify!(#enum_name), s))
            }
        }

        impl #impl_generics ::std::fmt::Display for #enum_name #ty_generics #where_clause {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(<Self as ::cmdtree::parser::CommandEnum>::name(self))
            }
        }
    })
}
