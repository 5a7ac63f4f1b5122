use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, Ident, LitStr, parse_macro_input, spanned::Spanned};

use crate::utils;

/// One enum variant and every spelling that selects it.
struct Choice {
    ident: Ident,
    name: String,
    aliases: Vec<String>,
}

fn option_name(ident: &Ident, attrs: &[Attribute]) -> syn::Result<String> {
    let mut name = utils::to_kebab_case(&ident.to_string());
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("cli")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("option") {
                name = meta.value()?.parse::<LitStr>()?.value();
                Ok(())
            } else {
                Err(meta.error("expected `option = \"...\"` on a CliValue enum"))
            }
        })?;
    }
    Ok(name)
}

fn choice(ident: Ident, attrs: &[Attribute]) -> syn::Result<Choice> {
    let mut choice = Choice {
        name: utils::to_kebab_case(&ident.to_string()),
        ident,
        aliases: Vec::new(),
    };
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("cli")) {
        attr.parse_nested_meta(|meta| {
            let lit: LitStr = meta.value()?.parse()?;
            if meta.path.is_ident("name") {
                choice.name = lit.value();
            } else if meta.path.is_ident("alias") {
                choice.aliases.push(lit.value().to_ascii_lowercase());
            } else {
                return Err(meta.error("expected `name` or `alias`"));
            }
            Ok(())
        })?;
    }
    Ok(choice)
}

fn expand(input: DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let ident = input.ident;
    let Data::Enum(data) = input.data else {
        return Err(syn::Error::new(
            ident.span(),
            "CliValue can only be derived for enums",
        ));
    };
    let option = option_name(&ident, &input.attrs)?;

    let mut choices = Vec::with_capacity(data.variants.len());
    for variant in data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new(
                variant.span(),
                "CliValue variants cannot carry data",
            ));
        }
        choices.push(choice(variant.ident, &variant.attrs)?);
    }

    let names: Vec<LitStr> = choices
        .iter()
        .map(|c| LitStr::new(&c.name, Span::call_site()))
        .collect();
    let as_str_arms = choices.iter().zip(&names).map(|(c, name)| {
        let variant = &c.ident;
        quote! { Self::#variant => #name, }
    });
    let table = choices.iter().map(|c| {
        let variant = &c.ident;
        let spellings = std::iter::once(c.name.to_ascii_lowercase())
            .chain(c.aliases.iter().cloned())
            .map(|s| LitStr::new(&s, Span::call_site()));
        quote! { (&[#(#spellings),*], Self::#variant) }
    });
    let option_lit = LitStr::new(&option, Span::call_site());

    Ok(quote! {
        impl #ident {
            /// Canonical spellings, in declaration order.
            pub const CHOICES: &'static [&'static str] = &[#(#names),*];

            pub fn as_str(&self) -> &'static str {
                match self {
                    #(#as_str_arms)*
                }
            }

            /// Case-insensitive lookup by canonical name or alias.
            pub fn parse(raw: &str) -> crate::Result<Self> {
                let table: &[(&[&str], Self)] = &[#(#table),*];
                table
                    .iter()
                    .find(|(spellings, _)| {
                        spellings.iter().any(|s| s.eq_ignore_ascii_case(raw))
                    })
                    .map(|(_, value)| *value)
                    .ok_or_else(|| {
                        crate::Error::invalid_input(format!(
                            "Invalid value for --{}: {} (expected {})",
                            #option_lit,
                            raw,
                            Self::CHOICES.join("|")
                        ))
                    })
            }
        }

        impl std::str::FromStr for #ident {
            type Err = crate::Error;

            fn from_str(raw: &str) -> crate::Result<Self> {
                Self::parse(raw)
            }
        }

        impl std::fmt::Display for #ident {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    })
}

pub fn derive_cli_value_inner(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
