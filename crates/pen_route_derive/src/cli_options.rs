use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitChar, LitStr, Path, parse_macro_input, spanned::Spanned};

use crate::utils;

#[derive(Default)]
struct CliAttr {
    long: Option<String>,
    short: Option<char>,
    parse_with: Option<Path>,
    flag: bool,
    negate: bool,
    default_missing: Option<String>,
    value_name: Option<String>,
}

fn parse_cli_attr(field: &syn::Field) -> syn::Result<CliAttr> {
    let mut out = CliAttr::default();
    for attr in &field.attrs {
        if !attr.path().is_ident("cli") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("long") {
                let lit: LitStr = meta.value()?.parse()?;
                out.long = Some(lit.value());
                return Ok(());
            }
            if meta.path.is_ident("short") {
                let lit: LitChar = meta.value()?.parse()?;
                out.short = Some(lit.value());
                return Ok(());
            }
            if meta.path.is_ident("parse_with") {
                let lit: LitStr = meta.value()?.parse()?;
                out.parse_with = Some(syn::parse_str(&lit.value())?);
                return Ok(());
            }
            if meta.path.is_ident("default_missing") {
                let lit: LitStr = meta.value()?.parse()?;
                out.default_missing = Some(lit.value());
                return Ok(());
            }
            if meta.path.is_ident("value_name") {
                let lit: LitStr = meta.value()?.parse()?;
                out.value_name = Some(lit.value());
                return Ok(());
            }
            if meta.path.is_ident("flag") {
                out.flag = true;
                return Ok(());
            }
            if meta.path.is_ident("negate") {
                out.negate = true;
                return Ok(());
            }
            Err(meta.error(
                "unsupported cli attribute; expected long/short/parse_with/flag/negate/default_missing/value_name",
            ))
        })?;
    }
    Ok(out)
}

pub fn derive_cli_options_inner(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    let struct_ident = input.ident.clone();

    let Data::Struct(data_struct) = &input.data else {
        return syn::Error::new(input.span(), "CliOptions can only be derived for structs")
            .to_compile_error()
            .into();
    };

    let Fields::Named(fields) = &data_struct.fields else {
        return syn::Error::new(input.span(), "CliOptions requires named fields")
            .to_compile_error()
            .into();
    };

    let mut arms = Vec::new();
    let mut short_arms = Vec::new();
    let mut flag_names: Vec<String> = Vec::new();
    let mut optional_value_names: Vec<String> = Vec::new();
    let mut usage_rows: Vec<(String, String)> = Vec::new();

    for field in &fields.named {
        let Some(field_ident) = &field.ident else {
            continue;
        };

        let cli = match parse_cli_attr(field) {
            Ok(cli) => cli,
            Err(err) => return err.to_compile_error().into(),
        };
        let Some(long_name) = cli.long.clone() else {
            continue;
        };

        if cli.flag && !utils::is_bool(&field.ty) {
            return syn::Error::new(field.span(), "`#[cli(flag)]` requires a `bool` field")
                .to_compile_error()
                .into();
        }
        if cli.negate && !cli.flag {
            return syn::Error::new(field.span(), "`#[cli(negate)]` only applies to flags")
                .to_compile_error()
                .into();
        }

        let long_name_lit = LitStr::new(&long_name, Span::call_site());
        if let Some(short) = cli.short {
            let short_lit = LitChar::new(short, Span::call_site());
            short_arms.push(quote! { #short_lit => Some(#long_name_lit), });
        }

        let doc = utils::doc_string(&field.attrs);
        let switch = match cli.short {
            Some(short) => format!("-{short}, --{long_name}"),
            None => format!("    --{long_name}"),
        };

        if cli.flag {
            let bool_expr = utils::build_cli_bool_expr();
            arms.push(quote! {
                #long_name_lit => {
                    self.#field_ident = match value {
                        Some(raw) => #bool_expr,
                        None => true,
                    };
                    Ok(true)
                }
            });
            flag_names.push(long_name.clone());
            usage_rows.push((format!("{switch}[=<bool>]"), doc.clone()));

            if cli.negate {
                let negated = format!("no-{long_name}");
                let negated_lit = LitStr::new(&negated, Span::call_site());
                arms.push(quote! {
                    #negated_lit => {
                        if value.is_some() {
                            return Err(crate::Error::invalid_input(format!(
                                "Flag --{name} does not take a value"
                            )));
                        }
                        self.#field_ident = false;
                        Ok(true)
                    }
                });
                usage_rows.push((format!("    --{negated}"), format!("Disable --{long_name}.")));
                flag_names.push(negated);
            }
            continue;
        }

        let value_name = cli.value_name.clone().unwrap_or_else(|| "value".to_string());
        let (value_ty, wrap_some) = match utils::inner_of_option(&field.ty) {
            Some(inner) => (inner, true),
            None => (&field.ty, false),
        };
        let parse_expr = utils::build_cli_parse_expr(value_ty, cli.parse_with.as_ref());
        let assign = if wrap_some {
            quote! { self.#field_ident = Some(#parse_expr); }
        } else {
            quote! { self.#field_ident = #parse_expr; }
        };

        let raw_expr = match &cli.default_missing {
            Some(default) => {
                optional_value_names.push(long_name.clone());
                usage_rows.push((format!("{switch} [<{value_name}>]"), doc));
                let default_lit = LitStr::new(default, Span::call_site());
                quote! { value.unwrap_or_else(|| String::from(#default_lit)) }
            }
            None => {
                usage_rows.push((format!("{switch} <{value_name}>"), doc));
                quote! {
                    value.ok_or_else(|| {
                        crate::Error::invalid_input(format!("Missing value for --{name}"))
                    })?
                }
            }
        };

        arms.push(quote! {
            #long_name_lit => {
                let raw = #raw_expr;
                #assign
                Ok(true)
            }
        });
    }

    let width = usage_rows.iter().map(|(l, _)| l.len()).max().unwrap_or(0);
    let usage_lines: Vec<LitStr> = usage_rows
        .iter()
        .map(|(left, doc)| {
            let line = if doc.is_empty() {
                format!("  {left}")
            } else {
                format!("  {left:<width$}  {doc}")
            };
            LitStr::new(&line, Span::call_site())
        })
        .collect();
    let flag_lits: Vec<LitStr> = flag_names
        .iter()
        .map(|n| LitStr::new(n, Span::call_site()))
        .collect();
    let optional_lits: Vec<LitStr> = optional_value_names
        .iter()
        .map(|n| LitStr::new(n, Span::call_site()))
        .collect();

    let expanded = quote! {
        impl #struct_ident {
            const CLI_FLAGS: &'static [&'static str] = &[#(#flag_lits),*];
            const CLI_OPTIONAL_VALUES: &'static [&'static str] = &[#(#optional_lits),*];

            fn cli_long_name(short: char) -> Option<&'static str> {
                match short {
                    #(#short_arms)*
                    _ => None,
                }
            }

            /// Splits `name=value` or pulls the value from the next argument.
            /// Flags only take inline values; optional values are only taken
            /// from the next argument when it does not look like an option.
            fn split_arg(
                raw_name: &str,
                args: &mut std::iter::Peekable<impl Iterator<Item = String>>,
            ) -> (String, Option<String>) {
                if let Some((k, v)) = raw_name.split_once('=') {
                    return (k.to_string(), Some(v.to_string()));
                }

                if Self::CLI_FLAGS.contains(&raw_name) {
                    return (raw_name.to_string(), None);
                }

                let optional = Self::CLI_OPTIONAL_VALUES.contains(&raw_name);
                let value = match args.peek() {
                    Some(next) if optional && next.starts_with('-') => None,
                    Some(next) if !next.starts_with("--") => args.next(),
                    _ => None,
                };

                (raw_name.to_string(), value)
            }

            fn apply_cli_option(
                &mut self,
                name: &str,
                value: Option<String>,
            ) -> crate::Result<bool> {
                match name {
                    #(#arms,)*
                    _ => Ok(false),
                }
            }

            pub fn cli_usage_lines() -> &'static [&'static str] {
                &[#(#usage_lines),*]
            }
        }
    };

    TokenStream::from(expanded)
}
