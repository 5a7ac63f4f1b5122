use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitStr, parse_macro_input, spanned::Spanned};

/// Renders each named field as an aligned `key = value` line.
///
/// Field modes (`#[kv(fmt = "...")]`):
/// - `display` (default): the field's `Display`
/// - `len`: `.len()` of a collection
/// - `path`: `.display()` of a path
/// - `opt`: an `Option<T: Display>`, printed as `none` when empty
/// - `float`: an `f64` with four decimals
///
/// `#[kv(skip)]` omits a field and `#[kv(name = "...")]` renames its key.
pub fn derive_kv_display_inner(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    let struct_ident = input.ident.clone();

    let Data::Struct(data_struct) = &input.data else {
        return syn::Error::new(input.span(), "KvDisplay can only be derived for structs")
            .to_compile_error()
            .into();
    };

    let Fields::Named(fields) = &data_struct.fields else {
        return syn::Error::new(input.span(), "KvDisplay requires named fields")
            .to_compile_error()
            .into();
    };

    let mut rows: Vec<(String, proc_macro2::TokenStream)> = Vec::new();

    for field in &fields.named {
        let Some(field_ident) = &field.ident else {
            continue;
        };
        let mut key = field_ident.to_string();
        let mut fmt_mode = String::from("display");
        let mut skip = false;

        for attr in &field.attrs {
            if !attr.path().is_ident("kv") {
                continue;
            }
            let parse_result = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let lit: LitStr = meta.value()?.parse()?;
                    key = lit.value();
                    return Ok(());
                }
                if meta.path.is_ident("fmt") {
                    let lit: LitStr = meta.value()?.parse()?;
                    fmt_mode = lit.value();
                    return Ok(());
                }
                if meta.path.is_ident("skip") {
                    skip = true;
                    return Ok(());
                }
                Err(meta.error("unsupported kv attribute; expected name/fmt/skip"))
            });
            if let Err(err) = parse_result {
                return err.to_compile_error().into();
            }
        }
        if skip {
            continue;
        }

        let write_value = match fmt_mode.as_str() {
            "display" => quote! { write!(f, "{}", &self.#field_ident)?; },
            "len" => quote! { write!(f, "{}", self.#field_ident.len())?; },
            "path" => quote! { write!(f, "{}", self.#field_ident.display())?; },
            "float" => quote! { write!(f, "{:.4}", self.#field_ident)?; },
            "opt" => quote! {
                match &self.#field_ident {
                    Some(value) => write!(f, "{value}")?,
                    None => f.write_str("none")?,
                }
            },
            other => {
                return syn::Error::new(field.span(), format!("unsupported kv fmt mode: {other}"))
                    .to_compile_error()
                    .into();
            }
        };
        rows.push((key, write_value));
    }

    let longest = rows.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let writes = rows.iter().map(|(key, write_value)| {
        let prefix = LitStr::new(&format!("\n\t{key:<longest$} = "), Span::call_site());
        quote! {
            f.write_str(#prefix)?;
            #write_value
        }
    });

    let expanded = quote! {
        impl std::fmt::Display for #struct_ident {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                #(#writes)*
                Ok(())
            }
        }
    };

    TokenStream::from(expanded)
}
