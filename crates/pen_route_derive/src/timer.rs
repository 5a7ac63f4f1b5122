use proc_macro::TokenStream;
use quote::quote;
use syn::{Block, ItemFn, LitStr, parse_macro_input, parse_quote};

pub fn timer_inner(attr: TokenStream, item: TokenStream) -> TokenStream {
    let label = parse_macro_input!(attr as LitStr);
    let mut func = parse_macro_input!(item as ItemFn);

    // A drop guard keeps early returns and `?` timed as well.
    let guard: Block = parse_quote!({
        struct __PenRouteTimer(::std::time::Instant);
        impl ::core::ops::Drop for __PenRouteTimer {
            fn drop(&mut self) {
                ::log::debug!(
                    "{}: elapsed={:.3}s",
                    #label,
                    self.0.elapsed().as_secs_f64()
                );
            }
        }
        let __pen_route_timer = __PenRouteTimer(::std::time::Instant::now());
    });

    let mut stmts = guard.stmts;
    stmts.append(&mut func.block.stmts);
    func.block.stmts = stmts;

    TokenStream::from(quote! { #func })
}
