use proc_macro2::TokenStream;
use quote::quote;

/// Expansion of a declaration attribute that was not consumed by `#[routes]`.
///
/// Inside `#[routes]` the attribute is stripped before it could expand, so
/// reaching this point means the declaration would be silently lost. The item
/// is kept so the only error reported is this one.
pub fn outside_routes(name: &str, item: TokenStream) -> TokenStream {
    let message = format!("#[{name}] only takes effect on a method inside a #[routes] impl block");
    quote! {
        ::core::compile_error!(#message);
        #item
    }
}
