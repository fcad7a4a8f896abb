use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse::Parse, parse::ParseStream, parse_macro_input, ImplItem, ImplItemFn, ItemImpl,
    ItemStruct, LitStr, Token,
};

use crate::declarations::{self, Declaration};

struct ControllerArgs {
    path: String,
}

impl Parse for ControllerArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut path = None;
        while !input.is_empty() {
            let name: syn::Ident = input.parse()?;
            input.parse::<Token![=]>()?;
            if name == "path" {
                let lit: LitStr = input.parse()?;
                path = Some(lit.value());
            } else {
                return Err(syn::Error::new(name.span(), "unknown controller argument, expected `path`"));
            }
            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }
        Ok(ControllerArgs { path: path.unwrap_or_else(|| "/".to_string()) })
    }
}

pub fn controller_attribute(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as ControllerArgs);
    let input = parse_macro_input!(item as ItemStruct);
    let struct_name = &input.ident;
    let base_path = &args.path;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    TokenStream::from(quote! {
        #input

        impl #impl_generics #struct_name #ty_generics #where_clause {
            pub fn base_path() -> &'static str { #base_path }
        }
    })
}

struct HandlerInfo {
    fn_name: syn::Ident,
    is_async: bool,
    declarations: Vec<Declaration>,
}

pub fn routes_attribute(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemImpl);
    match generate_routes_impl(input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

fn generate_routes_impl(input: ItemImpl) -> syn::Result<TokenStream2> {
    let mut handlers: Vec<HandlerInfo> = Vec::new();
    let mut clean_items: Vec<ImplItem> = Vec::new();

    for item in input.items.iter() {
        match item {
            ImplItem::Fn(method) if method.attrs.iter().any(declarations::is_declaration) => {
                handlers.push(extract_handler_info(method)?);
                let mut clean_method = method.clone();
                clean_method.attrs.retain(|attr| !declarations::is_declaration(attr));
                clean_items.push(ImplItem::Fn(clean_method));
            }
            other => clean_items.push(other.clone()),
        }
    }

    let declare_calls = handlers.iter().flat_map(|handler| {
        let name = handler.fn_name.to_string();
        handler.declarations.iter().map(move |declaration| {
            let annotation = declaration.annotation();
            quote! { declarations.annotate(#name, #annotation); }
        })
    });

    let handler_defs = handlers.iter().map(|handler| {
        let fn_name = &handler.fn_name;
        let name = fn_name.to_string();
        if handler.is_async {
            quote! {
                ::routecraft::HandlerDef::asynchronous(#name, |controller, req, res, next| {
                    ::std::boxed::Box::pin(controller.#fn_name(req, res, next))
                })
            }
        } else {
            quote! { ::routecraft::HandlerDef::sync(#name, Self::#fn_name) }
        }
    });

    let self_ty = &input.self_ty;
    let (impl_generics, _, where_clause) = input.generics.split_for_impl();
    let attrs = &input.attrs;

    Ok(quote! {
        #(#attrs)*
        impl #impl_generics #self_ty #where_clause {
            #(#clean_items)*
        }

        impl #impl_generics ::routecraft::Controller for #self_ty #where_clause {
            #[allow(unused_variables)]
            fn declare(declarations: &mut ::routecraft::metadata::Declarations<'_, Self>) {
                #(#declare_calls)*
            }

            fn handlers() -> ::std::vec::Vec<::routecraft::HandlerDef<Self>> {
                ::std::vec![#(#handler_defs),*]
            }
        }
    })
}

fn extract_handler_info(method: &ImplItemFn) -> syn::Result<HandlerInfo> {
    let mut found = Vec::new();
    for attr in &method.attrs {
        if let Some(declaration) = declarations::parse(attr)? {
            found.push(declaration);
        }
    }
    Ok(HandlerInfo {
        fn_name: method.sig.ident.clone(),
        is_async: method.sig.asyncness.is_some(),
        declarations: found,
    })
}
