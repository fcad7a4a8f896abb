use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{
    parse::{Parse, ParseStream},
    punctuated::Punctuated,
    Attribute, Expr, Ident, LitStr, Meta, Token,
};

pub const ROUTE_ATTRS: [&str; 6] = ["get", "post", "put", "patch", "delete", "all"];
pub const DECLARATION_ATTRS: [&str; 10] = [
    "get",
    "post",
    "put",
    "patch",
    "delete",
    "all",
    "use_sync",
    "use_async",
    "async_handler",
    "validate_body",
];

/// One declaration attribute on a handler method.
pub enum Declaration {
    Route { function: Ident, path: String },
    UseSync(Vec<Expr>),
    UseAsync(Vec<Expr>),
    AsyncHandler,
    ValidateBody(Vec<BodyField>),
}

pub struct BodyField {
    name: String,
    primitive: Ident,
}

impl Parse for BodyField {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let name = if input.peek(LitStr) {
            input.parse::<LitStr>()?.value()
        } else {
            input.parse::<Ident>()?.to_string()
        };
        input.parse::<Token![:]>()?;
        let ty: Ident = input.parse()?;
        let variant = match ty.to_string().as_str() {
            "string" => "String",
            "number" => "Number",
            "boolean" => "Boolean",
            "object" => "Object",
            "array" => "Array",
            other => {
                return Err(syn::Error::new(
                    ty.span(),
                    format!(
                        "unknown body field type `{other}`, expected one of string, number, boolean, object, array"
                    ),
                ))
            }
        };
        Ok(BodyField {
            name,
            primitive: Ident::new(variant, ty.span()),
        })
    }
}

pub fn is_declaration(attr: &Attribute) -> bool {
    attr.path()
        .get_ident()
        .is_some_and(|ident| DECLARATION_ATTRS.contains(&ident.to_string().as_str()))
}

pub fn parse(attr: &Attribute) -> syn::Result<Option<Declaration>> {
    let Some(ident) = attr.path().get_ident() else {
        return Ok(None);
    };
    let name = ident.to_string();
    let declaration = match name.as_str() {
        n if ROUTE_ATTRS.contains(&n) => {
            let path = match &attr.meta {
                Meta::Path(_) => "/".to_string(),
                _ => attr.parse_args::<LitStr>()?.value(),
            };
            Declaration::Route {
                function: Ident::new(n, Span::call_site()),
                path,
            }
        }
        "use_sync" => Declaration::UseSync(exprs(attr)?),
        "use_async" => Declaration::UseAsync(exprs(attr)?),
        "async_handler" => {
            if !matches!(attr.meta, Meta::Path(_)) {
                return Err(syn::Error::new_spanned(attr, "#[async_handler] takes no arguments"));
            }
            Declaration::AsyncHandler
        }
        "validate_body" => Declaration::ValidateBody(
            attr.parse_args_with(Punctuated::<BodyField, Token![,]>::parse_terminated)?
                .into_iter()
                .collect(),
        ),
        _ => return Ok(None),
    };
    Ok(Some(declaration))
}

fn exprs(attr: &Attribute) -> syn::Result<Vec<Expr>> {
    Ok(attr
        .parse_args_with(Punctuated::<Expr, Token![,]>::parse_terminated)?
        .into_iter()
        .collect())
}

impl Declaration {
    /// The annotation expression this declaration applies.
    pub fn annotation(&self) -> TokenStream2 {
        match self {
            Declaration::Route { function, path } => quote! {
                ::routecraft::metadata::annotations::#function(#path)
            },
            Declaration::UseSync(exprs) => quote! {
                ::routecraft::metadata::annotations::use_sync([
                    #(::std::sync::Arc::new(#exprs) as ::std::sync::Arc<dyn ::routecraft::Middleware>),*
                ])
            },
            Declaration::UseAsync(exprs) => quote! {
                ::routecraft::metadata::annotations::use_async([
                    #(::std::sync::Arc::new(#exprs) as ::std::sync::Arc<dyn ::routecraft::AsyncMiddleware>),*
                ])
            },
            Declaration::AsyncHandler => quote! {
                ::routecraft::metadata::annotations::async_handler()
            },
            Declaration::ValidateBody(fields) => {
                let rules = fields.iter().map(|field| {
                    let name = &field.name;
                    let primitive = &field.primitive;
                    quote! {
                        ::routecraft::middleware::BodyRule::new(
                            #name,
                            ::routecraft::middleware::PrimitiveType::#primitive,
                        )
                    }
                });
                quote! {
                    ::routecraft::metadata::annotations::validate_body([#(#rules),*])
                }
            }
        }
    }
}
