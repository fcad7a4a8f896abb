use proc_macro::TokenStream;

mod controller;
mod declarations;
mod standalone;

/// Attribute macro for defining a controller
///
/// Provides `base_path()`, the prefix every route of the controller is
/// mounted under.
///
/// # Example
/// ```ignore
/// #[controller(path = "/widgets")]
/// pub struct WidgetController {
///     store: Arc<WidgetStore>,
/// }
/// ```
#[proc_macro_attribute]
pub fn controller(attr: TokenStream, item: TokenStream) -> TokenStream {
    controller::controller_attribute(attr, item)
}

/// Attribute macro for declaring the handlers of an impl block
///
/// Implements `routecraft::Controller`: every method carrying one of the
/// declaration attributes below becomes a handler, and its attributes become
/// declarations, applied in the order they are written.
///
/// # Example
/// ```ignore
/// #[routes]
/// impl WidgetController {
///     #[post("/")]
///     #[use_sync(RequireTenant)]
///     #[validate_body(title: string, price: number)]
///     #[async_handler]
///     async fn create(&self, req: &mut HttpRequest, res: &mut HttpResponse, next: &mut Next) -> Result<(), AppError> {
///         // ...
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn routes(attr: TokenStream, item: TokenStream) -> TokenStream {
    controller::routes_attribute(attr, item)
}

/// HTTP GET route attribute for controller methods
#[proc_macro_attribute]
pub fn get(_attr: TokenStream, item: TokenStream) -> TokenStream {
    standalone::outside_routes("get", item.into()).into()
}

/// HTTP POST route attribute for controller methods
#[proc_macro_attribute]
pub fn post(_attr: TokenStream, item: TokenStream) -> TokenStream {
    standalone::outside_routes("post", item.into()).into()
}

/// HTTP PUT route attribute for controller methods
#[proc_macro_attribute]
pub fn put(_attr: TokenStream, item: TokenStream) -> TokenStream {
    standalone::outside_routes("put", item.into()).into()
}

/// HTTP DELETE route attribute for controller methods
#[proc_macro_attribute]
pub fn delete(_attr: TokenStream, item: TokenStream) -> TokenStream {
    standalone::outside_routes("delete", item.into()).into()
}

/// HTTP PATCH route attribute for controller methods
#[proc_macro_attribute]
pub fn patch(_attr: TokenStream, item: TokenStream) -> TokenStream {
    standalone::outside_routes("patch", item.into()).into()
}

/// Route attribute matching every HTTP method
#[proc_macro_attribute]
pub fn all(_attr: TokenStream, item: TokenStream) -> TokenStream {
    standalone::outside_routes("all", item.into()).into()
}

/// Synchronous middleware run before the handler, in the order listed.
/// Each argument must be a value implementing `routecraft::Middleware`.
#[proc_macro_attribute]
pub fn use_sync(_attr: TokenStream, item: TokenStream) -> TokenStream {
    standalone::outside_routes("use_sync", item.into()).into()
}

/// Asynchronous middleware run after the synchronous ones.
/// Each argument must be a value implementing `routecraft::AsyncMiddleware`.
#[proc_macro_attribute]
pub fn use_async(_attr: TokenStream, item: TokenStream) -> TokenStream {
    standalone::outside_routes("use_async", item.into()).into()
}

/// Marks the handler as asynchronous
#[proc_macro_attribute]
pub fn async_handler(_attr: TokenStream, item: TokenStream) -> TokenStream {
    standalone::outside_routes("async_handler", item.into()).into()
}

/// Required request-body fields
///
/// # Example
/// ```ignore
/// #[validate_body(title: string, price: number, "in-stock": boolean)]
/// ```
#[proc_macro_attribute]
pub fn validate_body(_attr: TokenStream, item: TokenStream) -> TokenStream {
    standalone::outside_routes("validate_body", item.into()).into()
}
