//! The application-wide router every controller registers into.
//!
//! Registrations accumulate in a [`SharedRouter`] during startup; it is then
//! turned into an [`axum::Router`] exactly once with [`SharedRouter::into_axum`].

use crate::controller::{Controller, Registrar, join_path};
use crate::error::{Result, RoutecraftError};
use crate::exception::ExceptionFilter;
use crate::http::HttpMethod;
use crate::metadata::MetadataStore;
use crate::middleware::{Chain, ChainEntry, Middleware};
use axum::extract::Request;
use axum::routing::MethodRouter;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

mod dispatch;

use dispatch::Dispatcher;

/// Route chains keyed by path, then by method.
#[derive(Default)]
pub struct SharedRouter {
    routes: BTreeMap<String, BTreeMap<HttpMethod, Chain>>,
    global: Vec<Arc<dyn Middleware>>,
}

impl SharedRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare controllers, then register them once the declarations are frozen.
    pub fn builder() -> RouterBuilder {
        RouterBuilder::default()
    }

    /// Start registering chains for `path`. Express-style `:param` and
    /// `*wildcard` segments are accepted.
    pub fn route(&mut self, path: &str) -> RouteBuilder<'_> {
        RouteBuilder {
            router: self,
            path: join_path("", path),
        }
    }

    /// Register several chains at once. They are staged on a copy of the
    /// route table, so on error none of them is kept.
    pub fn register_all(&mut self, chains: impl IntoIterator<Item = (String, HttpMethod, Chain)>) -> Result<()> {
        let mut staged = SharedRouter {
            routes: self.routes.clone(),
            global: Vec::new(),
        };
        for (path, method, chain) in chains {
            staged.route(&path).method(method, chain)?;
        }
        self.routes = staged.routes;
        Ok(())
    }

    /// Add middleware that runs before every route chain, in the order added.
    pub fn use_global(&mut self, middleware: Arc<dyn Middleware>) -> &mut Self {
        tracing::debug!("Global middleware {}", middleware.name());
        self.global.push(middleware);
        self
    }

    pub fn chain(&self, path: &str, method: HttpMethod) -> Option<&Chain> {
        self.routes.get(path).and_then(|methods| methods.get(&method))
    }

    /// Every registered `(path, method)` pair.
    pub fn routes(&self) -> impl Iterator<Item = (&str, HttpMethod)> + '_ {
        self.routes
            .iter()
            .flat_map(|(path, methods)| methods.keys().map(move |m| (path.as_str(), *m)))
    }

    /// Build the Axum router.
    ///
    /// A concrete method on a path wins over `all` on the same path. Unknown
    /// paths, and known paths hit with a method nobody registered, get a 404
    /// from `filter` after the global middleware ran.
    pub fn into_axum<S>(self, filter: Arc<dyn ExceptionFilter>, body_limit: usize) -> axum::Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let global: Chain = self.global.into_iter().map(ChainEntry::Sync).collect();
        let not_found = Arc::new(Dispatcher::new(global.clone(), None, filter.clone(), body_limit));

        let mut router = axum::Router::new();
        for (path, methods) in self.routes {
            let mut method_router = MethodRouter::new();
            let mut has_all = false;
            for (method, chain) in methods {
                let dispatcher =
                    Arc::new(Dispatcher::new(global.clone(), Some(chain), filter.clone(), body_limit));
                let handler = move |request: Request| dispatcher.clone().dispatch(request);
                method_router = match method.method_filter() {
                    Some(method_filter) => method_router.on(method_filter, handler),
                    None => {
                        has_all = true;
                        method_router.fallback(handler)
                    }
                };
            }
            if !has_all {
                let not_found = not_found.clone();
                method_router =
                    method_router.fallback(move |request: Request| not_found.clone().dispatch(request));
            }
            router = router.route(&axum_path(&path), method_router);
        }
        router.fallback(move |request: Request| not_found.clone().dispatch(request))
    }
}

impl fmt::Debug for SharedRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedRouter")
            .field("routes", &self.routes)
            .field("global", &self.global.iter().map(|m| m.name()).collect::<Vec<_>>())
            .finish()
    }
}

/// Registers chains for a single path.
pub struct RouteBuilder<'r> {
    router: &'r mut SharedRouter,
    path: String,
}

impl RouteBuilder<'_> {
    pub fn method(&mut self, method: HttpMethod, chain: Chain) -> Result<&mut Self> {
        if !self.router.routes.contains_key(&self.path) {
            let shape = path_shape(&self.path);
            if let Some(existing) = self.router.routes.keys().find(|p| path_shape(p) == shape) {
                return Err(RoutecraftError::ConflictingRoute {
                    path: self.path.clone(),
                    existing: existing.clone(),
                });
            }
        }
        let methods = self.router.routes.entry(self.path.clone()).or_default();
        if methods.contains_key(&method) {
            return Err(RoutecraftError::DuplicateRoute {
                method,
                path: self.path.clone(),
            });
        }
        methods.insert(method, chain);
        Ok(self)
    }

    pub fn get(&mut self, chain: Chain) -> Result<&mut Self> {
        self.method(HttpMethod::Get, chain)
    }

    pub fn post(&mut self, chain: Chain) -> Result<&mut Self> {
        self.method(HttpMethod::Post, chain)
    }

    pub fn put(&mut self, chain: Chain) -> Result<&mut Self> {
        self.method(HttpMethod::Put, chain)
    }

    pub fn patch(&mut self, chain: Chain) -> Result<&mut Self> {
        self.method(HttpMethod::Patch, chain)
    }

    pub fn delete(&mut self, chain: Chain) -> Result<&mut Self> {
        self.method(HttpMethod::Delete, chain)
    }

    pub fn all(&mut self, chain: Chain) -> Result<&mut Self> {
        self.method(HttpMethod::All, chain)
    }
}

type PendingRegistration = Box<dyn FnOnce(&mut Registrar<'_>) -> Result<()>>;

/// Collects controllers and global middleware, then runs both phases in
/// order: every declaration first, every registration after.
///
/// ```
/// # use routecraft::router::SharedRouter;
/// # use routecraft::middleware::ParameterSanitizer;
/// # use std::sync::Arc;
/// let router = SharedRouter::builder()
///     .use_global(Arc::new(ParameterSanitizer))
///     .build()
///     .unwrap();
/// assert_eq!(router.routes().count(), 0);
/// ```
#[derive(Default)]
pub struct RouterBuilder {
    store: MetadataStore,
    router: SharedRouter,
    pending: Vec<PendingRegistration>,
}

impl RouterBuilder {
    pub fn controller<C: Controller>(mut self, prefix: impl Into<String>, controller: Arc<C>) -> Self {
        self.store.declare::<C>();
        let prefix = prefix.into();
        self.pending
            .push(Box::new(move |registrar: &mut Registrar<'_>| registrar.register(&prefix, controller)));
        self
    }

    pub fn use_global(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.router.use_global(middleware);
        self
    }

    pub fn build(self) -> Result<SharedRouter> {
        let metadata = self.store.freeze();
        let mut router = self.router;
        let mut registrar = Registrar::new(&metadata, &mut router);
        for register in self.pending {
            register(&mut registrar)?;
        }
        Ok(router)
    }
}

/// `/widgets/:id/*rest` -> `/widgets/{id}/{*rest}`.
pub(crate) fn axum_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if let Some(name) = segment.strip_prefix(':') {
                format!("{{{name}}}")
            } else if let Some(name) = segment.strip_prefix('*') {
                let name = if name.is_empty() { "wildcard" } else { name };
                format!("{{*{name}}}")
            } else {
                segment.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// The path with parameter names erased, for conflict detection.
fn path_shape(path: &str) -> String {
    axum_path(path)
        .split('/')
        .map(|segment| {
            if segment.starts_with("{*") {
                "{*}"
            } else if segment.starts_with('{') {
                "{}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::AppError;
    use crate::exception::http::GlobalErrorFilter;
    use crate::middleware::from_fn;
    use axum::body::Body;
    use axum::http::StatusCode;
    use serde_json::Value;
    use tower::ServiceExt;

    fn reply(text: &'static str) -> Chain {
        Chain::new(vec![ChainEntry::Sync(from_fn(move |_, res, _| {
            res.text(text);
            Ok(())
        }))])
    }

    fn app(router: SharedRouter) -> axum::Router {
        router.into_axum(Arc::new(GlobalErrorFilter::default()), 1024)
    }

    async fn call(app: &axum::Router, method: &str, uri: &str) -> (StatusCode, String) {
        let response = app
            .clone()
            .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[test]
    fn test_axum_path() {
        assert_eq!(axum_path("/widgets/:id"), "/widgets/{id}");
        assert_eq!(axum_path("/files/*path"), "/files/{*path}");
        assert_eq!(axum_path("/"), "/");
    }

    #[test]
    fn test_duplicate_and_conflicting_routes() {
        let mut router = SharedRouter::new();
        router.route("/widgets/:id").get(reply("a")).unwrap();
        assert!(matches!(
            router.route("/widgets/:id").get(reply("b")),
            Err(RoutecraftError::DuplicateRoute { method: HttpMethod::Get, .. })
        ));
        assert!(matches!(
            router.route("/widgets/:name").post(reply("c")),
            Err(RoutecraftError::ConflictingRoute { .. })
        ));
        router.route("/widgets/:id").post(reply("d")).unwrap();
        assert_eq!(router.routes().count(), 2);
    }

    #[test]
    fn test_register_all_keeps_nothing_on_error() {
        let mut router = SharedRouter::new();
        router.route("/widgets").get(reply("list")).unwrap();

        let err = router
            .register_all([
                ("/gadgets".to_string(), HttpMethod::Get, reply("a")),
                ("/gadgets".to_string(), HttpMethod::Get, reply("b")),
            ])
            .unwrap_err();
        assert!(matches!(err, RoutecraftError::DuplicateRoute { ref path, .. } if path == "/gadgets"));
        assert_eq!(router.routes().collect::<Vec<_>>(), [("/widgets", HttpMethod::Get)]);

        router
            .register_all([("/gadgets".to_string(), HttpMethod::Post, reply("c"))])
            .unwrap();
        assert_eq!(router.routes().count(), 2);
    }

    #[tokio::test]
    async fn test_specific_method_beats_all() {
        let mut router = SharedRouter::new();
        router
            .route("/widgets")
            .all(reply("any"))
            .unwrap()
            .get(reply("list"))
            .unwrap();
        let app = app(router);

        assert_eq!(call(&app, "GET", "/widgets").await, (StatusCode::OK, "list".into()));
        assert_eq!(call(&app, "DELETE", "/widgets").await, (StatusCode::OK, "any".into()));
    }

    #[tokio::test]
    async fn test_unmatched_path_and_method_are_404() {
        let mut router = SharedRouter::new();
        router.route("/widgets").get(reply("list")).unwrap();
        let app = app(router);

        let (status, body) = call(&app, "GET", "/gadgets?x=1").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let body: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["message"], "Can't find /gadgets?x=1 on this server");

        let (status, _) = call(&app, "POST", "/widgets").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_global_middleware_runs_first_and_can_reject() {
        let mut router = SharedRouter::new();
        router.use_global(from_fn(|req, _, next| {
            if req.headers().contains_key("x-blocked") {
                return Err(AppError::new("blocked", StatusCode::FORBIDDEN).operational());
            }
            next.proceed();
            Ok(())
        }));
        router.route("/widgets").get(reply("list")).unwrap();
        let app = app(router);

        assert_eq!(call(&app, "GET", "/widgets").await.0, StatusCode::OK);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/widgets")
                    .header("x-blocked", "1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_exhausted_chain_is_404() {
        let mut router = SharedRouter::new();
        router
            .route("/widgets")
            .get(Chain::new(vec![ChainEntry::Sync(from_fn(|_, _, next| {
                next.proceed();
                Ok(())
            }))]))
            .unwrap();
        let (status, body) = call(&app(router), "GET", "/widgets").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("Cannot GET /widgets"));
    }
}
