//! Declaration annotations.
//!
//! Each facility is a function returning a marker; applying the marker to a
//! method writes exactly one facet of that method's record. Markers can be
//! applied in any order. None of them does request-time work.
//!
//! ```
//! use routecraft::metadata::annotations::{async_handler, post, validate_body};
//! use routecraft::metadata::{MetadataStore, Declarations};
//! use routecraft::middleware::{BodyRule, PrimitiveType};
//!
//! struct WidgetController;
//!
//! let mut store = MetadataStore::new();
//! Declarations::<WidgetController>::new(&mut store)
//!     .annotate("create", validate_body([BodyRule::new("title", PrimitiveType::String)]))
//!     .annotate("create", post("/widgets"))
//!     .annotate("create", async_handler());
//! ```

use super::{Facet, MetadataStore, MethodKey};
use crate::http::HttpMethod;
use crate::middleware::{AsyncMiddleware, BodyRule, Middleware};
use std::marker::PhantomData;
use std::sync::Arc;

/// A method-level marker produced by a declaration facility.
pub trait Annotation {
    fn apply(self, store: &mut MetadataStore, key: &MethodKey);
}

/// Binds a route path and HTTP method.
#[derive(Debug, Clone)]
pub struct RouteBinding {
    method: HttpMethod,
    path: String,
}

impl Annotation for RouteBinding {
    fn apply(self, store: &mut MetadataStore, key: &MethodKey) {
        store.set(key, Facet::Route(self.path));
        store.set(key, Facet::HttpMethod(self.method));
    }
}

pub fn route(method: HttpMethod, path: impl Into<String>) -> RouteBinding {
    RouteBinding {
        method,
        path: path.into(),
    }
}

pub fn get(path: impl Into<String>) -> RouteBinding {
    route(HttpMethod::Get, path)
}

pub fn post(path: impl Into<String>) -> RouteBinding {
    route(HttpMethod::Post, path)
}

pub fn put(path: impl Into<String>) -> RouteBinding {
    route(HttpMethod::Put, path)
}

pub fn patch(path: impl Into<String>) -> RouteBinding {
    route(HttpMethod::Patch, path)
}

pub fn delete(path: impl Into<String>) -> RouteBinding {
    route(HttpMethod::Delete, path)
}

pub fn all(path: impl Into<String>) -> RouteBinding {
    route(HttpMethod::All, path)
}

/// Appends synchronous middleware.
pub struct Use(Vec<Arc<dyn Middleware>>);

impl Annotation for Use {
    fn apply(self, store: &mut MetadataStore, key: &MethodKey) {
        store.set(key, Facet::SyncMiddleware(self.0));
    }
}

pub fn use_sync<I>(middleware: I) -> Use
where
    I: IntoIterator<Item = Arc<dyn Middleware>>,
{
    Use(middleware.into_iter().collect())
}

/// Appends asynchronous middleware. Each entry is wrapped at registration so
/// its failures reach the error responder.
pub struct UseAsync(Vec<Arc<dyn AsyncMiddleware>>);

impl Annotation for UseAsync {
    fn apply(self, store: &mut MetadataStore, key: &MethodKey) {
        store.set(key, Facet::AsyncMiddleware(self.0));
    }
}

pub fn use_async<I>(middleware: I) -> UseAsync
where
    I: IntoIterator<Item = Arc<dyn AsyncMiddleware>>,
{
    UseAsync(middleware.into_iter().collect())
}

/// Marks the handler as asynchronous.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsyncMarker;

impl Annotation for AsyncMarker {
    fn apply(self, store: &mut MetadataStore, key: &MethodKey) {
        store.set(key, Facet::Async(true));
    }
}

pub fn async_handler() -> AsyncMarker {
    AsyncMarker
}

/// Declares the request-body fields the handler requires.
#[derive(Debug, Clone)]
pub struct BodyRules(Vec<BodyRule>);

impl Annotation for BodyRules {
    fn apply(self, store: &mut MetadataStore, key: &MethodKey) {
        store.set(key, Facet::BodyRules(self.0));
    }
}

pub fn validate_body<I>(rules: I) -> BodyRules
where
    I: IntoIterator<Item = BodyRule>,
{
    BodyRules(rules.into_iter().collect())
}

/// Declaration-phase view of the store, scoped to one handler-owning type.
pub struct Declarations<'s, C> {
    store: &'s mut MetadataStore,
    _owner: PhantomData<fn() -> C>,
}

impl<'s, C: 'static> Declarations<'s, C> {
    pub fn new(store: &'s mut MetadataStore) -> Self {
        Self {
            store,
            _owner: PhantomData,
        }
    }

    pub fn annotate(&mut self, method: &'static str, annotation: impl Annotation) -> &mut Self {
        annotation.apply(self.store, &MethodKey::of::<C>(method));
        self
    }

    /// Builder-style access to one method's declarations.
    pub fn method(&mut self, name: &'static str) -> MethodDeclaration<'_> {
        MethodDeclaration {
            store: self.store,
            key: MethodKey::of::<C>(name),
        }
    }
}

/// Chained declarations for a single method.
pub struct MethodDeclaration<'d> {
    store: &'d mut MetadataStore,
    key: MethodKey,
}

impl MethodDeclaration<'_> {
    pub fn annotate(&mut self, annotation: impl Annotation) -> &mut Self {
        annotation.apply(self.store, &self.key);
        self
    }

    pub fn route(&mut self, method: HttpMethod, path: impl Into<String>) -> &mut Self {
        self.annotate(route(method, path))
    }

    pub fn get(&mut self, path: impl Into<String>) -> &mut Self {
        self.annotate(get(path))
    }

    pub fn post(&mut self, path: impl Into<String>) -> &mut Self {
        self.annotate(post(path))
    }

    pub fn put(&mut self, path: impl Into<String>) -> &mut Self {
        self.annotate(put(path))
    }

    pub fn patch(&mut self, path: impl Into<String>) -> &mut Self {
        self.annotate(patch(path))
    }

    pub fn delete(&mut self, path: impl Into<String>) -> &mut Self {
        self.annotate(delete(path))
    }

    pub fn all(&mut self, path: impl Into<String>) -> &mut Self {
        self.annotate(all(path))
    }

    pub fn use_sync<I>(&mut self, middleware: I) -> &mut Self
    where
        I: IntoIterator<Item = Arc<dyn Middleware>>,
    {
        self.annotate(use_sync(middleware))
    }

    pub fn use_async<I>(&mut self, middleware: I) -> &mut Self
    where
        I: IntoIterator<Item = Arc<dyn AsyncMiddleware>>,
    {
        self.annotate(use_async(middleware))
    }

    pub fn async_handler(&mut self) -> &mut Self {
        self.annotate(async_handler())
    }

    pub fn validate_body<I>(&mut self, rules: I) -> &mut Self
    where
        I: IntoIterator<Item = BodyRule>,
    {
        self.annotate(validate_body(rules))
    }
}
