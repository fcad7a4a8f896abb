//! Per-method registration metadata.
//!
//! Declarations write into a [`MetadataStore`]; once every controller has been
//! declared the store is frozen into a [`FrozenMetadata`], which is the only
//! thing the registrar accepts. Declaring and resolving therefore cannot
//! interleave.

use crate::controller::Controller;
use crate::http::HttpMethod;
use crate::middleware::{AsyncMiddleware, BodyRule, Middleware};
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use strum_macros::{Display, EnumDiscriminants};

pub mod annotations;

pub use annotations::{Annotation, Declarations, MethodDeclaration};

/// Identifies one method of one handler-owning type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodKey {
    owner: TypeId,
    owner_name: &'static str,
    method: &'static str,
}

impl MethodKey {
    pub fn of<C: 'static>(method: &'static str) -> Self {
        Self {
            owner: TypeId::of::<C>(),
            owner_name: std::any::type_name::<C>(),
            method,
        }
    }

    pub fn owner(&self) -> TypeId {
        self.owner
    }

    pub fn owner_name(&self) -> &'static str {
        self.owner_name
    }

    pub fn method(&self) -> &'static str {
        self.method
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.owner_name, self.method)
    }
}

/// One facet of a metadata record, as written by a declaration.
#[derive(Clone, EnumDiscriminants)]
#[strum_discriminants(name(FacetKind), derive(Hash, Display))]
pub enum Facet {
    Route(String),
    HttpMethod(HttpMethod),
    Async(bool),
    SyncMiddleware(Vec<Arc<dyn Middleware>>),
    AsyncMiddleware(Vec<Arc<dyn AsyncMiddleware>>),
    BodyRules(Vec<BodyRule>),
}

impl fmt::Debug for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Facet::Route(route) => f.debug_tuple("Route").field(route).finish(),
            Facet::HttpMethod(method) => f.debug_tuple("HttpMethod").field(method).finish(),
            Facet::Async(flag) => f.debug_tuple("Async").field(flag).finish(),
            Facet::SyncMiddleware(list) => f
                .debug_tuple("SyncMiddleware")
                .field(&list.iter().map(|m| m.name()).collect::<Vec<_>>())
                .finish(),
            Facet::AsyncMiddleware(list) => f
                .debug_tuple("AsyncMiddleware")
                .field(&list.iter().map(|m| m.name()).collect::<Vec<_>>())
                .finish(),
            Facet::BodyRules(rules) => f.debug_tuple("BodyRules").field(rules).finish(),
        }
    }
}

/// Everything declared about one handler method.
///
/// Every facet is optional so that "never declared" stays distinguishable
/// from "declared empty".
#[derive(Clone, Default)]
pub struct MetadataRecord {
    route: Option<String>,
    http_method: Option<HttpMethod>,
    is_async: Option<bool>,
    sync_middleware: Option<Vec<Arc<dyn Middleware>>>,
    async_middleware: Option<Vec<Arc<dyn AsyncMiddleware>>>,
    body_rules: Option<Vec<BodyRule>>,
}

impl MetadataRecord {
    /// Scalar facets and body rules overwrite; middleware facets append to
    /// their own list, in call order.
    fn apply(&mut self, facet: Facet) {
        match facet {
            Facet::Route(route) => self.route = Some(route),
            Facet::HttpMethod(method) => self.http_method = Some(method),
            Facet::Async(flag) => self.is_async = Some(flag),
            Facet::SyncMiddleware(list) => {
                self.sync_middleware.get_or_insert_with(Vec::new).extend(list)
            }
            Facet::AsyncMiddleware(list) => {
                self.async_middleware.get_or_insert_with(Vec::new).extend(list)
            }
            Facet::BodyRules(rules) => self.body_rules = Some(rules),
        }
    }

    fn facet(&self, kind: FacetKind) -> Option<Facet> {
        match kind {
            FacetKind::Route => self.route.clone().map(Facet::Route),
            FacetKind::HttpMethod => self.http_method.map(Facet::HttpMethod),
            FacetKind::Async => self.is_async.map(Facet::Async),
            FacetKind::SyncMiddleware => self.sync_middleware.clone().map(Facet::SyncMiddleware),
            FacetKind::AsyncMiddleware => {
                self.async_middleware.clone().map(Facet::AsyncMiddleware)
            }
            FacetKind::BodyRules => self.body_rules.clone().map(Facet::BodyRules),
        }
    }

    pub fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }

    pub fn http_method(&self) -> Option<HttpMethod> {
        self.http_method
    }

    /// `false` unless the async marker was applied.
    pub fn is_async(&self) -> bool {
        self.is_async.unwrap_or(false)
    }

    pub fn sync_middleware(&self) -> &[Arc<dyn Middleware>] {
        self.sync_middleware.as_deref().unwrap_or_default()
    }

    pub fn async_middleware(&self) -> &[Arc<dyn AsyncMiddleware>] {
        self.async_middleware.as_deref().unwrap_or_default()
    }

    pub fn body_rules(&self) -> &[BodyRule] {
        self.body_rules.as_deref().unwrap_or_default()
    }
}

impl fmt::Debug for MetadataRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataRecord")
            .field("route", &self.route)
            .field("http_method", &self.http_method)
            .field("is_async", &self.is_async)
            .field(
                "sync_middleware",
                &self.sync_middleware.as_ref().map(|l| l.iter().map(|m| m.name()).collect::<Vec<_>>()),
            )
            .field(
                "async_middleware",
                &self.async_middleware.as_ref().map(|l| l.iter().map(|m| m.name()).collect::<Vec<_>>()),
            )
            .field("body_rules", &self.body_rules)
            .finish()
    }
}

/// Write side of the metadata table, used during the declaration phase.
#[derive(Debug, Default)]
pub struct MetadataStore {
    records: HashMap<MethodKey, MetadataRecord>,
    declared: HashSet<TypeId>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &MethodKey, facet: Facet) {
        self.records.entry(*key).or_default().apply(facet);
    }

    pub fn get(&self, key: &MethodKey, kind: FacetKind) -> Option<Facet> {
        self.records.get(key).and_then(|record| record.facet(kind))
    }

    pub fn record(&self, key: &MethodKey) -> Option<&MetadataRecord> {
        self.records.get(key)
    }

    /// Run `C`'s declarations. A type is declared at most once, so mounting it
    /// under several prefixes does not duplicate its middleware.
    pub fn declare<C: Controller>(&mut self) -> bool {
        if !self.declared.insert(TypeId::of::<C>()) {
            return false;
        }
        C::declare(&mut Declarations::new(self));
        tracing::trace!("Declared {}", std::any::type_name::<C>());
        true
    }

    /// End the declaration phase.
    pub fn freeze(self) -> FrozenMetadata {
        FrozenMetadata {
            records: Arc::new(self.records),
        }
    }
}

/// Read side of the metadata table, consumed by the registrar.
#[derive(Debug, Clone, Default)]
pub struct FrozenMetadata {
    records: Arc<HashMap<MethodKey, MetadataRecord>>,
}

impl FrozenMetadata {
    pub fn get(&self, key: &MethodKey, kind: FacetKind) -> Option<Facet> {
        self.records.get(key).and_then(|record| record.facet(kind))
    }

    pub fn record(&self, key: &MethodKey) -> Option<&MetadataRecord> {
        self.records.get(key)
    }

    /// Every method of `C` that has a record.
    pub fn methods_of<C: 'static>(&self) -> impl Iterator<Item = &MethodKey> + '_ {
        let owner = TypeId::of::<C>();
        self.records.keys().filter(move |key| key.owner == owner)
    }
}
