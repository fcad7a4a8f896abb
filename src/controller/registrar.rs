use super::{BoundAsync, BoundSync, Controller, HandlerDef, HandlerFn, SyncAsAsync};
use crate::error::{Result, RoutecraftError};
use crate::http::HttpMethod;
use crate::metadata::{FrozenMetadata, MetadataRecord, MethodKey};
use crate::middleware::{BodyValidator, Chain, ChainEntry, handle_async_errors};
use crate::router::SharedRouter;
use std::sync::Arc;

/// Concatenate a controller prefix and a route.
///
/// Repeated slashes collapse, a trailing slash is dropped and the result
/// always starts with `/`.
pub fn join_path(prefix: &str, route: &str) -> String {
    let joined = format!("{prefix}{route}");
    let segments: Vec<&str> = joined.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

/// Turns frozen metadata into router registrations.
///
/// For every handler method the chain is, in this order:
/// `[body gate, sync middleware..., wrapped async middleware..., handler]`.
/// The gate always comes first so a malformed body never reaches user
/// middleware, whatever order the declarations were written in.
pub struct Registrar<'r> {
    metadata: &'r FrozenMetadata,
    router: &'r mut SharedRouter,
}

impl<'r> Registrar<'r> {
    pub fn new(metadata: &'r FrozenMetadata, router: &'r mut SharedRouter) -> Self {
        Self { metadata, router }
    }

    /// Register every handler of `C` under `prefix`.
    ///
    /// All chains are built before any is registered, so a declaration error
    /// leaves the router untouched.
    pub fn register<C: Controller>(&mut self, prefix: &str, controller: Arc<C>) -> Result<()> {
        let handlers = C::handlers();

        if let Some(stray) = self
            .metadata
            .methods_of::<C>()
            .find(|key| !handlers.iter().any(|h| h.name() == key.method()))
        {
            return Err(RoutecraftError::UnknownHandler {
                owner: stray.owner_name().to_string(),
                method: stray.method().to_string(),
            });
        }

        let mut registrations = Vec::with_capacity(handlers.len());
        for def in &handlers {
            let key = MethodKey::of::<C>(def.name());
            let record = self.metadata.record(&key).ok_or_else(|| {
                RoutecraftError::UndeclaredHandler {
                    owner: key.owner_name().to_string(),
                    method: key.method().to_string(),
                }
            })?;
            let (route, method) = Self::route_of(&key, record)?;
            let chain = Self::build_chain(&key, record, def, &controller)?;
            registrations.push((join_path(prefix, route), method, chain, key));
        }

        let mapped: Vec<String> = registrations
            .iter()
            .map(|(path, method, chain, key)| format!("{method} {path} -> {key} ({} entries)", chain.len()))
            .collect();
        self.router.register_all(
            registrations
                .into_iter()
                .map(|(path, method, chain, _)| (path, method, chain)),
        )?;
        for line in mapped {
            tracing::debug!("Mapped {}", line);
        }
        Ok(())
    }

    fn route_of<'m>(key: &MethodKey, record: &'m MetadataRecord) -> Result<(&'m str, HttpMethod)> {
        let route = record.route().ok_or_else(|| RoutecraftError::MissingRoute {
            owner: key.owner_name().to_string(),
            method: key.method().to_string(),
        })?;
        let method = record
            .http_method()
            .ok_or_else(|| RoutecraftError::MissingHttpMethod {
                owner: key.owner_name().to_string(),
                method: key.method().to_string(),
            })?;
        Ok((route, method))
    }

    fn build_chain<C: Controller>(
        key: &MethodKey,
        record: &MetadataRecord,
        def: &HandlerDef<C>,
        controller: &Arc<C>,
    ) -> Result<Chain> {
        let mut entries = Vec::with_capacity(
            2 + record.sync_middleware().len() + record.async_middleware().len(),
        );
        entries.push(ChainEntry::sync(BodyValidator::new(
            record.body_rules().iter().cloned(),
        )));
        entries.extend(record.sync_middleware().iter().cloned().map(ChainEntry::Sync));
        entries.extend(record.async_middleware().iter().cloned().map(handle_async_errors));
        entries.push(Self::terminal(key, record.is_async(), def.handler(), controller)?);
        Ok(Chain::new(entries))
    }

    fn terminal<C: Controller>(
        key: &MethodKey,
        is_async: bool,
        handler: HandlerFn<C>,
        controller: &Arc<C>,
    ) -> Result<ChainEntry> {
        let name = key.to_string();
        let controller = controller.clone();
        match (handler, is_async) {
            (HandlerFn::Sync(handler), false) => Ok(ChainEntry::Sync(Arc::new(BoundSync {
                controller,
                handler,
                name,
            }))),
            (HandlerFn::Sync(handler), true) => Ok(handle_async_errors(Arc::new(SyncAsAsync(
                Arc::new(BoundSync {
                    controller,
                    handler,
                    name,
                }),
            )))),
            (HandlerFn::Async(handler), true) => Ok(handle_async_errors(Arc::new(BoundAsync {
                controller,
                handler,
                name,
            }))),
            (HandlerFn::Async(_), false) => Err(RoutecraftError::UnmarkedAsyncHandler {
                owner: key.owner_name().to_string(),
                method: key.method().to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::AppError;
    use crate::http::{HttpRequest, HttpResponse};
    use crate::metadata::{Declarations, MetadataStore};
    use crate::middleware::{BodyRule, Next, PrimitiveType, from_fn};

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("/widgets", "/"), "/widgets");
        assert_eq!(join_path("/widgets", "/:id"), "/widgets/:id");
        assert_eq!(join_path("", "/"), "/");
        assert_eq!(join_path("/api/", "/widgets/"), "/api/widgets");
        assert_eq!(join_path("api", "widgets"), "/apiwidgets");
    }

    struct Widgets;

    impl Widgets {
        fn list(&self, _: &mut HttpRequest, res: &mut HttpResponse, _: &mut Next) -> std::result::Result<(), AppError> {
            res.text("[]");
            Ok(())
        }

        async fn create(
            &self,
            _: &mut HttpRequest,
            res: &mut HttpResponse,
            _: &mut Next,
        ) -> std::result::Result<(), AppError> {
            res.text("created");
            Ok(())
        }
    }

    // Declarations are written per test below, so `declare` is left empty.
    impl Controller for Widgets {
        fn declare(_: &mut Declarations<'_, Self>) {}

        fn handlers() -> Vec<HandlerDef<Self>> {
            vec![
                HandlerDef::sync("list", Self::list),
                HandlerDef::asynchronous("create", |c, req, res, next| Box::pin(c.create(req, res, next))),
            ]
        }
    }

    fn frozen(declare: impl FnOnce(&mut Declarations<'_, Widgets>)) -> FrozenMetadata {
        let mut store = MetadataStore::new();
        declare(&mut Declarations::new(&mut store));
        store.freeze()
    }

    fn register_with(metadata: &FrozenMetadata) -> Result<SharedRouter> {
        let mut router = SharedRouter::new();
        Registrar::new(metadata, &mut router).register("/widgets", Arc::new(Widgets))?;
        Ok(router)
    }

    fn names(router: &SharedRouter, path: &str, method: HttpMethod) -> Vec<String> {
        router
            .chain(path, method)
            .unwrap()
            .entries()
            .iter()
            .map(|e| e.name().to_string())
            .collect()
    }

    #[test]
    fn test_chain_order_regardless_of_declaration_order() {
        let metadata = frozen(|d| {
            d.method("list").get("/");
            d.method("create")
                .async_handler()
                .use_sync([from_fn(|_, _, next| {
                    next.proceed();
                    Ok(())
                })])
                .post("/")
                .validate_body([BodyRule::new("title", PrimitiveType::String)]);
        });
        let router = register_with(&metadata).unwrap();

        let chain = router.chain("/widgets", HttpMethod::Post).unwrap();
        let entries = chain.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].name(), "BodyValidator");
        assert!(!entries[1].is_async());
        assert!(entries[2].is_async());
        assert!(entries[2].name().ends_with("::create"));

        assert_eq!(names(&router, "/widgets", HttpMethod::Get).len(), 2);
    }

    #[test]
    fn test_missing_route_fails() {
        let metadata = frozen(|d| {
            d.method("list").get("/");
            d.method("create").async_handler();
        });
        let err = register_with(&metadata).unwrap_err();
        assert!(matches!(err, RoutecraftError::MissingRoute { ref method, .. } if method == "create"));
    }

    #[test]
    fn test_unmarked_async_handler_fails() {
        let metadata = frozen(|d| {
            d.method("list").get("/");
            d.method("create").post("/");
        });
        let err = register_with(&metadata).unwrap_err();
        assert!(matches!(err, RoutecraftError::UnmarkedAsyncHandler { .. }));
    }

    #[test]
    fn test_record_for_unknown_method_fails() {
        let metadata = frozen(|d| {
            d.method("list").get("/");
            d.method("create").post("/").async_handler();
            d.method("remove").delete("/:id");
        });
        let err = register_with(&metadata).unwrap_err();
        assert!(matches!(err, RoutecraftError::UnknownHandler { ref method, .. } if method == "remove"));
    }

    #[test]
    fn test_failed_registration_leaves_router_untouched() {
        let metadata = frozen(|d| {
            d.method("list").get("/");
            d.method("create").async_handler();
        });
        let mut router = SharedRouter::new();
        assert!(Registrar::new(&metadata, &mut router)
            .register("/widgets", Arc::new(Widgets))
            .is_err());
        assert_eq!(router.routes().count(), 0);
    }

    #[test]
    fn test_route_collision_leaves_router_untouched() {
        let metadata = frozen(|d| {
            d.method("list").get("/");
            d.method("create").get("/").async_handler();
        });
        let mut router = SharedRouter::new();
        let err = Registrar::new(&metadata, &mut router)
            .register("/dup", Arc::new(Widgets))
            .unwrap_err();
        assert!(matches!(err, RoutecraftError::DuplicateRoute { method: HttpMethod::Get, ref path } if path == "/dup"));
        assert_eq!(router.routes().count(), 0);
    }

    #[test]
    fn test_collision_with_existing_route_keeps_existing_only() {
        let metadata = frozen(|d| {
            d.method("list").get("/");
            d.method("create").post("/:id").async_handler();
        });
        let mut router = SharedRouter::new();
        router
            .route("/widgets/:name")
            .get(Chain::new(vec![]))
            .unwrap();
        let err = Registrar::new(&metadata, &mut router)
            .register("/widgets", Arc::new(Widgets))
            .unwrap_err();
        assert!(matches!(err, RoutecraftError::ConflictingRoute { .. }));
        assert_eq!(
            router.routes().collect::<Vec<_>>(),
            [("/widgets/:name", HttpMethod::Get)]
        );
    }

    #[test]
    fn test_undeclared_handler_fails() {
        let metadata = frozen(|d| {
            d.method("list").get("/");
        });
        let err = register_with(&metadata).unwrap_err();
        assert!(matches!(err, RoutecraftError::UndeclaredHandler { ref method, .. } if method == "create"));
    }
}
