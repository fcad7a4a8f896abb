//! Handler-owning types and how their methods become chain entries.
//!
//! A controller is usually declared through macros:
//! - `#[controller(path = "...")]` on the struct provides `base_path()`
//! - `#[routes]` on the `impl` block implements [`Controller`]
//! - `#[get]`, `#[post]`, `#[use_sync]`, `#[validate_body]`, ... on methods
//!
//! Implementing [`Controller`] by hand is equivalent:
//!
//! ```
//! use routecraft::controller::{Controller, HandlerDef};
//! use routecraft::exception::AppError;
//! use routecraft::http::{HttpRequest, HttpResponse};
//! use routecraft::metadata::Declarations;
//! use routecraft::middleware::Next;
//!
//! struct HealthController;
//!
//! impl HealthController {
//!     fn check(&self, _: &mut HttpRequest, res: &mut HttpResponse, _: &mut Next) -> Result<(), AppError> {
//!         res.text("ok");
//!         Ok(())
//!     }
//!
//!     async fn ping(&self, _: &mut HttpRequest, res: &mut HttpResponse, _: &mut Next) -> Result<(), AppError> {
//!         res.text("pong");
//!         Ok(())
//!     }
//! }
//!
//! impl Controller for HealthController {
//!     fn declare(d: &mut Declarations<'_, Self>) {
//!         d.method("check").get("/");
//!         d.method("ping").get("/ping").async_handler();
//!     }
//!
//!     fn handlers() -> Vec<HandlerDef<Self>> {
//!         vec![
//!             HandlerDef::sync("check", Self::check),
//!             HandlerDef::asynchronous("ping", |c, req, res, next| Box::pin(c.ping(req, res, next))),
//!         ]
//!     }
//! }
//! ```

use crate::exception::AppError;
use crate::http::{HttpRequest, HttpResponse};
use crate::metadata::Declarations;
use crate::middleware::{AsyncMiddleware, Middleware, Next};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;

pub mod registrar;

pub use registrar::{Registrar, join_path};

/// A synchronous handler method.
pub type SyncHandler<C> =
    fn(&C, &mut HttpRequest, &mut HttpResponse, &mut Next) -> Result<(), AppError>;

/// An asynchronous handler method, boxed so it can be stored as a plain
/// function pointer.
pub type AsyncHandler<C> = for<'a> fn(
    &'a C,
    &'a mut HttpRequest,
    &'a mut HttpResponse,
    &'a mut Next,
) -> BoxFuture<'a, Result<(), AppError>>;

/// How a handler is implemented.
pub enum HandlerFn<C> {
    Sync(SyncHandler<C>),
    Async(AsyncHandler<C>),
}

impl<C> Clone for HandlerFn<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for HandlerFn<C> {}

/// One handler method of a controller, by name.
pub struct HandlerDef<C> {
    name: &'static str,
    handler: HandlerFn<C>,
}

impl<C> HandlerDef<C> {
    pub fn sync(name: &'static str, handler: SyncHandler<C>) -> Self {
        Self {
            name,
            handler: HandlerFn::Sync(handler),
        }
    }

    pub fn asynchronous(name: &'static str, handler: AsyncHandler<C>) -> Self {
        Self {
            name,
            handler: HandlerFn::Async(handler),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn handler(&self) -> HandlerFn<C> {
        self.handler
    }
}

/// A handler-owning type.
///
/// `declare` only writes metadata and runs once per type. `handlers` lists
/// every method that must end up registered.
pub trait Controller: Send + Sync + Sized + 'static {
    fn declare(declarations: &mut Declarations<'_, Self>);

    fn handlers() -> Vec<HandlerDef<Self>>;
}

/// A sync handler bound to its controller instance.
pub(crate) struct BoundSync<C> {
    pub(crate) controller: Arc<C>,
    pub(crate) handler: SyncHandler<C>,
    pub(crate) name: String,
}

impl<C: Controller> Middleware for BoundSync<C> {
    fn handle(&self, req: &mut HttpRequest, res: &mut HttpResponse, next: &mut Next) -> Result<(), AppError> {
        (self.handler)(&self.controller, req, res, next)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// An async handler bound to its controller instance.
pub(crate) struct BoundAsync<C> {
    pub(crate) controller: Arc<C>,
    pub(crate) handler: AsyncHandler<C>,
    pub(crate) name: String,
}

#[async_trait]
impl<C: Controller> AsyncMiddleware for BoundAsync<C> {
    async fn handle(
        &self,
        req: &mut HttpRequest,
        res: &mut HttpResponse,
        next: &mut Next,
    ) -> Result<(), AppError> {
        (self.handler)(self.controller.as_ref(), req, res, next).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Lets a sync handler that was marked async go through the async wrapper.
pub(crate) struct SyncAsAsync(pub(crate) Arc<dyn Middleware>);

#[async_trait]
impl AsyncMiddleware for SyncAsAsync {
    async fn handle(
        &self,
        req: &mut HttpRequest,
        res: &mut HttpResponse,
        next: &mut Next,
    ) -> Result<(), AppError> {
        self.0.handle(req, res, next)
    }

    fn name(&self) -> &str {
        self.0.name()
    }
}
