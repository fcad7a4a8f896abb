//! # Routecraft
//!
//! Declarative route registration and middleware composition for Axum.
//!
//! Each handler method declares, independently and in any order, its route,
//! its HTTP method, whether it is asynchronous, which middleware runs before
//! it and which request-body fields it requires. Routecraft assembles those
//! declarations into one chain per route, always in the same order:
//!
//! ```text
//! [body gate, sync middleware..., async middleware..., handler]
//! ```
//!
//! Startup has two phases. Declarations only write metadata; registration
//! only reads it, after it has been frozen. Every async middleware and every
//! async handler is wrapped so its failures reach the error responder.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use routecraft::prelude::*;
//! use serde_json::json;
//!
//! #[controller(path = "/widgets")]
//! pub struct WidgetController;
//!
//! #[routes]
//! impl WidgetController {
//!     #[get("/")]
//!     fn list(&self, _req: &mut HttpRequest, res: &mut HttpResponse, _next: &mut Next) -> Result<(), AppError> {
//!         res.send(ApiResponse::success(json!([])))
//!     }
//!
//!     #[post("/")]
//!     #[async_handler]
//!     #[validate_body(title: string)]
//!     async fn create(&self, req: &mut HttpRequest, res: &mut HttpResponse, _next: &mut Next) -> Result<(), AppError> {
//!         let title = req.body.as_ref().and_then(|b| b["title"].as_str()).unwrap_or_default().to_string();
//!         res.send(ApiResponse::success(json!({ "title": title })).with_http_status(StatusCode::CREATED))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let router = SharedRouter::builder()
//!         .use_global(Arc::new(ParameterSanitizer))
//!         .controller(WidgetController::base_path(), Arc::new(WidgetController))
//!         .build()?;
//!
//!     let app: Router = router.into_axum(Arc::new(GlobalErrorFilter::default()), 10 * 1024);
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

extern crate self as routecraft;

pub mod common;
pub mod config;
pub mod controller;
pub mod error;
pub mod exception;
pub mod http;
pub mod metadata;
pub mod middleware;
pub mod router;

// Re-export core types
pub use common::ApiResponse;
pub use controller::{Controller, HandlerDef, Registrar};
pub use error::{Result, RoutecraftError};
pub use exception::{AppError, ExceptionFilter};
pub use metadata::{FrozenMetadata, MetadataStore};
pub use middleware::{AsyncMiddleware, Middleware, Next};
pub use router::SharedRouter;

// Re-export macros
pub use routecraft_macro::{
    all, async_handler, controller, delete, get, patch, post, put, routes, use_async, use_sync,
    validate_body,
};

// Re-export commonly used types from dependencies
pub use async_trait::async_trait;
pub use axum;
pub use futures::future::BoxFuture;

/// Prelude module for convenient imports
///
/// ```
/// use routecraft::prelude::*;
/// ```
pub mod prelude {
    pub use crate::common::{ApiResponse, ErrorDetail};
    pub use crate::config::{AppConfig, ConfigService, Environment};
    pub use crate::controller::{Controller, HandlerDef};
    pub use crate::error::RoutecraftError;
    pub use crate::exception::http::GlobalErrorFilter;
    pub use crate::exception::{AppError, ExceptionFilter};
    pub use crate::http::{HttpMethod, HttpRequest, HttpResponse};
    pub use crate::middleware::{
        AsyncMiddleware, BodyRule, Middleware, Next, ParameterSanitizer, PrimitiveType,
        RateLimitConfig, RateLimiter, from_fn,
    };
    pub use crate::router::SharedRouter;
    pub use crate::{
        all, async_handler, controller, delete, get, patch, post, put, routes, use_async,
        use_sync, validate_body,
    };
    pub use async_trait::async_trait;
    pub use axum::{Router, http::StatusCode};
    pub use std::sync::Arc;
}
