//! Middleware, the continuation they are handed, and the chains they form.
//!
//! A route is served by an ordered [`Chain`] of [`ChainEntry`] values. Each
//! entry receives the request, the response being built and a fresh [`Next`].
//! After the entry returns, the chain looks at what it did with `Next`:
//!
//! - `proceed()` moves on to the following entry;
//! - `fail(err)` stops the chain and hands `err` to the error responder;
//! - neither means the entry produced the response itself.

use crate::exception::AppError;
use crate::http::{HttpRequest, HttpResponse};
use async_trait::async_trait;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

pub mod async_handler;
pub mod body;
pub mod rate_limit;
pub mod sanitize;

pub use async_handler::{AsyncErrorHandler, handle_async_errors};
pub use body::{BodyRule, BodyValidator, PrimitiveType};
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use sanitize::ParameterSanitizer;

/// A synchronous middleware or handler.
///
/// Returning `Err` is equivalent to calling `next.fail(err)`: synchronous
/// failures are bridged to the error responder by the chain itself, so sync
/// entries never need the async wrapper.
///
/// Implemented for any closure with the matching signature:
///
/// ```
/// use routecraft::middleware::{Middleware, Next};
/// use routecraft::http::{HttpRequest, HttpResponse};
/// use routecraft::exception::AppError;
///
/// fn require_json(req: &mut HttpRequest, _res: &mut HttpResponse, next: &mut Next) -> Result<(), AppError> {
///     if req.body.is_none() {
///         return Err(AppError::bad_request("JSON body required"));
///     }
///     next.proceed();
///     Ok(())
/// }
///
/// let _entry: std::sync::Arc<dyn Middleware> = std::sync::Arc::new(require_json);
/// ```
pub trait Middleware: Send + Sync + 'static {
    fn handle(
        &self,
        req: &mut HttpRequest,
        res: &mut HttpResponse,
        next: &mut Next,
    ) -> Result<(), AppError>;

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<F> Middleware for F
where
    F: Fn(&mut HttpRequest, &mut HttpResponse, &mut Next) -> Result<(), AppError>
        + Send
        + Sync
        + 'static,
{
    fn handle(
        &self,
        req: &mut HttpRequest,
        res: &mut HttpResponse,
        next: &mut Next,
    ) -> Result<(), AppError> {
        self(req, res, next)
    }
}

/// Turn a closure into a shareable [`Middleware`], fixing its signature so
/// argument and return types need no annotations.
pub fn from_fn<F>(f: F) -> Arc<dyn Middleware>
where
    F: Fn(&mut HttpRequest, &mut HttpResponse, &mut Next) -> Result<(), AppError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

/// An asynchronous middleware or handler.
///
/// Async entries can only join a chain through [`handle_async_errors`], which
/// forwards an `Err` result or a panic to `next.fail`.
#[async_trait]
pub trait AsyncMiddleware: Send + Sync + 'static {
    async fn handle(
        &self,
        req: &mut HttpRequest,
        res: &mut HttpResponse,
        next: &mut Next,
    ) -> Result<(), AppError>;

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// What an entry did with its continuation.
#[derive(Debug, Default)]
pub enum Outcome {
    /// Neither proceeded nor failed: the entry answered the request.
    #[default]
    Pending,
    Proceed,
    Failed(AppError),
}

/// The continuation handed to each chain entry.
#[derive(Debug, Default)]
pub struct Next {
    outcome: Outcome,
}

impl Next {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pass control to the next entry.
    pub fn proceed(&mut self) {
        match &self.outcome {
            Outcome::Pending => self.outcome = Outcome::Proceed,
            Outcome::Proceed => {}
            Outcome::Failed(_) => tracing::warn!("next.proceed() called after next.fail(); ignored"),
        }
    }

    /// Divert to the error responder. Only the first failure is kept.
    pub fn fail(&mut self, error: AppError) {
        match &self.outcome {
            Outcome::Failed(first) => tracing::warn!(
                "Ignoring failure \"{}\"; \"{}\" was already reported",
                error,
                first
            ),
            _ => self.outcome = Outcome::Failed(error),
        }
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, Outcome::Failed(_))
    }

    pub fn into_outcome(self) -> Outcome {
        self.outcome
    }
}

/// One position in a route chain.
///
/// The `Async` variant can only be built by [`handle_async_errors`].
#[derive(Clone)]
pub enum ChainEntry {
    Sync(Arc<dyn Middleware>),
    Async(Arc<AsyncErrorHandler>),
}

impl ChainEntry {
    pub fn sync(middleware: impl Middleware) -> Self {
        ChainEntry::Sync(Arc::new(middleware))
    }

    pub fn name(&self) -> &str {
        match self {
            ChainEntry::Sync(middleware) => middleware.name(),
            ChainEntry::Async(wrapper) => wrapper.name(),
        }
    }

    pub fn is_async(&self) -> bool {
        matches!(self, ChainEntry::Async(_))
    }

    pub(crate) async fn run(&self, req: &mut HttpRequest, res: &mut HttpResponse, next: &mut Next) {
        match self {
            ChainEntry::Sync(middleware) => {
                let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
                    middleware.handle(req, res, next)
                }));
                match result {
                    Ok(Ok(())) => {}
                    Ok(Err(error)) => next.fail(error),
                    Err(panic) => next.fail(async_handler::panic_error(middleware.name(), panic)),
                }
            }
            ChainEntry::Async(wrapper) => wrapper.call(req, res, next).await,
        }
    }
}

impl fmt::Debug for ChainEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_async() { "Async" } else { "Sync" };
        f.debug_tuple(kind).field(&self.name()).finish()
    }
}

/// How a chain run ended.
#[derive(Debug)]
pub enum ChainOutcome {
    /// An entry answered without proceeding.
    Responded,
    Failed(AppError),
    /// Every entry proceeded.
    Exhausted,
}

/// An immutable, shareable sequence of chain entries.
#[derive(Clone, Default)]
pub struct Chain {
    entries: Arc<[ChainEntry]>,
}

impl Chain {
    pub fn new(entries: Vec<ChainEntry>) -> Self {
        Self {
            entries: entries.into(),
        }
    }

    pub fn entries(&self) -> &[ChainEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub async fn run(&self, req: &mut HttpRequest, res: &mut HttpResponse) -> ChainOutcome {
        for entry in self.entries.iter() {
            let mut next = Next::new();
            entry.run(req, res, &mut next).await;
            match next.into_outcome() {
                Outcome::Proceed => continue,
                Outcome::Failed(error) => {
                    tracing::debug!("{} failed the request: {}", entry.name(), error);
                    return ChainOutcome::Failed(error);
                }
                Outcome::Pending => {
                    if !res.is_sent() {
                        tracing::debug!("{} ended the chain without a body", entry.name());
                    }
                    return ChainOutcome::Responded;
                }
            }
        }
        ChainOutcome::Exhausted
    }
}

impl FromIterator<ChainEntry> for Chain {
    fn from_iter<I: IntoIterator<Item = ChainEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.iter()).finish()
    }
}
