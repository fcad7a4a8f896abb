use super::{AsyncMiddleware, ChainEntry, Next};
use crate::exception::AppError;
use crate::http::{HttpRequest, HttpResponse};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Wraps an [`AsyncMiddleware`] so that whatever goes wrong while it runs
/// reaches `next.fail` instead of being lost.
pub struct AsyncErrorHandler {
    inner: Arc<dyn AsyncMiddleware>,
}

impl AsyncErrorHandler {
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Run the wrapped middleware to completion. An `Err` result and a panic
    /// are both forwarded to `next.fail`, exactly once.
    pub async fn call(&self, req: &mut HttpRequest, res: &mut HttpResponse, next: &mut Next) {
        let result = AssertUnwindSafe(self.inner.handle(req, res, next))
            .catch_unwind()
            .await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(error)) => next.fail(error),
            Err(panic) => next.fail(panic_error(self.name(), panic)),
        }
    }
}

/// The only way an async middleware or handler becomes a chain entry.
pub fn handle_async_errors(middleware: Arc<dyn AsyncMiddleware>) -> ChainEntry {
    ChainEntry::Async(Arc::new(AsyncErrorHandler { inner: middleware }))
}

pub(crate) fn panic_error(name: &str, panic: Box<dyn Any + Send>) -> AppError {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    tracing::error!("{} panicked: {}", name, detail);
    AppError::internal(format!("{name} panicked: {detail}"))
}
