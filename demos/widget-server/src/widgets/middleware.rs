use routecraft::prelude::*;
use std::time::Instant;

/// Rejects requests whose `x-api-key` header does not match `WIDGETS_API_KEY`.
/// With the variable unset every request is let through.
pub struct RequireApiKey {
    expected: Option<String>,
}

impl RequireApiKey {
    pub fn from_env() -> Self {
        Self {
            expected: std::env::var("WIDGETS_API_KEY").ok().filter(|key| !key.is_empty()),
        }
    }
}

impl Middleware for RequireApiKey {
    fn handle(&self, req: &mut HttpRequest, _: &mut HttpResponse, next: &mut Next) -> Result<(), AppError> {
        let Some(expected) = &self.expected else {
            next.proceed();
            return Ok(());
        };
        let given = req.headers().get("x-api-key").and_then(|v| v.to_str().ok());
        if given == Some(expected.as_str()) {
            next.proceed();
            Ok(())
        } else {
            Err(AppError::new("Missing or invalid API key", StatusCode::UNAUTHORIZED).operational())
        }
    }

    fn name(&self) -> &str {
        "RequireApiKey"
    }
}

/// Logs who created what, after yielding once to the runtime.
pub struct AuditTrail;

#[async_trait]
impl AsyncMiddleware for AuditTrail {
    async fn handle(&self, req: &mut HttpRequest, _: &mut HttpResponse, next: &mut Next) -> Result<(), AppError> {
        let started = Instant::now();
        tokio::task::yield_now().await;
        let title = req
            .body
            .as_ref()
            .and_then(|body| body.get("title"))
            .and_then(|title| title.as_str())
            .unwrap_or_default();
        tracing::info!(
            request_id = %req.id(),
            remote = ?req.remote_addr(),
            "audit: create widget {:?} ({:?})",
            title,
            started.elapsed()
        );
        next.proceed();
        Ok(())
    }

    fn name(&self) -> &str {
        "AuditTrail"
    }
}
