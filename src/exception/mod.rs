use axum::http::StatusCode;
use axum::response::Response;
use thiserror::Error;

pub mod http;

/// A request-time failure.
///
/// Every failure that happens while a request walks its middleware chain ends
/// up as an `AppError`, either passed to [`Next::fail`](crate::middleware::Next::fail)
/// or returned from a synchronous middleware. The error responder turns it
/// into the HTTP response.
///
/// `operational` errors are expected conditions whose message is safe to show
/// to a client. Anything else is reported generically in production.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct AppError {
    status_code: StatusCode,
    status: String,
    message: String,
    operational: bool,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    pub fn new(message: impl Into<String>, status_code: StatusCode) -> Self {
        Self {
            status_code,
            status: "failed".to_string(),
            message: message.into(),
            operational: false,
            source: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::BAD_REQUEST).operational()
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::NOT_FOUND).operational()
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Mark the error as an expected condition whose message may be shown.
    pub fn operational(mut self) -> Self {
        self.operational = true;
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_operational(&self) -> bool {
        self.operational
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal(err.to_string()).with_source(err)
    }
}

/// The ExceptionFilter trait
///
/// Filters are the terminal error handler of a request: they receive whatever
/// failure left the middleware chain and must return a valid Response.
pub trait ExceptionFilter: Send + Sync + 'static {
    /// Catch an error and return a response
    fn catch(&self, error: &AppError) -> Response;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_failed_non_operational() {
        let err = AppError::internal("boom");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.status(), "failed");
        assert_eq!(err.to_string(), "boom");
        assert!(!err.is_operational());
    }

    #[test]
    fn test_anyhow_conversion_keeps_source() {
        let err: AppError = anyhow::anyhow!("db down").into();
        assert_eq!(err.message(), "db down");
        assert!(std::error::Error::source(&err).is_some());
    }
}
