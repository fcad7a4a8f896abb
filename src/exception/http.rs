use crate::common::{ApiResponse, ErrorDetail};
use crate::config::Environment;
use crate::exception::{AppError, ExceptionFilter};
use axum::response::{IntoResponse, Response};

/// The application-wide error responder.
///
/// In development every error is reported with its message and diagnostics.
/// In production only operational errors show their message; anything else
/// is reported as "Something went wrong!".
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalErrorFilter {
    environment: Environment,
}

impl GlobalErrorFilter {
    pub fn new(environment: Environment) -> Self {
        Self { environment }
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }
}

impl ExceptionFilter for GlobalErrorFilter {
    fn catch(&self, error: &AppError) -> Response {
        let status = error.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "Exception intercepted: {:?}", error);
        } else {
            tracing::warn!(status = status.as_u16(), "Request rejected: {}", error);
        }

        let body = match self.environment {
            Environment::Development => {
                ApiResponse::failure(status, error.status(), error.message()).with_detail(ErrorDetail {
                    status_code: status.as_u16(),
                    operational: error.is_operational(),
                    timestamp: chrono::Utc::now().to_rfc3339(),
                })
            }
            Environment::Production if error.is_operational() => {
                ApiResponse::failure(status, error.status(), error.message())
            }
            Environment::Production => {
                ApiResponse::failure(status, error.status(), "Something went wrong!")
            }
        };
        body.into_response()
    }
}
