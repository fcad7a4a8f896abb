use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Standard API response envelope
///
/// Every JSON body the framework writes, success or failure, uses this shape
/// so clients can switch on `status`.
///
/// # Example
/// ```
/// use routecraft::common::ApiResponse;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Widget {
///     title: String,
/// }
///
/// let ok = ApiResponse::success(Widget { title: "gear".into() });
/// assert_eq!(ok.status, "success");
/// ```
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,

    #[serde(skip)]
    pub http_status: StatusCode,
}

/// Extra diagnostics attached to failures outside production.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    pub status_code: u16,
    pub operational: bool,
    pub timestamp: String,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful response with data
    ///
    /// Defaults to HTTP 200 OK.
    pub fn success(data: T) -> Self {
        Self {
            status: "success".to_string(),
            data: Some(data),
            message: None,
            error: None,
            http_status: StatusCode::OK,
        }
    }

    pub fn with_http_status(mut self, status: StatusCode) -> Self {
        self.http_status = status;
        self
    }
}

impl ApiResponse<()> {
    /// Create a failure response carrying only a message
    pub fn failure(http_status: StatusCode, status: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            data: None,
            message: Some(message.into()),
            error: None,
            http_status,
        }
    }

    pub fn with_detail(mut self, detail: ErrorDetail) -> Self {
        self.error = Some(detail);
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.http_status, Json(self)).into_response()
    }
}
