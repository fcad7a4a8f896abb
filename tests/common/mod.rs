#![allow(dead_code)]

use routecraft::axum::{
    Router,
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, Request, StatusCode},
};
use routecraft::prelude::*;
use serde_json::Value;
use tower::ServiceExt;

/// Appends its label to the `x-trace` response header so tests can read the
/// order entries ran in.
pub struct Mark(pub &'static str);

impl Middleware for Mark {
    fn handle(&self, _: &mut HttpRequest, res: &mut HttpResponse, next: &mut Next) -> Result<(), AppError> {
        trace(res, self.0);
        next.proceed();
        Ok(())
    }
}

pub struct AsyncMark(pub &'static str);

#[async_trait]
impl AsyncMiddleware for AsyncMark {
    async fn handle(&self, _: &mut HttpRequest, res: &mut HttpResponse, next: &mut Next) -> Result<(), AppError> {
        tokio::task::yield_now().await;
        trace(res, self.0);
        next.proceed();
        Ok(())
    }
}

pub fn trace(res: &mut HttpResponse, label: &str) {
    let current = res
        .headers()
        .get("x-trace")
        .and_then(|v| v.to_str().ok())
        .map(|v| format!("{v},{label}"))
        .unwrap_or_else(|| label.to_string());
    res.set_header(
        HeaderName::from_static("x-trace"),
        HeaderValue::from_str(&current).unwrap(),
    );
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Reply {
    pub fn trace(&self) -> Option<&str> {
        self.headers.get("x-trace").and_then(|v| v.to_str().ok())
    }
}

pub fn app(router: SharedRouter) -> Router {
    router.into_axum(Arc::new(GlobalErrorFilter::default()), 1024)
}

pub async fn send(app: &Router, method: &str, uri: &str, json: Option<&str>) -> Reply {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match json {
        Some(json) => {
            request = request.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = routecraft::axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    Reply { status, headers, body }
}
