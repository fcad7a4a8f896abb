//! Request/response types handed to every middleware and handler.

use crate::common::ApiResponse;
use crate::exception::AppError;
use axum::{
    Json,
    body::Body,
    http::{Extensions, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri, request::Parts},
    response::{IntoResponse, Response},
    routing::MethodFilter,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use strum_macros::{Display, EnumString};
use uuid::Uuid;

pub mod query;

/// HTTP methods a route can be declared for. `All` matches any method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    All,
}

impl HttpMethod {
    /// The Axum filter for a concrete method; `None` for `All`.
    pub fn method_filter(self) -> Option<MethodFilter> {
        match self {
            HttpMethod::Get => Some(MethodFilter::GET),
            HttpMethod::Post => Some(MethodFilter::POST),
            HttpMethod::Put => Some(MethodFilter::PUT),
            HttpMethod::Patch => Some(MethodFilter::PATCH),
            HttpMethod::Delete => Some(MethodFilter::DELETE),
            HttpMethod::All => None,
        }
    }
}

/// The incoming request as seen by the middleware chain.
///
/// `body` is `None` when the request carried no JSON payload at all, which
/// the body validator distinguishes from an empty object.
#[derive(Debug)]
pub struct HttpRequest {
    id: Uuid,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    extensions: Extensions,
    remote_addr: Option<SocketAddr>,
    pub params: HashMap<String, String>,
    pub query: Map<String, Value>,
    pub body: Option<Value>,
}

impl HttpRequest {
    pub fn new(method: Method, uri: Uri) -> Self {
        let query = query::parse(uri.query().unwrap_or_default());
        Self {
            id: Uuid::new_v4(),
            method,
            uri,
            headers: HeaderMap::new(),
            extensions: Extensions::new(),
            remote_addr: None,
            params: HashMap::new(),
            query,
            body: None,
        }
    }

    pub(crate) fn from_parts(
        id: Uuid,
        parts: Parts,
        params: HashMap<String, String>,
        remote_addr: Option<SocketAddr>,
        body: Option<Value>,
    ) -> Self {
        let mut request = Self::new(parts.method, parts.uri);
        request.id = id;
        request.headers = parts.headers;
        request.extensions = parts.extensions;
        request.remote_addr = remote_addr;
        request.params = params;
        request.body = body;
        request
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Per-request storage for values one middleware hands to the next.
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

#[derive(Debug)]
enum Payload {
    Json(Value),
    Text(String),
}

/// The response being built by the chain.
///
/// Middleware may set status and headers without sending; a handler sends by
/// writing a payload. Headers survive a later failure and are copied onto the
/// error response.
#[derive(Debug)]
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    payload: Option<Payload>,
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpResponse {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            payload: None,
        }
    }

    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) -> &mut Self {
        self.headers.insert(name, value);
        self
    }

    /// Serialize `body` as the JSON payload.
    pub fn json<T: Serialize>(&mut self, body: &T) -> Result<(), AppError> {
        let value = serde_json::to_value(body)
            .map_err(|e| AppError::internal("Failed to serialize response body").with_source(e))?;
        self.payload = Some(Payload::Json(value));
        Ok(())
    }

    /// Send an [`ApiResponse`], taking its HTTP status.
    pub fn send<T: Serialize>(&mut self, response: ApiResponse<T>) -> Result<(), AppError> {
        self.status = response.http_status;
        self.json(&response)
    }

    pub fn text(&mut self, body: impl Into<String>) {
        self.payload = Some(Payload::Text(body.into()));
    }

    pub fn is_sent(&self) -> bool {
        self.payload.is_some()
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn json_body(&self) -> Option<&Value> {
        match &self.payload {
            Some(Payload::Json(value)) => Some(value),
            _ => None,
        }
    }

    /// Copy the accumulated headers onto a response produced elsewhere,
    /// without replacing the ones it already carries.
    pub(crate) fn apply_headers(&self, response: &mut Response) {
        for (name, value) in self.headers.iter() {
            if !response.headers().contains_key(name) {
                response.headers_mut().insert(name.clone(), value.clone());
            }
        }
    }
}

impl IntoResponse for HttpResponse {
    fn into_response(self) -> Response {
        let mut response = match self.payload {
            Some(Payload::Json(value)) => (self.status, Json(value)).into_response(),
            Some(Payload::Text(text)) => (self.status, text).into_response(),
            None => (self.status, Body::empty()).into_response(),
        };
        response.headers_mut().extend(self.headers);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_parsing_and_display() {
        assert_eq!("post".parse::<HttpMethod>().unwrap(), HttpMethod::Post);
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
        assert!(HttpMethod::All.method_filter().is_none());
    }

    #[test]
    fn test_request_parses_query() {
        let request = HttpRequest::new(Method::GET, Uri::from_static("/widgets?sort=price&page=2"));
        assert_eq!(request.path(), "/widgets");
        assert_eq!(request.query.get("sort"), Some(&json!("price")));
        assert!(request.body.is_none());
    }

    #[tokio::test]
    async fn test_response_into_axum() {
        let mut res = HttpResponse::new();
        res.status(StatusCode::CREATED)
            .set_header(HeaderName::from_static("x-test"), HeaderValue::from_static("1"));
        res.json(&json!({ "ok": true })).unwrap();
        assert!(res.is_sent());

        let response = res.into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["x-test"], "1");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(serde_json::from_slice::<Value>(&bytes).unwrap(), json!({ "ok": true }));
    }
}
