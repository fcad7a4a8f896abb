use crate::exception::{AppError, ExceptionFilter};
use crate::http::{HttpRequest, HttpResponse};
use crate::middleware::{Chain, ChainOutcome};
use axum::body::Body;
use axum::extract::{ConnectInfo, FromRequestParts, Path, Request};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// Serves one `(path, method)` registration: builds the request, runs the
/// global chain, then the route chain, and renders the outcome.
///
/// With no route chain, a request that clears the global middleware is a 404.
pub(crate) struct Dispatcher {
    global: Chain,
    route: Option<Chain>,
    filter: Arc<dyn ExceptionFilter>,
    body_limit: usize,
}

impl Dispatcher {
    pub(crate) fn new(
        global: Chain,
        route: Option<Chain>,
        filter: Arc<dyn ExceptionFilter>,
        body_limit: usize,
    ) -> Self {
        Self {
            global,
            route,
            filter,
            body_limit,
        }
    }

    pub(crate) async fn dispatch(self: Arc<Self>, request: Request) -> Response {
        let id = Uuid::new_v4();
        let span = tracing::info_span!(
            "request",
            %id,
            method = %request.method(),
            path = %request.uri().path()
        );
        self.serve(id, request).instrument(span).await
    }

    async fn serve(&self, id: Uuid, request: Request) -> Response {
        let start = Instant::now();
        let method = request.method().clone();
        let uri = request.uri().clone();
        tracing::debug!("--> {} {}", method, uri);

        let (mut parts, body) = request.into_parts();
        let params = Path::<HashMap<String, String>>::from_request_parts(&mut parts, &())
            .await
            .map(|Path(params)| params)
            .unwrap_or_default();
        let remote_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        let mut res = HttpResponse::new();
        let response = match read_json(&parts.headers, body, self.body_limit).await {
            Ok(body) => {
                let mut req = HttpRequest::from_parts(id, parts, params, remote_addr, body);
                let outcome = self.run(&mut req, &mut res).await;
                self.render(outcome, &req, res)
            }
            Err(error) => self.reject(error, &res),
        };

        tracing::info!("<-- {} {} {} {:?}", method, uri, response.status(), start.elapsed());
        response
    }

    async fn run(&self, req: &mut HttpRequest, res: &mut HttpResponse) -> ChainOutcome {
        match self.global.run(req, res).await {
            ChainOutcome::Exhausted => match &self.route {
                Some(chain) => chain.run(req, res).await,
                None => ChainOutcome::Failed(AppError::not_found(format!(
                    "Can't find {} on this server",
                    req.uri()
                ))),
            },
            other => other,
        }
    }

    fn render(&self, outcome: ChainOutcome, req: &HttpRequest, res: HttpResponse) -> Response {
        match outcome {
            ChainOutcome::Responded => res.into_response(),
            ChainOutcome::Failed(error) => self.reject(error, &res),
            ChainOutcome::Exhausted => self.reject(
                AppError::not_found(format!("Cannot {} {}", req.method(), req.path())),
                &res,
            ),
        }
    }

    fn reject(&self, error: AppError, res: &HttpResponse) -> Response {
        let mut response = self.filter.catch(&error);
        res.apply_headers(&mut response);
        response
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

/// Read and parse a JSON body. Non-JSON and empty bodies yield `None`.
async fn read_json(headers: &HeaderMap, body: Body, limit: usize) -> Result<Option<Value>, AppError> {
    let too_large = || {
        AppError::new(
            format!("Request body exceeds {limit} bytes"),
            StatusCode::PAYLOAD_TOO_LARGE,
        )
        .operational()
    };

    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<usize>().ok());
    if declared.is_some_and(|length| length > limit) {
        return Err(too_large());
    }

    let bytes = axum::body::to_bytes(body, limit).await.map_err(|e| too_large().with_source(e))?;
    if bytes.is_empty() || !is_json(headers) {
        return Ok(None);
    }
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| AppError::bad_request(format!("Invalid JSON body: {e}")).with_source(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde_json::json;

    fn json_headers(content_type: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        headers
    }

    #[test]
    fn test_json_content_types() {
        assert!(is_json(&json_headers("application/json")));
        assert!(is_json(&json_headers("application/json; charset=utf-8")));
        assert!(is_json(&json_headers("application/merge-patch+json")));
        assert!(!is_json(&json_headers("text/plain")));
        assert!(!is_json(&HeaderMap::new()));
    }

    #[tokio::test]
    async fn test_read_json() {
        let headers = json_headers("application/json");
        assert_eq!(
            read_json(&headers, Body::from(r#"{"a":1}"#), 64).await.unwrap(),
            Some(json!({ "a": 1 }))
        );
        assert_eq!(read_json(&headers, Body::empty(), 64).await.unwrap(), None);
        assert_eq!(
            read_json(&HeaderMap::new(), Body::from(r#"{"a":1}"#), 64).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_read_json_errors() {
        let headers = json_headers("application/json");
        let err = read_json(&headers, Body::from("{oops"), 64).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = read_json(&headers, Body::from("x".repeat(65)), 64).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
