mod common;

use common::{app, send};
use routecraft::middleware::{
    BodyRule, BodyValidator, Chain, ChainEntry, RateLimiter, handle_async_errors,
};
use routecraft::prelude::*;
use serde_json::json;
use std::time::Duration;

fn echo_query() -> ChainEntry {
    ChainEntry::Sync(from_fn(|req, res, _| {
        res.send(ApiResponse::success(serde_json::Value::Object(req.query.clone())))
    }))
}

struct Exploding;

#[async_trait]
impl AsyncMiddleware for Exploding {
    async fn handle(&self, _: &mut HttpRequest, _: &mut HttpResponse, _: &mut Next) -> Result<(), AppError> {
        tokio::task::yield_now().await;
        panic!("lost connection");
    }
}

#[tokio::test]
async fn test_rate_limit_headers_and_rejection() {
    let limiter = RateLimiter::new(RateLimitConfig {
        max_requests: 2,
        window: Duration::from_secs(60),
        ..Default::default()
    });
    let mut router = SharedRouter::new();
    router.use_global(Arc::new(limiter));
    router.route("/widgets").get(Chain::new(vec![echo_query()])).unwrap();
    let app = app(router);

    let first = send(&app, "GET", "/widgets", None).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.headers["x-remaining-requests"], "1");
    assert_eq!(first.headers["x-maximum-requests"], "2");

    let second = send(&app, "GET", "/widgets", None).await;
    assert_eq!(second.headers["x-remaining-requests"], "0");

    let third = send(&app, "GET", "/widgets", None).await;
    assert_eq!(third.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        third.body["message"],
        "Maximum amount of requests reached. Try again shortly"
    );
}

#[tokio::test]
async fn test_sanitizer_cleans_query_before_handlers() {
    let mut router = SharedRouter::new();
    router.use_global(Arc::new(ParameterSanitizer::new()));
    router.route("/widgets").get(Chain::new(vec![echo_query()])).unwrap();

    let reply = send(
        &app(router),
        "GET",
        "/widgets?sort=title&sort=price&price[gt]=5&price[lt]=9&tags[foo]=x",
        None,
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"], json!({ "sort": "price", "price": { "gt": "5" } }));
}

#[tokio::test]
async fn test_async_panic_reaches_error_responder() {
    let mut router = SharedRouter::new();
    router
        .route("/widgets")
        .get(Chain::new(vec![handle_async_errors(Arc::new(Exploding)), echo_query()]))
        .unwrap();

    let reply = send(&app(router), "GET", "/widgets", None).await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.body["error"]["operational"], false);
}

#[tokio::test]
async fn test_body_errors() {
    let gate = BodyValidator::new(vec![BodyRule::new("title", PrimitiveType::String)]);
    let mut router = SharedRouter::new();
    router
        .route("/widgets")
        .post(Chain::new(vec![ChainEntry::sync(gate), echo_query()]))
        .unwrap();
    let app = app(router);

    let malformed = send(&app, "POST", "/widgets", Some("{\"title\":")).await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);

    let oversized = format!("{{\"title\":\"{}\"}}", "x".repeat(2048));
    let too_large = send(&app, "POST", "/widgets", Some(&oversized)).await;
    assert_eq!(too_large.status, StatusCode::PAYLOAD_TOO_LARGE);

    let wrong = send(&app, "POST", "/widgets", Some(r#"{"title":["a"]}"#)).await;
    assert_eq!(wrong.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        wrong.body["message"],
        r#"Type of the field "title" must be string. Instead found array"#
    );
}
