mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::{body_text, router, MockLms};
use std::sync::Arc;
use tower::ServiceExt;

#[tokio::test]
async fn health_check_works() {
    let app = router(Arc::new(MockLms::default()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "OK");
}

#[tokio::test]
async fn responses_carry_request_id_and_security_headers() {
    let app = router(Arc::new(MockLms::default()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "req-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers["x-request-id"], "req-42");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert!(headers.contains_key("x-frame-options"));
}

#[tokio::test]
async fn metrics_endpoint_exposes_request_counters() {
    learning_portal::services::metrics::init_metrics().unwrap();
    let app = router(Arc::new(MockLms::default()));

    app.clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let text = body_text(response).await;
    assert!(text.contains("http_requests_total"));
}

#[tokio::test]
async fn unknown_path_is_not_found() {
    let app = router(Arc::new(MockLms::default()));

    let response = app
        .oneshot(Request::builder().uri("/nowhere").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
