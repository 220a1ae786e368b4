//! Common test utilities and fixtures
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use segment_server::{create_router, AppState};
use segment_storage::{LocalMembershipEngine, PoolSettings};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

/// Router backed by a file database that lives as long as the returned `TempDir`
pub async fn create_test_app() -> (Router, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_url = format!("sqlite://{}", temp_dir.path().join("test.db").display());

    let engine = LocalMembershipEngine::connect(&db_url, &PoolSettings::default())
        .await
        .unwrap();

    let app = create_router(AppState::new(Arc::new(engine)));
    (app, temp_dir)
}

/// Send a request with an optional JSON body and return the status and parsed body
pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, json)
}

/// Register users `1..=count` by putting each of them into a throwaway segment
pub async fn seed_users(app: &Router, count: u64) {
    let (status, _) = send(
        app,
        "POST",
        "/segment/add",
        Some(serde_json::json!({ "slug": "seed" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    for user_id in 1..=count {
        let (status, _) = send(
            app,
            "PUT",
            "/user/segment",
            Some(serde_json::json!({ "user_id": user_id, "slugs_to_add": ["seed"] })),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
}
