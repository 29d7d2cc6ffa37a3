// Tests for the HTTP control API

mod common;

use std::sync::Arc;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use common::{FakeDevices, FakeOutputProvider, FakeTransport};
use interview_live::{create_router, AppState, SessionConfig, SessionController};
use serde_json::{json, Value};
use tower::ServiceExt;

fn router(api_key: Option<&str>) -> Router {
    let controller = SessionController::new(
        SessionConfig {
            api_key: api_key.map(str::to_string),
            ..SessionConfig::default()
        },
        Arc::new(FakeTransport::acking()),
        Arc::new(FakeDevices::default()),
        Arc::new(FakeOutputProvider::default()),
    );
    create_router(AppState::new(controller.spawn()))
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Result<(StatusCode, Value)> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(body) => Body::from(body.to_string()),
            None => Body::empty(),
        })?;

    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    Ok((status, value))
}

#[tokio::test]
async fn test_health_and_idle_status() -> Result<()> {
    let app = router(Some("key"));

    let (status, _) = call(&app, "GET", "/health", None).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, "GET", "/interview/status", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "idle");
    assert_eq!(body["isConnected"], false);
    assert_eq!(body["isSpeaking"], false);
    Ok(())
}

#[tokio::test]
async fn test_connect_then_conflict_then_disconnect() -> Result<()> {
    let app = router(Some("key"));

    let (status, body) = call(
        &app,
        "POST",
        "/interview/connect",
        Some(json!({"role": "Site Reliability Engineer"})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session"]["role"], "Site Reliability Engineer");

    let (status, body) = call(&app, "POST", "/interview/connect", Some(json!({"role": "Other"}))).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("cannot connect"));

    let (status, body) = call(&app, "POST", "/interview/disconnect", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "idle");
    Ok(())
}

#[tokio::test]
async fn test_empty_role_rejected() -> Result<()> {
    let app = router(Some("key"));

    let (status, _) = call(&app, "POST", "/interview/connect", Some(json!({"role": "   "}))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_missing_credential_reported() -> Result<()> {
    let app = router(None);

    let (status, _) = call(&app, "POST", "/interview/connect", Some(json!({"role": "Analyst"}))).await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (_, body) = call(&app, "GET", "/interview/status", None).await?;
    assert_eq!(body["state"], "idle");
    assert!(body["error"].as_str().unwrap().contains("credential"));
    Ok(())
}
