use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use docvault_api::config::Config;
use docvault_api::db::{InMemoryRefreshTokenStore, InMemoryUserStore};
use docvault_api::routes::create_router;
use docvault_api::AppState;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub refresh_tokens: Arc<InMemoryRefreshTokenStore>,
    // Keeps the upload directory alive for the duration of the test.
    pub _uploads: tempfile::TempDir,
}

/// Create a test app backed by in-memory stores and a temporary upload dir.
#[allow(dead_code)]
pub async fn create_test_app() -> TestApp {
    create_test_app_with(Config::test_default()).await
}

#[allow(dead_code)]
pub async fn create_test_app_with(mut config: Config) -> TestApp {
    let uploads = tempfile::tempdir().expect("Failed to create temp dir");
    config.upload_dir = uploads.path().to_string_lossy().into_owned();

    let refresh_tokens = Arc::new(InMemoryRefreshTokenStore::new());
    let state = AppState::build(
        config,
        None,
        Arc::new(InMemoryUserStore::new()),
        refresh_tokens.clone(),
    )
    .await
    .expect("Failed to build app state");

    TestApp {
        router: create_router(state.clone()),
        state,
        refresh_tokens,
        _uploads: uploads,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    #[allow(dead_code)]
    pub async fn post_json(&self, uri: &str, body: Value) -> (u16, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = self.send(request).await;
        let status = response.status().as_u16();
        (status, body_json(response).await)
    }

    /// Registers a user and returns the login-shaped response body.
    #[allow(dead_code)]
    pub async fn register(&self, username: &str, password: &str) -> Value {
        let (status, body) = self
            .post_json(
                "/auth/register",
                serde_json::json!({ "username": username, "password": password }),
            )
            .await;
        assert_eq!(status, 201, "registration failed: {body}");
        body
    }
}

#[allow(dead_code)]
pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

/// Parses the body as JSON, or `Value::Null` when it is empty or not JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

/// A single-file multipart body for `POST /files`.
#[allow(dead_code)]
pub fn multipart_upload(filename: &str, content: &[u8], token: &str) -> Request<Body> {
    let boundary = "docvault-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/files")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body))
        .unwrap()
}
