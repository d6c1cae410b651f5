use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use taskview_server::{
    auth::create_session_token,
    config::{Config, OpenRouterConfig},
    create_router,
    db::{MemoryTokenStore, StoredToken, TokenStore},
    AppState,
};
use tower::ServiceExt;
use wiremock::matchers::{header as header_is, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SECRET: &str = "test-secret";

fn app(todoist_url: &str) -> Router {
    app_with_store(todoist_url, Arc::new(MemoryTokenStore::new()))
}

fn app_with_store(todoist_url: &str, store: Arc<MemoryTokenStore>) -> Router {
    let config = Config {
        database_url: None,
        jwt_secret: SECRET.to_string(),
        port: 0,
        todoist_base_url: todoist_url.to_string(),
        openrouter: OpenRouterConfig {
            api_key: None,
            model: "test/model".to_string(),
            base_url: "http://127.0.0.1:1".to_string(),
        },
    };
    create_router(AppState::new(config, store))
}

fn session(user_id: &str) -> String {
    format!(
        "Bearer {}",
        create_session_token(user_id, SECRET, 300).unwrap()
    )
}

fn request(method: Method, uri: &str, user: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(header::AUTHORIZATION, session(user));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

async fn store_token(app: &Router, user: &str, token: &str) {
    let (status, _) = send(
        app,
        request(
            Method::PUT,
            "/api/token",
            Some(user),
            Some(json!({ "token": token })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn health_needs_no_session() {
    let app = app("http://127.0.0.1:1");
    let (status, _) = send(&app, request(Method::GET, "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn proxy_requires_session() {
    let app = app("http://127.0.0.1:1");
    let (status, body) = send(&app, request(Method::GET, "/api/todoist/tasks", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Authentication required" }));
}

#[tokio::test]
async fn user_header_must_match_session() {
    let app = app("http://127.0.0.1:1");
    let mut req = request(Method::GET, "/api/todoist/tasks", Some("alice"), None);
    req.headers_mut()
        .insert("x-user-id", "mallory".parse().unwrap());
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_token_issues_no_upstream_call() {
    let todoist = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&todoist)
        .await;

    let app = app(&todoist.uri());
    let (status, body) = send(
        &app,
        request(Method::GET, "/api/todoist/tasks", Some("alice"), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "No valid Todoist token found" }));

    let (status, body) = send(&app, request(Method::GET, "/api/token", Some("alice"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "configured": false }));
}

#[tokio::test]
async fn stored_token_is_used_upstream() {
    let todoist = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v2/tasks"))
        .and(header_is("Authorization", "Bearer todoist-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "1",
            "content": "Write report",
            "description": "",
            "project_id": "p1",
            "section_id": null,
            "priority": 4,
            "created_at": "2024-01-01T00:00:00Z",
            "is_completed": false,
            "labels": [],
            "url": "https://todoist.com/showTask?id=1"
        }])))
        .expect(1)
        .mount(&todoist)
        .await;

    let app = app(&todoist.uri());
    store_token(&app, "alice", "todoist-secret").await;

    let (status, body) = send(
        &app,
        request(Method::GET, "/api/todoist/tasks", Some("alice"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["content"], "Write report");

    // Tokens are per user.
    let (status, _) = send(
        &app,
        request(Method::GET, "/api/todoist/tasks", Some("bob"), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn close_and_delete_reply_no_content() {
    let todoist = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v2/tasks/7/close"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&todoist)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v2/tasks/8"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&todoist)
        .await;

    let app = app(&todoist.uri());
    store_token(&app, "alice", "todoist-secret").await;

    let (status, _) = send(
        &app,
        request(Method::POST, "/api/todoist/tasks/7/close", Some("alice"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        request(Method::DELETE, "/api/todoist/tasks/8", Some("alice"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn invalid_updates_are_bad_requests() {
    let todoist = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&todoist)
        .await;

    let app = app(&todoist.uri());
    store_token(&app, "alice", "todoist-secret").await;

    let (status, body) = send(
        &app,
        request(
            Method::PUT,
            "/api/todoist/tasks",
            Some("alice"),
            Some(json!({ "content": "no id" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Task ID is required" }));

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/api/todoist/tasks/3",
            Some("alice"),
            Some(json!({ "due_string": "tomorrow", "due_date": "2024-01-02" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        request(
            Method::PUT,
            "/api/todoist/tasks",
            Some("alice"),
            Some(json!({ "id": "3", "duration": 30 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "error": "duration_unit is required when duration is specified" })
    );
}

#[tokio::test]
async fn upstream_status_passes_through() {
    let todoist = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v2/tasks/404/reopen"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&todoist)
        .await;

    let app = app(&todoist.uri());
    store_token(&app, "alice", "todoist-secret").await;

    let (status, body) = send(
        &app,
        request(Method::POST, "/api/todoist/tasks/404/reopen", Some("alice"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Todoist API error: Not Found" }));
}

#[tokio::test]
async fn malformed_update_bodies_are_bad_requests() {
    let todoist = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&todoist)
        .await;

    let app = app(&todoist.uri());
    store_token(&app, "alice", "todoist-secret").await;

    for body in [
        json!({ "id": "3", "duration": 1.5, "duration_unit": "minute" }),
        json!({ "id": "3", "duration": 30, "duration_unit": "hour" }),
        json!({ "id": 3, "content": "numeric id" }),
    ] {
        let (status, body) = send(
            &app,
            request(Method::PUT, "/api/todoist/tasks", Some("alice"), Some(body)),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string(), "{body}");
    }

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/todoist/tasks/3",
            Some("alice"),
            Some(json!({ "priority": "high" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string(), "{body}");
}

#[tokio::test]
async fn encoded_ids_cannot_reach_other_endpoints() {
    let todoist = MockServer::start().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&todoist)
        .await;

    let app = app(&todoist.uri());
    store_token(&app, "alice", "todoist-secret").await;

    let (status, body) = send(
        &app,
        request(
            Method::DELETE,
            "/api/todoist/tasks/..%2F..%2Fsync%2Fv9%2Fx",
            Some("alice"),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "error": "Task ID may only contain letters, digits, '-' and '_'" })
    );

    let (status, _) = send(
        &app,
        request(
            Method::PUT,
            "/api/todoist/tasks",
            Some("alice"),
            Some(json!({ "id": "../projects", "content": "x" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn incomplete_token_row_is_not_configured() {
    let store = Arc::new(MemoryTokenStore::new());
    store
        .upsert(
            "alice",
            StoredToken {
                encrypted_token: Some("abc".to_string()),
                token_iv: None,
                encryption_key: Some("1,2".to_string()),
            },
        )
        .await
        .unwrap();
    let app = app_with_store("http://127.0.0.1:1", store);

    let (status, body) = send(&app, request(Method::GET, "/api/token", Some("alice"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "configured": false }));
}
