//! End-to-end checks of the reqwest transport against an in-process backend.

use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use parsergate_core::{
    ClientConfig, CredentialMode, FailureKind, LoginCredentials, Registration, SessionClient, SessionState,
};

const SESSION_TOKEN: &str = "abc123";

fn has_session(headers: &HeaderMap) -> bool {
    let cookie = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(|c| c.split(';').any(|part| part.trim() == format!("token={}", SESSION_TOKEN)))
        .unwrap_or(false);
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", SESSION_TOKEN))
        .unwrap_or(false);
    cookie || bearer
}

fn not_authenticated() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Not authenticated"}))).into_response()
}

async fn register(Json(body): Json<Value>) -> Response {
    if body["email"] == "taken@example.com" {
        (StatusCode::CONFLICT, Json(json!({"detail": "User already exists!"}))).into_response()
    } else {
        (StatusCode::CREATED, Json(json!({"message": "User created successfully"}))).into_response()
    }
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["name"] == "bob" && body["password"] == "pw" {
        (
            [(header::SET_COOKIE, format!("token={}; HttpOnly; Path=/", SESSION_TOKEN))],
            Json(json!({"message": "coockie sended"})),
        )
            .into_response()
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Invalid credentials"}))).into_response()
    }
}

async fn check_user(headers: HeaderMap) -> Response {
    if has_session(&headers) {
        Json(json!({"message": "User is authenticated"})).into_response()
    } else {
        not_authenticated()
    }
}

async fn logout() -> Response {
    (
        [(header::SET_COOKIE, "token=; HttpOnly; Path=/; Max-Age=0")],
        Json(json!({"message": "Logged out"})),
    )
        .into_response()
}

async fn run_parser(headers: HeaderMap) -> Response {
    if has_session(&headers) {
        Json(json!({"status": "ok"})).into_response()
    } else {
        not_authenticated()
    }
}

async fn spawn_backend() -> String {
    let app = Router::new()
        .route("/api/v1/register", post(register))
        .route("/api/v1/login", post(login))
        .route("/api/v1/check_user", post(check_user))
        .route("/api/v1/logout", post(logout))
        .route("/api/v1/run_parser", post(run_parser));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_cookie_session_lifecycle() {
    let base = spawn_backend().await;
    let client = SessionClient::new(ClientConfig::new(&base).unwrap()).unwrap();

    assert_eq!(client.session().verify().await, SessionState::Anonymous);

    let refused = client.actions().run_parser().await;
    assert_eq!(refused.kind, Some(FailureKind::NotAuthenticated));

    let bad_login = client.auth().login(LoginCredentials::new("bob", "wrong")).await;
    assert!(!bad_login.success);
    assert_eq!(bad_login.message, "Invalid credentials");
    assert_eq!(client.session().state(), SessionState::Anonymous);

    let login = client.auth().login(LoginCredentials::new("bob", "pw")).await;
    assert!(login.success);
    assert_eq!(client.session().state(), SessionState::Authenticated);

    // The cookie set by login is carried automatically
    assert_eq!(client.session().verify().await, SessionState::Authenticated);
    let result = client.actions().run_parser().await;
    assert!(result.success, "{}", result.message);
    assert_eq!(result.payload, Some(json!({"status": "ok"})));

    let logout = client.auth().logout().await;
    assert!(logout.success);
    assert_eq!(client.session().state(), SessionState::Anonymous);
    assert_eq!(client.session().verify().await, SessionState::Anonymous);
}

#[tokio::test]
async fn test_register_reports_backend_detail() {
    let base = spawn_backend().await;
    let client = SessionClient::new(ClientConfig::new(&base).unwrap()).unwrap();

    let created = client
        .auth()
        .register(Registration::new("new@example.com", "alice", "pw"))
        .await;
    assert!(created.success);

    let conflict = client
        .auth()
        .register(Registration::new("taken@example.com", "bob", "pw"))
        .await;
    assert!(!conflict.success);
    assert_eq!(conflict.message, "User already exists!");
    assert_eq!(client.session().state(), SessionState::Unknown);
}

#[tokio::test]
async fn test_omitted_credentials_never_verify() {
    let base = spawn_backend().await;
    let config = ClientConfig::new(&base).unwrap().with_credentials(CredentialMode::Omit);
    let client = SessionClient::new(config).unwrap();

    assert!(client.auth().login(LoginCredentials::new("bob", "pw")).await.success);
    assert_eq!(client.session().verify().await, SessionState::Anonymous);
}

#[tokio::test]
async fn test_configured_bearer_token_is_sent() {
    let base = spawn_backend().await;
    let config = ClientConfig::new(&base)
        .unwrap()
        .with_credentials(CredentialMode::Omit)
        .with_bearer_token(SESSION_TOKEN);
    let client = SessionClient::new(config).unwrap();

    assert_eq!(client.session().verify().await, SessionState::Authenticated);
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = SessionClient::new(ClientConfig::new(&format!("http://{}", addr)).unwrap()).unwrap();

    let login = client.auth().login(LoginCredentials::new("bob", "pw")).await;
    assert!(!login.success);
    assert_eq!(login.kind, Some(FailureKind::Network));
    assert_eq!(client.session().verify().await, SessionState::Anonymous);
}
