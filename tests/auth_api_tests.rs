use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use mensa::config::Config;
use mensa::token::TokenCodec;
use tower::ServiceExt;

const TEST_SECRET: &str = "integration-test-secret";

/// Bootstrap manager seeded by migration (must match m20240101_create_users.rs)
const SEEDED_MANAGER_EMAIL: &str = "manager@mensa.local";
const SEEDED_MANAGER_PASSWORD: &str = "password";

async fn spawn_app() -> Router {
    let mut config = Config::default();
    config.auth.database_path = "sqlite::memory:".to_string();
    // A pooled in-memory database is one database per connection.
    config.general.max_db_connections = 1;
    config.token_secret = Some(TEST_SECRET.to_string());

    let state = mensa::api::create_auth_state(&config)
        .await
        .expect("Failed to create auth state");
    mensa::api::auth_router(state, &config.server.cors_allowed_origins)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

async fn register(
    app: &Router,
    username: &str,
    email: &str,
    password: &str,
    role: &str,
) -> axum::response::Response {
    let payload = serde_json::json!({
        "username": username,
        "email": email,
        "password": password,
        "role": role,
    });

    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/users")
                .header("Content-Type", "application/json")
                .body(Body::from(serde_json::to_string(&payload).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn login(app: &Router, email: &str, password: &str) -> axum::response::Response {
    let payload = serde_json::json!({ "email": email, "password": password });

    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/sessions")
                .header("Content-Type", "application/json")
                .body(Body::from(serde_json::to_string(&payload).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn login_token(app: &Router, email: &str, password: &str) -> String {
    let response = login(app, email, password).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    json["data"]["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_register_and_login() {
    let app = spawn_app().await;

    let response = register(&app, "anna", "anna@example.com", "secret_123", "customer").await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["username"], "anna");
    assert_eq!(json["data"]["role"], "customer");
    assert!(json["data"].get("password_hash").is_none());

    let token = login_token(&app, "anna@example.com", "secret_123").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/users/me")
                .header("Authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["email"], "anna@example.com");
}

#[tokio::test]
async fn test_seeded_manager_can_login() {
    let app = spawn_app().await;

    let response = login(&app, SEEDED_MANAGER_EMAIL, SEEDED_MANAGER_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_duplicate_email_is_conflict_and_row_unchanged() {
    let app = spawn_app().await;

    let response = register(&app, "first", "dup@example.com", "secret_123", "customer").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = register(&app, "second", "dup@example.com", "secret_456", "chef").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // The existing row must not have been altered by the rejected attempt.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/users/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["data"]["username"], "first");
    assert_eq!(json["data"]["role"], "customer");
}

#[tokio::test]
async fn test_duplicate_username_is_conflict() {
    let app = spawn_app().await;

    register(&app, "taken", "one@example.com", "secret_123", "customer").await;
    let response = register(&app, "taken", "two@example.com", "secret_123", "customer").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_unknown_email_and_wrong_password_are_indistinguishable() {
    let app = spawn_app().await;

    register(&app, "bob", "bob@example.com", "secret_123", "customer").await;

    let unknown = login(&app, "nobody@example.com", "secret_123").await;
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    let unknown_body = body_json(unknown).await;

    let wrong = login(&app, "bob@example.com", "wrong_password").await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    let wrong_body = body_json(wrong).await;

    assert_eq!(unknown_body, wrong_body);
}

#[tokio::test]
async fn test_registration_input_validation() {
    let app = spawn_app().await;

    // Too-short username
    let response = register(&app, "ab", "a@example.com", "secret_123", "customer").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Malformed email
    let response = register(&app, "valid_name", "not-an-email", "secret_123", "customer").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Too-short password
    let response = register(&app, "valid_name", "b@example.com", "short", "customer").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_protected_routes_reject_bad_tokens() {
    let app = spawn_app().await;

    // No token at all
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/users/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Garbage token
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/users/me")
                .header("Authorization", "Bearer not.a.token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Correctly signed but expired
    let codec = TokenCodec::new(TEST_SECRET, chrono::Duration::minutes(30));
    let expired = codec
        .encode(1, chrono::Utc::now() - chrono::Duration::minutes(5))
        .unwrap();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/users/me")
                .header("Authorization", format!("Bearer {expired}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Token has expired");

    // Signed with a different secret
    let foreign = TokenCodec::new("some-other-secret", chrono::Duration::minutes(30))
        .issue(1)
        .unwrap();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/users/me")
                .header("Authorization", format!("Bearer {foreign}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_for_deleted_user_is_rejected() {
    let app = spawn_app().await;

    // A valid signature for a user id that does not exist must not resolve.
    let codec = TokenCodec::new(TEST_SECRET, chrono::Duration::minutes(30));
    let ghost = codec.issue(9999).unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/users/me")
                .header("Authorization", format!("Bearer {ghost}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_introspection() {
    let app = spawn_app().await;

    register(&app, "carol", "carol@example.com", "secret_123", "chef").await;
    let token = login_token(&app, "carol@example.com", "secret_123").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/sessions")
                .header("Authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["data"]["user_id"].as_i64().unwrap() > 0);
    assert!(json["data"]["expires_at"].is_string());
}

#[tokio::test]
async fn test_self_update_changes_password() {
    let app = spawn_app().await;

    register(&app, "dave", "dave@example.com", "secret_123", "customer").await;
    let token = login_token(&app, "dave@example.com", "secret_123").await;

    let payload = serde_json::json!({ "password": "brand_new_1" });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/users")
                .header("Authorization", format!("Bearer {token}"))
                .header("Content-Type", "application/json")
                .body(Body::from(serde_json::to_string(&payload).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let old = login(&app, "dave@example.com", "secret_123").await;
    assert_eq!(old.status(), StatusCode::UNAUTHORIZED);

    let new = login(&app, "dave@example.com", "brand_new_1").await;
    assert_eq!(new.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_list_users_requires_auth_and_pages() {
    let app = spawn_app().await;

    register(&app, "erin", "erin@example.com", "secret_123", "customer").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/users")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let token = login_token(&app, "erin@example.com", "secret_123").await;
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/users?skip=0&limit=1")
                .header("Authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_public_user_lookup() {
    let app = spawn_app().await;

    // The seeded manager has id 1.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/users/1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["role"], "manager");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/users/9999")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
