use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use auth_cell::router::auth_routes;
use shared_utils::jwt::validate_token;
use shared_utils::mailer::EmailSender;
use shared_utils::password::hash_password;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, RecordingMailer, TestConfig, TestUser};

struct FailingMailer;

#[async_trait]
impl EmailSender for FailingMailer {
    async fn send(&self, _to: &str, _subject: &str, _body: &str) -> anyhow::Result<()> {
        Err(anyhow!("smtp unreachable"))
    }
}

async fn setup() -> (MockServer, TestConfig) {
    let server = MockServer::start().await;
    let config = TestConfig::with_supabase(&server.uri());
    (server, config)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn stored_user(user: &TestUser, password: &str, verified: bool) -> Value {
    let mut row = user.user_row();
    row["password_hash"] = json!(hash_password(password).unwrap());
    row["is_verified"] = json!(verified);
    row
}

async fn mount_user_lookup(server: &MockServer, rows: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(server)
        .await;
}

// ==============================================================================
// REGISTRATION
// ==============================================================================

#[tokio::test]
async fn client_registration_creates_profile_and_sends_verification() {
    let (server, config) = setup().await;
    let mailer = Arc::new(RecordingMailer::default());
    let new_user = TestUser::client("amina@example.com");
    let mut row = new_user.user_row();
    row["is_verified"] = json!(false);

    mount_user_lookup(&server, json!([])).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/users"))
        .and(body_partial_json(json!({
            "email": "amina@example.com",
            "role": "CLIENT",
            "language": "FRENCH",
            "is_verified": false
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([row])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/client_profiles"))
        .and(body_partial_json(json!({ "user_id": new_user.id })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([new_user.profile_row()])))
        .expect(1)
        .mount(&server)
        .await;

    let app = auth_routes(config.to_state_with_mailer(mailer.clone()));
    let (status, body) = send(
        app,
        post_json(
            "/register",
            json!({ "email": "Amina@example.com", "password": "secret1", "firstName": "Amina", "lastName": "Sall" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["requiresVerification"], true);
    assert_eq!(body["data"]["user"]["isVerified"], false);
    assert!(body["data"]["user"].get("passwordHash").is_none());

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "amina@example.com");
    assert!(sent[0].2.contains("/verify-email?token="));
}

#[tokio::test]
async fn doctor_registration_seeds_doctor_profile() {
    let (server, config) = setup().await;
    let doctor = TestUser::doctor("dr@example.com");

    mount_user_lookup(&server, json!([])).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([doctor.user_row()])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/doctor_profiles"))
        .and(body_partial_json(json!({
            "user_id": doctor.id,
            "hourly_rate": 0,
            "languages": ["ARABIC"],
            "is_verified": false
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([doctor.profile_row()])))
        .expect(1)
        .mount(&server)
        .await;

    let (status, _) = send(
        auth_routes(config.to_state()),
        post_json(
            "/register",
            json!({
                "email": "dr@example.com",
                "password": "secret1",
                "firstName": "Omar",
                "lastName": "Diallo",
                "role": "DOCTOR",
                "preferredLanguage": "ARABIC"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn existing_contact_is_rejected() {
    let (server, config) = setup().await;
    let existing = TestUser::client("taken@example.com");
    mount_user_lookup(&server, json!([existing.user_row()])).await;

    let (status, body) = send(
        auth_routes(config.to_state()),
        post_json(
            "/register",
            json!({ "email": "taken@example.com", "password": "secret1", "firstName": "Amina", "lastName": "Sall" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User already exists");
}

#[tokio::test]
async fn admins_cannot_self_register() {
    let (_server, config) = setup().await;
    let (status, body) = send(
        auth_routes(config.to_state()),
        post_json(
            "/register",
            json!({ "email": "x@example.com", "password": "secret1", "firstName": "Root", "lastName": "User", "role": "ADMIN" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "role");
}

#[tokio::test]
async fn registration_needs_email_or_phone() {
    let (_server, config) = setup().await;
    let (status, body) = send(
        auth_routes(config.to_state()),
        post_json("/register", json!({ "password": "secret1", "firstName": "Amina", "lastName": "Sall" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "email");
}

// ==============================================================================
// LOGIN
// ==============================================================================

#[tokio::test]
async fn verified_user_logs_in_with_photo() {
    let (server, config) = setup().await;
    let user = TestUser::client("amina@example.com");
    mount_user_lookup(&server, json!([stored_user(&user, "secret1", true)])).await;

    let mut profile = MockSupabaseResponses::client_profile(user.profile_id, user.id);
    profile["profile_photo"] = json!("/uploads/profiles/amina.png");
    Mock::given(method("GET"))
        .and(path("/rest/v1/client_profiles"))
        .and(query_param("user_id", format!("eq.{}", user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([profile])))
        .mount(&server)
        .await;

    let (status, body) = send(
        auth_routes(config.to_state()),
        post_json("/login", json!({ "email": "amina@example.com", "password": "secret1" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["photo"], "/uploads/profiles/amina.png");
    let token = body["data"]["token"].as_str().unwrap();
    let claims = validate_token(token, &config.jwt_secret).unwrap();
    assert_eq!(claims.sub, user.id);
}

#[tokio::test]
async fn wrong_password_is_invalid_credentials() {
    let (server, config) = setup().await;
    let user = TestUser::client("amina@example.com");
    mount_user_lookup(&server, json!([stored_user(&user, "secret1", true)])).await;

    let (status, body) = send(
        auth_routes(config.to_state()),
        post_json("/login", json!({ "email": "amina@example.com", "password": "nope-nope" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");
}

#[tokio::test]
async fn unverified_email_blocks_login() {
    let (server, config) = setup().await;
    let user = TestUser::client("amina@example.com");
    mount_user_lookup(&server, json!([stored_user(&user, "secret1", false)])).await;

    let (status, body) = send(
        auth_routes(config.to_state()),
        post_json("/login", json!({ "email": "amina@example.com", "password": "secret1" })),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["requiresVerification"], true);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn me_returns_current_user() {
    let (server, config) = setup().await;
    let user = TestUser::admin("admin@example.com");
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("eq.{}", user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([user.user_row()])))
        .mount(&server)
        .await;

    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, None);
    let request = Request::get("/me")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(auth_routes(config.to_state()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["role"], "ADMIN");
}

// ==============================================================================
// PASSWORD RESET AND VERIFICATION
// ==============================================================================

#[tokio::test]
async fn forgot_password_does_not_reveal_unknown_accounts() {
    let (server, config) = setup().await;
    mount_user_lookup(&server, json!([])).await;

    let (status, body) = send(
        auth_routes(config.to_state()),
        post_json("/forgot-password", json!({ "email": "ghost@example.com" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body.get("resetToken").is_none());
}

#[tokio::test]
async fn unknown_reset_token_is_rejected() {
    let (server, config) = setup().await;
    mount_user_lookup(&server, json!([])).await;

    let (status, body) = send(
        auth_routes(config.to_state()),
        post_json("/reset-password", json!({ "token": "deadbeef", "password": "newsecret" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid or expired reset token");
}

#[tokio::test]
async fn verification_token_is_required() {
    let (_server, config) = setup().await;
    let (status, body) = send(
        auth_routes(config.to_state()),
        Request::get("/verify-email").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Verification token is required");
}

#[tokio::test]
async fn verification_marks_user_verified() {
    let (server, config) = setup().await;
    let user = TestUser::client("amina@example.com");
    mount_user_lookup(&server, json!([stored_user(&user, "secret1", false)])).await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("eq.{}", user.id)))
        .and(body_partial_json(json!({ "is_verified": true, "verification_token": null })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([user.user_row()])))
        .expect(1)
        .mount(&server)
        .await;

    let (status, _) = send(
        auth_routes(config.to_state()),
        Request::get("/verify-email?token=abc123").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn resend_surfaces_delivery_failure() {
    let (server, config) = setup().await;
    let user = TestUser::client("amina@example.com");
    mount_user_lookup(&server, json!([stored_user(&user, "secret1", false)])).await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([user.user_row()])))
        .mount(&server)
        .await;

    let app = auth_routes(config.to_state_with_mailer(Arc::new(FailingMailer)));
    let (status, body) = send(app, post_json("/resend-verification", json!({ "email": "amina@example.com" }))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn resend_for_unknown_email_still_succeeds() {
    let (server, config) = setup().await;
    mount_user_lookup(&server, json!([])).await;

    let (status, _) = send(
        auth_routes(config.to_state()),
        post_json("/resend-verification", json!({ "email": "ghost@example.com" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
}
