use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use profile_cell::router::{doctor_routes, user_routes};
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

const BOUNDARY: &str = "X-TEST-BOUNDARY";

async fn mount_user(server: &MockServer, user: &TestUser) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("eq.{}", user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([user.user_row()])))
        .mount(server)
        .await;
}

fn bearer(config: &TestConfig, user: &TestUser) -> String {
    format!("Bearer {}", JwtTestUtils::create_test_token(user, &config.jwt_secret, None))
}

fn multipart_body(fields: &[(&str, &str)]) -> String {
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
            BOUNDARY, name, value
        ));
    }
    body.push_str(&format!("--{}--\r\n", BOUNDARY));
    body
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, body)
}

#[tokio::test]
async fn doctor_directory_is_public_and_paginated() {
    let server = MockServer::start().await;
    let doctor = TestUser::doctor("doc@example.com");
    let mut row = doctor.profile_row();
    row["user"] = json!({ "id": doctor.id, "first_name": "Amina", "last_name": "Salem" });

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_profiles"))
        .and(query_param("order", "rating.desc"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-range", "0-0/11")
                .set_body_json(json!([row])),
        )
        .mount(&server)
        .await;

    let state = TestConfig::with_supabase(&server.uri()).to_state();
    let request = Request::get("/?page=1").body(Body::empty()).unwrap();
    let (status, body) = send(doctor_routes(state), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["doctors"][0]["hourlyRate"], 500.0);
    assert_eq!(body["data"]["doctors"][0]["user"]["firstName"], "Amina");
    assert_eq!(body["data"]["pagination"]["total"], 11);
    assert_eq!(body["data"]["pagination"]["pages"], 2);
}

#[tokio::test]
async fn unknown_doctor_is_404() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let state = TestConfig::with_supabase(&server.uri()).to_state();
    let request = Request::get(format!("/{}", Uuid::new_v4())).body(Body::empty()).unwrap();
    let (status, body) = send(doctor_routes(state), request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Doctor not found");
}

#[tokio::test]
async fn profile_requires_token() {
    let state = TestConfig::default().to_state();
    let request = Request::get("/profile").body(Body::empty()).unwrap();
    let (status, body) = send(user_routes(state), request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn expired_token_is_reported_as_expired() {
    let config = TestConfig::default();
    let client = TestUser::client("client@example.com");
    let token = JwtTestUtils::create_expired_token(&client, &config.jwt_secret);

    let request = Request::get("/profile")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(user_routes(config.to_state()), request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Token expired");
}

#[tokio::test]
async fn statistics_are_doctor_only() {
    let server = MockServer::start().await;
    let client = TestUser::client("client@example.com");
    mount_user(&server, &client).await;

    let config = TestConfig::with_supabase(&server.uri());
    let request = Request::get("/statistics/me")
        .header(header::AUTHORIZATION, bearer(&config, &client))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(doctor_routes(config.to_state()), request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn statistics_are_computed_and_stored() {
    let server = MockServer::start().await;
    let doctor = TestUser::doctor("doc@example.com");
    mount_user(&server, &doctor).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_profiles"))
        .and(query_param("user_id", format!("eq.{}", doctor.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([doctor.profile_row()])))
        .mount(&server)
        .await;

    let now = chrono::Utc::now();
    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .and(query_param("doctor_id", format!("eq.{}", doctor.profile_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "status": "COMPLETED", "session_date": now.to_rfc3339(),
              "payment": { "amount": 500.0, "status": "COMPLETED", "created_at": now.to_rfc3339() } },
            { "status": "CONFIRMED", "session_date": (now + chrono::Duration::days(1)).to_rfc3339(), "payment": null }
        ])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/doctor_statistics"))
        .and(query_param("on_conflict", "doctor_id"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "doctor_id": doctor.profile_id,
            "total_sessions": 2,
            "completed_sessions": 1,
            "upcoming_sessions": 1,
            "total_earnings": 500.0,
            "monthly_earnings": 500.0,
            "last_updated": now.to_rfc3339()
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let config = TestConfig::with_supabase(&server.uri());
    let request = Request::get("/statistics/me")
        .header(header::AUTHORIZATION, bearer(&config, &doctor))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(doctor_routes(config.to_state()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["statistics"]["totalSessions"], 2);
    assert_eq!(body["data"]["statistics"]["totalEarnings"], 500.0);
}

#[tokio::test]
async fn malformed_specialization_is_rejected() {
    let server = MockServer::start().await;
    let doctor = TestUser::doctor("doc@example.com");
    mount_user(&server, &doctor).await;

    let config = TestConfig::with_supabase(&server.uri());
    let request = Request::put("/profile")
        .header(header::AUTHORIZATION, bearer(&config, &doctor))
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(Body::from(multipart_body(&[("bio", "Therapist"), ("specialization", "Anxiety, Stress")])))
        .unwrap();
    let (status, body) = send(doctor_routes(config.to_state()), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "specialization");
}

#[tokio::test]
async fn client_profile_update_creates_profile_lazily() {
    let server = MockServer::start().await;
    let client = TestUser::client("client@example.com");
    mount_user(&server, &client).await;

    // No profile on first lookup: the update path must insert one.
    Mock::given(method("GET"))
        .and(path("/rest/v1/client_profiles"))
        .and(query_param("user_id", format!("eq.{}", client.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/client_profiles"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([client.profile_row()])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/client_profiles"))
        .and(query_param("id", format!("eq.{}", client.profile_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([client.profile_row()])))
        .expect(1)
        .mount(&server)
        .await;
    let mut with_user = client.profile_row();
    with_user["city"] = json!("Nouakchott");
    with_user["user"] = json!({ "id": client.id, "first_name": "Test", "last_name": "client" });
    Mock::given(method("GET"))
        .and(path("/rest/v1/client_profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([with_user])))
        .mount(&server)
        .await;

    let config = TestConfig::with_supabase(&server.uri());
    let request = Request::patch("/profile")
        .header(header::AUTHORIZATION, bearer(&config, &client))
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(Body::from(multipart_body(&[("city", "Nouakchott"), ("dateOfBirth", "1994-06-02")])))
        .unwrap();
    let (status, body) = send(user_routes(config.to_state()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["profile"]["city"], "Nouakchott");
}
