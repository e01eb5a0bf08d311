use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use admin_cell::router::admin_routes;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

struct Fixture {
    server: MockServer,
    config: TestConfig,
    admin: TestUser,
    client: TestUser,
}

impl Fixture {
    async fn new() -> Self {
        let server = MockServer::start().await;
        let config = TestConfig::with_supabase(&server.uri());
        let admin = TestUser::admin("admin@example.com");
        let client = TestUser::client("client@example.com");

        for user in [&admin, &client] {
            Mock::given(method("GET"))
                .and(path("/rest/v1/users"))
                .and(query_param("id", format!("eq.{}", user.id)))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!([user.user_row()])))
                .mount(&server)
                .await;
        }

        Self { server, config, admin, client }
    }

    fn app(&self) -> Router {
        admin_routes(self.config.to_state())
    }

    fn request(&self, user: &TestUser, method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
        let token = JwtTestUtils::create_test_token(user, &self.config.jwt_secret, None);
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token));
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    /// Exact-count probe on `table`; `value: None` matches requests without `column`.
    async fn mount_count(&self, table: &str, column: &str, value: Option<&str>, total: u64) {
        let mock = Mock::given(method("GET"))
            .and(path(format!("/rest/v1/{}", table)))
            .and(query_param("select", "id"));
        let mock = match value {
            Some(value) => mock.and(query_param(column, value)),
            None => mock.and(query_param_is_missing(column)),
        };
        mock.respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-range", format!("0-0/{}", total).as_str())
                .set_body_json(json!([{ "id": Uuid::new_v4() }])),
        )
        .mount(&self.server)
        .await;
    }
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn back_office_is_admin_only() {
    let fx = Fixture::new().await;
    let (status, body) = send(fx.app(), fx.request(&fx.client, "GET", "/analytics", None)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);

    let anonymous = Request::get("/users").body(Body::empty()).unwrap();
    let (status, _) = send(fx.app(), anonymous).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn users_are_listed_with_role_filter() {
    let fx = Fixture::new().await;
    let doctor = TestUser::doctor("dr@example.com");
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("role", "eq.DOCTOR"))
        .and(query_param("order", "created_at.desc"))
        .and(query_param("limit", "20"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-range", "0-0/21")
                .set_body_json(json!([doctor.user_row()])),
        )
        .mount(&fx.server)
        .await;

    let (status, body) = send(fx.app(), fx.request(&fx.admin, "GET", "/users?role=DOCTOR", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["users"][0]["email"], "dr@example.com");
    assert!(body["data"]["users"][0].get("passwordHash").is_none());
    assert_eq!(body["data"]["pagination"]["total"], 21);
    assert_eq!(body["data"]["pagination"]["pages"], 2);
}

#[tokio::test]
async fn unknown_role_filter_is_bad_request() {
    let fx = Fixture::new().await;
    let (status, _) = send(fx.app(), fx.request(&fx.admin, "GET", "/users?role=OWNER", None)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn verifying_a_doctor_verifies_the_profile() {
    let fx = Fixture::new().await;
    let doctor = TestUser::doctor("dr@example.com");

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("eq.{}", doctor.id)))
        .and(body_partial_json(json!({ "is_verified": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([doctor.user_row()])))
        .expect(1)
        .mount(&fx.server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/doctor_profiles"))
        .and(query_param("user_id", format!("eq.{}", doctor.id)))
        .and(body_partial_json(json!({ "is_verified": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": doctor.profile_id }])))
        .expect(1)
        .mount(&fx.server)
        .await;

    let uri = format!("/users/{}/verify", doctor.id);
    let (status, body) = send(
        fx.app(),
        fx.request(&fx.admin, "PATCH", &uri, Some(json!({ "isVerified": true }))),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["id"], json!(doctor.id));
}

#[tokio::test]
async fn unverifying_leaves_the_doctor_profile_alone() {
    let fx = Fixture::new().await;
    let doctor = TestUser::doctor("dr@example.com");
    let mut row = doctor.user_row();
    row["is_verified"] = json!(false);

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .mount(&fx.server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/doctor_profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&fx.server)
        .await;

    let uri = format!("/users/{}/verify", doctor.id);
    let (status, body) = send(
        fx.app(),
        fx.request(&fx.admin, "PATCH", &uri, Some(json!({ "isVerified": false }))),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["isVerified"], false);
}

#[tokio::test]
async fn verifying_unknown_user_is_not_found() {
    let fx = Fixture::new().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&fx.server)
        .await;

    let uri = format!("/users/{}/verify", Uuid::new_v4());
    let (status, _) = send(
        fx.app(),
        fx.request(&fx.admin, "PATCH", &uri, Some(json!({ "isVerified": true }))),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn analytics_aggregates_counts_and_revenue() {
    let fx = Fixture::new().await;
    fx.mount_count("users", "role", None, 10).await;
    fx.mount_count("users", "role", Some("eq.CLIENT"), 7).await;
    fx.mount_count("users", "role", Some("eq.DOCTOR"), 2).await;
    fx.mount_count("bookings", "status", None, 15).await;
    fx.mount_count("bookings", "status", Some("eq.COMPLETED"), 6).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/payments"))
        .and(query_param("status", "eq.COMPLETED"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "amount": 500.0, "created_at": Utc::now() },
            { "amount": 300.0, "created_at": "2020-01-15T10:00:00Z" }
        ])))
        .mount(&fx.server)
        .await;

    let (status, body) = send(fx.app(), fx.request(&fx.admin, "GET", "/analytics", None)).await;

    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["users"], json!({ "total": 10, "clients": 7, "doctors": 2 }));
    assert_eq!(data["bookings"], json!({ "total": 15, "completed": 6 }));
    assert_eq!(data["revenue"]["total"], 800.0);
    assert_eq!(data["revenue"]["monthly"], 500.0);
}

#[tokio::test]
async fn bookings_are_listed_with_parties_and_payment() {
    let fx = Fixture::new().await;
    let booking_id = Uuid::new_v4();
    let client_profile = Uuid::new_v4();
    let doctor_profile = Uuid::new_v4();

    let mut booking = MockSupabaseResponses::booking(booking_id, client_profile, doctor_profile, "COMPLETED");
    booking["client"] = json!({
        "id": client_profile,
        "user_id": Uuid::new_v4(),
        "user": { "first_name": "Amina", "last_name": "Sall", "email": "amina@example.com" }
    });
    booking["payment"] = MockSupabaseResponses::payment(Uuid::new_v4(), booking_id, client_profile, "COMPLETED");

    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .and(query_param("status", "eq.COMPLETED"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-range", "0-0/1")
                .set_body_json(json!([booking])),
        )
        .mount(&fx.server)
        .await;

    let (status, body) = send(fx.app(), fx.request(&fx.admin, "GET", "/bookings?status=COMPLETED", None)).await;

    assert_eq!(status, StatusCode::OK);
    let listed = &body["data"]["bookings"][0];
    assert_eq!(listed["client"]["user"]["email"], "amina@example.com");
    assert_eq!(listed["payment"]["status"], "COMPLETED");
    assert_eq!(body["data"]["pagination"]["limit"], 20);
}

#[tokio::test]
async fn unknown_booking_status_is_bad_request() {
    let fx = Fixture::new().await;
    let (status, _) = send(fx.app(), fx.request(&fx.admin, "GET", "/bookings?status=LOST", None)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}
