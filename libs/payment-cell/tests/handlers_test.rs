use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use payment_cell::router::payment_routes;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

const BOUNDARY: &str = "PAYMENT-BOUNDARY";
const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

struct Fixture {
    server: MockServer,
    config: TestConfig,
    uploads: tempfile::TempDir,
    client: TestUser,
    doctor: TestUser,
    booking_id: Uuid,
    payment_id: Uuid,
}

impl Fixture {
    async fn new() -> Self {
        let server = MockServer::start().await;
        let uploads = tempfile::tempdir().unwrap();
        let config = TestConfig::with_supabase(&server.uri()).with_upload_dir(uploads.path());
        let client = TestUser::client("client@example.com");
        let doctor = TestUser::doctor("doctor@example.com");

        for user in [&client, &doctor] {
            Mock::given(method("GET"))
                .and(path("/rest/v1/users"))
                .and(query_param("id", format!("eq.{}", user.id)))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!([user.user_row()])))
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/rest/v1/client_profiles"))
            .and(query_param("user_id", format!("eq.{}", client.id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([client.profile_row()])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/doctor_profiles"))
            .and(query_param("user_id", format!("eq.{}", doctor.id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([doctor.profile_row()])))
            .mount(&server)
            .await;

        Self {
            server,
            config,
            uploads,
            client,
            doctor,
            booking_id: Uuid::new_v4(),
            payment_id: Uuid::new_v4(),
        }
    }

    fn app(&self) -> Router {
        payment_routes(self.config.to_state())
    }

    fn bearer(&self, user: &TestUser) -> String {
        format!("Bearer {}", JwtTestUtils::create_test_token(user, &self.config.jwt_secret, None))
    }

    async fn mount_booking(&self, status: &str) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/bookings"))
            .and(query_param("id", format!("eq.{}", self.booking_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([MockSupabaseResponses::booking(
                self.booking_id,
                self.client.profile_id,
                self.doctor.profile_id,
                status
            )])))
            .mount(&self.server)
            .await;
    }

    fn payment_row(&self, status: &str, doctor_profile: Uuid) -> Value {
        let mut row = MockSupabaseResponses::payment(self.payment_id, self.booking_id, self.client.profile_id, status);
        row["booking"] = json!({
            "id": self.booking_id,
            "doctor_id": doctor_profile,
            "client_id": self.client.profile_id,
            "status": "CONFIRMED"
        });
        row
    }

    async fn mount_payment(&self, status: &str) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/payments"))
            .and(query_param("id", format!("eq.{}", self.payment_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([self.payment_row(status, self.doctor.profile_id)])))
            .mount(&self.server)
            .await;
    }

    fn submit_request(&self, with_screenshot: bool) -> Request<Body> {
        let mut body: Vec<u8> = Vec::new();
        for (name, value) in [("bookingId", self.booking_id.to_string()), ("amount", "500".to_string())] {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    BOUNDARY, name, value
                )
                .as_bytes(),
            );
        }
        if with_screenshot {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"screenshot\"; filename=\"proof.png\"\r\nContent-Type: image/png\r\n\r\n",
                    BOUNDARY
                )
                .as_bytes(),
            );
            body.extend_from_slice(PNG_MAGIC);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        Request::post("/submit")
            .header(header::AUTHORIZATION, self.bearer(&self.client))
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
            .body(Body::from(body))
            .unwrap()
    }
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn payment_phone_is_public() {
    let fx = Fixture::new().await;
    let (status, body) = send(fx.app(), Request::get("/phone").body(Body::empty()).unwrap()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["phone"], "+222 45 25 25 25");
}

#[tokio::test]
async fn submit_requires_screenshot() {
    let fx = Fixture::new().await;
    let (status, body) = send(fx.app(), fx.submit_request(false)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Payment screenshot is required");
}

#[tokio::test]
async fn submit_requires_confirmed_booking() {
    let fx = Fixture::new().await;
    fx.mount_booking("PENDING").await;

    let (status, body) = send(fx.app(), fx.submit_request(true)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Booking must be confirmed before payment");
}

#[tokio::test]
async fn submit_upserts_pending_payment_and_stores_proof() {
    let fx = Fixture::new().await;
    fx.mount_booking("CONFIRMED").await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/payments"))
        .and(query_param("on_conflict", "booking_id"))
        .and(body_partial_json(json!({
            "booking_id": fx.booking_id,
            "amount": 500.0,
            "currency": "MRU",
            "status": "PENDING",
            "verified_at": null
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([MockSupabaseResponses::payment(
            fx.payment_id,
            fx.booking_id,
            fx.client.profile_id,
            "PENDING"
        )])))
        .expect(1)
        .mount(&fx.server)
        .await;

    let (status, body) = send(fx.app(), fx.submit_request(true)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["payment"]["status"], "PENDING");
    let stored = std::fs::read_dir(fx.uploads.path().join("payments")).unwrap().count();
    assert_eq!(stored, 1);
}

#[tokio::test]
async fn doctor_verifies_pending_payment() {
    let fx = Fixture::new().await;
    fx.mount_payment("PENDING").await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/payments"))
        .and(body_partial_json(json!({ "status": "COMPLETED" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([fx.payment_row("COMPLETED", fx.doctor.profile_id)])))
        .expect(1)
        .mount(&fx.server)
        .await;

    let request = Request::patch(format!("/{}/verify", fx.payment_id))
        .header(header::AUTHORIZATION, fx.bearer(&fx.doctor))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(fx.app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["payment"]["status"], "COMPLETED");
}

#[tokio::test]
async fn verified_payment_cannot_be_verified_again() {
    let fx = Fixture::new().await;
    fx.mount_payment("COMPLETED").await;

    let request = Request::patch(format!("/{}/verify", fx.payment_id))
        .header(header::AUTHORIZATION, fx.bearer(&fx.doctor))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(fx.app(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Payment has already been processed");
}

#[tokio::test]
async fn only_the_booking_doctor_verifies() {
    let fx = Fixture::new().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/payments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([fx.payment_row("PENDING", Uuid::new_v4())])))
        .mount(&fx.server)
        .await;

    let request = Request::patch(format!("/{}/verify", fx.payment_id))
        .header(header::AUTHORIZATION, fx.bearer(&fx.doctor))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(fx.app(), request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn clients_cannot_list_pending_payments() {
    let fx = Fixture::new().await;
    let request = Request::get("/pending")
        .header(header::AUTHORIZATION, fx.bearer(&fx.client))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(fx.app(), request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn doctor_history_filters_on_booking_doctor() {
    let fx = Fixture::new().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/payments"))
        .and(query_param("booking.doctor_id", format!("eq.{}", fx.doctor.profile_id)))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-range", "0-0/1")
                .set_body_json(json!([fx.payment_row("COMPLETED", fx.doctor.profile_id)])),
        )
        .mount(&fx.server)
        .await;

    let request = Request::get("/history?page=1&limit=5")
        .header(header::AUTHORIZATION, fx.bearer(&fx.doctor))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(fx.app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pagination"]["limit"], 5);
    assert_eq!(body["data"]["payments"][0]["booking"]["id"], json!(fx.booking_id));
}
