use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scheduling_cell::router::scheduling_routes;
use shared_utils::test_utils::{JwtTestUtils, MockPostgrestRows, TestConfig, TestUser};

// 2026-08-03 is a Monday.
const MONDAY: &str = "2026-08-03";

fn create_test_app(config: &TestConfig) -> Router {
    scheduling_routes(Arc::new(config.to_app_config()))
}

fn bearer_token(config: &TestConfig) -> String {
    let user = TestUser::client("client@example.com");
    JwtTestUtils::create_test_token(&user, &config.jwt_secret, None)
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn availability_requires_authentication() {
    let config = TestConfig::default();
    let app = create_test_app(&config);

    let request = Request::builder()
        .uri(format!(
            "/availability?tenant_id={}&branch_id={}&service_id={}&date={}",
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            MONDAY
        ))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let config = TestConfig::default();
    let app = create_test_app(&config);

    let user = TestUser::client("client@example.com");
    let token = JwtTestUtils::expired_token(&user, &config.jwt_secret);

    let request = Request::builder()
        .uri(format!(
            "/availability?tenant_id={}&branch_id={}&service_id={}&date={}",
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            MONDAY
        ))
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn availability_returns_slot_list() {
    let server = MockServer::start().await;
    let tenant_id = Uuid::new_v4();
    let branch_id = Uuid::new_v4();
    let service_id = Uuid::new_v4();
    let employee_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/services"))
        .and(query_param("id", format!("eq.{}", service_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestRows::service_row(service_id, tenant_id, "Haircut", 30, 1)
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/employees"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestRows::employee_row_weekdays(
                employee_id,
                tenant_id,
                branch_id,
                "Maria Georgiou",
                &[service_id],
                &[(540, 1020)],
            )
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/schedule_exceptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let config = TestConfig::with_base_url(&server.uri());
    let app = create_test_app(&config);
    let token = bearer_token(&config);

    let request = Request::builder()
        .uri(format!(
            "/availability?tenant_id={}&branch_id={}&service_id={}&date={}",
            tenant_id, branch_id, service_id, MONDAY
        ))
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["date"], MONDAY);
    let slots = body["slots"].as_array().unwrap();
    assert!(!slots.is_empty());
    assert_eq!(slots[0]["start_minute"], 540);
    assert_eq!(slots[0]["employee_ids"][0], json!(employee_id));
}

#[tokio::test]
async fn booking_without_availability_returns_conflict() {
    let server = MockServer::start().await;
    let tenant_id = Uuid::new_v4();
    let service_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestRows::service_row(service_id, tenant_id, "Haircut", 30, 1)
        ])))
        .mount(&server)
        .await;
    // Nobody at this branch offers the service
    Mock::given(method("GET"))
        .and(path("/rest/v1/employees"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let config = TestConfig::with_base_url(&server.uri());
    let app = create_test_app(&config);
    let token = bearer_token(&config);

    let payload = json!({
        "tenant_id": tenant_id,
        "branch_id": Uuid::new_v4(),
        "service_id": service_id,
        "employee": "any",
        "client_id": Uuid::new_v4(),
        "date": MONDAY,
        "start_minute": 600
    });

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = read_json(response).await;
    assert_eq!(body["error"], "Slot is no longer available");
}

#[tokio::test]
async fn booking_an_unknown_service_returns_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let config = TestConfig::with_base_url(&server.uri());
    let app = create_test_app(&config);
    let token = bearer_token(&config);

    let payload = json!({
        "tenant_id": Uuid::new_v4(),
        "branch_id": Uuid::new_v4(),
        "service_id": Uuid::new_v4(),
        "employee": "any",
        "client_id": Uuid::new_v4(),
        "date": MONDAY,
        "start_minute": 600
    });

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cancelling_an_unknown_appointment_returns_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let config = TestConfig::with_base_url(&server.uri());
    let app = create_test_app(&config);
    let token = bearer_token(&config);

    let request = Request::builder()
        .method("DELETE")
        .uri(format!(
            "/{}?tenant_id={}",
            Uuid::new_v4(),
            Uuid::new_v4()
        ))
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
