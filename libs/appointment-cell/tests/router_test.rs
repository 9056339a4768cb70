mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use appointment_cell::router::appointment_routes;
use shared_utils::test_utils::{at, TestHarness};

use common::*;

async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn booking_body(name: &str, time: &str) -> Value {
    json!({
        "appointment_date": "2025-06-21",
        "appointment_time": time,
        "patient": { "kind": "new", "name": name, "phone": "0851234567" }
    })
}

#[tokio::test]
async fn test_book_then_fetch_over_http() {
    let harness = clinic().await;
    let app = appointment_routes(harness.state.clone());

    let (status, body) = send(app.clone(), "POST", "/", Some(booking_body("Ada Byrne", "10:00 AM"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["appointment_time"], "10:00 AM");
    assert_eq!(body["status"], "confirmed");

    let id = body["id"].as_str().unwrap().to_string();
    let (status, fetched) = send(app.clone(), "GET", &format!("/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["patient_name"], "Ada Byrne");

    let (status, day) = send(app, "GET", "/?date=2025-06-21", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(day["total"], 1);
}

#[tokio::test]
async fn test_error_kinds_map_to_status_codes() {
    let harness = clinic().await;
    let app = appointment_routes(harness.state.clone());

    send(app.clone(), "POST", "/", Some(booking_body("Ada Byrne", "10:00 AM"))).await;

    let (status, body) = send(app.clone(), "POST", "/", Some(booking_body("Brian Kelly", "10:00 AM"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");

    let (status, body) = send(app.clone(), "POST", "/", Some(booking_body("Brian Kelly", "10:10 AM"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    let (status, body) = send(app, "GET", &format!("/{}", uuid::Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn test_unconfigured_clinic_is_service_unavailable() {
    let harness = TestHarness::new(at(today(), 9, 0));
    let app = appointment_routes(harness.state.clone());

    let (status, body) = send(app, "GET", "/availability?date=2025-06-21", None).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["kind"], "config");
}

#[tokio::test]
async fn test_settings_round_trip_and_availability() {
    let harness = TestHarness::new(at(today(), 9, 0));
    let app = appointment_routes(harness.state.clone());

    let settings = serde_json::to_value(clinic_settings()).unwrap();
    let (status, saved) = send(app.clone(), "PUT", "/settings", Some(settings)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["working_hours_start"], "8:00 AM");

    let (status, fetched) = send(app.clone(), "GET", "/settings", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, saved);

    let (status, availability) = send(app.clone(), "GET", "/availability?date=2025-06-21&duration=60", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(availability["duration_minutes"], 60);
    assert_eq!(availability["slots"][0]["label"], "8:00 AM");

    let (status, slots) = send(app, "GET", "/slots", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(slots["total"], 18);
}

#[tokio::test]
async fn test_invalid_settings_are_rejected() {
    let harness = TestHarness::new(at(today(), 9, 0));
    let app = appointment_routes(harness.state.clone());

    let mut settings = clinic_settings();
    settings.working_hours_end = t(7, 0);
    let (status, _) = send(app, "PUT", "/settings", Some(serde_json::to_value(settings).unwrap())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reschedule_swap_and_emergency_routes() {
    let harness = harness_with(clinic_settings(), 10, 5).await;
    let app = appointment_routes(harness.state.clone());

    let (_, first) = send(app.clone(), "POST", "/", Some(booking_body("Ada Byrne", "10:00 AM"))).await;
    let (_, second) = send(app.clone(), "POST", "/", Some(booking_body("Brian Kelly", "11:00 AM"))).await;
    let first_id = first["id"].as_str().unwrap().to_string();
    let second_id = second["id"].as_str().unwrap().to_string();

    let (status, moved) = send(
        app.clone(),
        "PATCH",
        &format!("/{}/reschedule", first_id),
        Some(json!({ "new_date": "2025-06-21", "new_time": "3:00 PM" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["appointment_time"], "3:00 PM");

    let (status, swapped) = send(
        app.clone(),
        "POST",
        "/swap",
        Some(json!({ "first_appointment_id": first_id, "second_appointment_id": second_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(swapped["first"]["appointment_time"], "11:00 AM");
    assert_eq!(swapped["second"]["appointment_time"], "3:00 PM");

    let (status, registration) = send(
        app,
        "POST",
        "/emergency",
        Some(json!({
            "patient": { "name": "Dara Nolan" },
            "case": { "priority": "critical", "chief_complaint": "Chest pain" }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(registration["appointment"]["appointment_time"], "10:00 AM");
    assert_eq!(registration["appointment"]["is_emergency"], true);
    assert_eq!(registration["case"]["status"], "waiting");
}
