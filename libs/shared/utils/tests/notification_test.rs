use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_utils::notification::{NotificationKind, NotificationPort, WebhookNotifier};

#[tokio::test]
async fn test_webhook_notifier_posts_kind_and_payload() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hooks/scheduling"))
        .and(body_partial_json(json!({
            "kind": "booking_confirmed",
            "payload": { "appointment_id": "a-1", "time": "10:00 AM" }
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&mock_server)
        .await;

    let notifier = WebhookNotifier::new(format!("{}/hooks/scheduling", mock_server.uri()));

    let result = notifier
        .notify(
            NotificationKind::BookingConfirmed,
            json!({ "appointment_id": "a-1", "time": "10:00 AM" }),
        )
        .await;

    tokio_test::assert_ok!(result);
}

#[tokio::test]
async fn test_webhook_notifier_reports_gateway_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hooks/scheduling"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&mock_server)
        .await;

    let notifier = WebhookNotifier::new(format!("{}/hooks/scheduling", mock_server.uri()));

    let result = notifier
        .notify(NotificationKind::EmergencyRegistered, json!({}))
        .await;

    let error = result.unwrap_err().to_string();
    assert!(error.contains("503"));
    assert!(error.contains("maintenance"));
}
