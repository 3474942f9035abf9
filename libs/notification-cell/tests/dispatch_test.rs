use assert_matches::assert_matches;
use chrono::Utc;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use notification_cell::models::{AppointmentNotice, NotificationError};
use notification_cell::services::email::EmailChannel;
use notification_cell::services::whatsapp::WhatsAppChannel;
use notification_cell::NotificationDispatcher;
use shared_config::AppConfig;

fn config(email_url: &str, whatsapp_url: &str, whatsapp_token: &str) -> AppConfig {
    AppConfig {
        supabase_url: "http://localhost:54321".to_string(),
        supabase_anon_key: "test-anon-key".to_string(),
        supabase_jwt_secret: "test-secret".to_string(),
        notify_email_webhook_url: email_url.to_string(),
        whatsapp_api_url: whatsapp_url.to_string(),
        whatsapp_api_token: whatsapp_token.to_string(),
    }
}

fn notice(email: Option<&str>, phone: Option<&str>) -> AppointmentNotice {
    AppointmentNotice {
        appointment_id: Uuid::new_v4(),
        tenant_id: Uuid::new_v4(),
        client_name: "Elena Christou".to_string(),
        client_email: email.map(str::to_string),
        client_phone: phone.map(str::to_string),
        employee_name: "Maria Georgiou".to_string(),
        service_name: "Haircut".to_string(),
        starts_at: Utc::now(),
        duration_minutes: 30,
    }
}

#[tokio::test]
async fn email_channel_posts_the_confirmation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hooks/email"))
        .and(body_partial_json(serde_json::json!({
            "to": "elena@example.com",
            "template": "appointment_created"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = config(&format!("{}/hooks/email", server.uri()), "", "");
    let channel = EmailChannel::new(&config).unwrap();

    channel
        .send_appointment_created(&notice(Some("elena@example.com"), None))
        .await
        .unwrap();
}

#[tokio::test]
async fn email_without_recipient_is_reported() {
    let server = MockServer::start().await;
    let config = config(&format!("{}/hooks/email", server.uri()), "", "");
    let channel = EmailChannel::new(&config).unwrap();

    let result = channel.send_appointment_created(&notice(None, None)).await;
    assert_matches!(result, Err(NotificationError::MissingRecipient));
}

#[tokio::test]
async fn unconfigured_channels_refuse_construction() {
    let config = config("", "", "");
    assert_matches!(
        EmailChannel::new(&config),
        Err(NotificationError::NotConfigured)
    );
    assert_matches!(
        WhatsAppChannel::new(&config),
        Err(NotificationError::NotConfigured)
    );
}

#[tokio::test]
async fn whatsapp_channel_authenticates_with_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("Authorization", "Bearer wa-token"))
        .and(body_partial_json(serde_json::json!({
            "messaging_product": "whatsapp",
            "to": "+35799123456"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = config("", &format!("{}/v1/messages", server.uri()), "wa-token");
    let channel = WhatsAppChannel::new(&config).unwrap();

    channel
        .send_appointment_created(&notice(None, Some("+35799123456")))
        .await
        .unwrap();
}

#[tokio::test]
async fn dispatcher_swallows_channel_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hooks/email"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let config = config(&format!("{}/hooks/email", server.uri()), "", "");
    let dispatcher = NotificationDispatcher::new(&config);
    assert!(dispatcher.has_channels());

    // A failing transport must not propagate; this returns normally
    dispatcher
        .notify_appointment_created(notice(Some("elena@example.com"), None))
        .await;
}

#[tokio::test]
async fn dispatcher_without_channels_is_a_no_op() {
    let dispatcher = NotificationDispatcher::new(&config("", "", ""));
    assert!(!dispatcher.has_channels());

    dispatcher
        .notify_appointment_created(notice(Some("elena@example.com"), None))
        .await;
}
