// libs/notification-cell/src/services/email.rs
use reqwest::Client;
use serde_json::json;
use tracing::{debug, info};

use shared_config::AppConfig;

use crate::models::{AppointmentNotice, NotificationError};

/// Delivers booking confirmations to the transactional-email webhook.
#[derive(Clone, Debug)]
pub struct EmailChannel {
    client: Client,
    webhook_url: String,
}

impl EmailChannel {
    pub fn new(config: &AppConfig) -> Result<Self, NotificationError> {
        if !config.is_email_configured() {
            return Err(NotificationError::NotConfigured);
        }

        Ok(Self {
            client: Client::new(),
            webhook_url: config.notify_email_webhook_url.clone(),
        })
    }

    pub async fn send_appointment_created(
        &self,
        notice: &AppointmentNotice,
    ) -> Result<(), NotificationError> {
        let Some(to) = notice.client_email.as_deref() else {
            return Err(NotificationError::MissingRecipient);
        };

        debug!(
            "Sending confirmation email for appointment {} to {}",
            notice.appointment_id, to
        );

        let body = json!({
            "to": to,
            "subject": format!("Appointment confirmed: {}", notice.service_name),
            "template": "appointment_created",
            "data": {
                "client_name": notice.client_name,
                "employee_name": notice.employee_name,
                "service_name": notice.service_name,
                "starts_at": notice.starts_at.to_rfc3339(),
                "duration_minutes": notice.duration_minutes,
                "appointment_id": notice.appointment_id,
            }
        });

        let response = self.client.post(&self.webhook_url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(NotificationError::ApiError {
                message: format!("HTTP {}: {}", status, text),
            });
        }

        info!(
            "Confirmation email sent for appointment {}",
            notice.appointment_id
        );
        Ok(())
    }
}
