// libs/notification-cell/src/services/whatsapp.rs
use reqwest::Client;
use serde_json::json;
use tracing::{debug, info};

use shared_config::AppConfig;

use crate::models::{AppointmentNotice, NotificationError};

/// Delivers booking confirmations through the WhatsApp messaging API.
#[derive(Clone, Debug)]
pub struct WhatsAppChannel {
    client: Client,
    api_url: String,
    api_token: String,
}

impl WhatsAppChannel {
    pub fn new(config: &AppConfig) -> Result<Self, NotificationError> {
        if !config.is_whatsapp_configured() {
            return Err(NotificationError::NotConfigured);
        }

        Ok(Self {
            client: Client::new(),
            api_url: config.whatsapp_api_url.clone(),
            api_token: config.whatsapp_api_token.clone(),
        })
    }

    pub async fn send_appointment_created(
        &self,
        notice: &AppointmentNotice,
    ) -> Result<(), NotificationError> {
        let Some(to) = notice.client_phone.as_deref() else {
            return Err(NotificationError::MissingRecipient);
        };

        debug!(
            "Sending WhatsApp confirmation for appointment {} to {}",
            notice.appointment_id, to
        );

        let local_time = notice.starts_at.format("%Y-%m-%d %H:%M");
        let body = json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "text",
            "text": {
                "body": format!(
                    "Hi {}! Your {} with {} is confirmed for {}.",
                    notice.client_name, notice.service_name, notice.employee_name, local_time
                )
            }
        });

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(NotificationError::ApiError {
                message: format!("HTTP {}: {}", status, text),
            });
        }

        info!(
            "WhatsApp confirmation sent for appointment {}",
            notice.appointment_id
        );
        Ok(())
    }
}
