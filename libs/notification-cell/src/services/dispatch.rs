// libs/notification-cell/src/services/dispatch.rs
use tracing::{debug, warn};

use shared_config::AppConfig;

use crate::models::AppointmentNotice;
use crate::services::email::EmailChannel;
use crate::services::whatsapp::WhatsAppChannel;

/// Fans a booking confirmation out to every configured channel. Channel
/// failures are logged and swallowed: the booking already succeeded, and
/// nothing downstream may change that.
#[derive(Clone)]
pub struct NotificationDispatcher {
    email: Option<EmailChannel>,
    whatsapp: Option<WhatsAppChannel>,
}

impl NotificationDispatcher {
    pub fn new(config: &AppConfig) -> Self {
        let email = EmailChannel::new(config)
            .map_err(|_| debug!("Email channel not configured, skipping"))
            .ok();
        let whatsapp = WhatsAppChannel::new(config)
            .map_err(|_| debug!("WhatsApp channel not configured, skipping"))
            .ok();

        Self { email, whatsapp }
    }

    pub fn has_channels(&self) -> bool {
        self.email.is_some() || self.whatsapp.is_some()
    }

    pub async fn notify_appointment_created(&self, notice: AppointmentNotice) {
        if !self.has_channels() {
            debug!(
                "No notification channels configured, appointment {} not announced",
                notice.appointment_id
            );
            return;
        }

        if let Some(email) = &self.email {
            if let Err(e) = email.send_appointment_created(&notice).await {
                warn!(
                    "Email notification failed for appointment {}: {}",
                    notice.appointment_id, e
                );
            }
        }

        if let Some(whatsapp) = &self.whatsapp {
            if let Err(e) = whatsapp.send_appointment_created(&notice).await {
                warn!(
                    "WhatsApp notification failed for appointment {}: {}",
                    notice.appointment_id, e
                );
            }
        }
    }

    /// Hand the notice off to a detached task. Runs outside any store
    /// transaction; the caller returns immediately.
    pub fn spawn_appointment_created(&self, notice: AppointmentNotice) {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            dispatcher.notify_appointment_created(notice).await;
        });
    }
}
