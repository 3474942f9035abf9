// libs/notification-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Everything the delivery channels need about a freshly booked appointment,
/// denormalized so no channel has to read the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentNotice {
    pub appointment_id: Uuid,
    pub tenant_id: Uuid,
    pub client_name: String,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub employee_name: String,
    pub service_name: String,
    pub starts_at: DateTime<Utc>,
    pub duration_minutes: i32,
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("notification channel not configured")]
    NotConfigured,

    #[error("recipient address missing")]
    MissingRecipient,

    #[error("delivery API error: {message}")]
    ApiError { message: String },

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}
