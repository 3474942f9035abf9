pub mod models;
pub mod services;

pub use models::{AppointmentNotice, NotificationError};
pub use services::dispatch::NotificationDispatcher;
