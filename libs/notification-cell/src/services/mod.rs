pub mod dispatch;
pub mod email;
pub mod whatsapp;
