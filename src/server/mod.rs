//! WhatsApp webhook server.

pub mod inbound;
pub mod routes;

pub use inbound::{Command, deliver_all, handle_whatsapp_message};
pub use routes::{AppState, InitiateRequest, SERVICE_NAME, app_routes};
