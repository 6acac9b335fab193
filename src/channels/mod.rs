//! Message transports: Twilio WhatsApp and a local terminal REPL.

pub mod cli;
pub mod twilio;

use async_trait::async_trait;

use crate::error::ChannelError;

pub use cli::run_chat;
pub use twilio::{
    SANDBOX_WHATSAPP_NUMBER, TWILIO_API_BASE, TwilioClient, normalize_whatsapp_number, twiml,
};

/// Delivery receipt returned by an outbound send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    pub sid: String,
    pub status: String,
}

/// Sends a message to a user outside of a webhook reply.
#[async_trait]
pub trait OutboundSender: Send + Sync {
    /// Channel name for logs and errors.
    fn name(&self) -> &str;

    async fn send(&self, to: &str, body: &str) -> Result<SendReceipt, ChannelError>;
}
