//! Twilio WhatsApp transport: the Messages REST API for outbound sends and
//! TwiML for inline webhook replies.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::channels::{OutboundSender, SendReceipt};
use crate::error::ChannelError;

pub const TWILIO_API_BASE: &str = "https://api.twilio.com";

/// Twilio's shared WhatsApp sandbox sender.
pub const SANDBOX_WHATSAPP_NUMBER: &str = "whatsapp:+14155238886";

const WHATSAPP_PREFIX: &str = "whatsapp:";

static PHONE_NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s\-()]").expect("static pattern"));

/// Outbound WhatsApp client for one Twilio account.
pub struct TwilioClient {
    account_sid: String,
    auth_token: SecretString,
    from: String,
    api_base: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TwilioApiError {
    #[serde(default)]
    code: Option<u32>,
    #[serde(default)]
    message: Option<String>,
}

impl TwilioClient {
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: SecretString,
        from: impl Into<String>,
    ) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token,
            from: from.into(),
            api_base: TWILIO_API_BASE.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Point the client at another API host, e.g. a local mock.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, self.account_sid
        )
    }
}

#[async_trait]
impl OutboundSender for TwilioClient {
    fn name(&self) -> &str {
        "twilio"
    }

    async fn send(&self, to: &str, body: &str) -> Result<SendReceipt, ChannelError> {
        let to = if to.starts_with(WHATSAPP_PREFIX) {
            to.to_string()
        } else {
            format!("{WHATSAPP_PREFIX}{to}")
        };

        let resp = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .form(&[("From", self.from.as_str()), ("To", to.as_str()), ("Body", body)])
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "twilio".into(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(ChannelError::AuthFailed {
                name: "twilio".into(),
                reason: format!("HTTP {status}"),
            });
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let reason = match serde_json::from_str::<TwilioApiError>(&text) {
                Ok(TwilioApiError {
                    code: Some(code),
                    message: Some(message),
                }) => format!("HTTP {status}, code {code}: {message}"),
                _ => format!("HTTP {status}: {}", text.chars().take(200).collect::<String>()),
            };
            warn!(to = %to, %reason, "Twilio send failed");
            return Err(ChannelError::SendFailed {
                name: "twilio".into(),
                reason,
            });
        }

        let message: MessageResource = resp
            .json()
            .await
            .map_err(|e| ChannelError::Http(format!("Failed to parse Twilio response: {e}")))?;
        debug!(to = %to, sid = %message.sid, "Sent WhatsApp message");

        Ok(SendReceipt {
            sid: message.sid,
            status: message.status.unwrap_or_else(|| "unknown".to_string()),
        })
    }
}

/// Normalize a user-entered number to `whatsapp:+<digits>`.
///
/// Spaces, dashes and parentheses are dropped, an existing `whatsapp:`
/// prefix is removed, and a leading `+` is added when missing.
pub fn normalize_whatsapp_number(raw: &str) -> String {
    let cleaned = PHONE_NOISE.replace_all(raw.trim(), "");
    let cleaned: &str = &cleaned;
    let number = cleaned.strip_prefix(WHATSAPP_PREFIX).unwrap_or(cleaned);
    if number.starts_with('+') {
        format!("{WHATSAPP_PREFIX}{number}")
    } else {
        format!("{WHATSAPP_PREFIX}+{number}")
    }
}

/// Build a TwiML messaging response with at most one inline message.
pub fn twiml(message: Option<&str>) -> String {
    const HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
    match message {
        Some(body) => format!(
            "{HEADER}<Response><Message>{}</Message></Response>",
            xml_escape(body)
        ),
        None => format!("{HEADER}<Response />"),
    }
}

fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
