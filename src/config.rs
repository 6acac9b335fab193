//! Configuration loaded from environment variables.
//!
//! `main` loads `.env` through `dotenvy` before calling
//! [`Settings::from_env`], so both sources behave the same.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use secrecy::SecretString;

use crate::channels::{SANDBOX_WHATSAPP_NUMBER, TwilioClient};
use crate::classifier::{
    DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_TEMPERATURE, IntentClassifier, LlmIntentClassifier,
};
use crate::conversation::{DEFAULT_BOOKING_LINK, Templates};
use crate::error::{ConfigError, Result as ServiceResult};
use crate::llm::{LlmBackend, LlmConfig, create_provider};
use crate::session::DEFAULT_SESSION_TIMEOUT_MINUTES;

pub const DEFAULT_DEEPINFRA_MODEL: &str = "openai/gpt-oss-120b";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;

/// Classifier model settings.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub backend: LlmBackend,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub confidence_threshold: f32,
}

/// Twilio account settings. Credentials are only required by commands that
/// send messages.
#[derive(Debug, Clone)]
pub struct TwilioSettings {
    pub account_sid: Option<String>,
    pub auth_token: Option<SecretString>,
    pub whatsapp_number: String,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub llm: LlmSettings,
    pub twilio: TwilioSettings,
    pub server: ServerSettings,
    pub session_timeout_minutes: i64,
    pub booking_link: String,
    /// Directory for daily-rolling log files. Logs go to stderr only when unset.
    pub log_dir: Option<PathBuf>,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let backend = match get("RECRUITER_LLM_BACKEND").as_deref() {
            None | Some("deepinfra") => LlmBackend::DeepInfra,
            Some("openai") => LlmBackend::OpenAi,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "RECRUITER_LLM_BACKEND".into(),
                    message: format!("unknown backend '{other}' (expected deepinfra or openai)"),
                });
            }
        };
        let (key_var, default_model) = match backend {
            LlmBackend::DeepInfra => ("DEEPINFRA_API_KEY", DEFAULT_DEEPINFRA_MODEL),
            LlmBackend::OpenAi => ("OPENAI_API_KEY", DEFAULT_OPENAI_MODEL),
        };

        let temperature = parse_or(&get, "RECRUITER_LLM_TEMPERATURE", DEFAULT_TEMPERATURE)?;
        let confidence_threshold = parse_or(
            &get,
            "RECRUITER_CONFIDENCE_THRESHOLD",
            DEFAULT_CONFIDENCE_THRESHOLD,
        )?;
        if !(0.0..=1.0).contains(&confidence_threshold) {
            return Err(ConfigError::InvalidValue {
                key: "RECRUITER_CONFIDENCE_THRESHOLD".into(),
                message: format!("{confidence_threshold} is outside [0, 1]"),
            });
        }
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::InvalidValue {
                key: "RECRUITER_LLM_TEMPERATURE".into(),
                message: format!("{temperature} is outside [0, 2]"),
            });
        }

        let session_timeout_minutes = parse_or(
            &get,
            "RECRUITER_SESSION_TIMEOUT_MINUTES",
            DEFAULT_SESSION_TIMEOUT_MINUTES,
        )?;
        if session_timeout_minutes <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "RECRUITER_SESSION_TIMEOUT_MINUTES".into(),
                message: "must be positive".into(),
            });
        }

        Ok(Self {
            llm: LlmSettings {
                backend,
                api_key: get(key_var).map(SecretString::from),
                base_url: get("RECRUITER_LLM_BASE_URL"),
                model: get("RECRUITER_LLM_MODEL").unwrap_or_else(|| default_model.to_string()),
                temperature,
                confidence_threshold,
            },
            twilio: TwilioSettings {
                account_sid: get("TWILIO_ACCOUNT_SID"),
                auth_token: get("TWILIO_AUTH_TOKEN").map(SecretString::from),
                whatsapp_number: get("TWILIO_WHATSAPP_NUMBER")
                    .unwrap_or_else(|| SANDBOX_WHATSAPP_NUMBER.to_string()),
            },
            server: ServerSettings {
                host: get("RECRUITER_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
                port: parse_or(&get, "RECRUITER_PORT", DEFAULT_PORT)?,
            },
            session_timeout_minutes,
            booking_link: get("RECRUITER_BOOKING_LINK")
                .unwrap_or_else(|| DEFAULT_BOOKING_LINK.to_string()),
            log_dir: get("RECRUITER_LOG_DIR").map(PathBuf::from),
        })
    }

    /// Provider configuration for the classifier. Requires an API key.
    pub fn llm_config(&self) -> Result<LlmConfig, ConfigError> {
        let key_var = match self.llm.backend {
            LlmBackend::DeepInfra => "DEEPINFRA_API_KEY",
            LlmBackend::OpenAi => "OPENAI_API_KEY",
        };
        let api_key = self.llm.api_key.clone().ok_or_else(|| ConfigError::MissingRequired {
            key: key_var.into(),
            hint: format!("Set it in the environment or .env, e.g. export {key_var}=..."),
        })?;
        Ok(LlmConfig {
            backend: self.llm.backend,
            api_key,
            model: self.llm.model.clone(),
            base_url: self.llm.base_url.clone(),
        })
    }

    /// The LLM-backed yes/no classifier with the configured threshold and
    /// temperature.
    pub fn classifier(&self) -> ServiceResult<Arc<dyn IntentClassifier>> {
        let llm = create_provider(&self.llm_config()?)?;
        let classifier = LlmIntentClassifier::new(llm)
            .with_confidence_threshold(self.llm.confidence_threshold)
            .with_temperature(self.llm.temperature);
        Ok(Arc::new(classifier))
    }

    /// Twilio client for outbound sends. Requires account SID and token.
    pub fn twilio_client(&self) -> Result<TwilioClient, ConfigError> {
        let account_sid =
            self.twilio
                .account_sid
                .clone()
                .ok_or_else(|| ConfigError::MissingRequired {
                    key: "TWILIO_ACCOUNT_SID".into(),
                    hint: "Find it in the Twilio console.".into(),
                })?;
        let auth_token =
            self.twilio
                .auth_token
                .clone()
                .ok_or_else(|| ConfigError::MissingRequired {
                    key: "TWILIO_AUTH_TOKEN".into(),
                    hint: "Find it in the Twilio console.".into(),
                })?;
        Ok(TwilioClient::new(
            account_sid,
            auth_token,
            self.twilio.whatsapp_number.clone(),
        ))
    }

    pub fn templates(&self) -> Templates {
        Templates::default().with_booking_link(self.booking_link.clone())
    }

    pub fn session_timeout(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.session_timeout_minutes)
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{raw}': {e}"),
        }),
    }
}
