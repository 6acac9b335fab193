//! LLM integration for Recruiter Assist.
//!
//! Supports any OpenAI-compatible chat completions endpoint:
//! - **DeepInfra** (default): `https://api.deepinfra.com/v1/openai`
//! - **OpenAI**: `https://api.openai.com/v1`
//!
//! The only consumer is the yes/no intent classifier, so the surface is a
//! single non-streaming `complete` call.

pub mod openai_compat;
pub mod provider;

pub use openai_compat::OpenAiCompatProvider;
pub use provider::*;

use std::sync::Arc;

use crate::error::LlmError;

pub const DEEPINFRA_BASE_URL: &str = "https://api.deepinfra.com/v1/openai";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    DeepInfra,
    OpenAi,
}

impl LlmBackend {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DeepInfra => "deepinfra",
            Self::OpenAi => "openai",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::DeepInfra => DEEPINFRA_BASE_URL,
            Self::OpenAi => OPENAI_BASE_URL,
        }
    }
}

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: secrecy::SecretString,
    pub model: String,
    /// Overrides the backend's default base URL when set.
    pub base_url: Option<String>,
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let base_url = config
        .base_url
        .clone()
        .unwrap_or_else(|| config.backend.default_base_url().to_string());

    let provider = OpenAiCompatProvider::new(
        config.backend.name(),
        base_url.as_str(),
        config.api_key.clone(),
        config.model.as_str(),
    )?;
    tracing::info!(
        "Using {} (model: {}, base: {})",
        config.backend.name(),
        config.model,
        base_url
    );
    Ok(Arc::new(provider))
}
