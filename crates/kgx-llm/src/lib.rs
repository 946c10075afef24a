//! KGX LLM - Model adapter boundary
//!
//! Provides the `ModelClient` abstraction the extraction pipeline calls
//! once per chunk, plus OpenAI and Anthropic implementations. The core
//! treats any returned string as possible output — empty, truncated, or
//! non-JSON prose all surface downstream as soft parse failures, never
//! here. Adapter-level failures (network, auth, rate limit) map to
//! `KgxError::ModelCall`.

use async_trait::async_trait;

use kgx_core::{KgxError, LlmConfig, ModelProvider, Result};

pub mod anthropic;
pub mod openai;

pub use anthropic::AnthropicClient;
pub use openai::OpenAiClient;

/// One completion call against a configured model
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send a system + user prompt pair and return the raw model text
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// Create a model client from config
pub fn create_model_client(config: &LlmConfig) -> Result<Box<dyn ModelClient>> {
    match config.provider {
        ModelProvider::OpenAi => Ok(Box::new(OpenAiClient::from_config(config)?)),
        ModelProvider::Anthropic => Ok(Box::new(AnthropicClient::from_config(config)?)),
    }
}

pub(crate) fn require_api_key(config: &LlmConfig) -> Result<String> {
    config.api_key.clone().ok_or_else(|| {
        KgxError::Config(format!("{} API key required", config.provider))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_key(provider: ModelProvider) -> LlmConfig {
        LlmConfig {
            provider,
            api_key: Some("test-key".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_factory_selects_provider() {
        let openai = create_model_client(&config_with_key(ModelProvider::OpenAi)).unwrap();
        assert_eq!(openai.name(), "openai");

        let anthropic = create_model_client(&config_with_key(ModelProvider::Anthropic)).unwrap();
        assert_eq!(anthropic.name(), "anthropic");
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let config = LlmConfig::default();
        assert!(matches!(
            create_model_client(&config),
            Err(KgxError::Config(_))
        ));
    }
}
