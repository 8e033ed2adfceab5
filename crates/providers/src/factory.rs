//! Provider factory. The protocol family is selected once, at construction.

use crate::anthropic::AnthropicProvider;
use crate::gemini::GeminiProvider;
use crate::openai_compat::OpenAiCompatProvider;
use crate::qwen::QwenProvider;
use benchpilot_config::{AppConfig, ConfigError, ProviderFamily};
use benchpilot_core::provider::Provider;
use std::sync::Arc;
use tracing::info;

/// Build the configured provider, resolving credentials from the process
/// environment.
pub fn build_provider(config: &AppConfig) -> Result<Arc<dyn Provider>, ConfigError> {
    build_provider_with(config, |name| std::env::var(name).ok())
}

/// Build the configured provider with an injectable environment lookup.
pub fn build_provider_with(
    config: &AppConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Arc<dyn Provider>, ConfigError> {
    let controller = &config.controller;
    let family = controller.provider;
    let credentials = config.resolve_credentials_with(family, env)?;
    let model = controller.model.clone();

    let provider: Arc<dyn Provider> = match family {
        ProviderFamily::Openai => {
            let provider = match credentials.base_url {
                Some(url) => OpenAiCompatProvider::new("openai", url, credentials.api_key, model),
                None => OpenAiCompatProvider::openai(credentials.api_key, model),
            };
            Arc::new(
                provider
                    .with_max_tokens(controller.max_tokens)
                    .with_temperature(controller.temperature),
            )
        }
        ProviderFamily::Qwen => {
            let url = credentials
                .base_url
                .ok_or_else(|| ConfigError::ValidationError("qwen requires a base URL".into()))?;
            Arc::new(
                QwenProvider::new(url, credentials.api_key, model)
                    .with_max_tokens(controller.max_tokens)
                    .with_temperature(controller.temperature),
            )
        }
        ProviderFamily::Anthropic => {
            let mut provider = AnthropicProvider::new(credentials.api_key, model)
                .with_max_tokens(controller.max_tokens)
                .with_temperature(controller.temperature);
            if let Some(url) = credentials.base_url {
                provider = provider.with_base_url(url);
            }
            Arc::new(provider)
        }
        ProviderFamily::Gemini => {
            let mut provider = GeminiProvider::new(credentials.api_key, model)
                .with_v1alpha(credentials.use_v1alpha)
                .with_max_tokens(controller.max_tokens)
                .with_temperature(controller.temperature);
            if let Some(url) = credentials.base_url {
                provider = provider.with_base_url(url);
            }
            Arc::new(provider)
        }
    };

    info!(provider = %provider.name(), model = %provider.model(), "Provider initialized");
    Ok(provider)
}
