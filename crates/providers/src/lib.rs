//! LLM Provider implementations for BenchPilot.
//!
//! All providers implement the `benchpilot_core::Provider` trait.
//! The factory selects the correct provider based on configuration.

pub mod anthropic;
pub mod factory;
pub mod gemini;
mod http;
pub mod openai_compat;
pub mod qwen;

pub use anthropic::AnthropicProvider;
pub use factory::build_provider;
pub use gemini::GeminiProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use qwen::QwenProvider;

/// Per-request generation settings shared by every provider.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

impl GenerationSettings {
    pub const DEFAULT_MAX_TOKENS: u32 = 4096;

    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_tokens: Self::DEFAULT_MAX_TOKENS,
            temperature: None,
        }
    }
}
