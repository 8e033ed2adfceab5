//! Provider trait. One implementation per vendor protocol family.
//!
//! A provider owns the wire shape: it replays the message log in the
//! vendor's format, and turns the vendor's reply back into an assistant
//! [`Message`] plus either structured tool calls or free text.
//!
//! Implementations: OpenAI-compatible, Anthropic Messages, Gemini, Qwen text-tag.

use crate::content::{self, ImageOrder, Images};
use crate::error::ProviderError;
use crate::message::{Content, Message, ToolCallRecord};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A tool definition sent to the LLM so it knows what tools it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// Token usage reported by the vendor for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    /// Portion of `prompt_tokens` served from the vendor's prompt cache
    #[serde(default)]
    pub cached_tokens: u64,
}

impl Usage {
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Undecoded vendor response body.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub body: serde_json::Value,
}

impl RawResponse {
    pub fn new(body: serde_json::Value) -> Self {
        Self { body }
    }
}

/// What the model replied with.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Structured (or text-embedded) tool invocations
    ToolCalls(Vec<ToolCallRecord>),
    /// Free text expected to carry a JSON action
    Text(String),
}

/// A classified vendor response.
#[derive(Debug, Clone)]
pub struct Interpretation {
    /// Assistant turn to append, shaped so the next replay stays valid
    pub assistant: Message,

    pub reply: Reply,

    /// Absent when the vendor reported no usage block
    pub usage: Option<Usage>,

    /// Reasoning text the model emitted alongside its action
    pub reasoning: Option<String>,

    /// Model that answered (falls back to the configured one)
    pub model: String,
}

/// The core Provider trait.
///
/// The controller calls `issue_call()` then `interpret()` without knowing
/// which vendor is behind it. The variant is chosen once, at construction.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai", "anthropic").
    fn name(&self) -> &str;

    /// Model requested on every call.
    fn model(&self) -> &str;

    /// Multimodal part order this vendor expects.
    fn image_order(&self) -> ImageOrder;

    /// Whether tool calls travel as tagged text instead of native schemas.
    ///
    /// When true the caller is expected to describe the tools in the prompt.
    fn uses_text_tool_calls(&self) -> bool {
        false
    }

    /// Compose a user turn in this vendor's part order.
    fn prepare_content(&self, text: &str, images: Images) -> Content {
        content::build(text, images, self.image_order())
    }

    /// Send the full log (plus tool schemas, when non-empty) to the vendor.
    async fn issue_call(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> std::result::Result<RawResponse, ProviderError>;

    /// Classify a raw response. Fails only on a malformed envelope.
    fn interpret(&self, raw: RawResponse) -> std::result::Result<Interpretation, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_totals() {
        let usage = Usage {
            prompt_tokens: 120,
            completion_tokens: 30,
            cached_tokens: 100,
        };
        assert_eq!(usage.total_tokens(), 150);
    }

    #[test]
    fn tool_definition_serialization() {
        let tool = ToolDefinition {
            name: "shell_execute".into(),
            description: "Execute a shell command".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "command": { "type": "string", "description": "The command to run" }
                },
                "required": ["command"]
            }),
        };
        let json = serde_json::to_string(&tool).unwrap();
        assert!(json.contains("shell_execute"));
        assert!(json.contains("command"));
    }
}
