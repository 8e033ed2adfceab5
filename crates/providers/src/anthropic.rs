//! Anthropic native provider implementation.
//!
//! Uses Anthropic's Messages API directly (not an OpenAI-compatible proxy).
//!
//! - `x-api-key` header authentication (not Bearer) and `anthropic-version`
//! - Images precede text within a user turn, as base64 `source` blocks
//! - Tool use arrives as `tool_use` content blocks with object arguments;
//!   results go back as `tool_result` blocks inside a user turn
//! - Assistant turns are replayed with the exact blocks the API returned,
//!   kept in message metadata, so thinking signatures survive
//! - Consecutive same-role turns are merged; the API rejects them otherwise

use crate::{GenerationSettings, http};
use async_trait::async_trait;
use benchpilot_core::content::ImageOrder;
use benchpilot_core::error::ProviderError;
use benchpilot_core::message::{Content, ContentPart, Message, Role, ToolCallRecord};
use benchpilot_core::provider::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Metadata key holding the raw response blocks of an assistant turn.
pub const RAW_CONTENT_KEY: &str = "anthropic_content";

/// Anthropic native Messages API provider.
pub struct AnthropicProvider {
    name: String,
    base_url: String,
    api_key: String,
    settings: GenerationSettings,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: "anthropic".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            settings: GenerationSettings::new(model),
            client: http::client(),
        }
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.settings.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.settings.temperature = temperature;
        self
    }

    /// Convert messages to Anthropic API format with content blocks.
    fn to_api_messages(messages: &[Message]) -> Vec<AnthropicMessage> {
        let mut result: Vec<AnthropicMessage> = Vec::new();

        for msg in messages {
            let converted = match msg.role {
                Role::User => AnthropicMessage {
                    role: "user".into(),
                    content: user_content(&msg.content),
                },
                Role::Assistant => AnthropicMessage {
                    role: "assistant".into(),
                    content: assistant_content(msg),
                },
                Role::Tool => AnthropicMessage {
                    role: "user".into(),
                    content: AnthropicContent::Blocks(vec![ContentBlock::ToolResult {
                        tool_use_id: msg.tool_call_id.clone().unwrap_or_default(),
                        content: msg.content.text(),
                    }]),
                },
            };

            match result.last_mut() {
                Some(previous) if previous.role == converted.role => previous.absorb(converted.content),
                _ => result.push(converted),
            }
        }

        result
    }

    /// Convert tool definitions to Anthropic format.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<AnthropicTool> {
        tools
            .iter()
            .map(|t| AnthropicTool {
                name: t.name.clone(),
                description: t.description.clone(),
                input_schema: t.parameters.clone(),
            })
            .collect()
    }
}

fn user_content(content: &Content) -> AnthropicContent {
    match content {
        Content::Text(text) => AnthropicContent::Text(text.clone()),
        Content::Parts(parts) => AnthropicContent::Blocks(
            parts
                .iter()
                .map(|part| match part {
                    ContentPart::Text { value } => ContentBlock::Text { text: value.clone() },
                    ContentPart::Image { data, media_type } => ContentBlock::Image {
                        source: ImageSource {
                            r#type: "base64".into(),
                            media_type: media_type.clone(),
                            data: data.clone(),
                        },
                    },
                })
                .collect(),
        ),
    }
}

fn assistant_content(msg: &Message) -> AnthropicContent {
    if let Some(Value::Array(blocks)) = msg.metadata.get(RAW_CONTENT_KEY) {
        return AnthropicContent::Raw(blocks.clone());
    }

    let text = msg.content.text();
    if msg.tool_calls.is_empty() {
        return AnthropicContent::Text(text);
    }

    // Assistant message with tool use blocks
    let mut blocks: Vec<ContentBlock> = Vec::new();
    if !text.is_empty() {
        blocks.push(ContentBlock::Text { text });
    }
    for tc in &msg.tool_calls {
        blocks.push(ContentBlock::ToolUse {
            id: tc.id.clone(),
            name: tc.name.clone(),
            input: Value::Object(tc.arguments_object()),
        });
    }
    AnthropicContent::Blocks(blocks)
}

#[async_trait]
impl benchpilot_core::Provider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.settings.model
    }

    fn image_order(&self) -> ImageOrder {
        ImageOrder::ImagesFirst
    }

    async fn issue_call(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> std::result::Result<RawResponse, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);

        let mut body = serde_json::json!({
            "model": self.settings.model,
            "messages": Self::to_api_messages(messages),
            "max_tokens": self.settings.max_tokens,
        });

        if let Some(temperature) = self.settings.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }

        if !tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(tools));
        }

        debug!(
            provider = %self.name,
            model = %self.settings.model,
            messages = messages.len(),
            tools = tools.len(),
            "Sending completion request"
        );

        let request = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);

        http::send_json(&self.name, request).await.map(RawResponse::new)
    }

    fn interpret(&self, raw: RawResponse) -> std::result::Result<Interpretation, ProviderError> {
        let raw_blocks = raw.body.get("content").cloned().unwrap_or(Value::Array(Vec::new()));

        let resp: AnthropicResponse = serde_json::from_value(raw.body).map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse Anthropic response: {e}"))
        })?;

        let mut text_content = String::new();
        let mut tool_calls = Vec::new();

        for block in resp.content {
            match block {
                ResponseContentBlock::Text { text } => text_content.push_str(&text),
                ResponseContentBlock::ToolUse { id, name, input } => {
                    tool_calls.push(ToolCallRecord::new(id, name, input));
                }
                ResponseContentBlock::Other => {}
            }
        }

        let usage = resp.usage.map(|u| Usage {
            prompt_tokens: u.input_tokens + u.cache_read_input_tokens + u.cache_creation_input_tokens,
            completion_tokens: u.output_tokens,
            cached_tokens: u.cache_read_input_tokens,
        });

        let reasoning = (!text_content.is_empty()).then(|| text_content.clone());
        let model = resp.model.unwrap_or_else(|| self.settings.model.clone());

        let reply = if tool_calls.is_empty() {
            debug!(provider = %self.name, chars = text_content.len(), "Received text response");
            Reply::Text(text_content.clone())
        } else {
            debug!(provider = %self.name, count = tool_calls.len(), "Received tool calls");
            Reply::ToolCalls(tool_calls.clone())
        };

        let assistant = Message::assistant_with_tool_calls(text_content, tool_calls)
            .with_metadata(RAW_CONTENT_KEY, raw_blocks);

        Ok(Interpretation {
            assistant,
            reply,
            usage,
            reasoning,
            model,
        })
    }
}

// --- Anthropic API types ---

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: AnthropicContent,
}

impl AnthropicMessage {
    /// Append another same-role turn's content to this one.
    fn absorb(&mut self, content: AnthropicContent) {
        let mut merged = std::mem::replace(&mut self.content, AnthropicContent::Raw(Vec::new())).into_values();
        merged.extend(content.into_values());
        self.content = AnthropicContent::Raw(merged);
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum AnthropicContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
    /// Blocks replayed exactly as the API produced them
    Raw(Vec<Value>),
}

impl AnthropicContent {
    fn into_values(self) -> Vec<Value> {
        match self {
            Self::Text(text) if text.is_empty() => Vec::new(),
            Self::Text(text) => vec![serde_json::json!({ "type": "text", "text": text })],
            Self::Blocks(blocks) => blocks
                .into_iter()
                .filter_map(|b| serde_json::to_value(b).ok())
                .collect(),
            Self::Raw(values) => values,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image")]
    Image { source: ImageSource },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(rename = "tool_result")]
    ToolResult { tool_use_id: String, content: String },
}

#[derive(Debug, Serialize)]
struct ImageSource {
    r#type: String,
    media_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: Value,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    model: Option<String>,
    content: Vec<ResponseContentBlock>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ResponseContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    /// thinking, redacted_thinking, server tool blocks
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
    #[serde(default)]
    cache_read_input_tokens: u64,
    #[serde(default)]
    cache_creation_input_tokens: u64,
}
