//! OpenAI-compatible provider implementation.
//!
//! Works with: OpenAI, OpenRouter, vLLM, SGLang and any server exposing
//! `/chat/completions`. Tool calls arrive as structured `tool_calls` with
//! JSON-string arguments and are echoed back verbatim on replay.

use crate::{GenerationSettings, http};
use async_trait::async_trait;
use benchpilot_core::content::ImageOrder;
use benchpilot_core::error::ProviderError;
use benchpilot_core::message::{Content, ContentPart, Message, Role, ToolCallRecord};
use benchpilot_core::provider::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// An OpenAI-compatible LLM provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    settings: GenerationSettings,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            settings: GenerationSettings::new(model),
            client: http::client(),
        }
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new("openai", OPENAI_BASE_URL, api_key, model)
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.settings.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.settings.temperature = temperature;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Convert our Message types to OpenAI API format.
    pub(crate) fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| match m.role {
                Role::User => ApiMessage::new("user", Some(to_api_content(&m.content))),
                Role::Tool => ApiMessage {
                    tool_call_id: m.tool_call_id.clone(),
                    ..ApiMessage::new("tool", Some(ApiContent::Text(m.content.text())))
                },
                Role::Assistant if !m.tool_calls.is_empty() => {
                    let text = m.content.text();
                    ApiMessage {
                        tool_calls: Some(m.tool_calls.iter().map(ApiToolCall::from_record).collect()),
                        ..ApiMessage::new(
                            "assistant",
                            (!text.is_empty()).then_some(ApiContent::Text(text)),
                        )
                    }
                }
                Role::Assistant => ApiMessage::new("assistant", Some(ApiContent::Text(m.content.text()))),
            })
            .collect()
    }

    /// Convert tool definitions to OpenAI API format.
    pub(crate) fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    /// POST a chat completion. Shared with the text-tag family.
    pub(crate) async fn post_completion(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> std::result::Result<RawResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

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
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body);

        http::send_json(&self.name, request).await.map(RawResponse::new)
    }
}

#[async_trait]
impl benchpilot_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.settings.model
    }

    fn image_order(&self) -> ImageOrder {
        ImageOrder::TextFirst
    }

    async fn issue_call(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> std::result::Result<RawResponse, ProviderError> {
        self.post_completion(messages, tools).await
    }

    fn interpret(&self, raw: RawResponse) -> std::result::Result<Interpretation, ProviderError> {
        let completion = Completion::decode(raw.body)?;
        let model = completion.model.unwrap_or_else(|| self.settings.model.clone());
        let content = completion.content;
        let reasoning = (!content.is_empty()).then(|| content.clone());

        if completion.tool_calls.is_empty() {
            debug!(provider = %self.name, chars = content.len(), "Received text response");
            return Ok(Interpretation {
                assistant: Message::assistant(content.clone()),
                reply: Reply::Text(content),
                usage: completion.usage,
                reasoning,
                model,
            });
        }

        debug!(provider = %self.name, count = completion.tool_calls.len(), "Received tool calls");
        Ok(Interpretation {
            assistant: Message::assistant_with_tool_calls(content, completion.tool_calls.clone()),
            reply: Reply::ToolCalls(completion.tool_calls),
            usage: completion.usage,
            reasoning,
            model,
        })
    }
}

fn to_api_content(content: &Content) -> ApiContent {
    match content {
        Content::Text(text) => ApiContent::Text(text.clone()),
        Content::Parts(parts) => ApiContent::Parts(
            parts
                .iter()
                .map(|part| match part {
                    ContentPart::Text { value } => ApiContentPart::Text { text: value.clone() },
                    ContentPart::Image { data, media_type } => ApiContentPart::ImageUrl {
                        image_url: ApiImageUrl {
                            url: format!("data:{media_type};base64,{data}"),
                        },
                    },
                })
                .collect(),
        ),
    }
}

/// A decoded `/chat/completions` envelope, reduced to what interpreters need.
pub(crate) struct Completion {
    pub model: Option<String>,
    pub content: String,
    pub tool_calls: Vec<ToolCallRecord>,
    pub usage: Option<Usage>,
}

impl Completion {
    pub(crate) fn decode(body: Value) -> std::result::Result<Self, ProviderError> {
        let api_response: ApiResponse = serde_json::from_value(body)
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".into()))?;

        let content = match choice.message.content {
            Some(ApiContent::Text(text)) => text,
            Some(ApiContent::Parts(parts)) => parts
                .into_iter()
                .filter_map(|p| match p {
                    ApiContentPart::Text { text } => Some(text),
                    ApiContentPart::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
            None => String::new(),
        };

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCallRecord::new(tc.id, tc.function.name, tc.function.arguments))
            .collect();

        let usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            cached_tokens: u
                .prompt_tokens_details
                .and_then(|d| d.cached_tokens)
                .unwrap_or(0),
        });

        Ok(Self {
            model: api_response.model,
            content,
            tool_calls,
            usage,
        })
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ApiMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<ApiContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ApiMessage {
    fn new(role: &str, content: Option<ApiContent>) -> Self {
        Self {
            role: role.into(),
            content,
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum ApiContent {
    Text(String),
    Parts(Vec<ApiContentPart>),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ApiContentPart {
    Text { text: String },
    ImageUrl { image_url: ApiImageUrl },
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ApiImageUrl {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ApiToolCall {
    #[serde(default)]
    pub id: String,
    #[serde(default = "function_type")]
    pub r#type: String,
    pub function: ApiFunction,
}

impl ApiToolCall {
    fn from_record(record: &ToolCallRecord) -> Self {
        Self {
            id: record.id.clone(),
            r#type: function_type(),
            function: ApiFunction {
                name: record.name.clone(),
                arguments: Value::String(record.arguments_json()),
            },
        }
    }
}

fn function_type() -> String {
    "function".into()
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ApiFunction {
    #[serde(default)]
    pub name: String,
    /// A JSON string on the wire; some servers send an object instead.
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ApiToolDefinition {
    pub r#type: String,
    pub function: ApiToolFunction,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ApiToolFunction {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    prompt_tokens_details: Option<PromptTokensDetails>,
}

#[derive(Debug, Deserialize)]
struct PromptTokensDetails {
    #[serde(default)]
    cached_tokens: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchpilot_core::Provider;
    use serde_json::json;

    fn provider() -> OpenAiCompatProvider {
        OpenAiCompatProvider::openai("sk-test", "gpt-4.1")
    }

    #[test]
    fn openai_constructor() {
        let provider = provider();
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.model(), "gpt-4.1");
        assert!(provider.base_url.contains("api.openai.com"));
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let provider = OpenAiCompatProvider::new("vllm", "http://localhost:8000/v1/", "EMPTY", "m");
        assert_eq!(provider.base_url(), "http://localhost:8000/v1");
    }

    #[test]
    fn user_images_become_data_urls_in_order() {
        let msg = Message::user(vec![ContentPart::text("look"), ContentPart::image("QUJD", "image/png")]);
        let api = OpenAiCompatProvider::to_api_messages(&[msg]);
        let wire = serde_json::to_value(&api[0]).unwrap();
        assert_eq!(wire["role"], "user");
        assert_eq!(wire["content"][0], json!({"type": "text", "text": "look"}));
        assert_eq!(
            wire["content"][1],
            json!({"type": "image_url", "image_url": {"url": "data:image/png;base64,QUJD"}})
        );
    }

    #[test]
    fn scalar_user_content_stays_a_string() {
        let api = OpenAiCompatProvider::to_api_messages(&[Message::user("hi")]);
        let wire = serde_json::to_value(&api[0]).unwrap();
        assert_eq!(wire["content"], "hi");
    }

    #[test]
    fn assistant_tool_calls_echo_with_string_arguments() {
        let msg = Message::assistant_with_tool_calls(
            "",
            vec![ToolCallRecord::new("call_1", "shell_execute", json!(r#"{"command":"ls"}"#))],
        );
        let api = OpenAiCompatProvider::to_api_messages(&[msg]);
        let wire = serde_json::to_value(&api[0]).unwrap();
        assert!(wire.get("content").is_none());
        assert_eq!(wire["tool_calls"][0]["id"], "call_1");
        assert_eq!(wire["tool_calls"][0]["type"], "function");
        assert_eq!(wire["tool_calls"][0]["function"]["arguments"], r#"{"command":"ls"}"#);
    }

    #[test]
    fn tool_result_carries_call_id() {
        let api = OpenAiCompatProvider::to_api_messages(&[Message::tool_result("call_1", "ok")]);
        assert_eq!(api[0].role, "tool");
        assert_eq!(api[0].tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn tool_definition_conversion() {
        let tools = vec![ToolDefinition {
            name: "shell_execute".into(),
            description: "Run a shell command".into(),
            parameters: json!({"type": "object"}),
        }];
        let api_tools = OpenAiCompatProvider::to_api_tools(&tools);
        assert_eq!(api_tools.len(), 1);
        assert_eq!(api_tools[0].function.name, "shell_execute");
        assert_eq!(api_tools[0].r#type, "function");
    }

    #[test]
    fn interpret_tool_calls_keeps_reasoning_and_cached_usage() {
        let raw = RawResponse::new(json!({
            "model": "gpt-4.1-2025-04-14",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "I'll list the files.",
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": { "name": "shell_execute", "arguments": "{\"command\":\"ls\"}" }
                    }]
                }
            }],
            "usage": {
                "prompt_tokens": 100,
                "completion_tokens": 20,
                "prompt_tokens_details": { "cached_tokens": 64 }
            }
        }));
        let interp = provider().interpret(raw).unwrap();
        assert_eq!(interp.model, "gpt-4.1-2025-04-14");
        assert_eq!(interp.reasoning.as_deref(), Some("I'll list the files."));
        assert_eq!(interp.usage.unwrap().cached_tokens, 64);
        match interp.reply {
            Reply::ToolCalls(calls) => {
                assert_eq!(calls[0].id, "call_abc");
                assert_eq!(calls[0].arguments_object()["command"], "ls");
            }
            other => panic!("expected tool calls, got {other:?}"),
        }
        assert_eq!(interp.assistant.tool_calls.len(), 1);
    }

    #[test]
    fn interpret_null_content_is_empty_text() {
        let raw = RawResponse::new(json!({
            "choices": [{ "message": { "role": "assistant", "content": null } }]
        }));
        let interp = provider().interpret(raw).unwrap();
        assert_eq!(interp.reply, Reply::Text(String::new()));
        assert!(interp.usage.is_none());
        assert!(interp.reasoning.is_none());
        assert_eq!(interp.model, "gpt-4.1");
    }

    #[test]
    fn interpret_without_choices_is_invalid_response() {
        let err = provider().interpret(RawResponse::new(json!({"choices": []}))).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }
}
