//! Gemini `generateContent` provider.
//!
//! The wire differs from the chat-completions family in a few ways that
//! matter for replay:
//!
//! - roles are `user` / `model`, and consecutive same-role contents must be
//!   merged into one
//! - tool results travel as `functionResponse` parts carrying the function
//!   *name*, which is resolved from the originating call id in the log
//! - the API assigns no call ids, so they are generated locally
//! - only string enums are accepted in function schemas

use crate::{GenerationSettings, http};
use async_trait::async_trait;
use benchpilot_core::content::ImageOrder;
use benchpilot_core::error::ProviderError;
use benchpilot_core::message::{Content, ContentPart, Message, Role, ToolCallRecord};
use benchpilot_core::provider::*;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Metadata key holding the raw response parts of a model turn.
pub const RAW_PARTS_KEY: &str = "gemini_parts";

pub struct GeminiProvider {
    name: String,
    base_url: String,
    api_key: String,
    api_version: &'static str,
    settings: GenerationSettings,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: "gemini".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            api_version: "v1beta",
            settings: GenerationSettings::new(model),
            client: http::client(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Target the v1alpha surface (needed for media resolution controls).
    pub fn with_v1alpha(mut self, enabled: bool) -> Self {
        self.api_version = if enabled { "v1alpha" } else { "v1beta" };
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

    fn endpoint(&self) -> String {
        format!(
            "{}/{}/models/{}:generateContent",
            self.base_url, self.api_version, self.settings.model
        )
    }

    /// Convert the log into `contents`, merging same-role neighbours.
    fn to_contents(messages: &[Message]) -> Vec<Value> {
        let names: HashMap<&str, &str> = messages
            .iter()
            .flat_map(|m| m.tool_calls.iter())
            .map(|tc| (tc.id.as_str(), tc.name.as_str()))
            .collect();

        let mut contents: Vec<(&'static str, Vec<Value>)> = Vec::new();

        for msg in messages {
            let (role, parts) = match msg.role {
                Role::User => ("user", user_parts(&msg.content)),
                Role::Assistant => ("model", model_parts(msg)),
                Role::Tool => {
                    let id = msg.tool_call_id.as_deref().unwrap_or_default();
                    let name = names.get(id).copied().unwrap_or_else(|| {
                        warn!(tool_call_id = id, "No originating call for tool result");
                        id
                    });
                    let part = json!({
                        "functionResponse": {
                            "name": name,
                            "response": { "result": msg.content.text() }
                        }
                    });
                    ("user", vec![part])
                }
            };

            if parts.is_empty() {
                continue;
            }
            match contents.last_mut() {
                Some((last_role, last_parts)) if *last_role == role => last_parts.extend(parts),
                _ => contents.push((role, parts)),
            }
        }

        contents
            .into_iter()
            .map(|(role, parts)| json!({ "role": role, "parts": parts }))
            .collect()
    }

    fn to_api_tools(tools: &[ToolDefinition]) -> Value {
        let declarations: Vec<Value> = tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "parameters": sanitize_parameters(&t.parameters),
                })
            })
            .collect();
        json!([{ "functionDeclarations": declarations }])
    }
}

fn user_parts(content: &Content) -> Vec<Value> {
    match content {
        Content::Text(text) if text.is_empty() => Vec::new(),
        Content::Text(text) => vec![json!({ "text": text })],
        Content::Parts(parts) => parts
            .iter()
            .map(|part| match part {
                ContentPart::Text { value } => json!({ "text": value }),
                ContentPart::Image { data, media_type } => json!({
                    "inlineData": { "mimeType": media_type, "data": data }
                }),
            })
            .collect(),
    }
}

fn model_parts(msg: &Message) -> Vec<Value> {
    if let Some(Value::Array(parts)) = msg.metadata.get(RAW_PARTS_KEY) {
        return parts.clone();
    }

    let mut parts = Vec::new();
    let text = msg.content.text();
    if !text.is_empty() {
        parts.push(json!({ "text": text }));
    }
    for tc in &msg.tool_calls {
        parts.push(json!({
            "functionCall": { "name": tc.name, "args": tc.arguments_object() }
        }));
    }
    parts
}

/// Strip non-string enums, moving their values into the description.
pub fn sanitize_parameters(schema: &Value) -> Value {
    let Value::Object(map) = schema else {
        return schema.clone();
    };
    let mut out: Map<String, Value> = map.clone();

    if let Some(Value::Object(properties)) = map.get("properties") {
        let sanitized: Map<String, Value> = properties
            .iter()
            .map(|(name, prop)| (name.clone(), sanitize_parameters(prop)))
            .collect();
        out.insert("properties".into(), Value::Object(sanitized));
    }

    if let Some(Value::Array(options)) = map.get("enum")
        && options.iter().any(|v| !v.is_string())
    {
        let listed = options
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ");
        let description = match map.get("description").and_then(Value::as_str) {
            Some(desc) => format!("{desc} (Options: {listed})"),
            None => format!("Options: {listed}"),
        };
        out.insert("description".into(), Value::String(description));
        out.remove("enum");
    }

    Value::Object(out)
}

#[async_trait]
impl benchpilot_core::Provider for GeminiProvider {
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
        let mut generation_config = json!({ "maxOutputTokens": self.settings.max_tokens });
        if let Some(temperature) = self.settings.temperature {
            generation_config["temperature"] = json!(temperature);
        }

        let mut body = json!({
            "contents": Self::to_contents(messages),
            "generationConfig": generation_config,
        });

        if !tools.is_empty() {
            body["tools"] = Self::to_api_tools(tools);
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
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body);

        http::send_json(&self.name, request).await.map(RawResponse::new)
    }

    fn interpret(&self, raw: RawResponse) -> std::result::Result<Interpretation, ProviderError> {
        let resp: GeminiResponse = serde_json::from_value(raw.body).map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse Gemini response: {e}"))
        })?;

        let candidate = resp
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("No candidates in Gemini response".into()))?;

        let raw_parts = candidate
            .content
            .map(|c| c.parts)
            .filter(|parts| !parts.is_empty())
            .ok_or_else(|| ProviderError::InvalidResponse("No content parts in Gemini response".into()))?;

        let mut text_content = String::new();
        let mut tool_calls = Vec::new();

        for value in &raw_parts {
            let part: ResponsePart = serde_json::from_value(value.clone()).unwrap_or_default();
            if let Some(call) = part.function_call {
                let id = format!("call_{}", uuid::Uuid::new_v4().simple());
                tool_calls.push(ToolCallRecord::new(id, call.name, call.args));
            } else if let Some(text) = part.text
                && !part.thought
            {
                text_content.push_str(&text);
            }
        }

        let usage = resp.usage_metadata.map(|u| Usage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count + u.thoughts_token_count,
            cached_tokens: u.cached_content_token_count,
        });

        let reasoning = (!text_content.is_empty()).then(|| text_content.clone());
        let model = resp.model_version.unwrap_or_else(|| self.settings.model.clone());

        let reply = if tool_calls.is_empty() {
            debug!(provider = %self.name, chars = text_content.len(), "Received text response");
            Reply::Text(text_content.clone())
        } else {
            debug!(provider = %self.name, count = tool_calls.len(), "Received function calls");
            Reply::ToolCalls(tool_calls.clone())
        };

        let mut assistant = Message::assistant_with_tool_calls(text_content, tool_calls);
        if !assistant.tool_calls.is_empty() {
            // Replaying the exact parts keeps thought signatures attached.
            assistant = assistant.with_metadata(RAW_PARTS_KEY, Value::Array(raw_parts));
        }

        Ok(Interpretation {
            assistant,
            reply,
            usage,
            reasoning,
            model,
        })
    }
}

// --- Gemini API types ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    function_call: Option<FunctionCall>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    #[serde(default)]
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
    #[serde(default)]
    thoughts_token_count: u64,
    #[serde(default)]
    cached_content_token_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchpilot_core::Provider;

    fn provider() -> GeminiProvider {
        GeminiProvider::new("test-key", "gemini-2.5-flash")
    }

    #[test]
    fn endpoint_respects_api_version() {
        let provider = provider().with_base_url("http://localhost:9999/");
        assert_eq!(
            provider.endpoint(),
            "http://localhost:9999/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert!(provider.with_v1alpha(true).endpoint().contains("/v1alpha/"));
    }

    #[test]
    fn integer_enum_moves_into_description() {
        let schema = json!({
            "type": "object",
            "properties": {
                "num_clicks": { "type": "integer", "description": "Number of clicks", "enum": [1, 2, 3] },
                "count": { "type": "integer", "enum": [1, 2] },
                "button": { "type": "string", "enum": ["left", "right"] }
            }
        });
        let out = sanitize_parameters(&schema);
        let props = &out["properties"];
        assert!(props["num_clicks"].get("enum").is_none());
        assert_eq!(props["num_clicks"]["description"], "Number of clicks (Options: 1, 2, 3)");
        assert_eq!(props["count"]["description"], "Options: 1, 2");
        assert_eq!(props["button"]["enum"], json!(["left", "right"]));
    }

    #[test]
    fn function_response_uses_originating_name() {
        let messages = vec![
            Message::user("start"),
            Message::assistant_with_tool_calls(
                "",
                vec![ToolCallRecord::new("call_x", "dom_click", json!("{\"bid\":\"12\"}"))],
            ),
            Message::tool_result("call_x", "clicked"),
        ];
        let contents = GeminiProvider::to_contents(&messages);
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[1]["parts"][0]["functionCall"]["args"]["bid"], "12");
        assert_eq!(
            contents[2]["parts"][0],
            json!({"functionResponse": {"name": "dom_click", "response": {"result": "clicked"}}})
        );
    }

    #[test]
    fn same_role_contents_merge() {
        let messages = vec![
            Message::user("a"),
            Message::assistant_with_tool_calls("", vec![ToolCallRecord::new("c1", "shell_execute", json!({}))]),
            Message::tool_result("c1", "done"),
            Message::user(vec![ContentPart::text("b"), ContentPart::image("QUJD", "image/png")]),
        ];
        let contents = GeminiProvider::to_contents(&messages);
        assert_eq!(contents.len(), 3);
        let parts = contents[2]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 3);
        assert!(parts[0].get("functionResponse").is_some());
        assert_eq!(parts[1], json!({"text": "b"}));
        assert_eq!(parts[2]["inlineData"]["mimeType"], "image/png");
    }

    #[test]
    fn interpret_generates_ids_and_keeps_raw_parts() {
        let raw = RawResponse::new(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"text": "thinking out loud", "thought": true},
                        {"text": "Typing now."},
                        {"functionCall": {"name": "dom_type", "args": {"bid": "7", "text": "hi"}}, "thoughtSignature": "abc"},
                        {"functionCall": {"name": "dom_press", "args": {"key": "Enter"}}}
                    ]
                }
            }],
            "usageMetadata": {
                "promptTokenCount": 300,
                "candidatesTokenCount": 40,
                "thoughtsTokenCount": 10,
                "cachedContentTokenCount": 128
            },
            "modelVersion": "gemini-2.5-flash"
        }));
        let interp = provider().interpret(raw).unwrap();

        let Reply::ToolCalls(calls) = &interp.reply else {
            panic!("expected tool calls");
        };
        assert_eq!(calls.len(), 2);
        assert!(calls[0].id.starts_with("call_"));
        assert_ne!(calls[0].id, calls[1].id);
        assert_eq!(interp.reasoning.as_deref(), Some("Typing now."));

        let usage = interp.usage.unwrap();
        assert_eq!(usage.completion_tokens, 50);
        assert_eq!(usage.cached_tokens, 128);

        let replay = GeminiProvider::to_contents(&[interp.assistant]);
        assert_eq!(replay[0]["parts"][2]["thoughtSignature"], "abc");
    }

    #[test]
    fn interpret_without_candidates_is_invalid_response() {
        let err = provider().interpret(RawResponse::new(json!({"candidates": []}))).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));

        let err = provider()
            .interpret(RawResponse::new(json!({"candidates": [{"finishReason": "SAFETY"}]})))
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }
}
