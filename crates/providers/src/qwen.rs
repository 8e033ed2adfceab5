//! Qwen family served over an OpenAI-compatible endpoint.
//!
//! Qwen models may emit tool calls as text:
//!
//! ```text
//! <think>...</think>
//! I'll open the page first.
//! <tool_call>
//! {"name": "browser_navigate", "arguments": {"url": "https://example.com"}}
//! </tool_call>
//! ```
//!
//! The vision-language models (`qwen3-vl`) get no native tool schemas at all;
//! their tools are described in the prompt and every call comes back tagged.
//! Other Qwen models keep native tools but tagged calls are still honored.

use crate::openai_compat::{Completion, OpenAiCompatProvider};
use async_trait::async_trait;
use benchpilot_core::content::ImageOrder;
use benchpilot_core::error::ProviderError;
use benchpilot_core::json_repair::escape_control_chars;
use benchpilot_core::message::{Message, ToolCallRecord};
use benchpilot_core::provider::*;
use regex_lite::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::{debug, error};

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";
const CALL_OPEN: &str = "<tool_call>";
const CALL_CLOSE: &str = "</tool_call>";

/// How far past a loose match the closing tag may appear.
const CLOSE_TAG_WINDOW: usize = 50;

/// Complete `<tool_call>{...}</tool_call>` blocks.
static TAGGED_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<tool_call>\s*(\{.*?\})\s*</tool_call>").expect("Valid regex pattern")
});

/// A flat object naming a tool, directly before a closing tag.
static CLOSED_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)(\{[^{}]*"name"[^{}]*\})\s*</tool_call>"#).expect("Valid regex pattern")
});

/// A flat object with both `name` and `arguments`, anywhere.
static LOOSE_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)(\{[^{}]*"name"[^{}]*"arguments"[^{}]*\})"#).expect("Valid regex pattern")
});

/// Whether a model name selects the vision-language variant.
pub fn is_vision_model(model: &str) -> bool {
    let lower = model.to_lowercase();
    lower.contains("qwen3-vl") || lower.contains("qwen3_vl")
}

/// Drop a leading reasoning block.
///
/// Everything up to the last closing tag goes; an unclosed block drops
/// only the opening tag. Tag matching ignores case.
pub fn strip_think(text: &str) -> &str {
    let lower = text.to_ascii_lowercase();
    if !lower.contains(THINK_OPEN) {
        return text;
    }
    match lower.rfind(THINK_CLOSE) {
        Some(idx) => &text[idx + THINK_CLOSE.len()..],
        None => match lower.find(THINK_OPEN) {
            Some(idx) => &text[idx + THINK_OPEN.len()..],
            None => text,
        },
    }
}

fn has_call_tags(text: &str) -> bool {
    text.contains(CALL_OPEN) || text.contains(CALL_CLOSE)
}

/// Candidate JSON objects, tried from strictest to loosest pattern.
fn call_candidates(content: &str) -> Vec<&str> {
    let tagged: Vec<&str> = TAGGED_CALL
        .captures_iter(content)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    if !tagged.is_empty() {
        return tagged;
    }

    let closed: Vec<&str> = CLOSED_CALL
        .captures_iter(content)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    if !closed.is_empty() {
        return closed;
    }

    LOOSE_CALL
        .captures_iter(content)
        .filter_map(|c| c.get(1))
        .find(|m| {
            let window: String = content[m.end()..].chars().take(CLOSE_TAG_WINDOW).collect();
            window.contains(CALL_CLOSE)
        })
        .map(|m| vec![m.as_str()])
        .unwrap_or_default()
}

/// Extract tool calls embedded as tagged JSON.
///
/// Undecodable candidates are repaired once (control characters inside
/// strings), then skipped. Ids are generated locally.
pub fn extract_tool_calls(content: &str) -> Vec<ToolCallRecord> {
    call_candidates(content)
        .into_iter()
        .filter_map(|candidate| {
            let decoded = serde_json::from_str::<Value>(candidate)
                .or_else(|_| serde_json::from_str::<Value>(&escape_control_chars(candidate)));
            match decoded {
                Ok(value) => Some(value),
                Err(e) => {
                    error!(error = %e, "Failed to parse tagged tool call");
                    None
                }
            }
        })
        .map(|value| {
            let name = value.get("name").and_then(Value::as_str).unwrap_or_default();
            let arguments = value
                .get("arguments")
                .filter(|a| !a.is_null())
                .cloned()
                .unwrap_or_else(|| Value::Object(Default::default()));
            let id = format!("call_{}", uuid::Uuid::new_v4().simple());
            ToolCallRecord::new(id, name, Value::String(arguments.to_string()))
        })
        .collect()
}

/// Reduce a free-text reply to the part expected to hold a JSON action.
pub fn clean_text_reply(content: &str) -> String {
    let remainder = strip_think(content);
    if has_call_tags(remainder)
        && let Some(inner) = TAGGED_CALL.captures(remainder).and_then(|c| c.get(1))
    {
        return inner.as_str().to_string();
    }
    remainder.to_string()
}

pub struct QwenProvider {
    inner: OpenAiCompatProvider,
    vision: bool,
}

impl QwenProvider {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        let vision = is_vision_model(&model);
        Self {
            inner: OpenAiCompatProvider::new("qwen", base_url, api_key, model),
            vision,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.inner = self.inner.with_max_tokens(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.inner = self.inner.with_temperature(temperature);
        self
    }

    pub fn is_vision(&self) -> bool {
        self.vision
    }
}

#[async_trait]
impl benchpilot_core::Provider for QwenProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    fn image_order(&self) -> ImageOrder {
        if self.vision {
            ImageOrder::ImagesFirst
        } else {
            ImageOrder::TextFirst
        }
    }

    fn uses_text_tool_calls(&self) -> bool {
        self.vision
    }

    async fn issue_call(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> std::result::Result<RawResponse, ProviderError> {
        let tools: &[ToolDefinition] = if self.vision { &[] } else { tools };
        self.inner.post_completion(messages, tools).await
    }

    fn interpret(&self, raw: RawResponse) -> std::result::Result<Interpretation, ProviderError> {
        let completion = Completion::decode(raw.body)?;
        let model = completion.model.unwrap_or_else(|| self.model().to_string());
        let content = completion.content;

        if has_call_tags(&content) {
            let calls = extract_tool_calls(strip_think(&content));
            if !calls.is_empty() {
                debug!(provider = %self.name(), count = calls.len(), "Parsed tagged tool calls");
                let reasoning = match content.split_once(CALL_OPEN) {
                    Some((before, _)) => before.trim().to_string(),
                    None => content.clone(),
                };
                // The chat template renders structured calls back into tags, so the
                // stored text keeps only the prose. Tool results must find these ids.
                let prose = strip_think(&reasoning).trim().to_string();
                return Ok(Interpretation {
                    assistant: Message::assistant_with_tool_calls(prose, calls.clone()),
                    reply: Reply::ToolCalls(calls),
                    usage: completion.usage,
                    reasoning: (!reasoning.is_empty()).then_some(reasoning),
                    model,
                });
            }
        }

        let reasoning = (!content.is_empty()).then(|| content.clone());

        if !completion.tool_calls.is_empty() {
            return Ok(Interpretation {
                assistant: Message::assistant_with_tool_calls(content, completion.tool_calls.clone()),
                reply: Reply::ToolCalls(completion.tool_calls),
                usage: completion.usage,
                reasoning,
                model,
            });
        }

        Ok(Interpretation {
            reply: Reply::Text(clean_text_reply(&content)),
            assistant: Message::assistant(content),
            usage: completion.usage,
            reasoning,
            model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchpilot_core::Provider;
    use serde_json::json;

    fn completion(content: &str) -> RawResponse {
        RawResponse::new(json!({
            "model": "qwen3-vl-32b",
            "choices": [{ "message": { "role": "assistant", "content": content } }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 5 }
        }))
    }

    fn vl() -> QwenProvider {
        QwenProvider::new("http://localhost:8000/v1", "EMPTY", "Qwen/Qwen3-VL-32B-Instruct")
    }

    #[test]
    fn vision_detection() {
        assert!(is_vision_model("Qwen/Qwen3-VL-8B"));
        assert!(is_vision_model("qwen3_vl_local"));
        assert!(!is_vision_model("Qwen2.5-72B-Instruct"));

        let provider = vl();
        assert!(provider.is_vision());
        assert!(provider.uses_text_tool_calls());
        assert_eq!(provider.image_order(), ImageOrder::ImagesFirst);

        let text_only = QwenProvider::new("http://h/v1", "k", "Qwen3-32B");
        assert!(!text_only.uses_text_tool_calls());
        assert_eq!(text_only.image_order(), ImageOrder::TextFirst);
    }

    #[test]
    fn strip_think_variants() {
        assert_eq!(strip_think("<think>a</think>{\"x\":1}"), "{\"x\":1}");
        assert_eq!(strip_think("<THINK>a</Think>b</think>c"), "c");
        assert_eq!(strip_think("<think>unclosed {}"), "unclosed {}");
        assert_eq!(strip_think("plain"), "plain");
    }

    #[test]
    fn extracts_multiple_tagged_calls() {
        let content = "Let me act.\n<tool_call>\n{\"name\": \"dom_click\", \"arguments\": {\"bid\": \"4\"}}\n</tool_call>\n<tool_call>\n{\"name\": \"task_complete\", \"arguments\": {}}\n</tool_call>";
        let calls = extract_tool_calls(content);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "dom_click");
        assert_eq!(calls[0].arguments_object()["bid"], "4");
        assert_eq!(calls[1].name, "task_complete");
        assert_ne!(calls[0].id, calls[1].id);
    }

    #[test]
    fn truncated_opening_tag_falls_back_to_closed_pattern() {
        let content = "{\"name\": \"browser_press\", \"arguments\": \"enter\"} </tool_call>";
        let calls = extract_tool_calls(content);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "browser_press");
    }

    #[test]
    fn raw_newline_inside_string_is_repaired() {
        let content = "<tool_call>{\"name\": \"file_write\", \"arguments\": {\"path\": \"a.py\", \"content\": \"line1\nline2\"}}</tool_call>";
        let calls = extract_tool_calls(content);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].arguments_object()["content"], "line1\nline2");
    }

    #[test]
    fn undecodable_candidate_is_skipped() {
        assert!(extract_tool_calls("<tool_call>{\"name\": oops}</tool_call>").is_empty());
    }

    #[test]
    fn missing_arguments_become_empty_object() {
        let calls = extract_tool_calls("<tool_call>{\"name\": \"browser_screenshot\"}</tool_call>");
        assert_eq!(calls[0].arguments, json!("{}"));
    }

    #[test]
    fn interpret_tagged_calls_with_reasoning() {
        let raw = completion(
            "<think>hmm</think>Opening it.\n<tool_call>{\"name\": \"browser_navigate\", \"arguments\": {\"url\": \"https://x.y\"}}</tool_call>",
        );
        let interp = vl().interpret(raw).unwrap();
        let Reply::ToolCalls(calls) = &interp.reply else {
            panic!("expected tool calls");
        };
        assert_eq!(calls[0].name, "browser_navigate");
        assert_eq!(interp.reasoning.as_deref(), Some("<think>hmm</think>Opening it."));
        assert_eq!(interp.assistant.tool_calls, *calls);
        assert_eq!(interp.assistant.content.text(), "Opening it.");
    }

    #[test]
    fn tagged_call_ids_are_replayed_as_assistant_tool_calls() {
        let raw = completion(
            "<tool_call>{\"name\": \"shell_execute\", \"arguments\": {\"command\": \"ls\"}}</tool_call>",
        );
        let interp = vl().interpret(raw).unwrap();
        let Reply::ToolCalls(calls) = &interp.reply else {
            panic!("expected tool calls");
        };
        let history = vec![
            Message::user("go"),
            interp.assistant.clone(),
            Message::tool_result(&calls[0].id, "ok"),
        ];

        let wire = serde_json::to_value(OpenAiCompatProvider::to_api_messages(&history)).unwrap();
        assert_eq!(wire[1]["tool_calls"][0]["id"], calls[0].id.as_str());
        assert!(wire[1].get("content").is_none_or(Value::is_null));
        assert_eq!(wire[2]["role"], "tool");
        assert_eq!(wire[2]["tool_call_id"], calls[0].id.as_str());
    }

    #[test]
    fn interpret_text_reply_strips_think() {
        let interp = vl()
            .interpret(completion("<think>plan</think>\n{\"action_type\": \"task_complete\"}"))
            .unwrap();
        assert_eq!(interp.reply, Reply::Text("\n{\"action_type\": \"task_complete\"}".into()));
    }

    #[test]
    fn interpret_unparseable_tags_fall_back_to_text() {
        let interp = vl().interpret(completion("<tool_call>{broken}</tool_call>")).unwrap();
        assert_eq!(interp.reply, Reply::Text("{broken}".into()));
    }
}
