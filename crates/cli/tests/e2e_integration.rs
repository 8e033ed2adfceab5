//! End-to-end integration tests for the BenchPilot controller.
//!
//! These tests exercise the full pipeline from caller prompt to normalized
//! action: content composition, the real provider wire formats against a
//! mock vendor, action parsing, the correction loop, and image pruning.

use std::sync::Arc;

use benchpilot_agent::Controller;
use benchpilot_config::ClientType;
use benchpilot_core::{ActionOutput, Error, ParseError, Role};
use benchpilot_providers::{AnthropicProvider, GeminiProvider, OpenAiCompatProvider, QwenProvider};
use benchpilot_telemetry::PricingTable;
use serde_json::{Value, json};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Vendor response bodies ───────────────────────────────────────────────

fn openai_tool_call(id: &str, name: &str, arguments: Value) -> Value {
    json!({
        "model": "gpt-4.1",
        "choices": [{
            "message": {
                "role": "assistant",
                "content": "Looking around first.",
                "tool_calls": [{
                    "id": id,
                    "type": "function",
                    "function": { "name": name, "arguments": arguments.to_string() }
                }]
            }
        }],
        "usage": { "prompt_tokens": 100, "completion_tokens": 20, "prompt_tokens_details": { "cached_tokens": 40 } }
    })
}

fn openai_text(content: &str) -> Value {
    json!({
        "model": "gpt-4.1",
        "choices": [{ "message": { "role": "assistant", "content": content } }],
        "usage": { "prompt_tokens": 150, "completion_tokens": 10 }
    })
}

fn anthropic_tool_use(id: &str, name: &str, input: Value) -> Value {
    json!({
        "model": "claude-sonnet-4-20250514",
        "content": [{ "type": "tool_use", "id": id, "name": name, "input": input }],
        "usage": { "input_tokens": 50, "output_tokens": 8 }
    })
}

fn gemini_text(text: &str) -> Value {
    json!({
        "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }],
        "usageMetadata": { "promptTokenCount": 30, "candidatesTokenCount": 6 }
    })
}

async fn request_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

// ── E2E: OpenAI-compatible multi-turn with screenshots ──────────────────

#[tokio::test]
async fn e2e_openai_tool_turn_then_completion() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_tool_call(
            "call_1",
            "shell_execute",
            json!({"command": "ls"}),
        )))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_text(
            "```json\n{\"action_type\": \"task_complete\", \"result\": \"file.txt\"}\n```",
        )))
        .mount(&server)
        .await;

    let provider = OpenAiCompatProvider::new("openai", format!("{}/v1", server.uri()), "EMPTY", "gpt-4.1");
    let mut ctl = Controller::new(Arc::new(provider), ClientType::Unified, PricingTable::with_defaults());

    let first = ctl.call("step one", vec!["SHOT1".to_string()]).await.unwrap();
    let ActionOutput::Single(action) = first else {
        panic!("expected a single action");
    };
    assert_eq!(action.action_type, "shell_execute");
    assert_eq!(action.tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(ctl.last_reasoning(), Some("Looking around first."));

    ctl.add_tool_message("call_1", "file.txt");
    let second = ctl.call("step two", vec!["SHOT2".to_string()]).await.unwrap();
    assert!(second.is_terminal());
    assert_eq!(second.actions()[0].param("result"), Some(&json!("file.txt")));

    let bodies = request_bodies(&server).await;
    assert_eq!(bodies.len(), 2);
    let replay = bodies[1]["messages"].as_array().unwrap();
    assert_eq!(replay[1]["tool_calls"][0]["id"], "call_1");
    assert_eq!(replay[2]["role"], "tool");
    assert_eq!(replay[2]["tool_call_id"], "call_1");
    assert_eq!(replay[3]["content"][0]["text"], "step two");
    assert_eq!(replay[3]["content"][1]["image_url"]["url"], "data:image/png;base64,SHOT2");

    // Only the latest user turn keeps its screenshot.
    let images: usize = ctl.history().iter().map(|m| m.content.image_count()).sum();
    assert_eq!(images, 1);

    let stats = ctl.cost_stats();
    assert_eq!(stats.api_calls, 2);
    assert_eq!(stats.total_input_tokens, 250);
    assert_eq!(stats.total_cached_tokens, 40);
    assert!(stats.total_cost_usd > 0.0);
}

// ── E2E: Anthropic correction after an unknown tool ─────────────────────

#[tokio::test]
async fn e2e_anthropic_unknown_tool_is_corrected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(anthropic_tool_use(
            "toolu_1",
            "teleport",
            json!({"where": "home"}),
        )))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(anthropic_tool_use(
            "toolu_2",
            "browser_navigate",
            json!({"url": "https://example.com"}),
        )))
        .mount(&server)
        .await;

    let provider = AnthropicProvider::new("sk-ant", "claude-sonnet-4-20250514").with_base_url(server.uri());
    let mut ctl = Controller::new(Arc::new(provider), ClientType::Browser, PricingTable::with_defaults())
        .with_max_attempts(2);

    let out = ctl.call("Open example.com", None::<String>).await.unwrap();
    assert_eq!(out.actions()[0].action_type, "browser_navigate");
    assert_eq!(out.actions()[0].tool_call_id.as_deref(), Some("toolu_2"));

    // The ack and the correction travel together in one user turn.
    let bodies = request_bodies(&server).await;
    let retry_messages = bodies[1]["messages"].as_array().unwrap();
    assert_eq!(retry_messages.len(), 3);
    let followup = &retry_messages[2];
    assert_eq!(followup["role"], "user");
    assert_eq!(followup["content"][0]["type"], "tool_result");
    assert_eq!(followup["content"][0]["tool_use_id"], "toolu_1");
    assert_eq!(followup["content"][1]["type"], "text");
    assert!(
        followup["content"][1]["text"]
            .as_str()
            .unwrap()
            .starts_with("Error parsing tool calls: Unknown tool: teleport")
    );
}

// ── E2E: Gemini free text that never parses ─────────────────────────────

#[tokio::test]
async fn e2e_gemini_malformed_text_exhausts_attempts() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path_regex(r"/v1beta/models/.*:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_text("I would click the blue button.")))
        .mount(&server)
        .await;

    let provider = GeminiProvider::new("g-key", "gemini-2.5-flash").with_base_url(server.uri());
    let mut ctl = Controller::new(Arc::new(provider), ClientType::None, PricingTable::with_defaults())
        .with_max_attempts(3);

    let err = ctl.call("What next?", None::<String>).await.unwrap_err();
    assert!(matches!(err, Error::Parse(ParseError::InvalidJson(_))));

    let bodies = request_bodies(&server).await;
    assert_eq!(bodies.len(), 3);
    assert!(bodies[0].get("tools").is_none());
    assert_eq!(ctl.cost_stats().api_calls, 3);

    // Costs survive a cleared conversation.
    ctl.clear_history();
    assert!(ctl.history().is_empty());
    assert_eq!(ctl.cost_stats().total_input_tokens, 90);
}

// ── E2E: Qwen-VL tagged tool call with a raw newline ────────────────────

#[tokio::test]
async fn e2e_qwen_vl_repairs_tagged_call() {
    let server = MockServer::start().await;

    let content = "<think>\nThe user wants two lines.\n</think>\nPrinting.\n<tool_call>\n\
                   {\"name\": \"shell_execute\", \"arguments\": {\"command\": \"printf 'a\nb'\"}}\n</tool_call>";
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_text(content)))
        .mount(&server)
        .await;

    let provider = QwenProvider::new(format!("{}/v1", server.uri()), "EMPTY", "Qwen3-VL-32B-Instruct");
    let mut ctl = Controller::new(Arc::new(provider), ClientType::Shell, PricingTable::with_defaults());

    let instructions = ctl.tool_instructions().unwrap();
    assert!(instructions.contains("- shell_execute:"));

    let out = ctl
        .call(&format!("{instructions}\n\nPrint two lines"), vec!["SHOT".to_string()])
        .await
        .unwrap();
    let action = &out.actions()[0];
    assert_eq!(action.action_type, "shell_execute");
    assert_eq!(action.param("command"), Some(&json!("printf 'a\nb'")));
    assert!(action.tool_call_id.as_deref().unwrap().starts_with("call_"));

    let bodies = request_bodies(&server).await;
    assert!(bodies[0].get("tools").is_none());
    // Images first for the VL family.
    assert_eq!(bodies[0]["messages"][0]["content"][0]["type"], "image_url");

    // The tagged call is kept as a structured call so tool results can refer to it.
    let assistant = &ctl.history()[1];
    assert_eq!(assistant.role, Role::Assistant);
    assert_eq!(assistant.tool_calls.len(), 1);
    assert_eq!(Some(assistant.tool_calls[0].id.as_str()), action.tool_call_id.as_deref());
    assert_eq!(assistant.content.text(), "Printing.");
}

fn tagged_call(name: &str, arguments: Value) -> Value {
    openai_text(&format!(
        "<tool_call>\n{}\n</tool_call>",
        json!({"name": name, "arguments": arguments})
    ))
}

/// Every `tool` message on the wire answers an id from an earlier assistant turn.
fn assert_tool_ids_linked(messages: &[Value]) {
    let mut announced: Vec<&str> = Vec::new();
    for message in messages {
        if let Some(calls) = message["tool_calls"].as_array() {
            announced.extend(calls.iter().filter_map(|c| c["id"].as_str()));
        }
        if message["role"] == "tool" {
            let id = message["tool_call_id"].as_str().unwrap();
            assert!(announced.contains(&id), "tool result {id} answers no announced call");
        }
    }
}

// ── E2E: Qwen-VL tool results stay linked to tagged calls ───────────────

#[tokio::test]
async fn e2e_qwen_vl_tool_results_reference_tagged_calls() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tagged_call("teleport", json!({"to": "mars"}))))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tagged_call("shell_execute", json!({"command": "ls"}))))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_text("{\"action_type\": \"task_complete\"}")))
        .mount(&server)
        .await;

    let provider = QwenProvider::new(format!("{}/v1", server.uri()), "EMPTY", "Qwen3-VL-8B-Instruct");
    let mut ctl = Controller::new(Arc::new(provider), ClientType::Shell, PricingTable::with_defaults());

    let first = ctl.call("List the files", None::<String>).await.unwrap();
    let id = first.actions()[0].tool_call_id.clone().unwrap();
    ctl.add_tool_message(&id, "a.txt");

    let done = ctl.call("Continue", None::<String>).await.unwrap();
    assert!(done.is_terminal());

    let bodies = request_bodies(&server).await;
    assert_eq!(bodies.len(), 3);
    let replay = bodies[2]["messages"].as_array().unwrap();
    assert_eq!(replay.iter().filter(|m| m["role"] == "tool").count(), 2);
    assert_tool_ids_linked(replay);
}
