//! Shared test helpers for controller tests.

use benchpilot_core::content::ImageOrder;
use benchpilot_core::error::ProviderError;
use benchpilot_core::message::{Message, ToolCallRecord};
use benchpilot_core::provider::{Interpretation, Provider, RawResponse, Reply, ToolDefinition, Usage};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Mutex;

/// One scripted vendor outcome.
pub enum Scripted {
    Reply(Interpretation),
    Fail(ProviderError),
}

/// A mock provider that returns a sequence of scripted responses.
///
/// Each `issue_call` records what it was sent and returns the next outcome.
/// Panics if more calls are made than responses provided.
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<Scripted>>,
    pending: Mutex<Option<Interpretation>>,
    sent: Mutex<Vec<(Vec<Message>, usize)>>,
    order: ImageOrder,
    text_tools: bool,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<Scripted>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            pending: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            order: ImageOrder::TextFirst,
            text_tools: false,
        }
    }

    pub fn replies(replies: Vec<Interpretation>) -> Self {
        Self::new(replies.into_iter().map(Scripted::Reply).collect())
    }

    pub fn with_image_order(mut self, order: ImageOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_text_tools(mut self) -> Self {
        self.text_tools = true;
        self
    }

    pub fn call_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// Messages sent on call `n` (zero-based).
    pub fn sent_messages(&self, n: usize) -> Vec<Message> {
        self.sent.lock().unwrap()[n].0.clone()
    }

    /// Number of tool schemas sent on call `n`.
    pub fn sent_tool_count(&self, n: usize) -> usize {
        self.sent.lock().unwrap()[n].1
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    fn image_order(&self) -> ImageOrder {
        self.order
    }

    fn uses_text_tool_calls(&self) -> bool {
        self.text_tools
    }

    async fn issue_call(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<RawResponse, ProviderError> {
        let call = {
            let mut sent = self.sent.lock().unwrap();
            sent.push((messages.to_vec(), tools.len()));
            sent.len()
        };
        let next = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("ScriptedProvider: no more responses (call #{call})"));

        match next {
            Scripted::Reply(interp) => {
                *self.pending.lock().unwrap() = Some(interp);
                Ok(RawResponse::new(Value::Null))
            }
            Scripted::Fail(err) => Err(err),
        }
    }

    fn interpret(&self, _raw: RawResponse) -> Result<Interpretation, ProviderError> {
        self.pending
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| ProviderError::InvalidResponse("nothing pending".into()))
    }
}

pub fn usage(prompt: u64, completion: u64) -> Option<Usage> {
    Some(Usage {
        prompt_tokens: prompt,
        completion_tokens: completion,
        cached_tokens: 0,
    })
}

/// A free-text reply.
pub fn text_reply(text: &str) -> Interpretation {
    Interpretation {
        assistant: Message::assistant(text),
        reply: Reply::Text(text.to_string()),
        usage: usage(10, 5),
        reasoning: Some(text.to_string()),
        model: "mock-model".into(),
    }
}

/// A structured tool-call reply.
pub fn tool_reply(calls: Vec<ToolCallRecord>, thought: &str) -> Interpretation {
    Interpretation {
        assistant: Message::assistant_with_tool_calls(thought, calls.clone()),
        reply: Reply::ToolCalls(calls),
        usage: usage(10, 5),
        reasoning: (!thought.is_empty()).then(|| thought.to_string()),
        model: "mock-model".into(),
    }
}

/// Helper to create a tool call with string-encoded arguments.
pub fn make_tool_call(id: &str, name: &str, args: Value) -> ToolCallRecord {
    ToolCallRecord::new(id, name, json!(args.to_string()))
}
