//! The controller: one task attempt's conversation with one vendor.
//!
//! A turn runs **compose → append → call → interpret → parse → prune**:
//!
//! 1. The prompt and screenshots become a user turn in the provider's part order
//! 2. The whole log is replayed to the vendor (plus tool schemas in tool mode)
//! 3. The provider classifies the reply and shapes the assistant turn
//! 4. The action parser normalizes tool calls or free text into actions
//! 5. On success, images are pruned from every user turn but the latest
//!
//! Parse failures re-enter step 2 after a correction turn, up to the
//! configured attempt bound. Transport failures propagate immediately.

use crate::parser;
use crate::retry::{self, Next, RetryState};
use benchpilot_config::{AppConfig, ClientType, ConfigError};
use benchpilot_core::content::Images;
use benchpilot_core::{
    Action, ActionOutput, Interpretation, Message, MessageLog, Provider, Reply, Result, ToolCallRecord,
    ToolDefinition,
};
use benchpilot_telemetry::{CostMeter, CostStats, ModelPricing, PricingTable};
use benchpilot_tools::{TOOL_CALL_FORMAT, ToolCatalog};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Drives one vendor through a multi-step task, one action per call.
pub struct Controller {
    /// The vendor protocol family, fixed at construction
    provider: Arc<dyn Provider>,

    /// Declared sandbox capability; `None` disables tool mode
    client_type: ClientType,

    /// Tools advertised in tool mode
    tools: ToolCatalog,

    /// Vendor calls allowed per turn
    max_attempts: u32,

    log: MessageLog,

    meter: CostMeter,

    last_reasoning: Option<String>,
}

impl Controller {
    pub fn new(provider: Arc<dyn Provider>, client_type: ClientType, pricing: PricingTable) -> Self {
        let meter = CostMeter::new(pricing, provider.model());
        Self {
            provider,
            client_type,
            tools: ToolCatalog::for_client(client_type),
            max_attempts: 2,
            log: MessageLog::new(),
            meter,
            last_reasoning: None,
        }
    }

    /// Build the provider, catalog, and pricing table from configuration.
    ///
    /// Missing credentials surface here, never at call time.
    pub fn from_config(config: &AppConfig) -> std::result::Result<Self, ConfigError> {
        let provider = benchpilot_providers::build_provider(config)?;
        let pricing = pricing_table(config);

        info!(
            provider = %provider.name(),
            model = %provider.model(),
            client_type = %config.controller.client_type.as_str(),
            max_attempts = config.controller.max_attempts(),
            "Controller initialized"
        );

        Ok(Self::new(provider, config.controller.client_type, pricing)
            .with_max_attempts(config.controller.max_attempts()))
    }

    /// Set the per-turn attempt bound (clamped to at least one).
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Replace the advertised tool catalog.
    pub fn with_tools(mut self, tools: ToolCatalog) -> Self {
        self.tools = tools;
        self
    }

    /// Run one turn: send the prompt (plus screenshots) and return the next action.
    ///
    /// An exhausted tool-call turn yields an `error` action whose call ids
    /// are already acknowledged in the log. An exhausted free-text turn
    /// returns the parse error.
    pub async fn call(&mut self, prompt: &str, images: impl Into<Images>) -> Result<ActionOutput> {
        let content = self.provider.prepare_content(prompt, images.into());
        self.log.append(Message::user(content));

        let mut state = RetryState::new(self.max_attempts);
        loop {
            let attempt = state.begin_attempt();
            debug!(
                provider = %self.provider.name(),
                attempt,
                max_attempts = state.max_attempts(),
                messages = self.log.len(),
                "Issuing vendor call"
            );

            let raw = self.provider.issue_call(self.log.snapshot(), self.tool_schemas()).await?;
            let interp = self.provider.interpret(raw)?;
            let reply = self.absorb(interp);

            let outcome = match &reply {
                Reply::ToolCalls(calls) => parser::parse_tool_calls(calls),
                Reply::Text(text) => parser::parse_text(text),
            };

            let err = match outcome {
                Ok(output) => {
                    state.on_success();
                    let pruned = self.log.retain_latest_images();
                    if pruned > 0 {
                        debug!(pruned, "Pruned images from earlier turns");
                    }
                    return Ok(output);
                }
                Err(err) => err,
            };

            warn!(
                provider = %self.provider.name(),
                attempt,
                max_attempts = state.max_attempts(),
                "Failed to parse model output: {err}"
            );

            match reply {
                Reply::ToolCalls(calls) => {
                    // Every pending id must be answered before the next call.
                    let ack = retry::tool_call_ack(&err);
                    for call in &calls {
                        self.log.append(Message::tool_result(&call.id, ack.clone()));
                    }
                    match state.on_failure() {
                        Next::GiveUp => {
                            warn!(attempts = state.attempt(), "Tool call parsing exhausted, returning error action");
                            return Ok(Action::error(err.to_string(), raw_tool_calls(&calls)).into());
                        }
                        Next::Retry => self.log.append(Message::user(retry::tool_correction(&err))),
                    }
                }
                Reply::Text(_) => match state.on_failure() {
                    Next::GiveUp => return Err(err.into()),
                    Next::Retry => self.log.append(Message::user(retry::TEXT_CORRECTION)),
                },
            }
        }
    }

    /// Append the assistant turn, meter the call, and keep the reasoning.
    fn absorb(&mut self, interp: Interpretation) -> Reply {
        let Interpretation {
            assistant,
            reply,
            usage,
            reasoning,
            model,
        } = interp;

        let usage = usage.unwrap_or_default();
        self.meter
            .record(usage.prompt_tokens, usage.completion_tokens, usage.cached_tokens, &model);

        if reasoning.is_some() {
            self.last_reasoning = reasoning;
        }
        self.log.append(assistant);
        reply
    }

    fn tool_schemas(&self) -> &[ToolDefinition] {
        if self.client_type.uses_tools() {
            self.tools.definitions()
        } else {
            &[]
        }
    }

    /// Resolve a pending tool call. Ignored when the id is empty.
    pub fn add_tool_message(&mut self, tool_call_id: &str, content: impl Into<String>) {
        if tool_call_id.is_empty() {
            return;
        }
        self.log.append(Message::tool_result(tool_call_id, content));
    }

    /// Empty the log. Cost counters are untouched.
    pub fn clear_history(&mut self) {
        debug!(removed = self.log.len(), "Clearing message history");
        self.log.clear();
    }

    pub fn cost_stats(&self) -> CostStats {
        self.meter.stats()
    }

    /// Zero the cost counters and forget the last reasoning.
    pub fn reset_cost_tracking(&mut self) {
        self.meter.reset();
        self.last_reasoning = None;
    }

    /// Reasoning the model gave alongside its most recent action.
    pub fn last_reasoning(&self) -> Option<&str> {
        self.last_reasoning.as_deref()
    }

    pub fn history(&self) -> &[Message] {
        self.log.snapshot()
    }

    /// Prompt text describing the tools, for providers that take tool calls
    /// as tagged text. `None` when the provider has native tool calling or
    /// tool mode is off.
    pub fn tool_instructions(&self) -> Option<String> {
        if !self.provider.uses_text_tool_calls() || !self.client_type.uses_tools() {
            return None;
        }
        Some(format!(
            "# Tools\n\nYou may call one or more tools to assist with the task.\n\n{}\n\n\
             For each tool call, return a JSON object with the function name and arguments \
             within <tool_call></tool_call> tags:\n{TOOL_CALL_FORMAT}",
            self.tools.to_text()
        ))
    }

    pub fn provider(&self) -> &dyn Provider {
        self.provider.as_ref()
    }

    pub fn client_type(&self) -> ClientType {
        self.client_type
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

/// Built-in prices with the configured overrides layered on top.
pub fn pricing_table(config: &AppConfig) -> PricingTable {
    PricingTable::with_overrides(
        config.pricing.version.clone(),
        config
            .pricing
            .models
            .iter()
            .map(|(model, p)| (model.clone(), ModelPricing::new(p.input, p.cached_input, p.output))),
    )
}

fn raw_tool_calls(calls: &[ToolCallRecord]) -> serde_json::Value {
    serde_json::to_value(calls).unwrap_or_default()
}
