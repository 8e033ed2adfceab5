//! Bounded correction loop state and the corrective prompts it injects.
//!
//! The controller drives an explicit loop instead of recursing: each vendor
//! call enters `AwaitingResponse` and bumps the attempt counter; a parse
//! failure either re-enters (after a correction turn) or terminates.

use benchpilot_core::ParseError;

/// Correction appended after an unparseable free-text reply.
pub const TEXT_CORRECTION: &str = "Your previous response did not follow the required format. \
Always respond with either (a) a tool call, or (b) a JSON object describing the next action following this schema:\n\
{\n  \"action_type\": \"<one of: browser_*, file_*, code_execute, shell_execute, task_complete>\",\n  \"param_name\": \"param_value\", ...\n}\n\
Do not nest parameters in a 'parameters' field. Put all parameters at the top level.\n\
Do not include natural language outside the JSON object.";

/// Content of the tool result acknowledging a call that could not be parsed.
pub fn tool_call_ack(error: &ParseError) -> String {
    format!("Error parsing tool call: {error}")
}

/// Correction appended after a tool-call batch failed to normalize.
pub fn tool_correction(error: &ParseError) -> String {
    format!(
        "Error parsing tool calls: {error}\n\
         Please check the tool parameters and try again. \
         Make sure you only use the parameters documented for each tool."
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPhase {
    AwaitingResponse,
    Terminal,
}

/// Attempt counter for one controller turn.
#[derive(Debug, Clone)]
pub struct RetryState {
    attempt: u32,
    max_attempts: u32,
    phase: RetryPhase,
}

/// What to do after a parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// Append a correction and call the vendor again
    Retry,
    /// Attempts exhausted
    GiveUp,
}

impl RetryState {
    /// `max_attempts` is clamped to at least one.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempt: 0,
            max_attempts: max_attempts.max(1),
            phase: RetryPhase::AwaitingResponse,
        }
    }

    /// Enter `AwaitingResponse` for one more vendor call.
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempt += 1;
        self.phase = RetryPhase::AwaitingResponse;
        self.attempt
    }

    /// Record a parse failure on the current attempt.
    pub fn on_failure(&mut self) -> Next {
        if self.attempt < self.max_attempts {
            Next::Retry
        } else {
            self.phase = RetryPhase::Terminal;
            Next::GiveUp
        }
    }

    /// Record a successful parse.
    pub fn on_success(&mut self) {
        self.phase = RetryPhase::Terminal;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn phase(&self) -> RetryPhase {
        self.phase
    }
}
