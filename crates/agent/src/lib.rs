//! The controller, the heart of BenchPilot.
//!
//! The controller follows a **Call → Interpret → Normalize** cycle:
//!
//! 1. **Compose** the caller's prompt and screenshots into a user turn
//! 2. **Send** the whole log to the configured provider
//! 3. **Interpret** the reply as structured tool calls or free text
//! 4. **Normalize** it into [`Action`](benchpilot_core::Action)s
//! 5. **Correct**: on unparseable output, append a correction and go back to 2
//!
//! The loop ends with an action, an `error` action once a tool-call turn
//! exhausts its attempts, or a parse error once a free-text turn does.

pub mod controller;
pub mod parser;
pub mod retry;

pub use controller::{Controller, pricing_table};
pub use parser::{parse_text, parse_tool_calls};
pub use retry::{RetryPhase, RetryState};

#[cfg(test)]
pub(crate) mod test_helpers;
