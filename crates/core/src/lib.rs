//! # BenchPilot Core
//!
//! Domain types, traits, and error definitions for the BenchPilot
//! action-normalization layer. Every other crate depends inward on this one.
//!
//! ## Pieces
//!
//! - [`Action`] / [`ActionOutput`]: the vendor-neutral "next action"
//! - [`Message`] and [`MessageLog`]: the history replayed on every turn,
//!   including the image retention pass
//! - [`content`]: per-vendor ordering of text and image parts
//! - [`Provider`]: the seam each vendor protocol family implements
//! - [`json_repair`]: deterministic fixes for almost-JSON model output

pub mod action;
pub mod content;
pub mod error;
pub mod json_repair;
pub mod log;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use action::{Action, ActionOutput};
pub use content::{ImageOrder, Images};
pub use error::{Error, ParseError, ProviderError, Result};
pub use log::MessageLog;
pub use message::{Content, ContentPart, Message, Role, ToolCallRecord};
pub use provider::{Interpretation, Provider, RawResponse, Reply, ToolDefinition, Usage};
