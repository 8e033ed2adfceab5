//! Error types for the BenchPilot domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; the controller only ever
//! recovers from [`ParseError`]. Everything else propagates.

use thiserror::Error;

/// The top-level error type for all BenchPilot operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider (transport) errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Model output errors ---
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures talking to a vendor endpoint. Never retried by the controller.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The endpoint answered 200 but the envelope is unusable
    /// (no choices, no candidates, undecodable body).
    #[error("Invalid response envelope: {0}")]
    InvalidResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Malformed or unusable model output.
///
/// This is the only error class the retry/correction loop recovers from.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Invalid JSON in LLM response: {0}")]
    InvalidJson(String),

    #[error("Response is not an action object: {0}")]
    NotAnAction(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool call has an empty name")]
    EmptyToolName,

    #[error("No tool calls found in response")]
    NoToolCalls,
}
