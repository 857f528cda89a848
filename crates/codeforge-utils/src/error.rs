//! Error taxonomy for codeforge, matching the seven kinds the pipeline
//! distinguishes: config, transport, parse, execution-timeout,
//! validation, and cancellation errors.

use thiserror::Error;

/// Error surfaced by a single pipeline stage or shared service.
///
/// `TransportError` subsumes rate-limit exhaustion (spec treats a 429
/// that survives every retry as a `TransportError`, not its own kind).
#[derive(Debug, Error)]
pub enum CodeforgeError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("transport error talking to {provider}: {message}")]
    Transport { provider: String, message: String },

    #[error("rate limit exhausted after {attempts} attempts")]
    RateLimitExhausted { attempts: u32 },

    #[error("could not parse LLM output into {artifact}: {reason}")]
    Parse { artifact: String, reason: String },

    #[error("execution timed out after {timeout_s}s")]
    ExecutionTimeout { timeout_s: u64 },

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("run cancelled")]
    Cancellation,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CodeforgeError {
    pub fn kind(&self) -> &'static str {
        match self {
            CodeforgeError::Config(_) => "ConfigError",
            CodeforgeError::Transport { .. } => "TransportError",
            CodeforgeError::RateLimitExhausted { .. } => "RateLimitExhausted",
            CodeforgeError::Parse { .. } => "ParseError",
            CodeforgeError::ExecutionTimeout { .. } => "ExecutionTimeout",
            CodeforgeError::Validation(_) => "ValidationError",
            CodeforgeError::Cancellation => "CancellationError",
            CodeforgeError::Io(_) => "IoError",
        }
    }
}

/// Presentation-layer trait; keeps CLI-facing wording out of the library
/// crates' control-flow paths.
pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestions(&self) -> Vec<String> {
        Vec::new()
    }
}

impl UserFriendlyError for CodeforgeError {
    fn user_message(&self) -> String {
        match self {
            CodeforgeError::Config(msg) => format!("Configuration problem: {msg}"),
            CodeforgeError::Transport { provider, message } => {
                format!("Could not reach the LLM provider ({provider}): {message}")
            }
            CodeforgeError::RateLimitExhausted { attempts } => format!(
                "The LLM provider kept rate-limiting requests through all {attempts} attempts"
            ),
            CodeforgeError::Parse { artifact, .. } => {
                format!("Could not make sense of the model's {artifact} response")
            }
            CodeforgeError::ExecutionTimeout { timeout_s } => {
                format!("Execution did not finish within {timeout_s}s")
            }
            CodeforgeError::Validation(msg) => format!("Invalid input: {msg}"),
            CodeforgeError::Cancellation => "The run was cancelled".to_string(),
            CodeforgeError::Io(e) => format!("I/O error: {e}"),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            CodeforgeError::Config(_) => vec![
                "Check that MCP_API_KEY and MCP_ENDPOINT are set".to_string(),
            ],
            CodeforgeError::RateLimitExhausted { .. } => {
                vec!["Increase MAX_RETRIES or space out requests".to_string()]
            }
            _ => Vec::new(),
        }
    }
}
