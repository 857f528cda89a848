use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("transport error talking to {provider}: {message}")]
    Transport { provider: String, message: String },

    #[error("request timed out after {timeout_s}s")]
    Timeout { timeout_s: u64 },

    #[error("rate limit exhausted after {attempts} attempts")]
    RateLimitExhausted { attempts: u32 },

    #[error("provider rejected credentials: {0}")]
    ProviderAuth(String),

    #[error("provider returned an unexpected response shape: {0}")]
    UnexpectedResponse(String),

    #[error("misconfiguration: {0}")]
    Misconfiguration(String),

    #[error("request cancelled before it was sent")]
    Cancelled,
}
