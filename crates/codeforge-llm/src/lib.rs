use std::time::Duration;

pub mod error;
pub mod gemini_backend;
pub mod http_client;
pub mod openai_backend;
pub mod types;

pub use error::LlmError;
pub use gemini_backend::GeminiBackend;
pub use http_client::{HttpClient, DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_RETRIES};
pub use openai_backend::OpenAiBackend;
pub use types::{LlmBackend, LlmInvocation, LlmResult, Message, Role, Usage};

/// Detects provider shape by endpoint substring and constructs the
/// matching backend, applying `max_retries`/`initial_backoff` to its
/// underlying `HttpClient`.
pub fn backend_for_endpoint(
    endpoint: &str,
    api_key: &str,
    model: &str,
    max_retries: u32,
    initial_backoff: Duration,
) -> Box<dyn LlmBackend> {
    if endpoint.contains("generativelanguage.googleapis.com") || endpoint.contains("gemini") {
        Box::new(GeminiBackend::new(endpoint, api_key).with_retry_policy(max_retries, initial_backoff))
    } else {
        Box::new(OpenAiBackend::new(endpoint, api_key, model).with_retry_policy(max_retries, initial_backoff))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gemini_substring_selects_gemini_backend() {
        let backend = backend_for_endpoint(
            "https://generativelanguage.googleapis.com/v1/models/gemini-pro:generateContent",
            "key",
            "gemini-pro",
            DEFAULT_MAX_RETRIES,
            DEFAULT_INITIAL_BACKOFF,
        );
        // can't downcast a trait object cheaply here; constructing
        // without panicking is the behavior under test.
        drop(backend);
    }

    #[test]
    fn other_endpoints_select_openai_style_backend() {
        let backend = backend_for_endpoint(
            "https://api.openai.com/v1/chat/completions",
            "key",
            "gpt-4",
            DEFAULT_MAX_RETRIES,
            DEFAULT_INITIAL_BACKOFF,
        );
        drop(backend);
    }
}
