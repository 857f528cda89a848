//! OpenAI-style provider normalization: chat-completions request/response
//! shape, bearer auth.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::http_client::HttpClient;
use crate::types::{LlmBackend, LlmInvocation, LlmResult, Usage};

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Deserialize, Default)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: ChatUsage,
}

pub struct OpenAiBackend {
    http: HttpClient,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiBackend {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        OpenAiBackend {
            http: HttpClient::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    pub fn with_retry_policy(mut self, max_retries: u32, initial_backoff: std::time::Duration) -> Self {
        self.http = self.http.with_retry_policy(max_retries, initial_backoff);
        self
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    async fn send(&self, invocation: LlmInvocation) -> Result<LlmResult, LlmError> {
        let mut messages = Vec::new();
        if let Some(system) = &invocation.system {
            messages.push(ChatMessage { role: "system", content: system });
        }
        messages.push(ChatMessage { role: "user", content: &invocation.prompt });

        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: invocation.temperature,
            max_tokens: invocation.max_tokens,
        };

        let response = self
            .http
            .execute_with_retry("openai", invocation.timeout, || {
                self.http
                    .client()
                    .post(&self.endpoint)
                    .bearer_auth(&self.api_key)
                    .json(&body)
            })
            .await?;

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::UnexpectedResponse(e.to_string()))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::UnexpectedResponse("no choices in response".to_string()))?;

        Ok(LlmResult {
            text,
            usage: Usage {
                prompt_tokens: parsed.usage.prompt_tokens,
                completion_tokens: parsed.usage.completion_tokens,
                total_tokens: parsed.usage.total_tokens,
            },
        })
    }
}
