//! Google-Gemini-style provider normalization: `contents`/
//! `generationConfig` body, API key in the query string, response text
//! nested under `candidates[0].content.parts[0].text`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::http_client::HttpClient;
use crate::types::{LlmBackend, LlmInvocation, LlmResult, Usage};

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: Option<u32>,
}

#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Deserialize, Default)]
struct UsageMetadata {
    #[serde(default, rename = "promptTokenCount")]
    prompt_token_count: u64,
    #[serde(default, rename = "candidatesTokenCount")]
    candidates_token_count: u64,
    #[serde(default, rename = "totalTokenCount")]
    total_token_count: u64,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Vec<GeminiCandidate>,
    #[serde(default, rename = "usageMetadata")]
    usage_metadata: UsageMetadata,
}

pub struct GeminiBackend {
    http: HttpClient,
    endpoint: String,
    api_key: String,
}

impl GeminiBackend {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        GeminiBackend {
            http: HttpClient::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    pub fn with_retry_policy(mut self, max_retries: u32, initial_backoff: std::time::Duration) -> Self {
        self.http = self.http.with_retry_policy(max_retries, initial_backoff);
        self
    }
}

#[async_trait]
impl LlmBackend for GeminiBackend {
    async fn send(&self, invocation: LlmInvocation) -> Result<LlmResult, LlmError> {
        let combined = match &invocation.system {
            Some(system) => format!("{system}\n\n{}", invocation.prompt),
            None => invocation.prompt.clone(),
        };

        let body = GeminiRequest {
            contents: vec![Content { parts: vec![Part { text: &combined }] }],
            generation_config: GenerationConfig {
                temperature: invocation.temperature,
                max_output_tokens: invocation.max_tokens,
            },
        };

        let response = self
            .http
            .execute_with_retry("gemini", invocation.timeout, || {
                self.http
                    .client()
                    .post(&self.endpoint)
                    .query(&[("key", self.api_key.as_str())])
                    .json(&body)
            })
            .await?;

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::UnexpectedResponse(e.to_string()))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| LlmError::UnexpectedResponse("no candidates in response".to_string()))?;

        Ok(LlmResult {
            text,
            usage: Usage {
                prompt_tokens: parsed.usage_metadata.prompt_token_count,
                completion_tokens: parsed.usage_metadata.candidates_token_count,
                total_tokens: parsed.usage_metadata.total_token_count,
            },
        })
    }
}
