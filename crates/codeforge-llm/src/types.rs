//! Core request/response types: `Message`, `LlmInvocation`, `LlmResult`,
//! and the `LlmBackend` trait every provider implements behind a
//! single `send` call.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message { role: Role::User, content: content.into() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

#[derive(Debug, Clone)]
pub struct LlmInvocation {
    pub system: Option<String>,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub timeout: Duration,
}

impl LlmInvocation {
    pub fn new(prompt: impl Into<String>) -> Self {
        LlmInvocation {
            system: None,
            prompt: prompt.into(),
            temperature: 0.2,
            max_tokens: None,
            timeout: Duration::from_secs(300),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone)]
pub struct LlmResult {
    pub text: String,
    pub usage: Usage,
}

/// `send(prompt, system_context?, temperature=0.2, max_tokens?) →
/// {text, usage}`.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn send(&self, invocation: LlmInvocation) -> Result<LlmResult, LlmError>;
}
