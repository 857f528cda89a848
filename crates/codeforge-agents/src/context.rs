//! Shared plumbing every role needs: dispatch one LLM call and record
//! its usage. Kept separate from `Role` itself so each agent struct can
//! compose it rather than re-implement the same tracking boilerplate.

use std::sync::Arc;

use async_trait::async_trait;
use codeforge_artifact::AgentKind;
use codeforge_llm::{LlmBackend, LlmError, LlmInvocation, LlmResult};
use codeforge_usage::{TokensInput, UsageTracker};

/// Hook the Orchestrator injects so the global rate limit applies to
/// every LLM call uniformly, including the ones the Debugger issues
/// from inside its own retry loop without the Orchestrator mediating
/// each iteration. `Err` signals cancellation fired while waiting.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pace(&self) -> Result<(), ()>;
}

pub struct AgentContext {
    pub backend: Arc<dyn LlmBackend>,
    pub usage: Arc<UsageTracker>,
    pub pacer: Option<Arc<dyn Pacer>>,
}

impl AgentContext {
    pub fn new(backend: Arc<dyn LlmBackend>, usage: Arc<UsageTracker>) -> Self {
        AgentContext { backend, usage, pacer: None }
    }

    pub fn with_pacer(mut self, pacer: Arc<dyn Pacer>) -> Self {
        self.pacer = Some(pacer);
        self
    }

    pub async fn invoke_and_track(
        &self,
        kind: AgentKind,
        invocation: LlmInvocation,
        iteration: Option<u32>,
    ) -> Result<LlmResult, LlmError> {
        if let Some(pacer) = &self.pacer {
            pacer.pace().await.map_err(|_| LlmError::Cancelled)?;
        }
        let result = self.backend.send(invocation).await?;
        if let Err(e) = self.usage.track(
            kind,
            TokensInput::Count(result.usage.total_tokens),
            iteration,
            None,
        ) {
            tracing::warn!(error = %e, "failed to persist usage entry");
        }
        Ok(result)
    }
}
