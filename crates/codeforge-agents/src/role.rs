//! `Role` capability interface: `{kind; invoke(prompt) → response}` plus
//! role-specific prompt composers. Each agent's public operation
//! (`create_architecture`, `generate`, ...) is the role-specific part;
//! `invoke` is the shared part every role delegates its single LLM call
//! and usage-tracking through, so the in-process Orchestrator and any
//! future stdio transport can share one interface.

use async_trait::async_trait;
use codeforge_artifact::AgentKind;
use codeforge_llm::{LlmError, LlmInvocation, LlmResult};

#[async_trait]
pub trait Role: Send + Sync {
    fn kind(&self) -> AgentKind;

    async fn invoke(&self, invocation: LlmInvocation) -> Result<LlmResult, LlmError>;
}
