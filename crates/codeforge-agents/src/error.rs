use thiserror::Error;

/// Unifies the two failure sources a role that touches the sandbox can
/// hit: the LLM call itself, and writing/running the project it just
/// generated.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Llm(#[from] codeforge_llm::LlmError),

    #[error(transparent)]
    Sandbox(#[from] codeforge_sandbox::SandboxError),
}
