//! Maps the per-crate error types the pipeline stages raise onto
//! `CodeforgeError`'s kind taxonomy. Plain functions rather than `From`
//! impls: neither `CodeforgeError` nor `LlmError`/`SandboxError`/
//! `AgentError` is defined in this crate, so the orphan rule forbids
//! implementing the foreign trait for the foreign type here.

use codeforge_agents::AgentError;
use codeforge_llm::LlmError;
use codeforge_sandbox::SandboxError;
use codeforge_utils::CodeforgeError;

pub fn map_llm_error(err: LlmError) -> CodeforgeError {
    match err {
        LlmError::Transport { provider, message } => CodeforgeError::Transport { provider, message },
        LlmError::Timeout { timeout_s } => CodeforgeError::ExecutionTimeout { timeout_s },
        LlmError::RateLimitExhausted { attempts } => CodeforgeError::RateLimitExhausted { attempts },
        LlmError::ProviderAuth(msg) => CodeforgeError::Transport { provider: "llm".to_string(), message: msg },
        LlmError::UnexpectedResponse(msg) => CodeforgeError::Parse { artifact: "llm response".to_string(), reason: msg },
        LlmError::Misconfiguration(msg) => CodeforgeError::Config(msg),
        LlmError::Cancelled => CodeforgeError::Cancellation,
    }
}

pub fn map_sandbox_error(err: SandboxError) -> CodeforgeError {
    match err {
        SandboxError::AbsolutePath(p) => CodeforgeError::Validation(format!("path must be relative: {p:?}")),
        SandboxError::ParentTraversal(p) => CodeforgeError::Validation(format!("path escapes sandbox root: {p:?}")),
        SandboxError::RootNotDirectory(p) => CodeforgeError::Validation(format!("sandbox root invalid: {p:?}")),
        SandboxError::EntryPointNotFound(p) => CodeforgeError::Validation(format!("entry point not found: {p:?}")),
        SandboxError::Io(e) => CodeforgeError::Io(e),
        SandboxError::Runner(e) => map_runner_error(e),
    }
}

pub fn map_agent_error(err: AgentError) -> CodeforgeError {
    match err {
        AgentError::Llm(e) => map_llm_error(e),
        AgentError::Sandbox(e) => map_sandbox_error(e),
    }
}

fn map_runner_error(err: codeforge_runner::RunnerError) -> CodeforgeError {
    match err {
        codeforge_runner::RunnerError::SpawnFailed(msg) => CodeforgeError::Validation(format!("could not spawn process: {msg}")),
        codeforge_runner::RunnerError::ExecutionFailed => {
            CodeforgeError::Validation("process execution failed to complete".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn llm_cancellation_maps_to_cancellation_kind() {
        let mapped = map_llm_error(LlmError::Cancelled);
        assert_eq!(mapped.kind(), "CancellationError");
    }

    #[test]
    fn sandbox_path_errors_map_to_validation() {
        let mapped = map_sandbox_error(SandboxError::AbsolutePath("/etc/passwd".to_string()));
        assert_eq!(mapped.kind(), "ValidationError");
    }
}
