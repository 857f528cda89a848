use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to spawn process: {0}")]
    SpawnFailed(String),

    #[error("process execution failed to complete")]
    ExecutionFailed,
}
