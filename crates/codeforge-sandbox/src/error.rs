use thiserror::Error;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("path must be relative to the sandbox root, got {0:?}")]
    AbsolutePath(String),

    #[error("path escapes the sandbox root via '..': {0:?}")]
    ParentTraversal(String),

    #[error("sandbox root {0:?} does not exist or is not a directory")]
    RootNotDirectory(String),

    #[error("entry point {0:?} not found in project directory")]
    EntryPointNotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Runner(#[from] codeforge_runner::RunnerError),
}
