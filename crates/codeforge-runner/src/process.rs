//! `ProcessRunner` trait and its shape of result. Kept sync at the
//! boundary even though the native implementation runs the wait on a
//! helper thread: the Sandbox calls this from ordinary (non-async) code
//! and the Orchestrator treats the whole call as a blocking point.

use std::time::Duration;

use crate::command_spec::CommandSpec;
use crate::error::RunnerError;

#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

impl ProcessOutput {
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0) && !self.timed_out
    }
}

/// Runs one command to completion or timeout. Implementations must
/// never shell out to a string-interpreted command; `CommandSpec` is
/// argv-only by construction so there is nothing to escape.
pub trait ProcessRunner: Send + Sync {
    fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, RunnerError>;
}
