//! Test doubles for `ProcessRunner`. Used throughout `codeforge-sandbox`
//! and `codeforge-orchestrator` tests so pipeline scenarios run without
//! a real interpreter or toolchain.

use std::sync::Mutex;
use std::time::Duration;

use crate::command_spec::CommandSpec;
use crate::error::RunnerError;
use crate::process::{ProcessOutput, ProcessRunner};

/// Returns a fixed, queued sequence of outputs regardless of the
/// command, one per call; repeats the last entry once the queue is
/// drained.
pub struct ScriptedRunner {
    outputs: Mutex<Vec<ProcessOutput>>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    pub fn new(outputs: Vec<ProcessOutput>) -> Self {
        ScriptedRunner {
            outputs: Mutex::new(outputs),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }
}

impl ProcessRunner for ScriptedRunner {
    fn run(&self, cmd: &CommandSpec, _timeout: Duration) -> Result<ProcessOutput, RunnerError> {
        self.calls.lock().unwrap().push(cmd.clone());
        let mut queue = self.outputs.lock().unwrap();
        if queue.len() > 1 {
            Ok(queue.remove(0))
        } else {
            Ok(queue.first().cloned().unwrap_or(ProcessOutput {
                stdout: Vec::new(),
                stderr: Vec::new(),
                exit_code: Some(0),
                timed_out: false,
            }))
        }
    }
}

pub struct TimeoutRunner {
    pub timeout_s: u64,
}

impl ProcessRunner for TimeoutRunner {
    fn run(&self, _cmd: &CommandSpec, _timeout: Duration) -> Result<ProcessOutput, RunnerError> {
        Ok(ProcessOutput {
            stdout: Vec::new(),
            stderr: format!("execution timeout after {}s", self.timeout_s).into_bytes(),
            exit_code: Some(-1),
            timed_out: true,
        })
    }
}

pub fn ok_output(stdout: &str) -> ProcessOutput {
    ProcessOutput {
        stdout: stdout.as_bytes().to_vec(),
        stderr: Vec::new(),
        exit_code: Some(0),
        timed_out: false,
    }
}

pub fn failing_output(stderr: &str, exit_code: i32) -> ProcessOutput {
    ProcessOutput {
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
        exit_code: Some(exit_code),
        timed_out: false,
    }
}
