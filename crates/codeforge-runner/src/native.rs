//! OS-process-backed `ProcessRunner`: spawn, hand the wait off to a
//! helper thread, race it against the timeout on a channel, and
//! SIGKILL / `TerminateProcess` the child if the timer wins.

use std::process::Stdio;
use std::sync::mpsc;
use std::time::Duration;

use crate::command_spec::CommandSpec;
use crate::error::RunnerError;
use crate::process::{ProcessOutput, ProcessRunner};

#[derive(Debug, Default, Clone, Copy)]
pub struct NativeRunner;

impl ProcessRunner for NativeRunner {
    fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, RunnerError> {
        let mut command = cmd.to_command();
        command.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());

        let mut child = command
            .spawn()
            .map_err(|e| RunnerError::SpawnFailed(e.to_string()))?;
        let child_id = child.id();

        let (tx, rx) = mpsc::channel();
        let handle = std::thread::spawn(move || {
            let result = child.wait_with_output();
            let _ = tx.send(result);
        });

        match rx.recv_timeout(timeout) {
            Ok(Ok(output)) => {
                let _ = handle.join();
                Ok(ProcessOutput {
                    stdout: output.stdout,
                    stderr: output.stderr,
                    exit_code: output.status.code(),
                    timed_out: false,
                })
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(RunnerError::SpawnFailed(e.to_string()))
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                terminate_process(child_id);
                let _ = handle.join();
                Ok(ProcessOutput {
                    stdout: Vec::new(),
                    stderr: format!("execution timeout after {}s", timeout.as_secs()).into_bytes(),
                    exit_code: Some(-1),
                    timed_out: true,
                })
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(RunnerError::ExecutionFailed),
        }
    }
}

#[cfg(unix)]
fn terminate_process(pid: u32) {
    unsafe {
        libc::kill(pid as i32, libc::SIGKILL);
    }
}

#[cfg(windows)]
fn terminate_process(pid: u32) {
    use windows::Win32::Foundation::CloseHandle;
    use windows::Win32::System::Threading::{OpenProcess, TerminateProcess, PROCESS_TERMINATE};

    unsafe {
        if let Ok(handle) = OpenProcess(PROCESS_TERMINATE, false, pid) {
            let _ = TerminateProcess(handle, 1);
            let _ = CloseHandle(handle);
        }
    }
}

#[cfg(not(any(unix, windows)))]
fn terminate_process(_pid: u32) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_stdout_and_exit_code() {
        let runner = NativeRunner;
        let spec = CommandSpec::new("echo").arg("hello");
        let output = runner.run(&spec, Duration::from_secs(5)).unwrap();
        assert_eq!(output.exit_code, Some(0));
        assert!(output.stdout_string().contains("hello"));
        assert!(output.success());
    }

    #[test]
    fn reports_nonzero_exit_code() {
        let runner = NativeRunner;
        let spec = CommandSpec::new("sh").args(["-c", "exit 3"]);
        let output = runner.run(&spec, Duration::from_secs(5)).unwrap();
        assert_eq!(output.exit_code, Some(3));
        assert!(!output.success());
    }

    #[test]
    fn kills_process_that_exceeds_timeout() {
        let runner = NativeRunner;
        let spec = CommandSpec::new("sleep").arg("5");
        let output = runner.run(&spec, Duration::from_millis(200)).unwrap();
        assert!(output.timed_out);
        assert_eq!(output.exit_code, Some(-1));
        assert!(output.stderr_string().contains("timeout"));
    }

    #[test]
    fn nonexistent_command_fails_to_spawn() {
        let runner = NativeRunner;
        let spec = CommandSpec::new("definitely-not-a-real-binary-xyz");
        let result = runner.run(&spec, Duration::from_secs(5));
        assert!(result.is_err());
    }
}
