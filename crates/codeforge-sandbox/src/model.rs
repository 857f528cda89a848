//! `ExecutionResult` / `TestResult` shapes returned by the sandbox.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub combined_output: String,
    pub duration_s: f64,
    pub timestamp: String,
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub combined_output: String,
    pub duration_s: f64,
    pub timestamp: String,
    pub passed: bool,
    pub json_report: Option<serde_json::Value>,
}
