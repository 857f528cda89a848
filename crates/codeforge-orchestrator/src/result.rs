//! The run's outward-facing outcome: whatever happens internally,
//! `Orchestrator::run` always resolves to one of these — never a bare
//! error propagated to the caller.

use codeforge_artifact::{ArchitecturalPlan, CodePackage, DebugResult, TestResults};
use codeforge_usage::UsageStats;

/// Cancellation is not a fourth value: it surfaces as `Error` with
/// `error_kind = "CancellationError"`, same as any other stage failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalStatus {
    Success,
    Failed,
    Error,
}

#[derive(Debug, Clone)]
pub struct RunResult {
    pub final_status: FinalStatus,
    pub architectural_plan: Option<ArchitecturalPlan>,
    pub code_package: Option<CodePackage>,
    pub test_results: Option<TestResults>,
    pub debugger_fixed: bool,
    pub debug_result: Option<DebugResult>,
    pub error: Option<String>,
    pub error_kind: Option<&'static str>,
    pub usage_summary: UsageStats,
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        self.final_status == FinalStatus::Success
    }
}
