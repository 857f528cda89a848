//! The immutable value records passed from one pipeline stage to the
//! next.

use std::collections::BTreeMap;

use codeforge_utils::types::now_iso8601;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchitectureType {
    Cli,
    Api,
    Gui,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Medium,
    Complex,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub components: Vec<String>,
    pub dependencies: Vec<String>,
    pub architecture_type: ArchitectureType,
    pub complexity: Complexity,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStructure {
    pub files: BTreeMap<String, String>,
    pub entry_point: String,
    pub class_definitions: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FilePlan {
    pub purpose: String,
    pub classes: Vec<String>,
    pub functions: Vec<String>,
    pub key_logic: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchitecturalPlan {
    pub requirements: String,
    pub analysis: Analysis,
    pub file_structure: FileStructure,
    pub detailed_plan: BTreeMap<String, FilePlan>,
    pub timestamp: String,
    /// Set when the plan is the documented fallback skeleton rather than
    /// a genuine decode of the model's response.
    pub low_confidence: bool,
}

impl ArchitecturalPlan {
    /// `entry_point ∈ files`.
    pub fn entry_point_is_known(&self) -> bool {
        self.file_structure.files.contains_key(&self.file_structure.entry_point)
    }

    pub fn fallback(requirements: &str) -> Self {
        let mut files = BTreeMap::new();
        files.insert("main.py".to_string(), "Entry point".to_string());
        files.insert("README.md".to_string(), "Project documentation".to_string());
        ArchitecturalPlan {
            requirements: requirements.to_string(),
            analysis: Analysis {
                components: vec!["main".to_string()],
                dependencies: Vec::new(),
                architecture_type: ArchitectureType::Other,
                complexity: Complexity::Simple,
                summary: "Fallback plan: could not parse architect response".to_string(),
            },
            file_structure: FileStructure {
                files,
                entry_point: "main.py".to_string(),
                class_definitions: BTreeMap::new(),
            },
            detailed_plan: BTreeMap::new(),
            timestamp: now_iso8601(),
            low_confidence: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodePackage {
    pub files: BTreeMap<String, String>,
    pub architectural_plan: ArchitecturalPlan,
    pub entry_point: String,
}

impl CodePackage {
    /// `main.py` (or the nominated entry) present; no file is empty.
    pub fn is_valid(&self) -> bool {
        self.files.contains_key(&self.entry_point) && self.files.values().all(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResults {
    pub exit_code: i32,
    pub passed: bool,
    pub stdout: String,
    pub stderr: String,
    pub output: String,
    pub duration_ms: u64,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Passed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestFailure {
    pub test_name: String,
    pub status: String,
    pub error_message: String,
    pub traceback_excerpt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestAnalysis {
    pub overall_status: OverallStatus,
    pub has_failures: bool,
    pub failures: Vec<TestFailure>,
    pub failure_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestPackage {
    pub code_package: CodePackage,
    pub test_results: TestResults,
    pub test_analysis: TestAnalysis,
}

impl TestPackage {
    /// `test_results.passed ⇔ exit_code == 0`;
    /// `test_analysis.has_failures ⇔ ¬passed`.
    pub fn invariants_hold(&self) -> bool {
        (self.test_results.passed == (self.test_results.exit_code == 0))
            && (self.test_analysis.has_failures != self.test_results.passed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugAttempt {
    pub attempt_index: u32,
    pub analysis_summary: String,
    pub fixed_filenames: Vec<String>,
    pub test_passed: bool,
    pub test_output_tail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugResult {
    pub success: bool,
    pub fixed_code: BTreeMap<String, String>,
    pub attempts: Vec<DebugAttempt>,
    pub final_test_results: TestResults,
}

impl DebugResult {
    /// `success ⇔ attempts.last.test_passed`; `len(attempts) ≤
    /// MAX_DEBUG_ATTEMPTS`.
    pub fn invariants_hold(&self, max_attempts: u32) -> bool {
        let last_passed = self.attempts.last().map(|a| a.test_passed).unwrap_or(false);
        self.success == last_passed && (self.attempts.len() as u32) <= max_attempts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Architect,
    Coder,
    Tester,
    Debugger,
}

impl AgentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Architect => "architect",
            AgentKind::Coder => "coder",
            AgentKind::Tester => "tester",
            AgentKind::Debugger => "debugger",
        }
    }
}
