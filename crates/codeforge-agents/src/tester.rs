//! Tester's two-phase operation. `generate_tests` issues one LLM call
//! for the test file source; `run_tests` writes the project plus the
//! pre-flight-filtered test file into the sandbox, runs the suite, and
//! attaches the structured `TestAnalysis` the `TestPackage` invariant
//! requires.

use codeforge_artifact::{AgentKind, ArtifactParser, CodePackage, OverallStatus, TestAnalysis, TestFailure, TestPackage, TestResults};
use codeforge_llm::{LlmError, LlmInvocation, LlmResult};
use codeforge_sandbox::Sandbox;

use crate::context::AgentContext;
use crate::error::AgentError;
use crate::role::Role;

const SYSTEM_PROMPT: &str = "You are the Tester agent. Generate a pytest test file that exercises every \
public function and class in the code under test. Use fixtures; mock any blocking input with bounded \
side-effects; convert mocked objects to strings before making string assertions; add a per-test timeout \
decorator to any test that mocks standard input. Return only the test source, in a single fenced code block.";

const TRACEBACK_EXCERPT_MAX_CHARS: usize = 800;

pub struct Tester {
    ctx: AgentContext,
    parser: ArtifactParser,
}

impl Tester {
    pub fn new(ctx: AgentContext) -> Self {
        Tester { ctx, parser: ArtifactParser::new() }
    }

    /// `generate_tests(code_package) → test_file_source`.
    pub async fn generate_tests(&self, code_package: &CodePackage) -> Result<String, LlmError> {
        let prompt = format!(
            "Entry point: {}\n\nFiles under test:\n{}",
            code_package.entry_point,
            code_package
                .files
                .iter()
                .map(|(f, src)| format!("=== {f} ===\n{src}"))
                .collect::<Vec<_>>()
                .join("\n\n"),
        );
        let invocation = LlmInvocation::new(prompt).with_system(SYSTEM_PROMPT);
        let result = self.ctx.invoke_and_track(AgentKind::Tester, invocation, None).await?;
        let expected = vec!["test_main.py".to_string()];
        let files = self.parser.parse_code_package(&result.text, &expected);
        Ok(files.into_values().next().unwrap_or_else(|| result.text.clone()))
    }

    /// `run_tests() → TestPackage`: delegates to the Sandbox and
    /// attaches the structured analysis.
    pub fn run_tests(
        &self,
        sandbox: &Sandbox,
        code_package: CodePackage,
        test_source: &str,
        test_filename: &str,
        timeout_s: u64,
    ) -> Result<TestPackage, AgentError> {
        sandbox.write_project(&code_package)?;
        let removed = sandbox.write_test_file(test_filename, test_source)?;
        if !removed.is_empty() {
            tracing::warn!(?removed, "tester filtered blocking test functions before write");
        }

        let raw_result = sandbox.run_tests(test_filename, timeout_s)?;
        let test_analysis = build_test_analysis(&raw_result);

        let mut augmented = code_package;
        augmented.files.insert(test_filename.to_string(), test_source.to_string());

        Ok(TestPackage {
            code_package: augmented,
            test_results: TestResults {
                exit_code: raw_result.exit_code,
                passed: raw_result.passed,
                duration_ms: (raw_result.duration_s * 1000.0) as u64,
                timestamp: raw_result.timestamp.clone(),
                stdout: raw_result.stdout.clone(),
                stderr: raw_result.stderr.clone(),
                output: raw_result.combined_output.clone(),
            },
            test_analysis,
        })
    }
}

/// Parses the `pytest --json-report` shape when present; otherwise
/// derives pass/fail from the exit code alone.
pub(crate) fn build_test_analysis(result: &codeforge_sandbox::TestResult) -> TestAnalysis {
    let failures = result
        .json_report
        .as_ref()
        .and_then(failures_from_json_report)
        .unwrap_or_else(|| {
            if result.passed {
                Vec::new()
            } else {
                vec![TestFailure {
                    test_name: "<suite>".to_string(),
                    status: "failed".to_string(),
                    error_message: first_line(&result.stderr).unwrap_or_else(|| "test suite failed".to_string()),
                    traceback_excerpt: tail(&result.combined_output, TRACEBACK_EXCERPT_MAX_CHARS),
                }]
            }
        });

    TestAnalysis {
        overall_status: if result.passed { OverallStatus::Passed } else { OverallStatus::Failed },
        has_failures: !result.passed,
        failure_count: failures.len(),
        failures,
    }
}

fn failures_from_json_report(report: &serde_json::Value) -> Option<Vec<TestFailure>> {
    let tests = report.get("tests")?.as_array()?;
    let mut failures = Vec::new();
    for t in tests {
        let outcome = t.get("outcome").and_then(|v| v.as_str()).unwrap_or("passed");
        if outcome == "passed" {
            continue;
        }
        let test_name = t.get("nodeid").and_then(|v| v.as_str()).unwrap_or("<unknown>").to_string();
        let longrepr = t
            .get("call")
            .and_then(|c| c.get("longrepr"))
            .and_then(|v| v.as_str())
            .unwrap_or("");
        failures.push(TestFailure {
            test_name,
            status: outcome.to_string(),
            error_message: first_line(longrepr).unwrap_or_else(|| outcome.to_string()),
            traceback_excerpt: tail(longrepr, TRACEBACK_EXCERPT_MAX_CHARS),
        });
    }
    Some(failures)
}

fn first_line(s: &str) -> Option<String> {
    s.lines().next().map(|l| l.trim().to_string()).filter(|l| !l.is_empty())
}

pub(crate) fn tail(s: &str, max_chars: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_chars {
        s.to_string()
    } else {
        chars[chars.len() - max_chars..].iter().collect()
    }
}

#[async_trait::async_trait]
impl Role for Tester {
    fn kind(&self) -> AgentKind {
        AgentKind::Tester
    }

    async fn invoke(&self, invocation: LlmInvocation) -> Result<LlmResult, LlmError> {
        self.ctx.invoke_and_track(AgentKind::Tester, invocation, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeforge_artifact::{Analysis, ArchitecturalPlan, ArchitectureType, Complexity, FileStructure};
    use codeforge_llm::{LlmBackend, Usage};
    use codeforge_runner::mock::{failing_output, ok_output, ScriptedRunner};
    use codeforge_usage::UsageTracker;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn code_package() -> CodePackage {
        let mut files = BTreeMap::new();
        files.insert("main.py".to_string(), "def add(a, b):\n    return a + b\n".to_string());
        let plan = ArchitecturalPlan {
            requirements: "a calculator".to_string(),
            analysis: Analysis {
                components: vec!["main".to_string()],
                dependencies: vec![],
                architecture_type: ArchitectureType::Cli,
                complexity: Complexity::Simple,
                summary: "calculator".to_string(),
            },
            file_structure: FileStructure { files: files.clone(), entry_point: "main.py".to_string(), class_definitions: BTreeMap::new() },
            detailed_plan: BTreeMap::new(),
            timestamp: "t".to_string(),
            low_confidence: false,
        };
        CodePackage { files, architectural_plan: plan, entry_point: "main.py".to_string() }
    }

    struct StubBackend(&'static str);

    #[async_trait::async_trait]
    impl LlmBackend for StubBackend {
        async fn send(&self, _invocation: LlmInvocation) -> Result<LlmResult, LlmError> {
            Ok(LlmResult { text: self.0.to_string(), usage: Usage::default() })
        }
    }

    #[tokio::test]
    async fn generate_tests_recovers_fenced_source() {
        let dir = tempfile::tempdir().unwrap();
        let usage = Arc::new(UsageTracker::new(true, dir.path().join("usage.json")));
        let backend = Arc::new(StubBackend(
            "```python\nimport pytest\ndef test_add():\n    assert add(2, 3) == 5\n```",
        ));
        let tester = Tester::new(AgentContext::new(backend, usage));
        let source = tester.generate_tests(&code_package()).await.unwrap();
        assert!(source.contains("def test_add"));
    }

    #[test]
    fn run_tests_marks_passed_suite_with_no_failures() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new(vec![ok_output("1 passed")]));
        let sandbox = Sandbox::new(dir.path(), "proj", runner).unwrap();
        let usage = Arc::new(UsageTracker::new(true, dir.path().join("usage.json")));
        let tester = Tester::new(AgentContext::new(Arc::new(StubBackend("")), usage));

        let tp = tester
            .run_tests(&sandbox, code_package(), "def test_add():\n    assert add(2, 3) == 5\n", "test_main.py", 5)
            .unwrap();
        assert!(tp.test_results.passed);
        assert!(!tp.test_analysis.has_failures);
        assert_eq!(tp.test_analysis.overall_status, OverallStatus::Passed);
        assert!(tp.code_package.files.contains_key("test_main.py"));
    }

    #[test]
    fn run_tests_attaches_failures_from_json_report() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new(vec![failing_output("", 1)]));
        let sandbox = Sandbox::new(dir.path(), "proj", runner).unwrap();
        std::fs::write(
            sandbox.path().join("pytest_report.json"),
            r#"{"tests": [{"nodeid": "test_main.py::test_add", "outcome": "failed", "call": {"longrepr": "AssertionError: expected 5"}}]}"#,
        )
        .unwrap();

        let usage = Arc::new(UsageTracker::new(true, dir.path().join("usage.json")));
        let tester = Tester::new(AgentContext::new(Arc::new(StubBackend("")), usage));
        let tp = tester
            .run_tests(&sandbox, code_package(), "def test_add():\n    assert add(2, 3) == 6\n", "test_main.py", 5)
            .unwrap();

        assert!(!tp.test_results.passed);
        assert_eq!(tp.test_analysis.failure_count, 1);
        assert_eq!(tp.test_analysis.failures[0].test_name, "test_main.py::test_add");
    }
}
