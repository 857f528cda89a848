//! Debugger's internal fix-and-retry inner loop. Each attempt embeds
//! the failing code, the tail of the last test output, the attempt
//! index, and anti-pattern lessons mined from that output; the response
//! is parsed with the marker-delimited strategy; any recovered files
//! are overlaid onto the current code package, written, and re-tested
//! in the sandbox. The loop stops at the first passing attempt or at
//! `max_attempts`.
//!
//! State-machine summary:
//! `ANALYZING → APPLYING → TESTING → (DONE_OK | CONTINUE | DONE_FAIL)`.

use codeforge_artifact::{AgentKind, ArtifactParser, CodePackage, DebugAttempt, DebugResult, TestPackage, TestResults};
use codeforge_llm::{LlmError, LlmInvocation, LlmResult};
use codeforge_sandbox::Sandbox;

use crate::context::AgentContext;
use crate::error::AgentError;
use crate::role::Role;
use crate::tester::tail;

pub const DEFAULT_MAX_DEBUG_ATTEMPTS: u32 = 5;
const OUTPUT_TAIL_MAX_CHARS: usize = 2000;

const SYSTEM_PROMPT: &str = "You are the Debugger agent. Given the failing code and the last test output, \
diagnose the bug and return a fix. Wrap your diagnosis in ANALYSIS_START/ANALYSIS_END, followed by one \
FILE_START: <name> ... FILE_END block per file you changed, each containing that file's full corrected source. \
Return only the source you are changing, not unchanged files.";

pub struct Debugger {
    ctx: AgentContext,
    parser: ArtifactParser,
}

impl Debugger {
    pub fn new(ctx: AgentContext) -> Self {
        Debugger { ctx, parser: ArtifactParser::new() }
    }

    /// `fix_and_verify(test_package) → DebugResult`.
    pub async fn fix_and_verify(
        &self,
        test_package: &TestPackage,
        sandbox: &Sandbox,
        test_filename: &str,
        timeout_s: u64,
        max_attempts: u32,
    ) -> Result<DebugResult, AgentError> {
        let mut current_code = test_package.code_package.clone();
        let mut last_output = test_package.test_results.output.clone();
        let mut attempts: Vec<DebugAttempt> = Vec::new();
        let mut final_results = test_package.test_results.clone();

        for attempt_index in 1..=max_attempts {
            let prompt = compose_attempt_prompt(&current_code, &last_output, attempt_index);
            let invocation = LlmInvocation::new(prompt).with_system(SYSTEM_PROMPT);
            let result = self
                .ctx
                .invoke_and_track(AgentKind::Debugger, invocation, Some(attempt_index))
                .await?;
            let parsed = self.parser.parse_debug_response(&result.text);

            if parsed.fixed_files.is_empty() {
                tracing::warn!(attempt_index, "debugger response contained no fixed files");
                attempts.push(DebugAttempt {
                    attempt_index,
                    analysis_summary: parsed.analysis_summary,
                    fixed_filenames: Vec::new(),
                    test_passed: false,
                    test_output_tail: tail(&last_output, OUTPUT_TAIL_MAX_CHARS),
                });
                continue;
            }

            let fixed_filenames: Vec<String> = parsed.fixed_files.keys().cloned().collect();
            for (filename, source) in &parsed.fixed_files {
                current_code.files.insert(filename.clone(), source.clone());
            }

            sandbox.write_project(&current_code)?;
            let test_source = current_code.files.get(test_filename).cloned().unwrap_or_default();
            let removed = sandbox.write_test_file(test_filename, &test_source)?;
            if !removed.is_empty() {
                tracing::warn!(?removed, attempt_index, "debugger re-run filtered blocking test functions");
            }
            let raw_result = sandbox.run_tests(test_filename, timeout_s)?;
            let passed = raw_result.passed;

            final_results = TestResults {
                exit_code: raw_result.exit_code,
                passed: raw_result.passed,
                duration_ms: (raw_result.duration_s * 1000.0) as u64,
                timestamp: raw_result.timestamp.clone(),
                stdout: raw_result.stdout.clone(),
                stderr: raw_result.stderr.clone(),
                output: raw_result.combined_output.clone(),
            };
            last_output = final_results.output.clone();

            attempts.push(DebugAttempt {
                attempt_index,
                analysis_summary: parsed.analysis_summary,
                fixed_filenames,
                test_passed: passed,
                test_output_tail: tail(&last_output, OUTPUT_TAIL_MAX_CHARS),
            });

            if passed {
                break;
            }
        }

        let success = attempts.last().map(|a| a.test_passed).unwrap_or(false);
        Ok(DebugResult {
            success,
            fixed_code: current_code.files,
            attempts,
            final_test_results: final_results,
        })
    }
}

fn compose_attempt_prompt(code: &CodePackage, last_output: &str, attempt_index: u32) -> String {
    let files = code
        .files
        .iter()
        .map(|(f, s)| format!("=== {f} ===\n{s}"))
        .collect::<Vec<_>>()
        .join("\n\n");
    let lessons = learned_lessons(last_output);
    let lessons_text = if lessons.is_empty() {
        String::new()
    } else {
        format!("\n\nLessons from the previous attempt:\n- {}", lessons.join("\n- "))
    };
    format!(
        "Attempt {attempt_index} of the debug loop.\n\nFailing code:\n{files}\n\nLast test output (tail):\n{}{lessons_text}",
        tail(last_output, OUTPUT_TAIL_MAX_CHARS),
    )
}

/// Anti-pattern hints mined from the previous attempt's output:
/// recognizable failure signatures that point at a specific, repeatable
/// mistake rather than a generic retry.
fn learned_lessons(output: &str) -> Vec<&'static str> {
    let mut lessons = Vec::new();
    if output.contains("Mock") && output.contains(" in [") {
        lessons.push(
            "if the previous attempt saw an assertion like `assert 'Name: ...' in [<object>]`, convert the object to a string before asserting membership",
        );
    }
    if output.contains("to have been called") && output.contains("times") {
        lessons.push(
            "if the previous attempt saw `Expected ... to have been called 0 times`, replace the MagicMock of an instance method with the real fixture object and patch the class instead",
        );
    }
    if output.contains("AttributeError") {
        lessons.push("if the previous attempt saw an AttributeError, check for a renamed or missing method before re-emitting the same call");
    }
    lessons
}

#[async_trait::async_trait]
impl Role for Debugger {
    fn kind(&self) -> AgentKind {
        AgentKind::Debugger
    }

    async fn invoke(&self, invocation: LlmInvocation) -> Result<LlmResult, LlmError> {
        self.ctx.invoke_and_track(AgentKind::Debugger, invocation, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeforge_artifact::{Analysis, ArchitecturalPlan, ArchitectureType, Complexity, FileStructure, OverallStatus, TestAnalysis};
    use codeforge_llm::{LlmBackend, Usage};
    use codeforge_runner::mock::{failing_output, ok_output, ScriptedRunner};
    use codeforge_usage::UsageTracker;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn failing_test_package() -> TestPackage {
        let mut files = BTreeMap::new();
        files.insert("main.py".to_string(), "def factorial(n):\n    if n == 0:\n        return 0\n    return n * factorial(n - 1)\n".to_string());
        files.insert("test_main.py".to_string(), "def test_zero():\n    assert factorial(0) == 1\n".to_string());
        let plan = ArchitecturalPlan {
            requirements: "factorial".to_string(),
            analysis: Analysis {
                components: vec!["main".to_string()],
                dependencies: vec![],
                architecture_type: ArchitectureType::Cli,
                complexity: Complexity::Simple,
                summary: "factorial".to_string(),
            },
            file_structure: FileStructure { files: BTreeMap::new(), entry_point: "main.py".to_string(), class_definitions: BTreeMap::new() },
            detailed_plan: BTreeMap::new(),
            timestamp: "t".to_string(),
            low_confidence: false,
        };
        let code_package = CodePackage { files, architectural_plan: plan, entry_point: "main.py".to_string() };
        TestPackage {
            code_package,
            test_results: TestResults {
                exit_code: 1,
                passed: false,
                stdout: String::new(),
                stderr: "AssertionError: assert 0 == 1".to_string(),
                output: "AssertionError: assert 0 == 1".to_string(),
                duration_ms: 10,
                timestamp: "t".to_string(),
            },
            test_analysis: TestAnalysis {
                overall_status: OverallStatus::Failed,
                has_failures: true,
                failure_count: 1,
                failures: Vec::new(),
            },
        }
    }

    struct StubBackend(&'static str);

    #[async_trait::async_trait]
    impl LlmBackend for StubBackend {
        async fn send(&self, _invocation: LlmInvocation) -> Result<LlmResult, LlmError> {
            Ok(LlmResult { text: self.0.to_string(), usage: Usage::default() })
        }
    }

    #[tokio::test]
    async fn one_attempt_recovers_when_fix_passes() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new(vec![ok_output("1 passed")]));
        let sandbox = Sandbox::new(dir.path(), "proj", runner).unwrap();
        let usage = Arc::new(UsageTracker::new(true, dir.path().join("usage.json")));
        let backend = Arc::new(StubBackend(
            "ANALYSIS_START\nfactorial(0) must return 1\nANALYSIS_END\nFILE_START: main.py\ndef factorial(n):\n    if n == 0:\n        return 1\n    return n * factorial(n - 1)\nFILE_END",
        ));
        let debugger = Debugger::new(AgentContext::new(backend, usage.clone()));

        let result = debugger
            .fix_and_verify(&failing_test_package(), &sandbox, "test_main.py", 5, DEFAULT_MAX_DEBUG_ATTEMPTS)
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.attempts.len(), 1);
        assert!(result.attempts[0].test_passed);
        assert!(result.fixed_code["main.py"].contains("return 1"));
        assert_eq!(usage.stats().debugger_iterations[&1], 0);
    }

    #[tokio::test]
    async fn exhausts_attempts_when_fix_never_passes() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new(vec![failing_output("still failing", 1)]));
        let sandbox = Sandbox::new(dir.path(), "proj", runner).unwrap();
        let usage = Arc::new(UsageTracker::new(true, dir.path().join("usage.json")));
        let backend = Arc::new(StubBackend(
            "ANALYSIS_START\nattempted a fix\nANALYSIS_END\nFILE_START: main.py\ndef factorial(n):\n    return 0  # still broken\nFILE_END",
        ));
        let debugger = Debugger::new(AgentContext::new(backend, usage));

        let result = debugger
            .fix_and_verify(&failing_test_package(), &sandbox, "test_main.py", 5, 3)
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.attempts.len(), 3);
        assert!(result.attempts.iter().all(|a| !a.test_passed));
    }

    #[tokio::test]
    async fn unparseable_response_records_attempt_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new(vec![failing_output("still failing", 1)]));
        let sandbox = Sandbox::new(dir.path(), "proj", runner).unwrap();
        let usage = Arc::new(UsageTracker::new(true, dir.path().join("usage.json")));
        let backend = Arc::new(StubBackend("I am not sure what is wrong."));
        let debugger = Debugger::new(AgentContext::new(backend, usage));

        let result = debugger
            .fix_and_verify(&failing_test_package(), &sandbox, "test_main.py", 5, 2)
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.attempts.len(), 2);
        assert!(result.attempts.iter().all(|a| a.fixed_filenames.is_empty()));
    }
}
