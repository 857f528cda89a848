//! Materializes a project tree and runs it or its tests in a
//! subprocess under a timeout. Directory ownership is scoped to the
//! `Sandbox` value itself so `cleanup` (or `Drop`, when not explicitly
//! retained) always removes it.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use codeforge_artifact::CodePackage;
use codeforge_runner::{CommandSpec, ProcessRunner};
use codeforge_utils::atomic_write::write_file_atomic;
use codeforge_utils::types::now_iso8601;

use crate::error::SandboxError;
use crate::model::{ExecutionResult, TestResult};
use crate::preflight::{scan_source, PreflightWarning};
use crate::sandbox_root::SandboxRoot;
use crate::test_filter::filter_blocking_tests;

pub const DEFAULT_EXECUTE_TIMEOUT_S: u64 = 30;
pub const DEFAULT_TEST_TIMEOUT_S: u64 = 300;

pub struct Sandbox {
    root: SandboxRoot,
    runner: Arc<dyn ProcessRunner>,
    retain_on_drop: bool,
}

impl Sandbox {
    pub fn new(workspace_root: impl Into<std::path::PathBuf>, project_name: &str, runner: Arc<dyn ProcessRunner>) -> Result<Self, SandboxError> {
        let project_path = workspace_root.into().join(project_name);
        if project_path.exists() {
            std::fs::remove_dir_all(&project_path)?;
        }
        let root = SandboxRoot::new(project_path)?;
        Ok(Sandbox { root, runner, retain_on_drop: false })
    }

    pub fn path(&self) -> &std::path::Path {
        self.root.path()
    }

    /// Keeps the directory around after `cleanup`/drop, for debugging.
    pub fn retain(mut self) -> Self {
        self.retain_on_drop = true;
        self
    }

    /// `write_project(code_package) → project_path`: writes every
    /// file, creating parent directories as needed, plus
    /// `requirements.txt` when the plan names external dependencies.
    pub fn write_project(&self, code_package: &CodePackage) -> Result<Vec<PreflightWarning>, SandboxError> {
        let mut warnings = Vec::new();
        for (filename, content) in &code_package.files {
            let target = self.root.validate_target_path(filename)?;
            write_file_atomic(&target, content)?;
            warnings.extend(scan_source(filename, content));
        }

        let deps = &code_package.architectural_plan.analysis.dependencies;
        if !deps.is_empty() {
            let target = self.root.validate_target_path("requirements.txt")?;
            write_file_atomic(&target, &deps.join("\n"))?;
        }

        Ok(warnings)
    }

    /// Writes a single extra file (used by the Debugger to overlay
    /// fixed files, and by the Tester to write the generated test
    /// file, possibly after filtering blocking patterns out of it).
    pub fn write_file(&self, filename: &str, content: &str) -> Result<(), SandboxError> {
        let target = self.root.validate_target_path(filename)?;
        write_file_atomic(&target, content)?;
        Ok(())
    }

    /// Writes the Tester's generated test file, stripping any test
    /// function that reaches a blocking pattern first.
    pub fn write_test_file(&self, filename: &str, content: &str) -> Result<Vec<String>, SandboxError> {
        let filtered = filter_blocking_tests(content);
        self.write_file(filename, &filtered.source)?;
        Ok(filtered.removed_tests)
    }

    pub fn read_back(&self) -> Result<BTreeMap<String, String>, SandboxError> {
        let mut files = BTreeMap::new();
        for entry in walk(self.root.path())? {
            let relative = entry.strip_prefix(self.root.path()).unwrap().to_string_lossy().replace('\\', "/");
            let content = std::fs::read_to_string(&entry)?;
            files.insert(relative, content);
        }
        Ok(files)
    }

    /// `execute(entry_point, timeout_s) → ExecutionResult`.
    pub fn execute(&self, entry_point: &str, timeout_s: u64) -> Result<ExecutionResult, SandboxError> {
        let entry_path = self.root.path().join(entry_point);
        if !entry_path.exists() {
            return Err(SandboxError::EntryPointNotFound(entry_point.to_string()));
        }

        let spec = CommandSpec::new("python").arg(entry_point).cwd(self.root.path());
        let started = Instant::now();
        let output = self.runner.run(&spec, Duration::from_secs(timeout_s))?;
        let duration_s = started.elapsed().as_secs_f64();

        Ok(ExecutionResult {
            exit_code: output.exit_code.unwrap_or(-1),
            stdout: output.stdout_string(),
            stderr: output.stderr_string(),
            combined_output: format!("{}{}", output.stdout_string(), output.stderr_string()),
            duration_s,
            timestamp: now_iso8601(),
            passed: output.success(),
        })
    }

    /// `run_tests(test_file, timeout_s) → TestResult`. Attempts
    /// `pytest --json-report` first; on the report plugin being
    /// missing (stderr mentions `"No module named"` and
    /// `"json_report"`), retries with plain pytest.
    pub fn run_tests(&self, test_file: &str, timeout_s: u64) -> Result<TestResult, SandboxError> {
        let test_path = self.root.path().join(test_file);
        if !test_path.exists() {
            return Ok(TestResult {
                exit_code: -1,
                stdout: String::new(),
                stderr: format!("test file '{test_file}' not found in project directory"),
                combined_output: format!("test file '{test_file}' not found in project directory"),
                duration_s: 0.0,
                timestamp: now_iso8601(),
                passed: false,
                json_report: None,
            });
        }

        let report_path = self.root.path().join("pytest_report.json");
        let with_report = CommandSpec::new("python").args([
            "-m",
            "pytest",
            test_file,
            "-v",
            "--tb=short",
            "--json-report",
            "--json-report-file=pytest_report.json",
        ]).cwd(self.root.path());

        let started = Instant::now();
        let mut output = self.runner.run(&with_report, Duration::from_secs(timeout_s))?;

        let stderr = output.stderr_string();
        if stderr.contains("No module named") && stderr.contains("json_report") {
            tracing::info!("pytest-json-report unavailable, retrying with plain pytest");
            let plain = CommandSpec::new("python")
                .args(["-m", "pytest", test_file, "-v", "--tb=short"])
                .cwd(self.root.path());
            output = self.runner.run(&plain, Duration::from_secs(timeout_s))?;
        }
        let duration_s = started.elapsed().as_secs_f64();

        let json_report = std::fs::read_to_string(&report_path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok());

        Ok(TestResult {
            exit_code: output.exit_code.unwrap_or(-1),
            stdout: output.stdout_string(),
            stderr: output.stderr_string(),
            combined_output: format!("{}{}", output.stdout_string(), output.stderr_string()),
            duration_s,
            timestamp: now_iso8601(),
            passed: output.success(),
            json_report,
        })
    }

    /// Recursively deletes the project directory.
    pub fn cleanup(self) -> Result<(), SandboxError> {
        if !self.retain_on_drop && self.root.path().exists() {
            std::fs::remove_dir_all(self.root.path())?;
        }
        Ok(())
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        if !self.retain_on_drop {
            let _ = std::fs::remove_dir_all(self.root.path());
        }
    }
}

fn walk(dir: &std::path::Path) -> std::io::Result<Vec<std::path::PathBuf>> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            out.extend(walk(&path)?);
        } else {
            out.push(path);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeforge_artifact::{Analysis, ArchitectureType, Complexity, FileStructure};
    use codeforge_runner::mock::{failing_output, ok_output, ScriptedRunner};
    use std::collections::BTreeMap;

    fn plan_with_deps(deps: Vec<String>) -> codeforge_artifact::ArchitecturalPlan {
        codeforge_artifact::ArchitecturalPlan {
            requirements: "req".to_string(),
            analysis: Analysis {
                components: vec!["main".to_string()],
                dependencies: deps,
                architecture_type: ArchitectureType::Cli,
                complexity: Complexity::Simple,
                summary: "s".to_string(),
            },
            file_structure: FileStructure {
                files: BTreeMap::new(),
                entry_point: "main.py".to_string(),
                class_definitions: BTreeMap::new(),
            },
            detailed_plan: BTreeMap::new(),
            timestamp: "t".to_string(),
            low_confidence: false,
        }
    }

    #[test]
    fn write_project_then_read_back_round_trips_files() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new(vec![ok_output("")]));
        let sandbox = Sandbox::new(dir.path(), "proj", runner).unwrap();

        let mut files = BTreeMap::new();
        files.insert("main.py".to_string(), "def add(a, b):\n    return a + b\n".to_string());

        let cp = CodePackage {
            files: files.clone(),
            architectural_plan: plan_with_deps(vec![]),
            entry_point: "main.py".to_string(),
        };

        sandbox.write_project(&cp).unwrap();
        let read_back = sandbox.read_back().unwrap();
        assert_eq!(read_back.get("main.py"), files.get("main.py"));
    }

    #[test]
    fn write_project_emits_requirements_txt_when_deps_present() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new(vec![ok_output("")]));
        let sandbox = Sandbox::new(dir.path(), "proj", runner).unwrap();

        let mut files = BTreeMap::new();
        files.insert("main.py".to_string(), "x = 1\n".to_string());
        let cp = CodePackage {
            files,
            architectural_plan: plan_with_deps(vec!["requests".to_string()]),
            entry_point: "main.py".to_string(),
        };
        sandbox.write_project(&cp).unwrap();
        assert!(sandbox.path().join("requirements.txt").exists());
    }

    #[test]
    fn execute_reports_missing_entry_point() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new(vec![ok_output("")]));
        let sandbox = Sandbox::new(dir.path(), "proj", runner).unwrap();
        let err = sandbox.execute("main.py", 5).unwrap_err();
        assert!(matches!(err, SandboxError::EntryPointNotFound(_)));
    }

    #[test]
    fn run_tests_reports_missing_test_file_without_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new(vec![ok_output("")]));
        let sandbox = Sandbox::new(dir.path(), "proj", runner.clone()).unwrap();
        let result = sandbox.run_tests("test_main.py", 5).unwrap();
        assert!(!result.passed);
        assert!(result.stderr.contains("not found"));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn run_tests_falls_back_to_plain_pytest_when_report_plugin_missing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bootstrap.py"), "").unwrap();
        let runner = Arc::new(ScriptedRunner::new(vec![
            failing_output("ModuleNotFoundError: No module named 'json_report'", 4),
            ok_output("1 passed"),
        ]));
        let sandbox = Sandbox::new(dir.path(), "proj", runner.clone()).unwrap();
        std::fs::write(sandbox.path().join("test_main.py"), "def test_x():\n    assert True\n").unwrap();

        let result = sandbox.run_tests("test_main.py", 5).unwrap();
        assert!(result.passed);
        assert_eq!(runner.calls().len(), 2);
    }

    #[test]
    fn cleanup_removes_project_directory() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new(vec![ok_output("")]));
        let sandbox = Sandbox::new(dir.path(), "proj", runner).unwrap();
        let path = sandbox.path().to_path_buf();
        assert!(path.exists());
        sandbox.cleanup().unwrap();
        assert!(!path.exists());
    }
}
