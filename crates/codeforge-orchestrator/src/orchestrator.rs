//! Top-level state machine: `ARCH → CODE → TEST →
//! (SUCCESS | DEBUG → SUCCESS | FAILED | ERROR)`. There is no outer
//! re-planning cycle after a Debugger failure; the complexity budget is
//! spent entirely inside the Debugger's own inner loop.

use std::sync::Arc;

use codeforge_agents::{AgentContext, Architect, Coder, Debugger, Pacer, Tester};
use codeforge_llm::LlmBackend;
use codeforge_runner::ProcessRunner;
use codeforge_sandbox::Sandbox;
use codeforge_usage::UsageTracker;
use codeforge_utils::CodeforgeError;

use crate::cancellation::CancellationHandle;
use crate::errors::{map_agent_error, map_llm_error, map_sandbox_error};
use crate::options::RunOptions;
use crate::rate_limiter::RateLimiter;
use crate::result::{FinalStatus, RunResult};

pub struct Orchestrator {
    architect: Architect,
    coder: Coder,
    tester: Tester,
    debugger: Debugger,
    usage: Arc<UsageTracker>,
    runner: Arc<dyn ProcessRunner>,
    options: RunOptions,
    cancellation: CancellationHandle,
}

impl Orchestrator {
    pub fn new(
        backend: Arc<dyn LlmBackend>,
        usage: Arc<UsageTracker>,
        runner: Arc<dyn ProcessRunner>,
        options: RunOptions,
        cancellation: CancellationHandle,
    ) -> Self {
        let rate_limiter: Arc<dyn Pacer> = Arc::new(RateLimiter::new(
            options.enable_rate_limiting,
            options.rate_limit_delay,
            cancellation.clone(),
        ));

        let ctx = || AgentContext::new(backend.clone(), usage.clone()).with_pacer(rate_limiter.clone());

        Orchestrator {
            architect: Architect::new(ctx()),
            coder: Coder::new(ctx()),
            tester: Tester::new(ctx()),
            debugger: Debugger::new(ctx()),
            usage,
            runner,
            options,
            cancellation,
        }
    }

    /// `run(requirements) → RunResult`. Never propagates an error: every
    /// exit path, including cancellation and stage failure, resolves to
    /// a populated `RunResult`.
    pub async fn run(&self, requirements: &str) -> RunResult {
        if self.cancellation.is_cancelled() {
            return self.result(FinalStatus::Error, None, None, None, false, None, Some(CodeforgeError::Cancellation));
        }

        tracing::info!(stage = "ARCH", "starting architecture stage");
        let plan = match self.architect.create_architecture(requirements).await {
            Ok(p) => p,
            Err(e) => return self.result(FinalStatus::Error, None, None, None, false, None, Some(map_llm_error(e))),
        };

        if self.cancellation.is_cancelled() {
            return self.result(FinalStatus::Error, Some(plan), None, None, false, None, Some(CodeforgeError::Cancellation));
        }

        tracing::info!(stage = "CODE", "starting code generation stage");
        let code = match self.coder.generate(&plan).await {
            Ok(c) => c,
            Err(e) => return self.result(FinalStatus::Error, Some(plan), None, None, false, None, Some(map_llm_error(e))),
        };

        if self.cancellation.is_cancelled() {
            return self.result(FinalStatus::Error, Some(plan), Some(code), None, false, None, Some(CodeforgeError::Cancellation));
        }

        tracing::info!(stage = "TEST", "starting test stage");
        let project_name = format!("run-{}", uuid::Uuid::new_v4());
        let sandbox = match Sandbox::new(&self.options.workspace_root, &project_name, self.runner.clone()) {
            Ok(s) => s,
            Err(e) => {
                return self.result(FinalStatus::Error, Some(plan), Some(code), None, false, None, Some(map_sandbox_error(e)))
            }
        };

        let test_source = match self.tester.generate_tests(&code).await {
            Ok(s) => s,
            Err(e) => {
                cleanup(sandbox);
                return self.result(FinalStatus::Error, Some(plan), Some(code), None, false, None, Some(map_llm_error(e)));
            }
        };

        let test_package = match self.tester.run_tests(
            &sandbox,
            code.clone(),
            &test_source,
            &self.options.test_filename,
            self.options.test_timeout_s,
        ) {
            Ok(tp) => tp,
            Err(e) => {
                cleanup(sandbox);
                return self.result(FinalStatus::Error, Some(plan), Some(code), None, false, None, Some(map_agent_error(e)));
            }
        };

        if test_package.test_results.passed {
            cleanup(sandbox);
            return self.result(
                FinalStatus::Success,
                Some(plan),
                Some(test_package.code_package),
                Some(test_package.test_results),
                false,
                None,
                None,
            );
        }

        if self.cancellation.is_cancelled() {
            cleanup(sandbox);
            return self.result(
                FinalStatus::Error,
                Some(plan),
                Some(test_package.code_package),
                Some(test_package.test_results),
                false,
                None,
                Some(CodeforgeError::Cancellation),
            );
        }

        tracing::info!(stage = "DEBUG", "test suite failed, engaging debugger");
        let debug_result = self
            .debugger
            .fix_and_verify(
                &test_package,
                &sandbox,
                &self.options.test_filename,
                self.options.test_timeout_s,
                self.options.max_debug_attempts,
            )
            .await;
        cleanup(sandbox);

        match debug_result {
            Ok(debug) => {
                let mut final_code = test_package.code_package;
                final_code.files = debug.fixed_code.clone();
                let final_status = if debug.success { FinalStatus::Success } else { FinalStatus::Failed };
                let final_test_results = debug.final_test_results.clone();
                let success = debug.success;
                self.result(
                    final_status,
                    Some(plan),
                    Some(final_code),
                    Some(final_test_results),
                    success,
                    Some(debug),
                    None,
                )
            }
            Err(e) => self.result(
                FinalStatus::Error,
                Some(plan),
                Some(test_package.code_package),
                Some(test_package.test_results),
                false,
                None,
                Some(map_agent_error(e)),
            ),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn result(
        &self,
        final_status: FinalStatus,
        architectural_plan: Option<codeforge_artifact::ArchitecturalPlan>,
        code_package: Option<codeforge_artifact::CodePackage>,
        test_results: Option<codeforge_artifact::TestResults>,
        debugger_fixed: bool,
        debug_result: Option<codeforge_artifact::DebugResult>,
        error: Option<CodeforgeError>,
    ) -> RunResult {
        let error_kind = error.as_ref().map(|e| e.kind());
        let error_message = error.map(|e| e.to_string());
        RunResult {
            final_status,
            architectural_plan,
            code_package,
            test_results,
            debugger_fixed,
            debug_result,
            error: error_message,
            error_kind,
            usage_summary: self.usage.stats(),
        }
    }
}

fn cleanup(sandbox: Sandbox) {
    if let Err(e) = sandbox.cleanup() {
        tracing::warn!(error = %e, "failed to clean up sandbox project directory");
    }
}
