//! Maps process-environment [`Config`] onto the library-level
//! [`RunOptions`]/[`Orchestrator`] construction, keeping
//! `codeforge-orchestrator` itself decoupled from env-var loading.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use codeforge_config::Config;
use codeforge_llm::backend_for_endpoint;
use codeforge_orchestrator::{CancellationHandle, Orchestrator, RunOptions};
use codeforge_runner::NativeRunner;
use codeforge_usage::UsageTracker;

pub fn build_orchestrator(config: &Config, cancellation: CancellationHandle) -> Orchestrator {
    let backend = backend_for_endpoint(
        &config.mcp_endpoint,
        &config.mcp_api_key,
        config.mcp_model.as_deref().unwrap_or("gpt-4"),
        config.max_retries,
        Duration::from_secs(config.initial_backoff_s),
    )
    .into();
    let usage = Arc::new(UsageTracker::new(true, PathBuf::from(&config.usage_log_file)));
    let runner = Arc::new(NativeRunner);

    let mut options = RunOptions::new(&config.workspace_dir);
    options.max_debug_attempts = config.max_debug_attempts;
    options.enable_rate_limiting = config.enable_rate_limiting;
    options.rate_limit_delay = Duration::from_secs(config.rate_limit_delay_s);
    options.test_timeout_s = config.test_timeout_s;
    options.execute_timeout_s = config.execute_timeout_s;

    Orchestrator::new(backend, usage, runner, options, cancellation)
}
