//! Knobs the Orchestrator needs to run a single pipeline pass.
//! Deliberately does not depend on `codeforge-config` so this crate
//! stays usable outside a process-environment context (tests, an
//! embedding host); the root binary is what maps `Config` onto this.

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub workspace_root: PathBuf,
    pub max_debug_attempts: u32,
    pub enable_rate_limiting: bool,
    pub rate_limit_delay: Duration,
    pub test_timeout_s: u64,
    pub execute_timeout_s: u64,
    pub test_filename: String,
}

impl RunOptions {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        RunOptions {
            workspace_root: workspace_root.into(),
            max_debug_attempts: codeforge_agents::DEFAULT_MAX_DEBUG_ATTEMPTS,
            enable_rate_limiting: true,
            rate_limit_delay: Duration::from_secs(crate::rate_limiter::DEFAULT_REQUEST_DELAY_S),
            test_timeout_s: codeforge_sandbox::DEFAULT_TEST_TIMEOUT_S,
            execute_timeout_s: codeforge_sandbox::DEFAULT_EXECUTE_TIMEOUT_S,
            test_filename: "test_main.py".to_string(),
        }
    }
}
