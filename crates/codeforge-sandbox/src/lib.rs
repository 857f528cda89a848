pub mod error;
pub mod model;
pub mod preflight;
pub mod sandbox;
pub mod sandbox_root;
pub mod test_filter;

pub use error::SandboxError;
pub use model::{ExecutionResult, TestResult};
pub use preflight::{scan_source, PreflightWarning};
pub use sandbox::{Sandbox, DEFAULT_EXECUTE_TIMEOUT_S, DEFAULT_TEST_TIMEOUT_S};
pub use sandbox_root::SandboxRoot;
pub use test_filter::{filter_blocking_tests, FilterResult};
