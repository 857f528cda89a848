//! Top-level state machine: drives Architect → Coder → Tester →
//! Debugger, owns the global rate limit and cancellation signal, and
//! produces the user-visible [`result::RunResult`].

pub mod cancellation;
pub mod errors;
pub mod options;
pub mod orchestrator;
pub mod rate_limiter;
pub mod result;

pub use cancellation::CancellationHandle;
pub use options::RunOptions;
pub use orchestrator::Orchestrator;
pub use rate_limiter::RateLimiter;
pub use result::{FinalStatus, RunResult};
