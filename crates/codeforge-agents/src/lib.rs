//! The four agent roles: thin coordinators that compose
//! a prompt, call the LLM through [`context::AgentContext`], and parse
//! the response via `codeforge_artifact::ArtifactParser`. Polymorphism
//! across roles goes through the [`role::Role`] capability interface.

pub mod architect;
pub mod coder;
pub mod context;
pub mod debugger;
pub mod error;
pub mod role;
pub mod tester;

pub use architect::Architect;
pub use coder::Coder;
pub use context::{AgentContext, Pacer};
pub use debugger::{Debugger, DEFAULT_MAX_DEBUG_ATTEMPTS};
pub use error::AgentError;
pub use role::Role;
pub use tester::Tester;
