//! codeforge - an autonomous multi-agent code generation pipeline.
//!
//! This crate provides the CLI entrypoint and wires together the
//! `codeforge-*` library crates: Architect, Coder, Tester, and Debugger
//! agent roles driven by a top-level [`codeforge_orchestrator::Orchestrator`]
//! state machine.

pub mod cli;
pub mod wiring;

pub use codeforge_orchestrator::{FinalStatus, Orchestrator, RunOptions, RunResult};
pub use codeforge_utils::{CodeforgeError, UserFriendlyError};
