//! Boundary types for an external conversational agent runtime.
//!
//! This crate defines the contract the orchestration layer consumes: the
//! [`AgentRuntime`] adapter trait, the typed [`AgentEvent`] stream one
//! invocation produces, the [`TurnRequest`] envelope, and the
//! [`RuntimeError`] taxonomy including expired-resume detection.

pub mod errors;
pub mod events;
pub mod runtime;
pub mod types;

pub use errors::*;
pub use events::*;
pub use runtime::*;
pub use types::*;
