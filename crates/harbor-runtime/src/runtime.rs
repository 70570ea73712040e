//! Agent runtime adapter contract.

use async_trait::async_trait;

use crate::errors::RuntimeError;
use crate::events::AgentEventStream;
use crate::types::TurnRequest;

/// Boundary to the external agent runtime.
///
/// One `run` call drives one prompt and yields a live event sequence. A
/// runtime that only produces a single structured result expresses it as a
/// one-element stream carrying the terminal
/// [`AgentEvent::Completed`](crate::AgentEvent::Completed).
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, request: TurnRequest) -> Result<AgentEventStream, RuntimeError>;
}
