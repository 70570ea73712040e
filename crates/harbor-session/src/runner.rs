//! Turn runner: drives one prompt against the agent runtime.
//!
//! The runner consumes the runtime's live event stream, assembles message
//! and part records incrementally, and republishes the deltas a subscriber
//! needs. It always returns a [`TurnOutcome`]: hard invocation errors and
//! cancellation are captured into the outcome's text and error flag so the
//! coordinator's completion path is uniform.

use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use harbor_runtime::{AgentEvent, AgentRuntime, ContentSegment, RuntimeError, TurnRequest};
use tracing::{debug, warn};

use crate::cancel::AbortHandle;
use crate::events::{EventBus, ServerEvent};
use crate::message::{Message, Part};

/// Final text reported when a successful turn produced no text output.
const NO_OUTPUT_PLACEHOLDER: &str = "Done. (no text output)";

/// Final text reported when the turn was cancelled mid-stream.
const ABORTED_TEXT: &str = "Turn was aborted";

/// Final text for an error result that carries no message of its own.
const GENERIC_FAILURE_TEXT: &str = "Error during execution";

/// Ephemeral result of one turn, folded into the session by the
/// coordinator.
#[derive(Clone, Debug, PartialEq)]
pub struct TurnOutcome {
    pub result: String,
    pub resume_handle: Option<String>,
    pub cost_usd: f64,
    pub duration_ms: u64,
    pub is_error: bool,
    pub messages: Vec<Message>,
}

#[derive(Default)]
struct TurnAccumulator {
    resume_handle: Option<String>,
    final_text: Option<String>,
    cost_usd: f64,
    is_error: bool,
    messages: Vec<Message>,
}

pub struct TurnRunner {
    runtime: Arc<dyn AgentRuntime>,
    bus: Arc<EventBus>,
}

impl TurnRunner {
    pub fn new(runtime: Arc<dyn AgentRuntime>, bus: Arc<EventBus>) -> Self {
        Self { runtime, bus }
    }

    /// Executes one prompt. With a session id, fine-grained message/part
    /// events are published as they arrive; without one the run is
    /// stateless and only the outcome is returned.
    ///
    /// If the invocation itself fails, a resume handle was supplied, and
    /// the failure indicates the handle expired, the turn is re-run once
    /// with the handle cleared. A second consecutive failure is surfaced
    /// in the outcome, not retried.
    pub async fn run(
        &self,
        request: TurnRequest,
        session_id: Option<&str>,
        abort: &AbortHandle,
    ) -> TurnOutcome {
        let started = Instant::now();
        let mut acc = TurnAccumulator::default();

        let failure = match self.drive(&mut acc, request.clone(), session_id, abort).await {
            Ok(()) => None,
            Err(err) if request.resume_handle.is_some() && err.indicates_expired_resume() => {
                warn!(
                    runtime = self.runtime.name(),
                    error = %err,
                    "resume handle expired, retrying without resume"
                );
                acc = TurnAccumulator::default();
                self.drive(&mut acc, request.without_resume(), session_id, abort)
                    .await
                    .err()
            }
            Err(err) => Some(err),
        };

        if let Some(err) = failure {
            acc.is_error = true;
            acc.final_text = Some(match err {
                RuntimeError::Aborted => ABORTED_TEXT.to_string(),
                other => other.to_string(),
            });
        }

        let result = acc
            .final_text
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| NO_OUTPUT_PLACEHOLDER.to_string());

        TurnOutcome {
            result,
            resume_handle: acc.resume_handle,
            cost_usd: acc.cost_usd,
            duration_ms: started.elapsed().as_millis() as u64,
            is_error: acc.is_error,
            messages: acc.messages,
        }
    }

    /// Consumes one runtime invocation to completion. Each element is
    /// processed fully before the next is requested; the abort signal is
    /// checked between elements, never by interrupting one.
    async fn drive(
        &self,
        acc: &mut TurnAccumulator,
        request: TurnRequest,
        session_id: Option<&str>,
        abort: &AbortHandle,
    ) -> Result<(), RuntimeError> {
        if abort.is_requested() {
            return Err(RuntimeError::Aborted);
        }

        debug!(runtime = self.runtime.name(), model = %request.model, "invoking runtime");
        let mut stream = tokio::select! {
            result = self.runtime.run(request) => result?,
            () = abort.triggered() => return Err(RuntimeError::Aborted),
        };

        loop {
            let next = tokio::select! {
                next = stream.next() => next,
                () = abort.triggered() => return Err(RuntimeError::Aborted),
            };
            match next {
                Some(Ok(event)) => self.apply(acc, event, session_id),
                Some(Err(err)) => return Err(err),
                None => return Ok(()),
            }
        }
    }

    fn apply(&self, acc: &mut TurnAccumulator, event: AgentEvent, session_id: Option<&str>) {
        match event {
            AgentEvent::Init { resume_handle } => {
                acc.adopt_handle(resume_handle);
            }

            AgentEvent::Assistant {
                message_id,
                resume_handle,
                segments,
            } => {
                acc.adopt_handle(resume_handle);
                let parts: Vec<Part> = segments
                    .into_iter()
                    .map(|segment| match segment {
                        ContentSegment::Text { text } => Part::text(text),
                        ContentSegment::ToolUse { id, name, input } => {
                            Part::tool_invocation(id, name, input)
                        }
                    })
                    .collect();
                let message = Message::assistant(message_id, parts);
                acc.messages.push(message.clone());

                if let Some(sid) = session_id {
                    self.bus.publish(&ServerEvent::MessageUpdated {
                        session_id: sid.to_string(),
                        message: message.clone(),
                    });
                    for part in &message.parts {
                        self.bus.publish(&ServerEvent::MessagePartUpdated {
                            session_id: sid.to_string(),
                            message_id: message.id.clone(),
                            part: part.clone(),
                        });
                    }
                }
            }

            AgentEvent::ToolResults { results } => {
                // Reconciliation is a pure event side channel: results are
                // correlated by invocation id, never appended as messages.
                if let Some(sid) = session_id {
                    for result in results {
                        let part =
                            Part::tool_result(result.tool_use_id.clone(), result.content_text());
                        self.bus.publish(&ServerEvent::MessagePartUpdated {
                            session_id: sid.to_string(),
                            message_id: result.tool_use_id,
                            part,
                        });
                    }
                }
            }

            AgentEvent::TextDelta { message_id, delta } => {
                if let Some(sid) = session_id {
                    self.bus.publish(&ServerEvent::MessagePartDelta {
                        session_id: sid.to_string(),
                        message_id: message_id.unwrap_or_default(),
                        delta,
                    });
                }
            }

            AgentEvent::Completed {
                final_text,
                resume_handle,
                cost_usd,
                is_error,
                error_text,
            } => {
                acc.adopt_handle(resume_handle);
                acc.cost_usd = cost_usd;
                acc.is_error = is_error;
                acc.final_text = if is_error {
                    Some(
                        final_text
                            .or(error_text)
                            .unwrap_or_else(|| GENERIC_FAILURE_TEXT.to_string()),
                    )
                } else {
                    final_text
                };
            }
        }
    }
}

impl TurnAccumulator {
    /// Later handles always supersede earlier ones; empty handles never
    /// overwrite an adopted one.
    fn adopt_handle(&mut self, handle: Option<String>) {
        if let Some(handle) = handle.filter(|handle| !handle.is_empty()) {
            self.resume_handle = Some(handle);
        }
    }
}
