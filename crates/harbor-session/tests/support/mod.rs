#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream;
use futures::StreamExt;
use harbor_runtime::{
    AgentEvent, AgentEventStream, AgentRuntime, ContentSegment, RuntimeError, TurnRequest,
};

/// Installs the test log subscriber once, so
/// `RUST_LOG=harbor_session=debug` surfaces coordinator and runner traces
/// during test runs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One canned runtime invocation: either a hard invocation failure or the
/// events its stream yields.
pub type Script = Result<Vec<Result<AgentEvent, RuntimeError>>, RuntimeError>;

/// Scripted runtime double: pops one script per `run` call and records
/// every request it sees. With `hang_after_events` the stream stays open
/// after its canned events, so a turn remains in flight until aborted.
pub struct ScriptedRuntime {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<TurnRequest>>,
    hang_after_events: bool,
}

impl ScriptedRuntime {
    pub fn new(scripts: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            requests: Mutex::new(Vec::new()),
            hang_after_events: false,
        })
    }

    pub fn hanging(scripts: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            requests: Mutex::new(Vec::new()),
            hang_after_events: true,
        })
    }

    pub fn requests(&self) -> Vec<TurnRequest> {
        self.requests.lock().expect("requests mutex").clone()
    }
}

#[async_trait]
impl AgentRuntime for ScriptedRuntime {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn run(&self, request: TurnRequest) -> Result<AgentEventStream, RuntimeError> {
        self.requests.lock().expect("requests mutex").push(request);
        let script = self
            .scripts
            .lock()
            .expect("scripts mutex")
            .pop_front()
            .expect("script queued");
        let events = script?;
        if self.hang_after_events {
            Ok(Box::pin(stream::iter(events).chain(stream::pending())))
        } else {
            Ok(Box::pin(stream::iter(events)))
        }
    }
}

/// A turn that answers with one text part and succeeds.
pub fn text_turn(text: &str, cost: f64, handle: &str) -> Script {
    Ok(vec![
        Ok(AgentEvent::Init {
            resume_handle: Some(handle.to_string()),
        }),
        Ok(AgentEvent::Assistant {
            message_id: None,
            resume_handle: None,
            segments: vec![ContentSegment::Text {
                text: text.to_string(),
            }],
        }),
        Ok(AgentEvent::Completed {
            final_text: Some(text.to_string()),
            resume_handle: Some(handle.to_string()),
            cost_usd: cost,
            is_error: false,
            error_text: None,
        }),
    ])
}

/// A turn the runtime finishes with an error result (not a hard failure).
pub fn error_turn(error_text: &str, cost: f64) -> Script {
    Ok(vec![Ok(AgentEvent::Completed {
        final_text: None,
        resume_handle: None,
        cost_usd: cost,
        is_error: true,
        error_text: Some(error_text.to_string()),
    })])
}
