//! Typed events emitted by an agent runtime during one turn.

use std::pin::Pin;

use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::RuntimeError;

/// Live event sequence produced by one runtime invocation.
pub type AgentEventStream = Pin<Box<dyn Stream<Item = Result<AgentEvent, RuntimeError>> + Send>>;

/// One element of the runtime's event stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Runtime bootstrap notice; may carry the runtime's own conversation
    /// handle. Later handles always supersede earlier ones.
    Init { resume_handle: Option<String> },

    /// One assistant message worth of content segments.
    Assistant {
        /// Runtime-assigned message identity, when it provides one.
        message_id: Option<String>,
        /// Conversation handle observed on this event, if any.
        resume_handle: Option<String>,
        segments: Vec<ContentSegment>,
    },

    /// Tool results the runtime produced for earlier invocations.
    ToolResults { results: Vec<ToolResultSegment> },

    /// Incremental assistant text.
    TextDelta {
        message_id: Option<String>,
        delta: String,
    },

    /// Terminal result for the turn.
    Completed {
        final_text: Option<String>,
        resume_handle: Option<String>,
        cost_usd: f64,
        is_error: bool,
        error_text: Option<String>,
    },
}

/// A fragment of assistant content within one [`AgentEvent::Assistant`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentSegment {
    Text { text: String },
    ToolUse { id: String, name: String, input: Value },
}

/// A tool result correlated to its invocation by `tool_use_id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolResultSegment {
    pub tool_use_id: String,
    pub content: Value,
}

impl ToolResultSegment {
    /// Result payload as text: string content verbatim, structured content
    /// JSON-encoded.
    pub fn content_text(&self) -> String {
        match &self.content {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}
