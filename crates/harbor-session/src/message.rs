use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// Lifecycle of a tool invocation part.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartStatus {
    Pending,
    Running,
    Completed,
    Error,
}

/// A structured fragment of a message.
///
/// A tool result carries the id of the tool invocation it resolves, so
/// subscribers can reconcile results delivered out of order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Part {
    Text {
        id: String,
        text: String,
    },
    ToolInvocation {
        id: String,
        tool_name: String,
        input: Value,
        status: PartStatus,
    },
    ToolResult {
        id: String,
        output: String,
        status: PartStatus,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
        }
    }

    pub fn tool_invocation(id: impl Into<String>, tool_name: impl Into<String>, input: Value) -> Self {
        Self::ToolInvocation {
            id: id.into(),
            tool_name: tool_name.into(),
            input,
            status: PartStatus::Running,
        }
    }

    pub fn tool_result(id: impl Into<String>, output: impl Into<String>) -> Self {
        Self::ToolResult {
            id: id.into(),
            output: output.into(),
            status: PartStatus::Completed,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Text { id, .. }
            | Self::ToolInvocation { id, .. }
            | Self::ToolResult { id, .. } => id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub parts: Vec<Part>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn assistant(id: Option<String>, parts: Vec<Part>) -> Self {
        Self {
            id: id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            role: Role::Assistant,
            parts,
            created_at: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::User,
            parts: vec![Part::text(text)],
            created_at: Utc::now(),
        }
    }
}
