use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Invocation envelope for one turn against the agent runtime.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurnRequest {
    pub prompt: String,
    /// Conversation handle to continue from; `None` starts fresh.
    pub resume_handle: Option<String>,
    pub model: String,
    pub max_turns: u32,
    pub max_budget_usd: f64,
    pub system_prompt: Option<String>,
    pub working_directory: PathBuf,
}

impl TurnRequest {
    /// The same request with the resume handle cleared, for retrying a turn
    /// as a fresh conversation.
    pub fn without_resume(&self) -> Self {
        Self {
            resume_handle: None,
            ..self.clone()
        }
    }
}
