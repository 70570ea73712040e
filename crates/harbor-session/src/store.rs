//! Authoritative in-memory registry of session state.
//!
//! Process-lifetime only: a restart loses all sessions, and nothing here
//! touches disk. That boundary is deliberate.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::message::Message;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Running,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
        }
    }
}

/// A long-lived conversational context.
///
/// Invariant: `status == Running` exactly while an abort handle for this id
/// is registered in the cancellation registry. The lifecycle coordinator is
/// the only writer that maintains it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    /// Opaque external conversation identifier; `None` until the first
    /// successful turn.
    pub resume_handle: Option<String>,
    pub working_directory: PathBuf,
    pub status: SessionStatus,
    pub total_cost_usd: f64,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update merged by [`SessionStore::update`].
#[derive(Clone, Debug, Default)]
pub struct SessionPatch {
    pub status: Option<SessionStatus>,
    /// Set-if-some: a patch never clears an adopted handle.
    pub resume_handle: Option<String>,
    pub add_cost_usd: Option<f64>,
}

#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, working_directory: PathBuf) -> Session {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            resume_handle: None,
            working_directory,
            status: SessionStatus::Idle,
            total_cost_usd: 0.0,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        let mut guard = self.sessions.lock().expect("session registry mutex");
        guard.insert(session.id.clone(), session.clone());
        session
    }

    pub fn get(&self, id: &str) -> Option<Session> {
        let guard = self.sessions.lock().expect("session registry mutex");
        guard.get(id).cloned()
    }

    pub fn list(&self) -> Vec<Session> {
        let guard = self.sessions.lock().expect("session registry mutex");
        guard.values().cloned().collect()
    }

    /// Merges the patch and refreshes `updated_at`. Returns `false` on an
    /// unknown id.
    pub fn update(&self, id: &str, patch: SessionPatch) -> bool {
        let mut guard = self.sessions.lock().expect("session registry mutex");
        let Some(session) = guard.get_mut(id) else {
            return false;
        };
        if let Some(status) = patch.status {
            session.status = status;
        }
        if let Some(handle) = patch.resume_handle {
            session.resume_handle = Some(handle);
        }
        if let Some(cost) = patch.add_cost_usd {
            session.total_cost_usd += cost;
        }
        session.updated_at = Utc::now();
        true
    }

    pub fn append_message(&self, id: &str, message: Message) -> bool {
        let mut guard = self.sessions.lock().expect("session registry mutex");
        let Some(session) = guard.get_mut(id) else {
            return false;
        };
        session.messages.push(message);
        session.updated_at = Utc::now();
        true
    }

    /// The coordinator's exclusivity guard: checks `Idle` and flips to
    /// `Running` in one critical section, so two concurrent send-prompt
    /// requests can never both start a turn. Returns the pre-transition
    /// snapshot.
    pub fn begin_turn(&self, id: &str) -> Result<Session, ServiceError> {
        let mut guard = self.sessions.lock().expect("session registry mutex");
        let Some(session) = guard.get_mut(id) else {
            return Err(ServiceError::SessionNotFound(id.to_string()));
        };
        if session.status == SessionStatus::Running {
            return Err(ServiceError::SessionBusy(id.to_string()));
        }
        let snapshot = session.clone();
        session.status = SessionStatus::Running;
        session.updated_at = Utc::now();
        Ok(snapshot)
    }

    /// Removes the session, reporting whether it existed. Cancelling any
    /// in-flight turn first is the coordinator's responsibility.
    pub fn remove(&self, id: &str) -> bool {
        let mut guard = self.sessions.lock().expect("session registry mutex");
        guard.remove(id).is_some()
    }
}
