//! Session lifecycle coordinator.
//!
//! The coordinator is the orchestration glue: it enforces at-most-one
//! running turn per session, transitions status, folds turn outcomes into
//! the store, and republishes session-level events. All collaborators are
//! injected; nothing here relies on ambient module state.

use std::path::PathBuf;
use std::sync::Arc;

use harbor_runtime::{AgentRuntime, TurnRequest};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cancel::{AbortHandle, CancelRegistry};
use crate::config::ServiceConfig;
use crate::errors::ServiceError;
use crate::events::{EventBus, ServerEvent};
use crate::message::Message;
use crate::runner::TurnRunner;
use crate::store::{Session, SessionPatch, SessionStatus, SessionStore};

/// Parsed request body the transport delivers for send-prompt and query.
/// Prompt presence is the transport's validation duty.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptRequest {
    pub prompt: String,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub max_turns: Option<u32>,
    pub max_budget_usd: Option<f64>,
}

impl PromptRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }
}

/// Completed-turn reply: always carries a result/error indication, timing,
/// and cost.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PromptReply {
    pub result: String,
    pub model: String,
    pub resume_handle: Option<String>,
    pub cost_usd: f64,
    /// Accumulated session total; absent on stateless queries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_cost_usd: Option<f64>,
    pub duration_ms: u64,
    pub is_error: bool,
}

pub struct SessionService {
    store: Arc<SessionStore>,
    registry: Arc<CancelRegistry>,
    bus: Arc<EventBus>,
    runner: TurnRunner,
    config: ServiceConfig,
}

impl SessionService {
    pub fn new(runtime: Arc<dyn AgentRuntime>, config: ServiceConfig) -> Self {
        Self::with_parts(
            runtime,
            EventBus::new(),
            Arc::new(SessionStore::new()),
            Arc::new(CancelRegistry::new()),
            config,
        )
    }

    pub fn with_parts(
        runtime: Arc<dyn AgentRuntime>,
        bus: Arc<EventBus>,
        store: Arc<SessionStore>,
        registry: Arc<CancelRegistry>,
        config: ServiceConfig,
    ) -> Self {
        let runner = TurnRunner::new(runtime, bus.clone());
        Self {
            store,
            registry,
            bus,
            runner,
            config,
        }
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<CancelRegistry> {
        &self.registry
    }

    pub fn create_session(&self, directory: Option<PathBuf>) -> Session {
        let directory = directory.unwrap_or_else(|| self.config.workspace_dir.clone());
        let session = self.store.create(directory);
        info!(session_id = %session.id, "session created");
        self.bus.publish(&ServerEvent::SessionCreated {
            session: session.clone(),
        });
        session
    }

    pub fn get_session(&self, id: &str) -> Result<Session, ServiceError> {
        self.store
            .get(id)
            .ok_or_else(|| ServiceError::SessionNotFound(id.to_string()))
    }

    pub fn list_sessions(&self) -> Vec<Session> {
        self.store.list()
    }

    pub fn session_messages(&self, id: &str) -> Result<Vec<Message>, ServiceError> {
        self.get_session(id).map(|session| session.messages)
    }

    /// Runs one turn in the session. A session already running a turn is
    /// rejected as busy before any state is touched; the in-flight turn is
    /// unaffected.
    pub async fn send_prompt(
        &self,
        id: &str,
        request: PromptRequest,
    ) -> Result<PromptReply, ServiceError> {
        let session = self.store.begin_turn(id)?;
        let abort = AbortHandle::new();
        self.registry.register(id, abort.clone());
        self.publish_session(id);
        info!(session_id = %id, "turn started");

        let turn_request = self.build_request(
            &request,
            session.resume_handle.clone(),
            session.working_directory.clone(),
        );
        let model = turn_request.model.clone();
        let outcome = self.runner.run(turn_request, Some(id), &abort).await;

        // A failed turn reports no handle and therefore never erases a
        // previously valid one.
        self.store.update(
            id,
            SessionPatch {
                status: Some(SessionStatus::Idle),
                resume_handle: outcome.resume_handle.clone(),
                add_cost_usd: Some(outcome.cost_usd),
            },
        );
        for message in &outcome.messages {
            self.store.append_message(id, message.clone());
        }
        self.registry.clear(id);
        self.publish_session(id);
        info!(
            session_id = %id,
            duration_ms = outcome.duration_ms,
            cost_usd = outcome.cost_usd,
            is_error = outcome.is_error,
            "turn completed"
        );

        let total_cost_usd = self
            .store
            .get(id)
            .map(|session| session.total_cost_usd)
            .unwrap_or(session.total_cost_usd + outcome.cost_usd);
        Ok(PromptReply {
            result: outcome.result,
            model,
            resume_handle: outcome.resume_handle,
            cost_usd: outcome.cost_usd,
            total_cost_usd: Some(total_cost_usd),
            duration_ms: outcome.duration_ms,
            is_error: outcome.is_error,
        })
    }

    /// Requests cancellation of the session's running turn. Status settles
    /// back to idle through the turn's own completion path, not here.
    pub fn abort_session(&self, id: &str) -> Result<bool, ServiceError> {
        if self.store.get(id).is_none() {
            return Err(ServiceError::SessionNotFound(id.to_string()));
        }
        let aborted = self.registry.cancel(id);
        if aborted {
            info!(session_id = %id, "abort requested");
            self.publish_session(id);
        }
        Ok(aborted)
    }

    /// Forces cancellation of any in-flight turn, then removes the session.
    pub fn delete_session(&self, id: &str) -> bool {
        self.registry.cancel(id);
        let existed = self.store.remove(id);
        if existed {
            info!(session_id = %id, "session deleted");
            self.bus.publish(&ServerEvent::SessionDeleted {
                session_id: id.to_string(),
            });
        }
        existed
    }

    /// Stateless query: one turn with no session, no resume handle, and no
    /// events published.
    pub async fn query(&self, request: PromptRequest, directory: Option<PathBuf>) -> PromptReply {
        let working_directory = directory.unwrap_or_else(|| self.config.workspace_dir.clone());
        let turn_request = self.build_request(&request, None, working_directory);
        let model = turn_request.model.clone();
        let outcome = self.runner.run(turn_request, None, &AbortHandle::new()).await;
        info!(
            duration_ms = outcome.duration_ms,
            cost_usd = outcome.cost_usd,
            is_error = outcome.is_error,
            "query completed"
        );

        PromptReply {
            result: outcome.result,
            model,
            resume_handle: outcome.resume_handle,
            cost_usd: outcome.cost_usd,
            total_cost_usd: None,
            duration_ms: outcome.duration_ms,
            is_error: outcome.is_error,
        }
    }

    fn build_request(
        &self,
        request: &PromptRequest,
        resume_handle: Option<String>,
        working_directory: PathBuf,
    ) -> TurnRequest {
        TurnRequest {
            prompt: request.prompt.clone(),
            resume_handle,
            model: request
                .model
                .clone()
                .unwrap_or_else(|| self.config.default_model.clone()),
            max_turns: request.max_turns.unwrap_or(self.config.default_max_turns),
            max_budget_usd: request
                .max_budget_usd
                .unwrap_or(self.config.default_max_budget_usd),
            system_prompt: request.system_prompt.clone(),
            working_directory,
        }
    }

    fn publish_session(&self, id: &str) {
        if let Some(session) = self.store.get(id) {
            self.bus.publish(&ServerEvent::SessionUpdated { session });
        }
    }
}
