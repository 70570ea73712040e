use thiserror::Error;

/// Errors the lifecycle coordinator reports to its caller.
///
/// Runtime failures never appear here: the turn runner absorbs them into
/// the turn outcome so the completion path stays uniform.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("session not found: {0}")]
    SessionNotFound(String),
    #[error("session is busy: {0}")]
    SessionBusy(String),
}
