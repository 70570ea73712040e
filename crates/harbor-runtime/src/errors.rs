use thiserror::Error;

/// Top-level error type for the harbor-runtime crate.
///
/// These are *hard* failures of a runtime invocation. A turn that finishes
/// with an error result is not a `RuntimeError`; it arrives as a terminal
/// [`AgentEvent::Completed`](crate::AgentEvent::Completed) with the error
/// flag set.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime invocation failed: {0}")]
    Invocation(String),
    #[error("runtime stream failed: {0}")]
    Stream(String),
    #[error("resume handle rejected: {0}")]
    ResumeExpired(String),
    #[error("turn aborted")]
    Aborted,
}

/// Substrings a text-only runtime uses to report an unknown conversation.
const EXPIRED_RESUME_MARKERS: [&str; 2] = ["not found", "No conversation"];

impl RuntimeError {
    /// Whether this failure means the supplied resume handle is no longer
    /// recognized by the runtime.
    ///
    /// The structured [`RuntimeError::ResumeExpired`] variant is the primary
    /// signal. Runtimes that only report free text are matched against the
    /// known marker substrings instead.
    pub fn indicates_expired_resume(&self) -> bool {
        match self {
            Self::ResumeExpired(_) => true,
            Self::Invocation(message) | Self::Stream(message) => EXPIRED_RESUME_MARKERS
                .iter()
                .any(|marker| message.contains(marker)),
            Self::Aborted => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_expiry_is_detected() {
        let err = RuntimeError::ResumeExpired("handle abc".to_string());
        assert!(err.indicates_expired_resume());
    }

    #[test]
    fn marker_substrings_are_detected_on_text_failures() {
        let err = RuntimeError::Invocation("No conversation found with ID abc".to_string());
        assert!(err.indicates_expired_resume());

        let err = RuntimeError::Stream("session not found".to_string());
        assert!(err.indicates_expired_resume());
    }

    #[test]
    fn unrelated_failures_are_not_expiry() {
        let err = RuntimeError::Invocation("connection refused".to_string());
        assert!(!err.indicates_expired_resume());
        assert!(!RuntimeError::Aborted.indicates_expired_resume());
    }
}
