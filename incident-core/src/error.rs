use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why the role policy refused a command. Never collapsed into a generic
/// failure; clients render the exact reason.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DenialReason {
    WrongRole,
    WrongStatus,
    NotAssigned,
    LogReportIncomplete,
}

/// Every way a transition can fail. All recoverable: the caller re-fetches
/// the incident and re-renders available actions.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum TransitionError {
    /// Payload inconsistent with the command tag; never reaches the policy.
    #[error("invalid command payload: {detail}")]
    InvalidCommandPayload { detail: String },
    /// Role/status/assignment mismatch.
    #[error("denied: {0:?}")]
    Denied(DenialReason),
    /// Registry says the target is unreachable from the current status.
    /// Defensive; does not occur while policy and registry agree.
    #[error("transition is not reachable from the current status")]
    IllegalTransition,
    /// Administrative close attempted before the log report was submitted.
    #[error("log report has not been submitted")]
    LogReportIncomplete,
    /// The incident already moved past this command (concurrent delivery).
    #[error("incident has already moved past this command")]
    Stale,
}

impl TransitionError {
    pub fn invalid(detail: impl Into<String>) -> TransitionError {
        TransitionError::InvalidCommandPayload {
            detail: detail.into(),
        }
    }
}
