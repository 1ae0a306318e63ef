use thiserror::Error;

use crate::backend_client::TransportError;
use crate::models::ticket::TicketId;

/// Failures surfaced to user-initiated operations. Background work never
/// returns these; it logs and keeps the last good cached value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrchestratorError {
    #[error("No applications known for ticket {0}; filtering an empty set is not allowed")]
    NoApplications(TicketId),

    #[error("Filtering is already running for ticket {0}")]
    AlreadyRunning(TicketId),

    #[error("A start request for ticket {0} is already in flight")]
    TriggerInFlight(TicketId),

    #[error("No top candidates available for ticket {0}; run AI filtering first")]
    NoTopCandidates(TicketId),

    #[error("Backend rejected the request: {0}")]
    Rejected(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl OrchestratorError {
    /// Text suitable for showing to a recruiter as-is.
    pub fn user_message(&self) -> String {
        match self {
            OrchestratorError::Transport(TransportError::Http { status: 403, .. }) => {
                "Access denied. Check your API key permissions.".to_string()
            }
            OrchestratorError::Transport(TransportError::Http { status: 404, .. }) => {
                "API endpoint not found. Check that the backend exposes this endpoint.".to_string()
            }
            OrchestratorError::Transport(TransportError::Http { status, .. }) if *status >= 500 => {
                format!("Server error ({status}): the backend encountered an internal error.")
            }
            OrchestratorError::Transport(TransportError::Http { status, .. }) => {
                format!("Request failed with status {status}.")
            }
            OrchestratorError::Transport(TransportError::Timeout(_)) => {
                "Request timed out: the backend took too long to respond. Please try again."
                    .to_string()
            }
            OrchestratorError::Transport(TransportError::Network(detail)) => {
                format!("Network error: {detail}")
            }
            OrchestratorError::Transport(TransportError::Malformed(detail)) => {
                format!("Unexpected response from the backend: {detail}")
            }
            other => other.to_string(),
        }
    }
}
