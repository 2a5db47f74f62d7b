//! Error types for the reservation wizard.

use thiserror::Error;

/// Result type alias for wizard operations.
pub type Result<T> = std::result::Result<T, WizardError>;

/// Error taxonomy for the reservation flow.
///
/// Every network-origin error is converted into one of these at the call
/// site and then folded into UI state by the reducers; nothing propagates
/// further up.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WizardError {
    /// Client-local validation failure; blocking, never touches the network.
    #[error("{0}")]
    Validation(String),

    /// The requested reservation does not exist (HTTP 404).
    #[error("Reservation not found")]
    NotFound,

    /// The server reports an already-active reservation (HTTP 409).
    ///
    /// This is a reconciliation trigger, not a terminal failure: when the
    /// referenced reservation can be fetched, the flow treats it exactly
    /// like a successful submission.
    #[error("An active reservation already exists")]
    Conflict {
        /// Id of the existing active reservation, when the server names it.
        reservation_id: Option<String>,
    },

    /// The request exceeded the client-side timeout.
    #[error("Request timed out")]
    Timeout,

    /// Connection-level failure (DNS, TLS, resets, malformed body).
    #[error("Network error: {0}")]
    Transport(String),

    /// Any other non-2xx response.
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Server-provided message, or a fixed fallback.
        message: String,
    },

    /// Local resumption-store I/O failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl WizardError {
    /// Returns `true` for failures worth retrying (polling keeps going,
    /// one-shot fetches surface a retryable message).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Transport(_))
    }

    /// The message to show the user, preferring server-provided text.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Server { message, .. } if !message.is_empty() => message.clone(),
            Self::Timeout => crate::constants::messages::REQUEST_TIMED_OUT.to_string(),
            _ => fallback.to_string(),
        }
    }
}
