// ── Core error types ──
//
// Errors surfaced by the coordinator. Callers never see raw reply parse
// failures; the `From<networkhd_api::Error>` impl folds transport-layer
// errors into coordinator-level variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to controller at {host}: {reason}")]
    ConnectionFailed { host: String, reason: String },

    #[error("Coordinator setup failed: {reason}")]
    SetupFailed { reason: String },

    #[error("Coordinator has no data yet")]
    NotReady,

    #[error("Coordinator is shutting down")]
    ShuttingDown,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Device not found: {identifier}")]
    DeviceNotFound { identifier: String },

    #[error("Device {identifier} is not a {expected}")]
    WrongRole { identifier: String, expected: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Controller rejected command: {message}")]
    Rejected { message: String },

    // ── Transport errors (wrapped, not exposed raw) ──────────────────
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        /// `true` when the session itself was lost.
        connection_lost: bool,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<networkhd_api::Error> for CoreError {
    fn from(err: networkhd_api::Error) -> Self {
        match err {
            networkhd_api::Error::Command { command, message } => CoreError::Rejected {
                message: format!("{command}: {message}"),
            },
            other => CoreError::Transport {
                connection_lost: other.is_connection_error(),
                message: other.to_string(),
            },
        }
    }
}
