use thiserror::Error;

/// Top-level error type for the `networkhd-api` crate.
///
/// Covers every failure mode of talking to a NetworkHD controller:
/// session lifecycle, command execution, and reply decoding.
/// `networkhd-core` maps these into coordinator-level errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Session ─────────────────────────────────────────────────────
    /// A command was issued while no session is open.
    #[error("Not connected to the NetworkHD controller")]
    NotConnected,

    /// Opening or using the underlying session failed.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The controller did not answer within the configured timeout.
    #[error("Command timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The session layer reported a failure unrelated to connectivity.
    #[error("Session error: {0}")]
    Session(String),

    // ── Controller replies ──────────────────────────────────────────
    /// The controller rejected a command.
    #[error("Command `{command}` failed: {message}")]
    Command { command: String, message: String },

    /// A reply did not have the expected text layout.
    #[error("Failed to parse {what}: {message}")]
    Parse { what: &'static str, message: String },

    /// JSON embedded in a reply could not be decoded, with the raw body
    /// for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the session is (or should be treated as) gone,
    /// meaning a reconnect might resolve the failure.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::NotConnected | Self::Connection(_) | Self::Timeout { .. }
        )
    }

    /// Returns `true` if the controller answered but refused the command.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Command { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_errors_are_classified() {
        assert!(Error::NotConnected.is_connection_error());
        assert!(Error::Connection("reset by peer".into()).is_connection_error());
        assert!(Error::Timeout { timeout_secs: 10 }.is_connection_error());
        assert!(!Error::Session("channel closed".into()).is_connection_error());
        assert!(
            !Error::Parse {
                what: "matrix",
                message: "bad line".into()
            }
            .is_connection_error()
        );
    }

    #[test]
    fn rejected_commands_are_not_connection_errors() {
        let err = Error::Command {
            command: "matrix set tx1 rx1".into(),
            message: "unknown device".into(),
        };
        assert!(err.is_rejected());
        assert!(!err.is_connection_error());
        assert_eq!(
            err.to_string(),
            "Command `matrix set tx1 rx1` failed: unknown device"
        );
    }
}
