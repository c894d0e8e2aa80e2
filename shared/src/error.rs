//! Failure causes reported for a command submission

use std::time::Duration;
use thiserror::Error;

/// Outcome of one command submission: the reply text or the reason it failed
pub type CommandOutcome = Result<String, CommandError>;

/// Why a command did not produce a reply
///
/// Causes carry rendered messages instead of source errors so that a single
/// outcome can be cloned onto the result stream for every observer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The session never reached `Ready`
    #[error("Transport setup failed: {0}")]
    TransportSetup(String),

    /// The local socket refused the datagram
    #[error("Send failed: {0}")]
    Send(String),

    /// No usable reply arrived
    #[error("Receive failed: {0}")]
    Receive(ReceiveFailure),

    /// The reply was not valid UTF-8 text
    #[error("Reply could not be decoded: {0}")]
    Decode(String),

    /// The session was cancelled before the reply arrived
    #[error("Session cancelled")]
    Cancelled,

    /// The command was rejected locally before anything was sent
    #[error("Invalid command: {0}")]
    InvalidCommand(String),
}

/// Cause of a receive failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReceiveFailure {
    #[error("no reply within {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Transport(String),
}

impl CommandError {
    /// Whether this failure came from the session being cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CommandError::Cancelled)
    }

    /// Whether the submission timed out waiting for a reply
    pub fn is_timeout(&self) -> bool {
        matches!(self, CommandError::Receive(ReceiveFailure::Timeout(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CommandError::Receive(ReceiveFailure::Timeout(Duration::from_secs(2)));
        assert_eq!(err.to_string(), "Receive failed: no reply within 2s");
        assert!(err.is_timeout());

        let err = CommandError::Send("Network is unreachable".into());
        assert_eq!(err.to_string(), "Send failed: Network is unreachable");
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_cancelled() {
        assert!(CommandError::Cancelled.is_cancelled());
        assert!(!CommandError::Cancelled.is_timeout());
    }
}
