//! Failure taxonomy for a send.

use thiserror::Error;

use crate::events::HandshakePhase;
use crate::transport::TransportError;

#[derive(Error, Debug)]
pub enum SendError {
    #[error("No hello string configured, refusing to send")]
    ConfigurationMissing,

    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Failed to send command ({phase}): {source}")]
    Transport {
        phase: HandshakePhase,
        #[source]
        source: TransportError,
    },

    #[error("Server rejected the command (status {status:?})")]
    ProtocolMismatch { status: String },
}

impl SendError {
    /// Whether this failure happened before any network activity.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            SendError::ConfigurationMissing
                | SendError::UnknownDevice(_)
                | SendError::UnknownCommand(_)
        )
    }
}

/// Result of one send, as a plain value.
#[derive(Debug)]
pub enum SendOutcome {
    /// The server answered `OK`.
    Delivered,
    /// The send failed; nothing was raised.
    Failed(SendError),
}

impl SendOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SendOutcome::Delivered)
    }

    /// Human-readable reason for a failure.
    pub fn advisory(&self) -> Option<String> {
        match self {
            SendOutcome::Delivered => None,
            SendOutcome::Failed(e) => Some(e.to_string()),
        }
    }

    pub fn error(&self) -> Option<&SendError> {
        match self {
            SendOutcome::Delivered => None,
            SendOutcome::Failed(e) => Some(e),
        }
    }
}

impl From<Result<(), SendError>> for SendOutcome {
    fn from(result: Result<(), SendError>) -> Self {
        match result {
            Ok(()) => SendOutcome::Delivered,
            Err(e) => SendOutcome::Failed(e),
        }
    }
}

impl From<SendOutcome> for bool {
    fn from(outcome: SendOutcome) -> bool {
        outcome.is_success()
    }
}
