//! Error taxonomy for invocations and bridge setup.

use serde::Serialize;

use crate::bridge::transport::TransportError;

/// Coarse error category, for callers that branch on failure type instead of
/// message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The host ran (or tried to run) the command and reported an error.
    Host,
    /// No outcome arrived in time.
    Timeout,
    /// The call was rejected before anything was sent.
    InvalidInput,
    /// The envelope could not be handed to the transport.
    Transport,
    /// The bridge is closed or absent.
    Closed,
}

/// Failure of a single `invoke` call.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    /// Host-reported error, propagated verbatim.
    #[error("{0}")]
    Host(String),
    #[error("Timeout")]
    Timeout,
    #[error("command name must not be empty")]
    InvalidCommand,
    #[error("timeout must be greater than zero")]
    InvalidTimeout,
    #[error("failed to encode envelope: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to post message: {0}")]
    Transport(#[from] TransportError),
    #[error("bridge closed")]
    Closed,
    #[error("no bridge installed")]
    NotInstalled,
}

impl InvokeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Host(_) => ErrorKind::Host,
            Self::Timeout => ErrorKind::Timeout,
            Self::InvalidCommand | Self::InvalidTimeout | Self::Encode(_) => ErrorKind::InvalidInput,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Closed | Self::NotInstalled => ErrorKind::Closed,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("bridge must be created inside a tokio runtime")]
    NoRuntime,
    #[error("a bridge is already installed")]
    AlreadyInstalled,
}
