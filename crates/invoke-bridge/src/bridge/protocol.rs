//! Wire protocol types for page-host communication.
//!
//! Two directions:
//! - **Outbound** (page → host): command invocations and fire-and-forget events
//! - **Inbound** (host → page): outcome notifications and pushed events
//!
//! The outbound channel carries no request identity of its own, so every
//! command carries a [`CorrelationId`] that the host echoes back on the outcome.

use std::borrow::Borrow;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::InvokeError;

/// Identifier pairing a command envelope with its outcome notification.
///
/// Hashes exactly like the wrapped string, so pending lookups can borrow `&str`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Borrow<str> for CorrelationId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CorrelationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for CorrelationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Messages from page to host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Envelope {
    /// Invoke a named host command. The host must answer with an outcome
    /// addressed to `request_id`.
    Command {
        command: String,
        args: Vec<Value>,
        request_id: CorrelationId,
    },

    /// Fire-and-forget notification. No outcome is expected.
    Event { event: String, args: Vec<Value> },
}

impl Envelope {
    pub fn command(command: impl Into<String>, args: Vec<Value>, request_id: CorrelationId) -> Self {
        Self::Command {
            command: command.into(),
            args,
            request_id,
        }
    }

    pub fn event(event: impl Into<String>, args: Vec<Value>) -> Self {
        Self::Event {
            event: event.into(),
            args,
        }
    }

    pub fn request_id(&self) -> Option<&CorrelationId> {
        match self {
            Self::Command { request_id, .. } => Some(request_id),
            Self::Event { .. } => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Command { command, .. } => command,
            Self::Event { event, .. } => event,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Outcome of a command, as reported by the host.
///
/// A present, non-empty `error` marks failure. Anything else is success, even
/// when `result` is missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Older hosts send the payload under `data`.
    #[serde(default, alias = "data", skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl Notification {
    pub fn success(result: Value) -> Self {
        Self {
            error: None,
            result: Some(result),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            result: None,
        }
    }

    /// The host-reported error, if this outcome is a failure.
    pub fn host_error(&self) -> Option<&str> {
        self.error.as_deref().filter(|e| !e.is_empty())
    }

    pub fn is_failure(&self) -> bool {
        self.host_error().is_some()
    }

    /// Resolve into the caller-facing result. A missing `result` becomes `null`.
    pub fn into_result(self) -> Result<Value, InvokeError> {
        match self.error {
            Some(error) if !error.is_empty() => Err(InvokeError::Host(error)),
            _ => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// Messages from host to page on framed transports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Inbound {
    Outcome {
        request_id: CorrelationId,
        #[serde(default)]
        detail: Notification,
    },

    /// Host-pushed named event, fanned out to page subscribers.
    Event {
        event: String,
        #[serde(default)]
        data: Value,
    },
}

impl Inbound {
    pub fn outcome(request_id: CorrelationId, detail: Notification) -> Self {
        Self::Outcome { request_id, detail }
    }

    pub fn event(event: impl Into<String>, data: Value) -> Self {
        Self::Event {
            event: event.into(),
            data,
        }
    }
}
