//! invoke-bridge: correlated command invocation over one-way webview IPC.
//!
//! Pages can only post strings to their host. This crate turns that into
//! request/response: each `invoke` carries a correlation id, the host answers
//! with an outcome addressed to it, and the caller awaits an [`Invocation`]
//! that resolves with the host's result, its error, or a timeout.

pub mod bridge;
mod correlation;
mod events;
mod invocation;
mod pending;

pub mod config;
pub mod error;
pub mod global;
pub mod logging;
pub mod service;

pub use bridge::protocol::{CorrelationId, Envelope, Inbound, Notification};
pub use bridge::transport::{
    ChannelTransport, FnTransport, Transport, TransportError, spawn_framed_writer,
    spawn_inbound_reader,
};
pub use config::BridgeConfig;
pub use correlation::{CorrelationIdGenerator, IdSource, SystemIdSource};
pub use error::{BridgeError, ErrorKind, InvokeError};
pub use global::BRIDGE_NAME;
pub use invocation::Invocation;
pub use service::Bridge;
