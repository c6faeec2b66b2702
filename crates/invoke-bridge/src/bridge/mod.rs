//! Wire layer between page-side callers and the host runtime.
//!
//! # Architecture
//!
//! - **protocol**: Message types (Envelope out, Inbound/Notification back)
//! - **codec**: JSON framing codecs for AsyncRead/AsyncWrite
//! - **transport**: the one-way `Transport` seam and stream adapters

pub mod codec;
pub mod protocol;
pub mod transport;
