//! Outbound transport and stream plumbing.
//!
//! The bridge only needs a synchronous "post this JSON string" primitive. That
//! matches webview IPC handles (`window.ipc.postMessage`) directly, and stream
//! transports are adapted onto it with a writer task:
//! - **ChannelTransport**: unbounded mpsc queue, drained by whoever owns the receiver
//! - **FnTransport**: wraps a closure (embedding shims, test doubles)
//! - **spawn_framed_writer**: channel → length-prefixed frames on any AsyncWrite
//! - **spawn_inbound_reader**: length-prefixed `Inbound` frames → `Bridge`

use std::io;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};

use super::codec::{JsonCodec, PayloadCodec};
use super::protocol::Inbound;
use crate::service::Bridge;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport closed")]
    Closed,
    #[error("transport i/o error: {0}")]
    Io(#[from] io::Error),
}

/// One-way page → host channel. Exactly one call per sent envelope.
pub trait Transport: Send + Sync {
    fn post_message(&self, payload: String) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn post_message(&self, payload: String) -> Result<(), TransportError> {
        (**self).post_message(payload)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn post_message(&self, payload: String) -> Result<(), TransportError> {
        (**self).post_message(payload)
    }
}

/// Transport backed by an unbounded tokio channel.
#[derive(Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn from_sender(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl Transport for ChannelTransport {
    fn post_message(&self, payload: String) -> Result<(), TransportError> {
        self.tx.send(payload).map_err(|_| TransportError::Closed)
    }
}

/// Transport that hands each payload to a closure.
pub struct FnTransport<F> {
    f: F,
}

impl<F> FnTransport<F>
where
    F: Fn(String) -> Result<(), TransportError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Transport for FnTransport<F>
where
    F: Fn(String) -> Result<(), TransportError> + Send + Sync,
{
    fn post_message(&self, payload: String) -> Result<(), TransportError> {
        (self.f)(payload)
    }
}

/// Spawn a task writing posted payloads as length-prefixed frames.
///
/// The task ends with `Ok(())` once every `ChannelTransport` clone is dropped,
/// or with the first write error. After a write error, posting fails with
/// `TransportError::Closed`.
pub fn spawn_framed_writer<W>(writer: W) -> (ChannelTransport, JoinHandle<io::Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (transport, mut rx) = ChannelTransport::new();
    let handle = tokio::spawn(async move {
        let mut framed = FramedWrite::new(writer, PayloadCodec::new());
        while let Some(payload) = rx.recv().await {
            if let Err(e) = framed.send(payload).await {
                tracing::error!(error = %e, "Failed to write outbound frame");
                return Err(e);
            }
        }
        tracing::debug!("Outbound writer task exiting");
        Ok(())
    });
    (transport, handle)
}

/// Spawn a task feeding length-prefixed `Inbound` frames into the bridge.
///
/// Stops at end of stream or on the first read/decode error.
pub fn spawn_inbound_reader<R>(reader: R, bridge: Arc<Bridge>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut framed = FramedRead::new(reader, JsonCodec::<Inbound>::new());
        loop {
            match framed.next().await {
                Some(Ok(message)) => {
                    bridge.deliver_inbound(message);
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Inbound channel error");
                    break;
                }
                None => {
                    tracing::debug!("Inbound channel closed");
                    break;
                }
            }
        }
        tracing::debug!("Inbound reader task exiting");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn channel_transport_queues_payloads() {
        let (transport, mut rx) = ChannelTransport::new();
        transport.post_message("a".to_string()).unwrap();
        transport.post_message("b".to_string()).unwrap();

        assert_eq!(rx.try_recv().unwrap(), "a");
        assert_eq!(rx.try_recv().unwrap(), "b");
    }

    #[test]
    fn channel_transport_reports_closed() {
        let (transport, rx) = ChannelTransport::new();
        drop(rx);

        assert!(transport.is_closed());
        assert!(matches!(
            transport.post_message("x".to_string()),
            Err(TransportError::Closed)
        ));
    }

    #[test]
    fn fn_transport_calls_closure() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let transport = FnTransport::new(move |payload| {
            sink.lock().unwrap().push(payload);
            Ok(())
        });

        transport.post_message("hello".to_string()).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["hello".to_string()]);
    }

    #[test]
    fn arc_transport_delegates() {
        let (transport, mut rx) = ChannelTransport::new();
        let shared: Arc<dyn Transport> = Arc::new(transport);
        shared.post_message("x".to_string()).unwrap();
        assert_eq!(rx.try_recv().unwrap(), "x");
    }

    #[tokio::test]
    async fn framed_writer_emits_length_prefixed_frames() {
        let (client, server) = tokio::io::duplex(1024);
        let (transport, handle) = spawn_framed_writer(client);

        transport
            .post_message(r#"{"kind":"event","event":"ready","args":[]}"#.to_string())
            .unwrap();
        drop(transport);
        handle.await.unwrap().unwrap();

        let mut frames = FramedRead::new(server, PayloadCodec::new());
        let frame = frames.next().await.unwrap().unwrap();
        assert_eq!(frame, r#"{"kind":"event","event":"ready","args":[]}"#);
        assert!(frames.next().await.is_none());
    }
}
