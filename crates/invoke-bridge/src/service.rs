//! Bridge: command invocation with correlated, timed-out replies.
//!
//! This service owns:
//! - The outbound transport (shared by all invocations)
//! - The pending table (one entry per in-flight invocation)
//! - Timer tasks (one per invocation, aborted on settlement)
//! - Host event subscriptions
//!
//! Flow of one `invoke`:
//! 1. Generate a correlation id
//! 2. Register the pending entry and start its timer
//! 3. Post the command envelope
//! 4. Return an `Invocation` the caller awaits
//!
//! The host answers through `deliver`, `deliver_inbound` or `deliver_json`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::broadcast;

use crate::bridge::protocol::{CorrelationId, Envelope, Inbound, Notification};
use crate::bridge::transport::Transport;
use crate::config::BridgeConfig;
use crate::correlation::CorrelationIdGenerator;
use crate::error::{BridgeError, InvokeError};
use crate::events::EventHub;
use crate::invocation::Invocation;
use crate::pending::PendingTable;

pub struct Bridge {
    transport: Arc<dyn Transport>,
    pending: Arc<PendingTable>,
    events: EventHub,
    ids: CorrelationIdGenerator,
    default_timeout: Duration,
    runtime: Handle,
    closed: AtomicBool,
}

impl Bridge {
    /// Create a bridge with default configuration.
    ///
    /// Must be called inside a tokio runtime; timers are spawned on it.
    pub fn new(transport: impl Transport + 'static) -> Result<Self, BridgeError> {
        Self::with_config(transport, BridgeConfig::default())
    }

    pub fn with_config(
        transport: impl Transport + 'static,
        config: BridgeConfig,
    ) -> Result<Self, BridgeError> {
        let runtime = Handle::try_current().map_err(|_| BridgeError::NoRuntime)?;
        tracing::debug!(
            default_timeout_ms = config.default_timeout.as_millis() as u64,
            event_capacity = config.event_capacity,
            "Creating invoke bridge"
        );
        Ok(Self {
            transport: Arc::new(transport),
            pending: Arc::new(PendingTable::new()),
            events: EventHub::new(config.event_capacity),
            ids: CorrelationIdGenerator::new(config.id_source),
            default_timeout: config.default_timeout,
            runtime,
            closed: AtomicBool::new(false),
        })
    }

    /// Invoke a host command with the default timeout.
    pub fn invoke(&self, command: &str, args: Vec<Value>) -> Result<Invocation, InvokeError> {
        self.invoke_with_timeout(command, args, self.default_timeout)
    }

    /// Invoke a host command.
    ///
    /// The envelope is sent before this returns. Errors returned here mean
    /// nothing is pending; errors from awaiting the `Invocation` are the
    /// host-reported failure or `InvokeError::Timeout`.
    pub fn invoke_with_timeout(
        &self,
        command: &str,
        args: Vec<Value>,
        timeout: Duration,
    ) -> Result<Invocation, InvokeError> {
        if self.is_closed() {
            return Err(InvokeError::Closed);
        }
        if command.is_empty() {
            return Err(InvokeError::InvalidCommand);
        }
        if timeout.is_zero() {
            return Err(InvokeError::InvalidTimeout);
        }

        let request_id = self.ids.next_id();
        let payload = Envelope::command(command, args, request_id.clone()).to_json()?;

        let rx = self.pending.register(request_id.clone(), command);
        let timer = self.runtime.spawn(expire_after(
            Arc::clone(&self.pending),
            request_id.clone(),
            timeout,
        ));
        self.pending
            .attach_timer(request_id.as_str(), timer.abort_handle());

        // A close that ran after the first check has already drained the table.
        if self.is_closed() {
            if let Some(entry) = self.pending.take(request_id.as_str()) {
                entry.abandon();
            }
            tracing::debug!(%request_id, command, "Bridge closed during invoke");
            return Err(InvokeError::Closed);
        }

        // A synchronous host may deliver the outcome from inside post_message;
        // the entry is registered by now, so that outcome lands in `rx`.
        if let Err(e) = self.transport.post_message(payload) {
            if let Some(entry) = self.pending.take(request_id.as_str()) {
                entry.abandon();
            }
            tracing::debug!(%request_id, command, error = %e, "Failed to post command envelope");
            return Err(InvokeError::Transport(e));
        }

        tracing::debug!(
            %request_id,
            command,
            timeout_ms = timeout.as_millis() as u64,
            "Sent command envelope"
        );
        Ok(Invocation::new(request_id, rx, Arc::clone(&self.pending)))
    }

    /// Send a fire-and-forget event to the host.
    pub fn emit(&self, event: &str, args: Vec<Value>) -> Result<(), InvokeError> {
        if self.is_closed() {
            return Err(InvokeError::Closed);
        }
        if event.is_empty() {
            return Err(InvokeError::InvalidCommand);
        }
        let payload = Envelope::event(event, args).to_json()?;
        self.transport.post_message(payload)?;
        tracing::trace!(event, "Sent event envelope");
        Ok(())
    }

    /// Settle the invocation addressed by `request_id`.
    ///
    /// Returns `false` for unknown ids: never issued, already settled, timed
    /// out, or abandoned by the caller.
    pub fn deliver(&self, request_id: &str, notification: Notification) -> bool {
        let Some(entry) = self.pending.take(request_id) else {
            tracing::debug!(request_id, "Ignoring outcome for unknown or settled invocation");
            return false;
        };

        let failed = notification.is_failure();
        tracing::debug!(
            request_id,
            command = entry.command(),
            elapsed_ms = entry.elapsed().as_millis() as u64,
            failed,
            "Invocation settled"
        );
        if !entry.settle(notification.into_result()) {
            tracing::trace!(request_id, "Caller dropped before outcome was read");
        }
        true
    }

    /// Route a decoded host message. Returns whether anything consumed it.
    pub fn deliver_inbound(&self, message: Inbound) -> bool {
        match message {
            Inbound::Outcome { request_id, detail } => self.deliver(request_id.as_str(), detail),
            Inbound::Event { event, data } => {
                let delivered = self.events.publish(&event, data);
                tracing::trace!(%event, delivered, "Host event published");
                delivered > 0
            }
        }
    }

    /// Decode and route a JSON host message.
    pub fn deliver_json(&self, text: &str) -> Result<bool, serde_json::Error> {
        let message: Inbound = serde_json::from_str(text)?;
        Ok(self.deliver_inbound(message))
    }

    /// Receive payloads the host pushes under `event`.
    pub fn subscribe(&self, event: &str) -> broadcast::Receiver<Value> {
        self.events.subscribe(event)
    }

    /// Fail every pending invocation with `InvokeError::Closed` and reject new ones.
    ///
    /// Returns the number of invocations that were still pending.
    pub fn close(&self) -> usize {
        self.closed.store(true, Ordering::SeqCst);
        let drained = self.pending.drain();
        let count = drained.len();
        for (request_id, entry) in drained {
            tracing::debug!(%request_id, command = entry.command(), "Failing invocation: bridge closed");
            entry.settle(Err(InvokeError::Closed));
        }
        self.events.clear();
        tracing::info!(failed_pending = count, "Invoke bridge closed");
        count
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, request_id: &str) -> bool {
        self.pending.contains(request_id)
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub fn subscriber_count(&self, event: &str) -> usize {
        self.events.subscriber_count(event)
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("pending", &self.pending.len())
            .field("default_timeout", &self.default_timeout)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

async fn expire_after(pending: Arc<PendingTable>, request_id: CorrelationId, timeout: Duration) {
    tokio::time::sleep(timeout).await;
    if let Some(entry) = pending.take(request_id.as_str()) {
        tracing::debug!(
            %request_id,
            command = entry.command(),
            timeout_ms = timeout.as_millis() as u64,
            "Invocation timed out"
        );
        entry.settle(Err(InvokeError::Timeout));
    }
}
