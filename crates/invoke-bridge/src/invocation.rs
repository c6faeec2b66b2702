//! Caller-side handle of one in-flight invocation.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use serde_json::Value;
use tokio::sync::oneshot;

use crate::bridge::protocol::CorrelationId;
use crate::error::InvokeError;
use crate::pending::{PendingTable, Settlement};

/// Future resolving to the outcome of an `invoke` call.
///
/// The envelope has already been sent when this handle exists. Awaiting it
/// yields the settled result exactly once. Dropping it before settlement
/// removes the pending entry and stops its timer, so late notifications for
/// the id are ignored.
///
/// Polling again after the outcome was returned yields
/// `Err(InvokeError::Closed)`. The outcome is not kept for a second read.
#[must_use = "the outcome is only observable by awaiting the invocation"]
pub struct Invocation {
    id: CorrelationId,
    rx: oneshot::Receiver<Settlement>,
    pending: Arc<PendingTable>,
    done: bool,
}

impl Invocation {
    pub(crate) fn new(
        id: CorrelationId,
        rx: oneshot::Receiver<Settlement>,
        pending: Arc<PendingTable>,
    ) -> Self {
        Self {
            id,
            rx,
            pending,
            done: false,
        }
    }

    pub fn id(&self) -> &CorrelationId {
        &self.id
    }

    /// Whether the invocation is still waiting for an outcome or timeout.
    pub fn is_pending(&self) -> bool {
        !self.done && self.pending.contains(self.id.as_str())
    }
}

impl Future for Invocation {
    type Output = Result<Value, InvokeError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.done {
            // Polled again after completion; there is no second outcome.
            return Poll::Ready(Err(InvokeError::Closed));
        }
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => {
                self.done = true;
                Poll::Ready(outcome)
            }
            Poll::Ready(Err(_)) => {
                self.done = true;
                Poll::Ready(Err(InvokeError::Closed))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for Invocation {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        if let Some(entry) = self.pending.take(self.id.as_str()) {
            tracing::trace!(
                request_id = %self.id,
                command = entry.command(),
                "Invocation dropped before settlement"
            );
            entry.abandon();
        }
    }
}

impl std::fmt::Debug for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invocation")
            .field("id", &self.id)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}
