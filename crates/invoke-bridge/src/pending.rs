//! Pending invocation table.
//!
//! Every in-flight `invoke` owns exactly one entry, keyed by its correlation id.
//! Settlement is remove-then-act: whichever path (outcome, timer, dropped
//! handle, bridge close) takes the entry first settles it, and every later path
//! finds nothing. Lock-free concurrent access via DashMap.

use std::time::Instant;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;

use crate::bridge::protocol::CorrelationId;
use crate::error::InvokeError;

pub(crate) type Settlement = Result<Value, InvokeError>;

pub(crate) struct PendingEntry {
    command: String,
    started_at: Instant,
    sender: oneshot::Sender<Settlement>,
    timer: Option<AbortHandle>,
}

impl PendingEntry {
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    /// Stop the timer and hand the outcome to the waiting caller.
    ///
    /// Returns `false` if the caller already went away.
    pub fn settle(self, outcome: Settlement) -> bool {
        if let Some(timer) = self.timer {
            timer.abort();
        }
        self.sender.send(outcome).is_ok()
    }

    /// Stop the timer without settling. The receiver observes a closed channel.
    pub fn abandon(self) {
        if let Some(timer) = self.timer {
            timer.abort();
        }
    }
}

#[derive(Default)]
pub(crate) struct PendingTable {
    entries: DashMap<CorrelationId, PendingEntry>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        id: CorrelationId,
        command: impl Into<String>,
    ) -> oneshot::Receiver<Settlement> {
        let (sender, receiver) = oneshot::channel();
        let entry = PendingEntry {
            command: command.into(),
            started_at: Instant::now(),
            sender,
            timer: None,
        };
        if let Some(previous) = self.entries.insert(id.clone(), entry) {
            // Generator ids never repeat; a collision means a foreign id was reused.
            tracing::error!(request_id = %id, "Replaced pending invocation with duplicate id");
            previous.abandon();
        }
        receiver
    }

    /// Attach the timeout task to its entry.
    ///
    /// If the entry is already gone the timer is aborted on the spot.
    pub fn attach_timer(&self, id: &str, timer: AbortHandle) -> bool {
        match self.entries.get_mut(id) {
            Some(mut entry) => {
                entry.timer = Some(timer);
                true
            }
            None => {
                timer.abort();
                false
            }
        }
    }

    /// Remove an entry. The single point where an invocation changes owner.
    pub fn take(&self, id: &str) -> Option<PendingEntry> {
        self.entries.remove(id).map(|(_, entry)| entry)
    }

    pub fn drain(&self) -> Vec<(CorrelationId, PendingEntry)> {
        let ids: Vec<CorrelationId> = self.entries.iter().map(|e| e.key().clone()).collect();
        ids.into_iter()
            .filter_map(|id| self.entries.remove(&id))
            .collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
