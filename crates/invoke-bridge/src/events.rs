//! Host → page named events.
//!
//! The host can push payloads under an event name without any request. Each
//! name gets a broadcast channel on first subscription; channels whose last
//! subscriber is gone are dropped on the next publish.

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::config::MAX_EVENT_CAPACITY;

pub(crate) struct EventHub {
    channels: DashMap<String, broadcast::Sender<Value>>,
    capacity: usize,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        if capacity > MAX_EVENT_CAPACITY {
            tracing::warn!(
                event_capacity = capacity,
                max = MAX_EVENT_CAPACITY,
                "Clamping event capacity"
            );
        }
        Self {
            channels: DashMap::new(),
            capacity: capacity.clamp(1, MAX_EVENT_CAPACITY),
        }
    }

    pub fn subscribe(&self, event: &str) -> broadcast::Receiver<Value> {
        self.channels
            .entry(event.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Fan a payload out to current subscribers. Returns how many received it.
    pub fn publish(&self, event: &str, data: Value) -> usize {
        let delivered = match self.channels.get(event) {
            Some(tx) => tx.send(data).unwrap_or(0),
            None => 0,
        };
        if delivered == 0 {
            self.channels
                .remove_if(event, |_, tx| tx.receiver_count() == 0);
        }
        delivered
    }

    pub fn subscriber_count(&self, event: &str) -> usize {
        self.channels
            .get(event)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    pub fn clear(&self) {
        self.channels.clear();
    }
}
