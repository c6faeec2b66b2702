//! Bridge configuration.

use std::sync::Arc;
use std::time::Duration;

use crate::correlation::{IdSource, SystemIdSource};

/// Timeout applied when `invoke` is called without an explicit one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Buffered payloads per host event before slow subscribers start lagging.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Upper bound on `event_capacity`. Broadcast buffers are allocated up front.
pub const MAX_EVENT_CAPACITY: usize = 65_536;

pub const TIMEOUT_ENV: &str = "INVOKE_BRIDGE_TIMEOUT_MS";
pub const EVENT_CAPACITY_ENV: &str = "INVOKE_BRIDGE_EVENT_CAPACITY";

#[derive(Clone)]
pub struct BridgeConfig {
    pub default_timeout: Duration,
    pub event_capacity: usize,
    pub id_source: Arc<dyn IdSource>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            default_timeout: DEFAULT_TIMEOUT,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            id_source: Arc::new(SystemIdSource),
        }
    }
}

impl BridgeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `INVOKE_BRIDGE_TIMEOUT_MS` and
    /// `INVOKE_BRIDGE_EVENT_CAPACITY`. Unparseable or zero values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(ms) = env_positive(TIMEOUT_ENV) {
            config.default_timeout = Duration::from_millis(ms);
        }
        if let Some(capacity) = env_positive(EVENT_CAPACITY_ENV) {
            config.event_capacity = capacity as usize;
        }
        config
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    pub fn with_id_source(mut self, source: Arc<dyn IdSource>) -> Self {
        self.id_source = source;
        self
    }
}

impl std::fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("default_timeout", &self.default_timeout)
            .field("event_capacity", &self.event_capacity)
            .finish_non_exhaustive()
    }
}

fn env_positive(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => {
            tracing::warn!(var = name, value = %raw, "Ignoring invalid bridge setting");
            None
        }
        Ok(v) => Some(v),
    }
}
