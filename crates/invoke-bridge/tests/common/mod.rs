//! Mock host for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, Once, OnceLock, Weak};

use invoke_bridge::{Bridge, BridgeConfig, Envelope, Notification, Transport, TransportError};
use serde_json::Value;

/// How the mock host answers a command.
pub type Reply = Box<dyn Fn(&str, &[Value]) -> Option<Notification> + Send + Sync>;

/// Host that records every envelope and optionally answers commands
/// synchronously from inside `post_message`.
pub struct MockHost {
    bridge: OnceLock<Weak<Bridge>>,
    sent: Mutex<Vec<String>>,
    reply: Reply,
}

impl MockHost {
    pub fn new(
        reply: impl Fn(&str, &[Value]) -> Option<Notification> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            bridge: OnceLock::new(),
            sent: Mutex::new(Vec::new()),
            reply: Box::new(reply),
        })
    }

    /// Host that never answers.
    pub fn silent() -> Arc<Self> {
        Self::new(|_, _| None)
    }

    pub fn replying(notification: Notification) -> Arc<Self> {
        Self::new(move |_, _| Some(notification.clone()))
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn envelopes(&self) -> Vec<Envelope> {
        self.sent()
            .iter()
            .map(|raw| serde_json::from_str(raw).unwrap())
            .collect()
    }
}

impl Transport for MockHost {
    fn post_message(&self, payload: String) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(payload.clone());

        let envelope: Envelope = serde_json::from_str(&payload).unwrap();
        if let Envelope::Command {
            command,
            args,
            request_id,
        } = envelope
            && let Some(notification) = (self.reply)(&command, &args)
            && let Some(bridge) = self.bridge.get().and_then(Weak::upgrade)
        {
            bridge.deliver(request_id.as_str(), notification);
        }
        Ok(())
    }
}

/// Build a bridge wired to `host`. Must run inside a tokio runtime.
pub fn bridge_with(host: &Arc<MockHost>, config: BridgeConfig) -> Arc<Bridge> {
    init_test_tracing();
    let bridge = Arc::new(Bridge::with_config(Arc::clone(host), config).unwrap());
    host.bridge
        .set(Arc::downgrade(&bridge))
        .unwrap_or_else(|_| panic!("mock host already wired"));
    bridge
}

pub fn bridge(host: &Arc<MockHost>) -> Arc<Bridge> {
    bridge_with(host, BridgeConfig::default())
}

pub fn init_test_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("invoke_bridge=debug")
            .with_test_writer()
            .try_init();
    });
}
