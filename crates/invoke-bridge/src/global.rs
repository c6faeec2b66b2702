//! Process-wide bridge, for embeddings that expose one well-known object to
//! page scripts instead of passing a `Bridge` around.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serde_json::Value;

use crate::error::{BridgeError, InvokeError};
use crate::invocation::Invocation;
use crate::service::Bridge;

/// Name under which hosts surface the bridge to scripts.
pub const BRIDGE_NAME: &str = "__pywui__";

static BRIDGE: OnceLock<Arc<Bridge>> = OnceLock::new();

/// Install the process-wide bridge. Only the first call succeeds.
pub fn install(bridge: Arc<Bridge>) -> Result<(), BridgeError> {
    BRIDGE
        .set(bridge)
        .map_err(|_| BridgeError::AlreadyInstalled)?;
    tracing::debug!(name = BRIDGE_NAME, "Installed process-wide bridge");
    Ok(())
}

pub fn installed() -> Option<Arc<Bridge>> {
    BRIDGE.get().cloned()
}

/// `Bridge::invoke` on the installed bridge.
pub fn invoke(command: &str, args: Vec<Value>) -> Result<Invocation, InvokeError> {
    BRIDGE
        .get()
        .ok_or(InvokeError::NotInstalled)?
        .invoke(command, args)
}

/// `Bridge::invoke_with_timeout` on the installed bridge.
pub fn invoke_with_timeout(
    command: &str,
    args: Vec<Value>,
    timeout: Duration,
) -> Result<Invocation, InvokeError> {
    BRIDGE
        .get()
        .ok_or(InvokeError::NotInstalled)?
        .invoke_with_timeout(command, args, timeout)
}
