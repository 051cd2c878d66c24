//! Per-handler session state.

use crate::discovery::DiscoveredBridge;

/// Number of empty discovery results tolerated before `initialize` gives up.
pub(crate) const DISCOVERY_RETRIES: u32 = 3;

/// Mutable state owned by one handler across `initialize` calls.
///
/// Reset wholesale at the start of each `initialize`; the re-entry guard on
/// the handler keeps a second concurrent `initialize` from touching it.
#[derive(Debug, Default)]
pub(crate) struct Session {
    /// The single tracked bridge, if one has been resolved.
    pub bridge: Option<DiscoveredBridge>,
    /// Pairing credential; empty means unauthenticated.
    pub user_key: String,
    /// Remaining discovery attempts in the current resolve loop.
    pub retry_remain: u32,
}

impl Session {
    pub fn new(user_key: &str) -> Self {
        Self {
            user_key: user_key.to_string(),
            retry_remain: DISCOVERY_RETRIES,
            ..Self::default()
        }
    }

    pub fn bridge_address(&self) -> Option<String> {
        self.bridge.as_ref().map(|b| b.address.clone())
    }
}
