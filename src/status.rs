//! Link status notifications and the cached facilities snapshot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::discovery::DiscoveredBridge;

/// Progress statuses delivered to the callback as string payloads while
/// `initialize` is working through the pairing handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum LinkStatus {
    /// The bridge is waiting for its link button to be pressed.
    Linking,
    /// Initialization was canceled by the caller.
    Canceled,
}

impl LinkStatus {
    pub(crate) fn as_value(self) -> Value {
        Value::String(self.to_string())
    }
}

/// Last-known state of the devices behind one bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Facility {
    /// The bridge this entry was fetched from.
    pub bridge: DiscoveredBridge,
    /// Canonicalized device payload, keyed by device id.
    pub devices: Value,
}

/// Snapshot of all tracked bridges, keyed by bridge address.
///
/// With the single-bridge design this holds at most one entry; a `BTreeMap`
/// keeps the serialized form deterministic for change detection.
pub type Facilities = BTreeMap<String, Facility>;
