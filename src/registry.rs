//! Bridge resolution with a bounded discovery-retry budget.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::debug;
use tokio::sync::Mutex;

use crate::discovery::{DiscoveredBridge, Discoverer};
use crate::errors::Error;
use crate::handler::StateCallback;
use crate::session::{DISCOVERY_RETRIES, Session};
use crate::status::LinkStatus;

type Result<T> = std::result::Result<T, Error>;

pub(crate) const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(20);

/// Resolve the single tracked bridge.
///
/// An explicit address bypasses discovery entirely. Otherwise discovery is
/// retried until a candidate shows up, the caller cancels, or the budget in
/// the session runs out; each empty round is reported through the callback as
/// a non-fatal "bridge not found" condition. Discoverer failures propagate
/// and abort the whole initialize.
pub(crate) async fn resolve<D: Discoverer>(
    discoverer: &D,
    explicit: Option<&str>,
    session: &Mutex<Session>,
    canceled: &AtomicBool,
    callback: &StateCallback,
) -> Result<Option<DiscoveredBridge>> {
    if let Some(address) = explicit {
        debug!("using configured bridge address {address}, skipping discovery");
        return Ok(Some(DiscoveredBridge::from_address(address)));
    }

    loop {
        if canceled.load(Ordering::SeqCst) {
            let address = session.lock().await.bridge_address();
            callback(
                address.as_deref(),
                Some(&LinkStatus::Canceled.as_value()),
                None,
            );
            return Ok(None);
        }

        let candidates = discoverer.discover(DISCOVERY_TIMEOUT).await?;
        if let Some(first) = candidates.into_iter().next() {
            // Single-bridge design: further candidates are never adopted.
            debug!("adopting bridge {}", first.address);
            session.lock().await.retry_remain = DISCOVERY_RETRIES;
            return Ok(Some(first));
        }

        callback(None, None, Some("Can't find bridge."));
        let mut session = session.lock().await;
        session.retry_remain = session.retry_remain.saturating_sub(1);
        if session.retry_remain == 0 {
            return Ok(None);
        }
    }
}
