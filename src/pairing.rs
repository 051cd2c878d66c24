//! One-time registration handshake against the bridge.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::debug;
use serde_json::{Value, json};
use tokio::time::{self, Instant};

use crate::errors::Error;
use crate::handler::StateCallback;
use crate::status::LinkStatus;
use crate::transport::Transport;

type Result<T> = std::result::Result<T, Error>;

/// Timeout for every control call against the bridge.
pub(crate) const CONTROL_TIMEOUT: Duration = Duration::from_secs(5);
/// Delay between registration attempts while waiting on the link button.
pub(crate) const LINK_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Obtain a user key from the bridge at `address`.
///
/// Phase one probes the registration endpoint; an error-shaped answer is the
/// expected "no user yet" path. Phase two posts the identity string until the
/// bridge confirms, the caller cancels, or the optional `link_timeout`
/// elapses. Confirmation requires a human pressing the bridge's link button,
/// so without a timeout the loop is deliberately unbounded.
///
/// Returns `Ok(None)` when no key was obtained (the callback has already been
/// notified); transport failures abort the whole handshake.
pub(crate) async fn obtain_key<T: Transport>(
    transport: &T,
    address: &str,
    device_type: &str,
    canceled: &AtomicBool,
    link_timeout: Option<Duration>,
    callback: &StateCallback,
) -> Result<Option<String>> {
    let probe = transport
        .get(
            &format!("http://{address}/api/newdeveloper"),
            CONTROL_TIMEOUT,
        )
        .await?;
    // An error-shaped probe answer means no user exists yet, which is the
    // normal pre-registration path. Anything else is informational only.
    if first_entry(&probe).and_then(|entry| entry.get("error")).is_none() {
        debug!("registration probe reports an existing user: {probe:?}");
    }

    let request = json!({ "devicetype": device_type });
    let url = format!("http://{address}/api");
    let start = Instant::now();

    loop {
        if canceled.load(Ordering::SeqCst) {
            callback(Some(address), Some(&LinkStatus::Canceled.as_value()), None);
            return Ok(None);
        }
        if let Some(limit) = link_timeout
            && start.elapsed() >= limit
        {
            callback(Some(address), None, Some("Link timed out."));
            return Ok(None);
        }

        let body = transport.post(&url, &request, CONTROL_TIMEOUT).await?;
        if let Some(key) = extract_username(&body) {
            debug!("link succeeded");
            return Ok(Some(key));
        }

        // Unconfirmed: the bridge is waiting for its link button.
        callback(Some(address), Some(&LinkStatus::Linking.as_value()), None);
        time::sleep(LINK_RETRY_DELAY).await;
    }
}

fn first_entry(body: &Value) -> Option<&Value> {
    body.as_array().and_then(|entries| entries.first())
}

fn extract_username(body: &Value) -> Option<String> {
    first_entry(body)?
        .get("success")?
        .get("username")?
        .as_str()
        .map(String::from)
}
