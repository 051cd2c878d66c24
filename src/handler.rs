//! The bridge handler: initialization, control calls, and polling lifecycle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::debug;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::canonical;
use crate::config::{Config, HueOptions};
use crate::discovery::{DiscoveredBridge, Discoverer, SsdpDiscovery};
use crate::errors::Error;
use crate::observer::ChangeObserver;
use crate::pairing::{self, CONTROL_TIMEOUT};
use crate::poller::Poller;
use crate::registry;
use crate::session::{DISCOVERY_RETRIES, Session};
use crate::status::{Facilities, Facility, LinkStatus};
use crate::transport::{HttpTransport, Transport};

type Result<T> = std::result::Result<T, Error>;

/// Callback invoked as `(address, payload, error_description)`.
///
/// Exactly one of payload / error description is meaningful per invocation.
/// Pairing progress arrives as the string payloads `"Linking"` and
/// `"Canceled"`; state fetches arrive as the canonicalized device mapping.
pub type StateCallback =
    Box<dyn Fn(Option<&str>, Option<&Value>, Option<&str>) + Send + Sync + 'static>;

/// Handler for a single Hue bridge.
///
/// Owns the whole lifecycle: discovery, the one-time pairing handshake,
/// get/set control calls, the recurring state poller, and change
/// observation. At most one bridge is tracked per handler; re-running
/// [`initialize`](HueBridge::initialize) replaces it wholesale.
///
/// Cloning is cheap and every clone shares the same session, so a handler can
/// be handed to background tasks freely.
///
/// # Example
///
/// ```ignore
/// use hue_bridge_rs::{HueBridge, HueOptions, StateCallback};
///
/// let callback: StateCallback = Box::new(|address, payload, error| {
///     if let Some(error) = error {
///         eprintln!("{}: {error}", address.unwrap_or("?"));
///     } else if let Some(payload) = payload {
///         println!("{}: {payload}", address.unwrap_or("?"));
///     }
/// });
///
/// let hue = HueBridge::new("", callback, HueOptions::default());
/// let user_key = hue.initialize().await?;
/// ```
pub struct HueBridge<T = HttpTransport, D = SsdpDiscovery> {
    transport: Arc<T>,
    discoverer: Arc<D>,
    config: Arc<Config>,
    callback: Arc<StateCallback>,
    session: Arc<Mutex<Session>>,
    facilities: Arc<Mutex<Facilities>>,
    initializing: Arc<AtomicBool>,
    canceled: Arc<AtomicBool>,
    poller: Arc<Poller>,
    observer: Arc<ChangeObserver>,
}

impl<T, D> Clone for HueBridge<T, D> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            discoverer: Arc::clone(&self.discoverer),
            config: Arc::clone(&self.config),
            callback: Arc::clone(&self.callback),
            session: Arc::clone(&self.session),
            facilities: Arc::clone(&self.facilities),
            initializing: Arc::clone(&self.initializing),
            canceled: Arc::clone(&self.canceled),
            poller: Arc::clone(&self.poller),
            observer: Arc::clone(&self.observer),
        }
    }
}

impl HueBridge {
    /// Build a handler over the real SSDP discovery and HTTP transport.
    ///
    /// `user_key` is the credential from an earlier pairing; pass an empty
    /// string to pair from scratch during [`initialize`](HueBridge::initialize).
    pub fn new(user_key: &str, callback: StateCallback, options: HueOptions) -> Self {
        Self::with_parts(
            HttpTransport::new(),
            SsdpDiscovery,
            user_key,
            callback,
            options,
        )
    }
}

impl<T: Transport, D: Discoverer> HueBridge<T, D> {
    /// Build a handler over custom transport and discovery implementations.
    pub fn with_parts(
        transport: T,
        discoverer: D,
        user_key: &str,
        callback: StateCallback,
        options: HueOptions,
    ) -> Self {
        Self {
            transport: Arc::new(transport),
            discoverer: Arc::new(discoverer),
            config: Arc::new(Config::resolve(options)),
            callback: Arc::new(callback),
            session: Arc::new(Mutex::new(Session::new(user_key))),
            facilities: Arc::new(Mutex::new(Facilities::new())),
            initializing: Arc::new(AtomicBool::new(false)),
            canceled: Arc::new(AtomicBool::new(false)),
            poller: Arc::new(Poller::new()),
            observer: Arc::new(ChangeObserver::new()),
        }
    }

    /// Current credential; empty when unauthenticated.
    pub async fn user_key(&self) -> String {
        self.session.lock().await.user_key.clone()
    }

    /// The tracked bridge, if one has been resolved.
    pub async fn bridge(&self) -> Option<DiscoveredBridge> {
        self.session.lock().await.bridge.clone()
    }

    /// Snapshot of the last-known device state, keyed by bridge address.
    pub async fn facilities(&self) -> Facilities {
        self.facilities.lock().await.clone()
    }

    /// Whether the poller currently holds a timer.
    pub fn is_polling(&self) -> bool {
        self.poller.is_enabled()
    }

    /// Request cooperative cancellation of an in-flight `initialize`.
    ///
    /// The flag is checked between steps of the discovery and pairing loops;
    /// a network call that was already issued is not aborted.
    pub fn cancel_initialize(&self) {
        debug!("initialize cancellation requested");
        self.canceled.store(true, Ordering::SeqCst);
    }

    /// Resolve the bridge, pair when no credential is configured, fetch the
    /// initial state, and start the poller.
    ///
    /// Single-flight: while one call is in progress a second call returns the
    /// current (possibly empty) credential without touching the session.
    /// Returns the credential, or an empty string when none was obtained
    /// because the discovery budget ran out or pairing was canceled; those
    /// conditions reach the callback, not the return value. Transport
    /// failures during discovery or pairing do propagate as errors.
    pub async fn initialize(&self) -> Result<String> {
        if self.initializing.swap(true, Ordering::SeqCst) {
            debug!("initialize already in flight, returning current key");
            return Ok(self.user_key().await);
        }

        let result = self.run_initialize().await;
        self.initializing.store(false, Ordering::SeqCst);
        result
    }

    async fn run_initialize(&self) -> Result<String> {
        self.canceled.store(false, Ordering::SeqCst);
        let device_type = self.config.device_type();
        {
            let mut session = self.session.lock().await;
            session.retry_remain = DISCOVERY_RETRIES;
            if self.config.debug_logging {
                debug!("initialize: user_key={:?}", session.user_key);
                debug!("initialize: device_type={device_type:?}");
            }
        }

        let Some(bridge) = registry::resolve(
            self.discoverer.as_ref(),
            self.config.bridge_address.as_deref(),
            &self.session,
            &self.canceled,
            &self.callback,
        )
        .await?
        else {
            // Retry budget exhausted or canceled; hand back what we have.
            return Ok(self.user_key().await);
        };

        let address = bridge.address.clone();
        self.session.lock().await.bridge = Some(bridge);
        debug!("initialize: connect {address}");

        if self.user_key().await.is_empty() {
            if self.canceled.load(Ordering::SeqCst) {
                (self.callback)(Some(&address), Some(&LinkStatus::Canceled.as_value()), None);
                return Ok(String::new());
            }

            match pairing::obtain_key(
                self.transport.as_ref(),
                &address,
                &device_type,
                &self.canceled,
                self.config.link_timeout,
                &self.callback,
            )
            .await?
            {
                Some(key) => self.session.lock().await.user_key = key,
                // Canceled or timed out; the callback was already notified.
                None => return Ok(String::new()),
            }
        } else if self.config.debug_logging {
            debug!("initialize: reusing configured user key");
        }

        // The first fetch happens before initialize returns so the caller
        // sees at least one callback deterministically; its failure is
        // reported but not fatal.
        if let Err(err) = self.get_state().await {
            (self.callback)(Some(&address), None, Some(&err.to_string()));
        }

        if self.config.auto_poll {
            self.start_polling(self.config.poll_interval);
        }

        Ok(self.user_key().await)
    }

    /// Fetch the device list, canonicalize it, update the snapshot, and
    /// report the result through the callback.
    ///
    /// A hub-reported application error (stale credential and the like) goes
    /// out on the callback's error channel and leaves the snapshot untouched;
    /// only transport failures return `Err`.
    pub async fn get_state(&self) -> Result<Value> {
        let (address, user_key) = self.control_target().await?;
        let url = format!("http://{address}/api/{user_key}/lights");
        let body = self.transport.get(&url, CONTROL_TIMEOUT).await?;
        let body = canonical::normalize(body);

        match hub_error_description(&body) {
            Some(description) => {
                (self.callback)(Some(&address), Some(&body), Some(&description));
            }
            None => {
                let bridge = self.session.lock().await.bridge.clone();
                if let Some(bridge) = bridge {
                    self.facilities.lock().await.insert(
                        address.clone(),
                        Facility {
                            bridge,
                            devices: body.clone(),
                        },
                    );
                }
                (self.callback)(Some(&address), Some(&body), None);
            }
        }
        Ok(body)
    }

    /// Send a control command to `path` (e.g. `/lights/1/state`).
    ///
    /// A string body is parsed as JSON before dispatch; the bridge's reply is
    /// canonicalized before it reaches the callback.
    pub async fn set_state(&self, path: &str, body: &Value) -> Result<Value> {
        let body = match body {
            Value::String(raw) => serde_json::from_str(raw).map_err(Error::JsonLoad)?,
            other => other.clone(),
        };

        let (address, user_key) = self.control_target().await?;
        let url = format!("http://{address}/api/{user_key}{path}");
        debug!("set_state: {url} {body}");
        let reply = self.transport.put(&url, &body, CONTROL_TIMEOUT).await?;
        let reply = canonical::normalize(reply);
        (self.callback)(Some(&address), Some(&reply), None);
        Ok(reply)
    }

    /// Start the recurring state refresh; no-op when already polling.
    pub fn start_polling(&self, interval: Duration) {
        let handler = self.clone();
        self.poller.start(interval, move || {
            let handler = handler.clone();
            async move { handler.poll_once().await }
        });
    }

    /// Stop the recurring refresh. A fetch already in flight completes but
    /// does not reschedule.
    pub fn stop_polling(&self) {
        self.poller.stop();
    }

    /// Watch the facilities snapshot and run `on_changed` whenever its
    /// serialized form differs from the previously observed one; no-op when
    /// already observing.
    pub fn observe<F>(&self, interval: Duration, on_changed: F)
    where
        F: Fn() + Send + 'static,
    {
        self.observer
            .start(interval, Arc::clone(&self.facilities), on_changed);
    }

    /// Stop watching the facilities snapshot.
    pub fn stop_observing(&self) {
        self.observer.stop();
    }

    async fn poll_once(&self) {
        // Nothing to fetch until a bridge is resolved; stay silent rather
        // than reporting the same missing-bridge condition every interval.
        if self.session.lock().await.bridge.is_none() {
            return;
        }
        // A failed scheduled fetch is reported, never raised, and the
        // schedule keeps going.
        if let Err(err) = self.get_state().await {
            let address = self.session.lock().await.bridge_address();
            (self.callback)(address.as_deref(), None, Some(&err.to_string()));
        }
    }

    async fn control_target(&self) -> Result<(String, String)> {
        let session = self.session.lock().await;
        let address = session.bridge_address().ok_or(Error::NoBridge)?;
        Ok((address, session.user_key.clone()))
    }
}

fn hub_error_description(body: &Value) -> Option<String> {
    let entry = match body.as_array() {
        Some(entries) => entries.first()?,
        None => body,
    };
    entry
        .get("error")?
        .get("description")?
        .as_str()
        .map(String::from)
}
