//! Handler options and resolved configuration.

use std::time::Duration;

/// Options accepted by [`HueBridge::new`](crate::HueBridge::new).
///
/// Every field has a documented default; `HueOptions::default()` gives the
/// same configuration as the original handler running with no options at all.
///
/// # Examples
///
/// ```
/// use hue_bridge_rs::HueOptions;
///
/// let options = HueOptions {
///     app_name: Some("myApp".into()),
///     bridge_address: Some("192.168.1.20".into()),
///     auto_poll: false,
///     ..HueOptions::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct HueOptions {
    /// Application name used in the pairing identity. Default: `"hueManager"`.
    pub app_name: Option<String>,
    /// Device name used in the pairing identity. Default: the local hostname.
    pub device_name: Option<String>,
    /// User name used in the pairing identity. Default: `"sugilab"`.
    pub user_name: Option<String>,
    /// Emit verbose handshake traces at debug level. Default: `false`.
    pub debug_logging: bool,
    /// Bridge address to use directly, skipping network discovery.
    pub bridge_address: Option<String>,
    /// Interval between scheduled state refreshes. Default: 60 seconds.
    pub poll_interval: Duration,
    /// Start the poller automatically after `initialize`. Default: `true`.
    pub auto_poll: bool,
    /// Abandon the pairing wait loop after this long. The loop is unbounded by
    /// default because the bridge waits on a human pressing the link button.
    pub link_timeout: Option<Duration>,
}

impl Default for HueOptions {
    fn default() -> Self {
        Self {
            app_name: None,
            device_name: None,
            user_name: None,
            debug_logging: false,
            bridge_address: None,
            poll_interval: Duration::from_secs(60),
            auto_poll: true,
            link_timeout: None,
        }
    }
}

/// Options with all defaults applied.
#[derive(Debug, Clone)]
pub(crate) struct Config {
    pub app_name: String,
    pub device_name: String,
    pub user_name: String,
    pub debug_logging: bool,
    pub bridge_address: Option<String>,
    pub poll_interval: Duration,
    pub auto_poll: bool,
    pub link_timeout: Option<Duration>,
}

impl Config {
    pub fn resolve(options: HueOptions) -> Self {
        Self {
            app_name: non_empty(options.app_name).unwrap_or_else(|| "hueManager".to_string()),
            device_name: non_empty(options.device_name).unwrap_or_else(local_hostname),
            user_name: non_empty(options.user_name).unwrap_or_else(|| "sugilab".to_string()),
            debug_logging: options.debug_logging,
            bridge_address: non_empty(options.bridge_address),
            poll_interval: options.poll_interval,
            auto_poll: options.auto_poll,
            link_timeout: options.link_timeout,
        }
    }

    /// Identity string sent as `devicetype` during pairing. The bridge binds
    /// the credential it issues to this exact string.
    pub fn device_type(&self) -> String {
        format!("{}#{} {}", self.app_name, self.device_name, self.user_name)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn local_hostname() -> String {
    hostname::get()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "localhost".to_string())
}
