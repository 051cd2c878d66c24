//! Bridge discovery via SSDP search.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::net::UdpSocket;
use tokio::time::{self, Instant};

use crate::errors::Error;

type Result<T> = std::result::Result<T, Error>;

const SSDP_ADDR: &str = "239.255.255.250:1900";

/// A Hue bridge discovered on the local network.
///
/// The `address` is always present; the remaining fields are metadata taken
/// from the SSDP response headers and are absent when the bridge was supplied
/// as an explicit address instead of being discovered.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredBridge {
    /// IP address (or host) of the bridge.
    pub address: String,
    /// Bridge id from the `hue-bridgeid` SSDP header.
    #[serde(default)]
    pub id: Option<String>,
    /// `SERVER` header of the SSDP response.
    #[serde(default)]
    pub server: Option<String>,
}

impl DiscoveredBridge {
    /// Synthesize a candidate from a known address, bypassing discovery.
    pub fn from_address(address: &str) -> Self {
        Self {
            address: address.to_string(),
            id: None,
            server: None,
        }
    }
}

/// Network discovery seam.
///
/// Production code uses [`SsdpDiscovery`]; tests substitute scripted
/// implementations. Implementations return zero or more candidates and raise
/// only on transport-level failure.
pub trait Discoverer: Send + Sync + 'static {
    /// Search the local network for bridges until the timeout elapses.
    fn discover(
        &self,
        timeout: Duration,
    ) -> impl Future<Output = Result<Vec<DiscoveredBridge>>> + Send;
}

/// Discovers bridges with an SSDP `M-SEARCH` multicast.
///
/// Sends one search request and collects unicast responses for the duration of
/// the timeout. Only responses carrying a `hue-bridgeid` header are kept, and
/// bridges answering more than once are deduplicated by id.
#[derive(Debug, Clone, Copy, Default)]
pub struct SsdpDiscovery;

impl Discoverer for SsdpDiscovery {
    async fn discover(&self, timeout: Duration) -> Result<Vec<DiscoveredBridge>> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|e| Error::socket("bind", e))?;

        let msg = format!(
            "M-SEARCH * HTTP/1.1\r\n\
             HOST: {SSDP_ADDR}\r\n\
             MAN: \"ssdp:discover\"\r\n\
             MX: 3\r\n\
             ST: upnp:rootdevice\r\n\r\n"
        );
        socket
            .send_to(msg.as_bytes(), SSDP_ADDR)
            .await
            .map_err(|e| Error::socket("send_to", e))?;

        let mut discovered: HashMap<String, DiscoveredBridge> = HashMap::new();
        let start = Instant::now();
        let mut buffer = [0u8; 4096];
        let recv_timeout = Duration::from_millis(500);

        while start.elapsed() < timeout {
            // Bounded recv_from so the loop can re-check the overall timeout
            match time::timeout(recv_timeout, socket.recv_from(&mut buffer)).await {
                Ok(Ok((size, addr))) => {
                    if let Ok(response) = std::str::from_utf8(&buffer[..size])
                        && let Some(id) = header_value(response, "hue-bridgeid")
                    {
                        let bridge = DiscoveredBridge {
                            address: addr.ip().to_string(),
                            id: Some(id.clone()),
                            server: header_value(response, "server"),
                        };
                        discovered.insert(id, bridge);
                    }
                }
                // recv error or slice timeout - keep waiting until the deadline
                Ok(Err(_)) | Err(_) => continue,
            }
        }

        Ok(discovered.into_values().collect())
    }
}

fn header_value(response: &str, name: &str) -> Option<String> {
    response.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        if key.trim().eq_ignore_ascii_case(name) {
            Some(value.trim().to_string())
        } else {
            None
        }
    })
}
