//! # hue_bridge_rs
//!
//! An async Rust library for managing a Philips Hue bridge over the local
//! network.
//!
//! This crate handles the full lifecycle of a single bridge: finding it via
//! SSDP, running the one-time link-button pairing handshake, fetching and
//! controlling device state over the bridge's HTTP API, and keeping a
//! recurring poller alive that refreshes state on a fixed interval.
//!
//! ## Quick Start
//!
//! ```ignore
//! use hue_bridge_rs::{HueBridge, HueOptions, StateCallback};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let callback: StateCallback = Box::new(|address, payload, error| {
//!         if let Some(error) = error {
//!             eprintln!("{}: {error}", address.unwrap_or("?"));
//!         } else if let Some(payload) = payload {
//!             println!("{}: {payload}", address.unwrap_or("?"));
//!         }
//!     });
//!
//!     // An empty user key triggers the pairing handshake; press the
//!     // bridge's link button when the callback reports "Linking".
//!     let hue = HueBridge::new("", callback, HueOptions::default());
//!     let user_key = hue.initialize().await?;
//!     println!("paired as {user_key}");
//!
//!     hue.set_state("/lights/1/state", &serde_json::json!({"on": true}))
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Discovery**: Find the bridge via SSDP with [`SsdpDiscovery`], or skip
//!   discovery entirely with [`HueOptions::bridge_address`]
//! - **Pairing**: Link-button handshake with progress reported through the
//!   [`StateCallback`], cancelable at any point via
//!   [`HueBridge::cancel_initialize`]
//! - **State**: Fetch the device map with [`HueBridge::get_state`] and send
//!   commands with [`HueBridge::set_state`]
//! - **Polling**: A self-rescheduling refresh loop, started automatically by
//!   [`HueBridge::initialize`] and controllable via
//!   [`HueBridge::start_polling`] / [`HueBridge::stop_polling`]
//! - **Change Observation**: Run a hook whenever the aggregate device
//!   snapshot changes with [`HueBridge::observe`]
//!
//! ## Communication
//!
//! Discovery uses multicast SSDP on 239.255.255.250:1900; everything else is
//! plain HTTP against the bridge's `/api` endpoints. The bridge must be on
//! the same local network.
//!
//! All payloads coming back from the bridge are canonicalized with
//! [`normalize`] (object keys sorted lexicographically) so that snapshots
//! compare byte-for-byte across fetches.

mod canonical;
mod config;
mod discovery;
mod errors;
mod handler;
mod observer;
mod pairing;
mod poller;
mod registry;
mod session;
mod status;
mod transport;

// Re-export public API
pub use canonical::normalize;
pub use config::HueOptions;
pub use discovery::{DiscoveredBridge, Discoverer, SsdpDiscovery};
pub use errors::Error;
pub use handler::{HueBridge, StateCallback};
pub use status::{Facilities, Facility, LinkStatus};
pub use transport::{HttpTransport, Transport};
