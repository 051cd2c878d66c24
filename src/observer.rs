//! Aggregate change detection over the facilities snapshot.

use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::status::Facilities;

/// Fires a callback when the serialized facilities snapshot changes.
///
/// The snapshot is already canonicalized when it is written, and the map is
/// ordered, so byte comparison of the serialized form is a faithful equality
/// check. This runs independently of the poller's own callback: it reacts to
/// aggregate change across fetch cycles without inspecting payload content.
#[derive(Debug, Default)]
pub(crate) struct ChangeObserver {
    enabled: AtomicBool,
    cancel: StdMutex<CancellationToken>,
}

impl ChangeObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture a baseline and start comparing on the interval; no-op when
    /// already observing.
    pub fn start<F>(&self, interval: Duration, facilities: Arc<Mutex<Facilities>>, on_changed: F)
    where
        F: Fn() + Send + 'static,
    {
        if self.enabled.swap(true, Ordering::SeqCst) {
            return;
        }

        let token = CancellationToken::new();
        *self.cancel.lock().unwrap() = token.clone();

        tokio::spawn(async move {
            let mut baseline = serialize(&facilities).await;
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    () = time::sleep(interval) => {}
                }
                let current = serialize(&facilities).await;
                if current != baseline {
                    on_changed();
                    baseline = current;
                }
            }
        });
    }

    pub fn stop(&self) {
        self.enabled.store(false, Ordering::SeqCst);
        self.cancel.lock().unwrap().cancel();
    }
}

async fn serialize(facilities: &Mutex<Facilities>) -> String {
    let snapshot = facilities.lock().await;
    serde_json::to_string(&*snapshot).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use serde_json::json;

    use crate::discovery::DiscoveredBridge;
    use crate::status::Facility;

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    fn facility(devices: serde_json::Value) -> Facility {
        Facility {
            bridge: DiscoveredBridge::from_address("192.168.1.20"),
            devices,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_only_on_difference() {
        let facilities = Arc::new(Mutex::new(Facilities::new()));
        let fired = Arc::new(AtomicUsize::new(0));

        let observer = ChangeObserver::new();
        let sink = Arc::clone(&fired);
        observer.start(Duration::from_secs(30), Arc::clone(&facilities), move || {
            sink.fetch_add(1, Ordering::SeqCst);
        });
        settle().await; // baseline captured

        time::advance(Duration::from_secs(30)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        facilities
            .lock()
            .await
            .insert("192.168.1.20".to_string(), facility(json!({"1": {}})));
        time::advance(Duration::from_secs(30)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // unchanged snapshot, baseline was updated
        time::advance(Duration::from_secs(30)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        observer.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_comparisons() {
        let facilities = Arc::new(Mutex::new(Facilities::new()));
        let fired = Arc::new(AtomicUsize::new(0));

        let observer = ChangeObserver::new();
        let sink = Arc::clone(&fired);
        observer.start(Duration::from_secs(30), Arc::clone(&facilities), move || {
            sink.fetch_add(1, Ordering::SeqCst);
        });
        settle().await;
        observer.stop();

        facilities
            .lock()
            .await
            .insert("192.168.1.20".to_string(), facility(json!({"1": {}})));
        time::advance(Duration::from_secs(120)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
