//! Recurring state refresh.

use std::future::Future;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;

/// Self-rescheduling refresh task.
///
/// `start` schedules the first fetch one interval out; each further fetch is
/// scheduled only after the previous one settled, so fetches never overlap
/// and the schedule drifts by the fetch latency. `stop` cancels the pending
/// timer; a fetch already in flight completes but does not reschedule. The
/// fetch itself must not fail the task: the handler routes fetch errors
/// through its callback.
#[derive(Debug, Default)]
pub(crate) struct Poller {
    enabled: AtomicBool,
    cancel: Mutex<CancellationToken>,
}

impl Poller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Spawn the refresh loop; no-op when already running.
    pub fn start<F, Fut>(&self, interval: Duration, fetch: F)
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        if self.enabled.swap(true, Ordering::SeqCst) {
            return;
        }

        // A fresh token per start so a stopped loop can never wake up again.
        let token = CancellationToken::new();
        *self.cancel.lock().unwrap() = token.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    () = time::sleep(interval) => {}
                }
                fetch().await;
                if token.is_cancelled() {
                    break;
                }
            }
        });
    }

    pub fn stop(&self) {
        self.enabled.store(false, Ordering::SeqCst);
        self.cancel.lock().unwrap().cancel();
    }
}
