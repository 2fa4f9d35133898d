//! Per-credential sliding-window request limiting and round-robin rotation.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;
use tracing::{debug, info};

/// Length of the trailing window the per-minute cap applies to
pub const RATE_WINDOW: Duration = Duration::from_secs(60);

/// Slack added on top of the exact age-out time
const WAIT_SLACK: Duration = Duration::from_secs(1);

/// Timestamps of successful requests for one credential, oldest first
#[derive(Debug, Default)]
pub struct RateWindow {
    calls: VecDeque<Instant>,
}

impl RateWindow {
    /// Drop timestamps older than the trailing window
    pub fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.calls.front() {
            if now.saturating_duration_since(oldest) >= RATE_WINDOW {
                self.calls.pop_front();
            } else {
                break;
            }
        }
    }

    /// How long to wait before another call fits under `cap`.
    ///
    /// Assumes the window was pruned at `now`. A cap of 0 means unlimited.
    pub fn wait_time(&self, now: Instant, cap: usize) -> Option<Duration> {
        if cap == 0 || self.calls.len() < cap {
            return None;
        }
        let oldest = *self.calls.front()?;
        let elapsed = now.saturating_duration_since(oldest);
        Some(RATE_WINDOW.saturating_sub(elapsed) + WAIT_SLACK)
    }

    pub fn record(&mut self, at: Instant) {
        self.calls.push_back(at);
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

/// Shared rate-limit state for every credential the gateway rotates through.
///
/// Constructed once per run and owned by the gateway. Each window sits behind
/// its own async mutex; a [`RateSlot`] keeps that mutex held until the request
/// finishes, so two callers can never book the same window concurrently.
#[derive(Debug)]
pub struct RateLimiter {
    max_per_window: usize,
    windows: Vec<Mutex<RateWindow>>,
    cursor: AtomicUsize,
}

/// Exclusive access to one credential's window for the duration of a request
pub struct RateSlot<'a> {
    index: usize,
    window: MutexGuard<'a, RateWindow>,
}

impl RateSlot<'_> {
    /// Credential index this slot belongs to
    pub fn index(&self) -> usize {
        self.index
    }

    /// Count the request against the window (called on success only)
    pub fn record(mut self) {
        self.window.record(Instant::now());
    }
}

impl RateLimiter {
    /// `credentials` is clamped to at least one window
    pub fn new(credentials: usize, max_per_window: usize) -> Self {
        let windows = (0..credentials.max(1))
            .map(|_| Mutex::new(RateWindow::default()))
            .collect();
        Self {
            max_per_window,
            windows,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn credential_count(&self) -> usize {
        self.windows.len()
    }

    pub fn max_per_window(&self) -> usize {
        self.max_per_window
    }

    /// Next credential index; advances on every call regardless of outcome
    pub fn next_credential(&self) -> usize {
        self.cursor.fetch_add(1, Ordering::Relaxed) % self.windows.len()
    }

    /// Wait until credential `index` has room, then hold its window.
    pub async fn acquire(&self, index: usize) -> RateSlot<'_> {
        let index = index % self.windows.len();
        let mut window = self.windows[index].lock().await;

        loop {
            let now = Instant::now();
            window.prune(now);
            match window.wait_time(now, self.max_per_window) {
                None => break,
                Some(wait) => {
                    info!(
                        "[KEY {}] Rate limit hit. Waiting {:.2}s",
                        index,
                        wait.as_secs_f64()
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }

        debug!("[KEY {}] {} request(s) in current window", index, window.len());
        RateSlot { index, window }
    }

    /// Requests currently counted against credential `index`
    pub async fn recorded(&self, index: usize) -> usize {
        let mut window = self.windows[index % self.windows.len()].lock().await;
        window.prune(Instant::now());
        window.len()
    }
}
