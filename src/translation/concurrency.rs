/*!
 * Shared backpressure and cancellation primitives.
 *
 * `RequestThrottle` spaces request starts according to a provider's rate
 * limit so that concurrent workers share one request budget.
 * `Cancellation` is a cloneable run-wide flag that tasks can poll or await.
 */

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::time::Instant;

/// Spaces request starts to stay under a requests-per-minute limit
#[derive(Debug)]
pub struct RequestThrottle {
    /// Minimum spacing between request starts, `None` disables throttling
    interval: Option<Duration>,
    /// Earliest instant the next request may start
    next_slot: Mutex<Option<Instant>>,
}

impl RequestThrottle {
    /// Build a throttle from a rate limit in requests per minute
    pub fn from_rate_limit(requests_per_minute: Option<u32>) -> Self {
        let interval = requests_per_minute
            .filter(|rpm| *rpm > 0)
            .map(|rpm| Duration::from_millis(60_000 / rpm as u64));
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    pub fn unlimited() -> Self {
        Self::from_rate_limit(None)
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Wait for the next free request slot and reserve it
    pub async fn acquire(&self) {
        let Some(interval) = self.interval else {
            return;
        };

        let slot = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next_slot {
                Some(reserved) if reserved > now => reserved,
                _ => now,
            };
            *next_slot = Some(slot + interval);
            slot
        };

        tokio::time::sleep_until(slot).await;
    }
}

/// Run-wide cancellation flag
#[derive(Debug, Clone)]
pub struct Cancellation {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

impl Cancellation {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Request cancellation; every clone observes it
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolves once cancellation has been requested
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives as long as `self`, so this only ends on cancel
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}
