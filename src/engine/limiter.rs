//! Request pacing: a token bucket with burst 1 for the binary path, and a shared ticker for
//! dump-resources.

use crossbeam_channel::{Receiver, tick};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use super::cancel::CancelToken;
use crate::RestError;

/// Token bucket holding at most one token, refilled `per_second` times a second.
///
/// Each waiter reserves the next free slot under the lock and then sleeps outside it, so
/// concurrent callers are spaced `1s / per_second` apart in reservation order.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// `None` when `per_second` is 0: callers proceed unpaced.
    pub fn per_second(per_second: u32) -> Option<Self> {
        (per_second > 0).then(|| Self {
            interval: Duration::from_secs(1) / per_second,
            next_slot: Mutex::new(None),
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Block until a token is available. Cancellation unblocks immediately.
    pub fn wait(&self, cancel: &CancelToken) -> Result<(), RestError> {
        if cancel.is_cancelled() {
            return Err(RestError::Cancelled);
        }
        let slot = {
            let mut next = self
                .next_slot
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let now = Instant::now();
            let slot = next.map_or(now, |n| n.max(now));
            *next = Some(slot + self.interval);
            slot
        };
        cancel.sleep(slot.saturating_duration_since(Instant::now()))
    }
}

/// Global ticker emitting one event per `1s / throttle`. `throttle < 1` is a config error.
pub fn ticker(throttle: i64) -> Result<Receiver<Instant>, RestError> {
    if throttle < 1 {
        return Err(RestError::Config(format!("Invalid throttle {throttle}")));
    }
    let per_second = u32::try_from(throttle).unwrap_or(u32::MAX);
    Ok(tick(Duration::from_secs(1) / per_second))
}
