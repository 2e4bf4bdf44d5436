//! Cancellation token shared by every stage of a pipeline.

use crossbeam_channel::{Receiver, Sender, bounded, select};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::RestError;

/// Cloneable handle; cancelling any clone cancels all of them.
///
/// Nothing is ever sent on the signal channel. Cancelling drops the only sender, which
/// disconnects the channel and wakes every `select!` waiting on [`CancelToken::signal`].
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

struct Inner {
    cancelled: AtomicBool,
    trigger: Mutex<Option<Sender<()>>>,
    signal: Receiver<()>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (trigger, signal) = bounded(0);
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                trigger: Mutex::new(Some(trigger)),
                signal,
            }),
        }
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner
            .trigger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Becomes ready (disconnected) once the token is cancelled. For use in `select!`.
    pub fn signal(&self) -> &Receiver<()> {
        &self.inner.signal
    }

    /// Sleep for `duration` unless cancelled first.
    pub fn sleep(&self, duration: Duration) -> Result<(), RestError> {
        if self.is_cancelled() {
            return Err(RestError::Cancelled);
        }
        if duration.is_zero() {
            return Ok(());
        }
        select! {
            recv(self.signal()) -> _ => Err(RestError::Cancelled),
            default(duration) => Ok(()),
        }
    }

    /// Block until `timer` fires (a `tick` or `after` channel) unless cancelled first.
    pub fn wait_for(&self, timer: &Receiver<Instant>) -> Result<(), RestError> {
        if self.is_cancelled() {
            return Err(RestError::Cancelled);
        }
        select! {
            recv(self.signal()) -> _ => Err(RestError::Cancelled),
            recv(timer) -> _ => Ok(()),
        }
    }
}
