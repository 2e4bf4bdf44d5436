//! First-error capture and shutdown signalling shared by the stages of one pipeline.

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use log::debug;
use std::thread::ScopedJoinHandle;

use crate::RestError;
use crate::engine::cancel::CancelToken;

/// Holds the capacity-1 error channel and the pipeline's cancel token.
///
/// Workers call [`Supervisor::report`], which never blocks: the first error fills the slot,
/// later ones are discarded. Reporting also cancels the token so producers stop feeding work
/// and waiters wake up.
pub struct Supervisor {
    errs_tx: Sender<RestError>,
    errs_rx: Receiver<RestError>,
    cancel: CancelToken,
}

impl Supervisor {
    pub fn new(cancel: CancelToken) -> Self {
        let (errs_tx, errs_rx) = bounded(1);
        Self {
            errs_tx,
            errs_rx,
            cancel,
        }
    }

    pub fn report(&self, err: RestError) {
        match self.errs_tx.try_send(err) {
            Ok(()) => {}
            Err(TrySendError::Full(err)) | Err(TrySendError::Disconnected(err)) => {
                debug!("discarding error after the first: {err}");
            }
        }
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// True once an error was reported or the run was cancelled from outside.
    pub fn is_stopping(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Join a stage thread. A panic is reported as [`RestError::Panicked`] and yields `None`.
    pub fn join<T>(&self, stage: &'static str, handle: ScopedJoinHandle<'_, T>) -> Option<T> {
        match handle.join() {
            Ok(value) => Some(value),
            Err(_) => {
                self.report(RestError::Panicked(stage));
                None
            }
        }
    }

    /// Call after every stage has been joined. Returns the first reported error, or
    /// `Cancelled` when the token was cancelled without one.
    pub fn finish(self) -> Result<(), RestError> {
        if let Ok(err) = self.errs_rx.try_recv() {
            return Err(err);
        }
        if self.cancel.is_cancelled() {
            return Err(RestError::Cancelled);
        }
        Ok(())
    }
}
