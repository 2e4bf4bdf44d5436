//! Progress bar utilities for displaying processing status (stderr)

use kdam::{Animation, Bar, BarExt};
use std::sync::{Arc, Mutex};

// Progress bar type alias
pub type ProgressBar = Arc<Mutex<Bar>>;

/// Configuration for creating a progress bar
pub struct ProgressBarConfig {
    pub total: usize,
    pub desc: &'static str,
    pub animation: Animation,
}

impl ProgressBarConfig {
    /// Create a new progress bar configuration
    pub fn new(total: usize, desc: &'static str, animation: Animation) -> Self {
        Self {
            total,
            desc,
            animation,
        }
    }
}

/// Create a progress bar with the given configuration
pub fn create_progress_bar(config: ProgressBarConfig) -> ProgressBar {
    Arc::new(Mutex::new(kdam::tqdm!(
        total = config.total,
        desc = config.desc,
        animation = config.animation
    )))
}

/// Create a counter for unknown total (shows count without percentage)
pub fn create_counter(desc: &'static str, unit: &'static str) -> ProgressBar {
    let bar = Arc::new(Mutex::new(kdam::tqdm!(
        total = 0,
        desc = desc,
        animation = Animation::Classic,
        position = 0,
        unit = unit
    )));
    refresh_bar(&bar);
    bar
}

/// Force a refresh of the bar (e.g. so a counter shows 0 immediately).
pub fn refresh_bar(pb: &ProgressBar) {
    if let Ok(mut bar) = pb.try_lock() {
        let _ = bar.refresh();
    }
}

/// Update progress bar if available.
/// Uses try_lock so workers never block on the bar; a contended update is skipped.
pub fn update_progress_bar(pb: &ProgressBar, n: usize) {
    if let Ok(mut pb) = pb.try_lock() {
        let _ = pb.update(n);
    }
}

/// Advance an optional bar by one.
pub fn tick_progress(pb: Option<&ProgressBar>) {
    if let Some(pb) = pb {
        update_progress_bar(pb, 1);
    }
}

/// Final refresh and line break so following stderr output starts clean.
pub fn finish_progress(pb: Option<ProgressBar>) {
    if let Some(pb) = pb
        && let Ok(mut bar) = pb.lock()
    {
        let _ = bar.refresh();
        eprintln!();
    }
}
