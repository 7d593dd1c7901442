//! Auto-refresh: poll server stats and reload results when they change.
//!
//! One background thread per [`AutoRefresh`], stopped through an `mpsc`
//! channel. Starting again cancels the previous thread first, so at most one
//! timer is ever live. Cancelling never waits for a tick in flight: the old
//! thread is detached and exits once that tick returns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::api::Backend;
use crate::config::schema::RefreshConfig;
use crate::loader::{LoadReport, VisualizationLoader};
use crate::notify::Notifier;
use crate::render::ResultsView;

// ---------------------------------------------------------------------------
// Change detection
// ---------------------------------------------------------------------------

/// Last server update seen by this session.
#[derive(Debug, Clone, Default)]
pub struct RefreshState {
    last_update: Option<DateTime<Utc>>,
}

impl RefreshState {
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    /// Record the server's `last_update`. Returns true when a reload is due:
    /// the timestamp is strictly newer than the cached one, or nothing was
    /// cached yet. A missing server timestamp never triggers.
    pub fn observe(&mut self, server: Option<DateTime<Utc>>) -> bool {
        let Some(ts) = server else {
            return false;
        };
        match self.last_update {
            Some(cached) if ts <= cached => false,
            _ => {
                self.last_update = Some(ts);
                true
            }
        }
    }
}

#[derive(Debug)]
pub enum TickOutcome {
    Unchanged,
    Reloaded(LoadReport),
    /// Stats could not be fetched; retried on the next tick.
    Failed,
}

/// One refresh cycle: fetch stats, compare, reload on change.
pub fn tick(
    backend: &dyn Backend,
    notifier: &dyn Notifier,
    state: &Mutex<RefreshState>,
    limit: u32,
    view: &mut dyn ResultsView,
) -> TickOutcome {
    let stats = match backend.stats() {
        Ok(stats) => stats,
        Err(e) => {
            notifier.diagnostic(&format!("auto-refresh: {e:#}"));
            return TickOutcome::Failed;
        }
    };

    let changed = match state.lock() {
        Ok(mut s) => s.observe(stats.last_update),
        Err(_) => false,
    };
    if !changed {
        return TickOutcome::Unchanged;
    }

    view.set_updating(true);
    let report = VisualizationLoader::new(backend, notifier, limit).load_results(None, None, view);
    view.set_updating(false);
    TickOutcome::Reloaded(report)
}

// ---------------------------------------------------------------------------
// Timer
// ---------------------------------------------------------------------------

struct RefreshHandle {
    stop_tx: Sender<()>,
    cancelled: Arc<AtomicBool>,
}

/// Owns the refresh thread. Dropping it stops the thread.
pub struct AutoRefresh {
    interval: Duration,
    state: Arc<Mutex<RefreshState>>,
    handle: Option<RefreshHandle>,
}

impl AutoRefresh {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            state: Arc::new(Mutex::new(RefreshState::default())),
            handle: None,
        }
    }

    pub fn from_config(config: &RefreshConfig) -> Self {
        Self::new(Duration::from_millis(config.interval_ms))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Shared change-detection state, for tick closures.
    pub fn state(&self) -> Arc<Mutex<RefreshState>> {
        Arc::clone(&self.state)
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Run `on_tick` every interval on a background thread. Any timer
    /// already running is cancelled first.
    pub fn start<F>(&mut self, mut on_tick: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.cancel();

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let interval = self.interval;
        thread::spawn(move || {
            loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) if !flag.load(Ordering::SeqCst) => on_tick(),
                    // stop signal, or the owner is gone
                    _ => break,
                }
            }
        });

        self.handle = Some(RefreshHandle { stop_tx, cancelled });
    }

    /// Cancel the timer and tell the user. Returns without waiting; a tick
    /// in flight completes on its own and no further tick starts.
    pub fn stop(&mut self, notifier: &dyn Notifier) {
        if self.cancel() {
            notifier.info("Auto-refresh stopped");
        }
    }

    fn cancel(&mut self) -> bool {
        let Some(handle) = self.handle.take() else {
            return false;
        };
        handle.cancelled.store(true, Ordering::SeqCst);
        let _ = handle.stop_tx.send(());
        true
    }
}

impl Drop for AutoRefresh {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(secs, 0).single()
    }

    #[test]
    fn first_timestamp_triggers() {
        let mut state = RefreshState::default();
        assert!(state.observe(at(100)));
        assert_eq!(state.last_update(), at(100));
    }

    #[test]
    fn equal_or_older_does_not_trigger() {
        let mut state = RefreshState::default();
        state.observe(at(100));
        assert!(!state.observe(at(100)));
        assert!(!state.observe(at(50)));
        assert_eq!(state.last_update(), at(100));
    }

    #[test]
    fn newer_triggers_once() {
        let mut state = RefreshState::default();
        state.observe(at(100));
        assert!(state.observe(at(200)));
        assert!(!state.observe(at(200)));
    }

    #[test]
    fn missing_timestamp_never_triggers() {
        let mut state = RefreshState::default();
        assert!(!state.observe(None));
        state.observe(at(100));
        assert!(!state.observe(None));
        assert_eq!(state.last_update(), at(100));
    }
}
