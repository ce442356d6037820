//! # Daemon Handle
//!
//! Shared async front for a [`Daemon`]. All access goes through one
//! `tokio::sync::Mutex`, so flushes never overlap: a second `sync_now`
//! waits for the running flush and then flushes whatever is left.
//!
//! The debouncer is a background task holding only a weak reference. It
//! sleeps until the scheduler's deadline or until woken by an edit, and
//! exits once the handle is disposed or every strong handle is gone.

use crate::activation::{invoke, HandlerOutcome};
use crate::daemon::{Daemon, FlushReport};
use crate::errors::DaemonResult;
use crate::keys::{Key, KeyDispatch, KeyOutcome};
use crate::surface::Surface;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

#[derive(Clone)]
pub struct DaemonHandle {
    inner: Arc<Mutex<Daemon>>,
    wake: Arc<Notify>,
    closed: Arc<AtomicBool>,
}

impl DaemonHandle {
    /// Wraps a daemon without a debouncer; flushes only on `sync_now`
    pub fn new(daemon: Daemon) -> Self {
        Self {
            inner: Arc::new(Mutex::new(daemon)),
            wake: Arc::new(Notify::new()),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Wraps a daemon and spawns its debouncer on the current runtime
    pub fn spawn(daemon: Daemon) -> (Self, JoinHandle<()>) {
        let handle = Self::new(daemon);
        let task = tokio::spawn(debounce_loop(
            Arc::downgrade(&handle.inner),
            Arc::clone(&handle.wake),
            Arc::clone(&handle.closed),
        ));
        (handle, task)
    }

    /// Runs a user edit and wakes the debouncer
    pub async fn edit<R>(&self, f: impl FnOnce(&mut Surface) -> R) -> DaemonResult<R> {
        let result = self.inner.lock().await.edit(f);
        self.notify();
        result
    }

    /// Input/paste event: records may be waiting
    pub fn notify(&self) {
        self.wake.notify_one();
    }

    /// Flushes now; resolves after the flush and re-render complete
    pub async fn sync_now(&self) -> Option<FlushReport> {
        self.inner.lock().await.sync_now()
    }

    /// Exclusive access to the daemon
    pub async fn with<R>(&self, f: impl FnOnce(&mut Daemon) -> R) -> R {
        let mut daemon = self.inner.lock().await;
        f(&mut daemon)
    }

    /// Routes a structural key. Pending edits are settled first so handler
    /// addresses match the canonical document; the handler itself runs
    /// without the lock.
    pub async fn handle_key(&self, key: Key) -> KeyOutcome {
        let dispatch = {
            let mut daemon = self.inner.lock().await;
            daemon.sync_now();
            daemon.dispatch_key(key)
        };

        let (kind, handle, context) = match dispatch {
            KeyDispatch::Native => return KeyOutcome::Native,
            KeyDispatch::Prevented => return KeyOutcome::Prevented,
            KeyDispatch::Delegate { kind, handle, context } => (kind, handle, context),
        };

        match invoke(handle.as_ref(), kind, context).await {
            HandlerOutcome::Unhandled => KeyOutcome::Native,
            HandlerOutcome::Handled { operations, caret } => {
                let mut daemon = self.inner.lock().await;
                let rejected = operations
                    .into_iter()
                    .filter_map(|op| daemon.add_to_operations(op).err())
                    .count();
                if rejected > 0 {
                    warn!(?key, rejected, "handler operations rejected");
                }
                if let Some(directive) = caret {
                    daemon.set_future_caret(directive);
                }
                daemon.sync_now();
                debug!(?key, ?kind, "key handled");
                KeyOutcome::Handled { rejected }
            }
        }
    }

    /// Stops the debouncer; the daemon itself lives on
    pub fn dispose(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.wake.notify_one();
    }

    pub fn is_disposed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

async fn debounce_loop(weak: Weak<Mutex<Daemon>>, wake: Arc<Notify>, closed: Arc<AtomicBool>) {
    loop {
        if closed.load(Ordering::SeqCst) {
            break;
        }
        let Some(inner) = weak.upgrade() else {
            break;
        };

        let deadline = {
            let mut daemon = inner.lock().await;
            let now = Instant::now();
            if let Some(report) = daemon.poll(now) {
                debug!(operations = report.operations.len(), "debounced flush");
            }
            daemon.next_deadline()
        };
        drop(inner);

        match deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = sleep_until(deadline) => {}
                    _ = wake.notified() => {}
                }
            }
            None => wake.notified().await,
        }
    }
    debug!("debouncer stopped");
}
