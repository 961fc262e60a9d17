//! Periodic background worker thread
//!
//! A worker runs a tick closure on its own named thread. The closure returns
//! how long to wait before the next tick, which is how each service expresses
//! its normal interval and its error back-off.
//!
//! Stopping drops the sender half of the stop channel. The thread's
//! `recv_timeout()` then returns `Disconnected` and the loop exits, so a stop
//! request never waits out a full interval. A tick that is already running
//! always completes first.
//!
//! A panicking tick is caught and logged; the worker waits `panic_backoff`
//! and carries on.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

/// Handle to a running periodic worker
///
/// Dropping the handle stops and joins the worker.
pub struct WorkerHandle {
    name: String,
    /// Stop signal (Option to allow explicit drop before join)
    stop_tx: Option<Sender<()>>,
    /// Thread join handle
    handle: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Spawn a worker that waits `initial_delay`, then calls `tick` repeatedly.
    ///
    /// `tick` returns the delay before its next invocation. `live` is
    /// incremented while the thread body runs and decremented when it exits.
    pub fn spawn<F>(
        name: &str,
        initial_delay: Duration,
        panic_backoff: Duration,
        live: Arc<AtomicUsize>,
        mut tick: F,
    ) -> io::Result<Self>
    where
        F: FnMut() -> Duration + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let thread_name = name.to_string();

        let handle = thread::Builder::new().name(name.into()).spawn(move || {
            live.fetch_add(1, Ordering::SeqCst);
            let _live = LiveGuard(live);
            debug!("{} worker started", thread_name);

            let mut wait = initial_delay;
            loop {
                match stop_rx.recv_timeout(wait) {
                    Err(RecvTimeoutError::Timeout) => {
                        wait = match panic::catch_unwind(AssertUnwindSafe(|| tick())) {
                            Ok(next) => next,
                            Err(_) => {
                                warn!(
                                    "{} worker tick panicked, retrying in {:?}",
                                    thread_name, panic_backoff
                                );
                                panic_backoff
                            }
                        };
                    }
                    // Explicit message or dropped sender both mean stop
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }

            debug!("{} worker exiting", thread_name);
        })?;

        info!("Started {} worker", name);
        Ok(Self {
            name: name.to_string(),
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Signal the worker and wait for it to exit. Safe to call more than once.
    pub fn stop(&mut self) {
        // Drop the sender FIRST; joining while it is alive would deadlock.
        drop(self.stop_tx.take());

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("{} worker panicked", self.name);
            } else {
                info!("Stopped {} worker", self.name);
            }
        }
    }

    /// Check if the worker thread is still running
    pub fn is_alive(&self) -> bool {
        self.handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

struct LiveGuard(Arc<AtomicUsize>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Lock a mutex, recovering the data if another thread panicked while holding it.
pub(crate) fn lock_recover<'a, T>(mutex: &'a Mutex<T>, what: &str) -> MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(|e| {
        warn!("Recovering poisoned {} lock", what);
        e.into_inner()
    })
}

pub(crate) fn read_recover<'a, T>(lock: &'a RwLock<T>, what: &str) -> RwLockReadGuard<'a, T> {
    lock.read().unwrap_or_else(|e| {
        warn!("Recovering poisoned {} lock", what);
        e.into_inner()
    })
}

pub(crate) fn write_recover<'a, T>(lock: &'a RwLock<T>, what: &str) -> RwLockWriteGuard<'a, T> {
    lock.write().unwrap_or_else(|e| {
        warn!("Recovering poisoned {} lock", what);
        e.into_inner()
    })
}
