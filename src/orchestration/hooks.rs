//! Shutdown callbacks registered by the tool

use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

type Hook = Box<dyn FnOnce() + Send>;

/// Shared FIFO of zero-argument callbacks run once at shutdown
#[derive(Clone, Default)]
pub struct ShutdownHooks {
    queue: Arc<Mutex<VecDeque<Hook>>>,
}

impl ShutdownHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a callback behind every one already registered
    pub fn push<F>(&self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.lock().push_back(Box::new(hook));
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Run every queued callback in registration order, each exactly once
    ///
    /// Callbacks queued while draining run too. A panicking callback is
    /// logged and does not prevent the rest from running.
    pub fn drain_and_run(&self) -> usize {
        let mut ran = 0;
        loop {
            // The guard must be gone before the hook runs
            let next = self.lock().pop_front();
            let Some(hook) = next else {
                break;
            };
            if panic::catch_unwind(AssertUnwindSafe(hook)).is_err() {
                warn!("Shutdown hook panicked");
            }
            ran += 1;
        }
        if ran > 0 {
            debug!("Ran {} shutdown hooks", ran);
        }
        ran
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Hook>> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for ShutdownHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownHooks")
            .field("pending", &self.len())
            .finish()
    }
}
