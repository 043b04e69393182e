use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation signal threaded from `Serve` down through every
/// worker into each `Request` a handler sees (spec §5 "Cancellation").
///
/// Grounded on the teacher's `shutdown: Arc<Mutex<bool>>` flag
/// (`examples/hammer90-embeddable-rest-server/src/lib.rs`), generalized to a
/// cheaply-cloned read side handlers can poll without needing the lock that
/// only the owning `Server` takes to fire it.
#[derive(Clone, Debug)]
pub struct CancellationContext {
    done: Arc<AtomicBool>,
}

impl CancellationContext {
    pub fn new() -> Self {
        Self {
            done: Arc::new(AtomicBool::new(false)),
        }
    }

    /// True once `cancel` has been called. Handlers poll this to honor
    /// shutdown during long-running work; the accept loop and workers poll
    /// it at their respective wait points.
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.done.store(true, Ordering::SeqCst);
    }
}

impl Default for CancellationContext {
    fn default() -> Self {
        Self::new()
    }
}
