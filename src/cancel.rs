// src/cancel.rs
// =============================================================================
// Cancellation for a page mirror.
//
// A page stops issuing new downloads once either:
// - the shared flag is raised (Ctrl-C handler, or any other caller), or
// - its deadline has passed.
// In-flight downloads are left to finish; the page then reports Cancelled.
//
// Rust concepts:
// - Arc<AtomicBool>: one flag shared by every clone
// - Ordering::SeqCst: plain load/store, no locking needed
// - Option<Instant>: a deadline only when a timeout was given
// =============================================================================

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag for every clone sharing it
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Same flag, with a deadline `timeout` from now
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            flag: Arc::clone(&self.flag),
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        if self.flag.load(Ordering::SeqCst) {
            return true;
        }
        matches!(self.deadline, Some(deadline) if Instant::now() >= deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_is_shared_between_clones() {
        let cancel = Cancellation::new();
        let page = cancel.with_timeout(Duration::from_secs(60));
        assert!(!page.is_cancelled());

        cancel.cancel();
        assert!(page.is_cancelled());
    }

    #[test]
    fn test_expired_deadline_cancels() {
        let cancel = Cancellation::new().with_timeout(Duration::ZERO);
        assert!(cancel.is_cancelled());
    }
}
