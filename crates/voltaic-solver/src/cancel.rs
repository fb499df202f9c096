//! Cooperative cancellation for long-running analyses.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A shared flag checked between transient time steps.
///
/// Clone the token, hand one copy to the analysis and keep the other;
/// calling [`cancel`](CancelToken::cancel) makes the run stop at the next
/// step boundary with a typed error. Mid-step computation is never
/// interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_propagates_to_clones() {
        let token = CancelToken::new();
        let seen_by_run = token.clone();
        assert!(!seen_by_run.is_cancelled());

        token.cancel();
        assert!(seen_by_run.is_cancelled());
    }
}
