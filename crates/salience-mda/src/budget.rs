//! Cooperative cancellation and wall-clock limits for long analyses.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// A shareable flag the caller flips to abort an analysis.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create an untripped token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Return `true` once [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Why a budget stopped the work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BudgetExceeded {
    /// The token was cancelled.
    #[error("cancelled")]
    Cancelled,
    /// The time limit elapsed.
    #[error("time limit of {limit:?} exceeded after {elapsed:?}")]
    TimeLimit {
        /// Time spent so far.
        elapsed: Duration,
        /// Configured limit.
        limit: Duration,
    },
}

/// Cancellation token plus an optional deadline, checked between work blocks.
#[derive(Debug, Clone)]
pub struct Budget {
    token: CancellationToken,
    started: Instant,
    limit: Option<Duration>,
}

impl Budget {
    /// Start a budget now.
    #[must_use]
    pub fn new(token: CancellationToken, limit: Option<Duration>) -> Self {
        Self {
            token,
            started: Instant::now(),
            limit,
        }
    }

    /// A budget that never trips.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::new(CancellationToken::new(), None)
    }

    /// Return the time spent since the budget started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Return the configured limit.
    #[must_use]
    pub fn limit(&self) -> Option<Duration> {
        self.limit
    }

    /// Fail if the token is cancelled or the limit has elapsed.
    ///
    /// # Errors
    ///
    /// Returns [`BudgetExceeded`] describing which bound tripped.
    pub fn check(&self) -> Result<(), BudgetExceeded> {
        if self.token.is_cancelled() {
            return Err(BudgetExceeded::Cancelled);
        }
        if let Some(limit) = self.limit {
            let elapsed = self.elapsed();
            if elapsed >= limit {
                return Err(BudgetExceeded::TimeLimit { elapsed, limit });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_never_trips() {
        assert!(Budget::unbounded().check().is_ok());
    }

    #[test]
    fn cancel_is_seen_through_clones() {
        let token = CancellationToken::new();
        let budget = Budget::new(token.clone(), None);
        assert!(budget.check().is_ok());
        token.cancel();
        assert_eq!(budget.check(), Err(BudgetExceeded::Cancelled));
    }

    #[test]
    fn elapsed_limit_trips() {
        let budget = Budget::new(CancellationToken::new(), Some(Duration::from_nanos(1)));
        std::thread::sleep(Duration::from_millis(2));
        assert!(matches!(
            budget.check(),
            Err(BudgetExceeded::TimeLimit { .. })
        ));
    }
}
