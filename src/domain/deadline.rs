//! Wall-clock budget for one pipeline invocation.

use std::future::Future;
use tokio::time::{Duration, Instant, timeout_at};

/// Point in time after which outstanding upstream calls are abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Instant);

impl Deadline {
    /// Deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self(Instant::now() + budget)
    }

    pub fn instant(&self) -> Instant {
        self.0
    }

    pub fn has_passed(&self) -> bool {
        Instant::now() >= self.0
    }

    /// Runs `future` to completion or until the deadline.
    ///
    /// Returns `None` if the deadline fired first; the future is dropped.
    pub async fn run<F: Future>(&self, future: F) -> Option<F::Output> {
        timeout_at(self.0, future).await.ok()
    }
}
