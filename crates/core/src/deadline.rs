//! Stage time budgets and cooperative cancellation
//!
//! Long-running stages call [`StageDeadline::check`] between units of work
//! (trees, folds, scenario batches). A shared [`CancellationToken`] lets one
//! stage, or the caller, stop the ones that follow.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::errors::{AgroError, Result};

/// Shared cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Time budget for one named stage
#[derive(Debug, Clone)]
pub struct StageDeadline {
    stage: &'static str,
    expires_at: Option<Instant>,
    token: CancellationToken,
}

impl StageDeadline {
    /// A deadline that never expires and is never cancelled
    pub fn unbounded(stage: &'static str) -> Self {
        Self {
            stage,
            expires_at: None,
            token: CancellationToken::new(),
        }
    }

    /// Start the clock for `stage` now
    pub fn start(stage: &'static str, budget: Option<Duration>, token: CancellationToken) -> Self {
        Self {
            stage,
            expires_at: budget.map(|b| Instant::now() + b),
            token,
        }
    }

    pub fn stage(&self) -> &'static str {
        self.stage
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Fail if the stage was cancelled or ran out of time
    ///
    /// Running out of time also cancels the shared token so later stages
    /// stop without starting.
    pub fn check(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(AgroError::Cancelled { stage: self.stage });
        }
        if let Some(expires_at) = self.expires_at {
            if Instant::now() >= expires_at {
                self.token.cancel();
                return Err(AgroError::DeadlineExceeded { stage: self.stage });
            }
        }
        Ok(())
    }
}
