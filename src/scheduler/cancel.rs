use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::ClipError;

/// Cooperative cancellation flag shared between the presentation thread and
/// a decode running on the pool.
///
/// Cancelling is not instantaneous: work already past its last check runs to
/// completion, so whoever applies the result must check the token again.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent; every clone observes it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// `Err(ClipError::Cancelled)` once cancelled, for use with `?`.
    pub fn check(&self) -> Result<(), ClipError> {
        if self.is_cancelled() {
            Err(ClipError::Cancelled)
        } else {
            Ok(())
        }
    }
}
