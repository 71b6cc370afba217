//! Cooperative cancellation for long-running mining and enrichment calls

use crate::io::error::{MotifError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Shared cancellation flag with an optional deadline
///
/// Clones share the same flag, so a caller can keep one clone and cancel an
/// analysis running on another thread. Engines only read the token; a
/// cancelled call returns [`MotifError::Cancelled`] and leaves engine state as
/// it was.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancellationToken {
    /// Token that only fires when [`cancel`](Self::cancel) is called
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that also fires once `timeout` has elapsed from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::default(),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    /// Token that also fires at `deadline`
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            cancelled: Arc::default(),
            deadline: Some(deadline),
        }
    }

    /// Deadline, if one was set
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Request cancellation for every clone of this token
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested or the deadline has passed
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
            || self
                .deadline
                .is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Fail with a cancellation error if the token has fired
    ///
    /// # Errors
    ///
    /// Returns [`MotifError::Cancelled`] naming `operation` once the token fires
    pub fn check(&self, operation: &'static str) -> Result<()> {
        if self.is_cancelled() {
            return Err(MotifError::Cancelled { operation });
        }
        Ok(())
    }
}
