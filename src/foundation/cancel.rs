use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::foundation::error::{ClipframeError, ClipframeResult};

/// Shared cancellation signal with an optional deadline.
///
/// Clones observe the same flag. Long-running stages poll [`CancelToken::check`] between units of
/// work, so cancellation latency is bounded by one frame or one poll interval.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// Token that is only cancelled explicitly.
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that also trips once `timeout` has elapsed from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            flag: Arc::default(),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    /// Request cancellation for every clone of this token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// `true` once cancelled or past the deadline.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst) || self.deadline_passed()
    }

    fn deadline_passed(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Time left before the deadline, if one is set.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Return an error when the token has tripped.
    pub fn check(&self) -> ClipframeResult<()> {
        if self.flag.load(Ordering::SeqCst) {
            return Err(ClipframeError::cancelled("render was cancelled"));
        }
        if self.deadline_passed() {
            return Err(ClipframeError::cancelled("render exceeded its deadline"));
        }
        Ok(())
    }
}
