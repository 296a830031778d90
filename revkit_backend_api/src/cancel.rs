use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::{Operation, VcsError, VcsResult};

/// Why an operation stopped before completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller flipped the cancellation flag.
    Requested,
    /// The deadline attached to the signal elapsed.
    DeadlineExceeded,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Requested => f.write_str("cancelled by caller"),
            Self::DeadlineExceeded => f.write_str("deadline exceeded"),
        }
    }
}

/// Cancellation signal accepted by every operation.
///
/// Clones share the same flag, so a caller can keep one copy and hand the
/// other to a blocking call.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Cancellation {
    /// A signal that never fires unless [`Cancellation::cancel`] is called.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A signal that also fires once `timeout` has elapsed from now.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    /// Request cancellation for every holder of this signal.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// The reason this signal has fired, if it has.
    #[must_use]
    pub fn reason(&self) -> Option<CancelReason> {
        if self.flag.load(Ordering::SeqCst) {
            return Some(CancelReason::Requested);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(CancelReason::DeadlineExceeded),
            _ => None,
        }
    }

    /// True once cancelled or past the deadline.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.reason().is_some()
    }

    /// The deadline attached to this signal.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Return a `Cancelled` error for `operation` if the signal has fired.
    ///
    /// # Errors
    ///
    /// Returns [`VcsError::Cancelled`] once the signal has fired.
    pub fn check(&self, operation: Operation) -> VcsResult<()> {
        match self.reason() {
            Some(reason) => Err(VcsError::Cancelled { operation, reason }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let signal = Cancellation::new();
        let held = signal.clone();
        assert!(signal.check(Operation::History).is_ok());

        held.cancel();
        assert_eq!(signal.reason(), Some(CancelReason::Requested));
        assert!(matches!(
            signal.check(Operation::History),
            Err(VcsError::Cancelled {
                operation: Operation::History,
                reason: CancelReason::Requested
            })
        ));
    }

    #[test]
    fn elapsed_deadline_fires() {
        let signal = Cancellation::with_timeout(Duration::ZERO);
        assert_eq!(signal.reason(), Some(CancelReason::DeadlineExceeded));
    }

    #[test]
    fn distant_deadline_does_not_fire() {
        let signal = Cancellation::with_timeout(Duration::from_secs(3600));
        assert!(!signal.is_cancelled());
        assert!(signal.deadline().is_some());
    }
}
