//! Mock session collaborators: suspend signal and lock action.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::{
    HardwareError, Result,
    traits::{LockAction, SuspendSignal},
};

/// Mock suspend signal whose state is flipped through a handle.
#[derive(Debug, Clone, Default)]
pub struct MockSuspendSignal {
    suspended: Arc<AtomicBool>,
}

impl MockSuspendSignal {
    /// Create a new, unsuspended signal and its control handle.
    pub fn new() -> (Self, MockSuspendSignalHandle) {
        let suspended = Arc::new(AtomicBool::new(false));
        (
            Self {
                suspended: Arc::clone(&suspended),
            },
            MockSuspendSignalHandle { suspended },
        )
    }
}

impl SuspendSignal for MockSuspendSignal {
    async fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::SeqCst)
    }
}

/// Handle for controlling a [`MockSuspendSignal`].
#[derive(Debug, Clone)]
pub struct MockSuspendSignalHandle {
    suspended: Arc<AtomicBool>,
}

impl MockSuspendSignalHandle {
    pub fn set_suspended(&self, suspended: bool) {
        self.suspended.store(suspended, Ordering::SeqCst);
    }
}

/// Mock lock action that counts invocations.
///
/// Clones share the same counters, so a clone handed to the driver can be
/// inspected from the test.
#[derive(Debug, Clone, Default)]
pub struct MockLockAction {
    invocations: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
}

impl MockLockAction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent lock requests fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of lock requests received so far, failed ones included.
    pub fn lock_count(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

impl LockAction for MockLockAction {
    async fn lock(&self) -> Result<()> {
        self.invocations.fetch_add(1, Ordering::SeqCst);

        if self.failing.load(Ordering::SeqCst) {
            return Err(HardwareError::lock_failed("simulated lock failure"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_suspend_signal_toggle() {
        let (signal, handle) = MockSuspendSignal::new();
        assert!(!signal.is_suspended().await);

        handle.set_suspended(true);
        assert!(signal.is_suspended().await);
    }

    #[tokio::test]
    async fn test_mock_lock_action_counts_clones() {
        let lock = MockLockAction::new();
        let clone = lock.clone();

        clone.lock().await.unwrap();
        lock.set_failing(true);
        assert!(clone.lock().await.is_err());

        assert_eq!(lock.lock_count(), 2);
    }
}
