//! Host session collaborators.
//!
//! [`HostSuspendSignal`] and [`HostLockAction`] select the platform
//! implementation at compile time: the input-desktop query and
//! `LockWorkStation` on Windows, `loginctl` on Linux. Other platforms report
//! "not suspended" and refuse to lock.
//!
//! Every lock-status query is bounded by the signal's query timeout. The
//! Windows desktop query runs on the blocking pool so it never stalls the
//! tick loop; an overrun query reports "not suspended".

use std::time::Duration;

use tracing::debug;

use crate::{
    Result,
    traits::{LockAction, SuspendSignal},
};

#[cfg(target_os = "linux")]
mod linux;
#[cfg(windows)]
mod win32;

/// Suspend signal backed by the host operating system.
#[derive(Debug, Clone)]
pub struct HostSuspendSignal {
    query_timeout: Duration,
}

impl HostSuspendSignal {
    pub fn new(query_timeout: Duration) -> Self {
        Self { query_timeout }
    }
}

impl SuspendSignal for HostSuspendSignal {
    async fn is_suspended(&self) -> bool {
        match query_locked(self.query_timeout).await {
            Ok(locked) => locked,
            Err(e) => {
                debug!("Session lock query failed, assuming unlocked: {}", e);
                false
            }
        }
    }
}

/// Lock action backed by the host operating system.
#[derive(Debug, Clone, Default)]
pub struct HostLockAction;

impl LockAction for HostLockAction {
    async fn lock(&self) -> Result<()> {
        lock_session().await
    }
}

#[cfg(windows)]
async fn query_locked(timeout: Duration) -> Result<bool> {
    let query = tokio::task::spawn_blocking(win32::is_workstation_locked);
    match tokio::time::timeout(timeout, query).await {
        Ok(Ok(locked)) => Ok(locked),
        Ok(Err(e)) => Err(crate::HardwareError::other(format!(
            "Lock query task failed: {}",
            e
        ))),
        Err(_) => Err(crate::HardwareError::timeout(timeout.as_millis() as u64)),
    }
}

#[cfg(windows)]
async fn lock_session() -> Result<()> {
    win32::lock_workstation()
}

#[cfg(target_os = "linux")]
async fn query_locked(timeout: Duration) -> Result<bool> {
    linux::is_session_locked(timeout).await
}

#[cfg(target_os = "linux")]
async fn lock_session() -> Result<()> {
    linux::lock_session().await
}

#[cfg(not(any(windows, target_os = "linux")))]
async fn query_locked(_timeout: Duration) -> Result<bool> {
    Err(crate::HardwareError::unsupported("session lock query"))
}

#[cfg(not(any(windows, target_os = "linux")))]
async fn lock_session() -> Result<()> {
    Err(crate::HardwareError::unsupported("session lock"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_suspend_query_is_bounded() {
        let signal = HostSuspendSignal::new(Duration::from_millis(50));

        let answer =
            tokio::time::timeout(Duration::from_secs(5), signal.is_suspended()).await;
        assert!(answer.is_ok());
    }

    #[cfg(windows)]
    #[tokio::test]
    async fn test_windows_query_honours_timeout() {
        let started = std::time::Instant::now();
        let result = query_locked(Duration::from_millis(100)).await;

        assert!(
            result.is_ok() || matches!(result, Err(crate::HardwareError::Timeout { .. }))
        );
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
