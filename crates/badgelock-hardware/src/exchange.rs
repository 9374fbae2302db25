//! Bounded blocking exchanges.
//!
//! Reader drivers expose blocking calls. [`BlockingExchange`] runs one on the
//! blocking thread pool under a timeout. An exchange that overruns keeps
//! running in the background, and no new exchange starts until it finishes,
//! so a hung device holds at most one blocking thread.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::{HardwareError, Result};

/// Runs blocking device operations one at a time under a timeout.
#[derive(Debug)]
pub struct BlockingExchange<T> {
    timeout: Duration,
    in_flight: Option<JoinHandle<Result<T>>>,
}

impl<T: Send + 'static> BlockingExchange<T> {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            in_flight: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns `true` while an overrun exchange is still running.
    pub fn is_busy(&self) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Run `operation` on the blocking pool, bounded by the timeout.
    ///
    /// The result of an overrun exchange is discarded when it completes.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::Timeout` if the operation overruns,
    /// `HardwareError::CommunicationError` without starting `operation` while
    /// a previous overrun is still running, or the operation's own error.
    pub async fn run<F>(&mut self, operation: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        if self.is_busy() {
            return Err(HardwareError::communication(
                "previous exchange still in progress",
            ));
        }
        if self.in_flight.take().is_some() {
            debug!("Discarding result of an overrun exchange");
        }

        let mut task = tokio::task::spawn_blocking(operation);
        match tokio::time::timeout(self.timeout, &mut task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(HardwareError::other(format!("Exchange task failed: {}", e))),
            Err(_) => {
                self.in_flight = Some(task);
                Err(HardwareError::timeout(self.timeout.as_millis() as u64))
            }
        }
    }
}
