//! Enum wrappers for collaborator dispatch.
//!
//! Native `async fn` in traits is not object-safe, so the driver cannot hold
//! a `Box<dyn CardReader>`. These enums provide concrete dispatch instead,
//! with hardware variants gated behind their cargo features.
//!
//! # Examples
//!
//! ```
//! use badgelock_hardware::devices::AnyCardReader;
//! use badgelock_hardware::mock::MockReader;
//!
//! let (reader, _handle) = MockReader::new();
//! let any_reader = AnyCardReader::Mock(reader);
//! ```

use badgelock_core::CardIdentifier;

use crate::mock::{MockLockAction, MockReader, MockSuspendSignal};
#[cfg(feature = "hardware-pcsc")]
use crate::pcsc_reader::PcscReader;
use crate::platform::{HostLockAction, HostSuspendSignal};
use crate::traits::{CardReader, LockAction, SuspendSignal};
use crate::{ReaderInfo, Result};

/// Enum wrapper for card reader dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyCardReader {
    /// Mock reader for development and testing.
    Mock(MockReader),

    /// PC/SC contactless reader.
    #[cfg(feature = "hardware-pcsc")]
    Pcsc(PcscReader),
}

impl CardReader for AnyCardReader {
    async fn read_uid(&mut self) -> Result<Option<CardIdentifier>> {
        match self {
            Self::Mock(device) => device.read_uid().await,
            #[cfg(feature = "hardware-pcsc")]
            Self::Pcsc(device) => device.read_uid().await,
        }
    }

    async fn get_reader_info(&self) -> Result<ReaderInfo> {
        match self {
            Self::Mock(device) => device.get_reader_info().await,
            #[cfg(feature = "hardware-pcsc")]
            Self::Pcsc(device) => device.get_reader_info().await,
        }
    }
}

/// Enum wrapper for suspend signal dispatch.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum AnySuspendSignal {
    /// Query the host operating system.
    Host(HostSuspendSignal),

    /// Controlled from a test handle.
    Mock(MockSuspendSignal),
}

impl SuspendSignal for AnySuspendSignal {
    async fn is_suspended(&self) -> bool {
        match self {
            Self::Host(signal) => signal.is_suspended().await,
            Self::Mock(signal) => signal.is_suspended().await,
        }
    }
}

/// Enum wrapper for lock action dispatch.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum AnyLockAction {
    /// Lock the host session.
    Host(HostLockAction),

    /// Count lock requests without locking anything.
    Mock(MockLockAction),

    /// Locking turned off by configuration; requests are accepted and ignored.
    Disabled,
}

impl LockAction for AnyLockAction {
    async fn lock(&self) -> Result<()> {
        match self {
            Self::Host(action) => action.lock().await,
            Self::Mock(action) => action.lock().await,
            Self::Disabled => Ok(()),
        }
    }
}
