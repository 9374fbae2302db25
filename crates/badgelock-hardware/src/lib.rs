//! Hardware collaborators for the badgelock access control system.
//!
//! This crate provides trait-based abstractions over everything the access
//! state machine talks to outside the process: the contactless card reader,
//! the host's session-lock status and the host lock primitive. Mock
//! implementations allow the whole system to run without a reader or a
//! desktop session.
//!
//! # Design Philosophy
//!
//! - **Async-first**: all I/O uses native `async fn` in traits (Edition 2024
//!   RPITIT).
//! - **Bounded**: a reader poll never blocks indefinitely; the PC/SC reader
//!   runs its exchange on the blocking pool under a timeout.
//! - **Fail closed**: [`CardReader::poll`] turns every transport error into
//!   "no card present".
//!
//! # Card Readers
//!
//! ```no_run
//! use badgelock_hardware::traits::CardReader;
//!
//! async fn current_card<R: CardReader>(reader: &mut R) -> Option<String> {
//!     reader.poll().await.map(|card| card.to_string())
//! }
//! ```
//!
//! # Session Lock
//!
//! ```no_run
//! use badgelock_hardware::traits::{LockAction, SuspendSignal};
//!
//! async fn lock_if_unlocked<S: SuspendSignal, L: LockAction>(signal: &S, lock: &L) {
//!     if !signal.is_suspended().await {
//!         lock.lock().await.ok();
//!     }
//! }
//! ```
//!
//! # Features
//!
//! - `hardware-pcsc`: PC/SC reader support ([`pcsc_reader::PcscReader`]). Requires the
//!   system PC/SC library (pcsclite on Linux, WinSCard on Windows).

pub mod apdu;
pub mod devices;
pub mod error;
pub mod exchange;
pub mod mock;
#[cfg(feature = "hardware-pcsc")]
pub mod pcsc_reader;
pub mod platform;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use devices::{AnyCardReader, AnyLockAction, AnySuspendSignal};
pub use error::{HardwareError, Result};
pub use platform::{HostLockAction, HostSuspendSignal};
pub use traits::{CardReader, LockAction, SuspendSignal};
pub use types::ReaderInfo;
