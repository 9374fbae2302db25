//! Hardware collaborator trait definitions.
//!
//! These traits establish the contract between the access state machine's
//! driver and the world outside it: the contactless reader, the host's
//! session-lock status and the lock primitive itself.
//!
//! All traits use native `async fn` methods (Edition 2024 RPITIT), so they are
//! not object-safe. Dynamic selection goes through the enum wrappers in
//! [`devices`](crate::devices).

#![allow(async_fn_in_trait)]

use badgelock_core::CardIdentifier;
use tracing::debug;

use crate::error::Result;
use crate::types::ReaderInfo;

/// Contactless card reader.
///
/// Implementors provide [`read_uid`](CardReader::read_uid), which reports
/// transport failures as errors. Callers use [`poll`](CardReader::poll), which
/// fails closed: any error resolves to "no card present".
///
/// # Examples
///
/// ```
/// use badgelock_hardware::mock::MockReader;
/// use badgelock_hardware::traits::CardReader;
///
/// #[tokio::main]
/// async fn main() -> badgelock_hardware::Result<()> {
///     let (mut reader, handle) = MockReader::new();
///
///     assert_eq!(reader.poll().await, None);
///
///     handle.present(&[0xAB, 0x12, 0xCD, 0x34])?;
///     let card = reader.poll().await.unwrap();
///     assert_eq!(card.as_str(), "AB12CD34");
///     Ok(())
/// }
/// ```
pub trait CardReader: Send + Sync {
    /// Run one bounded read sequence against the reader.
    ///
    /// Returns `Ok(None)` when no card is in the field.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The reader is disconnected or the transport fails
    /// - The card answers with a non-success status word
    /// - The sequence does not complete within the reader's time bound
    async fn read_uid(&mut self) -> Result<Option<CardIdentifier>>;

    /// Get reader information.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader cannot be queried.
    async fn get_reader_info(&self) -> Result<ReaderInfo>;

    /// Poll the reader once, treating every failure as "no card".
    ///
    /// A flaky reader must never look like a valid credential, so ambiguity
    /// resolves to the unauthenticated state.
    async fn poll(&mut self) -> Option<CardIdentifier> {
        match self.read_uid().await {
            Ok(card) => card,
            Err(e) => {
                debug!("Card read failed, treating as no card: {}", e);
                None
            }
        }
    }
}

/// Host session suspend/lock status.
///
/// Reports whether the workstation is already locked (or on a secure
/// desktop) by something other than this system.
pub trait SuspendSignal: Send + Sync {
    /// Returns `true` if the host session is currently locked.
    async fn is_suspended(&self) -> bool;
}

/// Host session lock primitive.
///
/// Completion of the lock is not observed; the caller learns about it only
/// through a later [`SuspendSignal`] query.
pub trait LockAction: Send + Sync {
    /// Request that the host session be locked.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform refused or could not run the request.
    async fn lock(&self) -> Result<()>;
}
