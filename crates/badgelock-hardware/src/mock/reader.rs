//! Mock card reader implementation for testing and development.
//!
//! The mock keeps a single "card in the field" slot shared with a handle, so
//! tests can place, swap and remove cards between polls, or inject transport
//! failures to exercise the fail-closed path.

use std::sync::{Arc, Mutex, MutexGuard};

use badgelock_core::CardIdentifier;

use crate::{HardwareError, Result, traits::CardReader, types::ReaderInfo};

#[derive(Debug, Default)]
struct ReaderState {
    /// Raw response bytes the reader answers with (UID + status word).
    response: Option<Vec<u8>>,

    /// Number of upcoming reads that fail with a transport error.
    pending_failures: usize,

    /// Total number of read sequences performed.
    reads: usize,
}

/// Mock card reader.
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
///     handle.present(&[0x04, 0xAB, 0xCD, 0xEF])?;
///     assert_eq!(reader.poll().await.unwrap().as_str(), "04ABCDEF");
///
///     handle.remove();
///     assert_eq!(reader.poll().await, None);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockReader {
    state: Arc<Mutex<ReaderState>>,
    name: String,
}

impl MockReader {
    /// Create a new mock reader with the default name.
    ///
    /// Returns a tuple of (MockReader, MockReaderHandle) where the handle
    /// controls which card the reader sees.
    pub fn new() -> (Self, MockReaderHandle) {
        Self::with_name("Mock Card Reader".to_string())
    }

    /// Create a new mock reader with a custom name.
    pub fn with_name(name: String) -> (Self, MockReaderHandle) {
        let state = Arc::new(Mutex::new(ReaderState::default()));

        let reader = Self {
            state: Arc::clone(&state),
            name,
        };

        (reader, MockReaderHandle { state })
    }
}

impl CardReader for MockReader {
    async fn read_uid(&mut self) -> Result<Option<CardIdentifier>> {
        let mut state = lock_state(&self.state)?;
        state.reads += 1;

        if state.pending_failures > 0 {
            state.pending_failures -= 1;
            return Err(HardwareError::communication("simulated transport failure"));
        }

        match &state.response {
            Some(response) => crate::apdu::parse_uid_response(response).map(Some),
            None => Ok(None),
        }
    }

    async fn get_reader_info(&self) -> Result<ReaderInfo> {
        Ok(ReaderInfo::new(self.name.clone(), "mock"))
    }
}

/// Handle for controlling a mock card reader.
#[derive(Debug, Clone)]
pub struct MockReaderHandle {
    state: Arc<Mutex<ReaderState>>,
}

impl MockReaderHandle {
    /// Place a card with the given UID bytes on the reader.
    ///
    /// # Errors
    ///
    /// Returns an error if the UID is not a valid card identifier.
    pub fn present(&self, uid: &[u8]) -> Result<()> {
        CardIdentifier::from_bytes(uid)?;

        let mut response = uid.to_vec();
        response.extend_from_slice(&badgelock_core::constants::STATUS_SUCCESS);
        lock_state(&self.state)?.response = Some(response);
        Ok(())
    }

    /// Make the reader answer with a raw response (payload + status word).
    pub fn respond_raw(&self, response: Vec<u8>) -> Result<()> {
        lock_state(&self.state)?.response = Some(response);
        Ok(())
    }

    /// Remove the card from the reader's field.
    pub fn remove(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.response = None;
        }
    }

    /// Make the next `count` reads fail with a transport error.
    pub fn fail_next_reads(&self, count: usize) {
        if let Ok(mut state) = self.state.lock() {
            state.pending_failures = count;
        }
    }

    /// Number of read sequences the reader has performed.
    pub fn read_count(&self) -> usize {
        self.state.lock().map(|state| state.reads).unwrap_or(0)
    }
}

fn lock_state(state: &Mutex<ReaderState>) -> Result<MutexGuard<'_, ReaderState>> {
    state
        .lock()
        .map_err(|_| HardwareError::disconnected("mock reader state poisoned"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_reader_empty_field() {
        let (mut reader, handle) = MockReader::new();
        assert_eq!(reader.read_uid().await.unwrap(), None);
        assert_eq!(handle.read_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_reader_present_swap_remove() {
        let (mut reader, handle) = MockReader::new();

        handle.present(&[0x01, 0x02, 0x03, 0x04]).unwrap();
        assert_eq!(reader.poll().await.unwrap().as_str(), "01020304");

        handle.present(&[0x05, 0x06, 0x07, 0x08]).unwrap();
        assert_eq!(reader.poll().await.unwrap().as_str(), "05060708");

        handle.remove();
        assert_eq!(reader.poll().await, None);
    }

    #[tokio::test]
    async fn test_mock_reader_transport_failure_fails_closed() {
        let (mut reader, handle) = MockReader::new();
        handle.present(&[0xAB, 0x12, 0xCD, 0x34]).unwrap();
        handle.fail_next_reads(1);

        assert!(reader.read_uid().await.is_err());
        assert!(reader.poll().await.is_some());
    }

    #[tokio::test]
    async fn test_mock_reader_bad_status_fails_closed() {
        let (mut reader, handle) = MockReader::new();
        handle.respond_raw(vec![0xAB, 0x12, 0x6A, 0x81]).unwrap();

        assert!(matches!(
            reader.read_uid().await,
            Err(HardwareError::StatusWord { sw1: 0x6A, sw2: 0x81 })
        ));
        assert_eq!(reader.poll().await, None);
    }

    #[tokio::test]
    async fn test_mock_reader_rejects_empty_uid() {
        let (_reader, handle) = MockReader::new();
        assert!(handle.present(&[]).is_err());
    }

    #[tokio::test]
    async fn test_mock_reader_info() {
        let (reader, _handle) = MockReader::with_name("Test Reader".to_string());
        let info = reader.get_reader_info().await.unwrap();
        assert_eq!(info.name, "Test Reader");
        assert_eq!(info.transport, "mock");
    }
}
