//! GET UID exchange framing.
//!
//! The reader is driven with a single fixed 5-byte command. A response
//! carries the UID payload followed by the two status bytes (SW1, SW2);
//! anything other than `90 00` means the card did not answer the request.
//!
//! ```text
//! request:  FF CA 00 00 00
//! response: <uid bytes...> SW1 SW2
//! ```

use badgelock_core::CardIdentifier;
use badgelock_core::constants::{GET_UID_COMMAND, STATUS_SUCCESS};

use crate::{HardwareError, Result};

/// The command sent to the reader on every poll.
#[inline]
#[must_use]
pub fn get_uid_command() -> &'static [u8] {
    &GET_UID_COMMAND
}

/// Split a raw response into payload and status word.
///
/// # Errors
///
/// Returns `HardwareError::InvalidData` if the response is shorter than the
/// two status bytes.
pub fn split_status(response: &[u8]) -> Result<(&[u8], u8, u8)> {
    if response.len() < 2 {
        return Err(HardwareError::invalid_data(format!(
            "Response too short: {} bytes",
            response.len()
        )));
    }

    let (payload, status) = response.split_at(response.len() - 2);
    Ok((payload, status[0], status[1]))
}

/// Decode a GET UID response into a card identifier.
///
/// # Errors
///
/// Returns an error if:
/// - The response is truncated
/// - The status word is not the success sentinel
/// - The UID payload is empty or oversized
pub fn parse_uid_response(response: &[u8]) -> Result<CardIdentifier> {
    let (payload, sw1, sw2) = split_status(response)?;

    if [sw1, sw2] != STATUS_SUCCESS {
        return Err(HardwareError::StatusWord { sw1, sw2 });
    }

    Ok(CardIdentifier::from_bytes(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_command_is_five_bytes() {
        assert_eq!(get_uid_command(), &[0xFF, 0xCA, 0x00, 0x00, 0x00]);
    }

    #[rstest]
    #[case(&[0xAB, 0x12, 0xCD, 0x34, 0x90, 0x00], "AB12CD34")]
    #[case(&[0x01, 0x01, 0x02, 0x12, 0xB4, 0x0E, 0x4F, 0x29, 0x90, 0x00], "01010212B40E4F29")]
    fn test_parse_success(#[case] response: &[u8], #[case] expected: &str) {
        let card = parse_uid_response(response).unwrap();
        assert_eq!(card.as_str(), expected);
    }

    #[rstest]
    #[case(&[0x6A, 0x81])]
    #[case(&[0xAB, 0x12, 0x63, 0x00])]
    fn test_parse_failure_status(#[case] response: &[u8]) {
        let error = parse_uid_response(response).unwrap_err();
        assert!(matches!(error, HardwareError::StatusWord { .. }));
    }

    #[rstest]
    #[case(&[])]
    #[case(&[0x90])]
    #[case(&[0x90, 0x00])]
    fn test_parse_invalid_data(#[case] response: &[u8]) {
        let error = parse_uid_response(response).unwrap_err();
        assert!(matches!(error, HardwareError::InvalidData { .. }));
    }
}
