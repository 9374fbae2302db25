//! Shared constants for the badgelock access control system.
//!
//! Timing defaults, the contactless reader exchange and the operator-facing
//! copy live here so the engine, the hardware layer and the command line
//! agree on a single definition.
//!
//! # Usage
//!
//! ```
//! use badgelock_core::constants::*;
//! use std::time::Duration;
//!
//! let timeout = Duration::from_secs(DEFAULT_TIMEOUT_SECS);
//! assert_eq!(timeout.as_secs(), 10);
//! assert_eq!(GET_UID_COMMAND.len(), 5);
//! ```

// ============================================================================
// Timing
// ============================================================================

/// Seconds without valid access before the workstation is locked.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Longest accepted lock timeout (one day).
pub const MAX_TIMEOUT_SECS: u64 = 86_400;

/// Period of the driver tick in milliseconds.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;

/// Longest accepted tick period or startup delay in milliseconds.
pub const MAX_TICK_INTERVAL_MS: u64 = 60_000;

/// Delay before the very first tick, shorter than the regular period so the
/// overlay appears promptly after startup.
pub const STARTUP_TICK_DELAY_MS: u64 = 100;

/// Upper bound for a single connect/transmit/disconnect reader sequence.
pub const DEFAULT_READER_TIMEOUT_MS: u64 = 500;

/// Upper bound for a single session-lock query against the host OS.
pub const DEFAULT_SUSPEND_QUERY_TIMEOUT_MS: u64 = 500;

// ============================================================================
// Reader exchange
// ============================================================================

/// GET DATA (UID/IDm) command understood by PC/SC contactless readers.
pub const GET_UID_COMMAND: [u8; 5] = [0xFF, 0xCA, 0x00, 0x00, 0x00];

/// Status word returned alongside a successful response (SW1, SW2).
pub const STATUS_SUCCESS: [u8; 2] = [0x90, 0x00];

/// Maximum number of UID bytes accepted from a reader response.
pub const MAX_UID_BYTES: usize = 32;

// ============================================================================
// Display copy
// ============================================================================

/// Overlay body shown while no card is on the reader.
pub const MESSAGE_PLACE_CARD: &str = "Please place card on reader\nカードをかざしてください";

/// Overlay body shown while an unregistered card is on the reader.
pub const MESSAGE_CARD_NOT_REGISTERED: &str = "Card Not Registered\nカードは未登録です";

/// Prefix of the countdown line.
pub const TIMER_PREFIX: &str = "Auto Lock in:";

// ============================================================================
// Audit trail labels
// ============================================================================

pub const LABEL_ACCESS_GRANTED: &str = "Access Granted";
pub const LABEL_ACCESS_DENIED: &str = "Access Denied";
pub const LABEL_SESSION_ENDED: &str = "Session Ended";

// ============================================================================
// Defaults for files and audit zone
// ============================================================================

/// Default registry file name.
pub const DEFAULT_REGISTRY_FILE: &str = "authorized_users.json";

/// Default audit trail file name.
pub const DEFAULT_AUDIT_LOG_FILE: &str = "access_log.txt";

/// Default audit zone offset from UTC in minutes (Japan Standard Time).
pub const DEFAULT_AUDIT_UTC_OFFSET_MINUTES: i32 = 9 * 60;

/// Default audit zone label.
pub const DEFAULT_AUDIT_ZONE_LABEL: &str = "JST";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_uid_command_layout() {
        assert_eq!(GET_UID_COMMAND[0], 0xFF);
        assert_eq!(GET_UID_COMMAND[1], 0xCA);
        assert!(GET_UID_COMMAND[2..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_display_copy_is_distinct() {
        assert_ne!(MESSAGE_PLACE_CARD, MESSAGE_CARD_NOT_REGISTERED);
    }

    #[test]
    fn test_startup_tick_is_faster_than_regular_tick() {
        assert!(STARTUP_TICK_DELAY_MS < DEFAULT_TICK_INTERVAL_MS);
    }

    #[test]
    fn test_defaults_within_limits() {
        assert!(DEFAULT_TIMEOUT_SECS <= MAX_TIMEOUT_SECS);
        assert!(DEFAULT_TICK_INTERVAL_MS <= MAX_TICK_INTERVAL_MS);
    }
}
