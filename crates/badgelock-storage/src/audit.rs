//! Append-only audit trail of access events.
//!
//! One line per event, e.g.:
//!
//! ```text
//! 2025-10-27 14:30:00 JST | Access Granted | Card: AB12CD34 | User: Alice
//! ```
//!
//! Timestamps are rendered in a fixed zone ([`AuditZone`]), independent of
//! the host's local time zone setting.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use badgelock_core::AccessEvent;
use badgelock_core::constants::{DEFAULT_AUDIT_UTC_OFFSET_MINUTES, DEFAULT_AUDIT_ZONE_LABEL};
use chrono::{DateTime, FixedOffset, Offset, Utc};

use crate::error::{StorageError, StorageResult};

/// Sink for access events.
///
/// `append` is synchronous and durable: the event is on disk (or wherever
/// the sink keeps it) when the call returns.
pub trait AuditLog: Send {
    /// Append one event.
    ///
    /// # Errors
    ///
    /// Returns an error if the event could not be persisted. Callers report
    /// the failure and carry on.
    fn append(&mut self, event: &AccessEvent) -> StorageResult<()>;
}

/// Fixed time zone used for audit timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditZone {
    offset: FixedOffset,
    label: String,
}

impl AuditZone {
    /// Create a zone from an offset east of UTC in minutes.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AuditUnavailable` if the offset is outside ±24h.
    pub fn new(utc_offset_minutes: i32, label: impl Into<String>) -> StorageResult<Self> {
        let offset = utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                StorageError::AuditUnavailable(format!(
                    "UTC offset out of range: {utc_offset_minutes} minutes"
                ))
            })?;

        Ok(Self {
            offset,
            label: label.into(),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Render `timestamp` as `YYYY-MM-DD HH:MM:SS LABEL`.
    pub fn format(&self, timestamp: DateTime<Utc>) -> String {
        format!(
            "{} {}",
            timestamp.with_timezone(&self.offset).format("%Y-%m-%d %H:%M:%S"),
            self.label
        )
    }
}

impl Default for AuditZone {
    fn default() -> Self {
        Self {
            offset: FixedOffset::east_opt(DEFAULT_AUDIT_UTC_OFFSET_MINUTES * 60)
                .unwrap_or(Utc.fix()),
            label: DEFAULT_AUDIT_ZONE_LABEL.to_string(),
        }
    }
}

/// Render an event as a single audit line (without trailing newline).
pub fn format_entry(event: &AccessEvent, zone: &AuditZone) -> String {
    format!(
        "{} | {} | Card: {} | User: {}",
        zone.format(event.timestamp),
        event.kind.label(),
        event.card_identifier,
        event.user_name.as_deref().unwrap_or("-")
    )
}

/// Audit trail appended to a text file.
#[derive(Debug, Clone)]
pub struct FileAuditLog {
    path: PathBuf,
    zone: AuditZone,
}

impl FileAuditLog {
    pub fn new(path: impl Into<PathBuf>, zone: AuditZone) -> Self {
        Self {
            path: path.into(),
            zone,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn zone(&self) -> &AuditZone {
        &self.zone
    }
}

impl AuditLog for FileAuditLog {
    fn append(&mut self, event: &AccessEvent) -> StorageResult<()> {
        let mut line = format_entry(event, &self.zone);
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.flush()?;
        file.sync_data()?;
        Ok(())
    }
}

/// In-memory audit trail.
///
/// Clones share the same buffer, so a clone handed to the driver can be
/// inspected afterwards.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditLog {
    events: Arc<Mutex<Vec<AccessEvent>>>,
    failing: Arc<Mutex<bool>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent appends fail.
    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut flag) = self.failing.lock() {
            *flag = failing;
        }
    }

    /// Snapshot of the events appended so far.
    pub fn events(&self) -> Vec<AccessEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl AuditLog for MemoryAuditLog {
    fn append(&mut self, event: &AccessEvent) -> StorageResult<()> {
        if self.failing.lock().map(|flag| *flag).unwrap_or(true) {
            return Err(StorageError::AuditUnavailable(
                "memory audit log set to fail".to_string(),
            ));
        }

        self.events
            .lock()
            .map_err(|_| StorageError::AuditUnavailable("memory audit log poisoned".to_string()))?
            .push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use badgelock_core::CardIdentifier;
    use chrono::TimeZone;
    use rstest::rstest;
    use tempfile::TempDir;

    fn card() -> CardIdentifier {
        CardIdentifier::new("AB12CD34").unwrap()
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 27, 5, 30, 0).unwrap()
    }

    #[test]
    fn test_zone_formats_in_fixed_offset() {
        let zone = AuditZone::default();
        assert_eq!(zone.format(fixed_time()), "2025-10-27 14:30:00 JST");
    }

    #[rstest]
    #[case(0, "UTC", "2025-10-27 05:30:00 UTC")]
    #[case(-180, "BRT", "2025-10-27 02:30:00 BRT")]
    fn test_zone_custom_offset(#[case] minutes: i32, #[case] label: &str, #[case] expected: &str) {
        let zone = AuditZone::new(minutes, label).unwrap();
        assert_eq!(zone.format(fixed_time()), expected);
    }

    #[test]
    fn test_zone_rejects_out_of_range_offset() {
        assert!(AuditZone::new(25 * 60, "XX").is_err());
    }

    #[test]
    fn test_format_entry_granted() {
        let event = AccessEvent::granted(card(), "Alice").with_timestamp(fixed_time());
        assert_eq!(
            format_entry(&event, &AuditZone::default()),
            "2025-10-27 14:30:00 JST | Access Granted | Card: AB12CD34 | User: Alice"
        );
    }

    #[test]
    fn test_format_entry_denied_has_no_user() {
        let event = AccessEvent::denied(card()).with_timestamp(fixed_time());
        assert!(format_entry(&event, &AuditZone::default()).ends_with("| User: -"));
    }

    #[test]
    fn test_file_audit_log_appends_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("access_log.txt");
        let mut log = FileAuditLog::new(&path, AuditZone::default());

        log.append(&AccessEvent::granted(card(), "Alice").with_timestamp(fixed_time()))
            .unwrap();
        log.append(&AccessEvent::session_ended(card(), "Alice").with_timestamp(fixed_time()))
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Access Granted"));
        assert!(lines[1].contains("Session Ended"));
    }

    #[test]
    fn test_file_audit_log_reports_unwritable_path() {
        let dir = TempDir::new().unwrap();
        let mut log = FileAuditLog::new(
            dir.path().join("missing").join("log.txt"),
            AuditZone::default(),
        );

        assert!(log.append(&AccessEvent::granted(card(), "Alice")).is_err());
    }

    #[test]
    fn test_memory_audit_log_shares_buffer() {
        let log = MemoryAuditLog::new();
        let mut writer = log.clone();

        writer.append(&AccessEvent::granted(card(), "Alice")).unwrap();
        assert_eq!(log.events().len(), 1);

        log.set_failing(true);
        assert!(writer.append(&AccessEvent::granted(card(), "Alice")).is_err());
        assert_eq!(log.events().len(), 1);
    }
}
