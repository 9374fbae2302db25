use crate::{
    Result,
    constants::{LABEL_ACCESS_DENIED, LABEL_ACCESS_GRANTED, LABEL_SESSION_ENDED, MAX_UID_BYTES},
    error::Error,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;
use subtle::ConstantTimeEq;

/// Contactless card identifier (uppercase hexadecimal).
///
/// The identifier is normalized (trimmed and converted to uppercase) on
/// construction, so identifiers read from the reader and identifiers loaded
/// from the registry compare equal regardless of the source representation.
///
/// # Security
/// Equality uses constant-time comparison so that lookups do not leak how
/// much of a presented identifier matched a registered one.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardIdentifier(String);

impl CardIdentifier {
    /// Create a new card identifier with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidCardIdentifier` if:
    /// - The identifier is empty after trimming
    /// - The identifier contains characters other than hexadecimal digits
    pub fn new(identifier: &str) -> Result<Self> {
        let identifier = identifier.trim().to_uppercase();

        if identifier.is_empty() {
            return Err(Error::InvalidCardIdentifier(
                "Card identifier cannot be empty".to_string(),
            ));
        }

        if !identifier.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidCardIdentifier(format!(
                "Card identifier must be hexadecimal, got {identifier}"
            )));
        }

        Ok(CardIdentifier(identifier))
    }

    /// Build an identifier from the raw UID bytes returned by a reader.
    ///
    /// # Errors
    /// Returns `Error::InvalidCardIdentifier` if `bytes` is empty or longer
    /// than [`MAX_UID_BYTES`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() || bytes.len() > MAX_UID_BYTES {
            return Err(Error::InvalidCardIdentifier(format!(
                "Card UID must be 1-{MAX_UID_BYTES} bytes, got {}",
                bytes.len()
            )));
        }

        Ok(CardIdentifier(
            bytes.iter().map(|b| format!("{:02X}", b)).collect(),
        ))
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CardIdentifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CardIdentifier::new(s)
    }
}

impl TryFrom<String> for CardIdentifier {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        CardIdentifier::new(&value)
    }
}

impl From<CardIdentifier> for String {
    fn from(value: CardIdentifier) -> Self {
        value.0
    }
}

impl PartialEq for CardIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl std::hash::Hash for CardIdentifier {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

/// A registered user and the card that identifies them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub name: String,
    pub card_identifier: CardIdentifier,
}

impl UserRecord {
    /// Create a user record.
    ///
    /// # Errors
    /// Returns `Error::InvalidUserRecord` if the trimmed name is empty.
    pub fn new(name: &str, card_identifier: CardIdentifier) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidUserRecord(
                "User name cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            name: name.to_string(),
            card_identifier,
        })
    }
}

/// Immutable snapshot of the user registry.
///
/// Cloning a snapshot is cheap: the entries are shared behind an `Arc`, so a
/// cache hit hands out the same mapping without copying it.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Arc<HashMap<CardIdentifier, String>>,
    source_version: Option<SystemTime>,
}

impl Registry {
    /// An empty registry with no source version.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot from records. Later records win on duplicate cards.
    pub fn from_records(
        records: impl IntoIterator<Item = UserRecord>,
        source_version: Option<SystemTime>,
    ) -> Self {
        let entries = records
            .into_iter()
            .map(|record| (record.card_identifier, record.name))
            .collect();

        Self {
            entries: Arc::new(entries),
            source_version,
        }
    }

    /// Resolve the user name registered for `card`.
    pub fn lookup_name(&self, card: &CardIdentifier) -> Option<&str> {
        self.entries.get(card).map(String::as_str)
    }

    /// Version token of the backing store this snapshot was read from.
    pub fn source_version(&self) -> Option<SystemTime> {
        self.source_version
    }

    pub fn entries(&self) -> &Arc<HashMap<CardIdentifier, String>> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if both snapshots share the same mapping allocation.
    pub fn same_snapshot(&self, other: &Registry) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }
}

/// Kind of access event written to the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessEventKind {
    /// An authorized card was presented.
    Granted,
    /// An unregistered card was presented. Auditing these is optional.
    Denied,
    /// A previously granted card left the reader or was swapped.
    SessionEnded,
}

impl AccessEventKind {
    /// Action label used in the audit trail.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            AccessEventKind::Granted => LABEL_ACCESS_GRANTED,
            AccessEventKind::Denied => LABEL_ACCESS_DENIED,
            AccessEventKind::SessionEnded => LABEL_SESSION_ENDED,
        }
    }

    /// Returns `true` for kinds that must always reach the audit trail.
    #[must_use]
    pub fn is_mandatory(self) -> bool {
        !matches!(self, AccessEventKind::Denied)
    }
}

impl fmt::Display for AccessEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// An access event emitted by the state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: AccessEventKind,
    pub card_identifier: CardIdentifier,
    pub user_name: Option<String>,
}

impl AccessEvent {
    pub fn granted(card_identifier: CardIdentifier, user_name: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            kind: AccessEventKind::Granted,
            card_identifier,
            user_name: Some(user_name.into()),
        }
    }

    pub fn denied(card_identifier: CardIdentifier) -> Self {
        Self {
            timestamp: Utc::now(),
            kind: AccessEventKind::Denied,
            card_identifier,
            user_name: None,
        }
    }

    pub fn session_ended(card_identifier: CardIdentifier, user_name: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            kind: AccessEventKind::SessionEnded,
            card_identifier,
            user_name: Some(user_name.into()),
        }
    }

    /// Override the event timestamp (replaying or testing).
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("ab12cd34", "AB12CD34")]
    #[case("  0123456789abcdef ", "0123456789ABCDEF")]
    #[case("FFFFFFFF", "FFFFFFFF")]
    fn test_card_identifier_valid(#[case] input: &str, #[case] expected: &str) {
        let card = CardIdentifier::new(input).unwrap();
        assert_eq!(card.as_str(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("XYZ123")]
    #[case("12 34")]
    fn test_card_identifier_invalid(#[case] input: &str) {
        assert!(CardIdentifier::new(input).is_err());
    }

    #[test]
    fn test_card_identifier_from_bytes() {
        let card = CardIdentifier::from_bytes(&[0x01, 0x2E, 0xAB, 0xFF]).unwrap();
        assert_eq!(card.as_str(), "012EABFF");

        assert!(CardIdentifier::from_bytes(&[]).is_err());
        assert!(CardIdentifier::from_bytes(&[0u8; MAX_UID_BYTES + 1]).is_err());
    }

    #[test]
    fn test_card_identifier_case_insensitive_equality() {
        let lower: CardIdentifier = "ab12cd34".parse().unwrap();
        let upper: CardIdentifier = "AB12CD34".parse().unwrap();
        assert_eq!(lower, upper);
    }

    #[test]
    fn test_card_identifier_serde_normalizes() {
        let card: CardIdentifier = serde_json::from_str("\"ab12\"").unwrap();
        assert_eq!(card.as_str(), "AB12");
        assert!(serde_json::from_str::<CardIdentifier>("\"not hex\"").is_err());
    }

    #[test]
    fn test_user_record_rejects_empty_name() {
        let card = CardIdentifier::new("AB12").unwrap();
        assert!(UserRecord::new("   ", card.clone()).is_err());
        assert_eq!(UserRecord::new(" Alice ", card).unwrap().name, "Alice");
    }

    #[test]
    fn test_registry_last_write_wins() {
        let card = CardIdentifier::new("AB12CD34").unwrap();
        let registry = Registry::from_records(
            vec![
                UserRecord::new("Alice", card.clone()).unwrap(),
                UserRecord::new("Bob", card.clone()).unwrap(),
            ],
            None,
        );

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup_name(&card), Some("Bob"));
    }

    #[test]
    fn test_registry_lookup_missing() {
        let registry = Registry::empty();
        let card = CardIdentifier::new("FFFFFFFF").unwrap();
        assert!(registry.is_empty());
        assert_eq!(registry.lookup_name(&card), None);
    }

    #[test]
    fn test_registry_clone_shares_snapshot() {
        let registry = Registry::from_records(Vec::new(), None);
        let clone = registry.clone();
        assert!(registry.same_snapshot(&clone));
        assert!(!registry.same_snapshot(&Registry::empty()));
    }

    #[test]
    fn test_access_event_labels() {
        assert_eq!(AccessEventKind::Granted.label(), "Access Granted");
        assert_eq!(AccessEventKind::SessionEnded.label(), "Session Ended");
        assert_eq!(AccessEventKind::Denied.label(), "Access Denied");
        assert!(AccessEventKind::Granted.is_mandatory());
        assert!(AccessEventKind::SessionEnded.is_mandatory());
        assert!(!AccessEventKind::Denied.is_mandatory());
    }

    #[test]
    fn test_access_event_constructors() {
        let card = CardIdentifier::new("AB12CD34").unwrap();
        let granted = AccessEvent::granted(card.clone(), "Alice");
        assert_eq!(granted.kind, AccessEventKind::Granted);
        assert_eq!(granted.user_name.as_deref(), Some("Alice"));

        let denied = AccessEvent::denied(card);
        assert_eq!(denied.kind, AccessEventKind::Denied);
        assert_eq!(denied.user_name, None);
    }
}
