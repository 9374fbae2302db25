//! File-backed user registry with a version-token cache.
//!
//! The registry file is a JSON document:
//!
//! ```json
//! {
//!     "users": [
//!         { "name": "Alice", "card_number": "AB12CD34" }
//!     ]
//! }
//! ```
//!
//! [`RegistryStore::lookup`] compares the file's modification time with the
//! cached snapshot and re-reads only when it changed. Failure modes:
//!
//! | Backing file | Result |
//! |---|---|
//! | missing | empty registry, no warning |
//! | empty | empty registry, warning |
//! | valid JSON that is not an object | empty registry, warning |
//! | malformed | previous snapshot retained, warning |

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use badgelock_core::{CardIdentifier, Registry, UserRecord};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{StorageError, StorageResult};

/// On-disk registry document.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    users: Vec<RegistryEntry>,

    /// Unknown top-level keys are carried through enrollment writes.
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RegistryEntry {
    name: String,
    card_number: String,
}

impl RegistryEntry {
    fn matches(&self, card: &CardIdentifier) -> bool {
        self.card_number.trim().eq_ignore_ascii_case(card.as_str())
    }
}

/// Cached view over the registry file.
///
/// Owned by the driver loop and passed by reference; there is no global
/// cache.
#[derive(Debug)]
pub struct RegistryStore {
    path: PathBuf,

    /// Last good snapshot.
    cached: Registry,

    /// Whether `cached` reflects a successful read of the file.
    loaded: bool,

    /// Version token of the last file that failed to parse.
    failed_version: Option<SystemTime>,

    /// Number of read-and-parse attempts.
    reloads: usize,
}

impl RegistryStore {
    /// Create a store over `path`. Nothing is read until the first lookup.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: Registry::empty(),
            loaded: false,
            failed_version: None,
            reloads: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of times the backing file has been read and parsed.
    pub fn reload_count(&self) -> usize {
        self.reloads
    }

    /// Return the current registry snapshot, reloading if the file changed.
    ///
    /// Never fails: problems are logged and resolved to the empty registry
    /// (missing file) or the previous snapshot (unreadable or malformed file).
    pub fn lookup(&mut self) -> Registry {
        let metadata = match fs::metadata(&self.path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if self.loaded {
                    debug!("Registry {} removed, using empty registry", self.path.display());
                }
                self.cached = Registry::empty();
                self.loaded = false;
                self.failed_version = None;
                return self.cached.clone();
            }
            Err(e) => {
                warn!("Cannot stat registry {}: {}", self.path.display(), e);
                return self.cached.clone();
            }
        };

        let version = metadata.modified().ok();

        if self.loaded && version == self.cached.source_version() {
            return self.cached.clone();
        }

        // Same broken file as last time: keep the fallback without re-parsing.
        if version.is_some() && version == self.failed_version {
            return self.cached.clone();
        }

        self.reloads += 1;
        match self.read_records() {
            Ok(records) => {
                self.cached = Registry::from_records(records, version);
                self.loaded = true;
                self.failed_version = None;
                info!("Loaded {} authorized users.", self.cached.len());
            }
            Err(e) => {
                warn!(
                    "Failed to load registry: {}. Keeping {} cached users.",
                    e,
                    self.cached.len()
                );
                self.failed_version = version;
            }
        }

        self.cached.clone()
    }

    /// Resolve the user registered for `card` in a snapshot.
    pub fn lookup_name<'a>(registry: &'a Registry, card: &CardIdentifier) -> Option<&'a str> {
        registry.lookup_name(card)
    }

    /// Register `record`, replacing any entry with the same card.
    ///
    /// Returns the name previously registered to the card, if any. The file
    /// is replaced atomically so a concurrent [`lookup`](Self::lookup) sees
    /// either the old or the new content.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::MalformedRegistry` rather than overwriting a
    /// file that cannot be parsed, or an I/O error if the write fails.
    pub fn enroll(&mut self, record: &UserRecord) -> StorageResult<Option<String>> {
        let mut file = match self.read_document()? {
            Some(document) => self.parse_document(document)?,
            None => RegistryFile::default(),
        };

        let previous = file
            .users
            .iter()
            .rev()
            .find(|entry| entry.matches(&record.card_identifier))
            .map(|entry| entry.name.clone());

        file.users
            .retain(|entry| !entry.matches(&record.card_identifier));
        file.users.push(RegistryEntry {
            name: record.name.clone(),
            card_number: record.card_identifier.to_string(),
        });

        let content = serde_json::to_string_pretty(&file)?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, content)?;
        fs::rename(&staging, &self.path)?;

        info!(
            "Registered {} ({})",
            record.name, record.card_identifier
        );
        Ok(previous)
    }

    /// Read and validate all records from the backing file.
    fn read_records(&self) -> StorageResult<Vec<UserRecord>> {
        let Some(document) = self.read_document()? else {
            return Ok(Vec::new());
        };
        if !document.is_object() {
            warn!(
                "The registry file '{}' has no users object; no users loaded.",
                self.path.display()
            );
            return Ok(Vec::new());
        }
        let file = self.parse_document(document)?;

        let records = file
            .users
            .into_iter()
            .filter_map(|entry| {
                let parsed = CardIdentifier::new(&entry.card_number)
                    .and_then(|card| UserRecord::new(&entry.name, card));
                match parsed {
                    Ok(record) => Some(record),
                    Err(e) => {
                        warn!("Skipping registry entry {:?}: {}", entry.card_number, e);
                        None
                    }
                }
            })
            .collect();

        Ok(records)
    }

    /// Read the raw JSON document. `Ok(None)` for a missing or empty file.
    fn read_document(&self) -> StorageResult<Option<serde_json::Value>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            warn!("The registry file '{}' is empty.", self.path.display());
            return Ok(None);
        }

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| self.malformed(e))
    }

    fn parse_document(&self, document: serde_json::Value) -> StorageResult<RegistryFile> {
        serde_json::from_value(document).map_err(|e| self.malformed(e))
    }

    fn malformed(&self, error: serde_json::Error) -> StorageError {
        StorageError::MalformedRegistry {
            path: self.path.clone(),
            message: error.to_string(),
        }
    }
}
