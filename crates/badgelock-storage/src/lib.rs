//! Storage layer for the badgelock access control system.
//!
//! Two backing stores live here:
//!
//! - [`RegistryStore`] - the card-to-user registry, a JSON file cached by its
//!   modification time with a stale-but-valid fallback on parse errors.
//! - [`AuditLog`] - the append-only access trail, with a durable
//!   [`FileAuditLog`] and an in-memory [`MemoryAuditLog`].
//!
//! # Examples
//!
//! ```no_run
//! use badgelock_core::{AccessEvent, CardIdentifier};
//! use badgelock_storage::{AuditLog, AuditZone, FileAuditLog, RegistryStore};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut store = RegistryStore::new("authorized_users.json");
//! let registry = store.lookup();
//!
//! let card: CardIdentifier = "AB12CD34".parse()?;
//! if let Some(name) = registry.lookup_name(&card) {
//!     let mut audit = FileAuditLog::new("access_log.txt", AuditZone::default());
//!     audit.append(&AccessEvent::granted(card.clone(), name))?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod error;
pub mod registry;

pub use audit::{AuditLog, AuditZone, FileAuditLog, MemoryAuditLog, format_entry};
pub use error::{StorageError, StorageResult};
pub use registry::RegistryStore;
