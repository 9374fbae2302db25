//! Common types shared across hardware device implementations.

use serde::{Deserialize, Serialize};

/// Card reader information.
///
/// Contains reader-specific metadata such as the PC/SC reader name and
/// the transport it is reached through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderInfo {
    /// Reader name (e.g., "Sony FeliCa Port/PaSoRi 3.0 0").
    pub name: String,

    /// Transport backing the reader (e.g., "pcsc", "mock").
    pub transport: String,
}

impl ReaderInfo {
    /// Create a new ReaderInfo.
    pub fn new(name: impl Into<String>, transport: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transport: transport.into(),
        }
    }
}
