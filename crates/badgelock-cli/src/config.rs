//! Application configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use badgelock_core::constants::{
    DEFAULT_AUDIT_LOG_FILE, DEFAULT_AUDIT_UTC_OFFSET_MINUTES, DEFAULT_AUDIT_ZONE_LABEL,
    DEFAULT_READER_TIMEOUT_MS, DEFAULT_REGISTRY_FILE, DEFAULT_SUSPEND_QUERY_TIMEOUT_MS,
    DEFAULT_TICK_INTERVAL_MS, DEFAULT_TIMEOUT_SECS, MAX_TICK_INTERVAL_MS, MAX_TIMEOUT_SECS,
    STARTUP_TICK_DELAY_MS,
};
use badgelock_core::{Error, Result};

/// Configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "badgelock.toml";

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV_VAR: &str = "BADGELOCK_CONFIG";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Registry of authorized users (JSON)
    pub registry_path: PathBuf,

    /// Append-only audit trail
    pub audit_log_path: PathBuf,

    /// Seconds without valid access before the workstation is locked
    pub timeout_secs: u64,

    /// Tick period (milliseconds)
    pub tick_interval_ms: u64,

    /// Delay before the first tick (milliseconds)
    pub startup_delay_ms: u64,

    /// Upper bound on one reader exchange (milliseconds)
    pub reader_timeout_ms: u64,

    /// Upper bound on one host lock-status query (milliseconds)
    pub suspend_query_timeout_ms: u64,

    /// Substring of the reader name to use; first reader when unset
    pub reader_name: Option<String>,

    /// Write "Access Denied" records to the audit trail
    pub log_denied: bool,

    /// Lock the host session on expiry
    pub lock_enabled: bool,

    pub audit: AuditConfig,
}

/// Audit timestamp settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Fixed offset from UTC for audit timestamps (minutes)
    pub utc_offset_minutes: i32,

    /// Zone label appended to audit timestamps
    pub zone_label: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            registry_path: PathBuf::from(DEFAULT_REGISTRY_FILE),
            audit_log_path: PathBuf::from(DEFAULT_AUDIT_LOG_FILE),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            startup_delay_ms: STARTUP_TICK_DELAY_MS,
            reader_timeout_ms: DEFAULT_READER_TIMEOUT_MS,
            suspend_query_timeout_ms: DEFAULT_SUSPEND_QUERY_TIMEOUT_MS,
            reader_name: None,
            log_denied: false,
            lock_enabled: true,
            audit: AuditConfig::default(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: DEFAULT_AUDIT_UTC_OFFSET_MINUTES,
            zone_label: DEFAULT_AUDIT_ZONE_LABEL.to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the configuration for this process.
    ///
    /// An explicit path (flag or environment) must exist. Otherwise the
    /// default file is read when present, and defaults are used when not.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let explicit = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));

        match explicit {
            Some(path) => Self::load(&path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::load(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Reject settings the tick loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        check_range("timeout_secs", self.timeout_secs, 1, MAX_TIMEOUT_SECS)?;
        check_range(
            "tick_interval_ms",
            self.tick_interval_ms,
            1,
            MAX_TICK_INTERVAL_MS,
        )?;
        check_range(
            "startup_delay_ms",
            self.startup_delay_ms,
            0,
            MAX_TICK_INTERVAL_MS,
        )?;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    pub fn reader_timeout(&self) -> Duration {
        Duration::from_millis(self.reader_timeout_ms)
    }

    pub fn suspend_query_timeout(&self) -> Duration {
        Duration::from_millis(self.suspend_query_timeout_ms)
    }
}

fn check_range(key: &str, value: u64, min: u64, max: u64) -> Result<()> {
    if value < min || value > max {
        return Err(Error::Config(format!(
            "{key} must be between {min} and {max}, got {value}"
        )));
    }
    Ok(())
}
