//! Driver and configuration for the badgelock workstation lock.
//!
//! The [`Driver`] owns every collaborator and the access state machine, and
//! runs the fixed-interval tick loop. [`AppConfig`] carries the operator's
//! settings from `badgelock.toml`.

pub mod config;
pub mod driver;
pub mod enrollment;
pub mod terminal;

pub use config::{AppConfig, AuditConfig};
pub use driver::{Driver, DriverSettings, open_reader};
pub use enrollment::{EnrollmentReport, enroll_user, wait_for_card};
pub use terminal::TerminalPresentation;
