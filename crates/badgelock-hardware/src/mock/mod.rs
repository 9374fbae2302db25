//! Mock device implementations for testing and development.
//!
//! This module provides simulated collaborators that can be controlled
//! programmatically without requiring a physical reader or a desktop session.

pub mod reader;
pub mod session;

// Re-export commonly used types
pub use reader::{MockReader, MockReaderHandle};
pub use session::{MockLockAction, MockSuspendSignal, MockSuspendSignalHandle};
