//! Access decision engine for the badgelock access control system.
//!
//! This crate contains the per-tick state machine that turns reader polls
//! into access events, overlay directives and lock requests, plus the
//! overlay model used to present its output.

pub mod display;
pub mod state_machine;

pub use display::{
    Alignment, DisplayDirective, OverlayDisplay, Presentation, align_text, truncate_text,
};
pub use state_machine::{
    AccessState, AccessStateMachine, AccessStateMachineBuilder, AccessStatus, SessionState,
    StateTransition, TickOutcome,
};
