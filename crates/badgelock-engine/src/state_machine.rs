//! Access state machine.
//!
//! The machine consumes one reader poll per tick and decides, from the poll,
//! the registry snapshot and the host's suspend signal, what the overlay
//! shows, which access events are emitted and whether the workstation must
//! be locked.
//!
//! # States
//!
//! The state is derived every tick, never stored as an input:
//! - `NoCard`: nothing on the reader
//! - `Unauthorized`: a card that is not in the registry
//! - `Authorized`: a registered card
//! - `Suspended`: the host session is already locked by someone else
//!
//! # Timeout Policy
//!
//! While the state is `NoCard` or `Unauthorized`, a deadline of
//! `now + timeout` runs. When it expires the machine requests one lock and
//! immediately restarts the window. `Authorized` and `Suspended` clear the
//! deadline; a fresh window starts on the first tick that leaves them.
//!
//! # Examples
//!
//! ```
//! use std::time::{Duration, Instant};
//! use badgelock_core::{CardIdentifier, Registry, UserRecord};
//! use badgelock_engine::{AccessStateMachine, AccessStatus};
//!
//! let card = CardIdentifier::new("AB12CD34").unwrap();
//! let registry = Registry::from_records(
//!     vec![UserRecord::new("Alice", card.clone()).unwrap()],
//!     None,
//! );
//!
//! let mut machine = AccessStateMachine::new(Duration::from_secs(20));
//! let now = Instant::now();
//!
//! let outcome = machine.tick(Some(card), &registry, now, false);
//! assert_eq!(outcome.status, AccessStatus::Authorized);
//! assert!(!outcome.display.visible);
//!
//! let outcome = machine.tick(None, &registry, now + Duration::from_secs(1), false);
//! assert_eq!(outcome.status, AccessStatus::NoCard);
//! assert!(outcome.display.visible);
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use badgelock_core::constants::{
    DEFAULT_TIMEOUT_SECS, MAX_TIMEOUT_SECS, MESSAGE_CARD_NOT_REGISTERED, MESSAGE_PLACE_CARD,
    TIMER_PREFIX,
};
use badgelock_core::{AccessEvent, CardIdentifier, Registry};

use crate::display::DisplayDirective;

/// Maximum number of state transitions to keep in history.
const MAX_HISTORY_SIZE: usize = 100;

/// Authorization status of the card on the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessStatus {
    NoCard,
    Unauthorized,
    Authorized,
}

impl AccessStatus {
    /// Resolve the status of a poll result against a registry snapshot.
    pub fn resolve(poll: Option<&CardIdentifier>, registry: &Registry) -> Self {
        match poll {
            None => AccessStatus::NoCard,
            Some(card) if registry.lookup_name(card).is_some() => AccessStatus::Authorized,
            Some(_) => AccessStatus::Unauthorized,
        }
    }
}

/// Derived state of the system for a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessState {
    NoCard,
    Unauthorized,
    Authorized,
    Suspended,
}

impl AccessState {
    /// Combine the card status with the host suspend signal.
    ///
    /// A valid card wins over the suspend signal; both pause the timer.
    pub fn derive(status: AccessStatus, suspended: bool) -> Self {
        match (status, suspended) {
            (AccessStatus::Authorized, _) => AccessState::Authorized,
            (_, true) => AccessState::Suspended,
            (AccessStatus::NoCard, false) => AccessState::NoCard,
            (AccessStatus::Unauthorized, false) => AccessState::Unauthorized,
        }
    }

    /// Returns `true` if the lock countdown runs in this state.
    pub fn runs_timer(self) -> bool {
        matches!(self, AccessState::NoCard | AccessState::Unauthorized)
    }

    /// Overlay body for states that show the overlay.
    pub fn message(self) -> Option<&'static str> {
        match self {
            AccessState::NoCard => Some(MESSAGE_PLACE_CARD),
            AccessState::Unauthorized => Some(MESSAGE_CARD_NOT_REGISTERED),
            AccessState::Authorized | AccessState::Suspended => None,
        }
    }
}

impl fmt::Display for AccessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_str = match self {
            AccessState::NoCard => "NO_CARD",
            AccessState::Unauthorized => "UNAUTHORIZED",
            AccessState::Authorized => "AUTHORIZED",
            AccessState::Suspended => "SUSPENDED",
        };
        write!(f, "{}", state_str)
    }
}

/// A change of derived state, recorded for diagnostics.
///
/// The `timestamp` is process-local and is not serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: AccessState,
    pub to: AccessState,

    #[serde(skip, default = "Instant::now")]
    pub timestamp: Instant,
}

/// Session state owned by the state machine.
///
/// Created empty at startup and mutated only by [`AccessStateMachine::tick`].
/// Nothing here survives a restart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    present_card: Option<CardIdentifier>,
    present_user: Option<String>,
    timeout_deadline: Option<Instant>,
    displayed_text: String,
}

impl SessionState {
    /// Identifier seen on the most recent tick.
    pub fn present_card(&self) -> Option<&CardIdentifier> {
        self.present_card.as_ref()
    }

    /// Name resolved for the present card when it was presented.
    pub fn present_user(&self) -> Option<&str> {
        self.present_user.as_deref()
    }

    /// Instant at which the workstation will be locked, if the timer runs.
    pub fn timeout_deadline(&self) -> Option<Instant> {
        self.timeout_deadline
    }

    /// Last body text pushed to the overlay.
    pub fn displayed_text(&self) -> &str {
        &self.displayed_text
    }
}

/// Result of a single tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    /// Card status resolved from the poll.
    pub status: AccessStatus,

    /// Derived state including the suspend signal.
    pub state: AccessState,

    /// What the overlay should show.
    pub display: DisplayDirective,

    /// Access events in emission order.
    pub events: Vec<AccessEvent>,

    /// Whether the lock action must be invoked this tick.
    pub lock: bool,

    /// Time left before the next lock, while the timer runs.
    pub remaining: Option<Duration>,
}

/// Per-tick access decision state machine.
///
/// # Thread Safety
///
/// The machine is owned by the single tick loop and is not shared. Each call
/// to [`tick`](Self::tick) applies completely before returning.
#[derive(Debug, Clone)]
pub struct AccessStateMachine {
    session: SessionState,
    timeout: Duration,
    current_state: AccessState,
    history: VecDeque<StateTransition>,
}

impl AccessStateMachine {
    /// Create a machine that locks after `timeout` without valid access.
    ///
    /// Timeouts longer than [`MAX_TIMEOUT_SECS`] are clamped.
    pub fn new(timeout: Duration) -> Self {
        Self {
            session: SessionState::default(),
            timeout: timeout.min(Duration::from_secs(MAX_TIMEOUT_SECS)),
            current_state: AccessState::NoCard,
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }

    /// Create a builder for constructing a machine with custom configuration.
    pub fn builder() -> AccessStateMachineBuilder {
        AccessStateMachineBuilder::default()
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Derived state as of the last tick.
    pub fn current_state(&self) -> AccessState {
        self.current_state
    }

    /// Recent state transitions, ordered from oldest to newest.
    pub fn history(&self) -> &VecDeque<StateTransition> {
        &self.history
    }

    /// Get the last N state transitions.
    pub fn last_transitions(&self, count: usize) -> Vec<StateTransition> {
        self.history
            .iter()
            .rev()
            .take(count)
            .rev()
            .cloned()
            .collect()
    }

    /// Advance the machine by one tick.
    ///
    /// # Arguments
    ///
    /// * `poll` - Card on the reader this tick, `None` for no card
    /// * `registry` - Registry snapshot used to authorize the card
    /// * `now` - Monotonic time of the tick
    /// * `suspended` - Whether the host session is already locked
    pub fn tick(
        &mut self,
        poll: Option<CardIdentifier>,
        registry: &Registry,
        now: Instant,
        suspended: bool,
    ) -> TickOutcome {
        let user = poll
            .as_ref()
            .and_then(|card| registry.lookup_name(card))
            .map(str::to_owned);
        let status = AccessStatus::resolve(poll.as_ref(), registry);

        let events = self.detect_edge(poll, user);

        let state = AccessState::derive(status, suspended);
        self.record_state(state, now);

        let (display, lock, remaining) = match state.message() {
            Some(body) if state.runs_timer() => self.run_timer(body, now),
            _ => {
                self.session.timeout_deadline = None;
                (DisplayDirective::hidden(), false, None)
            }
        };

        TickOutcome {
            status,
            state,
            display,
            events,
            lock,
            remaining,
        }
    }

    /// Compare the poll with the previous tick and emit access events.
    fn detect_edge(
        &mut self,
        poll: Option<CardIdentifier>,
        user: Option<String>,
    ) -> Vec<AccessEvent> {
        let mut events = Vec::new();

        if poll == self.session.present_card {
            return events;
        }

        if let (Some(card), Some(name)) = (
            self.session.present_card.take(),
            self.session.present_user.take(),
        ) {
            events.push(AccessEvent::session_ended(card, name));
        }

        if let Some(card) = &poll {
            match &user {
                Some(name) => events.push(AccessEvent::granted(card.clone(), name.clone())),
                None => events.push(AccessEvent::denied(card.clone())),
            }
        }

        self.session.present_card = poll;
        self.session.present_user = user;
        events
    }

    /// Run the lock countdown for a tick without valid access.
    fn run_timer(
        &mut self,
        body: &str,
        now: Instant,
    ) -> (DisplayDirective, bool, Option<Duration>) {
        let fresh = self.deadline_from(now);
        let deadline = *self.session.timeout_deadline.get_or_insert(fresh);

        let mut remaining = deadline.saturating_duration_since(now);
        let lock = remaining.is_zero();
        if lock {
            // The window restarts now; the lock's effect is only observed
            // through the suspend signal on a later tick.
            self.session.timeout_deadline = Some(self.deadline_from(now));
            remaining = self.timeout;
        }

        let body_changed = body != self.session.displayed_text;
        if body_changed {
            self.session.displayed_text = body.to_string();
        }

        let directive = DisplayDirective::shown(body, timer_text(remaining), body_changed);
        (directive, lock, Some(remaining))
    }

    fn deadline_from(&self, now: Instant) -> Instant {
        now.checked_add(self.timeout).unwrap_or(now)
    }

    fn record_state(&mut self, state: AccessState, now: Instant) {
        if state == self.current_state {
            return;
        }

        self.history.push_back(StateTransition {
            from: self.current_state,
            to: state,
            timestamp: now,
        });
        if self.history.len() > MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
        self.current_state = state;
    }
}

impl Default for AccessStateMachine {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }
}

/// Countdown line shown under the overlay body.
pub fn timer_text(remaining: Duration) -> String {
    format!("{} {}", TIMER_PREFIX, remaining.as_secs_f64().round() as u64)
}

/// Builder for constructing `AccessStateMachine` instances.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use badgelock_engine::AccessStateMachine;
///
/// let machine = AccessStateMachine::builder()
///     .with_timeout(Duration::from_secs(20))
///     .build();
///
/// assert_eq!(machine.timeout(), Duration::from_secs(20));
/// ```
#[derive(Debug)]
pub struct AccessStateMachineBuilder {
    timeout: Duration,
}

impl AccessStateMachineBuilder {
    /// Set the lock timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> AccessStateMachine {
        AccessStateMachine::new(self.timeout)
    }
}

impl Default for AccessStateMachineBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}
