//! Property-based tests for the access state machine.
//!
//! Random tick sequences mixing registered cards, unknown cards, empty polls
//! and suspend periods are fed to the machine, and the per-tick guarantees
//! are checked after every step.

use std::time::{Duration, Instant};

use badgelock_core::{AccessEventKind, CardIdentifier, Registry, UserRecord};
use badgelock_engine::{AccessState, AccessStateMachine, AccessStatus};
use proptest::prelude::*;

const REGISTERED: [&str; 2] = ["AB12CD34", "01020304"];
const UNKNOWN: &str = "FFFFFFFF";

fn registry() -> Registry {
    Registry::from_records(
        [("Alice", REGISTERED[0]), ("Bob", REGISTERED[1])]
            .into_iter()
            .map(|(name, card)| {
                UserRecord::new(name, CardIdentifier::new(card).unwrap()).unwrap()
            }),
        None,
    )
}

/// Strategy for a single poll: no card, a registered card or an unknown one.
fn poll() -> impl Strategy<Value = Option<CardIdentifier>> {
    prop_oneof![
        3 => Just(None),
        2 => Just(Some(CardIdentifier::new(REGISTERED[0]).unwrap())),
        1 => Just(Some(CardIdentifier::new(REGISTERED[1]).unwrap())),
        1 => Just(Some(CardIdentifier::new(UNKNOWN).unwrap())),
    ]
}

/// Strategy for one tick: poll, elapsed milliseconds since the previous tick,
/// and the suspend signal.
fn tick() -> impl Strategy<Value = (Option<CardIdentifier>, u64, bool)> {
    (poll(), 0u64..5_000, prop::bool::weighted(0.15))
}

fn timeout() -> impl Strategy<Value = Duration> {
    (1u64..=30).prop_map(Duration::from_secs)
}

proptest! {
    /// Property: after every tick the session holds exactly the polled card.
    #[test]
    fn prop_present_card_tracks_poll(
        timeout in timeout(),
        ticks in prop::collection::vec(tick(), 1..200),
    ) {
        let registry = registry();
        let mut machine = AccessStateMachine::new(timeout);
        let mut now = Instant::now();

        for (poll, elapsed, suspended) in ticks {
            now += Duration::from_millis(elapsed);
            machine.tick(poll.clone(), &registry, now, suspended);
            prop_assert_eq!(machine.session().present_card(), poll.as_ref());
        }
    }

    /// Property: the deadline exists exactly while the timer runs, and when
    /// it exists it lies in the future.
    #[test]
    fn prop_deadline_follows_state(
        timeout in timeout(),
        ticks in prop::collection::vec(tick(), 1..200),
    ) {
        let registry = registry();
        let mut machine = AccessStateMachine::new(timeout);
        let mut now = Instant::now();

        for (poll, elapsed, suspended) in ticks {
            now += Duration::from_millis(elapsed);
            let outcome = machine.tick(poll, &registry, now, suspended);

            match machine.session().timeout_deadline() {
                Some(deadline) => {
                    prop_assert!(outcome.state.runs_timer());
                    prop_assert!(deadline > now);
                    prop_assert!(deadline <= now + timeout);
                }
                None => prop_assert!(!outcome.state.runs_timer()),
            }

            if outcome.status == AccessStatus::Authorized {
                prop_assert_eq!(outcome.state, AccessState::Authorized);
                prop_assert!(!outcome.lock);
            }
        }
    }

    /// Property: the overlay is shown exactly while the timer runs, and a lock
    /// restarts the window at the full timeout.
    #[test]
    fn prop_display_and_lock_consistent(
        timeout in timeout(),
        ticks in prop::collection::vec(tick(), 1..200),
    ) {
        let registry = registry();
        let mut machine = AccessStateMachine::new(timeout);
        let mut now = Instant::now();

        for (poll, elapsed, suspended) in ticks {
            now += Duration::from_millis(elapsed);
            let outcome = machine.tick(poll, &registry, now, suspended);

            prop_assert_eq!(outcome.display.visible, outcome.state.runs_timer());
            prop_assert_eq!(outcome.remaining.is_some(), outcome.state.runs_timer());
            if outcome.lock {
                prop_assert!(outcome.state.runs_timer());
                prop_assert_eq!(outcome.remaining, Some(timeout));
            }
        }
    }

    /// Property: one Granted per distinct presentation of a registered card,
    /// and every Granted is closed by a SessionEnded on the next change.
    #[test]
    fn prop_granted_once_per_presentation(
        timeout in timeout(),
        ticks in prop::collection::vec(tick(), 1..200),
    ) {
        let registry = registry();
        let mut machine = AccessStateMachine::new(timeout);
        let mut now = Instant::now();
        let mut previous: Option<CardIdentifier> = None;
        let mut expected_granted = 0usize;
        let mut granted = 0usize;
        let mut ended = 0usize;

        for (poll, elapsed, suspended) in ticks {
            now += Duration::from_millis(elapsed);
            if poll != previous
                && poll.as_ref().is_some_and(|card| registry.lookup_name(card).is_some())
            {
                expected_granted += 1;
            }

            let outcome = machine.tick(poll.clone(), &registry, now, suspended);
            granted += outcome
                .events
                .iter()
                .filter(|e| e.kind == AccessEventKind::Granted)
                .count();
            ended += outcome
                .events
                .iter()
                .filter(|e| e.kind == AccessEventKind::SessionEnded)
                .count();

            prop_assert!(outcome.events.len() <= 2);
            if poll == previous {
                prop_assert!(outcome.events.is_empty());
            }
            previous = poll;
        }

        prop_assert_eq!(granted, expected_granted);
        let open = usize::from(machine.session().present_user().is_some());
        prop_assert_eq!(granted, ended + open);
    }
}
