//! User enrollment.

use std::time::Duration;

use badgelock_core::{CardIdentifier, UserRecord};
use badgelock_hardware::CardReader;
use badgelock_storage::{RegistryStore, StorageResult};
use tokio::time::{Instant, sleep};
use tracing::info;

/// Interval between reader polls while waiting for a card.
pub const ENROLL_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Outcome of an enrollment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentReport {
    pub record: UserRecord,

    /// Name the card was registered to before this enrollment
    pub previous_owner: Option<String>,
}

/// Poll `reader` until a card is presented or `wait` elapses.
pub async fn wait_for_card<R: CardReader>(
    reader: &mut R,
    poll_interval: Duration,
    wait: Duration,
) -> Option<CardIdentifier> {
    let deadline = Instant::now() + wait;

    loop {
        if let Some(card) = reader.poll().await {
            info!("Card detected: {}", card);
            return Some(card);
        }
        if Instant::now() + poll_interval > deadline {
            return None;
        }
        sleep(poll_interval).await;
    }
}

/// Register `name` for `card` in the registry file.
pub fn enroll_user(
    store: &mut RegistryStore,
    name: &str,
    card: CardIdentifier,
) -> StorageResult<EnrollmentReport> {
    let record = UserRecord::new(name, card)?;
    let previous_owner = store.enroll(&record)?;

    if let Some(owner) = &previous_owner {
        info!(
            "Card {} was registered to {}; entry replaced",
            record.card_identifier, owner
        );
    }

    Ok(EnrollmentReport {
        record,
        previous_owner,
    })
}
