//! Tick loop driver.
//!
//! The driver owns the access state machine and all of its collaborators.
//! Each tick runs, in order: one bounded reader poll, one registry lookup,
//! one suspend query, the state machine transition, one presentation update,
//! the audit writes and, when due, a fire-and-forget lock request. No tick
//! step returns an error; failures are logged and absorbed.

use std::future::Future;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use badgelock_core::AccessEvent;
use badgelock_core::constants::{
    DEFAULT_SUSPEND_QUERY_TIMEOUT_MS, DEFAULT_TICK_INTERVAL_MS, STARTUP_TICK_DELAY_MS,
};
use badgelock_engine::{AccessStateMachine, OverlayDisplay, Presentation, TickOutcome};
use badgelock_hardware::{
    AnyCardReader, AnyLockAction, AnySuspendSignal, CardReader, HostLockAction,
    HostSuspendSignal, LockAction, SuspendSignal,
};
use badgelock_storage::{AuditLog, AuditZone, MemoryAuditLog, RegistryStore, StorageResult};

use crate::config::AppConfig;
use crate::terminal::OVERLAY_WIDTH;

/// Loop settings that are not part of the state machine.
#[derive(Debug, Clone)]
pub struct DriverSettings {
    pub tick_interval: Duration,
    pub startup_delay: Duration,
    pub log_denied: bool,
    pub zone: AuditZone,
}

impl DriverSettings {
    pub fn from_config(config: &AppConfig) -> StorageResult<Self> {
        Ok(Self {
            tick_interval: config.tick_interval(),
            startup_delay: config.startup_delay(),
            log_denied: config.log_denied,
            zone: AuditZone::new(config.audit.utc_offset_minutes, config.audit.zone_label.clone())?,
        })
    }
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(DEFAULT_TICK_INTERVAL_MS),
            startup_delay: Duration::from_millis(STARTUP_TICK_DELAY_MS),
            log_denied: false,
            zone: AuditZone::default(),
        }
    }
}

/// Owns the tick loop and everything it touches.
pub struct Driver {
    reader: AnyCardReader,
    registry: RegistryStore,
    machine: AccessStateMachine,
    suspend: AnySuspendSignal,
    lock: AnyLockAction,
    presentation: Box<dyn Presentation + Send>,
    audit: Box<dyn AuditLog>,
    settings: DriverSettings,
}

impl Driver {
    /// Create a driver with host session collaborators, an in-memory audit
    /// trail and an undrawn overlay. Replace them with the `with_*` methods.
    pub fn new(reader: AnyCardReader, registry: RegistryStore, timeout: Duration) -> Self {
        Self {
            reader,
            registry,
            machine: AccessStateMachine::new(timeout),
            suspend: AnySuspendSignal::Host(HostSuspendSignal::new(Duration::from_millis(
                DEFAULT_SUSPEND_QUERY_TIMEOUT_MS,
            ))),
            lock: AnyLockAction::Host(HostLockAction),
            presentation: Box::new(OverlayDisplay::new(OVERLAY_WIDTH)),
            audit: Box::new(MemoryAuditLog::new()),
            settings: DriverSettings::default(),
        }
    }

    pub fn with_suspend_signal(mut self, suspend: AnySuspendSignal) -> Self {
        self.suspend = suspend;
        self
    }

    pub fn with_lock_action(mut self, lock: AnyLockAction) -> Self {
        self.lock = lock;
        self
    }

    pub fn with_presentation(mut self, presentation: impl Presentation + Send + 'static) -> Self {
        self.presentation = Box::new(presentation);
        self
    }

    pub fn with_audit_log(mut self, audit: impl AuditLog + 'static) -> Self {
        self.audit = Box::new(audit);
        self
    }

    pub fn with_settings(mut self, settings: DriverSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn machine(&self) -> &AccessStateMachine {
        &self.machine
    }

    pub fn settings(&self) -> &DriverSettings {
        &self.settings
    }

    /// Log the startup banner.
    pub async fn announce(&mut self) {
        let registry = self.registry.lookup();
        match self.reader.get_reader_info().await {
            Ok(reader) => info!("Reader: {} ({})", reader.name, reader.transport),
            Err(e) => debug!("Reader info unavailable: {}", e),
        }
        info!(
            "Badgelock v{} started at {}",
            badgelock_core::VERSION,
            self.settings.zone.format(Utc::now())
        );
        info!(
            "{} authorized users; locking after {}s without a valid card",
            registry.len(),
            self.machine.timeout().as_secs()
        );
    }

    /// Run one tick at `now`.
    pub async fn tick_at(&mut self, now: Instant) -> TickOutcome {
        let poll = self.reader.poll().await;
        let registry = self.registry.lookup();
        let suspended = self.suspend.is_suspended().await;

        let outcome = self.machine.tick(poll, &registry, now, suspended);

        self.presentation.present(&outcome.display);
        self.record(&outcome.events);
        if outcome.lock {
            self.request_lock();
        }

        outcome
    }

    /// Tick until `shutdown` resolves.
    ///
    /// Shutdown is only observed between ticks, so a started tick always
    /// completes.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        self.announce().await;

        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested before first tick");
                return;
            }
            _ = tokio::time::sleep(self.settings.startup_delay) => {}
        }

        let mut interval = tokio::time::interval(self.settings.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping tick loop");
                    break;
                }
                _ = interval.tick() => {
                    let now = tokio::time::Instant::now().into_std();
                    self.tick_at(now).await;
                }
            }
        }
    }

    fn record(&mut self, events: &[AccessEvent]) {
        for event in events {
            info!(
                card = %event.card_identifier,
                user = event.user_name.as_deref().unwrap_or("-"),
                "{}",
                event.kind
            );

            if !event.kind.is_mandatory() && !self.settings.log_denied {
                continue;
            }
            if let Err(e) = self.audit.append(event) {
                error!("Failed to write audit record: {}", e);
            }
        }
    }

    fn request_lock(&self) {
        warn!(
            "No valid card for {}s, locking workstation",
            self.machine.timeout().as_secs()
        );

        let lock = self.lock.clone();
        tokio::spawn(async move {
            if let Err(e) = lock.lock().await {
                error!("Failed to lock workstation: {}", e);
            }
        });
    }
}

/// Open the configured PC/SC reader.
///
/// # Errors
///
/// Returns `HardwareError::DeviceNotFound` when no reader matches.
#[cfg(feature = "pcsc")]
pub fn open_reader(config: &AppConfig) -> badgelock_hardware::Result<AnyCardReader> {
    use badgelock_hardware::pcsc_reader::PcscReader;

    let reader = PcscReader::open(config.reader_name.as_deref(), config.reader_timeout())?;
    Ok(AnyCardReader::Pcsc(reader))
}

/// Open the configured PC/SC reader.
///
/// # Errors
///
/// Always fails: this build has no PC/SC support.
#[cfg(not(feature = "pcsc"))]
pub fn open_reader(_config: &AppConfig) -> badgelock_hardware::Result<AnyCardReader> {
    Err(badgelock_hardware::HardwareError::unsupported(
        "PC/SC readers (rebuild with --features pcsc, or use --mock)",
    ))
}

/// Names of the attached PC/SC readers.
#[cfg(feature = "pcsc")]
pub fn list_readers() -> badgelock_hardware::Result<Vec<String>> {
    badgelock_hardware::pcsc_reader::PcscReader::list_readers()
}

/// Names of the attached PC/SC readers.
#[cfg(not(feature = "pcsc"))]
pub fn list_readers() -> badgelock_hardware::Result<Vec<String>> {
    Err(badgelock_hardware::HardwareError::unsupported(
        "PC/SC readers (rebuild with --features pcsc)",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::{Arc, Mutex};

    use badgelock_core::AccessEventKind;
    use badgelock_engine::{AccessStatus, DisplayDirective};
    use badgelock_hardware::mock::{
        MockLockAction, MockReader, MockReaderHandle, MockSuspendSignal, MockSuspendSignalHandle,
    };
    use tempfile::TempDir;

    const TIMEOUT: Duration = Duration::from_secs(20);
    const ALICE: [u8; 4] = [0xAB, 0x12, 0xCD, 0x34];
    const UNKNOWN: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<DisplayDirective>>>);

    impl Recorder {
        fn last(&self) -> DisplayDirective {
            self.0.lock().unwrap().last().cloned().unwrap()
        }

        fn count(&self) -> usize {
            self.0.lock().unwrap().len()
        }
    }

    impl Presentation for Recorder {
        fn present(&mut self, directive: &DisplayDirective) {
            self.0.lock().unwrap().push(directive.clone());
        }
    }

    struct Harness {
        _dir: TempDir,
        driver: Driver,
        reader: MockReaderHandle,
        suspend: MockSuspendSignalHandle,
        lock: MockLockAction,
        audit: MemoryAuditLog,
        display: Recorder,
    }

    fn harness(log_denied: bool) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("authorized_users.json");
        fs::write(
            &path,
            r#"{"users": [{"name": "Alice", "card_number": "ab12cd34"}]}"#,
        )
        .unwrap();

        let (reader, reader_handle) = MockReader::new();
        let (suspend, suspend_handle) = MockSuspendSignal::new();
        let lock = MockLockAction::new();
        let audit = MemoryAuditLog::new();
        let display = Recorder::default();

        let driver = Driver::new(AnyCardReader::Mock(reader), RegistryStore::new(path), TIMEOUT)
            .with_suspend_signal(AnySuspendSignal::Mock(suspend))
            .with_lock_action(AnyLockAction::Mock(lock.clone()))
            .with_presentation(display.clone())
            .with_audit_log(audit.clone())
            .with_settings(DriverSettings {
                tick_interval: Duration::from_millis(5),
                startup_delay: Duration::from_millis(1),
                log_denied,
                zone: AuditZone::default(),
            });

        Harness {
            _dir: dir,
            driver,
            reader: reader_handle,
            suspend: suspend_handle,
            lock,
            audit,
            display,
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn audited(audit: &MemoryAuditLog) -> Vec<AccessEventKind> {
        audit.events().iter().map(|e| e.kind).collect()
    }

    #[tokio::test]
    async fn test_grant_remove_and_lock() {
        let mut h = harness(false);
        let t0 = Instant::now();

        h.reader.present(&ALICE).unwrap();
        let outcome = h.driver.tick_at(t0).await;
        assert_eq!(outcome.status, AccessStatus::Authorized);
        assert!(!h.display.last().visible);

        h.reader.remove();
        let t1 = t0 + Duration::from_secs(1);
        let outcome = h.driver.tick_at(t1).await;
        assert_eq!(outcome.status, AccessStatus::NoCard);
        assert!(h.display.last().visible);
        assert_eq!(h.display.last().timer_text, "Auto Lock in: 20");

        let outcome = h.driver.tick_at(t1 + Duration::from_secs(21)).await;
        assert!(outcome.lock);
        settle().await;

        assert_eq!(h.lock.lock_count(), 1);
        assert_eq!(
            audited(&h.audit),
            vec![AccessEventKind::Granted, AccessEventKind::SessionEnded]
        );
        assert_eq!(h.audit.events()[0].user_name.as_deref(), Some("Alice"));
        assert_eq!(h.display.count(), 3);
    }

    #[tokio::test]
    async fn test_denied_audited_only_when_enabled() {
        for log_denied in [false, true] {
            let mut h = harness(log_denied);
            h.reader.present(&UNKNOWN).unwrap();

            let outcome = h.driver.tick_at(Instant::now()).await;
            assert_eq!(outcome.status, AccessStatus::Unauthorized);
            assert_eq!(outcome.events[0].kind, AccessEventKind::Denied);

            let expected = if log_denied {
                vec![AccessEventKind::Denied]
            } else {
                Vec::new()
            };
            assert_eq!(audited(&h.audit), expected);
        }
    }

    #[tokio::test]
    async fn test_audit_failure_does_not_block_tick() {
        let mut h = harness(false);
        h.audit.set_failing(true);
        h.reader.present(&ALICE).unwrap();

        let outcome = h.driver.tick_at(Instant::now()).await;
        assert_eq!(outcome.status, AccessStatus::Authorized);
        assert_eq!(outcome.events.len(), 1);
        assert!(h.audit.events().is_empty());
        assert_eq!(h.display.count(), 1);
    }

    #[tokio::test]
    async fn test_lock_failure_still_restarts_window() {
        let mut h = harness(false);
        h.lock.set_failing(true);
        let t0 = Instant::now();

        h.driver.tick_at(t0).await;
        let t1 = t0 + TIMEOUT;
        assert!(h.driver.tick_at(t1).await.lock);
        settle().await;

        assert_eq!(h.lock.lock_count(), 1);
        assert_eq!(
            h.driver.machine().session().timeout_deadline(),
            Some(t1 + TIMEOUT)
        );
        assert!(!h.driver.tick_at(t1 + Duration::from_secs(1)).await.lock);
    }

    #[tokio::test]
    async fn test_reader_failure_fails_closed() {
        let mut h = harness(false);
        let t0 = Instant::now();
        h.reader.present(&ALICE).unwrap();
        h.driver.tick_at(t0).await;

        h.reader.fail_next_reads(1);
        let outcome = h.driver.tick_at(t0 + Duration::from_secs(1)).await;
        assert_eq!(outcome.status, AccessStatus::NoCard);
        assert_eq!(outcome.events[0].kind, AccessEventKind::SessionEnded);
        assert!(h.driver.machine().session().timeout_deadline().is_some());
    }

    #[tokio::test]
    async fn test_suspended_session_never_locks() {
        let mut h = harness(false);
        h.suspend.set_suspended(true);
        let t0 = Instant::now();

        for second in [0, 30, 60, 90] {
            let outcome = h.driver.tick_at(t0 + Duration::from_secs(second)).await;
            assert!(!outcome.lock);
            assert!(!h.display.last().visible);
        }
        settle().await;
        assert_eq!(h.lock.lock_count(), 0);
    }

    #[tokio::test]
    async fn test_disabled_lock_action_accepts_requests() {
        let mut h = harness(false);
        h.driver = h.driver.with_lock_action(AnyLockAction::Disabled);
        let t0 = Instant::now();

        h.driver.tick_at(t0).await;
        assert!(h.driver.tick_at(t0 + TIMEOUT).await.lock);
        settle().await;
        assert_eq!(h.lock.lock_count(), 0);
    }

    #[tokio::test]
    async fn test_run_ticks_until_shutdown() {
        let mut h = harness(false);
        h.reader.present(&ALICE).unwrap();

        h.driver
            .run(tokio::time::sleep(Duration::from_millis(60)))
            .await;

        assert!(h.reader.read_count() >= 2);
        assert_eq!(audited(&h.audit), vec![AccessEventKind::Granted]);
        assert_eq!(h.display.count(), h.reader.read_count());
    }

    #[tokio::test]
    async fn test_run_stops_before_first_tick() {
        let mut h = harness(false);
        h.driver = h.driver.with_settings(DriverSettings {
            startup_delay: Duration::from_secs(60),
            ..DriverSettings::default()
        });

        h.driver.run(std::future::ready(())).await;
        assert_eq!(h.reader.read_count(), 0);
    }

    #[test]
    fn test_settings_from_config() {
        let config = AppConfig {
            log_denied: true,
            tick_interval_ms: 250,
            ..AppConfig::default()
        };
        let settings = DriverSettings::from_config(&config).unwrap();
        assert!(settings.log_denied);
        assert_eq!(settings.tick_interval, Duration::from_millis(250));
        assert_eq!(settings.zone.label(), "JST");
    }

    #[cfg(not(feature = "pcsc"))]
    #[test]
    fn test_open_reader_without_pcsc_support() {
        assert!(open_reader(&AppConfig::default()).is_err());
        assert!(list_readers().is_err());
    }
}
