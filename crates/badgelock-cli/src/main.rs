//! Badgelock - card-presence workstation lock
//!
//! Locks the workstation when no registered card has been on the reader for
//! the configured timeout.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use badgelock_core::CardIdentifier;
use badgelock_hardware::mock::{MockReader, MockSuspendSignal};
use badgelock_hardware::{
    AnyCardReader, AnyLockAction, AnySuspendSignal, HostLockAction, HostSuspendSignal,
};
use badgelock_storage::{FileAuditLog, RegistryStore};

use badgelock_cli::enrollment::ENROLL_POLL_INTERVAL;
use badgelock_cli::{
    AppConfig, Driver, DriverSettings, TerminalPresentation, driver, enroll_user, open_reader,
    wait_for_card,
};

#[derive(Parser)]
#[command(name = "badgelock")]
#[command(about = "Lock the workstation when no registered card is on the reader", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (default: ./badgelock.toml, or $BADGELOCK_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the lock loop
    Run {
        /// Use a mock reader and mock session instead of the hardware
        #[arg(long)]
        mock: bool,
    },

    /// Register a card for a user
    Enroll {
        /// User name
        #[arg(short, long)]
        name: String,

        /// Card identifier (hex); read from the reader when omitted
        #[arg(long)]
        card: Option<String>,

        /// Seconds to wait for a card on the reader
        #[arg(long, default_value_t = 30)]
        wait_secs: u64,
    },

    /// List attached card readers
    Readers,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "badgelock=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::resolve(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Run { mock } => run(config, mock).await,
        Commands::Enroll {
            name,
            card,
            wait_secs,
        } => enroll(config, &name, card.as_deref(), Duration::from_secs(wait_secs)).await,
        Commands::Readers => readers(),
    }
}

async fn run(config: AppConfig, mock: bool) -> Result<()> {
    let settings = DriverSettings::from_config(&config).context("Invalid audit settings")?;

    let (reader, suspend, lock) = if mock {
        info!("Running with mock reader and session");
        let (reader, _handle) = MockReader::new();
        let (suspend, _handle) = MockSuspendSignal::new();
        (
            AnyCardReader::Mock(reader),
            AnySuspendSignal::Mock(suspend),
            AnyLockAction::Disabled,
        )
    } else {
        let reader = open_reader(&config).context("No card reader available")?;
        let lock = if config.lock_enabled {
            AnyLockAction::Host(HostLockAction)
        } else {
            info!("Workstation locking disabled by configuration");
            AnyLockAction::Disabled
        };
        (
            reader,
            AnySuspendSignal::Host(HostSuspendSignal::new(config.suspend_query_timeout())),
            lock,
        )
    };

    let audit = FileAuditLog::new(&config.audit_log_path, settings.zone.clone());

    let mut driver = Driver::new(reader, RegistryStore::new(&config.registry_path), config.timeout())
        .with_suspend_signal(suspend)
        .with_lock_action(lock)
        .with_presentation(TerminalPresentation::stdout())
        .with_audit_log(audit)
        .with_settings(settings);

    driver
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    info!("Badgelock stopped");
    Ok(())
}

async fn enroll(config: AppConfig, name: &str, card: Option<&str>, wait: Duration) -> Result<()> {
    let card = match card {
        Some(card) => CardIdentifier::new(card).context("Invalid card identifier")?,
        None => {
            let mut reader = open_reader(&config).context("No card reader available")?;
            println!("Place the card to register on the reader...");
            match wait_for_card(&mut reader, ENROLL_POLL_INTERVAL, wait).await {
                Some(card) => card,
                None => bail!("No card presented within {}s", wait.as_secs()),
            }
        }
    };

    let mut store = RegistryStore::new(&config.registry_path);
    let report = enroll_user(&mut store, name, card)
        .with_context(|| format!("Failed to update {}", config.registry_path.display()))?;

    if let Some(owner) = &report.previous_owner {
        println!("Current owner: {owner} (entry overwritten)");
    }
    println!(
        "Successfully registered: {} ({})",
        report.record.name, report.record.card_identifier
    );
    Ok(())
}

fn readers() -> Result<()> {
    let names = driver::list_readers().context("Failed to list readers")?;
    if names.is_empty() {
        bail!("No readers found");
    }

    println!("Detected readers:");
    for (index, name) in names.iter().enumerate() {
        println!("  [{index}] {name}");
    }
    Ok(())
}
