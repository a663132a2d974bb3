//! mailbeat — recurring test-email scheduler.
//!
//! Persists its settings and timer state as JSON under a state directory and
//! drives the schedule from a cooperative tick loop (`run`). All other
//! subcommands are the admin surface: they read or mutate settings, then
//! hand the resulting configuration to the lifecycle controller.

mod lifecycle;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use lifecycle::LifecycleController;
use mailbeat_core::config::{is_valid_email, load_dotenv};
use mailbeat_core::settings::{KEY_CUSTOM_DAYS, KEY_FREQUENCY, KEY_RECIPIENT};
use mailbeat_core::{FrequencyKind, JsonFileSettings, SettingsStore, TaskConfiguration};
use mailbeat_notify::{Dispatcher, SmtpConfig, SmtpMailer, StaticSite};
use mailbeat_scheduler::{JsonFileTimer, ScheduleStatus, SchedulerCore};

/// Timer record name for the one recurring task this binary manages.
const TASK_NAME: &str = "mailbeat.test_email";

// ── CLI ─────────────────────────────────────────────────────────────

/// Sends a recurring test email and keeps its own schedule healthy.
#[derive(Parser, Debug)]
#[command(name = "mailbeat", version, about)]
struct Cli {
    /// Directory holding settings.json and timers.json.
    #[arg(long, env = "MAILBEAT_STATE_DIR", default_value = ".mailbeat")]
    state_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the cooperative tick loop: repair drift, fire due timers.
    Run {
        /// Seconds between ticks.
        #[arg(long, env = "MAILBEAT_TICK_SECONDS", default_value_t = 60)]
        tick_seconds: u64,
    },
    /// Send a test email to the configured recipient right now.
    SendTest,
    /// Show the configured cadence and the next scheduled fire.
    Status,
    /// Install the schedule from current settings.
    Activate,
    /// Remove the schedule.
    Deactivate,
    /// Update settings; any change rebuilds the schedule.
    Set {
        /// Recipient email address. Pass an empty string to disable the task.
        #[arg(long)]
        recipient: Option<String>,
        /// One of: daily, weekly, monthly, custom_days.
        #[arg(long)]
        frequency: Option<String>,
        /// Repeat interval in days when frequency is custom_days.
        #[arg(long)]
        custom_days: Option<u32>,
    },
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let settings = JsonFileSettings::open(cli.state_dir.join("settings.json"))
        .context("failed to open settings store")?;
    let timer = Arc::new(
        JsonFileTimer::open(cli.state_dir.join("timers.json"))
            .context("failed to open timer store")?,
    );

    let mailer = SmtpMailer::from_config(&SmtpConfig::from_env())
        .map_err(|e| anyhow::anyhow!("SMTP configuration: {e}"))?;
    let controller = LifecycleController::new(
        SchedulerCore::new(TASK_NAME, timer),
        Dispatcher::new(Arc::new(mailer), Arc::new(StaticSite::from_env())),
    );

    let config = TaskConfiguration::from_store(&settings);

    match cli.command {
        Command::Run { tick_seconds } => run_loop(&controller, &settings, tick_seconds).await,
        Command::SendTest => send_test(&controller, &config).await,
        Command::Status => show_status(&controller, &config),
        Command::Activate => {
            controller.on_activate(&config)?;
            show_status(&controller, &config)
        }
        Command::Deactivate => {
            controller.on_deactivate()?;
            println!("Schedule removed.");
            Ok(())
        }
        Command::Set {
            recipient,
            frequency,
            custom_days,
        } => apply_settings(&controller, &settings, recipient, frequency, custom_days),
    }
}

// ── Subcommands ─────────────────────────────────────────────────────

async fn run_loop(
    controller: &LifecycleController,
    settings: &JsonFileSettings,
    tick_seconds: u64,
) -> anyhow::Result<()> {
    info!(tick_seconds, "mailbeat tick loop starting");
    let mut ticker = tokio::time::interval(Duration::from_secs(tick_seconds.max(1)));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // Re-read settings every tick so external edits take effect
                // without a restart.
                let config = TaskConfiguration::from_store(settings);
                controller.on_tick(&config).await;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                break;
            }
        }
    }
    Ok(())
}

async fn send_test(
    controller: &LifecycleController,
    config: &TaskConfiguration,
) -> anyhow::Result<()> {
    use mailbeat_notify::DispatchError;

    match controller.send_test_now(config).await {
        Ok(()) => {
            println!(
                "Test email sent to {}.",
                config.recipient().unwrap_or_default()
            );
            Ok(())
        }
        Err(DispatchError::MissingRecipient) => {
            anyhow::bail!("no recipient configured; set one with `mailbeat set --recipient <address>`")
        }
        Err(e) => anyhow::bail!("sending failed: {e}"),
    }
}

fn show_status(
    controller: &LifecycleController,
    config: &TaskConfiguration,
) -> anyhow::Result<()> {
    // Surface drift before repairing it, mirroring the admin-page warning.
    if controller.scheduler().status(config) == ScheduleStatus::Missing {
        println!("Warning: schedule record was missing; restoring it now.");
    }
    controller.on_admin_view(config);

    match controller.scheduler().status(config) {
        ScheduleStatus::Disabled => {
            println!("Disabled: no recipient configured.");
        }
        ScheduleStatus::Active {
            next_fire_at,
            label,
        } => {
            println!(
                "Recipient:  {}",
                config.recipient().unwrap_or_default()
            );
            println!("Cadence:    {label}");
            println!("Next fire:  {next_fire_at}");
        }
        ScheduleStatus::Missing => {
            // Repair failed (e.g. invalid custom days); leave the warning.
            println!("Schedule record is missing and could not be restored.");
        }
    }
    Ok(())
}

fn apply_settings(
    controller: &LifecycleController,
    settings: &JsonFileSettings,
    recipient: Option<String>,
    frequency: Option<String>,
    custom_days: Option<u32>,
) -> anyhow::Result<()> {
    if recipient.is_none() && frequency.is_none() && custom_days.is_none() {
        anyhow::bail!("nothing to set; pass --recipient, --frequency, or --custom-days");
    }

    // Reject bad values at the write boundary so the stored settings are
    // always well-formed.
    if let Some(addr) = &recipient {
        if !addr.trim().is_empty() && !is_valid_email(addr) {
            anyhow::bail!("'{addr}' is not a valid email address");
        }
        settings.set(KEY_RECIPIENT, addr.trim())?;
    }
    if let Some(freq) = &frequency {
        settings.set(KEY_FREQUENCY, FrequencyKind::parse(freq).as_str())?;
    }
    if let Some(days) = custom_days {
        settings.set(KEY_CUSTOM_DAYS, &days.to_string())?;
    }

    let config = TaskConfiguration::from_store(settings);
    controller
        .on_configuration_changed(&config)
        .context("schedule rebuild failed")?;

    show_status(controller, &config)
}
