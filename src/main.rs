//! autosleepd - suspend the system after a period of user inactivity.
//!
//! Polls the time since last user input and requests suspend once it reaches
//! the configured threshold.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use anyhow::Result;
use autosleepd::config::Config;
use autosleepd::config::IdleBackend;
use autosleepd::config::SuspendMethod;
use autosleepd::domain::Outcome;
use autosleepd::domain::PollReport;
use autosleepd::domain::format_idle;
use autosleepd::idle;
use autosleepd::monitor::IdleMonitor;
use autosleepd::monitor::QUERY_TIMEOUT;
use autosleepd::monitor::bounded_query;
use autosleepd::power;
use autosleepd::status::ConsoleStatus;
use autosleepd::status::SilentStatus;
use autosleepd::status::StatusSink;
use autosleepd::status::status_line;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Suspend the system after a period of user inactivity.
#[derive(Parser, Debug)]
#[command(name = "autosleepd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seconds without input before suspending (overrides config).
    #[arg(long, value_name = "SECS")]
    idle_threshold: Option<u64>,

    /// Seconds between idle checks (overrides config).
    #[arg(long, value_name = "SECS")]
    poll_interval: Option<u64>,

    /// Idle detection backend (overrides config).
    #[arg(long, value_enum)]
    idle_backend: Option<IdleBackend>,

    /// Suspend method (overrides config).
    #[arg(long, value_enum)]
    suspend_method: Option<SuspendMethod>,

    /// Enable dry-run mode (log instead of suspending).
    #[arg(long)]
    dry_run: bool,

    /// Don't print per-poll status lines.
    #[arg(short, long)]
    quiet: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Query the idle time once, print it, and exit.
    #[arg(long)]
    probe: bool,
}

impl Args {
    /// Command line values win over the config file.
    fn apply_to(&self, config: &mut Config) {
        if let Some(secs) = self.idle_threshold {
            config.idle_threshold_seconds = secs;
        }
        if let Some(secs) = self.poll_interval {
            config.poll_interval_seconds = secs;
        }
        if let Some(backend) = self.idle_backend {
            config.idle_backend = backend;
        }
        if let Some(method) = self.suspend_method {
            config.suspend_method = method;
        }
        if self.dry_run {
            config.dry_run = true;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_logging(&args.log_level) {
        eprintln!("Error: {e:#}");
        return ExitCode::FAILURE;
    }

    info!("autosleepd v{} starting", env!("CARGO_PKG_VERSION"));

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Initialize logging with the specified level.
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(format!("autosleepd={level}"))
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Invalid log level")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

async fn run(args: Args) -> Result<ExitCode> {
    let mut config =
        Config::load_or_default(args.config.as_deref()).context("Failed to load configuration")?;
    args.apply_to(&mut config);
    config.validate().context("Invalid configuration")?;

    info!(
        "Configuration loaded (threshold={}s, interval={}s, dry_run={})",
        config.idle_threshold_seconds, config.poll_interval_seconds, config.dry_run
    );

    if args.probe {
        return run_probe(&config).await;
    }

    let monitor = IdleMonitor::new(config.idle_threshold(), config.poll_interval())?;

    let mut idle_source = idle::open(config.idle_backend)
        .await
        .context("Cannot monitor idle time on this system")?;
    let mut suspend_action = power::open(&config)
        .await
        .context("Cannot request suspend on this system")?;

    let mut status: Box<dyn StatusSink> = if args.quiet {
        Box::new(SilentStatus)
    } else {
        println!(
            "Monitoring idle time. Suspending after {}.",
            format_idle(monitor.threshold())
        );
        println!("Check interval: {}.", format_idle(monitor.interval()));
        println!("Press Ctrl+C to stop.");
        Box::new(ConsoleStatus)
    };

    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    let outcome = monitor
        .run(
            idle_source.as_mut(),
            suspend_action.as_mut(),
            status.as_mut(),
            &cancel,
        )
        .await;

    match outcome {
        Outcome::Suspended => info!("Suspend requested, exiting"),
        Outcome::CancelledByUser => info!("Stopped by user"),
        Outcome::FailedFatal(ref reason) => error!("Giving up: {}", reason),
    }

    Ok(ExitCode::from(outcome.exit_code()))
}

/// Query the idle time once and print it.
async fn run_probe(config: &Config) -> Result<ExitCode> {
    let mut source = idle::open(config.idle_backend)
        .await
        .context("Cannot monitor idle time on this system")?;

    let idle = bounded_query(source.as_mut(), QUERY_TIMEOUT)
        .await
        .with_context(|| format!("Idle query via {} failed", source.name()))?;

    println!(
        "[{}] {}",
        source.name(),
        status_line(&PollReport {
            poll: 1,
            idle: Some(idle),
            threshold: config.idle_threshold(),
        })
    );

    Ok(ExitCode::SUCCESS)
}

/// Cancel the monitor on Ctrl+C (and SIGTERM on Unix).
fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        cancel.cancel();
    });
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::SignalKind;
    use tokio::signal::unix::signal;

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            warn!("Failed to install SIGTERM handler: {}", e);
            wait_for_ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        () = wait_for_ctrl_c() => {}
        _ = terminate.recv() => info!("Received SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C"),
        Err(e) => {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let args = Args::parse_from([
            "autosleepd",
            "--idle-threshold",
            "600",
            "--poll-interval",
            "15",
            "--idle-backend",
            "logind",
            "--suspend-method",
            "command",
            "--dry-run",
        ]);
        let mut config = Config::default();
        args.apply_to(&mut config);

        assert_eq!(config.idle_threshold_seconds, 600);
        assert_eq!(config.poll_interval_seconds, 15);
        assert_eq!(config.idle_backend, IdleBackend::Logind);
        assert_eq!(config.suspend_method, SuspendMethod::Command);
        assert!(config.dry_run);
    }

    #[test]
    fn test_no_flags_keep_config() {
        let args = Args::parse_from(["autosleepd"]);
        let mut config = Config {
            idle_threshold_seconds: 900,
            dry_run: true,
            ..Config::default()
        };
        args.apply_to(&mut config);

        assert_eq!(config.idle_threshold_seconds, 900);
        assert_eq!(config.poll_interval_seconds, 60);
        assert!(config.dry_run);
    }

    #[test]
    fn test_args_debug_assert() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
