//! reaction — watch a TCP endpoint and rotate through remediation actions.
//!
//! Probes `address:port` every `interval` seconds. When the probe fails,
//! the next configured command runs. `kill -USR1 <pid>` runs the next
//! command immediately; `SIGHUP`, `SIGINT`, `SIGTERM`, and `SIGQUIT` stop
//! the watchdog after any in-flight command finishes.
//!
//! # Usage
//!
//! ```text
//! reaction -c /etc/reaction.json
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use reaction_core::ReactionConfig;
use reaction_watch::{ReactionEngine, SignalBridge, dispatch};

#[derive(Parser)]
#[command(
    name = "reaction",
    about = "Watch a TCP endpoint and run remediation actions when it fails"
)]
struct Cli {
    /// Location of the config file (.json, or .toml).
    #[arg(short, long, default_value = "reaction.json")]
    config: PathBuf,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Print the version and exit.
    #[arg(short, long)]
    version: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("Reaction Version: {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    init_tracing(cli.log_format)?;

    // A bad config is logged and exits 0.
    let config = match ReactionConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!(path = %cli.config.display(), error = %e, "failed to load config");
            return Ok(());
        }
    };

    run(config).await?;
    info!("For every reaction there's an equal and opposite reaction");
    Ok(())
}

fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info,reactiond=debug,reaction_watch=debug"))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
    Ok(())
}

async fn run(config: ReactionConfig) -> anyhow::Result<()> {
    info!(
        endpoint = %config.target.endpoint(),
        interval_secs = config.interval.as_secs(),
        actions = config.target.actions.len(),
        "reaction service starting"
    );

    let engine = Arc::new(ReactionEngine::from_config(&config)?);

    // ── Signals ────────────────────────────────────────────────

    let bridge = SignalBridge::install()?;
    let (events_tx, events_rx) = mpsc::channel(16);
    let bridge_handle = tokio::spawn(bridge.forward(events_tx));

    // ── Timer ──────────────────────────────────────────────────

    let timer_handle = {
        let engine = Arc::clone(&engine);
        let interval = config.interval;
        tokio::spawn(async move { engine.run(interval).await })
    };

    // Returns once a shutdown event has drained the engine.
    dispatch(Arc::clone(&engine), events_rx).await;

    join_logged("timer", timer_handle).await;
    bridge_handle.abort();

    info!("reaction service stopped");
    Ok(())
}

/// Await a background task, logging a panic or cancellation instead of
/// dropping it. Returns whether the task finished normally.
async fn join_logged(task: &str, handle: JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(e) => {
            error!(task, error = %e, "background task failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["reaction"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("reaction.json"));
        assert!(!cli.version);
        assert!(matches!(cli.log_format, LogFormat::Text));
    }

    #[test]
    fn short_flags() {
        let cli = Cli::try_parse_from(["reaction", "-c", "/etc/reaction.toml", "-v"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/reaction.toml"));
        assert!(cli.version);
    }

    #[tokio::test]
    async fn join_logged_reports_task_panic() {
        let clean = tokio::spawn(async {});
        assert!(join_logged("clean", clean).await);

        let failing = tokio::spawn(async { panic!("timer loop crashed"); });
        assert!(!join_logged("timer", failing).await);
    }

    #[test]
    fn json_log_format() {
        let cli = Cli::try_parse_from(["reaction", "--log-format", "json"]).unwrap();
        assert!(matches!(cli.log_format, LogFormat::Json));
    }
}
