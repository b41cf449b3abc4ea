mod banner;
mod prompt;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use blockassist_core::{
    load_config, validate_config, CleanupHandler, Config, LogFailure, LogWatcher, ProcessRegistry,
    RunError, RunOrchestrator, RunSummary,
};

/// Conventional exit code for a SIGINT-terminated process.
const EXIT_INTERRUPTED: i32 = 130;

enum Outcome {
    Finished(Result<RunSummary, RunError>),
    Interrupted,
    WatcherFault(LogFailure),
}

fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let code = match launch() {
        Ok(code) => code,
        Err(e) => {
            error!("Fatal error: {:#}", e);
            1
        }
    };
    std::process::exit(code);
}

/// Everything that must happen before the runtime: config, validation and
/// the token prompt, which mutates the environment while the process is
/// still single-threaded.
fn launch() -> Result<i32> {
    banner::print_banner();

    let config = load_launcher_config()?;
    validate_config(&config).context("Configuration validation failed")?;

    prompt::ensure_hf_token()?;

    run(config)
}

#[tokio::main]
async fn run(config: Config) -> Result<i32> {
    let registry = ProcessRegistry::new();
    let cleanup = CleanupHandler::new(registry.clone(), config.shutdown.grace());

    let mut watcher_rx = if config.watcher.enabled {
        let watcher = LogWatcher::new(
            PathBuf::from(&config.paths.logs_dir),
            config.watcher.check_interval(),
        );
        Some(watcher.spawn())
    } else {
        info!("Log watcher disabled in config");
        None
    };

    let mut orchestrator = RunOrchestrator::new(config, registry, cleanup.clone());

    let outcome = tokio::select! {
        result = orchestrator.run() => Outcome::Finished(result),
        _ = shutdown_signal() => Outcome::Interrupted,
        failure = watcher_failure(&mut watcher_rx) => Outcome::WatcherFault(failure),
    };

    // Every exit path converges here; the handler itself guarantees the
    // termination sweep happens at most once.
    cleanup.run().await;

    match outcome {
        Outcome::Finished(Ok(summary)) => {
            banner::print_summary(&summary);
            Ok(0)
        }
        Outcome::Finished(Err(e)) => {
            error!("Run failed: {}", e);
            Ok(e.exit_code())
        }
        Outcome::Interrupted => {
            info!("Interrupt received, shutting down");
            Ok(EXIT_INTERRUPTED)
        }
        Outcome::WatcherFault(failure) => {
            error!(
                "Aborting run: {} in {}",
                failure.reason,
                failure.file.display()
            );
            for line in &failure.traceback {
                error!("  {}", line);
            }
            Ok(1)
        }
    }
}

/// Loads configuration: an explicit `BLOCKASSIST_CONFIG` path must exist,
/// `./blockassist.toml` is picked up when present, and otherwise every
/// default applies.
fn load_launcher_config() -> Result<Config> {
    if let Ok(path) = std::env::var("BLOCKASSIST_CONFIG") {
        info!("Loading configuration from {}", path);
        return load_config(Path::new(&path))
            .with_context(|| format!("Failed to load config from {path}"));
    }

    let default_path = Path::new("blockassist.toml");
    if default_path.exists() {
        info!("Loading configuration from {}", default_path.display());
        return load_config(default_path).context("Failed to load blockassist.toml");
    }

    info!("No configuration file found, using defaults");
    Ok(Config::default())
}

/// Resolves when the watcher reports a fatal log condition. Pends forever
/// when the watcher is disabled or its channel closes, so the select above
/// never sees a spurious completion.
async fn watcher_failure(rx: &mut Option<mpsc::Receiver<LogFailure>>) -> LogFailure {
    match rx {
        Some(rx) => match rx.recv().await {
            Some(failure) => failure,
            None => {
                warn!("Log watcher stopped unexpectedly");
                std::future::pending().await
            }
        },
        None => std::future::pending().await,
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
