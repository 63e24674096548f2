//! Host binary for Vocation.
//!
//! Wires the progression registry to its collaborators and keeps it
//! running: periodic bulk saves, configuration reload on `SIGHUP`, an
//! operator console on standard input, and a final save on shutdown.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `$VOCATION_CONFIG` (default
//!    `vocation-config.yaml`), falling back to defaults if absent
//! 2. Initialize structured logging (tracing), honoring `RUST_LOG` and
//!    otherwise `logging.level`
//! 3. Build the engine services
//! 4. Start the autosave timer, the reload handler and the console
//! 5. Wait for Ctrl-C, then run one last bulk save

mod adapters;
mod console;
mod engine;
mod error;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vocation_core::JobsConfig;

use crate::engine::Engine;
use crate::error::EngineError;

/// Environment variable naming the configuration file.
const CONFIG_ENV: &str = "VOCATION_CONFIG";

/// Configuration file used when [`CONFIG_ENV`] is unset.
const DEFAULT_CONFIG_PATH: &str = "vocation-config.yaml";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if configuration fails to load or the final save task
/// cannot run.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config_path = std::env::var_os(CONFIG_ENV)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let (config, found) = load_config(&config_path)?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!("vocation-engine starting");
    if !found {
        info!(path = %config_path.display(), "Config file not found, using defaults");
    }
    info!(
        path = %config_path.display(),
        jobs = config.jobs.len(),
        save_on_disconnect = config.general.save_on_disconnect,
        save_period_secs = config.general.save_period_secs,
        broadcast_levelups = config.broadcast.on_levelup,
        broadcast_skillups = config.broadcast.on_skillup,
        "Configuration loaded"
    );

    // 3. Build services.
    let save_period = config.save_period();
    let engine = Arc::new(Engine::new(config, config_path));

    // 4. Background tasks.
    let autosave = tokio::spawn(autosave(Arc::clone(&engine), save_period));
    #[cfg(unix)]
    let hangup = tokio::spawn(reload_on_hangup(Arc::clone(&engine)));
    let console = tokio::spawn(console::run(Arc::clone(&engine)));
    info!(save_period_secs = save_period.as_secs(), "Engine running, Ctrl-C to stop");

    // 5. Shutdown.
    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");
    autosave.abort();
    #[cfg(unix)]
    hangup.abort();
    console.abort();

    let final_engine = Arc::clone(&engine);
    let report = tokio::task::spawn_blocking(move || final_engine.save_all())
        .await
        .map_err(EngineError::from)?;
    info!(
        persisted = report.persisted,
        failed = report.failed,
        remaining = engine.registry().len(),
        "vocation-engine shutdown complete"
    );

    Ok(())
}

/// Load configuration from `path`, or defaults if the file does not exist.
///
/// Returns the configuration and whether the file was found.
fn load_config(path: &Path) -> Result<(JobsConfig, bool), EngineError> {
    if path.exists() {
        Ok((JobsConfig::from_file(path)?, true))
    } else {
        Ok((JobsConfig::default(), false))
    }
}

/// Run a bulk save every `period` until aborted.
async fn autosave(engine: Arc<Engine>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    // The first tick completes immediately; nothing is dirty yet.
    interval.tick().await;
    loop {
        interval.tick().await;
        let engine = Arc::clone(&engine);
        if let Err(err) = tokio::task::spawn_blocking(move || engine.save_all()).await {
            warn!(error = %err, "autosave task failed");
        }
    }
}

/// Reload configuration each time the process receives `SIGHUP`.
#[cfg(unix)]
async fn reload_on_hangup(engine: Arc<Engine>) -> Result<(), EngineError> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = signal(SignalKind::hangup())?;
    while hangup.recv().await.is_some() {
        info!("SIGHUP received, reloading configuration");
        let engine = Arc::clone(&engine);
        match tokio::task::spawn_blocking(move || engine.reload()).await {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => warn!(error = %err, "reload failed, keeping current configuration"),
            Err(err) => warn!(error = %err, "reload task failed"),
        }
    }
    Ok(())
}
