//! Environment orchestrator binary for the veldt simulation.
//!
//! This is the central process every animal worker talks to. It owns
//! the resource ledger and the agent registry, listens for worker
//! connections, serves operator requests, and drives the tick loop
//! until an end condition is met.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `veldt-config.yaml`
//! 3. Build the world state from the ecology config
//! 4. Bind the worker listener and start the accept loop
//! 5. Create the worker process launcher
//! 6. Open the operator control channel and stdin console
//! 7. Install the interrupt watcher
//! 8. Spawn the starting populations
//! 9. Run the environment loop
//! 10. Log the result and tear down

mod error;
mod orchestrator;
mod process;
mod server;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use veldt_core::config::EnvironmentConfig;
use veldt_core::{ControlClient, World, control_channel, spawn_worker};
use veldt_types::{AgentKind, ControlAction};

use crate::error::EnvironmentError;
use crate::process::ProcessLauncher;
use crate::server::WorkerServer;

/// Application entry point for the environment orchestrator.
///
/// Initializes all subsystems and runs the tick loop until an operator
/// quits, the tick limit is reached, or an interrupt arrives.
///
/// # Errors
///
/// Returns an error if configuration loading, listener binding, or
/// agent binary discovery fails. Faults after startup are logged and
/// absorbed instead.
#[tokio::main]
#[allow(clippy::too_many_lines)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("veldt-environment starting");

    // 2. Load configuration.
    let mut config = load_config()?;
    config.network.apply_env_overrides();
    info!(
        endpoint = config.network.endpoint(),
        tick_interval_ms = config.simulation.tick_interval_ms,
        max_ticks = config.simulation.max_ticks,
        "Configuration loaded"
    );

    // 3. Build the world state.
    let mut world = World::new(&config.ecology);
    info!(
        initial_grass = config.ecology.initial_grass,
        grass_growth = config.ecology.grass_growth,
        grass_unit = config.ecology.grass_unit,
        drought = config.ecology.drought,
        "World state built"
    );

    // 4. Bind the worker listener and start the accept loop.
    let endpoint = config.network.endpoint();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let server = WorkerServer::bind(&endpoint, event_tx)
        .await
        .map_err(|source| EnvironmentError::Bind {
            endpoint: endpoint.clone(),
            source,
        })?;
    let bound = server
        .local_addr()
        .map_err(|source| EnvironmentError::Bind { endpoint, source })?;
    let server_task = tokio::spawn(server.run());

    // 5. Create the worker process launcher.
    let mut launcher = ProcessLauncher::new(config.agents, bound)?;

    // 6. Open the operator control channel and stdin console.
    let (control_handle, mut control) = control_channel();
    tokio::spawn(console_loop(control_handle.attach()));
    info!("operator console attached to stdin");

    // 7. Install the interrupt watcher.
    let interrupt = Arc::new(AtomicBool::new(false));
    {
        let interrupt = Arc::clone(&interrupt);
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "failed to listen for interrupts");
                return;
            }
            interrupt.store(true, Ordering::SeqCst);
        });
    }

    // 8. Spawn the starting populations.
    for _ in 0..config.population.initial_preys {
        spawn_worker(&mut launcher, AgentKind::Prey);
    }
    for _ in 0..config.population.initial_predators {
        spawn_worker(&mut launcher, AgentKind::Predator);
    }
    info!(
        initial_preys = config.population.initial_preys,
        initial_predators = config.population.initial_predators,
        "Starting populations spawned"
    );

    // 9. Run the environment loop.
    let result = orchestrator::run_environment(
        &config.simulation,
        &mut world,
        &mut launcher,
        &mut event_rx,
        &mut control,
        &interrupt,
    )
    .await;

    // 10. Log the result and tear down.
    orchestrator::log_environment_end(&result);

    server_task.abort();
    launcher
        .shutdown(Duration::from_secs(config.simulation.shutdown_timeout_secs))
        .await;

    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        "veldt-environment shutdown complete"
    );

    Ok(())
}

/// Load the environment configuration from `veldt-config.yaml`.
///
/// Looks for the file relative to the current working directory and
/// falls back to defaults when it is absent.
fn load_config() -> Result<EnvironmentConfig, EnvironmentError> {
    let config_path = Path::new("veldt-config.yaml");
    if config_path.exists() {
        let config = EnvironmentConfig::from_file(config_path)?;
        Ok(config)
    } else {
        info!("Config file not found, using defaults");
        Ok(EnvironmentConfig::default())
    }
}

/// Relay operator lines typed on stdin into the control channel.
///
/// Each non-empty line is one action token. The reply is printed
/// verbatim, and unknown tokens still round-trip so the operator sees
/// the `ERR` echo.
async fn console_loop(mut client: ControlClient) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let token = line.trim();
        if token.is_empty() {
            continue;
        }
        client.submit(&ControlAction::from_token(token));
        if let Some(reply) = client.reply().await {
            println!("{reply}");
        }
    }
}
