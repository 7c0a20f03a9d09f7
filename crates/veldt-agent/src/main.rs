//! Animal worker binary for the veldt simulation.
//!
//! One process, one animal. The worker reads its parameters from the
//! environment variables its parent set, dials the environment, joins
//! under its own pid, and then lives tick by tick: decay, maybe die,
//! maybe reproduce, maybe feed, sleep. It exits after announcing its
//! death or when the environment goes away.

mod behavior;
mod client;
mod config;

use std::time::Duration;

use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use veldt_types::{Command, Reply, WorkerId};

use crate::behavior::{AgentState, TickPlan};
use crate::client::{ClientError, EnvironmentClient};
use crate::config::AgentConfig;

/// Application entry point for one animal worker.
///
/// # Errors
///
/// Returns an error when configuration is unusable, the environment
/// cannot be reached, or the connection fails mid-life.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = AgentConfig::from_env()?;
    let id = WorkerId::from_raw(std::process::id());
    info!(
        kind = config.kind.label(),
        %id,
        endpoint = config.endpoint(),
        "worker starting"
    );

    let mut client = EnvironmentClient::connect(&config.endpoint()).await?;
    let reply = client
        .exchange(Command::Join {
            kind: config.kind,
            id,
        })
        .await?;
    if let Reply::Error { message } = &reply {
        error!(%message, "environment refused the join");
        return Err(message.clone().into());
    }
    info!(%reply, "joined the environment");

    run_agent(&config, id, &mut client).await?;

    info!(%id, "worker exiting");
    Ok(())
}

/// Live out the animal's life against the environment.
///
/// Runs until the energy reserve goes negative, at which point the
/// death is announced and the function returns.
async fn run_agent(
    config: &AgentConfig,
    id: WorkerId,
    client: &mut EnvironmentClient,
) -> Result<(), ClientError> {
    let mut rng = rand::rng();
    let mut state = AgentState::new(&config.behavior);
    let tick_interval = Duration::from_millis(config.behavior.tick_interval_ms);
    let kind = config.kind;

    loop {
        match state.plan_tick(&config.behavior, &mut rng) {
            TickPlan::Die => {
                let reply = client.exchange(Command::Die { kind, id }).await?;
                info!(%reply, energy = state.energy(), "death announced");
                return Ok(());
            }
            TickPlan::Live { repro, feed } => {
                if repro {
                    let reply = client.exchange(Command::Repro { kind, id }).await?;
                    debug!(%reply, energy = state.energy(), "rendezvous answered");
                }
                if feed {
                    let reply = client.exchange(Command::Feed { kind, id }).await?;
                    state.apply_feed_reply(&config.behavior, &reply);
                    debug!(%reply, energy = state.energy(), "feed answered");
                }
            }
        }

        if !tick_interval.is_zero() {
            tokio::time::sleep(tick_interval).await;
        }
    }
}
