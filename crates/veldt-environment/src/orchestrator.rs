//! The environment tick loop.
//!
//! One pass per tick: advance the ledger, serve at most one operator
//! request, then drain whatever the worker connections produced since
//! the previous pass. The loop owns no sockets of its own -- transport
//! tasks feed it through channels, which keeps the simulation logic
//! single-threaded and the tick order exact.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use veldt_core::config::SimulationConfig;
use veldt_core::{ControlChannel, Launcher, StatusSnapshot, World, handle_control};

use crate::server::{ConnectionId, WorkerEvent};

/// Why the environment loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// An operator issued the `QUIT` action.
    OperatorQuit,
    /// The configured tick limit was reached.
    MaxTicksReached,
    /// An interrupt was delivered to the process.
    Interrupted,
}

/// Summary of one finished environment run.
#[derive(Debug)]
pub struct EnvironmentResult {
    /// Why the loop stopped.
    pub end_reason: EndReason,
    /// Ledger counts at the moment the loop stopped.
    pub final_status: StatusSnapshot,
    /// Number of ticks fully processed.
    pub total_ticks: u64,
}

/// Run the environment loop until an end condition is met.
///
/// Each pass advances the ledger, serves at most one operator request,
/// drains queued worker traffic, reaps finished worker processes, and
/// sleeps out the remainder of the tick interval. Worker and process
/// faults are logged and absorbed; nothing here is fatal.
pub async fn run_environment(
    config: &SimulationConfig,
    world: &mut World,
    launcher: &mut dyn Launcher,
    events: &mut mpsc::UnboundedReceiver<WorkerEvent>,
    control: &mut ControlChannel,
    interrupt: &Arc<AtomicBool>,
) -> EnvironmentResult {
    let tick_interval = Duration::from_millis(config.tick_interval_ms);
    let mut connections: BTreeMap<ConnectionId, mpsc::UnboundedSender<String>> = BTreeMap::new();

    info!(
        tick_interval_ms = config.tick_interval_ms,
        max_ticks = config.max_ticks,
        "entering tick loop"
    );

    let end_reason = loop {
        // --- Check interrupt (before tick) ---
        if interrupt.load(Ordering::SeqCst) {
            info!("interrupt received, stopping");
            break EndReason::Interrupted;
        }

        // --- Advance the ledger ---
        world.advance_tick();

        // --- Serve at most one operator request ---
        let mut quit_requested = false;
        if let Some(request) = control.poll() {
            if let Some(outcome) = handle_control(world, launcher, &request) {
                control.respond(outcome.requester, &outcome.reply);
                if outcome.quit {
                    info!(requester = %outcome.requester, "operator quit, stopping");
                    quit_requested = true;
                }
            }
        }

        // --- Drain worker traffic since the last pass ---
        while let Ok(event) = events.try_recv() {
            handle_worker_event(world, launcher, &mut connections, event);
        }

        // --- Reap finished worker processes ---
        launcher.reap();

        // A quit still finishes this iteration's drain and reap first.
        if quit_requested {
            break EndReason::OperatorQuit;
        }

        // --- Check tick limit ---
        if config.max_ticks > 0 && world.ledger().tick() >= config.max_ticks {
            info!(max_ticks = config.max_ticks, "tick limit reached, stopping");
            break EndReason::MaxTicksReached;
        }

        // --- Sleep for tick interval ---
        if !tick_interval.is_zero() {
            tokio::time::sleep(tick_interval).await;
        }
    };

    EnvironmentResult {
        end_reason,
        final_status: world.status(),
        total_ticks: world.ledger().tick(),
    }
}

/// Apply one transport event to the world.
///
/// Replies are routed back through the connection the line arrived on;
/// a closed route only means that worker is already gone.
fn handle_worker_event(
    world: &mut World,
    launcher: &mut dyn Launcher,
    connections: &mut BTreeMap<ConnectionId, mpsc::UnboundedSender<String>>,
    event: WorkerEvent,
) {
    match event {
        WorkerEvent::Connected { conn, replies } => {
            debug!(%conn, "worker connection registered");
            connections.insert(conn, replies);
        }
        WorkerEvent::Line { conn, line } => {
            let reply = world.dispatch_line(launcher, &line);
            let Some(route) = connections.get(&conn) else {
                warn!(%conn, "no reply route for connection, dropping reply");
                return;
            };
            if route.send(reply.to_string()).is_err() {
                debug!(%conn, "worker reply route closed");
            }
        }
        WorkerEvent::Disconnected { conn } => {
            debug!(%conn, "worker connection dropped");
            connections.remove(&conn);
        }
    }
}

/// Log the end-of-run summary.
pub fn log_environment_end(result: &EnvironmentResult) {
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        "Environment ended"
    );

    if result.total_ticks == 0 {
        warn!("environment stopped before completing a tick");
    } else {
        info!(status = %result.final_status, "Final ledger");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
    use tokio::net::TcpStream;
    use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
    use veldt_core::config::EcologyConfig;
    use veldt_core::{StubLauncher, control_channel};
    use veldt_types::{AgentKind, ControlAction, WorkerId};

    use crate::server::WorkerServer;

    use super::*;

    fn fast_config(max_ticks: u64) -> SimulationConfig {
        SimulationConfig {
            tick_interval_ms: 0,
            max_ticks,
            shutdown_timeout_secs: 1,
        }
    }

    async fn round_trip(
        lines: &mut Lines<BufReader<OwnedReadHalf>>,
        writer: &mut OwnedWriteHalf,
        request: &str,
    ) -> String {
        writer.write_all(request.as_bytes()).await.unwrap();
        writer.write_all(b"\n").await.unwrap();
        lines.next_line().await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn quit_requests_stop_the_loop() {
        let mut world = World::new(&EcologyConfig::default());
        let mut launcher = StubLauncher::new();
        let (_events_tx, mut events_rx) = mpsc::unbounded_channel();
        let (handle, mut control) = control_channel();
        let interrupt = Arc::new(AtomicBool::new(false));

        let mut client = handle.attach();
        client.submit(&ControlAction::Quit);

        let result = run_environment(
            &fast_config(50),
            &mut world,
            &mut launcher,
            &mut events_rx,
            &mut control,
            &interrupt,
        )
        .await;

        assert_eq!(result.end_reason, EndReason::OperatorQuit);
        assert_eq!(result.total_ticks, 1);
        assert_eq!(client.reply().await.as_deref(), Some("OK quitting"));
    }

    #[tokio::test]
    async fn the_tick_limit_bounds_the_run() {
        let mut world = World::new(&EcologyConfig::default());
        let mut launcher = StubLauncher::new();
        let (_events_tx, mut events_rx) = mpsc::unbounded_channel();
        let (_handle, mut control) = control_channel();
        let interrupt = Arc::new(AtomicBool::new(false));

        let result = run_environment(
            &fast_config(3),
            &mut world,
            &mut launcher,
            &mut events_rx,
            &mut control,
            &interrupt,
        )
        .await;

        assert_eq!(result.end_reason, EndReason::MaxTicksReached);
        assert_eq!(result.total_ticks, 3);
        assert_eq!(result.final_status.tick, 3);
    }

    #[tokio::test]
    async fn worker_lines_are_dispatched_and_answered() {
        let mut world = World::new(&EcologyConfig::default());
        let mut launcher = StubLauncher::new();
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let (_handle, mut control) = control_channel();
        let interrupt = Arc::new(AtomicBool::new(false));

        let (reply_tx, mut reply_rx) = mpsc::unbounded_channel();
        let conn = ConnectionId::from_raw(0);
        events_tx
            .send(WorkerEvent::Connected {
                conn,
                replies: reply_tx,
            })
            .unwrap();
        events_tx
            .send(WorkerEvent::Line {
                conn,
                line: String::from("JOIN PREY 21"),
            })
            .unwrap();

        let result = run_environment(
            &fast_config(1),
            &mut world,
            &mut launcher,
            &mut events_rx,
            &mut control,
            &interrupt,
        )
        .await;

        assert_eq!(result.end_reason, EndReason::MaxTicksReached);
        assert_eq!(reply_rx.recv().await.as_deref(), Some("OK JOIN"));
        assert_eq!(world.registry().alive_count(AgentKind::Prey), 1);
    }

    #[tokio::test]
    async fn a_pending_interrupt_stops_before_the_first_tick() {
        let mut world = World::new(&EcologyConfig::default());
        let mut launcher = StubLauncher::new();
        let (_events_tx, mut events_rx) = mpsc::unbounded_channel();
        let (_handle, mut control) = control_channel();
        let interrupt = Arc::new(AtomicBool::new(true));

        let result = run_environment(
            &fast_config(50),
            &mut world,
            &mut launcher,
            &mut events_rx,
            &mut control,
            &interrupt,
        )
        .await;

        assert_eq!(result.end_reason, EndReason::Interrupted);
        assert_eq!(result.total_ticks, 0);
    }

    #[tokio::test]
    async fn a_worker_lives_and_dies_over_a_real_socket() {
        let ecology = EcologyConfig {
            initial_grass: 100,
            grass_growth: 0,
            grass_unit: 10,
            drought: false,
        };
        let mut world = World::new(&ecology);
        let mut launcher = StubLauncher::new();
        let (event_tx, mut events_rx) = mpsc::unbounded_channel();
        let (handle, mut control) = control_channel();
        let interrupt = Arc::new(AtomicBool::new(false));

        let server = WorkerServer::bind("127.0.0.1:0", event_tx).await.unwrap();
        let endpoint = server.local_addr().unwrap();
        let server_task = tokio::spawn(server.run());

        let mut operator = handle.attach();
        let worker = tokio::spawn(async move {
            let stream = TcpStream::connect(endpoint).await.unwrap();
            let (reader, mut writer) = stream.into_split();
            let mut lines = BufReader::new(reader).lines();

            assert_eq!(
                round_trip(&mut lines, &mut writer, "JOIN PREY 21").await,
                "OK JOIN"
            );
            assert_eq!(
                round_trip(&mut lines, &mut writer, "FEED PREY 21").await,
                "OK FEED GRASS"
            );
            let err = round_trip(&mut lines, &mut writer, "FEED").await;
            assert!(err.starts_with("ERR "));
            assert_eq!(
                round_trip(&mut lines, &mut writer, "DIE PREY 21").await,
                "OK DIE"
            );

            operator.submit(&ControlAction::Status);
            let status = operator.reply().await.unwrap();
            assert!(status.ends_with("predators=0 preys=0 grass=90 drought=false"));
            operator.submit(&ControlAction::Quit);
            assert_eq!(operator.reply().await.as_deref(), Some("OK quitting"));
        });

        // A nonzero interval so the loop yields to the transport tasks.
        let config = SimulationConfig {
            tick_interval_ms: 1,
            max_ticks: 0,
            shutdown_timeout_secs: 1,
        };
        let result = run_environment(
            &config,
            &mut world,
            &mut launcher,
            &mut events_rx,
            &mut control,
            &interrupt,
        )
        .await;

        worker.await.unwrap();
        server_task.abort();

        assert_eq!(result.end_reason, EndReason::OperatorQuit);
        assert_eq!(world.status().grass, 90);
        assert_eq!(world.status().preys, 0);
        assert_eq!(launcher.terminated(), [WorkerId::from_raw(21)]);
    }

    #[tokio::test]
    async fn disconnects_forget_the_reply_route() {
        let mut world = World::new(&EcologyConfig::default());
        let mut launcher = StubLauncher::new();
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let (_handle, mut control) = control_channel();
        let interrupt = Arc::new(AtomicBool::new(false));

        let (reply_tx, mut reply_rx) = mpsc::unbounded_channel();
        let conn = ConnectionId::from_raw(4);
        events_tx
            .send(WorkerEvent::Connected {
                conn,
                replies: reply_tx,
            })
            .unwrap();
        events_tx.send(WorkerEvent::Disconnected { conn }).unwrap();
        events_tx
            .send(WorkerEvent::Line {
                conn,
                line: String::from("JOIN PREY 9"),
            })
            .unwrap();

        let result = run_environment(
            &fast_config(1),
            &mut world,
            &mut launcher,
            &mut events_rx,
            &mut control,
            &interrupt,
        )
        .await;

        // The line still dispatched; only the reply had nowhere to go.
        assert_eq!(result.end_reason, EndReason::MaxTicksReached);
        assert_eq!(world.registry().alive_count(AgentKind::Prey), 1);
        assert!(reply_rx.recv().await.is_none());
    }
}
