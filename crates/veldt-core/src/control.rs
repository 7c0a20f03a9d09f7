//! Administrative control channel.
//!
//! Operators talk to the environment out of band: requests of the form
//! `<requesterId> <ACTION>` arrive on a shared in-process queue, and the
//! reply is routed back to the requester's own mailbox using the
//! declared identifier as a response address. The orchestrator drains at
//! most one request per tick, so the channel never competes with worker
//! traffic.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, warn};
use veldt_types::{AgentKind, ControlAction, ControlRequest, RequesterId};

use crate::dispatch::{World, spawn_worker};
use crate::launcher::Launcher;

type Routes = Arc<Mutex<BTreeMap<RequesterId, mpsc::UnboundedSender<String>>>>;

/// Create a connected control channel.
///
/// The [`ControlHandle`] side is cloned into anything that wants to talk
/// to the environment; the [`ControlChannel`] side is owned by the
/// orchestrator, which polls it once per tick.
#[must_use]
pub fn control_channel() -> (ControlHandle, ControlChannel) {
    let (tx, rx) = mpsc::unbounded_channel();
    let routes: Routes = Arc::new(Mutex::new(BTreeMap::new()));
    let handle = ControlHandle {
        tx,
        routes: Arc::clone(&routes),
        next_requester: Arc::new(AtomicU32::new(1)),
    };
    let channel = ControlChannel { rx, routes };
    (handle, channel)
}

/// Cloneable entry point for administrative requesters.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    tx: mpsc::UnboundedSender<String>,
    routes: Routes,
    next_requester: Arc<AtomicU32>,
}

impl ControlHandle {
    /// Register a new requester and return its private client.
    #[must_use]
    pub fn attach(&self) -> ControlClient {
        let raw = self.next_requester.fetch_add(1, Ordering::Relaxed);
        let requester = RequesterId::from_raw(raw);
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        lock_routes(&self.routes).insert(requester, reply_tx);
        ControlClient {
            requester,
            tx: self.tx.clone(),
            routes: Arc::clone(&self.routes),
            replies: reply_rx,
        }
    }
}

/// One requester's private view of the control channel.
///
/// Dropping the client unregisters its reply route; replies that arrive
/// afterwards are dropped with a log line.
#[derive(Debug)]
pub struct ControlClient {
    requester: RequesterId,
    tx: mpsc::UnboundedSender<String>,
    routes: Routes,
    replies: mpsc::UnboundedReceiver<String>,
}

impl ControlClient {
    /// This client's response address.
    #[must_use]
    pub const fn requester(&self) -> RequesterId {
        self.requester
    }

    /// Submit one action to the environment.
    pub fn submit(&self, action: &ControlAction) {
        let line = format!("{} {action}", self.requester);
        if self.tx.send(line).is_err() {
            warn!(requester = %self.requester, "control channel closed");
        }
    }

    /// Await the next reply routed to this requester.
    pub async fn reply(&mut self) -> Option<String> {
        self.replies.recv().await
    }
}

impl Drop for ControlClient {
    fn drop(&mut self) {
        lock_routes(&self.routes).remove(&self.requester);
    }
}

/// The orchestrator's end: incoming requests and outgoing reply routes.
#[derive(Debug)]
pub struct ControlChannel {
    rx: mpsc::UnboundedReceiver<String>,
    routes: Routes,
}

impl ControlChannel {
    /// Take at most one pending request without blocking.
    pub fn poll(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }

    /// Route a reply line back to its requester.
    ///
    /// A reply for a requester that has since detached is dropped with a
    /// log line; nobody is waiting for it.
    pub fn respond(&self, requester: RequesterId, reply: &str) {
        let sent = lock_routes(&self.routes)
            .get(&requester)
            .is_some_and(|route| route.send(reply.to_owned()).is_ok());
        if sent {
            debug!(%requester, reply, "control reply routed");
        } else {
            warn!(%requester, reply, "control reply had no route");
        }
    }
}

fn lock_routes(
    routes: &Routes,
) -> MutexGuard<'_, BTreeMap<RequesterId, mpsc::UnboundedSender<String>>> {
    routes.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Outcome of servicing one control request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlOutcome {
    /// Where the reply should be routed.
    pub requester: RequesterId,
    /// The reply line.
    pub reply: String,
    /// Whether the environment should stop after this tick's cleanup.
    pub quit: bool,
}

/// Service one raw control line against the world.
///
/// Returns `None` for lines that do not parse; they are logged and
/// dropped without a reply, matching the queue's fire-and-forget shape.
pub fn handle_control(
    world: &World,
    launcher: &mut dyn Launcher,
    line: &str,
) -> Option<ControlOutcome> {
    let request = match ControlRequest::parse(line) {
        Ok(request) => request,
        Err(err) => {
            warn!(line, %err, "dropping malformed control request");
            return None;
        }
    };
    let requester = request.requester;
    let (reply, quit) = match request.action {
        ControlAction::Status => (world.status().to_string(), false),
        ControlAction::Quit => (String::from("OK quitting"), true),
        ControlAction::AddPrey => {
            spawn_worker(launcher, AgentKind::Prey);
            (String::from("OK adding prey"), false)
        }
        ControlAction::AddPredator => {
            spawn_worker(launcher, AgentKind::Predator);
            (String::from("OK adding predator"), false)
        }
        ControlAction::Unknown(action) => (format!("ERR unknown action {action}"), false),
    };
    Some(ControlOutcome {
        requester,
        reply,
        quit,
    })
}
