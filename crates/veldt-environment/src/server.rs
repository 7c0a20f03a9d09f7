//! TCP listener and per-connection plumbing for worker processes.
//!
//! Workers connect over plain TCP and speak one request per line. Each
//! accepted connection gets its own reader task that forwards incoming
//! lines to the single orchestrator queue; replies travel back through
//! a per-connection channel, so the tick loop never blocks on a slow
//! socket. A connection fault tears down that one worker's relay and
//! nothing else.

use std::fmt;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Identifier for one accepted worker connection.
///
/// Distinct from [`veldt_types::WorkerId`]: a worker only announces its
/// process identity inside its `JOIN` line, so the transport layer
/// tracks sockets by accept order instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wrap a raw accept-order counter value.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// An event forwarded from a connection task to the orchestrator.
#[derive(Debug)]
pub enum WorkerEvent {
    /// A worker connected and can receive replies through `replies`.
    Connected {
        /// The transport identity of the new connection.
        conn: ConnectionId,
        /// Sender for reply lines addressed to this worker.
        replies: mpsc::UnboundedSender<String>,
    },
    /// A worker sent one request line.
    Line {
        /// The connection the line arrived on.
        conn: ConnectionId,
        /// The raw line, delimiter stripped.
        line: String,
    },
    /// The connection closed or faulted.
    Disconnected {
        /// The connection that went away.
        conn: ConnectionId,
    },
}

/// Accepts worker connections and fans their lines into one queue.
#[derive(Debug)]
pub struct WorkerServer {
    listener: TcpListener,
    events: mpsc::UnboundedSender<WorkerEvent>,
}

impl WorkerServer {
    /// Bind the worker listener on `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when the address cannot be
    /// bound. This is the one transport fault the environment treats
    /// as fatal.
    pub async fn bind(
        endpoint: &str,
        events: mpsc::UnboundedSender<WorkerEvent>,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(endpoint).await?;
        info!(endpoint, "worker listener bound");
        Ok(Self { listener, events })
    }

    /// The address the listener actually bound.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when the local address cannot
    /// be read back from the socket.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the surrounding task is aborted.
    ///
    /// Each accepted socket gets its own relay task. Accept errors are
    /// logged and the loop keeps going.
    pub async fn run(self) {
        let mut next_conn: u64 = 0;
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    let conn = ConnectionId::from_raw(next_conn);
                    next_conn = next_conn.saturating_add(1);
                    debug!(%conn, %peer, "worker connected");
                    let events = self.events.clone();
                    tokio::spawn(async move {
                        serve_connection(conn, stream, &events).await;
                    });
                }
                Err(err) => {
                    warn!(error = %err, "failed to accept worker connection");
                }
            }
        }
    }
}

/// Drive one worker connection until it closes or faults.
///
/// Registers the connection with the orchestrator, then relays request
/// lines inward and reply lines outward. Whichever way the connection
/// ends, a [`WorkerEvent::Disconnected`] is delivered so the reply
/// route can be forgotten.
async fn serve_connection(
    conn: ConnectionId,
    stream: TcpStream,
    events: &mpsc::UnboundedSender<WorkerEvent>,
) {
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel();
    let connected = WorkerEvent::Connected {
        conn,
        replies: reply_tx,
    };
    if events.send(connected).is_err() {
        // Orchestrator already gone; nothing to serve.
        return;
    }

    if let Err(err) = connection_io(conn, stream, events, &mut reply_rx).await {
        debug!(%conn, error = %err, "worker connection faulted");
    }

    let _ = events.send(WorkerEvent::Disconnected { conn });
    debug!(%conn, "worker disconnected");
}

/// Relay lines both ways until EOF, I/O error, or reply-route drop.
async fn connection_io(
    conn: ConnectionId,
    stream: TcpStream,
    events: &mpsc::UnboundedSender<WorkerEvent>,
    replies: &mut mpsc::UnboundedReceiver<String>,
) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    loop {
        tokio::select! {
            read = lines.next_line() => {
                let Some(line) = read? else {
                    return Ok(());
                };
                if events.send(WorkerEvent::Line { conn, line }).is_err() {
                    return Ok(());
                }
            }
            reply = replies.recv() => {
                // A dropped route means the orchestrator is shutting
                // down, so stop serving.
                let Some(text) = reply else {
                    return Ok(());
                };
                writer.write_all(text.as_bytes()).await?;
                writer.write_all(b"\n").await?;
            }
        }
    }
}
