//! Line-oriented connection to the environment.
//!
//! The protocol is strictly request/reply from the worker's side: one
//! command line out, one reply line back. [`EnvironmentClient`] owns
//! the socket halves and keeps that pairing.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use veldt_types::{Command, Reply, WireError};

/// Ways an exchange with the environment can fail.
///
/// Any of these ends the worker: an animal whose environment is gone
/// has nothing left to do.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The socket failed.
    #[error("connection to environment failed: {0}")]
    Io(#[from] std::io::Error),

    /// The environment closed the connection.
    #[error("environment closed the connection")]
    Closed,

    /// The reply line did not parse.
    #[error("bad reply from environment: {0}")]
    Wire(#[from] WireError),
}

/// One worker's connection to the environment.
#[derive(Debug)]
pub struct EnvironmentClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl EnvironmentClient {
    /// Connect to the environment at `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] when the connection cannot be
    /// established.
    pub async fn connect(endpoint: &str) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(endpoint).await?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            lines: BufReader::new(reader).lines(),
            writer,
        })
    }

    /// Send one command and wait for the environment's reply line.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] on socket failure,
    /// [`ClientError::Closed`] when the environment hangs up, and
    /// [`ClientError::Wire`] when the reply line does not parse.
    pub async fn exchange(&mut self, command: Command) -> Result<Reply, ClientError> {
        self.writer.write_all(command.to_string().as_bytes()).await?;
        self.writer.write_all(b"\n").await?;

        let Some(line) = self.lines.next_line().await? else {
            return Err(ClientError::Closed);
        };
        Ok(Reply::parse(&line)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tokio::net::TcpListener;
    use veldt_types::{AgentKind, WorkerId};

    use super::*;

    #[tokio::test]
    async fn exchanges_one_line_per_command() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = listener.local_addr().unwrap().to_string();
        let environment = tokio::spawn(async move {
            let (stream, _peer) = listener.accept().await.unwrap();
            let (reader, mut writer) = stream.into_split();
            let mut lines = BufReader::new(reader).lines();
            let line = lines.next_line().await.unwrap().unwrap();
            assert_eq!(line, "JOIN PREY 7");
            writer.write_all(b"OK JOIN\n").await.unwrap();
        });

        let mut client = EnvironmentClient::connect(&endpoint).await.unwrap();
        let reply = client
            .exchange(Command::Join {
                kind: AgentKind::Prey,
                id: WorkerId::from_raw(7),
            })
            .await
            .unwrap();
        assert_eq!(reply, Reply::OkJoin);
        environment.await.unwrap();
    }

    #[tokio::test]
    async fn a_hangup_instead_of_a_reply_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = listener.local_addr().unwrap().to_string();
        let environment = tokio::spawn(async move {
            let (stream, _peer) = listener.accept().await.unwrap();
            let (reader, writer) = stream.into_split();
            let mut lines = BufReader::new(reader).lines();
            // Read the request, then hang up without answering.
            let _ = lines.next_line().await.unwrap();
            drop(writer);
            drop(lines);
        });

        let mut client = EnvironmentClient::connect(&endpoint).await.unwrap();
        let err = client
            .exchange(Command::Die {
                kind: AgentKind::Predator,
                id: WorkerId::from_raw(9),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Closed));
        environment.await.unwrap();
    }

    #[tokio::test]
    async fn garbled_replies_are_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = listener.local_addr().unwrap().to_string();
        let environment = tokio::spawn(async move {
            let (stream, _peer) = listener.accept().await.unwrap();
            let (reader, mut writer) = stream.into_split();
            let mut lines = BufReader::new(reader).lines();
            let _ = lines.next_line().await.unwrap();
            writer.write_all(b"MAYBE FEED\n").await.unwrap();
        });

        let mut client = EnvironmentClient::connect(&endpoint).await.unwrap();
        let err = client
            .exchange(Command::Feed {
                kind: AgentKind::Prey,
                id: WorkerId::from_raw(3),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Wire(_)));
        environment.await.unwrap();
    }
}
