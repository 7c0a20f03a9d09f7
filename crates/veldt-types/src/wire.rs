//! Wire grammar for the worker protocol and the control channel.
//!
//! Workers speak newline-terminated UTF-8 lines of the form
//! `<COMMAND> <KIND> <IDENTIFIER>`; the environment answers each line with
//! exactly one line of the form `OK <detail>`, `NO <reason>`, or
//! `ERR <message>`. The administrative control channel carries lines of the
//! form `<requesterId> <ACTION>`.
//!
//! This module owns parsing and rendering of those lines. It performs no
//! I/O and holds no state: both endpoints build on the same grammar so the
//! two sides can never drift apart.

use crate::enums::AgentKind;
use crate::ids::{RequesterId, WorkerId};

/// Ways a worker protocol line can fail to parse.
///
/// The rendered message doubles as the payload of the `ERR` reply sent back
/// to the offending worker, so the texts stay short and single-line.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WireError {
    /// The line did not split into exactly three tokens.
    #[error("expected 3 tokens, got {found}")]
    TokenCount {
        /// How many whitespace-separated tokens the line held.
        found: usize,
    },

    /// The first token was not one of `JOIN`, `FEED`, `REPRO`, `DIE`.
    #[error("unknown command {token}")]
    UnknownCommand {
        /// The rejected command token.
        token: String,
    },

    /// The second token was not `PREY` or `PREDATOR`.
    #[error("unknown kind {token}")]
    UnknownKind {
        /// The rejected kind token.
        token: String,
    },

    /// The third token was not a positive integer.
    #[error("bad identifier {token}")]
    InvalidIdentifier {
        /// The rejected identifier token.
        token: String,
    },

    /// A reply line matched none of the known reply forms.
    #[error("unrecognized reply {line}")]
    UnknownReply {
        /// The line that could not be interpreted.
        line: String,
    },
}

/// One parsed worker request.
///
/// Every command carries the kind and identifier the worker declared for
/// itself; the environment trusts the declaration and performs no
/// authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `JOIN <KIND> <ID>`: register this worker in the environment.
    Join {
        /// Declared kind.
        kind: AgentKind,
        /// Declared identifier (the worker's own pid).
        id: WorkerId,
    },
    /// `FEED <KIND> <ID>`: prey graze one grass unit; predators hunt one
    /// live prey.
    Feed {
        /// Declared kind.
        kind: AgentKind,
        /// Declared identifier.
        id: WorkerId,
    },
    /// `REPRO <KIND> <ID>`: enter the reproduction rendezvous for the kind.
    Repro {
        /// Declared kind.
        kind: AgentKind,
        /// Declared identifier.
        id: WorkerId,
    },
    /// `DIE <KIND> <ID>`: announce this worker's death.
    Die {
        /// Declared kind.
        kind: AgentKind,
        /// Declared identifier.
        id: WorkerId,
    },
}

impl Command {
    /// Parse one protocol line.
    ///
    /// Tokens are separated by runs of whitespace and validated in reading
    /// order: token count, then command, then kind, then identifier. The
    /// identifier must be a positive integer (zero is rejected).
    pub fn parse(line: &str) -> Result<Self, WireError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let [verb_tok, kind_tok, id_tok] = tokens.as_slice() else {
            return Err(WireError::TokenCount {
                found: tokens.len(),
            });
        };

        let verb = *verb_tok;
        if !matches!(verb, "JOIN" | "FEED" | "REPRO" | "DIE") {
            return Err(WireError::UnknownCommand {
                token: verb.to_owned(),
            });
        }

        let kind = AgentKind::from_token(kind_tok).ok_or_else(|| WireError::UnknownKind {
            token: (*kind_tok).to_owned(),
        })?;
        let id = parse_identifier(id_tok)?;

        Ok(match verb {
            "JOIN" => Self::Join { kind, id },
            "FEED" => Self::Feed { kind, id },
            "REPRO" => Self::Repro { kind, id },
            _ => Self::Die { kind, id },
        })
    }

    /// The upper-case command token.
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::Join { .. } => "JOIN",
            Self::Feed { .. } => "FEED",
            Self::Repro { .. } => "REPRO",
            Self::Die { .. } => "DIE",
        }
    }

    /// The kind the worker declared.
    pub const fn kind(&self) -> AgentKind {
        match self {
            Self::Join { kind, .. }
            | Self::Feed { kind, .. }
            | Self::Repro { kind, .. }
            | Self::Die { kind, .. } => *kind,
        }
    }

    /// The identifier the worker declared.
    pub const fn id(&self) -> WorkerId {
        match self {
            Self::Join { id, .. }
            | Self::Feed { id, .. }
            | Self::Repro { id, .. }
            | Self::Die { id, .. } => *id,
        }
    }
}

impl core::fmt::Display for Command {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} {} {}", self.verb(), self.kind(), self.id())
    }
}

/// Parse the identifier token: a positive decimal integer.
fn parse_identifier(token: &str) -> Result<WorkerId, WireError> {
    token
        .parse::<u32>()
        .ok()
        .filter(|&raw| raw > 0)
        .map(WorkerId::from_raw)
        .ok_or_else(|| WireError::InvalidIdentifier {
            token: token.to_owned(),
        })
}

/// One reply line from the environment to a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `OK JOIN`: registration accepted.
    OkJoin,
    /// `OK FEED GRASS`: one grass unit consumed.
    OkFeedGrass,
    /// `OK FEED PREY`: one live prey consumed.
    OkFeedPrey,
    /// `OK REPRO BIRTH`: the rendezvous completed; a newborn was requested.
    OkReproBirth,
    /// `OK REPRO WAITING`: queued until a second requester of the kind
    /// arrives.
    OkReproWaiting,
    /// `OK DIE`: death acknowledged (idempotent).
    OkDie,
    /// `NO NO_GRASS`: the grass stock is below one consumption unit.
    NoGrass,
    /// `NO NO_PREY`: no live prey left to hunt.
    NoPrey,
    /// `ERR <message>`: the request line was malformed; nothing changed.
    Error {
        /// Short single-line reason echoed to the sender.
        message: String,
    },
}

impl Reply {
    /// Whether this reply reports success (`OK ...`).
    ///
    /// Workers gate their energy gain on this: a `NO` or `ERR` reply to a
    /// FEED earns nothing.
    pub const fn is_ok(&self) -> bool {
        !matches!(self, Self::NoGrass | Self::NoPrey | Self::Error { .. })
    }

    /// Parse one reply line (the worker side of the protocol).
    pub fn parse(line: &str) -> Result<Self, WireError> {
        let trimmed = line.trim();
        match trimmed {
            "OK JOIN" => Ok(Self::OkJoin),
            "OK FEED GRASS" => Ok(Self::OkFeedGrass),
            "OK FEED PREY" => Ok(Self::OkFeedPrey),
            "OK REPRO BIRTH" => Ok(Self::OkReproBirth),
            "OK REPRO WAITING" => Ok(Self::OkReproWaiting),
            "OK DIE" => Ok(Self::OkDie),
            "NO NO_GRASS" => Ok(Self::NoGrass),
            "NO NO_PREY" => Ok(Self::NoPrey),
            other => other
                .strip_prefix("ERR ")
                .map(|message| Self::Error {
                    message: message.to_owned(),
                })
                .ok_or_else(|| WireError::UnknownReply {
                    line: other.to_owned(),
                }),
        }
    }
}

impl core::fmt::Display for Reply {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::OkJoin => f.write_str("OK JOIN"),
            Self::OkFeedGrass => f.write_str("OK FEED GRASS"),
            Self::OkFeedPrey => f.write_str("OK FEED PREY"),
            Self::OkReproBirth => f.write_str("OK REPRO BIRTH"),
            Self::OkReproWaiting => f.write_str("OK REPRO WAITING"),
            Self::OkDie => f.write_str("OK DIE"),
            Self::NoGrass => f.write_str("NO NO_GRASS"),
            Self::NoPrey => f.write_str("NO NO_PREY"),
            Self::Error { message } => write!(f, "ERR {message}"),
        }
    }
}

impl From<WireError> for Reply {
    fn from(err: WireError) -> Self {
        Self::Error {
            message: err.to_string(),
        }
    }
}

/// Ways a control-channel line can fail to parse.
///
/// Unlike worker protocol errors these are never answered, since a request
/// with no usable reply address has nowhere to send the error. The
/// environment logs and drops them.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ControlParseError {
    /// The line held no action after the requester id.
    #[error("bad control request format: {line}")]
    MissingAction {
        /// The offending line.
        line: String,
    },

    /// The requester id was not a decimal integer.
    #[error("bad requester id: {token}")]
    BadRequester {
        /// The rejected requester token.
        token: String,
    },
}

/// One administrative action requested over the control channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlAction {
    /// Ask for a one-line snapshot of the resource ledger.
    Status,
    /// Stop the environment after the current tick's cleanup.
    Quit,
    /// Spawn one prey worker immediately, bypassing the rendezvous.
    AddPrey,
    /// Spawn one predator worker immediately, bypassing the rendezvous.
    AddPredator,
    /// Anything else; carries the upper-cased token for the error echo.
    Unknown(String),
}

impl ControlAction {
    /// Interpret an action token. Matching is case-insensitive: the token
    /// is upper-cased first, and an unrecognized action keeps its
    /// upper-cased form for the `ERR unknown action <ACTION>` reply.
    pub fn from_token(token: &str) -> Self {
        let upper = token.to_ascii_uppercase();
        match upper.as_str() {
            "STATUS" => Self::Status,
            "QUIT" => Self::Quit,
            "ADD_PREY" => Self::AddPrey,
            "ADD_PREDATOR" => Self::AddPredator,
            _ => Self::Unknown(upper),
        }
    }
}

impl core::fmt::Display for ControlAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Status => f.write_str("STATUS"),
            Self::Quit => f.write_str("QUIT"),
            Self::AddPrey => f.write_str("ADD_PREY"),
            Self::AddPredator => f.write_str("ADD_PREDATOR"),
            Self::Unknown(token) => f.write_str(token),
        }
    }
}

/// One parsed control-channel request: a reply address plus an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlRequest {
    /// Where the reply is routed.
    pub requester: RequesterId,
    /// What the requester asked for.
    pub action: ControlAction,
}

impl ControlRequest {
    /// Parse a `<requesterId> <ACTION>` line.
    ///
    /// The action is everything after the first token, trimmed, so a
    /// multi-word unknown action is echoed back whole.
    pub fn parse(line: &str) -> Result<Self, ControlParseError> {
        let trimmed = line.trim();
        let Some((requester_tok, rest)) = trimmed.split_once(char::is_whitespace) else {
            return Err(ControlParseError::MissingAction {
                line: trimmed.to_owned(),
            });
        };

        let raw = requester_tok
            .parse::<u32>()
            .ok()
            .ok_or_else(|| ControlParseError::BadRequester {
                token: requester_tok.to_owned(),
            })?;

        Ok(Self {
            requester: RequesterId::from_raw(raw),
            action: ControlAction::from_token(rest.trim()),
        })
    }
}

impl core::fmt::Display for ControlRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} {}", self.requester, self.action)
    }
}
