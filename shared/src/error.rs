//! Error taxonomy shared by the server and the client.

use crate::card::Card;
use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Socket-level failures: binding, connecting, reading or writing.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Another host already owns the address. Not worth retrying.
    #[error("a host is already active on {addr}")]
    HostActive { addr: String },

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("socket error: {0}")]
    Io(#[from] io::Error),
}

impl TransportError {
    /// Maps a bind failure, treating `AddrInUse` as a fatal "host active".
    pub fn from_bind(addr: &str, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::AddrInUse {
            TransportError::HostActive {
                addr: addr.to_string(),
            }
        } else {
            TransportError::Bind {
                addr: addr.to_string(),
                source,
            }
        }
    }

    /// Whether a fresh socket may be tried again after this failure.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, TransportError::HostActive { .. })
    }
}

/// The peer sent bytes that do not form a valid frame or message.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed length header {0:?}")]
    BadHeader(String),

    #[error("payload of {size} bytes exceeds limit of {max}")]
    Oversized { size: usize, max: usize },

    #[error("text payload is not valid UTF-8")]
    NotUtf8,

    #[error("payload codec failure: {0}")]
    Codec(#[from] bincode::Error),

    #[error("malformed card index {0:?}")]
    BadIndex(String),

    #[error("unknown command {0:?}")]
    UnknownCommand(String),
}

/// Framing-level result: the peer went away, the socket failed, or the bytes
/// were wrong.
#[derive(Debug, Error)]
pub enum NetError {
    #[error("peer disconnected")]
    Disconnected,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl From<io::Error> for NetError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => NetError::Disconnected,
            _ => NetError::Transport(TransportError::Io(err)),
        }
    }
}

/// A request the rules refuse. Recovered locally: the game state is left
/// untouched and the offending client is told why.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleViolation {
    #[error("it is player {current}'s turn, not player {player}'s")]
    NotYourTurn { player: usize, current: usize },

    #[error("card index {index} is out of range for a deck of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("{card} cannot be played on {top}")]
    IllegalPlay { card: Card, top: Card },

    #[error("player {player} holds a playable card")]
    HasPlayableCard { player: usize },

    #[error("the game is already over")]
    GameOver,

    #[error("player {0} is not seated in this game")]
    UnknownPlayer(usize),
}

/// The lobby cannot start a game with the current connections.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LobbyError {
    #[error("need at least {min} players to start, have {have}")]
    NotEnoughPlayers { have: usize, min: usize },

    #[error("at most {max} players may join, have {have}")]
    TooManyPlayers { have: usize, max: usize },
}
