//! Types and wire format shared by the UNO server and its clients.

pub mod card;
pub mod error;
pub mod framing;
pub mod protocol;

pub use card::{full_deck, is_valid_play, Card, Rank, Suit, DECK_SIZE};
pub use error::{LobbyError, NetError, ProtocolError, RuleViolation, TransportError};
pub use protocol::{Request, ServerMessage, DISCONNECT_MESSAGE};

pub const DEFAULT_PORT: u16 = 5050;
pub const START_CARDS: usize = 7;
pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 4;
