//! Command vocabulary exchanged between clients and the server.
//!
//! Clients speak in text tokens; `card_play` carries its index in the same
//! frame so no second token has to be correlated with it. The server answers
//! with bincode-encoded [`ServerMessage`] frames.

use crate::card::Card;
use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Text a client sends to leave gracefully.
pub const DISCONNECT_MESSAGE: &str = "!DISCONNECT";

/// A client request, decoded from one text frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Asks whether the sender currently holds the turn.
    GiveFirstTurn,
    /// Asks for the sender's deck.
    GiveDeck,
    /// Asks for the indices of the sender's legal plays.
    GivePlays,
    /// Declares that the sender cannot play and must draw.
    NoPlayables,
    /// Plays the card at this index of the sender's deck.
    CardPlay(usize),
    /// The disconnect sentinel.
    Disconnect,
}

impl FromStr for Request {
    type Err = ProtocolError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut parts = text.split_whitespace();
        let kind = parts.next().unwrap_or("");

        let request = match kind {
            "give_first_turn" => Request::GiveFirstTurn,
            "give_deck" => Request::GiveDeck,
            "give_plays" => Request::GivePlays,
            "no_playables" => Request::NoPlayables,
            DISCONNECT_MESSAGE => Request::Disconnect,
            "card_play" => {
                let raw = parts.next().unwrap_or("");
                let index = raw
                    .parse::<usize>()
                    .map_err(|_| ProtocolError::BadIndex(raw.to_string()))?;
                Request::CardPlay(index)
            }
            other => return Err(ProtocolError::UnknownCommand(other.to_string())),
        };

        match parts.next() {
            None => Ok(request),
            Some(_) if matches!(request, Request::CardPlay(_)) => {
                Err(ProtocolError::BadIndex(text.to_string()))
            }
            Some(_) => Err(ProtocolError::UnknownCommand(text.to_string())),
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::GiveFirstTurn => f.write_str("give_first_turn"),
            Request::GiveDeck => f.write_str("give_deck"),
            Request::GivePlays => f.write_str("give_plays"),
            Request::NoPlayables => f.write_str("no_playables"),
            Request::CardPlay(index) => write!(f, "card_play {}", index),
            Request::Disconnect => f.write_str(DISCONNECT_MESSAGE),
        }
    }
}

/// Everything the server pushes to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// The receiver now holds the turn.
    Turn,
    /// Someone else holds the turn.
    NotTurn,
    Win,
    Lose,
    Deck(Vec<Card>),
    Plays(Vec<usize>),
    /// Cards that were just added to the receiver's deck.
    Drawn(Vec<Card>),
    /// The last request was rejected; state is unchanged.
    Invalid { reason: String },
}
