//! # UNO Game Server Library
//!
//! This library provides the authoritative server for the networked UNO card
//! game. It owns the one true copy of the game (draw pool, discard stack,
//! every player's deck, turn pointer and direction), applies the card rules,
//! and tells each connected client what it needs to know.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Rules
//! Every play is checked and applied here. Clients only submit requests;
//! an illegal or out-of-turn request is rejected and the client is told so,
//! with the game left exactly as it was.
//!
//! ### Lobby and Connections
//! Handles the lifecycle of client connections:
//! - Accepting connections while the lobby is open, in seat order
//! - One reader task per connection decoding framed requests
//! - One writer task per connection framing outbound messages
//! - Eliminating a player whose connection goes away mid-game
//!
//! ### Notifications
//! After every turn change the current player receives `turn` and everyone
//! else `not_turn`; when the game ends the winner receives `win` and the
//! rest `lose`.
//!
//! ## Architecture Design
//!
//! ### Single Owner of Game State
//! Reader tasks never touch the game. They push commands onto a FIFO event
//! queue, and a single game loop drains it and is the only code that mutates
//! the state. The queue is the only thing shared between tasks.
//!
//! ### Length-Prefixed TCP Framing
//! Every message is a 64-byte space-padded decimal length header followed by
//! the payload. Clients send text commands; the server answers with
//! bincode-encoded messages.
//!
//! ## Module Organization
//!
//! ### Registry Module (`registry`)
//! Listener, accept loop and per-connection reader/writer tasks.
//!
//! ### Queue Module (`queue`)
//! The multi-producer, single-consumer command queue.
//!
//! ### Game Module (`game`)
//! Game state, dealing, legal plays, turn order and card consequences.
//!
//! ### Game Loop Module (`game_loop`)
//! Drains the queue, applies commands, and sends notifications.
//!
//! ### Network Module (`network`)
//! Ties the pieces together: open the lobby, wait for players, deal, play.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig {
//!         addr: "0.0.0.0:5050".into(),
//!         players: 3,
//!         seed: Some(7),
//!         ..ServerConfig::default()
//!     };
//!
//!     // Binds the port, waits for three players, deals and plays the game.
//!     let server = Server::new(config).await?;
//!     let winner = server.run().await?;
//!     println!("winner: {:?}", winner);
//!
//!     Ok(())
//! }
//! ```

pub mod game;
pub mod game_loop;
pub mod network;
pub mod queue;
pub mod registry;
