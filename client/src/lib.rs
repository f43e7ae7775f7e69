//! # UNO Client Library
//!
//! Client side of the networked UNO game. The server owns the game; a client
//! only asks questions (whose turn, which cards, which are playable) and
//! submits moves, then reacts to what the server pushes back.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! Connection setup with retries, one method per request, and a backlog so
//! turn notifications that arrive in the middle of a request are not lost.
//!
//! ### Bot Module (`bot`)
//! An automatic player used by the `uno-client` binary.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::{Client, RetryPolicy};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let addr = "127.0.0.1:5050".parse()?;
//!     let mut client = Client::connect(addr, RetryPolicy::default()).await?;
//!
//!     let hand = client.deck().await?;
//!     if client.first_turn().await? {
//!         match client.plays().await?.first() {
//!             Some(&index) => client.play(index).await?,
//!             None => client.no_playables().await?,
//!         }
//!     }
//!     println!("holding {} cards", hand.len());
//!
//!     client.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod bot;
pub mod network;
