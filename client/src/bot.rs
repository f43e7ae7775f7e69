//! A simple automatic player: on its turn it plays the first legal card, or
//! draws when it has none.

use crate::network::Client;
use log::{debug, info, warn};
use shared::{NetError, ServerMessage};
use tokio::io::{AsyncRead, AsyncWrite};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Won,
    Lost,
}

/// Plays until the server announces a result.
pub async fn play_game<S>(client: &mut Client<S>) -> Result<Outcome, NetError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let deck = client.deck().await?;
    info!("Dealt {} cards", deck.len());

    loop {
        match client.next_message().await? {
            ServerMessage::Turn => take_turn(client).await?,
            ServerMessage::NotTurn => debug!("Waiting for the other players"),
            ServerMessage::Drawn(cards) => {
                let names: Vec<String> = cards.iter().map(ToString::to_string).collect();
                info!("Drew {}", names.join(", "));
            }
            ServerMessage::Invalid { reason } => {
                warn!("Server rejected our move: {}", reason);
                if client.first_turn().await? {
                    take_turn(client).await?;
                }
            }
            ServerMessage::Win => return Ok(Outcome::Won),
            ServerMessage::Lose => return Ok(Outcome::Lost),
            other => debug!("Ignoring unsolicited {:?}", other),
        }
    }
}

async fn take_turn<S>(client: &mut Client<S>) -> Result<(), NetError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match client.plays().await?.first() {
        Some(&index) => {
            let deck = client.deck().await?;
            if let Some(card) = deck.get(index) {
                info!("Playing {}", card);
            }
            client.play(index).await
        }
        None => {
            info!("Nothing to play, drawing");
            client.no_playables().await
        }
    }
}
