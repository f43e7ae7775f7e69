//! Client side of the UNO protocol.
//!
//! [`Client`] wraps a stream to the server and exposes one method per request.
//! Turn notifications can arrive at any time, including between a request
//! and its reply; they are kept in a backlog and handed out in arrival order
//! by [`Client::next_message`].

use log::{info, warn};
use shared::framing::{recv_message, send_text};
use shared::{Card, NetError, Request, ServerMessage, TransportError};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpSocket, TcpStream};
use tokio::time::sleep;

/// How often, and how patiently, to try reaching the server.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 50,
            delay: Duration::from_millis(200),
        }
    }
}

pub struct Client<S = TcpStream> {
    stream: S,
    backlog: VecDeque<ServerMessage>,
}

impl Client<TcpStream> {
    /// Connects to `addr`, retrying per `retry`. Every attempt uses a new
    /// socket: connecting consumes it, so a failed one is simply dropped.
    pub async fn connect(addr: SocketAddr, retry: RetryPolicy) -> Result<Self, TransportError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let socket = if addr.is_ipv4() {
                TcpSocket::new_v4()?
            } else {
                TcpSocket::new_v6()?
            };

            match socket.connect(addr).await {
                Ok(stream) => {
                    info!("Connected to {} on attempt {}", addr, attempt);
                    return Ok(Self::from_stream(stream));
                }
                Err(source) if attempt >= retry.attempts.max(1) => {
                    return Err(TransportError::Connect { addr, source });
                }
                Err(e) => {
                    warn!("Connect attempt {} to {} failed: {}", attempt, addr, e);
                    sleep(retry.delay).await;
                }
            }
        }
    }
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn from_stream(stream: S) -> Self {
        Self {
            stream,
            backlog: VecDeque::new(),
        }
    }

    async fn send(&mut self, request: Request) -> Result<(), NetError> {
        send_text(&mut self.stream, &request.to_string()).await
    }

    /// Next pushed message: backlog first, then the socket.
    pub async fn next_message(&mut self) -> Result<ServerMessage, NetError> {
        if let Some(message) = self.backlog.pop_front() {
            return Ok(message);
        }
        recv_message(&mut self.stream).await
    }

    /// Reads until `extract` accepts a message, stashing everything else in
    /// the backlog.
    async fn await_reply<T, F>(&mut self, extract: F) -> Result<T, NetError>
    where
        F: Fn(&ServerMessage) -> Option<T>,
    {
        if let Some(at) = self.backlog.iter().position(|m| extract(m).is_some()) {
            if let Some(reply) = self.backlog.remove(at).as_ref().and_then(&extract) {
                return Ok(reply);
            }
        }
        loop {
            let message: ServerMessage = recv_message(&mut self.stream).await?;
            match extract(&message) {
                Some(reply) => return Ok(reply),
                None => self.backlog.push_back(message),
            }
        }
    }

    /// Whether this client holds the turn.
    ///
    /// The reply looks like a turn broadcast, so broadcasts already in the
    /// backlog are dropped first; the server's answer supersedes them.
    pub async fn first_turn(&mut self) -> Result<bool, NetError> {
        self.backlog
            .retain(|m| !matches!(m, ServerMessage::Turn | ServerMessage::NotTurn));
        self.send(Request::GiveFirstTurn).await?;
        self.await_reply(|m| match m {
            ServerMessage::Turn => Some(true),
            ServerMessage::NotTurn => Some(false),
            _ => None,
        })
        .await
    }

    pub async fn deck(&mut self) -> Result<Vec<Card>, NetError> {
        self.send(Request::GiveDeck).await?;
        self.await_reply(|m| match m {
            ServerMessage::Deck(cards) => Some(cards.clone()),
            _ => None,
        })
        .await
    }

    /// Indices into [`Client::deck`] that may be played now.
    pub async fn plays(&mut self) -> Result<Vec<usize>, NetError> {
        self.send(Request::GivePlays).await?;
        self.await_reply(|m| match m {
            ServerMessage::Plays(indices) => Some(indices.clone()),
            _ => None,
        })
        .await
    }

    /// Submits a play. A rejection arrives later as `Invalid`.
    pub async fn play(&mut self, index: usize) -> Result<(), NetError> {
        self.send(Request::CardPlay(index)).await
    }

    /// Reports that no card can be played; the server draws one.
    pub async fn no_playables(&mut self) -> Result<(), NetError> {
        self.send(Request::NoPlayables).await
    }

    /// Sends the disconnect sentinel and closes the stream.
    pub async fn disconnect(mut self) -> Result<(), NetError> {
        self.send(Request::Disconnect).await?;
        self.stream.shutdown().await?;
        Ok(())
    }
}
