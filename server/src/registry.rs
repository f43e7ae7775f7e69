//! Connection registry for the lobby phase of the server
//!
//! This module accepts inbound TCP connections and wires each one up to the
//! rest of the server:
//! - One reader task per connection decodes frames into [`Command`]s and
//!   pushes them onto the shared event queue
//! - One writer task per connection drains an outbound channel of
//!   [`ServerMessage`]s and frames them onto the socket
//! - The registry records every connection in accept order; that order is
//!   the seat order of the game
//!
//! Connections are only ever appended while the lobby is open. Once the host
//! closes the lobby the accept loop stops and the recorded connections are
//! handed to the game.

use crate::queue::{Command, ConnectionId, EventSender};
use log::{debug, error, info, warn};
use shared::framing::{recv_text, send_message};
use shared::{
    LobbyError, NetError, ProtocolError, Request, ServerMessage, TransportError, MAX_PLAYERS,
    MIN_PLAYERS,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;

/// Sending half of a connection's outbound queue.
pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

/// A registered client connection and the tasks serving it
#[derive(Debug)]
pub struct Connection {
    /// Seat index, assigned in accept order starting at 0
    pub id: ConnectionId,
    /// Peer address, kept for logging
    pub addr: SocketAddr,
    outbox: Outbox,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl Connection {
    /// Spawns the reader and writer tasks for one connection
    ///
    /// When the reader stops, for whatever reason, it enqueues a
    /// `Disconnect` for this seat and tells the writer to shut the socket.
    /// A failed write stops the reader the same way.
    fn spawn<R, W>(
        id: ConnectionId,
        addr: SocketAddr,
        read_half: R,
        write_half: W,
        events: EventSender,
    ) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (outbox, outbound) = mpsc::unbounded_channel();
        let (closed_tx, closed_rx) = oneshot::channel();
        let (failed_tx, failed_rx) = oneshot::channel();

        let reader = tokio::spawn(async move {
            tokio::select! {
                _ = read_loop(id, read_half, &events) => {}
                Ok(()) = failed_rx => {
                    warn!("Dropping connection {} after a failed write", id);
                }
            }
            events.push(Command::new(id, Request::Disconnect));
            let _ = closed_tx.send(());
        });
        let writer = tokio::spawn(write_loop(id, write_half, outbound, closed_rx, failed_tx));

        Self {
            id,
            addr,
            outbox,
            reader,
            writer,
        }
    }

    /// Returns a handle for queueing messages to this client
    pub fn outbox(&self) -> Outbox {
        self.outbox.clone()
    }

    /// Stops reading and waits for queued outbound messages to be written
    ///
    /// The writer finishes once every other outbox clone has been dropped,
    /// so call this after the game loop has ended.
    pub async fn finish(self) {
        drop(self.outbox);
        if let Err(e) = self.writer.await {
            error!("Writer task for connection {} failed: {}", self.id, e);
        }
        self.reader.abort();
    }
}

/// Decodes text frames into commands until the peer leaves or misbehaves
async fn read_loop<R>(id: ConnectionId, mut reader: R, events: &EventSender)
where
    R: AsyncRead + Unpin,
{
    loop {
        let text = match recv_text(&mut reader).await {
            Ok(text) => text,
            Err(NetError::Disconnected) => {
                info!("Connection {} closed by peer", id);
                return;
            }
            Err(e) => {
                warn!("Closing connection {}: {}", id, e);
                return;
            }
        };

        match text.parse::<Request>() {
            Ok(Request::Disconnect) => {
                info!("Connection {} disconnected", id);
                return;
            }
            Ok(request) => {
                debug!("Connection {} sent {}", id, request);
                if !events.push(Command::new(id, request)) {
                    return;
                }
            }
            Err(ProtocolError::UnknownCommand(kind)) => {
                warn!("Ignoring unknown command {:?} from connection {}", kind, id);
            }
            Err(e) => {
                warn!("Closing connection {}: {}", id, e);
                return;
            }
        }
    }
}

/// Frames outbound messages until the outbox closes or the reader stops
///
/// On a write error `failed` is signalled so the reader stops too.
async fn write_loop<W>(
    id: ConnectionId,
    mut writer: W,
    mut outbound: mpsc::UnboundedReceiver<ServerMessage>,
    mut closed: oneshot::Receiver<()>,
    failed: oneshot::Sender<()>,
) where
    W: AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            message = outbound.recv() => {
                let Some(message) = message else { break };
                if let Err(e) = send_message(&mut writer, &message).await {
                    warn!("Failed to send to connection {}: {}", id, e);
                    let _ = failed.send(());
                    return;
                }
            }
            _ = &mut closed => break,
        }
    }
    let _ = writer.shutdown().await;
}

/// All connections accepted so far, in seat order
#[derive(Debug)]
pub struct ConnectionRegistry {
    connections: Vec<Connection>,
    max_players: usize,
}

impl ConnectionRegistry {
    /// Creates an empty registry that accepts up to `max_players` connections
    pub fn new(max_players: usize) -> Self {
        Self {
            connections: Vec::new(),
            max_players,
        }
    }

    /// Records a new connection and starts serving it
    ///
    /// Returns the assigned seat, or `None` when the registry is full; the
    /// stream is dropped (and so closed) in that case.
    pub fn register(
        &mut self,
        stream: TcpStream,
        addr: SocketAddr,
        events: &EventSender,
    ) -> Option<ConnectionId> {
        if self.connections.len() >= self.max_players {
            return None;
        }

        let id = self.connections.len();
        let (read_half, write_half) = stream.into_split();
        let connection = Connection::spawn(id, addr, read_half, write_half, events.clone());
        info!("Player {} connected from {}", id, addr);
        self.connections.push(connection);
        Some(id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Lobby gate: a game may start only with `MIN_PLAYERS..=MAX_PLAYERS`
    /// connections
    pub fn check_ready(&self) -> Result<(), LobbyError> {
        let have = self.connections.len();
        if have < MIN_PLAYERS {
            return Err(LobbyError::NotEnoughPlayers {
                have,
                min: MIN_PLAYERS,
            });
        }
        if have > MAX_PLAYERS {
            return Err(LobbyError::TooManyPlayers {
                have,
                max: MAX_PLAYERS,
            });
        }
        Ok(())
    }

    /// Hands every recorded connection over, leaving the registry empty
    pub fn drain(&mut self) -> Vec<Connection> {
        std::mem::take(&mut self.connections)
    }
}

/// An open lobby: a bound listener and the accept loop feeding the registry
pub struct Lobby {
    registry: Arc<RwLock<ConnectionRegistry>>,
    accept_task: JoinHandle<()>,
    local_addr: SocketAddr,
}

/// Binds `addr` and starts accepting connections into a new lobby
///
/// `AddrInUse` means another host is already running and is reported as
/// [`TransportError::HostActive`].
pub async fn listen(
    addr: &str,
    max_players: usize,
    events: EventSender,
) -> Result<Lobby, TransportError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| TransportError::from_bind(addr, e))?;
    let local_addr = listener.local_addr()?;
    info!("Lobby listening on {}", local_addr);

    let registry = Arc::new(RwLock::new(ConnectionRegistry::new(max_players)));
    let accept_task = {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        let mut registry = registry.write().await;
                        if registry.register(stream, peer, &events).is_none() {
                            warn!("Lobby full, refusing {}", peer);
                        }
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                    }
                }
            }
        })
    };

    Ok(Lobby {
        registry,
        accept_task,
        local_addr,
    })
}

impl Lobby {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of connections accepted so far
    pub async fn player_count(&self) -> usize {
        self.registry.read().await.len()
    }

    /// Checks the lobby gate against the current connections
    pub async fn check_ready(&self) -> Result<(), LobbyError> {
        self.registry.read().await.check_ready()
    }

    /// Stops accepting and returns the connections in seat order
    pub async fn close(self) -> Vec<Connection> {
        self.accept_task.abort();
        let _ = self.accept_task.await;
        let mut registry = self.registry.write().await;
        if registry.is_empty() {
            warn!("Closing a lobby nobody joined");
        }
        let connections = registry.drain();
        info!("Lobby closed with {} players", connections.len());
        connections
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::EventQueue;
    use shared::framing::{recv_message, send_text};
    use std::io;
    use std::time::Duration;
    use tokio::time::timeout;
    use tokio_test::io::Builder;

    async fn wait_for_players(lobby: &Lobby, count: usize) {
        for _ in 0..200 {
            if lobby.player_count().await >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("lobby never reached {} players", count);
    }

    #[tokio::test]
    async fn test_connections_get_seats_in_accept_order() {
        let (sender, _queue) = EventQueue::new();
        let lobby = listen("127.0.0.1:0", MAX_PLAYERS, sender).await.unwrap();

        let _first = TcpStream::connect(lobby.local_addr()).await.unwrap();
        wait_for_players(&lobby, 1).await;
        let _second = TcpStream::connect(lobby.local_addr()).await.unwrap();
        wait_for_players(&lobby, 2).await;

        assert!(lobby.check_ready().await.is_ok());
        let connections = lobby.close().await;
        let seats: Vec<_> = connections.iter().map(|c| c.id).collect();
        assert_eq!(seats, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_lobby_gate_needs_two_players() {
        let (sender, _queue) = EventQueue::new();
        let lobby = listen("127.0.0.1:0", MAX_PLAYERS, sender).await.unwrap();
        let _only = TcpStream::connect(lobby.local_addr()).await.unwrap();
        wait_for_players(&lobby, 1).await;

        assert_eq!(
            lobby.check_ready().await,
            Err(LobbyError::NotEnoughPlayers { have: 1, min: 2 })
        );
    }

    #[tokio::test]
    async fn test_full_lobby_refuses_extra_connections() {
        let (sender, _queue) = EventQueue::new();
        let lobby = listen("127.0.0.1:0", 1, sender).await.unwrap();

        let _seated = TcpStream::connect(lobby.local_addr()).await.unwrap();
        wait_for_players(&lobby, 1).await;
        let mut refused = TcpStream::connect(lobby.local_addr()).await.unwrap();

        let result = timeout(Duration::from_secs(1), recv_text(&mut refused)).await;
        assert!(matches!(result, Ok(Err(NetError::Disconnected))));
        assert_eq!(lobby.player_count().await, 1);
    }

    #[tokio::test]
    async fn test_second_host_is_rejected() {
        let (sender, _queue) = EventQueue::new();
        let lobby = listen("127.0.0.1:0", MAX_PLAYERS, sender.clone()).await.unwrap();
        let addr = lobby.local_addr().to_string();

        let err = listen(&addr, MAX_PLAYERS, sender).await.err().unwrap();
        assert!(matches!(err, TransportError::HostActive { .. }));
    }

    #[tokio::test]
    async fn test_reader_enqueues_requests_in_order() {
        let (sender, mut queue) = EventQueue::new();
        let lobby = listen("127.0.0.1:0", MAX_PLAYERS, sender).await.unwrap();

        let mut client = TcpStream::connect(lobby.local_addr()).await.unwrap();
        send_text(&mut client, "give_deck").await.unwrap();
        send_text(&mut client, "shuffle_everything").await.unwrap();
        send_text(&mut client, "card_play 4").await.unwrap();
        send_text(&mut client, "!DISCONNECT").await.unwrap();

        let mut received = Vec::new();
        for _ in 0..3 {
            let command = timeout(Duration::from_secs(1), queue.next()).await.unwrap();
            received.push(command.unwrap());
        }
        assert_eq!(
            received,
            vec![
                Command::new(0, Request::GiveDeck),
                Command::new(0, Request::CardPlay(4)),
                Command::new(0, Request::Disconnect),
            ]
        );
    }

    #[tokio::test]
    async fn test_protocol_error_closes_only_that_connection() {
        let (sender, mut queue) = EventQueue::new();
        let lobby = listen("127.0.0.1:0", MAX_PLAYERS, sender).await.unwrap();

        let mut good = TcpStream::connect(lobby.local_addr()).await.unwrap();
        wait_for_players(&lobby, 1).await;
        let mut bad = TcpStream::connect(lobby.local_addr()).await.unwrap();
        wait_for_players(&lobby, 2).await;

        bad.write_all(&[b'x'; 64]).await.unwrap();
        let command = timeout(Duration::from_secs(1), queue.next()).await.unwrap();
        assert_eq!(command, Some(Command::new(1, Request::Disconnect)));
        let result = timeout(Duration::from_secs(1), recv_text(&mut bad)).await;
        assert!(matches!(result, Ok(Err(NetError::Disconnected))));

        send_text(&mut good, "give_plays").await.unwrap();
        let command = timeout(Duration::from_secs(1), queue.next()).await.unwrap();
        assert_eq!(command, Some(Command::new(0, Request::GivePlays)));

        let connections = lobby.close().await;
        connections[0].outbox().send(ServerMessage::Turn).unwrap();
        let message: ServerMessage = timeout(Duration::from_secs(1), recv_message(&mut good))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(message, ServerMessage::Turn);
    }

    #[tokio::test]
    async fn test_failed_write_queues_disconnect() {
        let (sender, mut queue) = EventQueue::new();
        // The peer never sends anything, so only the writer can end this.
        let (_peer, read_half) = tokio::io::duplex(64);
        let write_half = Builder::new()
            .write_error(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
            .build();
        let addr: SocketAddr = "127.0.0.1:9".parse().unwrap();
        let connection = Connection::spawn(3, addr, read_half, write_half, sender);

        connection.outbox().send(ServerMessage::Turn).unwrap();
        let command = timeout(Duration::from_secs(1), queue.next()).await.unwrap();
        assert_eq!(command, Some(Command::new(3, Request::Disconnect)));

        timeout(Duration::from_secs(1), connection.finish())
            .await
            .unwrap();
    }
}
