//! Server orchestration: lobby, dealing, and the game loop

use crate::game::{GameConfig, GameState};
use crate::game_loop::GameLoop;
use crate::queue::EventQueue;
use crate::registry::{self, Connection, Lobby};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{LobbyError, TransportError, DEFAULT_PORT, MAX_PLAYERS, MIN_PLAYERS};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

/// Shortest lobby poll period the host will use.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind, e.g. `0.0.0.0:5050`
    pub addr: String,
    /// Players to wait for before dealing; clamped to the lobby bounds
    pub players: usize,
    /// Shuffle seed; a fresh entropy seed when absent
    pub seed: Option<u64>,
    pub game: GameConfig,
    /// How often the host re-checks the lobby
    pub poll_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: format!("127.0.0.1:{}", DEFAULT_PORT),
            players: MIN_PLAYERS,
            seed: None,
            game: GameConfig::default(),
            poll_interval: Duration::from_millis(250),
        }
    }
}

/// A bound server that has not started its game yet
pub struct Server {
    lobby: Lobby,
    events: EventQueue,
    config: ServerConfig,
}

impl Server {
    /// Binds the listener and opens the lobby
    pub async fn new(config: ServerConfig) -> Result<Self, TransportError> {
        let (sender, events) = EventQueue::new();
        let lobby = registry::listen(&config.addr, MAX_PLAYERS, sender).await?;
        Ok(Server {
            lobby,
            events,
            config,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.lobby.local_addr()
    }

    /// Waits for the lobby to fill, deals, and plays the game to the end.
    /// Returns the winning seat, if the game produced one.
    pub async fn run(self) -> Result<Option<usize>, LobbyError> {
        let wanted = self.config.players.clamp(MIN_PLAYERS, MAX_PLAYERS);
        info!("Waiting for {} players", wanted);

        // `interval` rejects a zero period.
        let mut poll = interval(self.config.poll_interval.max(MIN_POLL_INTERVAL));
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            poll.tick().await;
            let count = self.lobby.player_count().await;
            if count >= wanted {
                break;
            }
            debug!("Lobby has {}/{} players", count, wanted);
        }

        self.lobby.check_ready().await?;
        let connections = self.lobby.close().await;

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let state = GameState::start(connections.len(), &self.config.game, &mut rng)?;

        let outboxes = connections.iter().map(Connection::outbox).collect();
        let winner = GameLoop::new(state, outboxes, self.events).run().await;

        for connection in connections {
            connection.finish().await;
        }
        Ok(winner)
    }
}
