//! The game loop: sole owner and mutator of the [`GameState`].
//!
//! Commands are taken off the event queue one at a time, oldest first. Each
//! is either answered directly (deck, plays, turn queries) or applied to the
//! state, and the resulting [`GameEvent`]s are turned into notifications for
//! the affected connections.

use crate::game::{GameEvent, GameState};
use crate::queue::{Command, ConnectionId, EventQueue};
use crate::registry::Outbox;
use log::{debug, info, warn};
use shared::{Request, RuleViolation, ServerMessage};

pub struct GameLoop {
    state: GameState,
    /// Outbound queue per seat; `None` once the connection is gone.
    seats: Vec<Option<Outbox>>,
    events: EventQueue,
}

impl GameLoop {
    pub fn new(state: GameState, outboxes: Vec<Outbox>, events: EventQueue) -> Self {
        Self {
            state,
            seats: outboxes.into_iter().map(Some).collect(),
            events,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Runs until someone wins or every producer is gone. Returns the winner.
    pub async fn run(mut self) -> Option<usize> {
        info!("Game started with {} players", self.state.player_count());
        self.broadcast_turn(self.state.turn());

        while self.state.winner().is_none() {
            let Some(command) = self.events.next().await else {
                warn!("Event queue closed before the game ended");
                break;
            };
            self.handle_command(command);
        }

        if let Some(winner) = self.state.winner() {
            info!("Game over, player {} wins", winner);
            while let Some(Command { origin, request }) = self.events.try_next() {
                debug!("Discarding {} from player {} after the game ended", request, origin);
            }
        }
        self.state.winner()
    }

    /// Applies one command to the game.
    pub fn handle_command(&mut self, command: Command) {
        let Command { origin, request } = command;
        if origin >= self.seats.len() {
            warn!("Dropping {} from unknown connection {}", request, origin);
            return;
        }
        debug!("Player {} requested {}", origin, request);

        match request {
            Request::GiveFirstTurn => {
                let reply = if self.state.turn() == origin {
                    ServerMessage::Turn
                } else {
                    ServerMessage::NotTurn
                };
                self.send(origin, reply);
            }
            Request::GiveDeck => {
                let deck = self.state.deck(origin).unwrap_or_default().to_vec();
                self.send(origin, ServerMessage::Deck(deck));
            }
            Request::GivePlays => {
                let plays = self.state.legal_plays(origin);
                self.send(origin, ServerMessage::Plays(plays));
            }
            Request::NoPlayables => {
                let result = self.state.no_playables(origin);
                self.apply(origin, result);
            }
            Request::CardPlay(index) => {
                let result = self.state.play_card(origin, index);
                self.apply(origin, result);
            }
            Request::Disconnect => {
                self.seats[origin] = None;
                let events = self.state.eliminate(origin);
                self.dispatch(events);
            }
        }
    }

    fn apply(&mut self, origin: ConnectionId, result: Result<Vec<GameEvent>, RuleViolation>) {
        match result {
            Ok(events) => self.dispatch(events),
            Err(violation) => {
                info!("Rejected request from player {}: {}", origin, violation);
                self.send(
                    origin,
                    ServerMessage::Invalid {
                        reason: violation.to_string(),
                    },
                );
            }
        }
    }

    /// Turns game events into notifications.
    fn dispatch(&mut self, events: Vec<GameEvent>) {
        for event in events {
            match event {
                GameEvent::CardPlayed { player, card } => {
                    info!("Player {} played {}", player, card);
                }
                GameEvent::CardsDrawn { player, cards } => {
                    info!("Player {} drew {} card(s)", player, cards.len());
                    self.send(player, ServerMessage::Drawn(cards));
                }
                GameEvent::DirectionChanged { direction } => {
                    info!("Direction is now {:?}", direction);
                }
                GameEvent::TurnChanged { player } => {
                    self.broadcast_turn(player);
                }
                GameEvent::PlayerEliminated { player } => {
                    info!("Player {} left and is out of the game", player);
                }
                GameEvent::GameWon { player } => {
                    self.broadcast_result(player);
                }
            }
        }
    }

    /// `turn` to the current player, `not_turn` to everyone else.
    fn broadcast_turn(&mut self, current: usize) {
        for seat in 0..self.seats.len() {
            let message = if seat == current {
                ServerMessage::Turn
            } else {
                ServerMessage::NotTurn
            };
            self.send(seat, message);
        }
    }

    /// `win` to the winner, `lose` to everyone else.
    fn broadcast_result(&mut self, winner: usize) {
        for seat in 0..self.seats.len() {
            let message = if seat == winner {
                ServerMessage::Win
            } else {
                ServerMessage::Lose
            };
            self.send(seat, message);
        }
    }

    fn send(&mut self, seat: ConnectionId, message: ServerMessage) {
        let Some(outbox) = self.seats.get(seat).and_then(Option::as_ref) else {
            return;
        };
        if outbox.send(message).is_err() {
            debug!("Connection {} is gone, dropping its outbox", seat);
            self.seats[seat] = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Direction;
    use shared::{Card, Rank, Suit};
    use tokio::sync::mpsc;
    use tokio_test::{assert_err, assert_ok};

    fn red(n: u8) -> Card {
        Card::new(Suit::Red, Rank::Number(n))
    }

    fn green(n: u8) -> Card {
        Card::new(Suit::Green, Rank::Number(n))
    }

    struct Harness {
        game: GameLoop,
        inboxes: Vec<mpsc::UnboundedReceiver<ServerMessage>>,
    }

    impl Harness {
        fn new(state: GameState) -> (Self, crate::queue::EventSender) {
            let (sender, queue) = EventQueue::new();
            let (outboxes, inboxes): (Vec<_>, Vec<_>) = (0..state.player_count())
                .map(|_| mpsc::unbounded_channel())
                .unzip();
            let game = GameLoop::new(state, outboxes, queue);
            (Self { game, inboxes }, sender)
        }

        fn drain(&mut self, seat: usize) -> Vec<ServerMessage> {
            let mut messages = Vec::new();
            while let Ok(message) = self.inboxes[seat].try_recv() {
                messages.push(message);
            }
            messages
        }
    }

    fn two_player_state() -> GameState {
        GameState::from_parts(
            vec![green(0), green(1), green(2)],
            vec![red(5)],
            vec![vec![red(7), green(9)], vec![green(3), green(4)]],
            0,
            Direction::Forward,
        )
    }

    #[test]
    fn test_answers_queries() {
        let (mut h, _sender) = Harness::new(two_player_state());

        h.game.handle_command(Command::new(0, Request::GiveFirstTurn));
        h.game.handle_command(Command::new(1, Request::GiveFirstTurn));
        h.game.handle_command(Command::new(0, Request::GiveDeck));
        h.game.handle_command(Command::new(0, Request::GivePlays));
        h.game.handle_command(Command::new(1, Request::GivePlays));

        assert_eq!(
            h.drain(0),
            vec![
                ServerMessage::Turn,
                ServerMessage::Deck(vec![red(7), green(9)]),
                ServerMessage::Plays(vec![0]),
            ]
        );
        assert_eq!(
            h.drain(1),
            vec![ServerMessage::NotTurn, ServerMessage::Plays(vec![])]
        );
    }

    #[test]
    fn test_play_broadcasts_turn() {
        let (mut h, _sender) = Harness::new(two_player_state());
        h.game.handle_command(Command::new(0, Request::CardPlay(0)));

        assert_eq!(h.game.state().turn(), 1);
        assert_eq!(h.drain(0), vec![ServerMessage::NotTurn]);
        assert_eq!(h.drain(1), vec![ServerMessage::Turn]);
    }

    #[test]
    fn test_invalid_play_is_rejected_without_change() {
        let (mut h, _sender) = Harness::new(two_player_state());
        h.game.handle_command(Command::new(0, Request::CardPlay(5)));
        h.game.handle_command(Command::new(1, Request::CardPlay(0)));

        assert_eq!(h.game.state().turn(), 0);
        assert_eq!(h.game.state().deck(0).unwrap().len(), 2);
        assert!(matches!(
            h.drain(0).as_slice(),
            [ServerMessage::Invalid { .. }]
        ));
        assert!(matches!(
            h.drain(1).as_slice(),
            [ServerMessage::Invalid { .. }]
        ));
    }

    #[test]
    fn test_forced_draw_notifies_victim() {
        let state = GameState::from_parts(
            vec![green(0), green(1), green(2)],
            vec![red(5)],
            vec![
                vec![Card::new(Suit::Red, Rank::Draw), green(9)],
                vec![green(3)],
            ],
            0,
            Direction::Forward,
        );
        let (mut h, _sender) = Harness::new(state);
        h.game.handle_command(Command::new(0, Request::CardPlay(0)));

        assert_eq!(
            h.drain(1),
            vec![
                ServerMessage::Drawn(vec![green(2), green(1)]),
                ServerMessage::Turn,
            ]
        );
    }

    #[test]
    fn test_disconnect_of_opponent_is_a_forfeit() {
        let (mut h, _sender) = Harness::new(two_player_state());
        h.game.handle_command(Command::new(1, Request::Disconnect));

        assert_eq!(h.game.state().winner(), Some(0));
        assert_eq!(h.drain(0), vec![ServerMessage::Win]);
        assert!(h.drain(1).is_empty());
    }

    #[tokio::test]
    async fn test_win_halts_loop() {
        let state = GameState::from_parts(
            vec![green(0)],
            vec![red(5)],
            vec![vec![green(9)], vec![red(1)], vec![green(3)]],
            1,
            Direction::Forward,
        );
        let (mut h, sender) = Harness::new(state);
        let mut inboxes = std::mem::take(&mut h.inboxes);

        assert!(sender.push(Command::new(1, Request::CardPlay(0))));
        assert!(sender.push(Command::new(2, Request::GiveDeck)));
        let winner = h.game.run().await;
        assert_eq!(winner, Some(1));

        let mut received = Vec::new();
        for inbox in inboxes.iter_mut() {
            let mut messages = Vec::new();
            while let Ok(message) = inbox.try_recv() {
                messages.push(message);
            }
            received.push(messages);
        }
        let results: Vec<_> = received.iter().map(|m| m.last().cloned()).collect();
        assert_eq!(
            results,
            vec![
                Some(ServerMessage::Lose),
                Some(ServerMessage::Win),
                Some(ServerMessage::Lose),
            ]
        );

        // The deck request queued behind the winning play is never served.
        assert!(!received[2]
            .iter()
            .any(|m| matches!(m, ServerMessage::Deck(_))));
    }

    #[test]
    fn test_dead_outbox_is_tolerated() {
        let (mut h, _sender) = Harness::new(two_player_state());
        drop(h.inboxes.remove(1));
        h.game.handle_command(Command::new(0, Request::CardPlay(0)));
        assert_eq!(h.game.state().turn(), 1);
        assert_ok!(h.inboxes[0].try_recv());
        assert_err!(h.inboxes[0].try_recv());
    }
}
