//! Authoritative game state and the card rules applied to it.
//!
//! [`GameState`] owns every card of the game. Cards only ever move between
//! the pool, the discard stack, and the player decks, so the total count never
//! changes. Each rule operation returns the [`GameEvent`]s it caused, in
//! order, and leaves the state untouched when it is refused.

use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;
use shared::{
    full_deck, is_valid_play, Card, LobbyError, Rank, RuleViolation, Suit, MAX_PLAYERS,
    MIN_PLAYERS, START_CARDS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    pub fn toggled(self) -> Self {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }
}

/// Something that happened to the game, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    CardPlayed { player: usize, card: Card },
    CardsDrawn { player: usize, cards: Vec<Card> },
    DirectionChanged { direction: Direction },
    TurnChanged { player: usize },
    PlayerEliminated { player: usize },
    GameWon { player: usize },
}

#[derive(Debug, Clone, Copy)]
pub struct GameConfig {
    pub start_cards: usize,
    pub direction: Direction,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            start_cards: START_CARDS,
            direction: Direction::Forward,
        }
    }
}

/// The hand of one seated player.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerDeck {
    pub cards: Vec<Card>,
    /// Set once the player's connection is gone; eliminated seats are skipped.
    pub eliminated: bool,
}

#[derive(Debug, Clone)]
pub struct GameState {
    /// Face-down draw pile; the last element is the top.
    pool: Vec<Card>,
    /// Face-up discard pile; the last element is the active discard.
    stack: Vec<Card>,
    decks: Vec<PlayerDeck>,
    turn: usize,
    direction: Direction,
    winner: Option<usize>,
}

impl GameState {
    /// Shuffles a full deck, deals every player in, and flips the opening
    /// discard.
    pub fn start<R: Rng + ?Sized>(
        players: usize,
        config: &GameConfig,
        rng: &mut R,
    ) -> Result<Self, LobbyError> {
        if players < MIN_PLAYERS {
            return Err(LobbyError::NotEnoughPlayers {
                have: players,
                min: MIN_PLAYERS,
            });
        }
        if players > MAX_PLAYERS {
            return Err(LobbyError::TooManyPlayers {
                have: players,
                max: MAX_PLAYERS,
            });
        }

        let mut pool = full_deck();
        pool.shuffle(rng);

        let mut decks = vec![PlayerDeck::default(); players];
        for deck in decks.iter_mut() {
            let at = pool.len().saturating_sub(config.start_cards);
            deck.cards = pool.split_off(at);
        }

        let mut stack = Vec::with_capacity(pool.len());
        if let Some(opening) = Self::flip_opening(&mut pool) {
            stack.push(opening);
        }

        let turn = match config.direction {
            Direction::Forward => 0,
            Direction::Reverse => players - 1,
        };

        info!(
            "Dealt {} cards to {} players, opening discard {:?}",
            config.start_cards,
            players,
            stack.last()
        );

        Ok(Self {
            pool,
            stack,
            decks,
            turn,
            direction: config.direction,
            winner: None,
        })
    }

    /// Flips pool cards until a numbered one turns up. Action and wild cards
    /// go back under the pool.
    fn flip_opening(pool: &mut Vec<Card>) -> Option<Card> {
        for _ in 0..pool.len() {
            let card = pool.pop()?;
            if card.is_number() {
                return Some(card);
            }
            pool.insert(0, card);
        }
        pool.pop()
    }

    /// Builds a state from explicit piles, e.g. to replay a recorded position.
    pub fn from_parts(
        pool: Vec<Card>,
        stack: Vec<Card>,
        decks: Vec<Vec<Card>>,
        turn: usize,
        direction: Direction,
    ) -> Self {
        let decks = decks
            .into_iter()
            .map(|cards| PlayerDeck {
                cards,
                eliminated: false,
            })
            .collect();
        Self {
            pool,
            stack,
            decks,
            turn,
            direction,
            winner: None,
        }
    }

    pub fn pool(&self) -> &[Card] {
        &self.pool
    }

    pub fn stack(&self) -> &[Card] {
        &self.stack
    }

    pub fn top(&self) -> Option<&Card> {
        self.stack.last()
    }

    pub fn deck(&self, player: usize) -> Option<&[Card]> {
        self.decks.get(player).map(|d| d.cards.as_slice())
    }

    pub fn is_eliminated(&self, player: usize) -> bool {
        self.decks.get(player).map_or(true, |d| d.eliminated)
    }

    pub fn turn(&self) -> usize {
        self.turn
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn winner(&self) -> Option<usize> {
        self.winner
    }

    pub fn player_count(&self) -> usize {
        self.decks.len()
    }

    pub fn active_count(&self) -> usize {
        self.decks.iter().filter(|d| !d.eliminated).count()
    }

    /// Cards across pool, stack and every deck.
    pub fn total_cards(&self) -> usize {
        self.pool.len() + self.stack.len() + self.decks.iter().map(|d| d.cards.len()).sum::<usize>()
    }

    /// Indices of `player`'s cards that may go on the current discard.
    pub fn legal_plays(&self, player: usize) -> Vec<usize> {
        let top = self.top();
        self.deck(player)
            .unwrap_or_default()
            .iter()
            .enumerate()
            .filter(|(_, card)| is_valid_play(top, card))
            .map(|(index, _)| index)
            .collect()
    }

    /// The active seat `count` steps away from `from` in `direction`.
    fn step(&self, from: usize, direction: Direction, count: usize) -> usize {
        let n = self.decks.len();
        let mut at = from;
        for _ in 0..count {
            for _ in 0..n {
                at = match direction {
                    Direction::Forward => (at + 1) % n,
                    Direction::Reverse => (at + n - 1) % n,
                };
                if !self.decks[at].eliminated {
                    break;
                }
            }
        }
        at
    }

    /// The player who acts after the current one.
    pub fn next_player(&self) -> usize {
        self.step(self.turn, self.direction, 1)
    }

    /// Advances the turn pointer by `count` active seats.
    pub fn move_turn(&mut self, count: usize) -> Vec<GameEvent> {
        self.turn = self.step(self.turn, self.direction, count);
        debug!("Turn moved {} step(s) to player {}", count, self.turn);
        vec![GameEvent::TurnChanged { player: self.turn }]
    }

    /// Takes one card for a draw: from the pool, or from the bottom of the
    /// stack once the pool is empty. The active discard is never taken.
    fn take_card(&mut self) -> Option<Card> {
        if let Some(card) = self.pool.pop() {
            return Some(card);
        }
        if self.stack.len() > 1 {
            debug!("Pool empty, recycling from the bottom of the stack");
            return Some(self.stack.remove(0));
        }
        None
    }

    /// Moves up to `amount` cards into `player`'s deck and returns them.
    fn draw_into(&mut self, player: usize, amount: usize) -> Vec<Card> {
        let mut drawn = Vec::with_capacity(amount);
        for _ in 0..amount {
            match self.take_card() {
                Some(card) => drawn.push(card),
                None => break,
            }
        }
        self.decks[player].cards.extend_from_slice(&drawn);
        drawn
    }

    fn check_acting(&self, player: usize) -> Result<(), RuleViolation> {
        if self.winner.is_some() {
            return Err(RuleViolation::GameOver);
        }
        if player >= self.decks.len() || self.decks[player].eliminated {
            return Err(RuleViolation::UnknownPlayer(player));
        }
        if player != self.turn {
            return Err(RuleViolation::NotYourTurn {
                player,
                current: self.turn,
            });
        }
        Ok(())
    }

    /// Plays the card at `index` of `player`'s deck onto the stack.
    pub fn play_card(&mut self, player: usize, index: usize) -> Result<Vec<GameEvent>, RuleViolation> {
        self.check_acting(player)?;

        let deck = &self.decks[player].cards;
        let card = *deck.get(index).ok_or(RuleViolation::IndexOutOfRange {
            index,
            len: deck.len(),
        })?;
        if let Some(top) = self.top() {
            if !is_valid_play(Some(top), &card) {
                return Err(RuleViolation::IllegalPlay { card, top: *top });
            }
        }

        Ok(self.discard(player, index))
    }

    /// Moves a checked card to the stack, then either ends the game or
    /// applies the card's consequence.
    fn discard(&mut self, player: usize, index: usize) -> Vec<GameEvent> {
        let card = self.decks[player].cards.remove(index);
        self.stack.push(card);

        let mut events = vec![GameEvent::CardPlayed { player, card }];
        if self.decks[player].cards.is_empty() {
            self.winner = Some(player);
            events.push(GameEvent::GameWon { player });
        } else {
            events.extend(self.apply_play_consequence(card));
        }
        events
    }

    /// The acting player has nothing to play: draw one card, play it if it
    /// fits, otherwise pass.
    pub fn no_playables(&mut self, player: usize) -> Result<Vec<GameEvent>, RuleViolation> {
        self.check_acting(player)?;
        if !self.legal_plays(player).is_empty() {
            return Err(RuleViolation::HasPlayableCard { player });
        }

        let drawn = self.draw_into(player, 1);
        let mut events = Vec::new();
        let Some(card) = drawn.first().copied() else {
            debug!("Nothing left to draw for player {}", player);
            events.extend(self.move_turn(1));
            return Ok(events);
        };
        events.push(GameEvent::CardsDrawn {
            player,
            cards: drawn,
        });

        if is_valid_play(self.top(), &card) {
            let index = self.decks[player].cards.len() - 1;
            events.extend(self.discard(player, index));
        } else {
            events.extend(self.move_turn(1));
        }
        Ok(events)
    }

    /// Applies the effect of a card just played by the current player.
    pub fn apply_play_consequence(&mut self, card: Card) -> Vec<GameEvent> {
        let next = self.next_player();
        let mut events = Vec::new();

        match (card.suit, card.rank) {
            (Suit::Wild, Rank::Draw) => {
                events.extend(self.force_draw(next, 4));
                events.extend(self.move_turn(2));
            }
            (_, Rank::Draw) => {
                events.extend(self.force_draw(next, 2));
                events.extend(self.move_turn(1));
            }
            (_, Rank::Skip) => {
                events.extend(self.move_turn(2));
            }
            (_, Rank::Reverse) => {
                self.direction = self.direction.toggled();
                events.push(GameEvent::DirectionChanged {
                    direction: self.direction,
                });
                // Two players: the reverser faces the same opponent again.
                let steps = if self.active_count() == 2 { 2 } else { 1 };
                events.extend(self.move_turn(steps));
            }
            _ => {
                events.extend(self.move_turn(1));
            }
        }
        events
    }

    fn force_draw(&mut self, player: usize, amount: usize) -> Vec<GameEvent> {
        let cards = self.draw_into(player, amount);
        if cards.len() < amount {
            debug!(
                "Player {} drew {} of {} forced cards",
                player,
                cards.len(),
                amount
            );
        }
        if cards.is_empty() {
            return Vec::new();
        }
        vec![GameEvent::CardsDrawn { player, cards }]
    }

    /// Removes a departed player from the game. Their cards go under the
    /// pool; a lone remaining player wins.
    pub fn eliminate(&mut self, player: usize) -> Vec<GameEvent> {
        if self.winner.is_some() || self.is_eliminated(player) {
            return Vec::new();
        }

        let seat = &mut self.decks[player];
        seat.eliminated = true;
        let mut pool = std::mem::take(&mut seat.cards);
        pool.append(&mut self.pool);
        self.pool = pool;

        let mut events = vec![GameEvent::PlayerEliminated { player }];
        if self.active_count() == 1 {
            if let Some(last) = self.decks.iter().position(|d| !d.eliminated) {
                self.winner = Some(last);
                events.push(GameEvent::GameWon { player: last });
            }
        } else if self.turn == player {
            events.extend(self.move_turn(1));
        }
        events
    }
}
