use serde::{Deserialize, Serialize};
use std::fmt;

/// Card color. `Wild` cards match anything and are matched only by rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Suit {
    Red,
    Green,
    Blue,
    Yellow,
    Wild,
}

impl Suit {
    pub const COLORS: [Suit; 4] = [Suit::Red, Suit::Green, Suit::Blue, Suit::Yellow];
    pub const ALL: [Suit; 5] = [Suit::Red, Suit::Green, Suit::Blue, Suit::Yellow, Suit::Wild];
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Suit::Red => "red",
            Suit::Green => "green",
            Suit::Blue => "blue",
            Suit::Yellow => "yellow",
            Suit::Wild => "wild",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rank {
    Number(u8),
    Draw,
    Reverse,
    Skip,
    Wild,
}

impl Rank {
    /// Ranks carried by every colored suit, one card each.
    pub const COLORED: [Rank; 13] = [
        Rank::Number(0),
        Rank::Number(1),
        Rank::Number(2),
        Rank::Number(3),
        Rank::Number(4),
        Rank::Number(5),
        Rank::Number(6),
        Rank::Number(7),
        Rank::Number(8),
        Rank::Number(9),
        Rank::Draw,
        Rank::Reverse,
        Rank::Skip,
    ];
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rank::Number(n) => write!(f, "{}", n),
            Rank::Draw => f.write_str("draw"),
            Rank::Reverse => f.write_str("reverse"),
            Rank::Skip => f.write_str("skip"),
            Rank::Wild => f.write_str("wild"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub suit: Suit,
    pub rank: Rank,
}

impl Card {
    pub const fn new(suit: Suit, rank: Rank) -> Self {
        Self { suit, rank }
    }

    pub fn is_number(&self) -> bool {
        matches!(self.rank, Rank::Number(_))
    }

    pub fn is_wild(&self) -> bool {
        self.suit == Suit::Wild
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.suit, self.rank)
    }
}

/// The two wild-suit cards: a plain wild and a wild draw.
pub const WILD_CARDS: [Card; 2] = [
    Card::new(Suit::Wild, Rank::Wild),
    Card::new(Suit::Wild, Rank::Draw),
];

/// Total number of cards in a game.
pub const DECK_SIZE: usize = Suit::COLORS.len() * Rank::COLORED.len() + WILD_CARDS.len();

/// Builds the complete, unshuffled deck.
pub fn full_deck() -> Vec<Card> {
    let mut cards = Vec::with_capacity(DECK_SIZE);
    for suit in Suit::COLORS {
        for rank in Rank::COLORED {
            cards.push(Card::new(suit, rank));
        }
    }
    cards.extend_from_slice(&WILD_CARDS);
    cards
}

/// Returns true if `card` may be placed on `top`. With no top card anything
/// goes.
pub fn is_valid_play(top: Option<&Card>, card: &Card) -> bool {
    match top {
        None => true,
        Some(top) => card.is_wild() || card.suit == top.suit || card.rank == top.rank,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn all_ranks() -> Vec<Rank> {
        let mut ranks = Rank::COLORED.to_vec();
        ranks.push(Rank::Wild);
        ranks
    }

    #[test]
    fn test_full_deck_composition() {
        let deck = full_deck();
        assert_eq!(deck.len(), DECK_SIZE);
        assert_eq!(DECK_SIZE, 54);

        let wilds = deck.iter().filter(|c| c.is_wild()).count();
        assert_eq!(wilds, 2);

        let mut per_card: HashMap<Card, usize> = HashMap::new();
        for card in &deck {
            *per_card.entry(*card).or_default() += 1;
        }
        assert!(per_card.values().all(|&n| n == 1));

        for suit in Suit::COLORS {
            let count = deck.iter().filter(|c| c.suit == suit).count();
            assert_eq!(count, Rank::COLORED.len());
        }
        for rank in Rank::COLORED {
            let colored = deck.iter().filter(|c| c.rank == rank && !c.is_wild()).count();
            assert_eq!(colored, 4, "rank {}", rank);
        }
        assert!(deck.contains(&Card::new(Suit::Wild, Rank::Wild)));
        assert!(deck.contains(&Card::new(Suit::Wild, Rank::Draw)));
    }

    #[test]
    fn test_is_valid_play_exhaustive() {
        let ranks = all_ranks();
        for top_suit in Suit::ALL {
            for &top_rank in &ranks {
                let top = Card::new(top_suit, top_rank);
                for suit in Suit::ALL {
                    for &rank in &ranks {
                        let card = Card::new(suit, rank);
                        let expected =
                            suit == Suit::Wild || suit == top_suit || rank == top_rank;
                        assert_eq!(
                            is_valid_play(Some(&top), &card),
                            expected,
                            "{} on {}",
                            card,
                            top
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_wild_cards_always_playable() {
        let top = Card::new(Suit::Red, Rank::Number(5));
        for wild in WILD_CARDS {
            assert!(is_valid_play(Some(&top), &wild));
        }
    }

    #[test]
    fn test_wild_top_only_matched_by_rank_or_wild() {
        let top = Card::new(Suit::Wild, Rank::Draw);
        assert!(is_valid_play(Some(&top), &Card::new(Suit::Blue, Rank::Draw)));
        assert!(!is_valid_play(Some(&top), &Card::new(Suit::Blue, Rank::Skip)));
        assert!(is_valid_play(Some(&top), &Card::new(Suit::Wild, Rank::Wild)));
    }

    #[test]
    fn test_anything_goes_without_top() {
        assert!(is_valid_play(None, &Card::new(Suit::Green, Rank::Number(3))));
    }

    #[test]
    fn test_card_display() {
        assert_eq!(Card::new(Suit::Red, Rank::Number(7)).to_string(), "red 7");
        assert_eq!(Card::new(Suit::Wild, Rank::Draw).to_string(), "wild draw");
        assert!(Card::new(Suit::Yellow, Rank::Number(0)).is_number());
        assert!(!Card::new(Suit::Yellow, Rank::Skip).is_number());
    }
}
