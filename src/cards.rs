use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{SimError, SimResult};

pub const DECK_SIZE: usize = 52;

/// The shoe is reshuffled before a round once more than a third of it is gone.
pub const RESHUFFLE_AFTER: usize = DECK_SIZE / 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rank {
    Two = 2,
    Three = 3,
    Four = 4,
    Five = 5,
    Six = 6,
    Seven = 7,
    Eight = 8,
    Nine = 9,
    Ten = 10,
    Jack = 11,
    Queen = 12,
    King = 13,
    Ace = 14,
}

impl Rank {
    pub fn to_char(self) -> char {
        match self {
            Rank::Two => '2',
            Rank::Three => '3',
            Rank::Four => '4',
            Rank::Five => '5',
            Rank::Six => '6',
            Rank::Seven => '7',
            Rank::Eight => '8',
            Rank::Nine => '9',
            Rank::Ten => 'T',
            Rank::Jack => 'J',
            Rank::Queen => 'Q',
            Rank::King => 'K',
            Rank::Ace => 'A',
        }
    }

    /// Blackjack rank of this face; J, Q and K all play as a ten.
    pub fn bj_rank(self) -> BjRank {
        match self {
            Rank::Two => BjRank::Two,
            Rank::Three => BjRank::Three,
            Rank::Four => BjRank::Four,
            Rank::Five => BjRank::Five,
            Rank::Six => BjRank::Six,
            Rank::Seven => BjRank::Seven,
            Rank::Eight => BjRank::Eight,
            Rank::Nine => BjRank::Nine,
            Rank::Ten | Rank::Jack | Rank::Queen | Rank::King => BjRank::Ten,
            Rank::Ace => BjRank::Ace,
        }
    }
}

pub const ALL_RANKS: [Rank; 13] = [
    Rank::Two,
    Rank::Three,
    Rank::Four,
    Rank::Five,
    Rank::Six,
    Rank::Seven,
    Rank::Eight,
    Rank::Nine,
    Rank::Ten,
    Rank::Jack,
    Rank::Queen,
    Rank::King,
    Rank::Ace,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Suit {
    Hearts,
    Diamonds,
    Spades,
    Clubs,
}

impl Suit {
    pub fn to_char(self) -> char {
        match self {
            Suit::Hearts => 'h',
            Suit::Diamonds => 'd',
            Suit::Spades => 's',
            Suit::Clubs => 'c',
        }
    }

}

pub const ALL_SUITS: [Suit; 4] = [Suit::Hearts, Suit::Diamonds, Suit::Spades, Suit::Clubs];

/// One of the ten ranks that matter at a blackjack table.
///
/// The discriminant is the row/column index used by the strategy tables:
/// `A = 0`, `2..9 = 1..8`, `T = 9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BjRank {
    Ace = 0,
    Two = 1,
    Three = 2,
    Four = 3,
    Five = 4,
    Six = 5,
    Seven = 6,
    Eight = 7,
    Nine = 8,
    Ten = 9,
}

pub const ALL_BJ_RANKS: [BjRank; 10] = [
    BjRank::Ace,
    BjRank::Two,
    BjRank::Three,
    BjRank::Four,
    BjRank::Five,
    BjRank::Six,
    BjRank::Seven,
    BjRank::Eight,
    BjRank::Nine,
    BjRank::Ten,
];

impl BjRank {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<BjRank> {
        ALL_BJ_RANKS.get(index).copied()
    }

    pub fn to_char(self) -> char {
        match self {
            BjRank::Ace => 'A',
            BjRank::Ten => 'T',
            pip => char::from(b'1' + pip as u8),
        }
    }

    /// Point value: an ace is 11 when counted soft and 1 otherwise.
    pub fn value(self, soft: bool) -> u8 {
        match self {
            BjRank::Ace if soft => 11,
            BjRank::Ace => 1,
            BjRank::Ten => 10,
            pip => pip as u8 + 1,
        }
    }

    pub fn is_ace(self) -> bool {
        self == BjRank::Ace
    }
}

impl fmt::Display for BjRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Card {
        Card { rank, suit }
    }

    pub fn bj_rank(&self) -> BjRank {
        self.rank.bj_rank()
    }

}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank.to_char(), self.suit.to_char())
    }
}

/// Maps a dealt card to its blackjack rank.
pub fn rank_of(card: Card) -> BjRank {
    card.bj_rank()
}

/// Point value of a blackjack rank; see [`BjRank::value`].
pub fn value_of(rank: BjRank, soft: bool) -> u8 {
    rank.value(soft)
}

fn canonical_cards() -> Vec<Card> {
    ALL_RANKS
        .iter()
        .flat_map(|&r| ALL_SUITS.iter().map(move |&s| Card::new(r, s)))
        .collect()
}

/// A single 52-card deck dealt through a permutation of its canonical order.
///
/// `cards` never changes. `order` is the draw order and `pointer` the number of
/// cards dealt since the last reset.
#[derive(Debug, Clone)]
pub struct Shoe {
    cards: Vec<Card>,
    order: [u8; DECK_SIZE],
    pointer: usize,
}

impl Default for Shoe {
    fn default() -> Self {
        Shoe::new()
    }
}

impl Shoe {
    /// An unshuffled shoe: cards come out in canonical order.
    pub fn new() -> Shoe {
        let mut order = [0u8; DECK_SIZE];
        for (i, slot) in order.iter_mut().enumerate() {
            *slot = i as u8;
        }
        Shoe {
            cards: canonical_cards(),
            order,
            pointer: 0,
        }
    }

    pub fn shuffled<R: Rng + ?Sized>(rng: &mut R) -> Shoe {
        let mut shoe = Shoe::new();
        shoe.reset(rng);
        shoe
    }

    /// A shoe whose first cards have the given blackjack ranks, in order.
    /// The rest of the deck follows in canonical order.
    pub fn stacked(firsts: &[BjRank]) -> SimResult<Shoe> {
        let mut shoe = Shoe::new();
        let mut used = [false; DECK_SIZE];
        let mut order = Vec::with_capacity(DECK_SIZE);
        for &wanted in firsts {
            let idx = (0..DECK_SIZE)
                .find(|&i| !used[i] && shoe.cards[i].bj_rank() == wanted)
                .ok_or_else(|| {
                    SimError::StackedShoe(format!("no {} left for position {}", wanted, order.len()))
                })?;
            used[idx] = true;
            order.push(idx as u8);
        }
        order.extend((0..DECK_SIZE).filter(|&i| !used[i]).map(|i| i as u8));
        shoe.order.copy_from_slice(&order);
        Ok(shoe)
    }

    /// Rewinds the pointer and reshuffles the draw order.
    pub fn reset<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.pointer = 0;
        self.order.shuffle(rng);
    }

    pub fn draw(&mut self) -> SimResult<Card> {
        if self.pointer >= DECK_SIZE {
            return Err(SimError::ShoeExhausted);
        }
        let card = self.cards[self.order[self.pointer] as usize];
        self.pointer += 1;
        Ok(card)
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn remaining(&self) -> usize {
        DECK_SIZE - self.pointer
    }

    pub fn order(&self) -> &[u8; DECK_SIZE] {
        &self.order
    }

    pub fn needs_reshuffle(&self) -> bool {
        self.pointer > RESHUFFLE_AFTER
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn canonical_order_is_rank_major() {
        let cards = canonical_cards();
        assert_eq!(cards.len(), DECK_SIZE);
        assert_eq!(cards[0], Card::new(Rank::Two, Suit::Hearts));
        assert_eq!(cards[3], Card::new(Rank::Two, Suit::Clubs));
        assert_eq!(cards[51], Card::new(Rank::Ace, Suit::Clubs));
    }

    #[test]
    fn reset_keeps_a_permutation() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut shoe = Shoe::shuffled(&mut rng);
        shoe.draw().unwrap();
        shoe.reset(&mut rng);
        assert_eq!(shoe.pointer(), 0);
        let mut seen = shoe.order().to_vec();
        seen.sort_unstable();
        assert_eq!(seen, (0..DECK_SIZE as u8).collect::<Vec<_>>());
    }

    #[test]
    fn stacked_rejects_a_fifth_ace() {
        let firsts = [BjRank::Ace; 5];
        assert!(matches!(Shoe::stacked(&firsts), Err(SimError::StackedShoe(_))));
    }

    #[test]
    fn reshuffle_threshold() {
        let mut shoe = Shoe::new();
        for _ in 0..RESHUFFLE_AFTER {
            shoe.draw().unwrap();
        }
        assert!(!shoe.needs_reshuffle());
        shoe.draw().unwrap();
        assert!(shoe.needs_reshuffle());
    }
}
