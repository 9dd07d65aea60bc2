use crate::cards::BjRank;

pub const BLACKJACK: u8 = 21;

/// Cards held by the player or the dealer during one round.
///
/// `count` is the soft total while `soft` is set (exactly one ace counted as
/// 11) and the hard total otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hand {
    cards: Vec<BjRank>,
    soft: bool,
    count: u8,
    doubled: bool,
}

impl Hand {
    pub fn new() -> Hand {
        Hand::default()
    }

    pub fn from_ranks(ranks: &[BjRank]) -> Hand {
        let mut hand = Hand::new();
        for &rank in ranks {
            hand.add(rank);
        }
        hand
    }

    /// Adds a card and re-bases the total.
    ///
    /// An ace counts 11 if that fits under 21 and no other ace already does.
    /// A card that would bust a soft hand first drops its ace to 1.
    pub fn add(&mut self, rank: BjRank) {
        let mut value = rank.value(self.soft);
        if rank.is_ace() {
            if !self.soft && self.count + 11 <= BLACKJACK {
                self.soft = true;
                value += 10;
            } else if self.soft {
                value -= 10;
                if self.count + value > BLACKJACK {
                    self.count -= 10;
                    self.soft = false;
                }
            }
        } else if self.soft && self.count + value > BLACKJACK {
            self.count -= 10;
            self.soft = false;
        }
        self.count += value;
        self.cards.push(rank);
    }

    pub fn cards(&self) -> &[BjRank] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn count(&self) -> u8 {
        self.count
    }

    pub fn is_soft(&self) -> bool {
        self.soft
    }

    pub fn is_busted(&self) -> bool {
        self.count > BLACKJACK
    }

    pub fn is_pair(&self) -> bool {
        self.cards.len() == 2 && self.cards[0] == self.cards[1]
    }

    /// Two-card 21. Split hands never call this.
    pub fn is_natural(&self) -> bool {
        self.cards.len() == 2 && self.count == BLACKJACK
    }

    pub fn is_doubled(&self) -> bool {
        self.doubled
    }

    pub fn double_down(&mut self) {
        self.doubled = true;
    }

    /// Rank of the card beside the ace in a two-card soft hand.
    pub fn soft_kicker(&self) -> Option<BjRank> {
        match self.cards.as_slice() {
            [BjRank::Ace, other] | [other, BjRank::Ace] => Some(*other),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BjRank::*;

    #[test]
    fn two_aces_make_soft_twelve() {
        let hand = Hand::from_ranks(&[Ace, Ace]);
        assert_eq!(hand.count(), 12);
        assert!(hand.is_soft());
        assert!(hand.is_pair());
    }

    #[test]
    fn soft_hand_rebases_instead_of_busting() {
        let mut hand = Hand::from_ranks(&[Ace, Six]);
        assert_eq!(hand.count(), 17);
        assert!(hand.is_soft());
        hand.add(Nine);
        assert_eq!(hand.count(), 16);
        assert!(!hand.is_soft());
        assert!(!hand.is_busted());
    }

    #[test]
    fn late_ace_turns_hard_hand_soft() {
        let mut hand = Hand::from_ranks(&[Two, Three]);
        hand.add(Ace);
        assert_eq!(hand.count(), 16);
        assert!(hand.is_soft());
    }

    #[test]
    fn ace_on_high_hard_total_counts_one() {
        let mut hand = Hand::from_ranks(&[Ten, Six]);
        hand.add(Ace);
        assert_eq!(hand.count(), 17);
        assert!(!hand.is_soft());
    }

    #[test]
    fn second_ace_on_soft_hand_counts_one() {
        let mut hand = Hand::from_ranks(&[Ace, Five]);
        hand.add(Ace);
        assert_eq!(hand.count(), 17);
        assert!(hand.is_soft());
    }

    #[test]
    fn natural_and_kicker() {
        let hand = Hand::from_ranks(&[Ten, Ace]);
        assert!(hand.is_natural());
        assert_eq!(hand.soft_kicker(), Some(Ten));
        assert_eq!(Hand::from_ranks(&[Ace, Ace]).soft_kicker(), Some(Ace));
        assert_eq!(Hand::from_ranks(&[Nine, Seven]).soft_kicker(), None);
    }
}
