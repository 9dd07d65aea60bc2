use bj_evolve::cards::*;
use bj_evolve::error::SimError;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[test]
fn test_face_cards_play_as_ten() {
    for rank in [Rank::Ten, Rank::Jack, Rank::Queen, Rank::King] {
        assert_eq!(rank_of(Card::new(rank, Suit::Hearts)), BjRank::Ten);
    }
    assert_eq!(rank_of(Card::new(Rank::Five, Suit::Clubs)), BjRank::Five);
    assert_eq!(rank_of(Card::new(Rank::Ace, Suit::Spades)), BjRank::Ace);
}

#[test]
fn test_card_str() {
    let c = Card::new(Rank::King, Suit::Diamonds);
    assert_eq!(format!("{}", c), "Kd");
    assert_eq!(Card::new(Rank::Ten, Suit::Clubs).to_string(), "Tc");
}

#[test]
fn test_values() {
    assert_eq!(value_of(BjRank::Ace, true), 11);
    assert_eq!(value_of(BjRank::Ace, false), 1);
    assert_eq!(value_of(BjRank::Seven, true), 7);
    assert_eq!(value_of(BjRank::Ten, false), 10);
}

#[test]
fn test_bj_rank_indices() {
    for (i, rank) in ALL_BJ_RANKS.iter().enumerate() {
        assert_eq!(rank.index(), i);
        assert_eq!(BjRank::from_index(i), Some(*rank));
    }
    assert_eq!(BjRank::from_index(10), None);
    let labels: String = ALL_BJ_RANKS.iter().map(|r| r.to_char()).collect();
    assert_eq!(labels, "A23456789T");
}

#[test]
fn test_unshuffled_shoe_deals_canonical_order() {
    let mut shoe = Shoe::new();
    assert_eq!(shoe.draw().unwrap(), Card::new(Rank::Two, Suit::Hearts));
    assert_eq!(shoe.draw().unwrap(), Card::new(Rank::Two, Suit::Diamonds));
    assert_eq!(shoe.pointer(), 2);
    assert_eq!(shoe.remaining(), DECK_SIZE - 2);
}

#[test]
fn test_shoe_exhaustion_is_an_error() {
    let mut shoe = Shoe::new();
    for _ in 0..DECK_SIZE {
        shoe.draw().unwrap();
    }
    assert!(matches!(shoe.draw(), Err(SimError::ShoeExhausted)));
}

#[test]
fn test_shoe_deck_composition() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut shoe = Shoe::shuffled(&mut rng);
    let mut counts = [0usize; 10];
    for _ in 0..DECK_SIZE {
        counts[shoe.draw().unwrap().bj_rank().index()] += 1;
    }
    assert_eq!(counts[BjRank::Ten.index()], 16);
    for rank in ALL_BJ_RANKS.iter().filter(|r| **r != BjRank::Ten) {
        assert_eq!(counts[rank.index()], 4);
    }
}

#[test]
fn test_same_seed_same_shuffle() {
    let a = Shoe::shuffled(&mut ChaCha8Rng::seed_from_u64(9));
    let b = Shoe::shuffled(&mut ChaCha8Rng::seed_from_u64(9));
    assert_eq!(a.order(), b.order());
}

#[test]
fn test_stacked_shoe_deals_requested_ranks_first() {
    let firsts = [BjRank::Ace, BjRank::Ten, BjRank::Ten, BjRank::Six];
    let mut shoe = Shoe::stacked(&firsts).unwrap();
    for want in firsts {
        assert_eq!(shoe.draw().unwrap().bj_rank(), want);
    }
    let mut seen = shoe.order().to_vec();
    seen.sort_unstable();
    assert_eq!(seen, (0..DECK_SIZE as u8).collect::<Vec<_>>());
}
