//! Round engine: resolves single-player, single-deck blackjack rounds for a
//! strategy genome.
//!
//! Per hand the engine moves through
//!
//! ```text
//! Dealt -> PlayerDeciding -> PlayerBusted | PlayerStanding
//!       -> DealerPlaying  -> DealerBusted | DealerStanding -> Settled
//! ```
//!
//! House rules: dealer stands on all 17s, naturals pay 3:2, one split per
//! round with no re-splitting, doubling allowed after a split except on aces,
//! split aces take at most one card beyond the one dealt to them, and a split
//! 21 is not a natural.

use log::{debug, trace};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::cards::{BjRank, Shoe};
use crate::error::{SimError, SimResult};
use crate::genome::Genome;
use crate::hand::{Hand, BLACKJACK};

/// Dealer draws while below this total.
pub const DEALER_STANDS_AT: u8 = 17;

// ---------------------------------------------------------------------------
// Table configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    pub player_bankroll: i64,
    pub dealer_bankroll: i64,
    pub bet: i64,
}

impl Default for TableConfig {
    fn default() -> Self {
        TableConfig {
            player_bankroll: 1000,
            dealer_bankroll: 2000,
            bet: 2,
        }
    }
}

impl TableConfig {
    pub fn validate(&self) -> SimResult<()> {
        if self.player_bankroll <= 0 || self.dealer_bankroll <= 0 {
            return Err(SimError::Config(
                "Starting bankrolls must be positive".to_string(),
            ));
        }
        if self.bet <= 0 {
            return Err(SimError::Config("Bet size must be positive".to_string()));
        }
        Ok(())
    }

    /// Natural payout, rounded down to whole chips.
    pub fn natural_payout(&self) -> i64 {
        self.bet * 3 / 2
    }
}

// ---------------------------------------------------------------------------
// Reports and counters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Dealt,
    PlayerDeciding,
    PlayerBusted,
    PlayerStanding,
    DealerPlaying,
    DealerBusted,
    DealerStanding,
    Settled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandOutcome {
    /// Two-card 21 against a dealer without one.
    Natural,
    Win,
    Push,
    Loss,
    Bust,
}

impl HandOutcome {
    pub fn is_win(self) -> bool {
        matches!(self, HandOutcome::Natural | HandOutcome::Win)
    }

    pub fn is_loss(self) -> bool {
        matches!(self, HandOutcome::Loss | HandOutcome::Bust)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandReport {
    pub cards: Vec<BjRank>,
    pub total: u8,
    pub soft: bool,
    pub doubled: bool,
    pub from_split: bool,
    pub outcome: HandOutcome,
    /// Chips moved from dealer to player (negative when the player pays).
    pub delta: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundReport {
    pub dealer_cards: Vec<BjRank>,
    pub dealer_total: u8,
    /// `DealerBusted`, `DealerStanding`, or `Dealt` when every player hand
    /// was settled before the dealer had to act.
    pub dealer_phase: Phase,
    pub hands: Vec<HandReport>,
}

impl RoundReport {
    pub fn player_delta(&self) -> i64 {
        self.hands.iter().map(|h| h.delta).sum()
    }

    pub fn was_split(&self) -> bool {
        self.hands.iter().any(|h| h.from_split)
    }
}

/// Raw outcome counters for a run of rounds. Ratios are left to the consumer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub rounds_played: u64,
    /// Winning hands; each split hand counts on its own. Zeroed on bankruptcy.
    pub hands_won: u64,
    /// Losing hands, busts included. Kept on bankruptcy.
    pub hands_lost: u64,
    pub draws: u64,
    pub doubled: u64,
    pub doubled_won: u64,
    pub doubled_lost: u64,
    pub splits: u64,
    pub split_hands_won: u64,
    pub split_hands_lost: u64,
    /// Player bankroll after every settled hand.
    pub trajectory: Vec<i64>,
    pub bankrupt: bool,
}

impl RunStats {
    /// Every finished hand, split halves included.
    pub fn hands_settled(&self) -> u64 {
        self.trajectory.len() as u64
    }
}

// ---------------------------------------------------------------------------
// Game
// ---------------------------------------------------------------------------

/// One player following a genome against the dealer, with both bankrolls.
#[derive(Debug, Clone)]
pub struct Game {
    genome: Genome,
    shoe: Shoe,
    table: TableConfig,
    player_bankroll: i64,
    dealer_bankroll: i64,
    stats: RunStats,
}

impl Game {
    pub fn new(genome: Genome, table: TableConfig, shoe: Shoe) -> SimResult<Game> {
        table.validate()?;
        Ok(Game {
            genome,
            shoe,
            table,
            player_bankroll: table.player_bankroll,
            dealer_bankroll: table.dealer_bankroll,
            stats: RunStats::default(),
        })
    }

    /// A game dealt from a freshly shuffled shoe.
    pub fn shuffled<R: Rng + ?Sized>(
        genome: Genome,
        table: TableConfig,
        rng: &mut R,
    ) -> SimResult<Game> {
        Game::new(genome, table, Shoe::shuffled(rng))
    }

    pub fn genome(&self) -> &Genome {
        &self.genome
    }

    pub fn table(&self) -> &TableConfig {
        &self.table
    }

    pub fn shoe(&self) -> &Shoe {
        &self.shoe
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn player_bankroll(&self) -> i64 {
        self.player_bankroll
    }

    pub fn dealer_bankroll(&self) -> i64 {
        self.dealer_bankroll
    }

    /// Restores both bankrolls to the table's starting values.
    pub fn reset_bankrolls(&mut self) {
        self.player_bankroll = self.table.player_bankroll;
        self.dealer_bankroll = self.table.dealer_bankroll;
    }

    pub fn reset_stats(&mut self) {
        self.stats = RunStats::default();
    }

    pub fn reshuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.shoe.reset(rng);
    }

    pub fn is_bankrupt(&self) -> bool {
        self.player_bankroll <= 0 || self.dealer_bankroll <= 0
    }

    /// Plays up to `rounds` rounds, reshuffling between rounds once a third of
    /// the shoe is used. Stops early if either side is broke, in which case
    /// the run is marked bankrupt and reports no hands won. Losses and
    /// draws are left as counted.
    ///
    /// Returns the number of rounds dealt by this call.
    pub fn play<R: Rng + ?Sized>(&mut self, rounds: usize, rng: &mut R) -> SimResult<usize> {
        let mut played = 0;
        loop {
            if self.is_bankrupt() {
                self.stats.bankrupt = true;
                self.stats.hands_won = 0;
                debug!(
                    "bankrupt after {} rounds (player {}, dealer {})",
                    played, self.player_bankroll, self.dealer_bankroll
                );
                break;
            }
            if played == rounds {
                break;
            }
            if self.shoe.needs_reshuffle() {
                debug!("reshuffling after {} cards", self.shoe.pointer());
                self.shoe.reset(rng);
            }
            self.stats.rounds_played += 1;
            self.play_round()?;
            played += 1;
        }
        Ok(played)
    }

    /// Deals and resolves one round from the current shoe position.
    pub fn play_round(&mut self) -> SimResult<RoundReport> {
        let mut player = Hand::new();
        let mut dealer = Hand::new();
        player.add(self.draw()?);
        dealer.add(self.draw()?);
        player.add(self.draw()?);
        dealer.add(self.draw()?);
        let up = dealer.cards()[0];

        let report = if player.is_pair() && self.genome.split(player.cards()[0], up) {
            self.play_split(player.cards()[0], dealer)?
        } else if player.is_natural() {
            let outcome = if dealer.is_natural() {
                HandOutcome::Push
            } else {
                HandOutcome::Natural
            };
            let hand = self.settle(&player, outcome, false);
            RoundReport {
                dealer_total: dealer.count(),
                dealer_cards: dealer.cards().to_vec(),
                dealer_phase: Phase::Dealt,
                hands: vec![hand],
            }
        } else {
            self.play_single(player, dealer)?
        };

        trace!(
            "round: dealer {:?} ({}) hands {:?} delta {}",
            report.dealer_cards,
            report.dealer_total,
            report.hands.iter().map(|h| h.outcome).collect::<Vec<_>>(),
            report.player_delta(),
        );
        Ok(report)
    }

    fn draw(&mut self) -> SimResult<BjRank> {
        let card = self.shoe.draw()?;
        trace!("dealt {}", card);
        Ok(card.bj_rank())
    }

    fn play_single(&mut self, mut player: Hand, mut dealer: Hand) -> SimResult<RoundReport> {
        let up = dealer.cards()[0];
        let doubles = if player.is_soft() {
            match player.soft_kicker() {
                Some(BjRank::Ten) | None => false,
                Some(kicker) => self.genome.soft_double(kicker, up),
            }
        } else {
            self.genome.hard_double(player.count(), up)?
        };
        if doubles {
            player.double_down();
            self.stats.doubled += 1;
        }

        let (dealer_phase, hand) = match self.decide(&mut player, up, false)? {
            Phase::PlayerBusted => (
                Phase::Dealt,
                self.settle(&player, HandOutcome::Bust, false),
            ),
            _ => {
                let dealer_phase = self.play_dealer(&mut dealer)?;
                let outcome = showdown(&player, &dealer, dealer_phase);
                (dealer_phase, self.settle(&player, outcome, false))
            }
        };
        Ok(RoundReport {
            dealer_cards: dealer.cards().to_vec(),
            dealer_total: dealer.count(),
            dealer_phase,
            hands: vec![hand],
        })
    }

    /// Plays both halves of a split pair against one dealer hand. The dealer
    /// draws once, for the first half that survives.
    fn play_split(&mut self, rank: BjRank, mut dealer: Hand) -> SimResult<RoundReport> {
        let up = dealer.cards()[0];
        let split_aces = rank.is_ace();
        self.stats.splits += 1;

        let mut dealer_phase = Phase::Dealt;
        let mut hands = Vec::with_capacity(2);
        for _ in 0..2 {
            let mut hand = Hand::from_ranks(&[rank]);
            hand.add(self.draw()?);

            if !split_aces && hand.count() != BLACKJACK {
                let doubles = if hand.is_soft() {
                    rank != BjRank::Ten && self.genome.soft_double(rank, up)
                } else {
                    self.genome.hard_double(hand.count(), up)?
                };
                if doubles {
                    hand.double_down();
                    self.stats.doubled += 1;
                }
            }

            let report = match self.decide(&mut hand, up, split_aces)? {
                Phase::PlayerBusted => self.settle(&hand, HandOutcome::Bust, true),
                _ => {
                    if dealer_phase == Phase::Dealt {
                        dealer_phase = self.play_dealer(&mut dealer)?;
                    }
                    let outcome = showdown(&hand, &dealer, dealer_phase);
                    self.settle(&hand, outcome, true)
                }
            };
            hands.push(report);
        }

        Ok(RoundReport {
            dealer_cards: dealer.cards().to_vec(),
            dealer_total: dealer.count(),
            dealer_phase,
            hands,
        })
    }

    /// Hit/stand loop. A doubled hand takes exactly one card; a split ace takes
    /// at most one beyond its dealt card.
    fn decide(&mut self, hand: &mut Hand, up: BjRank, split_aces: bool) -> SimResult<Phase> {
        let mut phase = Phase::PlayerDeciding;
        while phase == Phase::PlayerDeciding {
            let owes_card = hand.is_doubled() && hand.len() < 3;
            if !owes_card {
                if hand.count() == BLACKJACK {
                    phase = Phase::PlayerStanding;
                    continue;
                }
                let stands = if hand.is_soft() {
                    self.genome.soft_stand(hand.count(), up)?
                } else {
                    self.genome.hard_stand(hand.count(), up)?
                };
                if stands {
                    phase = Phase::PlayerStanding;
                    continue;
                }
            }
            if (split_aces || hand.is_doubled()) && hand.len() == 3 {
                phase = Phase::PlayerStanding;
                continue;
            }
            hand.add(self.draw()?);
            if hand.is_busted() {
                phase = Phase::PlayerBusted;
            }
        }
        Ok(phase)
    }

    fn play_dealer(&mut self, dealer: &mut Hand) -> SimResult<Phase> {
        let mut phase = Phase::DealerPlaying;
        while phase == Phase::DealerPlaying {
            if dealer.count() >= DEALER_STANDS_AT {
                phase = Phase::DealerStanding;
            } else {
                dealer.add(self.draw()?);
                if dealer.is_busted() {
                    phase = Phase::DealerBusted;
                }
            }
        }
        Ok(phase)
    }

    /// Moves chips for one finished hand and updates the counters.
    fn settle(&mut self, hand: &Hand, outcome: HandOutcome, from_split: bool) -> HandReport {
        let stake = if hand.is_doubled() {
            2 * self.table.bet
        } else {
            self.table.bet
        };
        let delta = match outcome {
            HandOutcome::Natural => self.table.natural_payout(),
            HandOutcome::Win => stake,
            HandOutcome::Push => 0,
            HandOutcome::Loss | HandOutcome::Bust => -stake,
        };
        self.player_bankroll += delta;
        self.dealer_bankroll -= delta;

        let stats = &mut self.stats;
        if outcome.is_win() {
            stats.hands_won += 1;
        } else if outcome.is_loss() {
            stats.hands_lost += 1;
        } else if outcome == HandOutcome::Push {
            stats.draws += 1;
        }
        if hand.is_doubled() {
            if outcome.is_win() {
                stats.doubled_won += 1;
            } else if outcome.is_loss() {
                stats.doubled_lost += 1;
            }
        }
        if from_split {
            if outcome.is_win() {
                stats.split_hands_won += 1;
            } else if outcome.is_loss() {
                stats.split_hands_lost += 1;
            }
        }
        stats.trajectory.push(self.player_bankroll);

        HandReport {
            cards: hand.cards().to_vec(),
            total: hand.count(),
            soft: hand.is_soft(),
            doubled: hand.is_doubled(),
            from_split,
            outcome,
            delta,
        }
    }
}

fn showdown(player: &Hand, dealer: &Hand, dealer_phase: Phase) -> HandOutcome {
    if dealer_phase == Phase::DealerBusted {
        return HandOutcome::Win;
    }
    match player.count().cmp(&dealer.count()) {
        std::cmp::Ordering::Greater => HandOutcome::Win,
        std::cmp::Ordering::Equal => HandOutcome::Push,
        std::cmp::Ordering::Less => HandOutcome::Loss,
    }
}
