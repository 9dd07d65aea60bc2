use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;

use crate::engine::{Game, RunStats, TableConfig};
use crate::error::SimResult;
use crate::evolve::fitness_of;
use crate::genome::Genome;

/// `num / den`, or `None` when nothing was counted.
pub fn ratio(num: u64, den: u64) -> Option<f64> {
    if den == 0 {
        None
    } else {
        Some(num as f64 / den as f64)
    }
}

/// Outcome of one fixed-strategy run. Win/loss/draw rates are per settled
/// hand; double and split rates are per round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub seed: u64,
    pub rounds_played: u64,
    pub hands_settled: u64,
    pub hands_won: u64,
    pub hands_lost: u64,
    pub draws: u64,
    pub final_bankroll: i64,
    pub final_dealer_bankroll: i64,
    pub fitness: f64,
    pub bankrupt: bool,
    pub win_rate: Option<f64>,
    pub loss_rate: Option<f64>,
    pub draw_rate: Option<f64>,
    pub edge: Option<f64>,
    pub double_rate: Option<f64>,
    pub double_win_rate: Option<f64>,
    pub double_loss_rate: Option<f64>,
    pub split_rate: Option<f64>,
    pub split_win_rate: Option<f64>,
    pub split_loss_rate: Option<f64>,
}

impl RunSummary {
    pub fn from_game(game: &Game, seed: u64) -> RunSummary {
        let stats = game.stats();
        let settled = stats.hands_settled();
        let win_rate = ratio(stats.hands_won, settled);
        let loss_rate = ratio(stats.hands_lost, settled);
        RunSummary {
            seed,
            rounds_played: stats.rounds_played,
            hands_settled: settled,
            hands_won: stats.hands_won,
            hands_lost: stats.hands_lost,
            draws: stats.draws,
            final_bankroll: game.player_bankroll(),
            final_dealer_bankroll: game.dealer_bankroll(),
            fitness: fitness_of(game.player_bankroll(), game.table().player_bankroll),
            bankrupt: stats.bankrupt,
            win_rate,
            loss_rate,
            draw_rate: ratio(stats.draws, settled),
            edge: win_rate.zip(loss_rate).map(|(w, l)| w - l),
            double_rate: ratio(stats.doubled, stats.rounds_played),
            double_win_rate: ratio(stats.doubled_won, stats.doubled),
            double_loss_rate: ratio(stats.doubled_lost, stats.doubled),
            split_rate: ratio(stats.splits, stats.rounds_played),
            split_win_rate: ratio(stats.split_hands_won, 2 * stats.splits),
            split_loss_rate: ratio(stats.split_hands_lost, 2 * stats.splits),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Evaluation {
    pub summary: RunSummary,
    pub stats: RunStats,
}

/// Plays `rounds` rounds of `genome` from a shoe shuffled with `seed`.
pub fn evaluate(
    genome: &Genome,
    table: TableConfig,
    rounds: usize,
    seed: u64,
) -> SimResult<Evaluation> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut game = Game::shuffled(genome.clone(), table, &mut rng)?;
    game.play(rounds, &mut rng)?;
    Ok(Evaluation {
        summary: RunSummary::from_game(&game, seed),
        stats: game.stats().clone(),
    })
}

/// `runs` independent evaluations. Run seeds are derived from `seed` before
/// any run starts, so `parallel` does not change the results.
pub fn batch(
    genome: &Genome,
    table: TableConfig,
    rounds: usize,
    runs: usize,
    seed: u64,
    parallel: bool,
) -> SimResult<Vec<RunSummary>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let seeds: Vec<u64> = (0..runs).map(|_| rng.gen()).collect();

    let results: Vec<SimResult<RunSummary>> = if parallel {
        seeds
            .par_iter()
            .map(|&s| evaluate(genome, table, rounds, s).map(|e| e.summary))
            .collect()
    } else {
        seeds
            .iter()
            .map(|&s| evaluate(genome, table, rounds, s).map(|e| e.summary))
            .collect()
    };
    results.into_iter().collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchAggregate {
    pub runs: usize,
    pub bankrupt: usize,
    pub mean_fitness: f64,
    pub mean_final_bankroll: f64,
    pub mean_edge: Option<f64>,
}

pub fn aggregate(summaries: &[RunSummary]) -> BatchAggregate {
    let runs = summaries.len();
    let n = runs.max(1) as f64;
    let edges: Vec<f64> = summaries.iter().filter_map(|s| s.edge).collect();
    BatchAggregate {
        runs,
        bankrupt: summaries.iter().filter(|s| s.bankrupt).count(),
        mean_fitness: summaries.iter().map(|s| s.fitness).sum::<f64>() / n,
        mean_final_bankroll: summaries.iter().map(|s| s.final_bankroll as f64).sum::<f64>() / n,
        mean_edge: if edges.is_empty() {
            None
        } else {
            Some(edges.iter().sum::<f64>() / edges.len() as f64)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_guards_zero_denominator() {
        assert_eq!(ratio(3, 0), None);
        assert_eq!(ratio(1, 4), Some(0.25));
    }

    #[test]
    fn zero_rounds_has_no_rates() {
        let eval = evaluate(&Genome::empty(), TableConfig::default(), 0, 1).unwrap();
        assert_eq!(eval.summary.rounds_played, 0);
        assert_eq!(eval.summary.win_rate, None);
        assert_eq!(eval.summary.split_win_rate, None);
        assert_eq!(eval.summary.fitness, 1.0);
    }

    #[test]
    fn aggregate_of_nothing() {
        let agg = aggregate(&[]);
        assert_eq!(agg.runs, 0);
        assert_eq!(agg.mean_edge, None);
    }
}
