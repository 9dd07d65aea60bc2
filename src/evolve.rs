//! Genetic search over strategy genomes.
//!
//! Each generation every individual is scored on a private copy of its game,
//! the fittest `selection_rate` share is kept as the elite, and the rest of the
//! population is bred from elite parents by fitness-weighted uniform crossover
//! with point mutation.

use log::{debug, info, warn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::engine::{Game, TableConfig};
use crate::error::{SimError, SimResult};
use crate::genome::{Genome, MeanGenome};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolveConfig {
    pub table: TableConfig,
    /// Chance that an allele both parents share is passed on unmutated.
    pub propagation_rate: f64,
    /// Share of the population kept as the elite.
    pub selection_rate: f64,
    pub population_size: usize,
    pub rounds_per_evaluation: usize,
    pub generations: usize,
    pub seed: Option<u64>,
    /// Score individuals on the rayon pool.
    pub parallel: bool,
}

impl Default for EvolveConfig {
    fn default() -> Self {
        EvolveConfig {
            table: TableConfig {
                player_bankroll: 10000,
                dealer_bankroll: 10000,
                bet: 2,
            },
            propagation_rate: 0.9999,
            selection_rate: 0.05,
            population_size: 5000,
            rounds_per_evaluation: 10000,
            generations: 5,
            seed: None,
            parallel: true,
        }
    }
}

impl EvolveConfig {
    pub fn elite_size(&self) -> usize {
        (self.selection_rate * self.population_size as f64).floor() as usize
    }

    pub fn validate(&self) -> SimResult<()> {
        self.table.validate()?;
        if !(0.0..=1.0).contains(&self.propagation_rate) {
            return Err(SimError::Config(
                "Propagation rate must be between 0 and 1".to_string(),
            ));
        }
        if !(self.selection_rate > 0.0 && self.selection_rate <= 1.0) {
            return Err(SimError::Config(
                "Selection rate must be in (0, 1]".to_string(),
            ));
        }
        if self.population_size < 2 {
            return Err(SimError::Config(
                "Population size must be at least 2".to_string(),
            ));
        }
        if self.rounds_per_evaluation < 1 {
            return Err(SimError::Config(
                "Rounds per evaluation must be at least 1".to_string(),
            ));
        }
        let elite = self.elite_size();
        if elite == 0 {
            return Err(SimError::Config(format!(
                "Selection rate {} keeps no individuals out of {}",
                self.selection_rate, self.population_size
            )));
        }
        if elite == 1 && elite < self.population_size {
            return Err(SimError::Config(
                "An elite of one cannot breed: at least two distinct parents are needed".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

/// Normalized final bankroll; a broke player scores exactly zero.
pub fn fitness_of(final_bankroll: i64, initial_bankroll: i64) -> f64 {
    if final_bankroll <= 0 {
        0.0
    } else {
        final_bankroll as f64 / initial_bankroll as f64
    }
}

/// Plays `rounds` rounds on a copy of `game` with fresh bankrolls and a shoe
/// shuffled from `seed`. The live game is untouched.
pub fn score_individual(game: &Game, rounds: usize, seed: u64) -> SimResult<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut trial = game.clone();
    trial.reset_bankrolls();
    trial.reset_stats();
    trial.reshuffle(&mut rng);
    trial.play(rounds, &mut rng)?;
    Ok(fitness_of(
        trial.player_bankroll(),
        trial.table().player_bankroll,
    ))
}

/// Roulette-wheel selection: the first index whose cumulative share of the
/// total exceeds a uniform draw. Uniform when every fitness is zero.
pub fn select_parent<R: Rng + ?Sized>(fitness: &[f64], rng: &mut R) -> usize {
    let total: f64 = fitness.iter().sum();
    if total <= 0.0 {
        return rng.gen_range(0..fitness.len());
    }
    let draw: f64 = rng.gen();
    let mut cumulative = 0.0;
    for (i, f) in fitness.iter().enumerate() {
        cumulative += f / total;
        if cumulative > draw {
            return i;
        }
    }
    fitness.len() - 1
}

/// Second parent, distinct from `first`. Same distribution as redrawing
/// `select_parent` until the index differs, without the unbounded loop when
/// `first` holds all the weight.
pub fn select_mate<R: Rng + ?Sized>(fitness: &[f64], first: usize, rng: &mut R) -> usize {
    let masked: Vec<f64> = fitness
        .iter()
        .enumerate()
        .map(|(i, &f)| if i == first { 0.0 } else { f })
        .collect();
    if masked.iter().sum::<f64>() <= 0.0 {
        let k = rng.gen_range(0..fitness.len() - 1);
        return if k >= first { k + 1 } else { k };
    }
    let pick = select_parent(&masked, rng);
    if pick != first {
        return pick;
    }
    // Rounding pushed the walk to the end of the wheel.
    masked
        .iter()
        .rposition(|&f| f > 0.0)
        .unwrap_or(if first == 0 { 1 } else { 0 })
}

/// Uniform crossover. Shared alleles survive with probability `propagate`
/// and flip otherwise; differing alleles come from `a` with probability
/// `fa / (fa + fb)` (even odds when both are zero).
pub fn crossover<R: Rng + ?Sized>(
    a: &Genome,
    b: &Genome,
    fa: f64,
    fb: f64,
    propagate: f64,
    rng: &mut R,
) -> SimResult<Genome> {
    let from_a = if fa + fb > 0.0 { fa / (fa + fb) } else { 0.5 };
    let flat: Vec<u8> = a
        .to_flat()
        .into_iter()
        .zip(b.to_flat())
        .map(|(x, y)| {
            if x == y {
                if rng.gen::<f64>() < propagate {
                    x
                } else {
                    1 - x
                }
            } else if rng.gen::<f64>() < from_a {
                x
            } else {
                y
            }
        })
        .collect();
    Genome::from_flat(&flat)
}

// ---------------------------------------------------------------------------
// Population
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationReport {
    pub generation: usize,
    pub elite_mean: f64,
    pub best: f64,
    pub bankrupt: usize,
}

#[derive(Debug, Clone)]
pub struct Population {
    config: EvolveConfig,
    individuals: Vec<Game>,
    /// Fitness of the current individuals; empty until scored.
    fitness: Vec<f64>,
    scores: Vec<f64>,
    generation: usize,
    rng: ChaCha8Rng,
}

impl Population {
    /// Random genomes throughout.
    pub fn new(config: EvolveConfig) -> SimResult<Population> {
        config.validate()?;
        let mut rng = master_rng(config.seed);
        let genomes = (0..config.population_size)
            .map(|_| Genome::random(&mut rng))
            .collect();
        Population::build(config, genomes, rng)
    }

    /// Every individual starts from a copy of `seed`.
    pub fn from_seed_genome(config: EvolveConfig, seed: &Genome) -> SimResult<Population> {
        config.validate()?;
        let rng = master_rng(config.seed);
        let genomes = vec![seed.clone(); config.population_size];
        Population::build(config, genomes, rng)
    }

    pub fn from_genomes(config: EvolveConfig, genomes: Vec<Genome>) -> SimResult<Population> {
        config.validate()?;
        if genomes.len() != config.population_size {
            return Err(SimError::Config(format!(
                "Expected {} genomes, got {}",
                config.population_size,
                genomes.len()
            )));
        }
        let rng = master_rng(config.seed);
        Population::build(config, genomes, rng)
    }

    fn build(
        config: EvolveConfig,
        genomes: Vec<Genome>,
        mut rng: ChaCha8Rng,
    ) -> SimResult<Population> {
        let individuals = genomes
            .into_iter()
            .map(|g| Game::shuffled(g, config.table, &mut rng))
            .collect::<SimResult<Vec<_>>>()?;
        Ok(Population {
            config,
            individuals,
            fitness: Vec::new(),
            scores: Vec::new(),
            generation: 0,
            rng,
        })
    }

    pub fn config(&self) -> &EvolveConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    pub fn individuals(&self) -> &[Game] {
        &self.individuals
    }

    pub fn genomes(&self) -> impl Iterator<Item = &Genome> {
        self.individuals.iter().map(|g| g.genome())
    }

    pub fn fitness(&self) -> &[f64] {
        &self.fitness
    }

    /// Mean elite fitness of every generation bred so far.
    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Scores every individual on a private copy. Per-individual seeds are
    /// drawn up front, so parallel and sequential scoring agree exactly.
    pub fn score_population(&mut self) -> SimResult<()> {
        let seeds: Vec<u64> = (0..self.individuals.len())
            .map(|_| self.rng.gen())
            .collect();
        let rounds = self.config.rounds_per_evaluation;

        let results: Vec<SimResult<f64>> = if self.config.parallel {
            self.individuals
                .par_iter()
                .zip(seeds.par_iter())
                .map(|(game, &seed)| score_individual(game, rounds, seed))
                .collect()
        } else {
            self.individuals
                .iter()
                .zip(seeds.iter())
                .map(|(game, &seed)| score_individual(game, rounds, seed))
                .collect()
        };
        self.fitness = results.into_iter().collect::<SimResult<Vec<_>>>()?;

        for (i, f) in self.fitness.iter().enumerate() {
            debug!("generation {} individual {}: fitness {:.4}", self.generation, i, f);
        }
        Ok(())
    }

    /// Indices of the current elite, least fit first. Scores the population
    /// if it has not been scored since the last breeding step.
    fn elite_indices(&mut self) -> SimResult<Vec<usize>> {
        if self.fitness.len() != self.individuals.len() {
            self.score_population()?;
        }
        let mut order: Vec<usize> = (0..self.individuals.len()).collect();
        let fitness = &self.fitness;
        order.sort_by(|&a, &b| {
            fitness[a]
                .partial_cmp(&fitness[b])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let keep = self.config.elite_size();
        Ok(order.split_off(order.len() - keep))
    }

    /// Replaces the population: the elite survives with reset bankrolls and
    /// the remaining slots are filled with offspring of distinct elite parents.
    pub fn advance_generation(&mut self) -> SimResult<GenerationReport> {
        let elite = self.elite_indices()?;
        let elite_fitness: Vec<f64> = elite.iter().map(|&i| self.fitness[i]).collect();
        let bankrupt = self.fitness.iter().filter(|&&f| f == 0.0).count();
        let best = elite_fitness.last().copied().unwrap_or(0.0);
        let elite_mean = elite_fitness.iter().sum::<f64>() / elite_fitness.len() as f64;

        if elite_fitness.iter().all(|&f| f == 0.0) {
            warn!(
                "generation {}: every elite individual went broke, choosing parents uniformly",
                self.generation
            );
        }

        let m = self.individuals.len();
        let mut next: Vec<Game> = Vec::with_capacity(m);
        for &i in &elite {
            let mut survivor = self.individuals[i].clone();
            survivor.reset_bankrolls();
            survivor.reset_stats();
            next.push(survivor);
        }
        while next.len() < m {
            let i = select_parent(&elite_fitness, &mut self.rng);
            let j = select_mate(&elite_fitness, i, &mut self.rng);
            let child = crossover(
                next[i].genome(),
                next[j].genome(),
                elite_fitness[i],
                elite_fitness[j],
                self.config.propagation_rate,
                &mut self.rng,
            )?;
            next.push(Game::shuffled(child, self.config.table, &mut self.rng)?);
        }

        self.individuals = next;
        self.fitness.clear();
        self.scores.push(elite_mean);
        self.generation += 1;

        let report = GenerationReport {
            generation: self.generation,
            elite_mean,
            best,
            bankrupt,
        };
        info!(
            "generation {}: elite mean fitness {:.4}, best {:.4}, {} broke",
            report.generation, report.elite_mean, report.best, report.bankrupt
        );
        Ok(report)
    }

    /// Scores and breeds `generations` times.
    pub fn evolve(&mut self, generations: usize) -> SimResult<Vec<GenerationReport>> {
        let mut reports = Vec::with_capacity(generations);
        for _ in 0..generations {
            self.score_population()?;
            reports.push(self.advance_generation()?);
        }
        Ok(reports)
    }

    /// Elite genomes with their fitness, least fit first. The current
    /// individuals are scored first if breeding left them unscored, so the
    /// offspring of the last generation compete with the survivors.
    pub fn elite(&mut self) -> SimResult<Vec<(Genome, f64)>> {
        let idx = self.elite_indices()?;
        Ok(idx
            .iter()
            .map(|&i| (self.individuals[i].genome().clone(), self.fitness[i]))
            .collect())
    }

    /// Fitness-weighted mean of the elite genomes.
    pub fn elite_mean_genome(&mut self) -> SimResult<MeanGenome> {
        let elite = self.elite()?;
        let members: Vec<(&Genome, f64)> = elite.iter().map(|(g, f)| (g, *f)).collect();
        MeanGenome::weighted(&members)
    }

    /// The fittest elite genome.
    pub fn best(&mut self) -> SimResult<(Genome, f64)> {
        self.elite()?
            .pop()
            .ok_or_else(|| SimError::Config("population has no elite".to_string()))
    }
}

fn master_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}
