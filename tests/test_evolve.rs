use approx::assert_relative_eq;
use bj_evolve::basic::basic_strategy;
use bj_evolve::engine::TableConfig;
use bj_evolve::evolve::*;
use bj_evolve::genome::{Genome, GENOME_LEN};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn config(seed: u64) -> EvolveConfig {
    EvolveConfig {
        table: TableConfig {
            player_bankroll: 200,
            dealer_bankroll: 200,
            bet: 2,
        },
        propagation_rate: 0.99,
        selection_rate: 0.25,
        population_size: 12,
        rounds_per_evaluation: 50,
        generations: 3,
        seed: Some(seed),
        parallel: false,
    }
}

#[test]
fn test_population_size_is_constant() {
    let mut pop = Population::new(config(1)).unwrap();
    let reports = pop.evolve(3).unwrap();
    assert_eq!(reports.len(), 3);
    assert_eq!(pop.len(), 12);
    assert_eq!(pop.generation(), 3);
    assert_eq!(pop.scores().len(), 3);
}

#[test]
fn test_elite_survives_with_fresh_bankrolls() {
    let mut pop = Population::new(config(2)).unwrap();
    pop.score_population().unwrap();

    let fitness = pop.fitness().to_vec();
    let mut order: Vec<usize> = (0..fitness.len()).collect();
    order.sort_by(|&a, &b| fitness[a].partial_cmp(&fitness[b]).unwrap());
    let elite: Vec<Genome> = order[order.len() - 3..]
        .iter()
        .map(|&i| pop.individuals()[i].genome().clone())
        .collect();
    let elite_mean = order[order.len() - 3..].iter().map(|&i| fitness[i]).sum::<f64>() / 3.0;

    let report = pop.advance_generation().unwrap();
    assert_relative_eq!(report.elite_mean, elite_mean);
    for (game, genome) in pop.individuals().iter().zip(elite.iter()) {
        assert_eq!(game.genome(), genome);
        assert_eq!(game.player_bankroll(), 200);
        assert_eq!(game.dealer_bankroll(), 200);
    }
    assert_eq!(pop.len(), 12);
}

#[test]
fn test_scoring_leaves_live_individuals_untouched() {
    let mut pop = Population::new(config(3)).unwrap();
    let before: Vec<Genome> = pop.genomes().cloned().collect();
    pop.score_population().unwrap();
    let after: Vec<Genome> = pop.genomes().cloned().collect();
    assert_eq!(before, after);
    for game in pop.individuals() {
        assert_eq!(game.player_bankroll(), 200);
        assert_eq!(game.stats().rounds_played, 0);
    }
}

#[test]
fn test_parallel_scoring_matches_sequential() {
    let mut sequential = Population::new(config(4)).unwrap();
    let mut parallel = Population::new(EvolveConfig {
        parallel: true,
        ..config(4)
    })
    .unwrap();
    sequential.score_population().unwrap();
    parallel.score_population().unwrap();
    assert_eq!(sequential.fitness(), parallel.fitness());
}

#[test]
fn test_same_seed_same_run() {
    let mut a = Population::new(config(5)).unwrap();
    let mut b = Population::new(config(5)).unwrap();
    a.evolve(2).unwrap();
    b.evolve(2).unwrap();
    assert_eq!(a.scores(), b.scores());
    let ga: Vec<&Genome> = a.genomes().collect();
    let gb: Vec<&Genome> = b.genomes().collect();
    assert_eq!(ga, gb);
}

#[test]
fn test_fitness_is_zero_when_broke() {
    let table = TableConfig {
        player_bankroll: 2,
        dealer_bankroll: 10_000,
        bet: 2,
    };
    // Always hitting to 21 goes broke quickly with a two-chip bankroll.
    let mut rng = ChaCha8Rng::seed_from_u64(6);
    let game = bj_evolve::engine::Game::shuffled(Genome::empty(), table, &mut rng).unwrap();
    let broke = (0..50)
        .map(|seed| score_individual(&game, 500, seed).unwrap())
        .filter(|&f| f == 0.0)
        .count();
    assert!(broke > 0);
    for seed in 0..50 {
        let f = score_individual(&game, 500, seed).unwrap();
        assert!(f == 0.0 || f >= 0.5);
    }
}

#[test]
fn test_seeded_population_starts_from_seed_genome() {
    let seed = basic_strategy();
    let pop = Population::from_seed_genome(config(7), &seed).unwrap();
    assert!(pop.genomes().all(|g| *g == seed));
}

#[test]
fn test_from_genomes_checks_count() {
    let genomes = vec![Genome::empty(); 5];
    assert!(Population::from_genomes(config(8), genomes).is_err());
}

#[test]
fn test_elite_mean_genome_before_and_after_breeding() {
    let mut pop = Population::new(config(9)).unwrap();
    let mean = pop.elite_mean_genome().unwrap();
    assert_eq!(mean.as_slice().len(), GENOME_LEN);
    assert!(mean.as_slice().iter().all(|p| (0.0..=1.0).contains(p)));

    pop.evolve(1).unwrap();
    let mean = pop.elite_mean_genome().unwrap();
    assert!(mean.as_slice().iter().all(|p| (0.0..=1.0).contains(p)));
    let (_, best) = pop.best().unwrap();
    assert!(best >= 0.0);
}

#[test]
fn test_crossover_prefers_the_fitter_parent() {
    let mut rng = ChaCha8Rng::seed_from_u64(10);
    let a = Genome::from_flat(&[1u8; GENOME_LEN]).unwrap();
    let b = Genome::from_flat(&[0u8; GENOME_LEN]).unwrap();
    let all_a = crossover(&a, &b, 1.0, 0.0, 1.0, &mut rng).unwrap();
    assert_eq!(all_a, a);
    let all_b = crossover(&a, &b, 0.0, 2.0, 1.0, &mut rng).unwrap();
    assert_eq!(all_b, b);
    let mixed = crossover(&a, &b, 0.0, 0.0, 1.0, &mut rng).unwrap();
    let ones = mixed.to_flat().iter().filter(|&&x| x == 1).count();
    assert!(ones > 300 && ones < 500);
}

#[test]
fn test_selection_tracks_fitness_share() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let fitness = [1.0, 3.0];
    let picks = (0..4000)
        .filter(|_| select_parent(&fitness, &mut rng) == 1)
        .count();
    let share = picks as f64 / 4000.0;
    assert!((share - 0.75).abs() < 0.05);
}

#[test]
fn test_uniform_selection_when_all_broke() {
    let mut rng = ChaCha8Rng::seed_from_u64(12);
    let fitness = [0.0; 4];
    let mut seen = [false; 4];
    for _ in 0..200 {
        seen[select_parent(&fitness, &mut rng)] = true;
        let first = select_parent(&fitness, &mut rng);
        assert_ne!(select_mate(&fitness, first, &mut rng), first);
    }
    assert!(seen.iter().all(|&s| s));
}

#[test]
fn test_invalid_config_is_rejected() {
    assert!(Population::new(EvolveConfig {
        population_size: 1,
        ..config(0)
    })
    .is_err());
    assert!(Population::new(EvolveConfig {
        rounds_per_evaluation: 0,
        ..config(0)
    })
    .is_err());
}

fn top_three(fitness: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..fitness.len()).collect();
    order.sort_by(|&a, &b| fitness[a].partial_cmp(&fitness[b]).unwrap());
    order.split_off(order.len() - 3)
}

#[test]
fn test_elite_after_breeding_is_ranked_on_fresh_scores() {
    let mut pop = Population::new(config(1)).unwrap();
    pop.evolve(1).unwrap();
    assert!(pop.fitness().is_empty());

    let elite = pop.elite().unwrap();
    assert_eq!(pop.fitness().len(), 12);
    let top = top_three(pop.fitness());
    assert_eq!(elite.len(), 3);
    for ((genome, f), &i) in elite.iter().zip(top.iter()) {
        assert_eq!(genome, pop.individuals()[i].genome());
        assert_relative_eq!(*f, pop.fitness()[i]);
    }
}

#[test]
fn test_offspring_can_enter_the_reported_elite() {
    let from_offspring = (1..=6).any(|seed| {
        let mut pop = Population::new(config(seed)).unwrap();
        pop.evolve(1).unwrap();
        pop.elite().unwrap();
        top_three(pop.fitness()).iter().any(|&i| i >= 3)
    });
    assert!(from_offspring);
}
