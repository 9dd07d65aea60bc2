use std::path::PathBuf;

use approx::assert_relative_eq;
use bj_evolve::basic::basic_strategy;
use bj_evolve::evolve::EvolveConfig;
use bj_evolve::genome::{Genome, MeanGenome, Table, GENOME_LEN};
use bj_evolve::persist::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn scratch(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("bj-evolve-test-{}", std::process::id()))
        .join(name)
}

#[test]
fn test_genome_file_round_trip() {
    let mut g = Genome::random(&mut ChaCha8Rng::seed_from_u64(1));
    g.set_cell(Table::HardDouble, 19, 4, true);
    let path = scratch("genome.csv");
    write_genome(&path, &g).unwrap();
    assert_eq!(read_genome(&path).unwrap(), g);
}

#[test]
fn test_genome_csv_layout() {
    let csv = genome_to_csv(&basic_strategy());
    let fields: Vec<&str> = csv.split(',').collect();
    assert_eq!(fields.len(), GENOME_LEN);
    assert!(fields.iter().all(|f| *f == "0" || *f == "1"));
    // Split aces against every upcard come first.
    assert!(fields[..10].iter().all(|f| *f == "1"));
}

#[test]
fn test_mean_genome_file_round_trip() {
    let a = basic_strategy();
    let b = Genome::empty();
    let mean = MeanGenome::weighted(&[(&a, 2.0), (&b, 1.0)]).unwrap();
    let path = scratch("chrom.csv");
    write_mean_genome(&path, &mean).unwrap();
    let back = read_mean_genome(&path).unwrap();
    for (x, y) in mean.as_slice().iter().zip(back.as_slice()) {
        assert_relative_eq!(x, y);
    }
}

#[test]
fn test_any_genome_detects_kind() {
    let binary = genome_to_csv(&basic_strategy());
    assert!(matches!(parse_any_genome_csv(&binary).unwrap(), GenomeFile::Binary(_)));
    let probs = vec!["0.5"; GENOME_LEN].join(",");
    assert!(matches!(parse_any_genome_csv(&probs).unwrap(), GenomeFile::Mean(_)));
}

#[test]
fn test_series_file() {
    let path = scratch("scores.csv");
    write_series(&path, &[1.5, 0.25]).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "1.5,0.25\n");
}

#[test]
fn test_config_round_trip() {
    let cfg = EvolveConfig {
        population_size: 64,
        seed: Some(12),
        parallel: false,
        ..EvolveConfig::default()
    };
    let path = scratch("config.json");
    save_config(&path, &cfg).unwrap();
    assert_eq!(load_config(&path).unwrap(), cfg);
}

#[test]
fn test_missing_file_is_an_io_error() {
    assert!(matches!(
        read_genome(scratch("does-not-exist.csv")),
        Err(bj_evolve::error::SimError::Io(_))
    ));
}
