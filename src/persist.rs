//! Reading and writing genomes, series and configuration.
//!
//! Genomes and series are one line of comma-separated values. Configuration
//! is JSON.

use std::fmt::Display;
use std::fs;
use std::path::Path;

use itertools::Itertools;

use crate::error::{SimError, SimResult};
use crate::evolve::EvolveConfig;
use crate::genome::{Genome, MeanGenome};

/// Either kind of strategy file.
#[derive(Debug, Clone, PartialEq)]
pub enum GenomeFile {
    Binary(Genome),
    Mean(MeanGenome),
}

pub fn to_csv_line<T: Display>(values: &[T]) -> String {
    values.iter().join(",")
}

fn parse_values(text: &str) -> SimResult<Vec<f64>> {
    let values = text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|tok| !tok.is_empty())
        .enumerate()
        .map(|(i, tok)| {
            tok.parse::<f64>()
                .map_err(|_| SimError::Parse(format!("entry {} is not a number: '{}'", i, tok)))
        })
        .collect::<SimResult<Vec<f64>>>()?;
    if values.is_empty() {
        return Err(SimError::Parse("no values found".to_string()));
    }
    Ok(values)
}

pub fn genome_to_csv(genome: &Genome) -> String {
    to_csv_line(&genome.to_flat())
}

pub fn parse_genome_csv(text: &str) -> SimResult<Genome> {
    let values = parse_values(text)?;
    let mut flat = Vec::with_capacity(values.len());
    for (index, v) in values.into_iter().enumerate() {
        if v == 0.0 || v == 1.0 {
            flat.push(v as u8);
        } else if v.fract() == 0.0 {
            return Err(SimError::InvalidAllele {
                index,
                value: v as i64,
            });
        } else {
            return Err(SimError::Parse(format!(
                "genome entry {} is {}, expected 0 or 1",
                index, v
            )));
        }
    }
    Genome::from_flat(&flat)
}

pub fn mean_genome_to_csv(mean: &MeanGenome) -> String {
    to_csv_line(mean.as_slice())
}

pub fn parse_mean_genome_csv(text: &str) -> SimResult<MeanGenome> {
    MeanGenome::from_flat(&parse_values(text)?)
}

/// A 0/1 file parses as a genome; anything else with valid probabilities as
/// a mean genome.
pub fn parse_any_genome_csv(text: &str) -> SimResult<GenomeFile> {
    let values = parse_values(text)?;
    if values.iter().all(|&v| v == 0.0 || v == 1.0) {
        let flat: Vec<u8> = values.iter().map(|&v| v as u8).collect();
        Ok(GenomeFile::Binary(Genome::from_flat(&flat)?))
    } else {
        Ok(GenomeFile::Mean(MeanGenome::from_flat(&values)?))
    }
}

pub fn read_genome<P: AsRef<Path>>(path: P) -> SimResult<Genome> {
    parse_genome_csv(&fs::read_to_string(path)?)
}

pub fn read_mean_genome<P: AsRef<Path>>(path: P) -> SimResult<MeanGenome> {
    parse_mean_genome_csv(&fs::read_to_string(path)?)
}

pub fn read_any_genome<P: AsRef<Path>>(path: P) -> SimResult<GenomeFile> {
    parse_any_genome_csv(&fs::read_to_string(path)?)
}

pub fn write_genome<P: AsRef<Path>>(path: P, genome: &Genome) -> SimResult<()> {
    write_line(path, &genome_to_csv(genome))
}

pub fn write_mean_genome<P: AsRef<Path>>(path: P, mean: &MeanGenome) -> SimResult<()> {
    write_line(path, &mean_genome_to_csv(mean))
}

/// Fitness scores, bankroll trajectories and the like.
pub fn write_series<P: AsRef<Path>, T: Display>(path: P, values: &[T]) -> SimResult<()> {
    write_line(path, &to_csv_line(values))
}

fn write_line<P: AsRef<Path>>(path: P, line: &str) -> SimResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, format!("{}\n", line))?;
    Ok(())
}

/// Missing fields take their defaults.
pub fn load_config<P: AsRef<Path>>(path: P) -> SimResult<EvolveConfig> {
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

pub fn save_config<P: AsRef<Path>>(path: P, config: &EvolveConfig) -> SimResult<()> {
    let json = serde_json::to_string_pretty(config)?;
    write_line(path, &json)
}
