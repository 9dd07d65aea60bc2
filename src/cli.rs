use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use log::info;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::basic::basic_strategy;
use crate::display::{
    batch_table, generation_table, genome_tables, mean_tables, print_error, print_section,
    print_success, summary_table,
};
use crate::engine::TableConfig;
use crate::error::{SimError, SimResult};
use crate::evaluate::{aggregate, batch, evaluate};
use crate::evolve::{EvolveConfig, Population};
use crate::genome::{Genome, DEFAULT_THRESHOLD};
use crate::persist::{self, GenomeFile};

#[derive(Parser)]
#[command(
    name = "bjevo",
    version = "1.0.0",
    about = "Evolve and evaluate blackjack playing strategies."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Bankroll and bet overrides shared by the subcommands.
#[derive(Args, Clone, Default)]
struct TableArgs {
    /// Starting player bankroll
    #[arg(long)]
    player_bankroll: Option<i64>,
    /// Starting dealer bankroll
    #[arg(long)]
    dealer_bankroll: Option<i64>,
    /// Fixed bet per hand
    #[arg(long)]
    bet: Option<i64>,
}

impl TableArgs {
    fn apply(&self, table: &mut TableConfig) {
        if let Some(v) = self.player_bankroll {
            table.player_bankroll = v;
        }
        if let Some(v) = self.dealer_bankroll {
            table.dealer_bankroll = v;
        }
        if let Some(v) = self.bet {
            table.bet = v;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Evolve a strategy with a genetic algorithm
    Evolve {
        #[command(flatten)]
        table: TableArgs,
        /// Chance a shared allele is inherited unmutated
        #[arg(long)]
        propagation_rate: Option<f64>,
        /// Share of the population kept as the elite
        #[arg(long)]
        selection_rate: Option<f64>,
        /// Number of individuals
        #[arg(short = 'p', long = "population")]
        population_size: Option<usize>,
        /// Rounds played to score each individual
        #[arg(short, long)]
        rounds: Option<usize>,
        /// Generations to breed
        #[arg(short, long)]
        generations: Option<usize>,
        /// Seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,
        /// Score individuals on one thread
        #[arg(long)]
        sequential: bool,
        /// JSON configuration file; flags override its values
        #[arg(long)]
        config: Option<PathBuf>,
        /// Start every individual from this 0/1 genome
        #[arg(long, conflicts_with = "from_mean")]
        from: Option<PathBuf>,
        /// Start every individual from a sample of this probability genome
        #[arg(long)]
        from_mean: Option<PathBuf>,
        /// Output directory for chrom.csv, best.csv and scores.csv
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
    /// Play a fixed strategy and report outcome rates
    Simulate {
        /// 0/1 genome file (default: basic strategy)
        #[arg(long)]
        genome: Option<PathBuf>,
        #[command(flatten)]
        table: TableArgs,
        /// Rounds per run
        #[arg(short, long, default_value_t = 10000)]
        rounds: usize,
        /// Independent runs
        #[arg(long, default_value_t = 1)]
        runs: usize,
        /// Seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,
        /// Run on one thread
        #[arg(long)]
        sequential: bool,
        /// Write the first run's bankroll after every hand to this file
        #[arg(long)]
        trajectory: Option<PathBuf>,
    },
    /// Print the basic strategy tables
    Basic {
        /// Also write the basic strategy genome to this file
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print the tables of a 0/1 or probability genome file
    Show {
        /// Genome file
        path: PathBuf,
    },
    /// Turn a probability genome into a 0/1 strategy
    Binarize {
        /// Probability genome file, such as chrom.csv
        path: PathBuf,
        /// Cells at or above this probability are set
        #[arg(short, long, default_value_t = DEFAULT_THRESHOLD)]
        threshold: f64,
        /// Output 0/1 genome file
        #[arg(short, long, default_value = "strategy.csv")]
        out: PathBuf,
    },
}

pub fn run() {
    let cli = Cli::parse();
    dispatch(cli);
}

fn dispatch(cli: Cli) {
    let result = match cli.command {
        Commands::Evolve {
            table,
            propagation_rate,
            selection_rate,
            population_size,
            rounds,
            generations,
            seed,
            sequential,
            config,
            from,
            from_mean,
            out,
        } => {
            let overrides = EvolveOverrides {
                table,
                propagation_rate,
                selection_rate,
                population_size,
                rounds,
                generations,
                seed,
                sequential,
            };
            cmd_evolve(config, overrides, from, from_mean, out)
        }
        Commands::Simulate {
            genome,
            table,
            rounds,
            runs,
            seed,
            sequential,
            trajectory,
        } => cmd_simulate(genome, table, rounds, runs, seed, !sequential, trajectory),
        Commands::Basic { out } => cmd_basic(out),
        Commands::Show { path } => cmd_show(path),
        Commands::Binarize {
            path,
            threshold,
            out,
        } => cmd_binarize(path, threshold, out),
    };

    if let Err(e) = result {
        print_error(&e.to_string());
        std::process::exit(1);
    }
}

struct EvolveOverrides {
    table: TableArgs,
    propagation_rate: Option<f64>,
    selection_rate: Option<f64>,
    population_size: Option<usize>,
    rounds: Option<usize>,
    generations: Option<usize>,
    seed: Option<u64>,
    sequential: bool,
}

impl EvolveOverrides {
    fn apply(self, config: &mut EvolveConfig) {
        self.table.apply(&mut config.table);
        if let Some(v) = self.propagation_rate {
            config.propagation_rate = v;
        }
        if let Some(v) = self.selection_rate {
            config.selection_rate = v;
        }
        if let Some(v) = self.population_size {
            config.population_size = v;
        }
        if let Some(v) = self.rounds {
            config.rounds_per_evaluation = v;
        }
        if let Some(v) = self.generations {
            config.generations = v;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.sequential {
            config.parallel = false;
        }
    }
}

/// Stream for `--from-mean` sampling, kept apart from the population's
/// master stream.
fn sampling_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s.wrapping_add(1)),
        None => ChaCha8Rng::from_entropy(),
    }
}

fn cmd_evolve(
    config_path: Option<PathBuf>,
    overrides: EvolveOverrides,
    from: Option<PathBuf>,
    from_mean: Option<PathBuf>,
    out: PathBuf,
) -> SimResult<()> {
    let mut config = match config_path {
        Some(path) => persist::load_config(path)?,
        None => EvolveConfig::default(),
    };
    overrides.apply(&mut config);
    config.validate()?;

    let seed_genome = match (from, from_mean) {
        (Some(path), _) => Some(persist::read_genome(path)?),
        (None, Some(path)) => {
            let mean = persist::read_mean_genome(path)?;
            Some(mean.sample(&mut sampling_rng(config.seed)))
        }
        (None, None) => None,
    };

    println!(
        "{} population {}, elite {}, {} rounds each, {} generations",
        "Evolving:".cyan().bold(),
        config.population_size,
        config.elite_size(),
        config.rounds_per_evaluation,
        config.generations
    );

    let generations = config.generations;
    let mut population = match &seed_genome {
        Some(genome) => Population::from_seed_genome(config, genome)?,
        None => Population::new(config)?,
    };
    let reports = population.evolve(generations)?;
    let mean = population.elite_mean_genome()?;
    let (best, best_fitness) = population.best()?;

    let chrom = out.join("chrom.csv");
    let best_path = out.join("best.csv");
    let scores = out.join("scores.csv");
    persist::write_mean_genome(&chrom, &mean)?;
    persist::write_genome(&best_path, &best)?;
    persist::write_series(&scores, population.scores())?;
    info!("wrote {}, {} and {}", chrom.display(), best_path.display(), scores.display());

    if !reports.is_empty() {
        print_section("Generations", &generation_table(&reports));
    }
    print_section("Mean elite strategy", &mean_tables(&mean));
    print_success(&format!(
        "Best fitness {:.4}; strategies written to {}",
        best_fitness,
        out.display()
    ));
    Ok(())
}

fn cmd_simulate(
    genome_path: Option<PathBuf>,
    table_args: TableArgs,
    rounds: usize,
    runs: usize,
    seed: Option<u64>,
    parallel: bool,
    trajectory: Option<PathBuf>,
) -> SimResult<()> {
    let genome: Genome = match genome_path {
        Some(path) => persist::read_genome(path)?,
        None => basic_strategy(),
    };
    let mut table = TableConfig::default();
    table_args.apply(&mut table);
    table.validate()?;
    let seed = seed.unwrap_or_else(rand::random);

    let summaries = batch(&genome, table, rounds, runs.max(1), seed, parallel)?;
    if let [only] = summaries.as_slice() {
        print_section("Simulation", &summary_table(only));
    } else {
        print_section("Simulation", &batch_table(&summaries, &aggregate(&summaries)));
    }

    if let (Some(path), Some(first)) = (trajectory, summaries.first()) {
        let eval = evaluate(&genome, table, rounds, first.seed)?;
        persist::write_series(&path, &eval.stats.trajectory)?;
        print_success(&format!(
            "Wrote {} bankroll points to {}",
            eval.stats.trajectory.len(),
            path.display()
        ));
    }
    Ok(())
}

fn cmd_basic(out: Option<PathBuf>) -> SimResult<()> {
    let genome = basic_strategy();
    print_section("Basic strategy", &genome_tables(&genome));
    if let Some(path) = out {
        persist::write_genome(&path, &genome)?;
        print_success(&format!("Wrote {}", path.display()));
    }
    Ok(())
}

fn cmd_show(path: PathBuf) -> SimResult<()> {
    let title = path.display().to_string();
    match persist::read_any_genome(&path)? {
        GenomeFile::Binary(genome) => print_section(&title, &genome_tables(&genome)),
        GenomeFile::Mean(mean) => print_section(&title, &mean_tables(&mean)),
    }
    Ok(())
}

fn cmd_binarize(path: PathBuf, threshold: f64, out: PathBuf) -> SimResult<()> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(SimError::Config(format!(
            "threshold must be within [0, 1], got {}",
            threshold
        )));
    }
    let mean = persist::read_mean_genome(&path)?;
    let genome = mean.threshold(threshold);
    persist::write_genome(&out, &genome)?;
    print_section(
        &format!("{} at {:.2}", path.display(), threshold),
        &genome_tables(&genome),
    );
    print_success(&format!("Wrote {}", out.display()));
    Ok(())
}
