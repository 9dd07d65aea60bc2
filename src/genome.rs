//! Strategy genome: five yes/no decision tables and their flat 0/1 encoding.
//!
//! ```text
//! offset  table         rows                     cols
//!      0  split         pair rank  A,2..9,T (10)  dealer upcard A,2..9,T
//!    100  soft double   other rank A,2..9,T (10)  dealer upcard
//!    200  hard double   total 2..21 (20)          dealer upcard
//!    400  soft stand    total 2..21 (20)          dealer upcard
//!    600  hard stand    total 2..21 (20)          dealer upcard
//! ```
//!
//! Each table is serialized row-major. Four rows are never consulted during
//! play: soft double with a ten (that hand is a natural), hard double on 21,
//! and both stand rows for 21 (a made 21 always stands). Their stored bits are
//! kept and inherited so the flat form round-trips exactly, but lookups answer
//! with the fixed value instead.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::cards::BjRank;
use crate::error::{SimError, SimResult};

pub const COLS: usize = 10;
pub const RANK_ROWS: usize = 10;
pub const SUM_ROWS: usize = 20;
pub const GENOME_LEN: usize = 2 * RANK_ROWS * COLS + 3 * SUM_ROWS * COLS;

pub const MIN_TOTAL: u8 = 2;
pub const MAX_TOTAL: u8 = 21;

/// Row of a total-indexed table: `2 => 0, ..., 21 => 19`.
pub fn sum_index(total: u8) -> SimResult<usize> {
    if (MIN_TOTAL..=MAX_TOTAL).contains(&total) {
        Ok((total - MIN_TOTAL) as usize)
    } else {
        Err(SimError::SumOutOfDomain(total))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Table {
    Split,
    SoftDouble,
    HardDouble,
    SoftStand,
    HardStand,
}

pub const ALL_TABLES: [Table; 5] = [
    Table::Split,
    Table::SoftDouble,
    Table::HardDouble,
    Table::SoftStand,
    Table::HardStand,
];

impl Table {
    pub fn rows(self) -> usize {
        match self {
            Table::Split | Table::SoftDouble => RANK_ROWS,
            Table::HardDouble | Table::SoftStand | Table::HardStand => SUM_ROWS,
        }
    }

    pub fn len(self) -> usize {
        self.rows() * COLS
    }

    /// Position of this table's first cell in the flat encoding.
    pub fn offset(self) -> usize {
        match self {
            Table::Split => 0,
            Table::SoftDouble => RANK_ROWS * COLS,
            Table::HardDouble => 2 * RANK_ROWS * COLS,
            Table::SoftStand => 2 * RANK_ROWS * COLS + SUM_ROWS * COLS,
            Table::HardStand => 2 * RANK_ROWS * COLS + 2 * SUM_ROWS * COLS,
        }
    }

    /// The row that play never reads, and the answer lookups give for it.
    pub fn forced_row(self) -> Option<(usize, bool)> {
        match self {
            Table::Split => None,
            Table::SoftDouble => Some((BjRank::Ten.index(), false)),
            Table::HardDouble => Some((SUM_ROWS - 1, false)),
            Table::SoftStand | Table::HardStand => Some((SUM_ROWS - 1, true)),
        }
    }

    pub fn is_rank_indexed(self) -> bool {
        self.rows() == RANK_ROWS
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Table::Split => "split",
            Table::SoftDouble => "soft double down",
            Table::HardDouble => "hard double down",
            Table::SoftStand => "soft stand",
            Table::HardStand => "hard stand",
        }
    }

    /// Row label: a rank for rank-indexed tables, a total otherwise.
    pub fn row_label(self, row: usize) -> String {
        if self.is_rank_indexed() {
            BjRank::from_index(row)
                .map(|r| r.to_string())
                .unwrap_or_default()
        } else {
            (row as u8 + MIN_TOTAL).to_string()
        }
    }
}

type RankTable = [[bool; COLS]; RANK_ROWS];
type SumTable = [[bool; COLS]; SUM_ROWS];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genome {
    split: RankTable,
    soft_double: RankTable,
    hard_double: SumTable,
    soft_stand: SumTable,
    hard_stand: SumTable,
}

impl Genome {
    /// All-zero genome with the fixed rows written in.
    pub fn empty() -> Genome {
        let mut genome = Genome {
            split: [[false; COLS]; RANK_ROWS],
            soft_double: [[false; COLS]; RANK_ROWS],
            hard_double: [[false; COLS]; SUM_ROWS],
            soft_stand: [[false; COLS]; SUM_ROWS],
            hard_stand: [[false; COLS]; SUM_ROWS],
        };
        genome.write_forced_rows();
        genome
    }

    /// Every cell is a fair coin flip, then the fixed rows are written in.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Genome {
        let mut genome = Genome::empty();
        for table in ALL_TABLES {
            for row in genome.rows_mut(table).iter_mut() {
                for cell in row.iter_mut() {
                    *cell = rng.gen_bool(0.5);
                }
            }
        }
        genome.write_forced_rows();
        genome
    }

    /// Decodes an 800-entry 0/1 vector. Bits in the fixed rows are stored as
    /// given so that `to_flat` reproduces the input exactly.
    pub fn from_flat(flat: &[u8]) -> SimResult<Genome> {
        if flat.len() != GENOME_LEN {
            return Err(SimError::InvalidGenomeLength {
                expected: GENOME_LEN,
                got: flat.len(),
            });
        }
        if let Some((index, &value)) = flat.iter().enumerate().find(|(_, &v)| v > 1) {
            return Err(SimError::InvalidAllele {
                index,
                value: value as i64,
            });
        }
        let mut genome = Genome::empty();
        for table in ALL_TABLES {
            let section = &flat[table.offset()..table.offset() + table.len()];
            for (r, row) in genome.rows_mut(table).iter_mut().enumerate() {
                for (c, cell) in row.iter_mut().enumerate() {
                    *cell = section[r * COLS + c] == 1;
                }
            }
        }
        Ok(genome)
    }

    pub fn to_flat(&self) -> Vec<u8> {
        let mut flat = Vec::with_capacity(GENOME_LEN);
        for table in ALL_TABLES {
            for row in self.rows(table) {
                flat.extend(row.iter().map(|&b| b as u8));
            }
        }
        flat
    }

    fn rows(&self, table: Table) -> &[[bool; COLS]] {
        match table {
            Table::Split => &self.split,
            Table::SoftDouble => &self.soft_double,
            Table::HardDouble => &self.hard_double,
            Table::SoftStand => &self.soft_stand,
            Table::HardStand => &self.hard_stand,
        }
    }

    fn rows_mut(&mut self, table: Table) -> &mut [[bool; COLS]] {
        match table {
            Table::Split => &mut self.split,
            Table::SoftDouble => &mut self.soft_double,
            Table::HardDouble => &mut self.hard_double,
            Table::SoftStand => &mut self.soft_stand,
            Table::HardStand => &mut self.hard_stand,
        }
    }

    fn write_forced_rows(&mut self) {
        for table in ALL_TABLES {
            if let Some((row, value)) = table.forced_row() {
                self.rows_mut(table)[row] = [value; COLS];
            }
        }
    }

    /// Stored bit, including the unread rows. Panics on an out-of-range cell.
    pub fn cell(&self, table: Table, row: usize, col: usize) -> bool {
        self.rows(table)[row][col]
    }

    pub fn set_cell(&mut self, table: Table, row: usize, col: usize, value: bool) {
        self.rows_mut(table)[row][col] = value;
    }

    /// The decision play acts on. Unread rows answer with their fixed value.
    pub fn decision(&self, table: Table, row: usize, dealer: BjRank) -> bool {
        match table.forced_row() {
            Some((forced, value)) if forced == row => value,
            _ => self.rows(table)[row][dealer.index()],
        }
    }

    pub fn split(&self, pair: BjRank, dealer: BjRank) -> bool {
        self.decision(Table::Split, pair.index(), dealer)
    }

    /// Soft double keyed by the rank of the card next to the ace.
    pub fn soft_double(&self, other: BjRank, dealer: BjRank) -> bool {
        self.decision(Table::SoftDouble, other.index(), dealer)
    }

    pub fn hard_double(&self, total: u8, dealer: BjRank) -> SimResult<bool> {
        Ok(self.decision(Table::HardDouble, sum_index(total)?, dealer))
    }

    pub fn soft_stand(&self, total: u8, dealer: BjRank) -> SimResult<bool> {
        Ok(self.decision(Table::SoftStand, sum_index(total)?, dealer))
    }

    pub fn hard_stand(&self, total: u8, dealer: BjRank) -> SimResult<bool> {
        Ok(self.decision(Table::HardStand, sum_index(total)?, dealer))
    }

    /// Number of positions where the flat encodings differ.
    pub fn distance(&self, other: &Genome) -> usize {
        self.to_flat()
            .iter()
            .zip(other.to_flat().iter())
            .filter(|(a, b)| a != b)
            .count()
    }
}

// ---------------------------------------------------------------------------
// Mean genome
// ---------------------------------------------------------------------------

/// Per-cell probability of a `1`, in the same layout as the flat genome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanGenome {
    probs: Vec<f64>,
}

/// Default cutoff when turning a mean genome into a 0/1 strategy.
pub const DEFAULT_THRESHOLD: f64 = 0.95;

impl MeanGenome {
    pub fn from_flat(probs: &[f64]) -> SimResult<MeanGenome> {
        if probs.len() != GENOME_LEN {
            return Err(SimError::InvalidGenomeLength {
                expected: GENOME_LEN,
                got: probs.len(),
            });
        }
        if let Some((index, &value)) = probs
            .iter()
            .enumerate()
            .find(|(_, &p)| !(0.0..=1.0).contains(&p))
        {
            return Err(SimError::InvalidProbability { index, value });
        }
        Ok(MeanGenome {
            probs: probs.to_vec(),
        })
    }

    /// Weighted average of genomes. Weights are normalized by their sum; if
    /// they sum to zero every genome counts equally.
    pub fn weighted(members: &[(&Genome, f64)]) -> SimResult<MeanGenome> {
        if members.is_empty() {
            return Err(SimError::Config("cannot average an empty set of genomes".to_string()));
        }
        let total: f64 = members.iter().map(|(_, w)| *w).sum();
        let uniform = 1.0 / members.len() as f64;
        let mut probs = vec![0.0; GENOME_LEN];
        for (genome, weight) in members {
            let w = if total > 0.0 { weight / total } else { uniform };
            for (p, bit) in probs.iter_mut().zip(genome.to_flat()) {
                *p += w * bit as f64;
            }
        }
        // Float accumulation can overshoot 1 by an ulp.
        for p in probs.iter_mut() {
            *p = p.clamp(0.0, 1.0);
        }
        Ok(MeanGenome { probs })
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.probs
    }

    pub fn cell(&self, table: Table, row: usize, col: usize) -> f64 {
        self.probs[table.offset() + row * COLS + col]
    }

    /// Draws a concrete genome, each cell set with its probability.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Genome {
        self.to_genome(|p| rng.gen::<f64>() < p)
    }

    /// The strategy the elite agrees on: a cell is set when its probability
    /// is at least `cutoff`.
    pub fn threshold(&self, cutoff: f64) -> Genome {
        self.to_genome(|p| p >= cutoff)
    }

    fn to_genome<F: FnMut(f64) -> bool>(&self, mut set: F) -> Genome {
        let mut genome = Genome::empty();
        for table in ALL_TABLES {
            for row in 0..table.rows() {
                for col in 0..COLS {
                    let p = self.probs[table.offset() + row * COLS + col];
                    genome.set_cell(table, row, col, set(p));
                }
            }
        }
        genome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn layout_adds_up() {
        assert_eq!(GENOME_LEN, 800);
        let total: usize = ALL_TABLES.iter().map(|t| t.len()).sum();
        assert_eq!(total, GENOME_LEN);
        assert_eq!(Table::HardStand.offset() + Table::HardStand.len(), GENOME_LEN);
    }

    #[test]
    fn sum_index_domain() {
        assert_eq!(sum_index(2).unwrap(), 0);
        assert_eq!(sum_index(21).unwrap(), 19);
        assert!(matches!(sum_index(1), Err(SimError::SumOutOfDomain(1))));
        assert!(matches!(sum_index(22), Err(SimError::SumOutOfDomain(22))));
    }

    #[test]
    fn random_writes_forced_rows() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let g = Genome::random(&mut rng);
        for col in 0..COLS {
            assert!(!g.cell(Table::SoftDouble, 9, col));
            assert!(!g.cell(Table::HardDouble, 19, col));
            assert!(g.cell(Table::SoftStand, 19, col));
            assert!(g.cell(Table::HardStand, 19, col));
        }
    }

    #[test]
    fn forced_rows_override_stored_bits() {
        let mut g = Genome::empty();
        g.set_cell(Table::HardDouble, 19, 3, true);
        g.set_cell(Table::SoftStand, 19, 3, false);
        assert!(g.cell(Table::HardDouble, 19, 3));
        assert!(!g.hard_double(21, BjRank::Four).unwrap());
        assert!(g.soft_stand(21, BjRank::Four).unwrap());
    }

    #[test]
    fn weighted_mean_with_zero_weights_is_uniform() {
        let a = Genome::empty();
        let mut b = Genome::empty();
        b.set_cell(Table::Split, 0, 0, true);
        let mean = MeanGenome::weighted(&[(&a, 0.0), (&b, 0.0)]).unwrap();
        assert!((mean.cell(Table::Split, 0, 0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn threshold_keeps_cells_at_the_cutoff() {
        let mut probs = vec![0.0; GENOME_LEN];
        probs[0] = DEFAULT_THRESHOLD;
        probs[1] = 0.9499;
        probs[2] = 1.0;
        let g = MeanGenome::from_flat(&probs).unwrap().threshold(DEFAULT_THRESHOLD);
        assert!(g.cell(Table::Split, 0, 0));
        assert!(!g.cell(Table::Split, 0, 1));
        assert!(g.cell(Table::Split, 0, 2));
        assert_eq!(g.to_flat().iter().filter(|&&b| b == 1).count(), 2);
    }
}
