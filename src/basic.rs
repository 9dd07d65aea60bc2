//! Single-deck basic strategy as a genome.

use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::error::{SimError, SimResult};
use crate::genome::{Genome, Table, ALL_TABLES, COLS, GENOME_LEN};

static BASIC_STRATEGY_JSON: &str = include_str!("../data/basic_strategy.json");

/// Each table as rows of `COLS` '0'/'1' characters, dealer upcard A..T left
/// to right.
#[derive(Deserialize, Debug)]
struct TableRows {
    split: Vec<String>,
    soft_double: Vec<String>,
    hard_double: Vec<String>,
    soft_stand: Vec<String>,
    hard_stand: Vec<String>,
}

impl TableRows {
    fn rows(&self, table: Table) -> &[String] {
        match table {
            Table::Split => &self.split,
            Table::SoftDouble => &self.soft_double,
            Table::HardDouble => &self.hard_double,
            Table::SoftStand => &self.soft_stand,
            Table::HardStand => &self.hard_stand,
        }
    }
}

static BASIC: Lazy<Genome> = Lazy::new(|| {
    parse_table_rows(BASIC_STRATEGY_JSON).expect("Failed to parse basic strategy tables")
});

pub fn basic_strategy() -> Genome {
    BASIC.clone()
}

/// Builds a genome from the row-string JSON layout used by the bundled
/// basic strategy.
pub fn parse_table_rows(json: &str) -> SimResult<Genome> {
    let tables: TableRows = serde_json::from_str(json)?;
    let mut flat = Vec::with_capacity(GENOME_LEN);
    for table in ALL_TABLES {
        let rows = tables.rows(table);
        if rows.len() != table.rows() {
            return Err(SimError::Parse(format!(
                "{} table needs {} rows, got {}",
                table.as_str(),
                table.rows(),
                rows.len()
            )));
        }
        for (r, row) in rows.iter().enumerate() {
            if row.len() != COLS {
                return Err(SimError::Parse(format!(
                    "{} row {} must have {} cells",
                    table.as_str(),
                    table.row_label(r),
                    COLS
                )));
            }
            for c in row.chars() {
                match c {
                    '0' => flat.push(0),
                    '1' => flat.push(1),
                    other => {
                        return Err(SimError::Parse(format!(
                            "{} row {}: unexpected cell '{}'",
                            table.as_str(),
                            table.row_label(r),
                            other
                        )))
                    }
                }
            }
        }
    }
    Genome::from_flat(&flat)
}
