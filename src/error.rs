use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Genome must have exactly {expected} entries, got {got}")]
    InvalidGenomeLength { expected: usize, got: usize },

    #[error("Genome entry {index} must be 0 or 1, got {value}")]
    InvalidAllele { index: usize, value: i64 },

    #[error("Probability at {index} must be within [0, 1], got {value}")]
    InvalidProbability { index: usize, value: f64 },

    #[error("Hand total {0} has no table row (valid totals are 2-21)")]
    SumOutOfDomain(u8),

    #[error("Shoe exhausted: all 52 cards dealt without a reset")]
    ShoeExhausted,

    #[error("Cannot stack shoe: {0}")]
    StackedShoe(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SimResult<T> = Result<T, SimError>;
