use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EnsembleError {
    #[error("invalid ensembler configuration: {0}")]
    InvalidConfig(String),

    #[error("action chunk has no rows")]
    EmptyChunk,

    #[error("action chunk data has {actual} values, expected {expected}")]
    Shape { expected: usize, actual: usize },

    #[error("action rows have inconsistent lengths: row {row} has {actual}, expected {expected}")]
    RaggedRows {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("action dimension changed from {expected} to {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("step {step} is due for dispatch but no chunk covers it")]
    UncoveredStep { step: u64 },

    #[error("invariant violated: step {step} has zero accumulated weight")]
    ZeroWeight { step: u64 },
}
