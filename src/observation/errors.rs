use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ObservationError {
    #[error("no observation field named {0}")]
    UnknownField(String),

    #[error("field key {0} was not issued by this queue set")]
    ForeignKey(usize),

    #[error("observation field {0} is declared twice")]
    DuplicateField(String),

    #[error("observation field {0} has zero capacity")]
    ZeroCapacity(String),

    #[error("camera {0} is missing from the observation")]
    MissingCamera(String),

    #[error("joint state has {actual} entries, expected {expected}")]
    StateDimension { expected: usize, actual: usize },

    #[error("image buffer holds {actual} bytes, expected {expected}")]
    ImageSize { expected: usize, actual: usize },
}
