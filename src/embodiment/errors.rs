use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmbodimentError {
    #[error("unknown robot type: {0}")]
    Unknown(String),

    #[error("robot type {0} is already registered")]
    Duplicate(String),

    #[error("embodiment {name}: {field} has {actual} entries, expected {expected}")]
    DimensionMismatch {
        name: String,
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("embodiment {0} has zero degrees of freedom")]
    NoDegreesOfFreedom(String),
}
