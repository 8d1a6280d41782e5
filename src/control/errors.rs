use thiserror::Error;

use crate::config::ConfigError;
use crate::embodiment::EmbodimentError;
use crate::ensemble::EnsembleError;
use crate::inference::InferenceError;
use crate::observation::ObservationError;
use crate::robot::DeviceError;

#[derive(Error, Debug)]
pub enum ControlError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Embodiment error: {0}")]
    Embodiment(#[from] EmbodimentError),

    #[error("Observation error: {0}")]
    Observation(#[from] ObservationError),

    #[error("Ensemble error: {0}")]
    Ensemble(#[from] EnsembleError),

    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("policy returned actions of dimension {actual}, robot expects {expected}")]
    ActionDimension { expected: usize, actual: usize },

    #[error("failed to create output directory {path}: {source}")]
    OutputDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{error}; releasing devices afterwards also failed: {cleanup}")]
    CleanupAfterFailure {
        error: Box<ControlError>,
        cleanup: DeviceError,
    },
}
