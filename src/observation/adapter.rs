use crate::embodiment::EmbodimentDescriptor;
use crate::robot::RobotObservation;

use super::errors::ObservationError;
use super::types::Sample;

pub const IMAGE_FIELD: &str = "observation.images.top";
pub const STATE_FIELD: &str = "observation.state";
pub const ACTION_FIELD: &str = "action";

/// A raw robot observation converted into the policy's input representation.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedObservation {
    pub image: Sample,
    pub state: Sample,
    pub action: Sample,
}

/// Turns robot observations into model inputs for one embodiment.
///
/// The primary camera frame is converted from BGR to RGB and re-laid out as
/// channel planes; the joint state is passed through after a length check and
/// the embodiment's zero action fills the action-history slot.
#[derive(Debug, Clone)]
pub struct ObservationAdapter {
    camera_key: String,
    dof: usize,
    zero_action: Vec<f32>,
}

impl ObservationAdapter {
    pub fn new(embodiment: &EmbodimentDescriptor) -> Self {
        Self {
            camera_key: embodiment.camera_key().to_string(),
            dof: embodiment.dof(),
            zero_action: embodiment.zero_action().to_vec(),
        }
    }

    pub fn prepare(
        &self,
        observation: &RobotObservation,
    ) -> Result<PreparedObservation, ObservationError> {
        let frame = observation
            .images
            .get(&self.camera_key)
            .ok_or_else(|| ObservationError::MissingCamera(self.camera_key.clone()))?;

        if observation.state.len() != self.dof {
            return Err(ObservationError::StateDimension {
                expected: self.dof,
                actual: observation.state.len(),
            });
        }

        Ok(PreparedObservation {
            image: Sample::Image(frame.to_rgb().to_chw()),
            state: Sample::Vector(observation.state.clone()),
            action: Sample::Vector(self.zero_action.clone()),
        })
    }
}
