use serde::{Deserialize, Serialize};

use super::errors::EmbodimentError;

/// Static description of one robot embodiment.
///
/// Construction goes through [`EmbodimentDescriptor::new`], which guarantees
/// that the safe pose and zero action both have exactly `dof` entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbodimentDescriptor {
    name: String,
    dof: usize,
    init_pose: Vec<f32>,
    zero_action: Vec<f32>,
    camera_key: String,
}

impl EmbodimentDescriptor {
    pub fn new(
        name: impl Into<String>,
        init_pose: Vec<f32>,
        camera_key: impl Into<String>,
    ) -> Result<Self, EmbodimentError> {
        let dof = init_pose.len();
        Self::with_zero_action(name, init_pose, vec![0.0; dof], camera_key)
    }

    pub fn with_zero_action(
        name: impl Into<String>,
        init_pose: Vec<f32>,
        zero_action: Vec<f32>,
        camera_key: impl Into<String>,
    ) -> Result<Self, EmbodimentError> {
        let name = name.into();
        let dof = init_pose.len();
        if dof == 0 {
            return Err(EmbodimentError::NoDegreesOfFreedom(name));
        }
        if zero_action.len() != dof {
            return Err(EmbodimentError::DimensionMismatch {
                name,
                field: "zero_action",
                expected: dof,
                actual: zero_action.len(),
            });
        }

        Ok(Self {
            name,
            dof,
            init_pose,
            zero_action,
            camera_key: camera_key.into(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Actuator degrees of freedom, which is also the action dimensionality.
    pub fn dof(&self) -> usize {
        self.dof
    }

    pub fn init_pose(&self) -> &[f32] {
        &self.init_pose
    }

    pub fn zero_action(&self) -> &[f32] {
        &self.zero_action
    }

    /// Camera whose frames feed the policy.
    pub fn camera_key(&self) -> &str {
        &self.camera_key
    }
}
