use std::collections::BTreeMap;

use super::errors::EmbodimentError;
use super::types::EmbodimentDescriptor;

#[rustfmt::skip]
const G1_DEX1_POSE: [f32; 16] = [
    0.10559805, 0.02726714, -0.01210221, -0.33341318, -0.22513399, -0.02627627, -0.15437093, 0.1273793,
    -0.1674708, -0.11544029, -0.40095493, 0.44332668, 0.11566751, 0.3936641, 5.4, 5.4,
];

#[rustfmt::skip]
const Z1_DUAL_DEX1_REALSENSE_POSE: [f32; 14] = [
    -1.0262332, 1.4281361, -1.2149128, 0.6473399, -0.12425245, 0.44945636, 0.89584476,
    1.2593982, -1.0737865, 0.6672816, 0.39730102, -0.47400007, 0.9894176, 0.9817477,
];

#[rustfmt::skip]
const Z1_REALSENSE_POSE: [f32; 7] = [
    -0.06940782, 1.4751548, -0.7554075, 1.0501366, 0.02931615, -0.02810347, -0.99238837,
];

/// Lookup table from robot type to its validated descriptor.
///
/// Built once at startup and handed to whatever needs embodiment data.
#[derive(Debug, Clone, Default)]
pub struct EmbodimentRegistry {
    entries: BTreeMap<String, EmbodimentDescriptor>,
}

impl EmbodimentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the stock Unitree embodiments.
    pub fn builtin() -> Result<Self, EmbodimentError> {
        let stock = [
            ("g1_dex1", G1_DEX1_POSE.to_vec(), "cam_right_high"),
            (
                "z1_dual_dex1_realsense",
                Z1_DUAL_DEX1_REALSENSE_POSE.to_vec(),
                "cam_high",
            ),
            ("z1_realsense", Z1_REALSENSE_POSE.to_vec(), "cam_high"),
        ];

        let mut registry = Self::new();
        for (name, pose, camera) in stock {
            registry.register(EmbodimentDescriptor::new(name, pose, camera)?)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, descriptor: EmbodimentDescriptor) -> Result<(), EmbodimentError> {
        if self.entries.contains_key(descriptor.name()) {
            return Err(EmbodimentError::Duplicate(descriptor.name().to_string()));
        }
        self.entries
            .insert(descriptor.name().to_string(), descriptor);
        Ok(())
    }

    pub fn get(&self, robot_type: &str) -> Result<&EmbodimentDescriptor, EmbodimentError> {
        self.entries
            .get(robot_type)
            .ok_or_else(|| EmbodimentError::Unknown(robot_type.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_dimensions() {
        let registry = EmbodimentRegistry::builtin().unwrap();
        assert_eq!(registry.len(), 3);

        let g1 = registry.get("g1_dex1").unwrap();
        assert_eq!(g1.dof(), 16);
        assert_eq!(g1.zero_action().len(), 16);
        assert_eq!(g1.camera_key(), "cam_right_high");

        let dual = registry.get("z1_dual_dex1_realsense").unwrap();
        assert_eq!(dual.dof(), 14);
        assert_eq!(dual.camera_key(), "cam_high");

        let z1 = registry.get("z1_realsense").unwrap();
        assert_eq!(z1.dof(), 7);
        assert_eq!(z1.init_pose()[6], -0.99238837);
    }

    #[test]
    fn test_unknown_robot_type() {
        let registry = EmbodimentRegistry::builtin().unwrap();
        let err = registry.get("h1_inspire").unwrap_err();
        assert_eq!(err, EmbodimentError::Unknown("h1_inspire".to_string()));
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let mut registry = EmbodimentRegistry::builtin().unwrap();
        let desc = EmbodimentDescriptor::new("z1_realsense", vec![0.0; 7], "cam_high").unwrap();
        assert_eq!(
            registry.register(desc),
            Err(EmbodimentError::Duplicate("z1_realsense".to_string()))
        );
    }

    #[test]
    fn test_custom_registration() {
        let mut registry = EmbodimentRegistry::new();
        assert!(registry.is_empty());
        let desc = EmbodimentDescriptor::new("bench_arm", vec![0.0; 6], "wrist").unwrap();
        registry.register(desc).unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["bench_arm"]);
    }
}
