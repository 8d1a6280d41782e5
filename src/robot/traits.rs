use std::collections::BTreeMap;

use crate::observation::ImageTensor;

use super::errors::DeviceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Arm,
    EndEffector,
    Camera,
}

/// How an actuator should reach a commanded target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaypointMode {
    /// Drive straight to the target (first command of an episode).
    Immediate,
    /// Interpolate towards the target so it is reached at `time_target`.
    Scheduled,
}

/// Target for one actuator, with the deadline already expressed in the
/// performance-counter clock domain.
#[derive(Debug, Clone, PartialEq)]
pub struct Command<'a> {
    pub target: &'a [f32],
    pub time_target: f64,
    pub mode: WaypointMode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    /// Current joint positions of an arm or end-effector.
    Joints(Vec<f32>),
    /// A single camera frame, keyed by the device's name.
    Frame(ImageTensor),
    /// Multi-stream cameras (e.g. colour + depth) keyed by stream name.
    Frames(BTreeMap<String, ImageTensor>),
}

/// Capability shared by every piece of hardware a robot is assembled from.
pub trait Device: Send {
    fn kind(&self) -> DeviceKind;

    /// Number of actuated joints. Cameras report 0.
    fn dof(&self) -> usize;

    fn connect(&mut self) -> Result<(), DeviceError>;
    fn disconnect(&mut self) -> Result<(), DeviceError>;
    fn read(&mut self) -> Result<Reading, DeviceError>;

    /// Sends a target to an actuator. Cameras accept and ignore commands.
    fn write(&mut self, command: &Command<'_>) -> Result<(), DeviceError>;
}
