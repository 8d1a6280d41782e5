//! In-process stand-ins for real hardware, used for dry runs.

use std::sync::{Arc, Mutex};

use crate::observation::{ColorOrder, ImageTensor, PixelLayout};

use super::errors::DeviceError;
use super::traits::{Command, Device, DeviceKind, Reading, WaypointMode};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCommand {
    pub target: Vec<f32>,
    pub time_target: f64,
    pub mode: WaypointMode,
}

/// Shared record of every command a simulated actuator received.
pub type CommandLog = Arc<Mutex<Vec<RecordedCommand>>>;

/// Actuator that jumps to each commanded target and reports it back as its
/// joint state.
#[derive(Debug)]
pub struct SimArm {
    kind: DeviceKind,
    position: Vec<f32>,
    connected: bool,
    log: CommandLog,
}

impl SimArm {
    pub fn arm(initial: Vec<f32>) -> Self {
        Self::with_kind(DeviceKind::Arm, initial)
    }

    pub fn end_effector(initial: Vec<f32>) -> Self {
        Self::with_kind(DeviceKind::EndEffector, initial)
    }

    fn with_kind(kind: DeviceKind, initial: Vec<f32>) -> Self {
        Self {
            kind,
            position: initial,
            connected: false,
            log: CommandLog::default(),
        }
    }

    pub fn log(&self) -> CommandLog {
        self.log.clone()
    }

    fn check(&self) -> Result<(), DeviceError> {
        if self.connected {
            Ok(())
        } else {
            Err(DeviceError::NotConnected(format!("{:?}", self.kind)))
        }
    }
}

impl Device for SimArm {
    fn kind(&self) -> DeviceKind {
        self.kind
    }

    fn dof(&self) -> usize {
        self.position.len()
    }

    fn connect(&mut self) -> Result<(), DeviceError> {
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), DeviceError> {
        self.connected = false;
        Ok(())
    }

    fn read(&mut self) -> Result<Reading, DeviceError> {
        self.check()?;
        Ok(Reading::Joints(self.position.clone()))
    }

    fn write(&mut self, command: &Command<'_>) -> Result<(), DeviceError> {
        self.check()?;
        if command.target.len() != self.position.len() {
            return Err(DeviceError::ActionDimension {
                expected: self.position.len(),
                actual: command.target.len(),
            });
        }
        self.position.copy_from_slice(command.target);
        if let Ok(mut log) = self.log.lock() {
            log.push(RecordedCommand {
                target: command.target.to_vec(),
                time_target: command.time_target,
                mode: command.mode,
            });
        }
        Ok(())
    }
}

/// Camera producing a BGR gradient whose intensity shifts every frame.
#[derive(Debug)]
pub struct SimCamera {
    height: usize,
    width: usize,
    frame: u8,
    connected: bool,
}

impl SimCamera {
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            height,
            width,
            frame: 0,
            connected: false,
        }
    }
}

impl Device for SimCamera {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Camera
    }

    fn dof(&self) -> usize {
        0
    }

    fn connect(&mut self) -> Result<(), DeviceError> {
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), DeviceError> {
        self.connected = false;
        Ok(())
    }

    fn read(&mut self) -> Result<Reading, DeviceError> {
        if !self.connected {
            return Err(DeviceError::NotConnected("camera".to_string()));
        }

        let mut data = Vec::with_capacity(self.height * self.width * ImageTensor::CHANNELS);
        for y in 0..self.height {
            for x in 0..self.width {
                let base = (x + y) as u8;
                data.extend_from_slice(&[
                    base.wrapping_add(self.frame),
                    base,
                    base.wrapping_sub(self.frame),
                ]);
            }
        }
        self.frame = self.frame.wrapping_add(1);

        let image = ImageTensor::new(
            self.height,
            self.width,
            PixelLayout::Hwc,
            ColorOrder::Bgr,
            data,
        )
        .map_err(|err| DeviceError::io("camera", err))?;
        Ok(Reading::Frame(image))
    }

    fn write(&mut self, _command: &Command<'_>) -> Result<(), DeviceError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arm_tracks_commands() {
        let mut arm = SimArm::arm(vec![0.0, 0.0]);
        let log = arm.log();
        arm.connect().unwrap();
        arm.write(&Command {
            target: &[0.5, -0.5],
            time_target: 1.0,
            mode: WaypointMode::Immediate,
        })
        .unwrap();

        assert_eq!(arm.read().unwrap(), Reading::Joints(vec![0.5, -0.5]));
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_camera_frames_change() {
        let mut camera = SimCamera::new(2, 3);
        assert!(camera.read().is_err());
        camera.connect().unwrap();

        let first = camera.read().unwrap();
        let second = camera.read().unwrap();
        assert_ne!(first, second);
        match first {
            Reading::Frame(image) => assert_eq!(image.data.len(), 18),
            other => panic!("unexpected reading: {other:?}"),
        }
    }
}
