use std::collections::BTreeMap;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::observation::ImageTensor;

use super::clock::{Clock, SystemClock};
use super::errors::DeviceError;
use super::traits::{Command, Device, DeviceKind, Reading, WaypointMode};

/// Timing knobs for bringing devices up.
#[derive(Debug, Clone)]
pub struct RobotSettings {
    /// Frames read from every camera after connecting, so exposure settles.
    pub camera_warmup_reads: usize,
    pub camera_warmup_interval: Duration,
    /// Dead time after all devices are connected.
    pub connect_settle: Duration,
}

impl Default for RobotSettings {
    fn default() -> Self {
        Self {
            camera_warmup_reads: 20,
            camera_warmup_interval: Duration::from_secs_f64(1.0 / 30.0),
            connect_settle: Duration::from_secs(2),
        }
    }
}

impl RobotSettings {
    /// No warm-up and no settle time; for simulated hardware.
    pub fn immediate() -> Self {
        Self {
            camera_warmup_reads: 0,
            camera_warmup_interval: Duration::ZERO,
            connect_settle: Duration::ZERO,
        }
    }
}

/// Whether the next command is the first one since connecting or since the
/// episode began. Only ever moves from `Uninitialized` to `Steady`; going
/// back requires [`Robot::begin_episode`] or a reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuationState {
    Uninitialized,
    Steady,
}

impl ActuationState {
    fn mode(self) -> WaypointMode {
        match self {
            ActuationState::Uninitialized => WaypointMode::Immediate,
            ActuationState::Steady => WaypointMode::Scheduled,
        }
    }
}

/// Joint state of all actuators (arms first, then end-effectors) and the
/// latest frame of every camera stream. No batch dimension.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RobotObservation {
    pub state: Vec<f32>,
    pub images: BTreeMap<String, ImageTensor>,
}

struct Slot {
    name: String,
    device: Box<dyn Device>,
}

/// A robot assembled from named arms, end-effectors and cameras.
pub struct Robot {
    robot_type: String,
    arms: Vec<Slot>,
    end_effectors: Vec<Slot>,
    cameras: Vec<Slot>,
    clock: Box<dyn Clock>,
    settings: RobotSettings,
    actuation: ActuationState,
    connected: bool,
}

impl std::fmt::Debug for Robot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = |slots: &[Slot]| slots.iter().map(|s| s.name.clone()).collect::<Vec<_>>();
        f.debug_struct("Robot")
            .field("robot_type", &self.robot_type)
            .field("arms", &names(&self.arms))
            .field("end_effectors", &names(&self.end_effectors))
            .field("cameras", &names(&self.cameras))
            .field("actuation", &self.actuation)
            .field("connected", &self.connected)
            .finish()
    }
}

impl Robot {
    pub fn new(robot_type: impl Into<String>) -> Self {
        Self {
            robot_type: robot_type.into(),
            arms: Vec::new(),
            end_effectors: Vec::new(),
            cameras: Vec::new(),
            clock: Box::new(SystemClock::new()),
            settings: RobotSettings::default(),
            actuation: ActuationState::Uninitialized,
            connected: false,
        }
    }

    pub fn with_settings(mut self, settings: RobotSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_device(mut self, name: impl Into<String>, device: impl Device + 'static) -> Self {
        self.add_device(name, Box::new(device));
        self
    }

    /// Devices keep insertion order within their kind; that order fixes how
    /// joint states are concatenated and actions are split.
    pub fn add_device(&mut self, name: impl Into<String>, device: Box<dyn Device>) {
        let slot = Slot {
            name: name.into(),
            device,
        };
        match slot.device.kind() {
            DeviceKind::Arm => self.arms.push(slot),
            DeviceKind::EndEffector => self.end_effectors.push(slot),
            DeviceKind::Camera => self.cameras.push(slot),
        }
    }

    pub fn robot_type(&self) -> &str {
        &self.robot_type
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn actuation_state(&self) -> ActuationState {
        self.actuation
    }

    /// Total actuated joints across arms and end-effectors.
    pub fn dof(&self) -> usize {
        self.actuators().map(|s| s.device.dof()).sum()
    }

    /// Current time in the monotonic domain that command deadlines use.
    pub fn now(&self) -> f64 {
        self.clock.monotonic()
    }

    fn actuators(&self) -> impl Iterator<Item = &Slot> {
        self.arms.iter().chain(self.end_effectors.iter())
    }

    fn actuators_mut(&mut self) -> impl Iterator<Item = &mut Slot> {
        self.arms.iter_mut().chain(self.end_effectors.iter_mut())
    }

    /// Connects cameras, warms them up, then connects arms and end-effectors.
    /// Warm-up and settle waits yield to the runtime.
    pub async fn connect(&mut self) -> Result<(), DeviceError> {
        if self.arms.is_empty() && self.end_effectors.is_empty() && self.cameras.is_empty() {
            return Err(DeviceError::NoDevices);
        }

        if let Err(err) = self.connect_devices().await {
            warn!(robot = %self.robot_type, error = %err, "connect failed, releasing devices");
            if let Err(cleanup) = self.release_all() {
                warn!(error = %cleanup, "release after failed connect");
            }
            return Err(err);
        }

        sleep(self.settings.connect_settle).await;
        self.actuation = ActuationState::Uninitialized;
        self.connected = true;
        info!(robot = %self.robot_type, dof = self.dof(), "all devices connected");
        Ok(())
    }

    async fn connect_devices(&mut self) -> Result<(), DeviceError> {
        for slot in &mut self.cameras {
            slot.device.connect()?;
            info!(camera = %slot.name, "camera connected");
        }

        if !self.cameras.is_empty() && self.settings.camera_warmup_reads > 0 {
            debug!(reads = self.settings.camera_warmup_reads, "warming up cameras");
            for _ in 0..self.settings.camera_warmup_reads {
                for slot in &mut self.cameras {
                    slot.device.read()?;
                }
                sleep(self.settings.camera_warmup_interval).await;
            }
        }

        for slot in &mut self.arms {
            slot.device.connect()?;
            info!(arm = %slot.name, "arm connected");
        }
        for slot in &mut self.end_effectors {
            slot.device.connect()?;
            info!(end_effector = %slot.name, "end-effector connected");
        }
        Ok(())
    }

    /// Marks the start of a new episode: the next command drives straight to
    /// its target instead of being scheduled.
    pub fn begin_episode(&mut self) {
        self.actuation = ActuationState::Uninitialized;
    }

    pub fn capture_observation(&mut self) -> Result<RobotObservation, DeviceError> {
        self.ensure_connected()?;

        let mut observation = RobotObservation::default();
        for slot in self.arms.iter_mut().chain(self.end_effectors.iter_mut()) {
            match slot.device.read()? {
                Reading::Joints(q) => observation.state.extend(q),
                Reading::Frame(_) | Reading::Frames(_) => {
                    return Err(DeviceError::UnexpectedReading {
                        device: slot.name.clone(),
                    });
                }
            }
        }
        for slot in &mut self.cameras {
            match slot.device.read()? {
                Reading::Frame(frame) => {
                    observation.images.insert(slot.name.clone(), frame);
                }
                Reading::Frames(frames) => observation.images.extend(frames),
                Reading::Joints(_) => {
                    return Err(DeviceError::UnexpectedReading {
                        device: slot.name.clone(),
                    });
                }
            }
        }
        Ok(observation)
    }

    /// Splits `action` across arms then end-effectors and sends each slice
    /// with a deadline of `t_command_target` (monotonic seconds).
    ///
    /// Returns the action that was actually sent.
    pub fn send_action(
        &mut self,
        action: &[f32],
        t_command_target: f64,
    ) -> Result<Vec<f32>, DeviceError> {
        self.ensure_connected()?;

        let expected = self.dof();
        if action.len() != expected {
            return Err(DeviceError::ActionDimension {
                expected,
                actual: action.len(),
            });
        }

        let mode = self.actuation.mode();
        let time_target = self.clock.translate_to_perf(t_command_target);

        let mut from = 0;
        for slot in self.actuators_mut() {
            let to = from + slot.device.dof();
            slot.device.write(&Command {
                target: &action[from..to],
                time_target,
                mode,
            })?;
            from = to;
        }

        self.actuation = ActuationState::Steady;
        Ok(action.to_vec())
    }

    /// Disconnects every device, continuing past failures. All failures are
    /// reported together once every device has been attempted.
    pub fn disconnect(&mut self) -> Result<(), DeviceError> {
        let result = self.release_all();
        self.connected = false;
        result
    }

    fn release_all(&mut self) -> Result<(), DeviceError> {
        let mut failures = Vec::new();
        for slot in self
            .arms
            .iter_mut()
            .chain(self.end_effectors.iter_mut())
            .chain(self.cameras.iter_mut())
        {
            match slot.device.disconnect() {
                Ok(()) => info!(device = %slot.name, "disconnected"),
                Err(err) => {
                    warn!(device = %slot.name, error = %err, "disconnect failed");
                    failures.push((slot.name.clone(), err));
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DeviceError::Cleanup { failures })
        }
    }

    fn ensure_connected(&self) -> Result<(), DeviceError> {
        if self.connected {
            Ok(())
        } else {
            Err(DeviceError::NotConnected(self.robot_type.clone()))
        }
    }
}
