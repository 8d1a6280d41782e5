mod clock;
mod errors;
#[allow(clippy::module_inception)]
mod robot;
pub mod sim;
mod traits;

pub use clock::{Clock, SystemClock};
pub use errors::DeviceError;
pub use robot::{ActuationState, Robot, RobotObservation, RobotSettings};
pub use traits::{Command, Device, DeviceKind, Reading, WaypointMode};
