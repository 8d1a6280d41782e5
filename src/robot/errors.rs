use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("robot has no devices to connect")]
    NoDevices,

    #[error("device {0} is not connected")]
    NotConnected(String),

    #[error("action has {actual} values, robot actuates {expected}")]
    ActionDimension { expected: usize, actual: usize },

    #[error("device {device} returned an unexpected reading")]
    UnexpectedReading { device: String },

    #[error("device {device}: {source}")]
    Io {
        device: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{} device(s) failed to disconnect: {}", .failures.len(), describe(.failures))]
    Cleanup { failures: Vec<(String, DeviceError)> },
}

impl DeviceError {
    pub fn io(
        device: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        DeviceError::Io {
            device: device.into(),
            source: source.into(),
        }
    }
}

fn describe(failures: &[(String, DeviceError)]) -> String {
    failures
        .iter()
        .map(|(name, err)| format!("{name} ({err})"))
        .collect::<Vec<_>>()
        .join(", ")
}
