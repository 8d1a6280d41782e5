mod errors;

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use errors::ConfigError;

use crate::inference::RetryPolicy;

/// Everything one evaluation run needs to know.
///
/// Fields missing from a config file fall back to [`Default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolloutConfig {
    /// Embodiment key into the registry.
    pub robot_type: String,
    /// Number of predicted actions per inference call that are used.
    pub action_horizon: usize,
    /// Actions dispatched before the policy is queried again.
    pub exe_steps: usize,
    pub observation_horizon: usize,
    /// Control-loop frequency in Hz.
    pub control_freq: f64,
    pub language_instruction: String,
    pub num_rollouts_planned: usize,
    pub output_dir: String,

    /// Exponential decay rate of the temporal ensembler; smaller is smoother.
    pub ensemble_coeff: f64,
    /// Capacity of the action-history window.
    pub action_history_capacity: usize,
    /// Time to let the robot settle after driving to the initial pose.
    pub settle_secs: f64,
    /// Ends a rollout after this many dispatched actions; `None` runs until stopped.
    pub max_steps_per_rollout: Option<u64>,

    pub server_url: String,
    pub inference_timeout_secs: Option<f64>,
    pub inference_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self {
            robot_type: "g1_dex1".to_string(),
            action_horizon: 16,
            exe_steps: 16,
            observation_horizon: 2,
            control_freq: 30.0,
            language_instruction: "Pack black camera into box".to_string(),
            num_rollouts_planned: 10,
            output_dir: "./results".to_string(),
            ensemble_coeff: 0.01,
            action_history_capacity: 16,
            settle_secs: 2.0,
            max_steps_per_rollout: None,
            server_url: "http://127.0.0.1:8000".to_string(),
            inference_timeout_secs: None,
            inference_retries: 0,
            retry_backoff_ms: 100,
        }
    }
}

impl RolloutConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.action_horizon == 0 {
            return invalid("action_horizon must be at least 1".to_string());
        }
        if self.exe_steps == 0 || self.exe_steps > self.action_horizon {
            return invalid(format!(
                "exe_steps must lie in [1, action_horizon = {}], got {}",
                self.action_horizon, self.exe_steps
            ));
        }
        if self.observation_horizon == 0 {
            return invalid("observation_horizon must be at least 1".to_string());
        }
        if self.action_history_capacity == 0 {
            return invalid("action_history_capacity must be at least 1".to_string());
        }
        if !(self.control_freq.is_finite() && self.control_freq > 0.0) {
            return invalid(format!(
                "control_freq must be a positive number of Hz, got {}",
                self.control_freq
            ));
        }
        if !(self.ensemble_coeff > 0.0 && self.ensemble_coeff <= 1.0) {
            return invalid(format!(
                "ensemble_coeff must lie in (0, 1], got {}",
                self.ensemble_coeff
            ));
        }
        if self.ensemble_coeff == 1.0 && self.exe_steps > 1 {
            return invalid("ensemble_coeff of 1 requires exe_steps of 1".to_string());
        }
        if Duration::try_from_secs_f64(1.0 / self.control_freq).is_err() {
            return invalid(format!(
                "control_freq of {} Hz gives an unrepresentable control period",
                self.control_freq
            ));
        }
        if !(self.settle_secs.is_finite() && self.settle_secs >= 0.0) {
            return invalid(format!("settle_secs must be >= 0, got {}", self.settle_secs));
        }
        if Duration::try_from_secs_f64(self.settle_secs).is_err() {
            return invalid(format!("settle_secs of {} is out of range", self.settle_secs));
        }
        if let Some(timeout) = self.inference_timeout_secs {
            if !(timeout.is_finite() && timeout > 0.0) {
                return invalid(format!("inference_timeout_secs must be > 0, got {timeout}"));
            }
            if Duration::try_from_secs_f64(timeout).is_err() {
                return invalid(format!("inference_timeout_secs of {timeout} is out of range"));
            }
        }
        Ok(())
    }

    /// Target spacing between two dispatched actions.
    ///
    /// Out-of-range values saturate; [`RolloutConfig::validate`] rejects them.
    pub fn control_period(&self) -> Duration {
        saturating_secs(1.0 / self.control_freq)
    }

    pub fn settle_duration(&self) -> Duration {
        saturating_secs(self.settle_secs)
    }

    pub fn inference_timeout(&self) -> Option<Duration> {
        self.inference_timeout_secs.map(saturating_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.inference_retries,
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }
}

fn saturating_secs(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        Duration::ZERO
    } else {
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}
