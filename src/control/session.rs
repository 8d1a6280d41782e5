use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use tracing::{error, info};

use super::driver::{ControlLoopDriver, RolloutSummary};
use super::errors::ControlError;
use crate::config::RolloutConfig;
use crate::embodiment::EmbodimentRegistry;
use crate::inference::InferenceClient;
use crate::robot::Robot;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionReport {
    pub rollouts: Vec<RolloutSummary>,
    /// True when the stop signal fired before all planned rollouts ran.
    pub stopped: bool,
}

/// Runs the planned number of rollouts on one robot connection.
pub struct EvalSession<C> {
    driver: ControlLoopDriver<C>,
    output_dir: PathBuf,
    num_rollouts: usize,
}

impl<C: InferenceClient> EvalSession<C> {
    /// Looks up the configured embodiment; an unknown robot type is fatal here.
    pub fn new(
        config: RolloutConfig,
        registry: &EmbodimentRegistry,
        client: C,
    ) -> Result<Self, ControlError> {
        let embodiment = registry.get(&config.robot_type)?;
        let output_dir = PathBuf::from(&config.output_dir);
        let num_rollouts = config.num_rollouts_planned;
        Ok(Self {
            driver: ControlLoopDriver::new(config, embodiment, client)?,
            output_dir,
            num_rollouts,
        })
    }

    pub fn driver(&self) -> &ControlLoopDriver<C> {
        &self.driver
    }

    /// Connects `robot`, runs the rollouts until they are done or `stop`
    /// resolves, and disconnects again on every path out, including errors.
    pub async fn run<F>(&mut self, robot: &mut Robot, stop: F) -> Result<SessionReport, ControlError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(stop);

        let outcome = tokio::select! {
            connected = robot.connect() => match connected {
                Ok(()) => self.run_rollouts(robot, stop.as_mut()).await,
                // A failed connect has already released its devices.
                Err(err) => return Err(err.into()),
            },
            _ = stop.as_mut() => {
                info!("stop requested while connecting");
                Ok(SessionReport {
                    rollouts: Vec::new(),
                    stopped: true,
                })
            }
        };

        info!("releasing robot devices");
        let released = robot.disconnect();

        match (outcome, released) {
            (Ok(report), Ok(())) => Ok(report),
            (Ok(_), Err(cleanup)) => Err(cleanup.into()),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(cleanup)) => {
                error!(error = %err, cleanup = %cleanup, "rollout and cleanup both failed");
                Err(ControlError::CleanupAfterFailure {
                    error: Box::new(err),
                    cleanup,
                })
            }
        }
    }

    async fn run_rollouts<F>(
        &mut self,
        robot: &mut Robot,
        mut stop: Pin<&mut F>,
    ) -> Result<SessionReport, ControlError>
    where
        F: Future<Output = ()>,
    {
        let mut report = SessionReport::default();

        for episode_idx in 0..self.num_rollouts {
            let dir = self.output_dir.join(format!("episode_{episode_idx:03}"));
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|source| ControlError::OutputDir {
                    path: dir.display().to_string(),
                    source,
                })?;

            info!(
                episode = episode_idx + 1,
                planned = self.num_rollouts,
                "starting rollout"
            );
            tokio::select! {
                result = self.driver.run_rollout(robot) => {
                    let summary = result?;
                    info!(
                        episode = episode_idx + 1,
                        steps = summary.steps,
                        inference_calls = summary.inference_calls,
                        "rollout finished"
                    );
                    report.rollouts.push(summary);
                }
                _ = stop.as_mut() => {
                    info!(episode = episode_idx + 1, "stop requested");
                    report.stopped = true;
                    break;
                }
            }
        }

        Ok(report)
    }
}
