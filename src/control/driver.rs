use tokio::time::{Instant, sleep};
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use super::errors::ControlError;
use super::pacing::pacing_delay;
use crate::config::RolloutConfig;
use crate::embodiment::EmbodimentDescriptor;
use crate::ensemble::TemporalActionEnsembler;
use crate::inference::{InferenceClient, InferenceRequest};
use crate::observation::{
    ACTION_FIELD, FieldKey, IMAGE_FIELD, ObservationAdapter, ObservationQueueSet, STATE_FIELD,
};
use crate::robot::Robot;

/// Per-rollout bookkeeping. Created when a rollout starts and dropped when
/// it ends.
///
/// The immediate-versus-scheduled actuation flag lives on the [`Robot`],
/// which owns the connection lifecycle, and the observation windows live in
/// the driver's queue set; both are reset at the start of every rollout.
#[derive(Debug, Clone)]
pub struct EpisodeState {
    pub episode_id: Uuid,
    /// Absolute step counter: actions dispatched since the rollout started.
    pub step: u64,
    pub inference_calls: u64,
    /// Dispatches that used up their whole control period.
    pub overruns: u64,
}

impl EpisodeState {
    fn new() -> Self {
        Self {
            episode_id: Uuid::new_v4(),
            step: 0,
            inference_calls: 0,
            overruns: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RolloutSummary {
    pub episode_id: Uuid,
    pub steps: u64,
    pub inference_calls: u64,
    pub overruns: u64,
}

impl From<EpisodeState> for RolloutSummary {
    fn from(state: EpisodeState) -> Self {
        Self {
            episode_id: state.episode_id,
            steps: state.step,
            inference_calls: state.inference_calls,
            overruns: state.overruns,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Fields {
    image: FieldKey,
    state: FieldKey,
    action: FieldKey,
}

/// Runs the observe / infer / ensemble / dispatch cycle for one rollout.
///
/// The policy is queried once per `exe_steps` dispatched actions, however
/// long inference takes; a slow call stalls the loop rather than skipping
/// steps.
pub struct ControlLoopDriver<C> {
    config: RolloutConfig,
    embodiment: EmbodimentDescriptor,
    client: C,
    ensembler: TemporalActionEnsembler,
    queues: ObservationQueueSet,
    fields: Fields,
    adapter: ObservationAdapter,
}

impl<C: InferenceClient> ControlLoopDriver<C> {
    pub fn new(
        config: RolloutConfig,
        embodiment: &EmbodimentDescriptor,
        client: C,
    ) -> Result<Self, ControlError> {
        config.validate()?;

        let ensembler = TemporalActionEnsembler::new(
            config.ensemble_coeff,
            config.action_horizon,
            config.exe_steps,
        )?;
        let queues = ObservationQueueSet::standard(
            config.observation_horizon,
            config.action_history_capacity,
        )?;
        let fields = Fields {
            image: queues.key(IMAGE_FIELD)?,
            state: queues.key(STATE_FIELD)?,
            action: queues.key(ACTION_FIELD)?,
        };

        Ok(Self {
            adapter: ObservationAdapter::new(embodiment),
            embodiment: embodiment.clone(),
            config,
            client,
            ensembler,
            queues,
            fields,
        })
    }

    pub fn config(&self) -> &RolloutConfig {
        &self.config
    }

    pub fn ensembler(&self) -> &TemporalActionEnsembler {
        &self.ensembler
    }

    pub fn queues(&self) -> &ObservationQueueSet {
        &self.queues
    }

    /// Drives the robot to its safe pose, then runs the control loop until
    /// `max_steps_per_rollout` actions have been dispatched. Without a step
    /// limit the loop only ends when the future is dropped or fails.
    pub async fn run_rollout(&mut self, robot: &mut Robot) -> Result<RolloutSummary, ControlError> {
        let mut episode = EpisodeState::new();
        let span = info_span!("rollout", episode = %episode.episode_id);
        self.drive(robot, &mut episode).instrument(span).await?;
        Ok(episode.into())
    }

    async fn drive(&mut self, robot: &mut Robot, episode: &mut EpisodeState) -> Result<(), ControlError> {
        self.ensembler.reset();
        self.queues.clear();
        robot.begin_episode();

        let period = self.config.control_period();
        let exe_steps = self.config.exe_steps;

        info!(robot = %self.embodiment.name(), "moving to initial pose");
        let deadline = robot.now() + period.as_secs_f64();
        robot.send_action(self.embodiment.init_pose(), deadline)?;
        sleep(self.config.settle_duration()).await;
        info!("control loop started");

        loop {
            if self.limit_reached(episode) {
                return Ok(());
            }

            self.observe(robot)?;
            let request = InferenceRequest {
                language_instruction: self.config.language_instruction.clone(),
                observation: self.queues.snapshot(),
            };
            let chunk = self.client.predict_action(&request).await?;
            episode.inference_calls += 1;

            if chunk.action_dim() != self.embodiment.dof() {
                return Err(ControlError::ActionDimension {
                    expected: self.embodiment.dof(),
                    actual: chunk.action_dim(),
                });
            }
            let actions = self
                .ensembler
                .update(&chunk.truncated(self.config.action_horizon))?;

            for n in 0..exe_steps {
                let started = Instant::now();
                let deadline = robot.now() + period.as_secs_f64();
                robot.send_action(actions.row(n), deadline)?;

                let elapsed = started.elapsed();
                let delay = pacing_delay(period, elapsed);
                if delay.is_zero() {
                    episode.overruns += 1;
                    warn!(step = episode.step, ?elapsed, "dispatch overran the control period");
                }
                debug!(step = episode.step, n, exe_steps, "action dispatched");
                sleep(delay).await;
                episode.step += 1;

                if self.limit_reached(episode) {
                    return Ok(());
                }
                if n + 1 < exe_steps {
                    self.observe(robot)?;
                }
            }
        }
    }

    fn limit_reached(&self, episode: &EpisodeState) -> bool {
        self.config
            .max_steps_per_rollout
            .is_some_and(|max| episode.step >= max)
    }

    fn observe(&mut self, robot: &mut Robot) -> Result<(), ControlError> {
        let raw = robot.capture_observation()?;
        let prepared = self.adapter.prepare(&raw)?;
        self.queues.push(self.fields.image, prepared.image)?;
        self.queues.push(self.fields.state, prepared.state)?;
        self.queues.push(self.fields.action, prepared.action)?;
        Ok(())
    }
}
