use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};

use rollout::config::RolloutConfig;
use rollout::control::EvalSession;
use rollout::embodiment::{EmbodimentDescriptor, EmbodimentRegistry};
use rollout::inference::HttpInferenceClient;
use rollout::logging::init_tracing;
use rollout::robot::Robot;
use rollout::robot::sim::{SimArm, SimCamera};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Evaluate a remote manipulation policy on a robot in closed loop"
)]
struct Args {
    /// JSON config file; flags given on the command line override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Embodiment to drive, e.g. g1_dex1, z1_dual_dex1_realsense, z1_realsense
    #[arg(long)]
    robot_type: Option<String>,

    /// Base URL of the policy server
    #[arg(long)]
    server_url: Option<String>,

    #[arg(long)]
    action_horizon: Option<usize>,

    /// Actions dispatched per inference call
    #[arg(long)]
    exe_steps: Option<usize>,

    #[arg(long)]
    observation_horizon: Option<usize>,

    /// Control frequency in Hz
    #[arg(long)]
    control_freq: Option<f64>,

    #[arg(long)]
    language_instruction: Option<String>,

    #[arg(long)]
    num_rollouts_planned: Option<usize>,

    #[arg(long)]
    output_dir: Option<String>,

    /// Temporal ensembling decay rate
    #[arg(long)]
    ensemble_coeff: Option<f64>,

    /// Per-request timeout in seconds
    #[arg(long)]
    inference_timeout_secs: Option<f64>,

    #[arg(long)]
    inference_retries: Option<u32>,

    /// Stop each rollout after this many actions
    #[arg(long)]
    max_steps: Option<u64>,

    /// Drive simulated devices instead of hardware
    #[arg(long)]
    dry_run: bool,

    /// Simulated camera frame size as HEIGHTxWIDTH
    #[arg(long, default_value = "480x640", value_parser = parse_frame_size)]
    sim_frame: (usize, usize),
}

fn parse_frame_size(raw: &str) -> Result<(usize, usize), String> {
    let (h, w) = raw
        .split_once('x')
        .ok_or_else(|| format!("expected HEIGHTxWIDTH, got {raw:?}"))?;
    let parse = |v: &str| v.trim().parse::<usize>().map_err(|err| err.to_string());
    Ok((parse(h)?, parse(w)?))
}

impl Args {
    fn into_config(self) -> Result<RolloutConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => RolloutConfig::from_json_file(path)?,
            None => RolloutConfig::default(),
        };

        if let Some(robot_type) = self.robot_type {
            config.robot_type = robot_type;
        }
        if let Some(server_url) = self.server_url {
            config.server_url = server_url;
        }
        if let Some(action_horizon) = self.action_horizon {
            config.action_horizon = action_horizon;
        }
        if let Some(exe_steps) = self.exe_steps {
            config.exe_steps = exe_steps;
        }
        if let Some(observation_horizon) = self.observation_horizon {
            config.observation_horizon = observation_horizon;
        }
        if let Some(control_freq) = self.control_freq {
            config.control_freq = control_freq;
        }
        if let Some(instruction) = self.language_instruction {
            config.language_instruction = instruction;
        }
        if let Some(num_rollouts) = self.num_rollouts_planned {
            config.num_rollouts_planned = num_rollouts;
        }
        if let Some(output_dir) = self.output_dir {
            config.output_dir = output_dir;
        }
        if let Some(coeff) = self.ensemble_coeff {
            config.ensemble_coeff = coeff;
        }
        if let Some(retries) = self.inference_retries {
            config.inference_retries = retries;
        }
        if self.inference_timeout_secs.is_some() {
            config.inference_timeout_secs = self.inference_timeout_secs;
        }
        if self.max_steps.is_some() {
            config.max_steps_per_rollout = self.max_steps;
        }

        config.validate()?;
        Ok(config)
    }
}

/// One simulated actuator holding the whole joint vector, plus the policy camera.
fn sim_robot(embodiment: &EmbodimentDescriptor, (height, width): (usize, usize)) -> Robot {
    Robot::new(embodiment.name())
        .with_device("sim_arm", SimArm::arm(embodiment.init_pose().to_vec()))
        .with_device(embodiment.camera_key(), SimCamera::new(height, width))
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let dry_run = args.dry_run;
    let sim_frame = args.sim_frame;
    let config = args.into_config()?;
    let registry = EmbodimentRegistry::builtin()?;
    let embodiment = registry.get(&config.robot_type)?;

    if !dry_run {
        return Err(format!(
            "no hardware driver for {:?} is linked into this binary; rerun with --dry-run",
            config.robot_type
        )
        .into());
    }
    let mut robot = sim_robot(embodiment, sim_frame);

    let client = HttpInferenceClient::new(
        &config.server_url,
        config.inference_timeout(),
        config.retry_policy(),
    );
    info!(
        robot_type = %config.robot_type,
        endpoint = client.endpoint(),
        rollouts = config.num_rollouts_planned,
        "starting evaluation"
    );

    let mut session = EvalSession::new(config, &registry, client)?;
    let stop = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "could not listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };
    let report = session.run(&mut robot, stop).await?;

    info!(
        completed = report.rollouts.len(),
        stopped = report.stopped,
        "evaluation finished"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = init_tracing() {
        eprintln!("failed to initialise logging: {err}");
    }

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "robot client failed");
            ExitCode::FAILURE
        }
    }
}
