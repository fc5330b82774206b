//! The control loop: shared state plus the three activities.
//!
//! - [`ControlLoop::force_tick`]: fast cadence. Transform the latched wrench
//!   into the working frame, condition it, update the interaction mode and,
//!   in interaction, emit a compliance twist.
//! - [`ControlLoop::on_joint_state`]: per joint-state sample. Normalize the
//!   ordering and recompute the trajectory-tracking command.
//! - [`ControlLoop::trajectory_tick`]: slow cadence. Publish the command as
//!   joint velocities while motion is permitted.
//!
//! The loop is driven from a single thread (see [`crate::cycle`]), so the
//! activities never interleave.

use phri_common::config::ConfigError;
use phri_common::control::state::MotionMode;
use phri_common::dof::{CommandDiagonal, DofVector};
use phri_common::geometry::{FrameId, JointState, TwistCommand, WrenchSample};
use phri_common::robot::frames::{FrameLookup, LookupError};
use phri_common::robot::planning::{PlanError, PlanRequest, Planner, Trajectory};
use phri_common::robot::services::RobotServices;
use phri_common::robot::sinks::{TwistSink, VelocitySink};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::{ControllerUpdate, LoadedConfig, LoopTiming};
use crate::control::compliance::ComplianceController;
use crate::control::conditioning::suppress_if_small;
use crate::control::frames::transform_vector;
use crate::control::output::VelocityEmitter;
use crate::control::pid::GainSet;
use crate::control::tracker::TrajectoryTracker;
use crate::state::interaction::InteractionStateMachine;
use crate::state::joints::{JointOrderError, JointOrdering};

/// Result of one force tick.
#[derive(Debug, Clone, PartialEq)]
pub enum ForceOutcome {
    /// No wrench sample has arrived yet.
    NoSample,
    /// The frame lookup failed; nothing was changed.
    Skipped(LookupError),
    /// Force below threshold; trajectory following.
    FreeMotion,
    /// Force above threshold; this twist was sent.
    Interaction(TwistCommand),
}

/// Outcome of the startup service calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartupReport {
    pub twist_enabled: bool,
    pub sensor_zeroed: bool,
}

/// Diagnostic copy of the loop state.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopSnapshot {
    pub mode: MotionMode,
    pub motion_permitted: bool,
    pub command: CommandDiagonal,
    pub path_start_reached: bool,
    pub path_end_reached: bool,
    pub initial_position: Option<DofVector>,
    pub position: Option<DofVector>,
    pub velocity: Option<DofVector>,
    pub last_twist: TwistCommand,
}

/// Fixed parameters of the force path.
#[derive(Debug, Clone)]
struct ForceParams {
    working_frame: FrameId,
    suppression_threshold: f64,
    free_motion_resets_command: bool,
}

/// Owner of all control state and collaborators.
pub struct ControlLoop<C> {
    params: ForceParams,
    timing: LoopTiming,
    num_waypts: usize,

    frames: Box<dyn FrameLookup + Send>,
    velocity_sink: Box<dyn VelocitySink + Send>,
    twist_sink: Box<dyn TwistSink + Send>,

    interaction: InteractionStateMachine,
    compliance: ComplianceController,
    tracker: TrajectoryTracker<C>,
    emitter: VelocityEmitter,
    joints: JointOrdering,

    latest_wrench: Option<WrenchSample>,
    cmd: CommandDiagonal,
    initial_position: Option<DofVector>,
    position: Option<DofVector>,
    velocity: Option<DofVector>,
    reached_start: bool,
    reached_goal: bool,
    /// Downsampled waypoints of the active plan; seeds the next replan.
    plan_seed: Option<Vec<DofVector>>,
}

impl<C: Clock> ControlLoop<C> {
    /// Build the loop from a validated configuration.
    ///
    /// Fails only if the compliance gains are unusable.
    pub fn new(
        config: &LoadedConfig,
        clock: C,
        frames: Box<dyn FrameLookup + Send>,
        velocity_sink: Box<dyn VelocitySink + Send>,
        twist_sink: Box<dyn TwistSink + Send>,
    ) -> Result<Self, ConfigError> {
        let raw = &config.raw;
        let dofs = config.dofs();
        let working_frame = FrameId::new(raw.robot.working_frame.clone());
        let compliance = ComplianceController::new(config.compliance, working_frame.clone())?;

        Ok(Self {
            params: ForceParams {
                working_frame,
                suppression_threshold: raw.compliance.suppression_threshold,
                free_motion_resets_command: raw.compliance.free_motion_resets_command,
            },
            timing: config.timing,
            num_waypts: config.num_waypts,
            frames,
            velocity_sink,
            twist_sink,
            interaction: InteractionStateMachine::new(raw.compliance.interaction_threshold),
            compliance,
            tracker: TrajectoryTracker::new(
                config.gains.clone(),
                raw.controller.epsilon,
                raw.controller.max_cmd,
                clock,
            ),
            emitter: VelocityEmitter::new(dofs),
            joints: JointOrdering::new(dofs, raw.robot.joint_names.clone()),
            latest_wrench: None,
            cmd: CommandDiagonal::zeros(dofs),
            initial_position: None,
            position: None,
            velocity: None,
            reached_start: false,
            reached_goal: false,
            plan_seed: None,
        })
    }

    // ─── Force path ─────────────────────────────────────────────────

    /// Latch the newest wrench sample. It is reused until replaced.
    #[inline]
    pub fn on_wrench(&mut self, sample: WrenchSample) {
        self.latest_wrench = Some(sample);
    }

    /// Run one force tick at time `now` [s].
    pub fn force_tick(&mut self, now: f64) -> ForceOutcome {
        let Some(sample) = self.latest_wrench.as_ref() else {
            return ForceOutcome::NoSample;
        };

        let transform = match self.frames.lookup_transform(
            &self.params.working_frame,
            &sample.frame,
            None,
            self.timing.lookup_timeout,
        ) {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "could not transform wrench into working frame");
                return ForceOutcome::Skipped(e);
            }
        };

        let threshold = self.params.suppression_threshold;
        let force = suppress_if_small(transform_vector(&transform, &sample.force), threshold);
        let torque = suppress_if_small(transform_vector(&transform, &sample.torque), threshold);

        let transition = self.interaction.update(force.norm());
        if transition.changed() {
            debug!(
                from = ?transition.previous,
                to = ?transition.mode,
                force = force.norm(),
                "motion mode changed"
            );
        }

        match transition.mode {
            MotionMode::FreeMotion => {
                if self.params.free_motion_resets_command {
                    self.cmd.zero();
                }
                ForceOutcome::FreeMotion
            }
            MotionMode::Interaction => {
                self.cmd.zero();
                let twist = self
                    .compliance
                    .step(&force, &torque, &self.params.working_frame, now);
                self.twist_sink.send_twist(&twist);
                ForceOutcome::Interaction(twist)
            }
        }
    }

    // ─── Position path ──────────────────────────────────────────────

    /// Process one joint-state sample received at `now` [s].
    ///
    /// Samples whose joints cannot be mapped are rejected and leave all
    /// state untouched.
    pub fn on_joint_state(&mut self, state: &JointState, now: f64) -> Result<(), JointOrderError> {
        let joints = self.joints.normalize(state).inspect_err(|e| {
            warn!(error = %e, "joint state rejected");
        })?;

        if self.initial_position.is_none() {
            info!(position = %joints.position, "first joint state received");
            self.initial_position = Some(joints.position.clone());
        }

        self.cmd = self.tracker.command(&joints.position, now);
        self.position = Some(joints.position);
        self.velocity = Some(joints.velocity);

        if self.tracker.path_start().is_some() {
            self.reached_start = true;
        }
        if self.tracker.path_end().is_some() {
            self.reached_goal = true;
        }
        Ok(())
    }

    /// Publish the current command as joint velocities, if permitted.
    pub fn trajectory_tick(&mut self) -> Option<DofVector> {
        self.emitter.emit(
            &self.cmd,
            self.initial_position.is_some(),
            self.interaction.motion_permitted(),
            &mut *self.velocity_sink,
        )
    }

    // ─── Services & planning ────────────────────────────────────────

    /// Switch the servo input to twist commands and zero the F/T sensor.
    ///
    /// Failures are logged and reported, never fatal.
    pub fn start_services(&mut self, services: &mut dyn RobotServices) -> StartupReport {
        let twist_enabled = match services.switch_to_twist(self.timing.service_timeout) {
            Ok(()) => {
                info!("switched servo input to TWIST");
                true
            }
            Err(e) => {
                warn!(error = %e, "could not switch servo input to TWIST");
                false
            }
        };
        let sensor_zeroed = self.zero_sensor(services);
        StartupReport {
            twist_enabled,
            sensor_zeroed,
        }
    }

    fn zero_sensor(&mut self, services: &mut dyn RobotServices) -> bool {
        match services.zero_ft_sensor(self.timing.service_timeout) {
            Ok(()) => {
                info!("F/T sensor zeroed");
                true
            }
            Err(e) => {
                warn!(error = %e, "could not zero F/T sensor");
                false
            }
        }
    }

    /// Install `trajectory` as the active plan and permit motion.
    ///
    /// The downsampled waypoints are kept as the seed for the next replan.
    pub fn install_plan(&mut self, trajectory: Box<dyn Trajectory>) {
        let downsampled = trajectory.downsample(self.num_waypts);
        self.plan_seed = Some(downsampled.waypoints().to_vec());
        self.tracker.set_trajectory(trajectory);
        self.reached_start = false;
        self.reached_goal = false;
        self.interaction.permit_motion();
    }

    /// Zero the sensor, replan seeded with the active plan and install it.
    ///
    /// On planner failure the active trajectory is kept.
    pub fn replan(
        &mut self,
        planner: &mut dyn Planner,
        services: &mut dyn RobotServices,
        mut request: PlanRequest,
    ) -> Result<(), PlanError> {
        self.zero_sensor(services);

        if request.seed.is_none() {
            request.seed = self.plan_seed.clone();
        }
        info!(seeded = request.seed.is_some(), "replanning");
        let trajectory = planner.replan(&request).inspect_err(|e| {
            warn!(error = %e, "replanning failed, keeping active trajectory");
        })?;

        self.num_waypts = planner.num_waypts();
        self.install_plan(trajectory);
        info!("replanned trajectory installed, motion resumed");
        Ok(())
    }

    /// Replace the PID gains. Accumulated PID state is kept.
    pub fn set_gains(&mut self, gains: GainSet) {
        info!("controller gains replaced");
        self.tracker.set_gains(gains);
    }

    /// Apply a reloaded `[controller]` section: gains plus tracker limits.
    pub fn update_controller(&mut self, update: ControllerUpdate) {
        info!(
            epsilon = update.epsilon,
            max_cmd = update.max_cmd,
            "controller section reloaded"
        );
        self.tracker.set_gains(update.gains);
        self.tracker.set_limits(update.epsilon, update.max_cmd);
    }

    // ─── Accessors ──────────────────────────────────────────────────

    #[inline]
    pub fn mode(&self) -> MotionMode {
        self.interaction.mode()
    }

    #[inline]
    pub fn motion_permitted(&self) -> bool {
        self.interaction.motion_permitted()
    }

    #[inline]
    pub fn command(&self) -> &CommandDiagonal {
        &self.cmd
    }

    #[inline]
    pub fn tracker(&self) -> &TrajectoryTracker<C> {
        &self.tracker
    }

    #[inline]
    pub fn emitted(&self) -> u64 {
        self.emitter.emitted()
    }

    pub fn snapshot(&self) -> LoopSnapshot {
        LoopSnapshot {
            mode: self.interaction.mode(),
            motion_permitted: self.interaction.motion_permitted(),
            command: self.cmd.clone(),
            path_start_reached: self.reached_start,
            path_end_reached: self.reached_goal,
            initial_position: self.initial_position.clone(),
            position: self.position.clone(),
            velocity: self.velocity.clone(),
            last_twist: self.compliance.previous().clone(),
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
