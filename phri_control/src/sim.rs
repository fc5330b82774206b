//! Stand-alone simulation collaborators for the binary.
//!
//! A kinematic arm that integrates commanded joint velocities, a scripted
//! force/torque feed, a straight-line planner and always-available services.
//! Producers run on their own threads and talk to the cycle runner over
//! `crossbeam-channel`s, as a driver stack would.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use phri_common::dof::DofVector;
use phri_common::geometry::{FrameTransform, JointState, TwistCommand, Vec3, WrenchSample};
use phri_common::robot::frames::StaticFrameTree;
use phri_common::robot::planning::{
    PlanError, PlanRequest, Planner, Trajectory, WaypointTrajectory,
};
use phri_common::robot::services::{RobotServices, ServiceError};
use tracing::{debug, info};

use crate::clock::{Clock, MonotonicClock};

/// Sensor frame name published by the simulated F/T sensor.
pub const SENSOR_FRAME: &str = "ft_frame";

/// Frame tree `base_link ← tool0 ← ft_frame`, the sensor yawed 90° about z.
pub fn frame_tree(working_frame: &str) -> StaticFrameTree {
    let h = core::f64::consts::FRAC_1_SQRT_2;
    let mut tree = StaticFrameTree::new();
    tree.insert(FrameTransform::identity("base_link", working_frame));
    tree.insert(FrameTransform::from_xyzw(
        working_frame,
        SENSOR_FRAME,
        [0.0, 0.0, h, h],
        Vec3::new(0.0, 0.0, 0.05),
    ));
    tree
}

// ─── Arm ────────────────────────────────────────────────────────────

/// Kinematic arm: position integrates the latest velocity command.
#[derive(Debug, Clone)]
pub struct SimulatedArm {
    names: Vec<String>,
    position: DofVector,
    velocity: DofVector,
}

impl SimulatedArm {
    pub fn new(names: Vec<String>, initial: DofVector) -> Self {
        let dofs = initial.len();
        Self {
            names,
            position: initial,
            velocity: DofVector::zeros(dofs),
        }
    }

    /// Latch a new velocity command.
    pub fn command(&mut self, velocity: &DofVector) {
        if velocity.len() == self.position.len() {
            self.velocity = velocity.clone();
        }
    }

    /// Advance by `dt` [s].
    pub fn step(&mut self, dt: f64) {
        let v = self.velocity.clone();
        self.position.add_scaled(dt, &v);
    }

    #[inline]
    pub fn position(&self) -> &DofVector {
        &self.position
    }

    /// Joint state with channels rotated by one, as drivers that sort joint
    /// names alphabetically publish them.
    pub fn joint_state(&self, stamp: f64) -> JointState {
        let n = self.names.len();
        let order = (0..n).map(|k| (k + 1) % n);
        let mut state = JointState {
            names: Vec::with_capacity(n),
            position: Vec::with_capacity(n),
            velocity: Vec::with_capacity(n),
            stamp,
        };
        for i in order {
            state.names.push(self.names[i].clone());
            state.position.push(self.position[i]);
            state.velocity.push(self.velocity[i]);
        }
        state
    }
}

/// Run `arm` on its own thread at `period`, publishing joint states and
/// consuming velocity commands. Twists are logged and dropped.
pub fn spawn_arm(
    mut arm: SimulatedArm,
    period: Duration,
    clock: MonotonicClock,
    joints: Sender<JointState>,
    velocities: Receiver<DofVector>,
    twists: Receiver<TwistCommand>,
    running: Arc<AtomicBool>,
) -> JoinHandle<SimulatedArm> {
    thread::spawn(move || {
        let dt = period.as_secs_f64();
        while running.load(Ordering::Relaxed) {
            for v in velocities.try_iter() {
                arm.command(&v);
            }
            for t in twists.try_iter() {
                debug!(linear = ?t.linear.as_slice(), angular = ?t.angular.as_slice(), "twist");
            }
            arm.step(dt);
            if joints.send(arm.joint_state(clock.now())).is_err() {
                break;
            }
            thread::sleep(period);
        }
        arm
    })
}

// ─── Force/torque feed ──────────────────────────────────────────────

/// A push of constant force along the working-frame x axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Push {
    pub at: f64,
    pub duration: f64,
    pub force: f64,
}

/// Scripted F/T sensor: small bias noise plus scheduled pushes.
#[derive(Debug, Clone)]
pub struct ScriptedWrench {
    pushes: Vec<Push>,
}

impl ScriptedWrench {
    pub fn new(pushes: Vec<Push>) -> Self {
        Self { pushes }
    }

    /// Sample at time `t` [s] since start, in the sensor frame.
    pub fn sample(&self, t: f64) -> WrenchSample {
        let bias = 0.2 * (t * 7.0).sin();
        let push: f64 = self
            .pushes
            .iter()
            .filter(|p| t >= p.at && t < p.at + p.duration)
            .map(|p| p.force)
            .sum();
        // Sensor is yawed +90° from the working frame: working x = sensor −y.
        WrenchSample::new(
            Vec3::new(bias, -push, bias),
            Vec3::new(0.0, 0.0, bias),
            SENSOR_FRAME,
            t,
        )
    }
}

/// Publish `script` samples every `period` until `running` clears.
pub fn spawn_wrench_feed(
    script: ScriptedWrench,
    period: Duration,
    clock: MonotonicClock,
    wrench: Sender<WrenchSample>,
    running: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        while running.load(Ordering::Relaxed) {
            if wrench.send(script.sample(clock.now())).is_err() {
                break;
            }
            thread::sleep(period);
        }
    })
}

// ─── Planner & services ─────────────────────────────────────────────

/// Straight-line joint-space planner.
#[derive(Debug, Clone, Copy)]
pub struct LinearPlanner {
    num_waypts: usize,
}

impl LinearPlanner {
    pub fn new(num_waypts: usize) -> Self {
        Self { num_waypts }
    }
}

impl Planner for LinearPlanner {
    fn replan(&mut self, request: &PlanRequest) -> Result<Box<dyn Trajectory>, PlanError> {
        let start = match &request.seed {
            Some(seed) => seed.first().cloned().unwrap_or_else(|| request.start.clone()),
            None => request.start.clone(),
        };
        let traj = WaypointTrajectory::linear(&start, &request.goal, request.horizon, request.timestep)?;
        Ok(Box::new(traj))
    }

    fn num_waypts(&self) -> usize {
        self.num_waypts
    }
}

/// Services that always succeed immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimServices;

impl RobotServices for SimServices {
    fn switch_to_twist(&mut self, _timeout: Duration) -> Result<(), ServiceError> {
        info!("sim: servo input set to TWIST");
        Ok(())
    }

    fn zero_ft_sensor(&mut self, _timeout: Duration) -> Result<(), ServiceError> {
        info!("sim: F/T bias zeroed");
        Ok(())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
