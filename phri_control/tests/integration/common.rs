//! Shared rig: a cycle runner fed over unbounded channels.

use crossbeam_channel::{Receiver, Sender, unbounded};
use phri_common::dof::DofVector;
use phri_common::geometry::{JointState, TwistCommand, Vec3, WrenchSample};
use phri_control::clock::ManualClock;
use phri_control::config::{LoadedConfig, load_config_from_str};
use phri_control::control_loop::ControlLoop;
use phri_control::cycle::{CycleRunner, Feeds};
use phri_control::sim::{self, SENSOR_FRAME, SimulatedArm};

pub const JOINTS: [&str; 6] = [
    "shoulder_pan_joint",
    "shoulder_lift_joint",
    "elbow_joint",
    "wrist_1_joint",
    "wrist_2_joint",
    "wrist_3_joint",
];

/// Six joints, both ticks every 10 ms, P-only tracking.
pub const CONFIG: &str = r#"
[shared]
log_level = "debug"
service_name = "phri_control_test"

[robot]
dofs = 6
joint_names = [
    "shoulder_pan_joint",
    "shoulder_lift_joint",
    "elbow_joint",
    "wrist_1_joint",
    "wrist_2_joint",
    "wrist_3_joint",
]
working_frame = "tool0"

[controller]
type = "pid"
p_gain = 2.0
i_gain = 0.0
d_gain = 0.0
epsilon = 0.05
max_cmd = 1.0

[compliance]
stiffness = 1.0
damping = 0.1
interaction_threshold = 3.0
suppression_threshold = 1.0

[timing]
force_period_s = 0.01
trajectory_period_s = 0.01
"#;

pub struct Rig {
    pub runner: CycleRunner<ManualClock>,
    pub clock: ManualClock,
    pub config: LoadedConfig,
    pub wrench: Sender<WrenchSample>,
    pub joints: Sender<JointState>,
    pub velocities: Receiver<DofVector>,
    pub twists: Receiver<TwistCommand>,
}

impl Rig {
    /// Set the clock to `t` and poll once.
    pub fn poll_at(&mut self, t: f64) -> phri_control::cycle::PollReport {
        self.clock.set(t);
        self.runner.poll(t).unwrap()
    }

    /// Send a push of `fx` newtons along the working-frame x axis.
    pub fn push(&self, fx: f64, stamp: f64) {
        self.wrench.send(push_sample(fx, stamp)).unwrap();
    }

    pub fn joint_state(&self, arm: &SimulatedArm, stamp: f64) {
        self.joints.send(arm.joint_state(stamp)).unwrap();
    }
}

pub fn rig() -> Rig {
    rig_with(CONFIG)
}

pub fn rig_with(text: &str) -> Rig {
    let config = load_config_from_str(text).unwrap();
    let clock = ManualClock::new();

    let (wrench_tx, wrench_rx) = unbounded();
    let (joints_tx, joints_rx) = unbounded();
    let (velocity_tx, velocities) = unbounded();
    let (twist_tx, twists) = unbounded();

    let control = ControlLoop::new(
        &config,
        clock.clone(),
        Box::new(sim::frame_tree(&config.raw.robot.working_frame)),
        Box::new(velocity_tx),
        Box::new(twist_tx),
    )
    .unwrap();
    let runner = CycleRunner::new(
        control,
        Feeds {
            wrench: wrench_rx,
            joints: joints_rx,
        },
        clock.clone(),
        config.timing.force_period,
        config.timing.trajectory_period,
    );

    Rig {
        runner,
        clock,
        config,
        wrench: wrench_tx,
        joints: joints_tx,
        velocities,
        twists,
    }
}

/// Sensor-frame sample that reads `fx` along working-frame x.
///
/// The simulated sensor is yawed +90°, so working x is sensor −y.
pub fn push_sample(fx: f64, stamp: f64) -> WrenchSample {
    WrenchSample::new(Vec3::new(0.0, -fx, 0.0), Vec3::zeros(), SENSOR_FRAME, stamp)
}

pub fn arm_at(values: &[f64]) -> SimulatedArm {
    SimulatedArm::new(
        JOINTS.iter().map(|s| s.to_string()).collect(),
        DofVector::from_slice(values).unwrap(),
    )
}

pub fn assert_close(actual: f64, expected: f64, tol: f64) {
    assert!(
        (actual - expected).abs() < tol,
        "expected {expected} ± {tol}, got {actual}"
    );
}

/// Poll time for tick `k` of a 10 ms schedule, kept mid-period so float
/// rounding never decides whether a tick is due.
pub fn tick_time(k: usize) -> f64 {
    if k == 0 { 0.0 } else { k as f64 * 0.01 + 0.005 }
}
