//! Configuration structures for the control loop.
//!
//! All sections use `serde::Deserialize` for TOML loading and reject unknown
//! keys. Optional fields fall back to the defaults in [`crate::consts`].
//! [`PhriConfig::validate`] names the offending dotted key on failure.

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, SharedConfig};
use crate::consts::{
    DAMPING_DEFAULT, DEFAULT_DOFS, FORCE_PERIOD_S, INTERACTION_THRESHOLD_DEFAULT,
    LOOKUP_TIMEOUT_S, MAX_DOFS, NUM_WAYPTS_DEFAULT, PERIOD_S_MAX, PERIOD_S_MIN,
    STIFFNESS_DEFAULT, SUPPRESSION_THRESHOLD_DEFAULT, TRAJECTORY_PERIOD_S, WORKING_FRAME_DEFAULT,
};
use crate::dof::DofVector;

/// Controller types this build implements.
pub const SUPPORTED_CONTROLLERS: &[&str] = &["pid"];

// ─── Gains ──────────────────────────────────────────────────────────

/// A gain given either as one scalar for every DOF or as a per-DOF list.
///
/// ```toml
/// p_gain = 0.5                       # broadcast
/// d_gain = [0.1, 0.1, 0.1, 0.05, 0.05, 0.05]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GainSpec {
    Scalar(f64),
    PerDof(Vec<f64>),
}

impl GainSpec {
    /// Expand to exactly `dofs` entries.
    ///
    /// A per-DOF list of the wrong length is an error naming `key`.
    pub fn resolve(&self, key: &str, dofs: usize) -> Result<DofVector, ConfigError> {
        match self {
            Self::Scalar(v) => {
                if v.is_nan() {
                    return Err(ConfigError::invalid(key, "must not be NaN"));
                }
                Ok(DofVector::filled(dofs, *v))
            }
            Self::PerDof(values) => {
                if values.len() != dofs {
                    return Err(ConfigError::invalid(
                        key,
                        format!("expected {dofs} entries, got {}", values.len()),
                    ));
                }
                if values.iter().any(|v| v.is_nan()) {
                    return Err(ConfigError::invalid(key, "must not contain NaN"));
                }
                DofVector::from_slice(values)
                    .ok_or_else(|| ConfigError::invalid(key, "too many entries"))
            }
        }
    }
}

fn default_i_min() -> GainSpec {
    GainSpec::Scalar(f64::NEG_INFINITY)
}
fn default_i_max() -> GainSpec {
    GainSpec::Scalar(f64::INFINITY)
}

// ─── Sections ───────────────────────────────────────────────────────

/// `[robot]` — arm description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RobotConfig {
    /// Number of controlled joints.
    #[serde(default = "default_dofs")]
    pub dofs: usize,

    /// Internal joint ordering. Empty = adopt the feed's first ordering.
    #[serde(default)]
    pub joint_names: Vec<String>,

    /// Frame wrench samples are expressed in before processing.
    #[serde(default = "default_working_frame")]
    pub working_frame: String,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            dofs: DEFAULT_DOFS,
            joint_names: Vec::new(),
            working_frame: WORKING_FRAME_DEFAULT.to_string(),
        }
    }
}

fn default_dofs() -> usize {
    DEFAULT_DOFS
}
fn default_working_frame() -> String {
    WORKING_FRAME_DEFAULT.to_string()
}

/// `[controller]` — trajectory-tracking PID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControllerConfig {
    /// Controller implementation (only `"pid"`).
    #[serde(rename = "type")]
    pub kind: String,

    pub p_gain: GainSpec,
    pub i_gain: GainSpec,
    pub d_gain: GainSpec,

    /// Integral lower bound (only applied when `clamp_integral`).
    #[serde(default = "default_i_min")]
    pub i_min: GainSpec,

    /// Integral upper bound (only applied when `clamp_integral`).
    #[serde(default = "default_i_max")]
    pub i_max: GainSpec,

    /// Clamp the integral error into `[i_min, i_max]` (default off).
    #[serde(default)]
    pub clamp_integral: bool,

    /// Proximity threshold for start/goal detection [rad].
    pub epsilon: f64,

    /// Maximum commanded joint velocity magnitude [rad/s].
    pub max_cmd: f64,
}

/// `[compliance]` — admittance law and interaction detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComplianceConfig {
    /// Stiffness `Kp` (inverse compliance). Must be non-zero.
    #[serde(default = "default_stiffness")]
    pub stiffness: f64,

    /// Damping `Kd` applied to the previous twist.
    #[serde(default = "default_damping")]
    pub damping: f64,

    /// Conditioned force magnitude that switches to interaction [N].
    #[serde(default = "default_interaction_threshold")]
    pub interaction_threshold: f64,

    /// Force/torque magnitude below which readings are zeroed.
    #[serde(default = "default_suppression_threshold")]
    pub suppression_threshold: f64,

    /// Zero the trajectory command on every free-motion tick.
    #[serde(default = "default_true")]
    pub free_motion_resets_command: bool,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            stiffness: STIFFNESS_DEFAULT,
            damping: DAMPING_DEFAULT,
            interaction_threshold: INTERACTION_THRESHOLD_DEFAULT,
            suppression_threshold: SUPPRESSION_THRESHOLD_DEFAULT,
            free_motion_resets_command: true,
        }
    }
}

fn default_stiffness() -> f64 {
    STIFFNESS_DEFAULT
}
fn default_damping() -> f64 {
    DAMPING_DEFAULT
}
fn default_interaction_threshold() -> f64 {
    INTERACTION_THRESHOLD_DEFAULT
}
fn default_suppression_threshold() -> f64 {
    SUPPRESSION_THRESHOLD_DEFAULT
}
fn default_true() -> bool {
    true
}

/// `[timing]` — tick periods and bounded waits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimingConfig {
    /// Force-processing tick period [s] (default 1/500).
    #[serde(default = "default_force_period")]
    pub force_period_s: f64,

    /// Trajectory-emission tick period [s] (default 0.1).
    #[serde(default = "default_trajectory_period")]
    pub trajectory_period_s: f64,

    /// Frame lookup timeout [s].
    #[serde(default = "default_timeout")]
    pub lookup_timeout_s: f64,

    /// Service call timeout [s].
    #[serde(default = "default_timeout")]
    pub service_timeout_s: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            force_period_s: FORCE_PERIOD_S,
            trajectory_period_s: TRAJECTORY_PERIOD_S,
            lookup_timeout_s: LOOKUP_TIMEOUT_S,
            service_timeout_s: LOOKUP_TIMEOUT_S,
        }
    }
}

fn default_force_period() -> f64 {
    FORCE_PERIOD_S
}
fn default_trajectory_period() -> f64 {
    TRAJECTORY_PERIOD_S
}
fn default_timeout() -> f64 {
    LOOKUP_TIMEOUT_S
}

/// `[trajectory]` — initial plan request (joint angles in degrees).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrajectoryConfig {
    pub start_deg: Vec<f64>,
    pub goal_deg: Vec<f64>,
    /// Optional end-effector goal position [m].
    #[serde(default)]
    pub goal_pose: Option<[f64; 3]>,
    /// Planning horizon [s].
    pub horizon_s: f64,
    /// Waypoint spacing [s].
    pub timestep_s: f64,
    #[serde(default = "default_num_waypts")]
    pub num_waypts: usize,
}

fn default_num_waypts() -> usize {
    NUM_WAYPTS_DEFAULT
}

// ─── Top-Level Config ───────────────────────────────────────────────

/// Complete control-loop configuration.
///
/// Loaded from TOML at startup; immutable afterwards except for a wholesale
/// gain replacement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhriConfig {
    #[serde(default)]
    pub shared: SharedConfig,
    #[serde(default)]
    pub robot: RobotConfig,
    pub controller: ControllerConfig,
    #[serde(default)]
    pub compliance: ComplianceConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub trajectory: Option<TrajectoryConfig>,
}

fn check_positive(key: &str, value: f64) -> Result<(), ConfigError> {
    if !(value.is_finite() && value > 0.0) {
        return Err(ConfigError::invalid(key, format!("{value} must be finite and > 0")));
    }
    Ok(())
}

fn check_non_negative(key: &str, value: f64) -> Result<(), ConfigError> {
    if !(value.is_finite() && value >= 0.0) {
        return Err(ConfigError::invalid(key, format!("{value} must be finite and >= 0")));
    }
    Ok(())
}

fn check_period(key: &str, value: f64) -> Result<(), ConfigError> {
    if !(PERIOD_S_MIN..=PERIOD_S_MAX).contains(&value) {
        return Err(ConfigError::invalid(
            key,
            format!("{value} out of range [{PERIOD_S_MIN}, {PERIOD_S_MAX}]"),
        ));
    }
    Ok(())
}

impl PhriConfig {
    /// Validate every section. The first failure is returned.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        // ── robot ──
        let dofs = self.robot.dofs;
        if dofs == 0 || dofs > MAX_DOFS {
            return Err(ConfigError::invalid(
                "robot.dofs",
                format!("{dofs} out of range [1, {MAX_DOFS}]"),
            ));
        }
        if !self.robot.joint_names.is_empty() && self.robot.joint_names.len() != dofs {
            return Err(ConfigError::invalid(
                "robot.joint_names",
                format!("expected {dofs} names, got {}", self.robot.joint_names.len()),
            ));
        }
        if self.robot.working_frame.is_empty() {
            return Err(ConfigError::invalid("robot.working_frame", "cannot be empty"));
        }

        // ── controller ──
        let c = &self.controller;
        if !SUPPORTED_CONTROLLERS.contains(&c.kind.as_str()) {
            return Err(ConfigError::UnknownController {
                key: "controller.type".to_string(),
                value: c.kind.clone(),
            });
        }
        c.p_gain.resolve("controller.p_gain", dofs)?;
        c.i_gain.resolve("controller.i_gain", dofs)?;
        c.d_gain.resolve("controller.d_gain", dofs)?;
        let i_min = c.i_min.resolve("controller.i_min", dofs)?;
        let i_max = c.i_max.resolve("controller.i_max", dofs)?;
        if i_min.iter().zip(i_max.iter()).any(|(lo, hi)| lo > hi) {
            return Err(ConfigError::invalid("controller.i_min", "exceeds controller.i_max"));
        }
        check_positive("controller.epsilon", c.epsilon)?;
        check_positive("controller.max_cmd", c.max_cmd)?;

        // ── compliance ──
        let k = &self.compliance;
        if k.stiffness == 0.0 || !k.stiffness.is_finite() {
            return Err(ConfigError::invalid(
                "compliance.stiffness",
                format!("{} must be finite and non-zero", k.stiffness),
            ));
        }
        if !k.damping.is_finite() {
            return Err(ConfigError::invalid("compliance.damping", "must be finite"));
        }
        check_non_negative("compliance.interaction_threshold", k.interaction_threshold)?;
        check_non_negative("compliance.suppression_threshold", k.suppression_threshold)?;

        // ── timing ──
        let t = &self.timing;
        check_period("timing.force_period_s", t.force_period_s)?;
        check_period("timing.trajectory_period_s", t.trajectory_period_s)?;
        check_positive("timing.lookup_timeout_s", t.lookup_timeout_s)?;
        check_positive("timing.service_timeout_s", t.service_timeout_s)?;

        // ── trajectory ──
        if let Some(traj) = &self.trajectory {
            if traj.start_deg.len() != dofs {
                return Err(ConfigError::invalid(
                    "trajectory.start_deg",
                    format!("expected {dofs} entries, got {}", traj.start_deg.len()),
                ));
            }
            if traj.goal_deg.len() != dofs {
                return Err(ConfigError::invalid(
                    "trajectory.goal_deg",
                    format!("expected {dofs} entries, got {}", traj.goal_deg.len()),
                ));
            }
            check_positive("trajectory.horizon_s", traj.horizon_s)?;
            check_positive("trajectory.timestep_s", traj.timestep_s)?;
            if traj.num_waypts < 2 {
                return Err(ConfigError::invalid("trajectory.num_waypts", "must be >= 2"));
            }
        }

        Ok(())
    }
}
