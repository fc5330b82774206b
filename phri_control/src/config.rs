//! TOML configuration loader with validation.
//!
//! Loads [`PhriConfig`], validates it, and resolves it into the runtime
//! parameter bundle [`LoadedConfig`]: per-DOF gain vectors, compliance gains,
//! tick periods as `Duration`s and the initial plan request in radians.
//!
//! Gains can be reloaded at runtime from a replacement file. Only the
//! `[controller]` gains may change; DOF count and controller type require a
//! restart.

use std::path::Path;
use std::time::Duration;

use phri_common::config::{ConfigError, ConfigLoader};
use phri_common::control::config::{ControllerConfig, PhriConfig, TrajectoryConfig};
use phri_common::dof::DofVector;
use phri_common::geometry::Vec3;
use phri_common::robot::planning::PlanRequest;

use crate::control::compliance::ComplianceGains;
use crate::control::pid::GainSet;

// ─── Loaded Config Bundle ───────────────────────────────────────────

/// Tick periods and bounded waits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopTiming {
    pub force_period: Duration,
    pub trajectory_period: Duration,
    pub lookup_timeout: Duration,
    pub service_timeout: Duration,
}

/// Complete validated configuration, ready for runtime use.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The parsed file, kept for reload scope checks and diagnostics.
    pub raw: PhriConfig,
    pub gains: GainSet,
    pub compliance: ComplianceGains,
    pub timing: LoopTiming,
    /// Initial plan request, if a `[trajectory]` section is present.
    pub plan: Option<PlanRequest>,
    pub num_waypts: usize,
}

impl LoadedConfig {
    #[inline]
    pub fn dofs(&self) -> usize {
        self.raw.robot.dofs
    }
}

// ─── Loading Functions ──────────────────────────────────────────────

/// Load, validate and resolve the configuration file at `path`.
pub fn load_config(path: &Path) -> Result<LoadedConfig, ConfigError> {
    resolve(PhriConfig::load(path)?)
}

/// Load config from a TOML string (for testing).
pub fn load_config_from_str(text: &str) -> Result<LoadedConfig, ConfigError> {
    resolve(PhriConfig::parse(text)?)
}

/// Validate `raw` and derive the runtime bundle.
pub fn resolve(raw: PhriConfig) -> Result<LoadedConfig, ConfigError> {
    raw.validate()?;

    let dofs = raw.robot.dofs;
    let gains = resolve_gains(&raw.controller, dofs)?;
    let compliance = ComplianceGains {
        stiffness: raw.compliance.stiffness,
        damping: raw.compliance.damping,
    };
    let timing = LoopTiming {
        force_period: Duration::from_secs_f64(raw.timing.force_period_s),
        trajectory_period: Duration::from_secs_f64(raw.timing.trajectory_period_s),
        lookup_timeout: Duration::from_secs_f64(raw.timing.lookup_timeout_s),
        service_timeout: Duration::from_secs_f64(raw.timing.service_timeout_s),
    };
    let plan = raw.trajectory.as_ref().map(plan_request).transpose()?;
    let num_waypts = raw
        .trajectory
        .as_ref()
        .map_or(phri_common::consts::NUM_WAYPTS_DEFAULT, |t| t.num_waypts);

    Ok(LoadedConfig {
        raw,
        gains,
        compliance,
        timing,
        plan,
        num_waypts,
    })
}

/// Expand `[controller]` into a per-DOF [`GainSet`].
pub fn resolve_gains(controller: &ControllerConfig, dofs: usize) -> Result<GainSet, ConfigError> {
    Ok(GainSet {
        p: controller.p_gain.resolve("controller.p_gain", dofs)?,
        i: controller.i_gain.resolve("controller.i_gain", dofs)?,
        d: controller.d_gain.resolve("controller.d_gain", dofs)?,
        i_min: controller.i_min.resolve("controller.i_min", dofs)?,
        i_max: controller.i_max.resolve("controller.i_max", dofs)?,
        clamp_integral: controller.clamp_integral,
    })
}

fn degrees(key: &str, values: &[f64]) -> Result<DofVector, ConfigError> {
    let radians: DofVector = values.iter().map(|deg| deg.to_radians()).collect();
    if !radians.is_finite() {
        return Err(ConfigError::invalid(key, "must be finite"));
    }
    Ok(radians)
}

fn plan_request(traj: &TrajectoryConfig) -> Result<PlanRequest, ConfigError> {
    Ok(PlanRequest {
        start: degrees("trajectory.start_deg", &traj.start_deg)?,
        goal: degrees("trajectory.goal_deg", &traj.goal_deg)?,
        goal_pose: traj.goal_pose.map(|[x, y, z]| Vec3::new(x, y, z)),
        horizon: traj.horizon_s,
        timestep: traj.timestep_s,
        seed: None,
    })
}

// ─── Hot-Reload: Gains ──────────────────────────────────────────────

/// Controller parameters applied by a reload.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerUpdate {
    pub gains: GainSet,
    /// Start/goal tolerance of the tracker [rad].
    pub epsilon: f64,
    /// Per-DOF command limit of the tracker.
    pub max_cmd: f64,
}

/// Outcome of a gain reload.
#[derive(Debug, Clone, PartialEq)]
pub enum ReloadResult {
    /// New controller parameters accepted; apply them with
    /// `ControlLoop::update_controller`.
    Success(ControllerUpdate),
    /// Parse/validation failed or a non-reloadable field changed.
    /// The active config is unchanged.
    Rejected(String),
}

fn scope_violation(what: &str) -> ConfigError {
    ConfigError::ValidationError(format!("{what} changed (requires restart)"))
}

/// Check that `shadow` only differs from `active` in reloadable fields.
///
/// Reloadable: the `[controller]` gains, integral bounds, clamp switch,
/// `epsilon` and `max_cmd`. Every other section, and `controller.type`,
/// requires a restart.
pub fn validate_reload_scope(active: &PhriConfig, shadow: &PhriConfig) -> Result<(), ConfigError> {
    if active.robot.dofs != shadow.robot.dofs {
        return Err(ConfigError::ValidationError(format!(
            "robot.dofs changed: {} → {} (requires restart)",
            active.robot.dofs, shadow.robot.dofs
        )));
    }
    if active.robot != shadow.robot {
        return Err(scope_violation("[robot]"));
    }
    if active.controller.kind != shadow.controller.kind {
        return Err(ConfigError::ValidationError(format!(
            "controller.type changed: {} → {} (requires restart)",
            active.controller.kind, shadow.controller.kind
        )));
    }
    if active.shared != shadow.shared {
        return Err(scope_violation("[shared]"));
    }
    if active.compliance != shadow.compliance {
        return Err(scope_violation("[compliance]"));
    }
    if active.timing != shadow.timing {
        return Err(scope_violation("[timing]"));
    }
    if active.trajectory != shadow.trajectory {
        return Err(scope_violation("[trajectory]"));
    }
    Ok(())
}

/// Parse a replacement file and swap the controller section into `active`.
///
/// On failure `active` is unchanged.
pub fn reload_gains(active: &mut LoadedConfig, text: &str) -> ReloadResult {
    let shadow = match PhriConfig::parse(text).and_then(|cfg| {
        cfg.validate()?;
        validate_reload_scope(&active.raw, &cfg)?;
        Ok(cfg)
    }) {
        Ok(cfg) => cfg,
        Err(e) => return ReloadResult::Rejected(e.to_string()),
    };

    let gains = match resolve_gains(&shadow.controller, active.dofs()) {
        Ok(g) => g,
        Err(e) => return ReloadResult::Rejected(e.to_string()),
    };

    let update = ControllerUpdate {
        gains: gains.clone(),
        epsilon: shadow.controller.epsilon,
        max_cmd: shadow.controller.max_cmd,
    };
    active.raw.controller = shadow.controller;
    active.gains = gains;
    ReloadResult::Success(update)
}
