//! System-wide constants for the pHRI workspace.
//!
//! Single source of truth for capacity limits and configuration defaults.
//! Imported by both crates.

use static_assertions::const_assert;

/// Maximum number of controlled degrees of freedom.
pub const MAX_DOFS: usize = 16;

/// Default number of controlled degrees of freedom (6-axis arm).
pub const DEFAULT_DOFS: usize = 6;

/// Default force-processing tick period [s] (500 Hz).
pub const FORCE_PERIOD_S: f64 = 1.0 / 500.0;

/// Default trajectory-emission tick period [s] (10 Hz).
pub const TRAJECTORY_PERIOD_S: f64 = 0.1;

/// Bounds for both tick periods [s].
pub const PERIOD_S_MIN: f64 = 1.0e-4;
pub const PERIOD_S_MAX: f64 = 10.0;

/// Default timeout for frame lookups and service calls [s].
pub const LOOKUP_TIMEOUT_S: f64 = 1.0;

/// Default conditioned-force magnitude above which interaction is detected [N].
pub const INTERACTION_THRESHOLD_DEFAULT: f64 = 3.0;

/// Default noise floor below which force/torque readings are zeroed.
pub const SUPPRESSION_THRESHOLD_DEFAULT: f64 = 3.0;

/// Default compliance stiffness `Kp` (inverse of compliance).
pub const STIFFNESS_DEFAULT: f64 = 1.0;

/// Default compliance damping `Kd`.
pub const DAMPING_DEFAULT: f64 = 0.1;

/// Default frame in which wrench samples are processed.
pub const WORKING_FRAME_DEFAULT: &str = "tool0";

/// Default number of waypoints kept after downsampling a replanned trajectory.
pub const NUM_WAYPTS_DEFAULT: usize = 5;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/phri/control.toml";

const_assert!(MAX_DOFS >= DEFAULT_DOFS);
const_assert!(MAX_DOFS <= 64);
