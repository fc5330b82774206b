//! Prelude module for common re-exports.
//!
//! ```rust
//! use phri_common::prelude::*;
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, SharedConfig};
pub use crate::control::config::{GainSpec, PhriConfig};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{FORCE_PERIOD_S, MAX_DOFS, TRAJECTORY_PERIOD_S};

// ─── Data Types ─────────────────────────────────────────────────────
pub use crate::control::state::MotionMode;
pub use crate::dof::{CommandDiagonal, DofVector};
pub use crate::geometry::{FrameId, FrameTransform, JointState, TwistCommand, Vec3, WrenchSample};

// ─── Collaborators ──────────────────────────────────────────────────
pub use crate::robot::frames::{FrameLookup, LookupError, StaticFrameTree};
pub use crate::robot::planning::{PlanError, PlanRequest, Planner, Trajectory, WaypointTrajectory};
pub use crate::robot::services::{NoServices, RobotServices, ServiceError};
pub use crate::robot::sinks::{TwistSink, VelocitySink};
