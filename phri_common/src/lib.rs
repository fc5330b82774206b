//! pHRI Common Library
//!
//! Shared types for the physical human-robot interaction control loop:
//! configuration loading, per-DOF vectors, frames and messages, and the
//! collaborator interfaces (frame lookup, command sinks, services, planner).
//!
//! # Module Structure
//!
//! - [`config`] - Configuration loading traits and error type
//! - [`consts`] - Compile-time limits and defaults
//! - [`dof`] - Per-DOF vectors and diagonal command matrices
//! - [`geometry`] - Frames, transforms, wrench/twist/joint-state messages
//! - [`robot`] - Collaborator traits consumed by the control loop
//! - [`control`] - Control-loop config sections and mode enum
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use phri_common::config::{ConfigLoader, SharedConfig};
//! use phri_common::dof::DofVector;
//! ```

pub mod config;
pub mod consts;
pub mod control;
pub mod dof;
pub mod geometry;
pub mod prelude;
pub mod robot;
