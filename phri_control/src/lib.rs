//! # pHRI Control Library
//!
//! Multi-rate compliance control loop for physical human-robot interaction.
//! A force path at 500 Hz decides whether a human is pushing the arm and,
//! if so, yields through an admittance law; a position path tracks a joint
//! trajectory with a vector PID and publishes joint velocities at ~10 Hz
//! while no interaction is detected.
//!
//! ## Layout
//!
//! - [`control`] — PID, frame transform, conditioning, compliance, tracker,
//!   velocity emitter
//! - [`state`] — interaction mode machine, joint-state ordering
//! - [`control_loop`] — shared state and the three activities
//! - [`cycle`] — single-threaded scheduler, timing statistics, RT setup
//! - [`config`] — TOML loading into runtime parameters, gain reload
//! - [`sim`] — stand-alone collaborators for the binary

pub mod clock;
pub mod config;
pub mod control;
pub mod control_loop;
pub mod cycle;
pub mod sim;
pub mod state;
