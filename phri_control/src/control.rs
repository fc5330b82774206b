//! Control engine root.
//!
//! Force path: frame transform → conditioning → compliance law.
//! Position path: trajectory tracker (PID) → velocity emitter.

pub mod compliance;
pub mod conditioning;
pub mod frames;
pub mod output;
pub mod pid;
pub mod tracker;
