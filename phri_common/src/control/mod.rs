//! Control-loop configuration and state types shared between crates.

pub mod config;
pub mod state;
