//! Collaborator interfaces consumed by the control loop.
//!
//! Frame lookup, command sinks, robot services and trajectory planning are
//! provided by the surrounding robot stack; the control loop only sees these
//! traits.

pub mod frames;
pub mod planning;
pub mod services;
pub mod sinks;
