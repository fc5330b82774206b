//! State tracking module root.
//!
//! Interaction mode machine and joint-state channel ordering.

pub mod interaction;
pub mod joints;
