//! Trajectory velocity emitter.
//!
//! Runs on the slow cadence. Publishes the leading `dofs` diagonal entries of
//! the current command as a flat joint velocity vector, and only while
//! motion is permitted.

use phri_common::dof::{CommandDiagonal, DofVector};
use phri_common::robot::sinks::VelocitySink;

/// Emits joint velocity commands and counts what it sent.
#[derive(Debug, Clone)]
pub struct VelocityEmitter {
    dofs: usize,
    emitted: u64,
}

impl VelocityEmitter {
    pub fn new(dofs: usize) -> Self {
        Self { dofs, emitted: 0 }
    }

    /// The velocity vector that would be published, if any.
    ///
    /// `observed` is false until the first joint-state sample has arrived.
    #[inline]
    pub fn velocity(&self, cmd: &CommandDiagonal, observed: bool, permitted: bool) -> Option<DofVector> {
        if !observed || !permitted {
            return None;
        }
        Some(cmd.leading(self.dofs))
    }

    /// Publish to `sink` when allowed. Returns what was sent.
    pub fn emit<S: VelocitySink + ?Sized>(
        &mut self,
        cmd: &CommandDiagonal,
        observed: bool,
        permitted: bool,
        sink: &mut S,
    ) -> Option<DofVector> {
        let velocity = self.velocity(cmd, observed, permitted)?;
        sink.send_velocity(&velocity);
        self.emitted += 1;
        Some(velocity)
    }

    /// Number of commands published so far.
    #[inline]
    pub fn emitted(&self) -> u64 {
        self.emitted
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
