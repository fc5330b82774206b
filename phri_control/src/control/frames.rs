//! Frame transformer: re-expresses 3-vectors in another frame.
//!
//! Only the rotational part of a transform applies to force, torque and
//! velocity vectors.

use phri_common::geometry::{FrameTransform, Vec3};

/// Rotate `v` from `transform.child` into `transform.parent`.
#[inline]
pub fn transform_vector(transform: &FrameTransform, v: &Vec3) -> Vec3 {
    transform.rotation * v
}

// ─── Tests ──────────────────────────────────────────────────────────
