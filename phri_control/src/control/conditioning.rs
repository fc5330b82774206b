//! Force/torque signal conditioning.
//!
//! Readings whose magnitude sits under the sensor noise floor are replaced
//! with zero. A NaN magnitude is treated as noise.

use phri_common::geometry::Vec3;

/// Zero `v` when `|v| < threshold` or `|v|` is NaN; otherwise pass it through.
#[inline]
pub fn suppress_if_small(v: Vec3, threshold: f64) -> Vec3 {
    let magnitude = v.norm();
    if magnitude.is_nan() || magnitude < threshold {
        Vec3::zeros()
    } else {
        v
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
