//! Interaction state enums.

use serde::{Deserialize, Serialize};

/// Whether the arm follows its trajectory or yields to an applied force.
///
/// Recomputed every force tick from the conditioned force magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum MotionMode {
    /// No significant external force; the arm follows its trajectory.
    #[default]
    FreeMotion = 0,
    /// A human is pushing the arm and compliance control drives motion.
    Interaction = 1,
}

impl MotionMode {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::FreeMotion),
            1 => Some(Self::Interaction),
            _ => None,
        }
    }

    /// Whether joint velocity commands may be published in this mode.
    #[inline]
    pub const fn permits_motion(self) -> bool {
        matches!(self, Self::FreeMotion)
    }
}
