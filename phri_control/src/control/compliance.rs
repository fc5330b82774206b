//! Admittance law mapping conditioned force/torque to a Cartesian twist.
//!
//! Each axis follows `(1/Kp)·signal − Kd·previous`, where `previous` is the
//! twist produced on the last tick (zero before the first tick).

use phri_common::config::ConfigError;
use phri_common::geometry::{FrameId, TwistCommand, Vec3};

/// Stiffness and damping of the admittance law.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComplianceGains {
    /// `Kp`; the compliance is `1/Kp`. Must be finite and non-zero.
    pub stiffness: f64,
    /// `Kd`, applied to the previous twist.
    pub damping: f64,
}

/// Compliance controller holding the previous twist as its only state.
#[derive(Debug, Clone)]
pub struct ComplianceController {
    gains: ComplianceGains,
    compliance: f64,
    previous: TwistCommand,
}

impl ComplianceController {
    /// Fails when the stiffness is zero or non-finite.
    pub fn new(gains: ComplianceGains, frame: impl Into<FrameId>) -> Result<Self, ConfigError> {
        if gains.stiffness == 0.0 || !gains.stiffness.is_finite() {
            return Err(ConfigError::invalid(
                "compliance.stiffness",
                format!("{} must be finite and non-zero", gains.stiffness),
            ));
        }
        if !gains.damping.is_finite() {
            return Err(ConfigError::invalid("compliance.damping", "must be finite"));
        }
        Ok(Self {
            gains,
            compliance: 1.0 / gains.stiffness,
            previous: TwistCommand::zero(frame),
        })
    }

    /// Compute the next twist and remember it as the damping reference.
    pub fn step(&mut self, force: &Vec3, torque: &Vec3, frame: &FrameId, stamp: f64) -> TwistCommand {
        let twist = TwistCommand {
            linear: force * self.compliance - self.previous.linear * self.gains.damping,
            angular: torque * self.compliance - self.previous.angular * self.gains.damping,
            frame: frame.clone(),
            stamp,
        };
        self.previous = twist.clone();
        twist
    }

    /// Forget the previous twist.
    pub fn reset(&mut self) {
        self.previous.linear = Vec3::zeros();
        self.previous.angular = Vec3::zeros();
        self.previous.stamp = 0.0;
    }

    #[inline]
    pub fn previous(&self) -> &TwistCommand {
        &self.previous
    }

    #[inline]
    pub fn gains(&self) -> ComplianceGains {
        self.gains
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
