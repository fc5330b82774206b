//! Frames, transforms and the wrench/twist/joint-state messages exchanged
//! with the control loop.

use core::fmt;

use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Cartesian 3-vector.
pub type Vec3 = Vector3<f64>;

/// Reference frame identifier (e.g. `"tool0"`, `"ft_frame"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameId(String);

impl FrameId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FrameId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rigid transform expressing `child` coordinates in `parent`.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameTransform {
    /// Target frame.
    pub parent: FrameId,
    /// Source frame.
    pub child: FrameId,
    pub rotation: UnitQuaternion<f64>,
    pub translation: Vec3,
    /// Time the transform was valid at [s].
    pub stamp: f64,
}

impl FrameTransform {
    /// Identity transform between `parent` and `child`.
    pub fn identity(parent: impl Into<FrameId>, child: impl Into<FrameId>) -> Self {
        Self {
            parent: parent.into(),
            child: child.into(),
            rotation: UnitQuaternion::identity(),
            translation: Vec3::zeros(),
            stamp: 0.0,
        }
    }

    /// Build from a quaternion given in `(x, y, z, w)` order, normalizing it.
    pub fn from_xyzw(
        parent: impl Into<FrameId>,
        child: impl Into<FrameId>,
        xyzw: [f64; 4],
        translation: Vec3,
    ) -> Self {
        let [x, y, z, w] = xyzw;
        Self {
            parent: parent.into(),
            child: child.into(),
            rotation: UnitQuaternion::from_quaternion(Quaternion::new(w, x, y, z)),
            translation,
            stamp: 0.0,
        }
    }

    /// The transform from `parent` back into `child`.
    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        Self {
            parent: self.child.clone(),
            child: self.parent.clone(),
            translation: -(rotation * self.translation),
            rotation,
            stamp: self.stamp,
        }
    }

    /// Compose `self ∘ inner`: first `inner` (A←B), then `self` (parent←A).
    pub fn then(&self, inner: &FrameTransform) -> Self {
        Self {
            parent: self.parent.clone(),
            child: inner.child.clone(),
            rotation: self.rotation * inner.rotation,
            translation: self.rotation * inner.translation + self.translation,
            stamp: self.stamp.min(inner.stamp),
        }
    }
}

impl From<String> for FrameId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Force/torque sample from the wrist sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct WrenchSample {
    pub force: Vec3,
    pub torque: Vec3,
    /// Frame the sample is expressed in.
    pub frame: FrameId,
    /// Sensor timestamp [s].
    pub stamp: f64,
}

impl WrenchSample {
    pub fn new(force: Vec3, torque: Vec3, frame: impl Into<FrameId>, stamp: f64) -> Self {
        Self {
            force,
            torque,
            frame: frame.into(),
            stamp,
        }
    }
}

/// Cartesian velocity command (linear + angular).
#[derive(Debug, Clone, PartialEq)]
pub struct TwistCommand {
    pub linear: Vec3,
    pub angular: Vec3,
    pub frame: FrameId,
    pub stamp: f64,
}

impl TwistCommand {
    /// Zero twist in `frame`.
    pub fn zero(frame: impl Into<FrameId>) -> Self {
        Self {
            linear: Vec3::zeros(),
            angular: Vec3::zeros(),
            frame: frame.into(),
            stamp: 0.0,
        }
    }
}

/// Named per-joint positions and velocities, in the feed's channel order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JointState {
    pub names: Vec<String>,
    pub position: Vec<f64>,
    pub velocity: Vec<f64>,
    pub stamp: f64,
}
