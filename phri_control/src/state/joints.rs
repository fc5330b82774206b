//! Joint-state ordering.
//!
//! Joint-state feeds publish channels in their own order. The internal DOF
//! order is fixed by the configured joint names; the channel permutation is
//! computed on the first sample and reused for every later one.

use phri_common::dof::DofVector;
use phri_common::geometry::JointState;
use thiserror::Error;
use tracing::info;

/// Why a joint-state sample was rejected.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum JointOrderError {
    /// A configured joint is absent from the sample.
    #[error("joint `{0}` missing from joint state")]
    Missing(String),

    /// Channel counts disagree.
    #[error("joint state has {names} names and {positions} positions, expected {expected}")]
    WrongCount {
        names: usize,
        positions: usize,
        expected: usize,
    },

    /// The sample's channel order differs from the first one received.
    #[error("joint `{expected}` expected at channel {channel}, found `{found}`")]
    OrderChanged {
        channel: usize,
        expected: String,
        found: String,
    },
}

/// Normalized positions and velocities in internal DOF order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedJoints {
    pub position: DofVector,
    pub velocity: DofVector,
}

/// Maps feed channels to internal DOFs.
#[derive(Debug, Clone)]
pub struct JointOrdering {
    dofs: usize,
    names: Vec<String>,
    /// `permutation[dof]` = channel index in the feed.
    permutation: Option<Vec<usize>>,
}

impl JointOrdering {
    /// `names` empty = adopt the order of the first sample.
    pub fn new(dofs: usize, names: Vec<String>) -> Self {
        Self {
            dofs,
            names,
            permutation: None,
        }
    }

    /// Internal joint names (empty until adopted if none were configured).
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_resolved(&self) -> bool {
        self.permutation.is_some()
    }

    /// Reorder `state` into internal DOF order.
    ///
    /// An empty velocity list is read as all-zero velocities.
    pub fn normalize(&mut self, state: &JointState) -> Result<OrderedJoints, JointOrderError> {
        let velocity_ok = state.velocity.is_empty() || state.velocity.len() == state.position.len();
        if state.names.len() != state.position.len() || state.position.len() < self.dofs || !velocity_ok
        {
            return Err(JointOrderError::WrongCount {
                names: state.names.len(),
                positions: state.position.len(),
                expected: self.dofs,
            });
        }

        if let Some(p) = &self.permutation {
            self.check_order(p, state)?;
        } else {
            let p = self.resolve(state)?;
            info!(joints = ?self.names, channels = ?p, "joint ordering resolved");
            self.permutation = Some(p);
        }
        let permutation = self.permutation.as_deref().unwrap_or_default();

        let position = permutation.iter().map(|&c| state.position[c]).collect();
        let velocity = if state.velocity.is_empty() {
            DofVector::zeros(self.dofs)
        } else {
            permutation.iter().map(|&c| state.velocity[c]).collect()
        };
        Ok(OrderedJoints { position, velocity })
    }

    fn resolve(&mut self, state: &JointState) -> Result<Vec<usize>, JointOrderError> {
        if self.names.is_empty() {
            self.names = state.names.iter().take(self.dofs).cloned().collect();
            return Ok((0..self.dofs).collect());
        }
        self.names
            .iter()
            .map(|name| {
                state
                    .names
                    .iter()
                    .position(|n| n == name)
                    .ok_or_else(|| JointOrderError::Missing(name.clone()))
            })
            .collect()
    }

    fn check_order(&self, permutation: &[usize], state: &JointState) -> Result<(), JointOrderError> {
        for (name, &channel) in self.names.iter().zip(permutation) {
            match state.names.get(channel) {
                Some(found) if found == name => {}
                Some(found) => {
                    return Err(JointOrderError::OrderChanged {
                        channel,
                        expected: name.clone(),
                        found: found.clone(),
                    });
                }
                None => return Err(JointOrderError::Missing(name.clone())),
            }
        }
        Ok(())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
