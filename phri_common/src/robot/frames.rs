//! Frame lookup interface and a static frame tree.
//!
//! The control loop resolves the sensor frame into its working frame through
//! [`FrameLookup`]. Failures are reported as [`LookupError`] with one variant
//! per failure kind so callers can `match` instead of catching everything.

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;

use crate::geometry::{FrameId, FrameTransform};

/// Why a transform lookup failed.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LookupError {
    /// A requested frame is unknown.
    #[error("frame `{0}` does not exist")]
    NoSuchFrame(FrameId),

    /// Both frames exist but belong to disjoint trees.
    #[error("frames `{target_frame}` and `{source_frame}` are not connected")]
    NotConnected {
        target_frame: FrameId,
        source_frame: FrameId,
    },

    /// The requested stamp lies outside the time range the transform covers.
    #[error("lookup at t={stamp:.3}s outside available range [{earliest:.3}, {latest:.3}]")]
    Extrapolation {
        stamp: f64,
        earliest: f64,
        latest: f64,
    },

    /// The lookup did not complete within its bounded wait.
    #[error("lookup `{target_frame}` <- `{source_frame}` timed out after {timeout:?}")]
    Timeout {
        target_frame: FrameId,
        source_frame: FrameId,
        timeout: Duration,
    },
}

/// Source of frame transforms.
///
/// `stamp = None` asks for the latest available transform.
/// Implementations must not block longer than `timeout`.
pub trait FrameLookup {
    fn lookup_transform(
        &self,
        target: &FrameId,
        source: &FrameId,
        stamp: Option<f64>,
        timeout: Duration,
    ) -> Result<FrameTransform, LookupError>;
}

/// One parent edge of the static tree with its validity window.
#[derive(Debug, Clone)]
struct Edge {
    to_parent: FrameTransform,
    valid_from: f64,
    valid_until: f64,
}

/// Frame tree built from fixed parent→child transforms.
///
/// Each frame has at most one parent. Lookups compose edges up to the common
/// root; frames with different roots are [`LookupError::NotConnected`].
#[derive(Debug, Clone, Default)]
pub struct StaticFrameTree {
    edges: HashMap<FrameId, Edge>,
    roots: Vec<FrameId>,
}

impl StaticFrameTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a root frame with no parent.
    pub fn add_root(&mut self, frame: impl Into<FrameId>) {
        let frame = frame.into();
        if !self.roots.contains(&frame) {
            self.roots.push(frame);
        }
    }

    /// Insert `transform` (parent ← child), valid for all time.
    pub fn insert(&mut self, transform: FrameTransform) {
        self.insert_valid(transform, f64::NEG_INFINITY, f64::INFINITY);
    }

    /// Insert `transform` valid only for stamps in `[valid_from, valid_until]`.
    pub fn insert_valid(&mut self, transform: FrameTransform, valid_from: f64, valid_until: f64) {
        if !self.edges.contains_key(&transform.parent) {
            self.add_root(transform.parent.clone());
        }
        self.roots.retain(|r| *r != transform.child);
        self.edges.insert(
            transform.child.clone(),
            Edge {
                to_parent: transform,
                valid_from,
                valid_until,
            },
        );
    }

    fn knows(&self, frame: &FrameId) -> bool {
        self.edges.contains_key(frame) || self.roots.contains(frame)
    }

    /// Transform root ← `frame`, and the root it ends at.
    fn to_root(
        &self,
        frame: &FrameId,
        stamp: Option<f64>,
    ) -> Result<(FrameTransform, FrameId), LookupError> {
        let mut acc = FrameTransform::identity(frame.clone(), frame.clone());
        let mut current = frame.clone();
        // Depth bound guards against accidental cycles.
        for _ in 0..=self.edges.len() {
            let Some(edge) = self.edges.get(&current) else {
                return Ok((acc, current));
            };
            if let Some(t) = stamp {
                if t < edge.valid_from || t > edge.valid_until {
                    return Err(LookupError::Extrapolation {
                        stamp: t,
                        earliest: edge.valid_from,
                        latest: edge.valid_until,
                    });
                }
            }
            acc = edge.to_parent.then(&acc);
            current = edge.to_parent.parent.clone();
        }
        Err(LookupError::NoSuchFrame(frame.clone()))
    }
}

impl FrameLookup for StaticFrameTree {
    fn lookup_transform(
        &self,
        target: &FrameId,
        source: &FrameId,
        stamp: Option<f64>,
        _timeout: Duration,
    ) -> Result<FrameTransform, LookupError> {
        for frame in [target, source] {
            if !self.knows(frame) {
                return Err(LookupError::NoSuchFrame(frame.clone()));
            }
        }
        if target == source {
            return Ok(FrameTransform::identity(target.clone(), source.clone()));
        }

        let (root_from_source, source_root) = self.to_root(source, stamp)?;
        let (root_from_target, target_root) = self.to_root(target, stamp)?;
        if source_root != target_root {
            return Err(LookupError::NotConnected {
                target_frame: target.clone(),
                source_frame: source.clone(),
            });
        }

        let mut tf = root_from_target.inverse().then(&root_from_source);
        tf.stamp = stamp.unwrap_or(0.0);
        Ok(tf)
    }
}
