//! Planner and trajectory interfaces.
//!
//! Trajectory optimization lives outside this workspace; the control loop
//! only needs to sample a trajectory, reseed the planner with the current
//! waypoints and downsample the result.

use core::fmt;

use thiserror::Error;

use crate::dof::DofVector;
use crate::geometry::Vec3;

/// Planning failure.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PlanError {
    /// The planner could not produce a trajectory.
    #[error("planning failed: {0}")]
    Failed(String),

    /// Waypoints/times are inconsistent.
    #[error("invalid trajectory: {0}")]
    InvalidTrajectory(String),
}

/// A joint-space trajectory.
pub trait Trajectory: Send + fmt::Debug {
    /// Configuration at time `t` [s] since path start, clamped to the ends.
    fn sample(&self, t: f64) -> DofVector;

    /// Total duration [s].
    fn duration(&self) -> f64;

    fn waypoints(&self) -> &[DofVector];

    /// Copy keeping `n` evenly spaced waypoints (first and last included).
    fn downsample(&self, n: usize) -> Box<dyn Trajectory>;

    fn start(&self) -> DofVector {
        self.sample(0.0)
    }

    fn end(&self) -> DofVector {
        self.sample(self.duration())
    }
}

/// Input to [`Planner::replan`].
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub start: DofVector,
    pub goal: DofVector,
    /// Optional Cartesian goal for the end effector.
    pub goal_pose: Option<Vec3>,
    /// Planning horizon [s].
    pub horizon: f64,
    /// Waypoint spacing [s].
    pub timestep: f64,
    /// Waypoints of the previous plan used to warm-start the optimizer.
    pub seed: Option<Vec<DofVector>>,
}

/// Trajectory planner.
pub trait Planner {
    fn replan(&mut self, request: &PlanRequest) -> Result<Box<dyn Trajectory>, PlanError>;

    /// Number of waypoints the controller keeps after downsampling.
    fn num_waypts(&self) -> usize;
}

/// Piecewise-linear trajectory through timed waypoints.
#[derive(Debug, Clone, PartialEq)]
pub struct WaypointTrajectory {
    waypts: Vec<DofVector>,
    times: Vec<f64>,
}

impl WaypointTrajectory {
    /// Build from waypoints and strictly increasing times starting at 0.
    pub fn new(waypts: Vec<DofVector>, times: Vec<f64>) -> Result<Self, PlanError> {
        if waypts.is_empty() {
            return Err(PlanError::InvalidTrajectory("no waypoints".into()));
        }
        if waypts.len() != times.len() {
            return Err(PlanError::InvalidTrajectory(format!(
                "{} waypoints but {} times",
                waypts.len(),
                times.len()
            )));
        }
        let dofs = waypts[0].len();
        if waypts.iter().any(|w| w.len() != dofs) {
            return Err(PlanError::InvalidTrajectory("waypoint length mismatch".into()));
        }
        if times.windows(2).any(|w| w[1] <= w[0]) {
            return Err(PlanError::InvalidTrajectory("times not increasing".into()));
        }
        Ok(Self { waypts, times })
    }

    /// Straight line from `start` to `goal` sampled every `timestep` over `horizon`.
    pub fn linear(
        start: &DofVector,
        goal: &DofVector,
        horizon: f64,
        timestep: f64,
    ) -> Result<Self, PlanError> {
        if !(horizon > 0.0) || !(timestep > 0.0) {
            return Err(PlanError::InvalidTrajectory(
                "horizon and timestep must be positive".into(),
            ));
        }
        let steps = (horizon / timestep).ceil().max(1.0) as usize;
        let mut waypts = Vec::with_capacity(steps + 1);
        let mut times = Vec::with_capacity(steps + 1);
        let delta = goal.sub(start);
        for k in 0..=steps {
            let frac = k as f64 / steps as f64;
            let mut w = start.clone();
            w.add_scaled(frac, &delta);
            waypts.push(w);
            times.push(frac * horizon);
        }
        Self::new(waypts, times)
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }
}

impl Trajectory for WaypointTrajectory {
    fn sample(&self, t: f64) -> DofVector {
        let last = self.waypts.len() - 1;
        if t <= self.times[0] || last == 0 {
            return self.waypts[0].clone();
        }
        if t >= self.times[last] {
            return self.waypts[last].clone();
        }
        // First index whose time exceeds t; t lies in segment [i-1, i].
        let i = self.times.partition_point(|&ti| ti <= t);
        let (t0, t1) = (self.times[i - 1], self.times[i]);
        let frac = (t - t0) / (t1 - t0);
        let mut out = self.waypts[i - 1].clone();
        out.add_scaled(frac, &self.waypts[i].sub(&self.waypts[i - 1]));
        out
    }

    fn duration(&self) -> f64 {
        self.times[self.times.len() - 1]
    }

    fn waypoints(&self) -> &[DofVector] {
        &self.waypts
    }

    fn downsample(&self, n: usize) -> Box<dyn Trajectory> {
        let len = self.waypts.len();
        if n >= len || len < 2 {
            return Box::new(self.clone());
        }
        let n = n.max(2);
        let idx: Vec<usize> = (0..n)
            .map(|k| ((k as f64) * (len - 1) as f64 / (n - 1) as f64).round() as usize)
            .collect();
        Box::new(Self {
            waypts: idx.iter().map(|&i| self.waypts[i].clone()).collect(),
            times: idx.iter().map(|&i| self.times[i]).collect(),
        })
    }
}
