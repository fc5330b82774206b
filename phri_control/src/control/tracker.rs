//! Trajectory tracker: binds a trajectory to the PID.
//!
//! Before the arm reaches the trajectory start the target is the start
//! configuration itself. Once within `epsilon` of it the path clock starts
//! and the target follows the trajectory sampled at `now − path_start`.
//! The command is clipped per DOF to `±max_cmd`.

use phri_common::dof::{CommandDiagonal, DofVector};
use phri_common::robot::planning::Trajectory;
use tracing::{debug, info};

use super::pid::{GainSet, Pid};
use crate::clock::Clock;

/// PID trajectory follower with start/goal detection.
#[derive(Debug)]
pub struct TrajectoryTracker<C> {
    pid: Pid<C>,
    trajectory: Option<Box<dyn Trajectory>>,
    epsilon: f64,
    max_cmd: f64,
    path_start: Option<f64>,
    path_end: Option<f64>,
}

impl<C: Clock> TrajectoryTracker<C> {
    pub fn new(gains: GainSet, epsilon: f64, max_cmd: f64, clock: C) -> Self {
        Self {
            pid: Pid::new(gains, clock),
            trajectory: None,
            epsilon,
            max_cmd,
            path_start: None,
            path_end: None,
        }
    }

    /// Install `trajectory`, clearing reached flags and PID state.
    pub fn set_trajectory(&mut self, trajectory: Box<dyn Trajectory>) {
        debug!(
            waypoints = trajectory.waypoints().len(),
            duration = trajectory.duration(),
            "trajectory installed"
        );
        self.trajectory = Some(trajectory);
        self.path_start = None;
        self.path_end = None;
        self.pid.reset();
    }

    /// Compute the clipped command for the measured `position` at `now` [s].
    ///
    /// Without a trajectory the command is zero and the PID is not stepped.
    pub fn command(&mut self, position: &DofVector, now: f64) -> CommandDiagonal {
        let Some(trajectory) = self.trajectory.as_deref() else {
            return CommandDiagonal::zeros(self.pid.gains().dofs());
        };

        let start = trajectory.start();
        if self.path_start.is_none() && start.sub(position).norm() < self.epsilon {
            info!(t = now, "trajectory start reached");
            self.path_start = Some(now);
        }

        let target = match self.path_start {
            None => start,
            Some(t0) => {
                let elapsed = now - t0;
                if self.path_end.is_none()
                    && elapsed >= trajectory.duration()
                    && trajectory.end().sub(position).norm() < self.epsilon
                {
                    info!(t = now, "trajectory goal reached");
                    self.path_end = Some(now);
                }
                trajectory.sample(elapsed)
            }
        };

        let error = target.sub(position);
        let mut cmd = self.pid.update(&error, None);
        cmd.clip(self.max_cmd);
        cmd
    }

    /// Time the trajectory start was reached.
    #[inline]
    pub fn path_start(&self) -> Option<f64> {
        self.path_start
    }

    /// Time the trajectory goal was reached.
    #[inline]
    pub fn path_end(&self) -> Option<f64> {
        self.path_end
    }

    #[inline]
    pub fn trajectory(&self) -> Option<&dyn Trajectory> {
        self.trajectory.as_deref()
    }

    #[inline]
    pub fn pid(&self) -> &Pid<C> {
        &self.pid
    }

    pub fn set_gains(&mut self, gains: GainSet) {
        self.pid.set_gains(gains);
    }

    /// Replace the start/goal tolerance and the command limit.
    pub fn set_limits(&mut self, epsilon: f64, max_cmd: f64) {
        self.epsilon = epsilon;
        self.max_cmd = max_cmd;
    }

    #[inline]
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    #[inline]
    pub fn max_cmd(&self) -> f64 {
        self.max_cmd
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
