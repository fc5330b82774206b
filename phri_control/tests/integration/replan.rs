//! Replanning after interaction: sensor re-zeroing, warm-start seeds and
//! failure handling.

use std::time::Duration;

use phri_common::control::state::MotionMode;
use phri_common::dof::DofVector;
use phri_common::robot::planning::{PlanError, PlanRequest, Planner, Trajectory};
use phri_common::robot::services::{NoServices, RobotServices, ServiceError};
use phri_control::sim::LinearPlanner;

use super::common::{rig, tick_time};

/// Records every request and delegates to a [`LinearPlanner`].
struct RecordingPlanner {
    inner: LinearPlanner,
    requests: Vec<PlanRequest>,
    fail: bool,
}

impl RecordingPlanner {
    fn new(num_waypts: usize) -> Self {
        Self {
            inner: LinearPlanner::new(num_waypts),
            requests: Vec::new(),
            fail: false,
        }
    }
}

impl Planner for RecordingPlanner {
    fn replan(&mut self, request: &PlanRequest) -> Result<Box<dyn Trajectory>, PlanError> {
        self.requests.push(request.clone());
        if self.fail {
            return Err(PlanError::Failed("optimizer diverged".into()));
        }
        self.inner.replan(request)
    }

    fn num_waypts(&self) -> usize {
        self.inner.num_waypts()
    }
}

#[derive(Default)]
struct CountingServices {
    zeroed: usize,
    twist: usize,
}

impl RobotServices for CountingServices {
    fn switch_to_twist(&mut self, _timeout: Duration) -> Result<(), ServiceError> {
        self.twist += 1;
        Ok(())
    }

    fn zero_ft_sensor(&mut self, _timeout: Duration) -> Result<(), ServiceError> {
        self.zeroed += 1;
        Ok(())
    }
}

fn request(start: f64, goal: f64) -> PlanRequest {
    PlanRequest {
        start: DofVector::filled(6, start),
        goal: DofVector::filled(6, goal),
        goal_pose: None,
        horizon: 2.0,
        timestep: 0.25,
        seed: None,
    }
}

#[test]
fn replan_installs_plan_and_zeroes_sensor() {
    let mut rig = rig();
    let mut planner = RecordingPlanner::new(3);
    let mut services = CountingServices::default();

    rig.runner
        .control_mut()
        .replan(&mut planner, &mut services, request(0.0, 1.0))
        .unwrap();

    assert_eq!(services.zeroed, 1);
    assert_eq!(services.twist, 0);
    let traj = rig.runner.control().tracker().trajectory().unwrap();
    assert_eq!(traj.end().as_slice(), &[1.0; 6]);
    // The full trajectory is tracked, not the downsampled copy.
    assert_eq!(traj.waypoints().len(), 9);
}

#[test]
fn replan_resumes_motion_after_interaction() {
    let mut rig = rig();
    rig.push(6.0, 0.0);
    rig.poll_at(tick_time(0));
    assert_eq!(rig.runner.control().mode(), MotionMode::Interaction);
    assert!(!rig.runner.control().motion_permitted());

    let mut planner = RecordingPlanner::new(3);
    rig.runner
        .control_mut()
        .replan(&mut planner, &mut CountingServices::default(), request(0.0, 1.0))
        .unwrap();
    assert!(rig.runner.control().motion_permitted());
}

#[test]
fn second_replan_is_seeded_with_downsampled_waypoints() {
    let mut rig = rig();
    let mut planner = RecordingPlanner::new(3);
    let mut services = CountingServices::default();

    rig.runner
        .control_mut()
        .replan(&mut planner, &mut services, request(0.0, 1.0))
        .unwrap();
    rig.runner
        .control_mut()
        .replan(&mut planner, &mut services, request(1.0, 0.0))
        .unwrap();

    assert!(planner.requests[0].seed.is_none());
    let seed = planner.requests[1].seed.as_ref().unwrap();
    assert_eq!(seed.len(), 3);
    assert_eq!(seed[0].as_slice(), &[0.0; 6]);
    assert_eq!(seed[1].as_slice(), &[0.5; 6]);
    assert_eq!(seed[2].as_slice(), &[1.0; 6]);
    assert_eq!(services.zeroed, 2);
}

#[test]
fn explicit_seed_is_not_overridden() {
    let mut rig = rig();
    let mut planner = RecordingPlanner::new(3);
    let mut services = CountingServices::default();
    rig.runner
        .control_mut()
        .replan(&mut planner, &mut services, request(0.0, 1.0))
        .unwrap();

    let mut req = request(0.0, 1.0);
    req.seed = Some(vec![DofVector::filled(6, 0.25)]);
    rig.runner
        .control_mut()
        .replan(&mut planner, &mut services, req)
        .unwrap();
    let seed = planner.requests[1].seed.as_ref().unwrap();
    assert_eq!(seed.len(), 1);
}

#[test]
fn planner_failure_keeps_active_trajectory() {
    let mut rig = rig();
    let mut planner = RecordingPlanner::new(3);
    let mut services = CountingServices::default();
    rig.runner
        .control_mut()
        .replan(&mut planner, &mut services, request(0.0, 1.0))
        .unwrap();

    planner.fail = true;
    let err = rig
        .runner
        .control_mut()
        .replan(&mut planner, &mut services, request(1.0, 2.0))
        .unwrap_err();
    assert!(matches!(err, PlanError::Failed(_)));

    let traj = rig.runner.control().tracker().trajectory().unwrap();
    assert_eq!(traj.end().as_slice(), &[1.0; 6]);
    // The sensor is zeroed before planning, even when planning fails.
    assert_eq!(services.zeroed, 2);
}

#[test]
fn unavailable_services_do_not_block_replanning() {
    let mut rig = rig();
    let mut planner = RecordingPlanner::new(3);
    rig.runner
        .control_mut()
        .replan(&mut planner, &mut NoServices, request(0.0, 1.0))
        .unwrap();
    assert!(rig.runner.control().tracker().trajectory().is_some());
}
