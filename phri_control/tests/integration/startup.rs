//! Startup: shipped configuration, service calls and initial planning.

use std::path::PathBuf;
use std::time::Duration;

use phri_common::robot::services::{NoServices, RobotServices, ServiceError};
use phri_control::config::load_config;
use phri_control::sim::{LinearPlanner, SimServices};

use super::common::rig;

fn shipped_config() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../config/control.toml")
}

/// Twist switch succeeds, sensor zeroing times out.
struct SlowSensor;

impl RobotServices for SlowSensor {
    fn switch_to_twist(&mut self, _timeout: Duration) -> Result<(), ServiceError> {
        Ok(())
    }

    fn zero_ft_sensor(&mut self, timeout: Duration) -> Result<(), ServiceError> {
        Err(ServiceError::Timeout {
            service: "zero_ftsensor".into(),
            timeout,
        })
    }
}

#[test]
fn shipped_config_loads() {
    let cfg = load_config(&shipped_config()).unwrap();
    assert_eq!(cfg.dofs(), 6);
    assert_eq!(cfg.raw.robot.joint_names[0], "shoulder_pan_joint");
    assert_eq!(cfg.timing.force_period, Duration::from_millis(2));
    assert_eq!(cfg.timing.trajectory_period, Duration::from_millis(100));

    let plan = cfg.plan.as_ref().unwrap();
    assert!((plan.start[4] - core::f64::consts::FRAC_PI_2).abs() < 1e-12);
    assert_eq!(cfg.num_waypts, 5);
}

#[test]
fn startup_services_succeed() {
    let mut rig = rig();
    let report = rig.runner.control_mut().start_services(&mut SimServices);
    assert!(report.twist_enabled);
    assert!(report.sensor_zeroed);
}

#[test]
fn missing_services_are_not_fatal() {
    let mut rig = rig();
    let report = rig.runner.control_mut().start_services(&mut NoServices);
    assert!(!report.twist_enabled);
    assert!(!report.sensor_zeroed);

    // The loop still runs.
    rig.push(5.0, 0.0);
    assert!(rig.poll_at(0.0).force.is_some());
}

#[test]
fn timed_out_zeroing_is_reported() {
    let mut rig = rig();
    let report = rig.runner.control_mut().start_services(&mut SlowSensor);
    assert!(report.twist_enabled);
    assert!(!report.sensor_zeroed);
}

#[test]
fn initial_plan_from_shipped_config() {
    let cfg = load_config(&shipped_config()).unwrap();
    let mut rig = rig();
    let mut planner = LinearPlanner::new(cfg.num_waypts);
    rig.runner
        .control_mut()
        .replan(&mut planner, &mut SimServices, cfg.plan.clone().unwrap())
        .unwrap();

    let traj = rig.runner.control().tracker().trajectory().unwrap();
    assert!((traj.duration() - 15.0).abs() < 1e-9);
    assert_eq!(traj.waypoints().len(), 31);
    assert!(rig.runner.control().motion_permitted());
}
