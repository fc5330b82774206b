//! Closed-loop trajectory tracking against the simulated arm.
//!
//! The arm integrates the emitted velocities; the tracker must bring it to
//! the trajectory start, follow the path and report the goal.

use phri_common::dof::DofVector;
use phri_common::robot::planning::WaypointTrajectory;
use phri_control::sim::SimulatedArm;

use super::common::{Rig, arm_at, assert_close, rig, tick_time};

const DT: f64 = 0.01;

/// Step arm and loop together for `ticks` periods starting at tick `from`.
fn run(rig: &mut Rig, arm: &mut SimulatedArm, from: usize, ticks: usize) {
    for k in from..from + ticks {
        let t = tick_time(k);
        rig.joint_state(arm, t);
        rig.poll_at(t);
        for v in rig.velocities.try_iter() {
            arm.command(&v);
        }
        arm.step(DT);
    }
}

fn ramp(from: f64, to: f64) -> WaypointTrajectory {
    WaypointTrajectory::linear(&DofVector::filled(6, from), &DofVector::filled(6, to), 2.0, 0.25).unwrap()
}

#[test]
fn follows_plan_to_goal() {
    let mut rig = rig();
    rig.runner.control_mut().install_plan(Box::new(ramp(0.0, 0.5)));
    let mut arm = arm_at(&[0.0; 6]);

    run(&mut rig, &mut arm, 0, 500);

    let snap = rig.runner.control().snapshot();
    assert!(snap.path_start_reached);
    assert!(snap.path_end_reached);
    for q in arm.position().iter() {
        assert_close(*q, 0.5, 0.02);
    }
}

#[test]
fn approaches_start_before_following() {
    let mut rig = rig();
    rig.runner.control_mut().install_plan(Box::new(ramp(0.3, 0.6)));
    let mut arm = arm_at(&[0.0; 6]);

    run(&mut rig, &mut arm, 0, 20);
    assert!(!rig.runner.control().snapshot().path_start_reached);
    // Heading toward the start, not yet past it.
    for q in arm.position().iter() {
        assert!(*q > 0.0 && *q < 0.3);
    }

    run(&mut rig, &mut arm, 20, 600);
    let snap = rig.runner.control().snapshot();
    assert!(snap.path_start_reached);
    assert!(snap.path_end_reached);
}

#[test]
fn command_is_clipped_to_max_cmd() {
    let mut rig = rig();
    rig.runner.control_mut().install_plan(Box::new(ramp(3.0, 3.0)));
    let mut arm = arm_at(&[0.0; 6]);

    run(&mut rig, &mut arm, 0, 3);
    for v in rig.runner.control().command().diagonal().iter() {
        assert_close(*v, 1.0, 1e-12);
    }
}

#[test]
fn holds_still_without_a_plan() {
    let mut rig = rig();
    let mut arm = arm_at(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);

    run(&mut rig, &mut arm, 0, 50);

    assert!(rig.runner.control().command().is_zero());
    assert_eq!(arm.position().as_slice(), &[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
    assert_eq!(
        rig.runner.control().snapshot().initial_position.unwrap().as_slice(),
        &[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]
    );
}
