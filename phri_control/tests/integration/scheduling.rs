//! Multi-rate scheduling, poll ordering and feed shutdown.

use phri_common::dof::DofVector;
use phri_common::geometry::JointState;
use phri_common::robot::planning::WaypointTrajectory;
use phri_control::control_loop::ForceOutcome;
use phri_control::cycle::CycleError;

use super::common::{CONFIG, Rig, arm_at, assert_close, rig, rig_with, tick_time};

fn slow_trajectory_rig() -> Rig {
    rig_with(&CONFIG.replace("trajectory_period_s = 0.01", "trajectory_period_s = 0.1"))
}

#[test]
fn force_and_trajectory_ticks_run_at_their_own_rates() {
    let mut rig = slow_trajectory_rig();
    let mut trajectory_runs = 0;
    for k in 0..=20 {
        if rig.poll_at(tick_time(k)).trajectory_ran {
            trajectory_runs += 1;
        }
    }
    assert_eq!(rig.runner.force_stats.cycle_count, 21);
    assert_eq!(trajectory_runs, 3);
    assert_eq!(rig.runner.trajectory_stats.cycle_count, 3);
}

#[test]
fn late_poll_runs_once_and_counts_missed_periods() {
    let mut rig = rig();
    rig.poll_at(0.0);
    let report = rig.poll_at(0.055);
    assert!(report.force.is_some());
    assert_eq!(rig.runner.force_stats.cycle_count, 2);
    assert_eq!(rig.runner.force_stats.overruns, 4);
}

#[test]
fn no_wrench_yet_counts_as_skipped() {
    let mut rig = rig();
    let report = rig.poll_at(0.0);
    assert_eq!(report.force, Some(ForceOutcome::NoSample));
    assert_eq!(rig.runner.force_stats.skipped, 1);
    // No joint state yet either: nothing is emitted.
    assert_eq!(report.emitted, None);
    assert_eq!(rig.runner.trajectory_stats.skipped, 1);
}

#[test]
fn emission_sees_command_from_same_poll() {
    let mut rig = rig();
    let plan = WaypointTrajectory::linear(
        &DofVector::filled(6, 0.2),
        &DofVector::filled(6, 0.6),
        2.0,
        0.5,
    )
    .unwrap();
    rig.runner.control_mut().install_plan(Box::new(plan));
    let arm = arm_at(&[0.0; 6]);

    // First step only primes the PID clock.
    rig.joint_state(&arm, 0.0);
    let report = rig.poll_at(tick_time(0));
    assert_eq!(report.emitted, Some(DofVector::zeros(6)));

    rig.joint_state(&arm, 0.01);
    let report = rig.poll_at(tick_time(1));
    assert_eq!(report.joint_states, 1);
    let emitted = report.emitted.unwrap();
    assert_eq!(&emitted, rig.runner.control().command().diagonal());
    for v in emitted.iter() {
        assert_close(*v, 2.0 * 0.2, 1e-9);
    }
}

#[test]
fn rejected_joint_state_is_counted_and_ignored() {
    let mut rig = rig();
    rig.joints
        .send(JointState {
            names: vec!["shoulder_pan_joint".into()],
            position: vec![0.0],
            velocity: vec![],
            stamp: 0.0,
        })
        .unwrap();
    let report = rig.poll_at(0.0);
    assert_eq!(report.joint_states, 1);
    assert!(rig.runner.control().snapshot().position.is_none());
    assert_eq!(report.emitted, None);
}

#[test]
fn closed_joint_feed_stops_the_runner() {
    let Rig {
        mut runner, joints, ..
    } = rig();
    drop(joints);
    let err = runner.poll(0.0).unwrap_err();
    assert!(matches!(err, CycleError::FeedClosed("joint-state")));
}

#[test]
fn closed_wrench_feed_reuses_last_sample() {
    let mut rig = rig();
    rig.push(5.0, 0.0);
    rig.poll_at(tick_time(0));

    let (dead_tx, _) = crossbeam_channel::unbounded();
    drop(std::mem::replace(&mut rig.wrench, dead_tx));

    let report = rig.poll_at(tick_time(1));
    assert!(matches!(report.force, Some(ForceOutcome::Interaction(_))));
    let report = rig.poll_at(tick_time(2));
    assert!(matches!(report.force, Some(ForceOutcome::Interaction(_))));
}
