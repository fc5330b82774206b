//! Interaction detection and compliance output through the cycle runner.

use phri_common::control::state::MotionMode;
use phri_common::geometry::{Vec3, WrenchSample};
use phri_common::robot::frames::LookupError;
use phri_control::control_loop::ForceOutcome;

use super::common::{arm_at, assert_close, rig, tick_time};

#[test]
fn small_force_stays_in_free_motion() {
    let mut rig = rig();
    rig.push(2.0, 0.0);
    let report = rig.poll_at(tick_time(0));

    assert_eq!(report.force, Some(ForceOutcome::FreeMotion));
    assert_eq!(rig.runner.control().mode(), MotionMode::FreeMotion);
    assert!(rig.runner.control().motion_permitted());
    assert!(rig.twists.try_recv().is_err());
}

#[test]
fn large_force_enters_interaction_and_sends_twist() {
    let mut rig = rig();
    rig.push(5.0, 0.0);
    let report = rig.poll_at(tick_time(0));

    let Some(ForceOutcome::Interaction(twist)) = report.force else {
        panic!("expected interaction, got {:?}", report.force);
    };
    assert_close(twist.linear.x, 5.0, 1e-9);
    assert_close(twist.linear.y, 0.0, 1e-9);
    assert_eq!(twist.frame.as_str(), "tool0");
    assert_eq!(rig.runner.control().mode(), MotionMode::Interaction);
    assert!(!rig.runner.control().motion_permitted());

    let sent = rig.twists.try_recv().unwrap();
    assert_close(sent.linear.x, 5.0, 1e-9);
}

#[test]
fn damping_acts_on_previous_twist() {
    let mut rig = rig();
    rig.push(5.0, 0.0);
    rig.poll_at(tick_time(0));
    // No new sample: the latched one is reused.
    rig.poll_at(tick_time(1));

    let twists: Vec<_> = rig.twists.try_iter().collect();
    assert_eq!(twists.len(), 2);
    assert_close(twists[0].linear.x, 5.0, 1e-9);
    assert_close(twists[1].linear.x, 5.0 - 0.1 * 5.0, 1e-9);
}

#[test]
fn interaction_blocks_velocity_emission_until_release() {
    let mut rig = rig();
    let arm = arm_at(&[0.0; 6]);

    rig.joint_state(&arm, 0.0);
    let report = rig.poll_at(tick_time(0));
    assert!(report.emitted.is_some());

    rig.push(6.0, 0.01);
    rig.joint_state(&arm, 0.01);
    let report = rig.poll_at(tick_time(1));
    assert!(matches!(report.force, Some(ForceOutcome::Interaction(_))));
    assert!(report.trajectory_ran);
    assert_eq!(report.emitted, None);

    rig.push(0.0, 0.02);
    rig.joint_state(&arm, 0.02);
    let report = rig.poll_at(tick_time(2));
    assert_eq!(report.force, Some(ForceOutcome::FreeMotion));
    assert!(report.emitted.is_some());
    assert_eq!(rig.runner.control().emitted(), 2);
}

#[test]
fn interaction_zeroes_tracking_command() {
    let mut rig = rig();
    rig.push(8.0, 0.0);
    rig.poll_at(tick_time(0));
    assert!(rig.runner.control().command().is_zero());
}

#[test]
fn noise_below_floor_is_suppressed() {
    let mut rig = rig();
    // 0.9 N is under the 1.0 suppression floor but the torque is not.
    rig.wrench
        .send(WrenchSample::new(
            Vec3::new(0.0, -0.9, 0.0),
            Vec3::new(0.0, 0.0, 1.5),
            phri_control::sim::SENSOR_FRAME,
            0.0,
        ))
        .unwrap();
    let report = rig.poll_at(tick_time(0));
    assert_eq!(report.force, Some(ForceOutcome::FreeMotion));
    assert_eq!(rig.runner.control().snapshot().last_twist.linear, Vec3::zeros());
}

#[test]
fn unknown_sensor_frame_skips_tick() {
    let mut rig = rig();
    rig.wrench
        .send(WrenchSample::new(Vec3::new(9.0, 0.0, 0.0), Vec3::zeros(), "mystery", 0.0))
        .unwrap();
    let report = rig.poll_at(tick_time(0));

    assert!(matches!(
        report.force,
        Some(ForceOutcome::Skipped(LookupError::NoSuchFrame(_)))
    ));
    assert_eq!(rig.runner.control().mode(), MotionMode::FreeMotion);
    assert_eq!(rig.runner.force_stats.skipped, 1);
}
