//! Gain hot-reload into a running loop.
//!
//! A replacement file is parsed into a shadow config; only the controller
//! section may differ. Accepted gains and tracker limits take effect on the
//! next joint state, rejected files leave the running controller untouched.

use phri_common::dof::DofVector;
use phri_common::robot::planning::WaypointTrajectory;
use phri_control::config::{ReloadResult, reload_gains};

use super::common::{CONFIG, Rig, arm_at, assert_close, rig, tick_time};

/// Loop with a plan starting 0.2 rad away from a stationary arm, primed so
/// the command is `p_gain · 0.2`.
fn primed() -> Rig {
    let mut rig = rig();
    let plan = WaypointTrajectory::linear(
        &DofVector::filled(6, 0.2),
        &DofVector::filled(6, 0.4),
        1.0,
        0.5,
    )
    .unwrap();
    rig.runner.control_mut().install_plan(Box::new(plan));
    let arm = arm_at(&[0.0; 6]);
    for k in 0..2 {
        rig.joint_state(&arm, tick_time(k));
        rig.poll_at(tick_time(k));
    }
    rig
}

fn step(rig: &mut Rig, k: usize) {
    rig.joint_state(&arm_at(&[0.0; 6]), tick_time(k));
    rig.poll_at(tick_time(k));
}

#[test]
fn accepted_gains_apply_on_next_sample() {
    let mut rig = primed();
    assert_close(rig.runner.control().command().entry(0, 0), 0.4, 1e-9);

    let shadow = CONFIG.replace("p_gain = 2.0", "p_gain = 4.0");
    let ReloadResult::Success(update) = reload_gains(&mut rig.config, &shadow) else {
        panic!("reload rejected");
    };
    rig.runner.control_mut().update_controller(update);
    step(&mut rig, 2);

    assert_close(rig.runner.control().command().entry(0, 0), 0.8, 1e-9);
    assert_eq!(rig.config.gains.p.as_slice(), &[4.0; 6]);
}

#[test]
fn per_dof_gains_reload() {
    let mut rig = primed();
    let shadow = CONFIG.replace("p_gain = 2.0", "p_gain = [1.0, 1.0, 1.0, 1.0, 1.0, 3.0]");
    let ReloadResult::Success(update) = reload_gains(&mut rig.config, &shadow) else {
        panic!("reload rejected");
    };
    rig.runner.control_mut().update_controller(update);
    step(&mut rig, 2);

    let cmd = rig.runner.control().command();
    assert_close(cmd.entry(0, 0), 0.2, 1e-9);
    assert_close(cmd.entry(5, 5), 0.6, 1e-9);
}

#[test]
fn reduced_max_cmd_limits_next_command() {
    let mut rig = primed();
    let shadow = CONFIG.replace("max_cmd = 1.0", "max_cmd = 0.1");
    let ReloadResult::Success(update) = reload_gains(&mut rig.config, &shadow) else {
        panic!("reload rejected");
    };
    rig.runner.control_mut().update_controller(update);
    step(&mut rig, 2);

    assert_eq!(rig.runner.control().tracker().max_cmd(), 0.1);
    for v in rig.runner.control().command().diagonal().iter() {
        assert_close(*v, 0.1, 1e-12);
    }
}

#[test]
fn compliance_edit_is_rejected() {
    let mut rig = primed();
    let shadow = CONFIG.replace("stiffness = 1.0", "stiffness = 5.0");
    assert!(matches!(
        reload_gains(&mut rig.config, &shadow),
        ReloadResult::Rejected(ref m) if m.contains("[compliance]")
    ));
    assert_eq!(rig.config.raw.compliance.stiffness, 1.0);
}

#[test]
fn timing_edit_is_rejected() {
    let mut rig = primed();
    let shadow = CONFIG.replace("force_period_s = 0.01", "force_period_s = 0.02");
    assert!(matches!(
        reload_gains(&mut rig.config, &shadow),
        ReloadResult::Rejected(ref m) if m.contains("[timing]")
    ));
}

#[test]
fn structural_change_is_rejected() {
    let mut rig = primed();
    let shadow = CONFIG.replace("working_frame = \"tool0\"", "working_frame = \"tool0\"\ndofs_typo = 1");
    assert!(matches!(
        reload_gains(&mut rig.config, &shadow),
        ReloadResult::Rejected(_)
    ));

    let shadow = CONFIG.replace("type = \"pid\"", "type = \"mpc\"");
    assert!(matches!(
        reload_gains(&mut rig.config, &shadow),
        ReloadResult::Rejected(_)
    ));

    step(&mut rig, 2);
    assert_close(rig.runner.control().command().entry(0, 0), 0.4, 1e-9);
    assert_eq!(rig.config.gains.p.as_slice(), &[2.0; 6]);
}
