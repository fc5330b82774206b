//! # pHRI Control
//!
//! Runs the compliance control loop against the simulated arm, F/T sensor,
//! planner and services in [`phri_control::sim`].
//!
//! Startup: load and validate the TOML config, plan the initial trajectory,
//! call the startup services, perform RT setup, then enter the cycle loop
//! until Ctrl-C or `--duration` elapses.

use clap::Parser;
use crossbeam_channel::bounded;
use phri_common::config::LogLevel;
use phri_common::consts::DEFAULT_CONFIG_PATH;
use phri_common::dof::DofVector;
use phri_common::robot::planning::PlanRequest;
use phri_control::clock::{Clock, MonotonicClock};
use phri_control::config::{LoadedConfig, load_config};
use phri_control::control_loop::ControlLoop;
use phri_control::cycle::{CycleRunner, Feeds, rt_setup};
use phri_control::sim::{
    self, LinearPlanner, Push, ScriptedWrench, SimServices, SimulatedArm,
};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

/// Feed channel depth. Producers block once the loop falls this far behind.
const FEED_CAPACITY: usize = 64;

/// pHRI Control: multi-rate compliance control loop
#[derive(Parser, Debug)]
#[command(name = "phri_control")]
#[command(version)]
#[command(about = "Compliance control loop for physical human-robot interaction")]
struct Args {
    /// Path to the control configuration TOML.
    #[arg(long, short, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// CPU core to pin the control thread to (default: 1).
    #[arg(long, default_value_t = 1)]
    cpu_core: usize,

    /// SCHED_FIFO priority (default: 80).
    #[arg(long, default_value_t = 80)]
    rt_priority: i32,

    /// Stop after this many seconds (default: run until Ctrl-C).
    #[arg(long, value_name = "SECS")]
    duration: Option<f64>,

    /// Simulate a 1 s, 8 N push starting at each of these times [s].
    #[arg(long, value_name = "SECS", value_delimiter = ',')]
    push_at: Vec<f64>,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    let loaded = load_config(&args.config);
    let level = loaded
        .as_ref()
        .map(|cfg| cfg.raw.shared.log_level)
        .unwrap_or_default();
    setup_tracing(&args, level);

    info!("pHRI Control v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = loaded
        .map_err(Into::into)
        .and_then(|loaded| run(&args, loaded));
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("pHRI Control shutdown complete");
}

fn run(args: &Args, loaded: LoadedConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        service = %loaded.raw.shared.service_name,
        dofs = loaded.dofs(),
        force_period = ?loaded.timing.force_period,
        trajectory_period = ?loaded.timing.trajectory_period,
        "config OK"
    );

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    let clock = MonotonicClock::new();
    let request = initial_request(&loaded);

    // ── Simulated robot stack ──
    let (wrench_tx, wrench_rx) = bounded(FEED_CAPACITY);
    let (joints_tx, joints_rx) = bounded(FEED_CAPACITY);
    let (velocity_tx, velocity_rx) = bounded(FEED_CAPACITY);
    let (twist_tx, twist_rx) = bounded(FEED_CAPACITY);

    let names = joint_names(&loaded);
    let arm = SimulatedArm::new(names, request.start.clone());
    let arm_handle = sim::spawn_arm(
        arm,
        loaded.timing.force_period,
        clock,
        joints_tx,
        velocity_rx,
        twist_rx,
        running.clone(),
    );
    let pushes = args
        .push_at
        .iter()
        .map(|&at| Push {
            at,
            duration: 1.0,
            force: 8.0,
        })
        .collect();
    let wrench_handle = sim::spawn_wrench_feed(
        ScriptedWrench::new(pushes),
        loaded.timing.force_period,
        clock,
        wrench_tx,
        running.clone(),
    );

    // ── Control loop ──
    let frames = sim::frame_tree(&loaded.raw.robot.working_frame);
    let mut control = ControlLoop::new(
        &loaded,
        clock,
        Box::new(frames),
        Box::new(velocity_tx),
        Box::new(twist_tx),
    )?;

    let mut services = SimServices;
    let report = control.start_services(&mut services);
    info!(?report, "startup services done");

    let mut planner = LinearPlanner::new(loaded.num_waypts);
    control.replan(&mut planner, &mut services, request)?;

    rt_setup(args.cpu_core, args.rt_priority)?;
    info!(
        "RT setup complete (cpu_core={}, priority={})",
        args.cpu_core, args.rt_priority
    );

    if let Some(secs) = args.duration {
        let r = running.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_secs_f64(secs.max(0.0)));
            r.store(false, Ordering::SeqCst);
        });
    }

    let mut runner = CycleRunner::new(
        control,
        Feeds {
            wrench: wrench_rx,
            joints: joints_rx,
        },
        clock,
        loaded.timing.force_period,
        loaded.timing.trajectory_period,
    );
    let result = runner.run(&running);
    running.store(false, Ordering::SeqCst);

    // Drop the loop's senders before joining so no producer blocks.
    let snapshot = runner.control().snapshot();
    drop(runner);
    join_or_warn(wrench_handle, "wrench feed");
    if let Some(arm) = join_or_warn(arm_handle, "simulated arm") {
        info!(position = %arm.position(), "final arm position");
    }
    info!(
        mode = ?snapshot.mode,
        reached_start = snapshot.path_start_reached,
        reached_goal = snapshot.path_end_reached,
        t = clock.now(),
        "final state"
    );

    result.map_err(Into::into)
}

/// Join a producer thread, logging a panic instead of propagating it.
fn join_or_warn<T>(handle: thread::JoinHandle<T>, name: &str) -> Option<T> {
    match handle.join() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(thread = name, "thread panicked");
            None
        }
    }
}

/// Plan request from `[trajectory]`, or a hold-in-place plan at zero.
fn initial_request(loaded: &LoadedConfig) -> PlanRequest {
    loaded.plan.clone().unwrap_or_else(|| PlanRequest {
        start: DofVector::zeros(loaded.dofs()),
        goal: DofVector::zeros(loaded.dofs()),
        goal_pose: None,
        horizon: 1.0,
        timestep: 0.5,
        seed: None,
    })
}

fn joint_names(loaded: &LoadedConfig) -> Vec<String> {
    if loaded.raw.robot.joint_names.is_empty() {
        (0..loaded.dofs()).map(|i| format!("joint_{i}")).collect()
    } else {
        loaded.raw.robot.joint_names.clone()
    }
}

/// Setup tracing subscriber from CLI arguments and `[shared] log_level`.
///
/// `RUST_LOG` still overrides per-target levels; `--verbose` forces DEBUG.
fn setup_tracing(args: &Args, level: LogLevel) {
    let directive: Directive = if args.verbose {
        Level::DEBUG.into()
    } else {
        level
            .as_directive()
            .parse()
            .unwrap_or_else(|_| Level::INFO.into())
    };

    let filter = EnvFilter::from_default_env().add_directive(directive);

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
