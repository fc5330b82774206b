//! Multi-rate cycle: feeds → force tick → trajectory tick.
//!
//! A single thread owns the [`ControlLoop`] and runs every activity to
//! completion, so force processing, joint-state handling and velocity
//! emission never interleave.
//!
//! ## RT Setup
//! 1. `mlockall(MCL_CURRENT | MCL_FUTURE)` — lock all pages.
//! 2. Prefault stack pages.
//! 3. `sched_setaffinity` — pin to an isolated CPU core.
//! 4. `sched_setscheduler(SCHED_FIFO, prio)` — RT priority.
//!
//! ## Poll Order
//! Latch newest wrench → force tick (if due) → drain joint states →
//! trajectory tick (if due). Deadlines advance by whole periods; periods
//! missed while the thread was late are counted as overruns, never replayed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, TryRecvError};
use phri_common::dof::DofVector;
use phri_common::geometry::{JointState, WrenchSample};
use tracing::{info, warn};

use crate::clock::Clock;
use crate::control_loop::{ControlLoop, ForceOutcome};

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-tick timing statistics.
#[derive(Debug, Clone)]
pub struct CycleStats {
    /// Ticks executed.
    pub cycle_count: u64,
    /// Ticks that did no work (no sample, failed lookup).
    pub skipped: u64,
    /// Last tick duration [ns].
    pub last_cycle_ns: i64,
    /// Minimum tick duration [ns].
    pub min_cycle_ns: i64,
    /// Maximum tick duration [ns].
    pub max_cycle_ns: i64,
    /// Running sum for average computation.
    pub sum_cycle_ns: i64,
    /// Periods missed because the tick ran late.
    pub overruns: u64,
}

impl CycleStats {
    /// Create a new zeroed stats instance.
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            skipped: 0,
            last_cycle_ns: 0,
            min_cycle_ns: i64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
        }
    }

    /// Record a tick duration. O(1), no allocation.
    #[inline]
    pub fn record(&mut self, duration_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        if duration_ns < self.min_cycle_ns {
            self.min_cycle_ns = duration_ns;
        }
        if duration_ns > self.max_cycle_ns {
            self.max_cycle_ns = duration_ns;
        }
        self.sum_cycle_ns += duration_ns;
    }

    /// Average tick time [ns] (returns 0 if no ticks).
    #[inline]
    pub fn avg_cycle_ns(&self) -> i64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count as i64
        }
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Errors ─────────────────────────────────────────────────────────

/// Errors during RT setup or cycle execution.
#[derive(Debug)]
pub enum CycleError {
    /// RT system call failed.
    RtSetup(String),
    /// The joint-state feed was closed by its producer.
    FeedClosed(&'static str),
}

impl std::fmt::Display for CycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RtSetup(msg) => write!(f, "RT setup error: {msg}"),
            Self::FeedClosed(feed) => write!(f, "{feed} feed closed"),
        }
    }
}

impl std::error::Error for CycleError {}

// ─── RT Setup ───────────────────────────────────────────────────────

/// Lock all current and future memory pages.
#[cfg(feature = "rt")]
fn rt_mlockall() -> Result<(), CycleError> {
    use nix::sys::mman::{MlockallFlags, mlockall};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| CycleError::RtSetup(format!("mlockall failed: {e}")))?;
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_mlockall() -> Result<(), CycleError> {
    Ok(())
}

/// Touch 256 KiB of stack so the RT loop does not page-fault on it.
fn prefault_stack() {
    let mut buf = [0u8; 256 * 1024];
    for byte in buf.iter_mut() {
        // SAFETY: `byte` is a valid, exclusive reference into `buf`.
        unsafe { core::ptr::write_volatile(byte, 0xFF) };
    }
    core::hint::black_box(&buf);
}

/// Pin the current thread to a specific CPU core.
#[cfg(feature = "rt")]
fn rt_set_affinity(cpu: usize) -> Result<(), CycleError> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cpu)
        .map_err(|e| CycleError::RtSetup(format!("CpuSet::set({cpu}) failed: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| CycleError::RtSetup(format!("sched_setaffinity failed: {e}")))?;
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_affinity(_cpu: usize) -> Result<(), CycleError> {
    Ok(())
}

/// Set SCHED_FIFO with the given RT priority.
#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), CycleError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: `param` outlives the call; pid 0 targets the calling thread.
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(CycleError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_priority: i32) -> Result<(), CycleError> {
    Ok(())
}

/// Perform the full RT setup sequence.
///
/// Must be called on the thread that will run the cycle. Without the `rt`
/// feature every step except stack prefaulting is a no-op.
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), CycleError> {
    rt_mlockall()?;
    prefault_stack();
    rt_set_affinity(cpu_core)?;
    rt_set_scheduler(rt_priority)?;
    Ok(())
}

// ─── Cycle Runner ───────────────────────────────────────────────────

/// Sensor feeds consumed by the runner.
#[derive(Debug)]
pub struct Feeds {
    pub wrench: Receiver<WrenchSample>,
    pub joints: Receiver<JointState>,
}

/// What one [`CycleRunner::poll`] did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollReport {
    /// Force tick outcome, if the tick was due.
    pub force: Option<ForceOutcome>,
    /// Joint-state samples processed (accepted or rejected).
    pub joint_states: usize,
    /// Velocity published by the trajectory tick, if any.
    pub emitted: Option<DofVector>,
    /// Whether the trajectory tick was due.
    pub trajectory_ran: bool,
}

/// Fixed-period deadline that skips, rather than replays, missed periods.
#[derive(Debug, Clone, Copy)]
struct Deadline {
    period: f64,
    next: Option<f64>,
}

impl Deadline {
    const fn new(period: f64) -> Self {
        Self { period, next: None }
    }

    /// True if due at `now`. Advances the deadline and returns the number
    /// of whole periods missed.
    fn take(&mut self, now: f64) -> Option<u64> {
        let next = *self.next.get_or_insert(now);
        if now < next {
            return None;
        }
        let mut following = next + self.period;
        let mut missed = 0;
        if following <= now {
            missed = ((now - following) / self.period).floor() as u64 + 1;
            following += missed as f64 * self.period;
        }
        self.next = Some(following);
        Some(missed)
    }
}

/// Single-threaded scheduler driving the control loop.
pub struct CycleRunner<C> {
    control: ControlLoop<C>,
    feeds: Feeds,
    clock: C,
    force: Deadline,
    trajectory: Deadline,
    wrench_closed: bool,
    /// Force tick statistics.
    pub force_stats: CycleStats,
    /// Trajectory tick statistics.
    pub trajectory_stats: CycleStats,
}

impl<C: Clock> CycleRunner<C> {
    pub fn new(
        control: ControlLoop<C>,
        feeds: Feeds,
        clock: C,
        force_period: Duration,
        trajectory_period: Duration,
    ) -> Self {
        Self {
            control,
            feeds,
            clock,
            force: Deadline::new(force_period.as_secs_f64()),
            trajectory: Deadline::new(trajectory_period.as_secs_f64()),
            wrench_closed: false,
            force_stats: CycleStats::new(),
            trajectory_stats: CycleStats::new(),
        }
    }

    #[inline]
    pub fn control(&self) -> &ControlLoop<C> {
        &self.control
    }

    #[inline]
    pub fn control_mut(&mut self) -> &mut ControlLoop<C> {
        &mut self.control
    }

    /// Run every activity due at `now` [s].
    ///
    /// # Errors
    /// `CycleError::FeedClosed` when the joint-state feed has disconnected
    /// and is empty.
    pub fn poll(&mut self, now: f64) -> Result<PollReport, CycleError> {
        let mut report = PollReport::default();

        // ═══ WRENCH ═══
        loop {
            match self.feeds.wrench.try_recv() {
                Ok(sample) => self.control.on_wrench(sample),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.wrench_closed {
                        warn!("wrench feed closed, reusing last sample");
                        self.wrench_closed = true;
                    }
                    break;
                }
            }
        }

        // ═══ FORCE TICK ═══
        if let Some(missed) = self.force.take(now) {
            let start = Instant::now();
            let outcome = self.control.force_tick(now);
            self.force_stats.record(start.elapsed().as_nanos() as i64);
            self.force_stats.overruns += missed;
            if matches!(outcome, ForceOutcome::NoSample | ForceOutcome::Skipped(_)) {
                self.force_stats.skipped += 1;
            }
            report.force = Some(outcome);
        }

        // ═══ JOINT STATES ═══
        loop {
            match self.feeds.joints.try_recv() {
                Ok(state) => {
                    // Rejections are logged by the loop; keep draining.
                    let _ = self.control.on_joint_state(&state, now);
                    report.joint_states += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Err(CycleError::FeedClosed("joint-state")),
            }
        }

        // ═══ TRAJECTORY TICK ═══
        if let Some(missed) = self.trajectory.take(now) {
            let start = Instant::now();
            report.emitted = self.control.trajectory_tick();
            self.trajectory_stats.record(start.elapsed().as_nanos() as i64);
            self.trajectory_stats.overruns += missed;
            if report.emitted.is_none() {
                self.trajectory_stats.skipped += 1;
            }
            report.trajectory_ran = true;
        }

        Ok(report)
    }

    /// Poll from the runner's clock until `running` is cleared.
    ///
    /// Sleeps until the earlier of the two deadlines between polls. Meant
    /// for a real-time clock; a manually stepped clock would spin.
    pub fn run(&mut self, running: &AtomicBool) -> Result<(), CycleError> {
        info!(
            force_period_s = self.force.period,
            trajectory_period_s = self.trajectory.period,
            "cycle loop started"
        );

        while running.load(Ordering::Relaxed) {
            let now = self.clock.now();
            self.poll(now)?;

            let wake = match (self.force.next, self.trajectory.next) {
                (Some(a), Some(b)) => a.min(b),
                (a, b) => a.or(b).unwrap_or(now),
            };
            let remaining = wake - self.clock.now();
            if remaining > 0.0 {
                std::thread::sleep(Duration::from_secs_f64(remaining));
            }
        }

        info!(
            force_ticks = self.force_stats.cycle_count,
            force_overruns = self.force_stats.overruns,
            trajectory_ticks = self.trajectory_stats.cycle_count,
            emitted = self.control.emitted(),
            "cycle loop stopped"
        );
        Ok(())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
