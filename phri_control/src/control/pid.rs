//! Vector PID controller with backward Euler integration.
//!
//! One instance tracks every DOF at once: the error, gains and accumulated
//! state are per-DOF vectors and the command is returned as the diagonal of
//! a square command matrix. Zero `i` disables integral; zero `d` disables
//! derivative.

use core::fmt;

use phri_common::dof::{CommandDiagonal, DofVector};

use crate::clock::Clock;

/// PID gains plus integral clamp bounds. Replaced wholesale, never edited.
#[derive(Debug, Clone, PartialEq)]
pub struct GainSet {
    /// Proportional gain.
    pub p: DofVector,
    /// Integral gain (0 = disabled).
    pub i: DofVector,
    /// Derivative gain (0 = disabled).
    pub d: DofVector,
    /// Integral error lower bound.
    pub i_min: DofVector,
    /// Integral error upper bound.
    pub i_max: DofVector,
    /// Apply `[i_min, i_max]` to the integral error. Off by default.
    pub clamp_integral: bool,
}

impl GainSet {
    /// Same gains on every DOF, integral unclamped.
    pub fn uniform(dofs: usize, p: f64, i: f64, d: f64) -> Self {
        Self {
            p: DofVector::filled(dofs, p),
            i: DofVector::filled(dofs, i),
            d: DofVector::filled(dofs, d),
            i_min: DofVector::filled(dofs, f64::NEG_INFINITY),
            i_max: DofVector::filled(dofs, f64::INFINITY),
            clamp_integral: false,
        }
    }

    /// Number of DOFs these gains cover.
    #[inline]
    pub fn dofs(&self) -> usize {
        self.p.len()
    }
}

/// Accumulated PID state.
///
/// Owned by exactly one [`Pid`]. [`ControllerState::reset`] returns every
/// field to zero (and the time reference to "never updated").
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerState {
    /// Most recent error passed to `update`.
    pub p_error: DofVector,
    /// Error of the last non-degenerate update (derivative reference).
    pub p_error_last: DofVector,
    /// Integral error.
    pub i_error: DofVector,
    /// Derivative error.
    pub d_error: DofVector,
    /// Last command produced on the non-degenerate path.
    pub cmd: CommandDiagonal,
    /// Clock reference [s]; `None` until the first clock-derived update.
    pub last_time: Option<f64>,
}

impl ControllerState {
    pub fn new(dofs: usize) -> Self {
        Self {
            p_error: DofVector::zeros(dofs),
            p_error_last: DofVector::zeros(dofs),
            i_error: DofVector::zeros(dofs),
            d_error: DofVector::zeros(dofs),
            cmd: CommandDiagonal::zeros(dofs),
            last_time: None,
        }
    }

    /// Reset all internal state to zero.
    #[inline]
    pub fn reset(&mut self) {
        self.p_error.fill_zero();
        self.p_error_last.fill_zero();
        self.i_error.fill_zero();
        self.d_error.fill_zero();
        self.cmd.zero();
        self.last_time = None;
    }
}

/// Vector PID controller.
///
/// `C` supplies the time reference when `update` is called without an
/// explicit `dt`.
#[derive(Debug, Clone)]
pub struct Pid<C> {
    gains: GainSet,
    state: ControllerState,
    clock: C,
}

impl<C: Clock> Pid<C> {
    pub fn new(gains: GainSet, clock: C) -> Self {
        let state = ControllerState::new(gains.dofs());
        Self {
            gains,
            state,
            clock,
        }
    }

    /// Replace the gains. Accumulated state is kept.
    pub fn set_gains(&mut self, gains: GainSet) {
        debug_assert_eq!(gains.dofs(), self.state.p_error.len());
        self.gains = gains;
    }

    /// Zero all accumulated state. Idempotent.
    pub fn reset(&mut self) {
        self.state.reset();
    }

    /// Run one PID step on `error` (target − measured).
    ///
    /// `dt = None` derives the step from the clock: the first such call only
    /// initializes the reference (effective `dt = 0`).
    ///
    /// A degenerate `dt` (zero, NaN or infinite) returns an all-zero command
    /// and leaves integral, derivative and previous-error state untouched.
    pub fn update(&mut self, error: &DofVector, dt: Option<f64>) -> CommandDiagonal {
        debug_assert_eq!(error.len(), self.gains.dofs());

        let dt = match dt {
            Some(dt) => dt,
            None => {
                let now = self.clock.now();
                let dt = self.state.last_time.map_or(0.0, |last| now - last);
                self.state.last_time = Some(now);
                dt
            }
        };

        self.state.p_error = error.clone();

        if dt == 0.0 || !dt.is_finite() {
            return CommandDiagonal::zeros(self.gains.dofs());
        }

        // ── P term ──────────────────────────────────────────────
        let p_term = self.gains.p.hadamard(error);

        // ── I term (backward Euler) ─────────────────────────────
        self.state.i_error.add_scaled(dt, error);
        if self.gains.clamp_integral {
            self.state
                .i_error
                .clamp_between(&self.gains.i_min, &self.gains.i_max);
        }
        let i_term = self.gains.i.hadamard(&self.state.i_error);

        // ── D term ──────────────────────────────────────────────
        self.state.d_error = error.sub(&self.state.p_error_last).scale(1.0 / dt);
        self.state.p_error_last = error.clone();
        let d_term = self.gains.d.hadamard(&self.state.d_error);

        self.state.cmd = CommandDiagonal::from_diagonal(p_term.add(&i_term).add(&d_term));
        self.state.cmd.clone()
    }

    #[inline]
    pub fn gains(&self) -> &GainSet {
        &self.gains
    }

    #[inline]
    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    #[inline]
    pub fn p_gain(&self) -> &DofVector {
        &self.gains.p
    }

    #[inline]
    pub fn i_gain(&self) -> &DofVector {
        &self.gains.i
    }

    #[inline]
    pub fn d_gain(&self) -> &DofVector {
        &self.gains.d
    }

    #[inline]
    pub fn i_min(&self) -> &DofVector {
        &self.gains.i_min
    }

    #[inline]
    pub fn i_max(&self) -> &DofVector {
        &self.gains.i_max
    }

    #[inline]
    pub fn p_error(&self) -> &DofVector {
        &self.state.p_error
    }

    #[inline]
    pub fn p_error_last(&self) -> &DofVector {
        &self.state.p_error_last
    }

    #[inline]
    pub fn i_error(&self) -> &DofVector {
        &self.state.i_error
    }

    #[inline]
    pub fn d_error(&self) -> &DofVector {
        &self.state.d_error
    }

    #[inline]
    pub fn cmd(&self) -> &CommandDiagonal {
        &self.state.cmd
    }

    #[inline]
    pub fn last_time(&self) -> Option<f64> {
        self.state.last_time
    }
}

impl<C> fmt::Display for Pid<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "gains:")?;
        writeln!(f, "  p: {}", self.gains.p)?;
        writeln!(f, "  i: {}", self.gains.i)?;
        writeln!(f, "  d: {}", self.gains.d)?;
        writeln!(
            f,
            "  i_min: {}  i_max: {}  clamp: {}",
            self.gains.i_min, self.gains.i_max, self.gains.clamp_integral
        )?;
        writeln!(f, "state:")?;
        writeln!(f, "  p_error: {}", self.state.p_error)?;
        writeln!(f, "  p_error_last: {}", self.state.p_error_last)?;
        writeln!(f, "  i_error: {}", self.state.i_error)?;
        writeln!(f, "  d_error: {}", self.state.d_error)?;
        writeln!(f, "  cmd: {}", self.state.cmd.diagonal())?;
        match self.state.last_time {
            Some(t) => write!(f, "  last_time: {t:.6}"),
            None => write!(f, "  last_time: never"),
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
