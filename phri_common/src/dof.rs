//! Per-DOF vector types.
//!
//! [`DofVector`] holds one `f64` per controlled degree of freedom in a
//! fixed-capacity `heapless::Vec`, so the tick path never allocates.
//! [`CommandDiagonal`] is the diagonal of an implied square command matrix:
//! off-diagonal entries do not exist in memory and always read as zero.

use core::fmt;
use core::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::consts::MAX_DOFS;

/// Backing storage for per-DOF values.
pub type DofBuf = heapless::Vec<f64, MAX_DOFS>;

/// One value per degree of freedom (capacity [`MAX_DOFS`]).
///
/// Element-wise operations zip their operands; mismatched lengths are a
/// caller contract violation and only checked by debug assertions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DofVector(DofBuf);

impl DofVector {
    /// Vector of `n` zeros (truncated to [`MAX_DOFS`]).
    pub fn zeros(n: usize) -> Self {
        Self::filled(n, 0.0)
    }

    /// Vector of `n` copies of `value` (truncated to [`MAX_DOFS`]).
    pub fn filled(n: usize, value: f64) -> Self {
        core::iter::repeat_n(value, n.min(MAX_DOFS)).collect()
    }

    /// Copy from a slice. Returns `None` if the slice exceeds [`MAX_DOFS`].
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        if values.len() > MAX_DOFS {
            return None;
        }
        Some(values.iter().copied().collect())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    #[inline]
    pub fn iter(&self) -> core::slice::Iter<'_, f64> {
        self.0.iter()
    }

    #[inline]
    pub fn get(&self, i: usize) -> Option<f64> {
        self.0.get(i).copied()
    }

    /// Element-wise product `self ⊙ other`.
    #[inline]
    pub fn hadamard(&self, other: &Self) -> Self {
        debug_assert_eq!(self.len(), other.len(), "DOF length mismatch");
        self.zip_with(other, |a, b| a * b)
    }

    /// Element-wise sum.
    #[inline]
    pub fn add(&self, other: &Self) -> Self {
        debug_assert_eq!(self.len(), other.len(), "DOF length mismatch");
        self.zip_with(other, |a, b| a + b)
    }

    /// Element-wise difference `self − other`.
    #[inline]
    pub fn sub(&self, other: &Self) -> Self {
        debug_assert_eq!(self.len(), other.len(), "DOF length mismatch");
        self.zip_with(other, |a, b| a - b)
    }

    /// Multiply every entry by `k`.
    #[inline]
    pub fn scale(&self, k: f64) -> Self {
        self.iter().map(|v| v * k).collect()
    }

    /// In-place `self += k · other`.
    #[inline]
    pub fn add_scaled(&mut self, k: f64, other: &Self) {
        debug_assert_eq!(self.len(), other.len(), "DOF length mismatch");
        for (a, b) in self.0.iter_mut().zip(other.iter()) {
            *a += k * b;
        }
    }

    /// Clamp every entry into `[min[i], max[i]]`.
    pub fn clamp_between(&mut self, min: &Self, max: &Self) {
        for ((v, lo), hi) in self.0.iter_mut().zip(min.iter()).zip(max.iter()) {
            *v = v.max(*lo).min(*hi);
        }
    }

    /// Euclidean norm.
    #[inline]
    pub fn norm(&self) -> f64 {
        self.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// Set every entry to zero, keeping the length.
    #[inline]
    pub fn fill_zero(&mut self) {
        for v in self.0.iter_mut() {
            *v = 0.0;
        }
    }

    /// True if every entry is finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.iter().all(|v| v.is_finite())
    }

    fn zip_with(&self, other: &Self, f: impl Fn(f64, f64) -> f64) -> Self {
        self.iter().zip(other.iter()).map(|(a, b)| f(*a, *b)).collect()
    }
}

impl FromIterator<f64> for DofVector {
    /// Collects at most [`MAX_DOFS`] values. Longer input is a bug: it panics
    /// in debug builds and is truncated in release builds.
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut out = heapless::Vec::new();
        for v in iter {
            let pushed = out.push(v).is_ok();
            debug_assert!(pushed, "more than {MAX_DOFS} values collected into a DofVector");
            if !pushed {
                break;
            }
        }
        Self(out)
    }
}

impl Index<usize> for DofVector {
    type Output = f64;

    #[inline]
    fn index(&self, i: usize) -> &f64 {
        &self.0[i]
    }
}

impl IndexMut<usize> for DofVector {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut f64 {
        &mut self.0[i]
    }
}

impl fmt::Display for DofVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v:.6}")?;
        }
        write!(f, "]")
    }
}

/// Diagonal of an implied `dim × dim` command matrix.
///
/// Each diagonal entry is the command for one DOF. Off-diagonal entries are
/// always zero because they are never stored.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommandDiagonal {
    diag: DofVector,
}

impl CommandDiagonal {
    /// All-zero command of dimension `dim`.
    pub fn zeros(dim: usize) -> Self {
        Self {
            diag: DofVector::zeros(dim),
        }
    }

    /// Wrap a per-DOF command as the matrix diagonal.
    pub fn from_diagonal(diag: DofVector) -> Self {
        Self { diag }
    }

    /// Matrix dimension (number of DOFs).
    #[inline]
    pub fn dim(&self) -> usize {
        self.diag.len()
    }

    #[inline]
    pub fn diagonal(&self) -> &DofVector {
        &self.diag
    }

    #[inline]
    pub fn into_diagonal(self) -> DofVector {
        self.diag
    }

    /// Matrix entry `(row, col)`. Zero off the diagonal and out of range.
    #[inline]
    pub fn entry(&self, row: usize, col: usize) -> f64 {
        if row != col {
            return 0.0;
        }
        self.diag.get(row).unwrap_or(0.0)
    }

    /// First `n` diagonal entries as a flat vector.
    pub fn leading(&self, n: usize) -> DofVector {
        self.diag.iter().copied().take(n).collect()
    }

    /// Zero every entry, keeping the dimension.
    #[inline]
    pub fn zero(&mut self) {
        self.diag.fill_zero();
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.diag.iter().all(|v| *v == 0.0)
    }

    /// Clip every diagonal entry into `[-limit, limit]`.
    pub fn clip(&mut self, limit: f64) {
        let limit = limit.abs();
        for i in 0..self.diag.len() {
            self.diag[i] = self.diag[i].clamp(-limit, limit);
        }
    }
}
