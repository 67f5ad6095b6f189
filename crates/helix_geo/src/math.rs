//! Vector aliases and soft floating-point comparisons.
//!
//! Positions, directions and momenta are all `Real3`. Comparisons that must
//! tolerate roundoff go through `SoftEqual`, which is generic over the float
//! type so the same tolerances apply to single- and double-precision data.

use nalgebra::Vector3;
use num_traits::Float;

pub type Real3 = Vector3<f64>;

/// Relative/absolute tolerance pair for approximate comparisons.
#[derive(Debug, Clone, Copy)]
pub struct SoftEqual<T> {
    rel: T,
    abs: T,
}

impl<T: Float> SoftEqual<T> {
    pub fn new(rel: T, abs: T) -> Self {
        Self { rel, abs }
    }

    pub fn rel(&self) -> T {
        self.rel
    }

    pub fn abs(&self) -> T {
        self.abs
    }

    /// True if `actual` is within tolerance of `expected`.
    pub fn is_equal(&self, expected: T, actual: T) -> bool {
        if expected == actual {
            // Also covers matching infinities
            return true;
        }
        let diff = (expected - actual).abs();
        if diff < self.abs {
            return true;
        }
        diff < self.rel * expected.abs().max(actual.abs())
    }

    pub fn is_zero(&self, value: T) -> bool {
        value.abs() < self.abs
    }
}

impl Default for SoftEqual<f64> {
    fn default() -> Self {
        Self::new(1e-12, 1e-14)
    }
}

impl Default for SoftEqual<f32> {
    fn default() -> Self {
        Self::new(1e-6, 1e-8)
    }
}

pub fn soft_equal(expected: f64, actual: f64) -> bool {
    SoftEqual::default().is_equal(expected, actual)
}

/// Absolute tolerance for positions that should coincide exactly.
pub const SOFT_ZERO: f64 = 1e-12;

pub fn soft_zero(value: f64) -> bool {
    value.abs() <= SOFT_ZERO
}

pub fn is_soft_unit_vector(v: &Real3) -> bool {
    SoftEqual::new(1e-6, 1e-6).is_equal(1.0, v.norm_squared())
}

/// Scale a nonzero vector to unit length.
pub fn make_unit_vector(v: &Real3) -> Real3 {
    debug_assert!(v.norm_squared() > 0.0);
    v / v.norm()
}
