use crate::field::{DriverResult, OdeState, StepperResult};
use helix_geo::Real3;

/// A static magnetic field.
pub trait MagneticField {
    /// Field vector in tesla at a position in cm.
    fn field(&self, pos: &Real3) -> Real3;
}

impl<F: MagneticField + ?Sized> MagneticField for &F {
    fn field(&self, pos: &Real3) -> Real3 {
        (**self).field(pos)
    }
}

/// Right-hand side of an equation of motion parameterized by path length.
pub trait FieldEquation {
    /// Evaluates d(state)/ds.
    fn derivative(&self, state: &OdeState) -> OdeState;
}

/// A single integration step with an embedded error estimate.
pub trait Stepper {
    /// Integrates over a path length `step` starting from `beg`.
    /// Returns the midpoint, the end point and the truncation error.
    fn step(&self, step: f64, beg: &OdeState) -> StepperResult;
}

/// Adaptive integration of a curved substep.
pub trait Driver {
    /// Advance up to `step`, possibly less if the trajectory bends too much.
    fn advance(&self, step: f64, state: &OdeState) -> DriverResult;

    /// Steps shorter than this are taken without error control.
    fn minimum_step(&self) -> f64;

    /// Tolerance for the distance between a chord intercept and the curve.
    fn delta_intersection(&self) -> f64;
}
