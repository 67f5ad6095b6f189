use helix_geo::Real3;
use std::ops::{Add, Mul, Sub};

/// Position and momentum of a particle along its trajectory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OdeState {
    pub pos: Real3,
    pub mom: Real3,
}

impl OdeState {
    pub fn new(pos: Real3, mom: Real3) -> Self {
        Self { pos, mom }
    }

    pub fn zero() -> Self {
        Self {
            pos: Real3::zeros(),
            mom: Real3::zeros(),
        }
    }

    /// `self + a * other`
    pub fn axpy(&self, a: f64, other: &OdeState) -> OdeState {
        OdeState {
            pos: self.pos + other.pos * a,
            mom: self.mom + other.mom * a,
        }
    }
}

impl Add for OdeState {
    type Output = OdeState;

    fn add(self, rhs: OdeState) -> OdeState {
        OdeState {
            pos: self.pos + rhs.pos,
            mom: self.mom + rhs.mom,
        }
    }
}

impl Sub for OdeState {
    type Output = OdeState;

    fn sub(self, rhs: OdeState) -> OdeState {
        OdeState {
            pos: self.pos - rhs.pos,
            mom: self.mom - rhs.mom,
        }
    }
}

impl Mul<f64> for OdeState {
    type Output = OdeState;

    fn mul(self, rhs: f64) -> OdeState {
        OdeState {
            pos: self.pos * rhs,
            mom: self.mom * rhs,
        }
    }
}

/// Output of a single stepper call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepperResult {
    pub mid_state: OdeState,
    pub end_state: OdeState,
    pub err_state: OdeState,
}

/// Curved length actually integrated and the state at its end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriverResult {
    pub step: f64,
    pub state: OdeState,
}

/// Straight segment between two points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chord {
    pub length: f64,
    pub dir: Real3,
}
