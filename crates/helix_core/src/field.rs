//! Propagation of charged particles through magnetic fields.
//!
//! A curved substep is integrated by a [`Driver`](crate::traits::Driver) and
//! the chord between its endpoints is handed to the navigator as a straight
//! ray. Lengths are in cm, momenta in MeV/c and fields in tesla.

mod driver;
mod equation;
mod fields;
mod linear;
mod propagator;
mod steppers;
mod types;
mod utils;

pub use driver::{FieldDriver, FieldDriverOptions};
pub use equation::{MagFieldEquation, LORENTZ_COEFFICIENT};
pub use fields::{RzMapField, RzMapFieldInput, UniformField};
pub use linear::LinearPropagator;
pub use propagator::{FieldPropagator, MAX_SUBSTEPS};
pub use steppers::{DormandPrinceStepper, RungeKuttaStepper};
pub use types::{Chord, DriverResult, OdeState, StepperResult};
pub use utils::{calc_miss_distance, distance_chord, is_intercept_close, make_chord};
