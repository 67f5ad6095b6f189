pub mod field;
/// The `helix_core` crate propagates charged particles along curved
/// trajectories through a `helix_geo` geometry.
///
/// Key components:
/// - **Traits**: `MagneticField`, `FieldEquation`, `Stepper` and `Driver`.
/// - **Field**: equations of motion, Runge-Kutta steppers, the adaptive driver
///   and the field/linear propagators.
/// - **Track**: particle data, per-track state stores and initialization from
///   primaries and secondaries.
pub mod track;
pub mod traits;

pub use field::{
    DormandPrinceStepper, FieldDriver, FieldDriverOptions, FieldPropagator, LinearPropagator,
    MagFieldEquation, OdeState, RungeKuttaStepper, RzMapField, UniformField,
};
pub use track::{
    ParticleParams, Primary, TrackInitializer, TrackStates, TrackStatus,
};
pub use traits::{Driver, FieldEquation, MagneticField, Stepper};
