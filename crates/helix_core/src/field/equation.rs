use crate::field::OdeState;
use crate::traits::{FieldEquation, MagneticField};

/// Curvature constant for momentum in MeV/c, length in cm and field in tesla.
///
/// A unit-charge particle with momentum `p` in field `B` bends with radius
/// `p / (LORENTZ_COEFFICIENT * B)`.
pub const LORENTZ_COEFFICIENT: f64 = 2.99792458;

/// Lorentz force equation of motion with respect to path length.
///
/// d(pos)/ds = p̂, d(mom)/ds = k q (p̂ × B)
#[derive(Debug, Clone, Copy)]
pub struct MagFieldEquation<F> {
    field: F,
    coefficient: f64,
}

impl<F: MagneticField> MagFieldEquation<F> {
    /// Equation for a particle with `charge` in units of the elementary
    /// charge.
    pub fn new(field: F, charge: f64) -> Self {
        Self {
            field,
            coefficient: LORENTZ_COEFFICIENT * charge,
        }
    }
}

impl<F: MagneticField> FieldEquation for MagFieldEquation<F> {
    fn derivative(&self, state: &OdeState) -> OdeState {
        let b = self.field.field(&state.pos);
        let inv_mom = 1.0 / state.mom.norm();
        let unit = state.mom * inv_mom;
        OdeState {
            pos: unit,
            mom: unit.cross(&b) * self.coefficient,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::UniformField;
    use helix_geo::Real3;

    #[test]
    fn derivative_is_perpendicular_to_momentum() {
        let field = UniformField::new(Real3::new(0.0, 0.0, 1.0));
        let equation = MagFieldEquation::new(&field, -1.0);
        let state = OdeState::new(Real3::zeros(), Real3::new(10.0, 0.0, 0.0));
        let deriv = equation.derivative(&state);
        assert_eq!(deriv.pos, Real3::new(1.0, 0.0, 0.0));
        // x̂ × ẑ = -ŷ, flipped by the negative charge
        assert!((deriv.mom - Real3::new(0.0, LORENTZ_COEFFICIENT, 0.0)).norm() < 1e-12);
        assert!(deriv.mom.dot(&state.mom).abs() < 1e-12);
    }

    #[test]
    fn neutral_particle_goes_straight() {
        let field = UniformField::new(Real3::new(0.3, -2.0, 1.0));
        let equation = MagFieldEquation::new(field, 0.0);
        let state = OdeState::new(Real3::new(1.0, 2.0, 3.0), Real3::new(0.0, 3.0, 4.0));
        let deriv = equation.derivative(&state);
        assert!((deriv.pos - Real3::new(0.0, 0.6, 0.8)).norm() < 1e-12);
        assert_eq!(deriv.mom, Real3::zeros());
    }
}
