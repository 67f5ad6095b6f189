use crate::field::{OdeState, StepperResult};
use crate::traits::{FieldEquation, Stepper};

/// Classic Runge-Kutta 4th order stepper.
///
/// The error is estimated by comparing one full step against two half steps,
/// and the half-step result is extrapolated with that estimate.
#[derive(Debug, Clone)]
pub struct RungeKuttaStepper<E> {
    equation: E,
}

impl<E: FieldEquation> RungeKuttaStepper<E> {
    pub fn new(equation: E) -> Self {
        Self { equation }
    }

    fn do_step(&self, h: f64, beg: &OdeState, k1: &OdeState) -> OdeState {
        let half = 0.5 * h;

        // k2 = f(y + h*k1/2)
        let k2 = self.equation.derivative(&beg.axpy(half, k1));

        // k3 = f(y + h*k2/2)
        let k3 = self.equation.derivative(&beg.axpy(half, &k2));

        // k4 = f(y + h*k3)
        let k4 = self.equation.derivative(&beg.axpy(h, &k3));

        // y_next = y + h/6 * (k1 + 2k2 + 2k3 + k4)
        beg.axpy(h / 6.0, &(*k1 + (k2 + k3) * 2.0 + k4))
    }
}

impl<E: FieldEquation> Stepper for RungeKuttaStepper<E> {
    fn step(&self, step: f64, beg: &OdeState) -> StepperResult {
        let half = 0.5 * step;
        let k1 = self.equation.derivative(beg);

        let mid_state = self.do_step(half, beg, &k1);
        let mid_deriv = self.equation.derivative(&mid_state);
        let end_half = self.do_step(half, &mid_state, &mid_deriv);

        let end_full = self.do_step(step, beg, &k1);

        let err_state = (end_half - end_full) * (1.0 / 15.0);
        StepperResult {
            mid_state,
            end_state: end_half + err_state,
            err_state,
        }
    }
}

/// Dormand-Prince 5(4) embedded stepper with a 4th order midpoint estimate.
#[derive(Debug, Clone)]
pub struct DormandPrinceStepper<E> {
    equation: E,
}

impl<E: FieldEquation> DormandPrinceStepper<E> {
    pub fn new(equation: E) -> Self {
        Self { equation }
    }
}

impl<E: FieldEquation> Stepper for DormandPrinceStepper<E> {
    fn step(&self, step: f64, beg: &OdeState) -> StepperResult {
        let h = step;

        // Tableau
        let a21 = 1.0 / 5.0;

        let a31 = 3.0 / 40.0;
        let a32 = 9.0 / 40.0;

        let a41 = 44.0 / 45.0;
        let a42 = -56.0 / 15.0;
        let a43 = 32.0 / 9.0;

        let a51 = 19372.0 / 6561.0;
        let a52 = -25360.0 / 2187.0;
        let a53 = 64448.0 / 6561.0;
        let a54 = -212.0 / 729.0;

        let a61 = 9017.0 / 3168.0;
        let a62 = -355.0 / 33.0;
        let a63 = 46732.0 / 5247.0;
        let a64 = 49.0 / 176.0;
        let a65 = -5103.0 / 18656.0;

        let a71 = 35.0 / 384.0;
        let a73 = 500.0 / 1113.0;
        let a74 = 125.0 / 192.0;
        let a75 = -2187.0 / 6784.0;
        let a76 = 11.0 / 84.0;

        // Difference between the 5th and 4th order solutions
        let e1 = 71.0 / 57600.0;
        let e3 = -71.0 / 16695.0;
        let e4 = 71.0 / 1920.0;
        let e5 = -17253.0 / 339200.0;
        let e6 = 22.0 / 525.0;
        let e7 = -1.0 / 40.0;

        // Dense output at half the step
        let c71 = 6025192743.0 / 30085553152.0;
        let c73 = 51252292925.0 / 65400821598.0;
        let c74 = -2691868925.0 / 45128329728.0;
        let c75 = 187940372067.0 / 1594534317056.0;
        let c76 = -1776094331.0 / 19743644256.0;
        let c77 = 11237099.0 / 235043384.0;

        let eq = &self.equation;
        let k1 = eq.derivative(beg);
        let k2 = eq.derivative(&beg.axpy(h, &(k1 * a21)));
        let k3 = eq.derivative(&beg.axpy(h, &(k1 * a31 + k2 * a32)));
        let k4 = eq.derivative(&beg.axpy(h, &(k1 * a41 + k2 * a42 + k3 * a43)));
        let k5 = eq.derivative(&beg.axpy(h, &(k1 * a51 + k2 * a52 + k3 * a53 + k4 * a54)));
        let k6 = eq.derivative(&beg.axpy(
            h,
            &(k1 * a61 + k2 * a62 + k3 * a63 + k4 * a64 + k5 * a65),
        ));

        // FSAL: the 7th stage is evaluated at the 5th order solution
        let end_state = beg.axpy(h, &(k1 * a71 + k3 * a73 + k4 * a74 + k5 * a75 + k6 * a76));
        let k7 = eq.derivative(&end_state);

        let err_state = (k1 * e1 + k3 * e3 + k4 * e4 + k5 * e5 + k6 * e6 + k7 * e7) * h;
        let mid_state = beg.axpy(
            h,
            &(k1 * c71 + k3 * c73 + k4 * c74 + k5 * c75 + k6 * c76 + k7 * c77),
        );

        StepperResult {
            mid_state,
            end_state,
            err_state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{MagFieldEquation, UniformField, LORENTZ_COEFFICIENT};
    use helix_geo::Real3;

    // Negative unit charge in 1 T along z with a 1 cm radius: the track
    // starts at the origin heading +x and circles counterclockwise about
    // (0, 1, 0).
    fn unit_circle_equation() -> MagFieldEquation<UniformField> {
        MagFieldEquation::new(UniformField::new(Real3::new(0.0, 0.0, 1.0)), -1.0)
    }

    fn start() -> OdeState {
        OdeState::new(Real3::zeros(), Real3::new(LORENTZ_COEFFICIENT, 0.0, 0.0))
    }

    fn exact_pos(s: f64) -> Real3 {
        Real3::new(s.sin(), 1.0 - s.cos(), 0.0)
    }

    fn check_stepper(stepper: &impl Stepper) {
        let h = 0.1;
        let result = stepper.step(h, &start());
        assert!((result.end_state.pos - exact_pos(h)).norm() < 1e-7);
        assert!((result.mid_state.pos - exact_pos(0.5 * h)).norm() < 1e-6);
        assert!(result.err_state.pos.norm() < 1e-6);
        assert!((result.end_state.mom.norm() - LORENTZ_COEFFICIENT).abs() < 1e-6);

        let coarse = stepper.step(1.0, &start());
        assert!(coarse.err_state.pos.norm() > result.err_state.pos.norm());
    }

    #[test]
    fn runge_kutta_follows_a_circle() {
        check_stepper(&RungeKuttaStepper::new(unit_circle_equation()));
    }

    #[test]
    fn dormand_prince_follows_a_circle() {
        check_stepper(&DormandPrinceStepper::new(unit_circle_equation()));
    }

    #[test]
    fn straight_line_is_exact() {
        let equation = MagFieldEquation::new(UniformField::new(Real3::zeros()), 1.0);
        let stepper = DormandPrinceStepper::new(equation);
        let beg = OdeState::new(Real3::new(1.0, 0.0, 0.0), Real3::new(0.0, 3.0, 4.0));
        let result = stepper.step(10.0, &beg);
        assert!((result.end_state.pos - Real3::new(1.0, 6.0, 8.0)).norm() < 1e-12);
        assert!((result.mid_state.pos - Real3::new(1.0, 3.0, 4.0)).norm() < 1e-12);
        assert!(result.err_state.pos.norm() < 1e-12);
    }
}
