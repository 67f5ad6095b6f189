use crate::field::{distance_chord, DriverResult, OdeState};
use crate::traits::{Driver, Stepper};
use anyhow::{bail, Result};
use helix_geo::math::SOFT_ZERO;
use serde::{Deserialize, Serialize};

/// Accuracy and step-control settings for [`FieldDriver`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldDriverOptions {
    /// Substeps shorter than this skip error control.
    pub minimum_step: f64,
    /// Maximum sagitta between a curved substep and its chord.
    pub delta_chord: f64,
    /// Maximum miss distance for accepting a chord intersection.
    pub delta_intersection: f64,
    /// Smallest integration step relative to the requested step.
    pub epsilon_step: f64,
    /// Maximum relative truncation error per step.
    pub epsilon_rel_max: f64,
    /// Errors below this grow the step by the maximum factor.
    pub errcon: f64,
    pub pgrow: f64,
    pub pshrink: f64,
    pub safety: f64,
    pub max_stepping_increase: f64,
    pub max_stepping_decrease: f64,
    /// Iteration cap for the chord and step-size searches.
    pub max_nsteps: u32,
}

impl Default for FieldDriverOptions {
    fn default() -> Self {
        Self {
            minimum_step: 1e-5,
            delta_chord: 0.025,
            delta_intersection: 1e-6,
            epsilon_step: 1e-5,
            epsilon_rel_max: 1e-3,
            errcon: 1e-4,
            pgrow: -0.2,
            pshrink: -0.25,
            safety: 0.9,
            max_stepping_increase: 5.0,
            max_stepping_decrease: 0.1,
            max_nsteps: 100,
        }
    }
}

impl FieldDriverOptions {
    pub fn validate(&self) -> Result<()> {
        if !(self.minimum_step > 0.0) {
            bail!("minimum_step must be positive.");
        }
        if !(self.delta_chord > 0.0) {
            bail!("delta_chord must be positive.");
        }
        if !(self.delta_intersection > SOFT_ZERO && self.delta_intersection < self.minimum_step) {
            bail!(
                "delta_intersection must lie between {} and minimum_step ({}).",
                SOFT_ZERO,
                self.minimum_step
            );
        }
        if !(self.epsilon_step > 0.0 && self.epsilon_step < 1.0) {
            bail!("epsilon_step must lie in (0, 1).");
        }
        if !(self.epsilon_rel_max > 0.0) {
            bail!("epsilon_rel_max must be positive.");
        }
        if !(self.errcon > 0.0) {
            bail!("errcon must be positive.");
        }
        if !(self.pgrow < 0.0 && self.pshrink < 0.0) {
            bail!("pgrow and pshrink must be negative.");
        }
        if !(self.safety > 0.0 && self.safety < 1.0) {
            bail!("safety must lie in (0, 1).");
        }
        if !(self.max_stepping_increase > 1.0) {
            bail!("max_stepping_increase must exceed 1.");
        }
        if !(self.max_stepping_decrease > 0.0 && self.max_stepping_decrease < 1.0) {
            bail!("max_stepping_decrease must lie in (0, 1).");
        }
        if self.max_nsteps == 0 {
            bail!("max_nsteps must be positive.");
        }
        Ok(())
    }
}

/// Result of the chord search: the end point and its scaled squared error.
struct ChordSearch {
    end: DriverResult,
    err_sq: f64,
}

/// An accepted integration step and the suggested length of the next one.
struct Integration {
    end: DriverResult,
    proposed_step: f64,
}

/// Adaptive step control on top of a [`Stepper`].
///
/// Each advance first shrinks the step until the sagitta is below
/// `delta_chord`. If that step's truncation error is too large the step is
/// redone with error-controlled substeps.
#[derive(Debug, Clone)]
pub struct FieldDriver<S> {
    options: FieldDriverOptions,
    stepper: S,
}

impl<S: Stepper> FieldDriver<S> {
    pub fn new(options: FieldDriverOptions, stepper: S) -> Result<Self> {
        options.validate()?;
        Ok(Self { options, stepper })
    }

    pub fn options(&self) -> &FieldDriverOptions {
        &self.options
    }

    fn find_next_chord(&self, mut step: f64, state: &OdeState) -> ChordSearch {
        let mut remaining = self.options.max_nsteps;
        let result = loop {
            let result = self.stepper.step(step, state);
            let dchord = distance_chord(state, &result.mid_state, &result.end_state);
            remaining -= 1;
            if dchord <= self.options.delta_chord || remaining == 0 {
                break result;
            }
            // Sagitta scales as the square of the step
            step *= (self.options.delta_chord / dchord).sqrt().max(0.5);
        };

        ChordSearch {
            end: DriverResult {
                step,
                state: result.end_state,
            },
            err_sq: self.truncation_error(step, state, &result.err_state),
        }
    }

    fn accurate_advance(&self, step: f64, state: &OdeState, initial: f64) -> DriverResult {
        let mut h = if initial > 0.0 && initial < step {
            initial
        } else {
            step
        };
        let h_threshold = self.options.epsilon_step * step;

        let mut y = *state;
        let mut curve_length = 0.0;
        let mut remaining = self.options.max_nsteps;
        let mut output = loop {
            let output = self.integrate_step(h, &y);
            curve_length += output.end.step;
            remaining -= 1;
            if h < h_threshold || curve_length >= step || remaining == 0 {
                break output;
            }
            y = output.end.state;
            h = output.proposed_step.max(self.options.minimum_step);
            if curve_length + h > step {
                h = step - curve_length;
            }
        };

        output.end.step = curve_length.min(step);
        output.end
    }

    fn integrate_step(&self, step: f64, state: &OdeState) -> Integration {
        if step > self.options.minimum_step {
            return self.one_good_step(step, state);
        }
        let result = self.stepper.step(step, state);
        let err_sq = self.truncation_error(step, state, &result.err_state);
        Integration {
            end: DriverResult {
                step,
                state: result.end_state,
            },
            proposed_step: self.new_step_size(step, err_sq),
        }
    }

    fn one_good_step(&self, mut step: f64, state: &OdeState) -> Integration {
        let mut remaining = self.options.max_nsteps;
        let (result, err_sq) = loop {
            let result = self.stepper.step(step, state);
            let err_sq = self.truncation_error(step, state, &result.err_state);
            remaining -= 1;
            if err_sq <= 1.0 || remaining == 0 {
                break (result, err_sq);
            }
            step = self.new_step_size(step, err_sq);
        };

        Integration {
            end: DriverResult {
                step,
                state: result.end_state,
            },
            proposed_step: self.new_step_size(step, err_sq),
        }
    }

    /// Next step length from the scaled squared error of the current one.
    fn new_step_size(&self, step: f64, err_sq: f64) -> f64 {
        let opts = &self.options;
        let scale = if err_sq > 1.0 {
            (opts.safety * err_sq.powf(0.5 * opts.pshrink)).max(opts.max_stepping_decrease)
        } else if err_sq > opts.errcon * opts.errcon {
            opts.safety * err_sq.powf(0.5 * opts.pgrow)
        } else {
            opts.max_stepping_increase
        };
        scale * step
    }

    /// Squared error relative to `epsilon_rel_max`: position error per unit
    /// step or momentum error per unit momentum, whichever is worse.
    fn truncation_error(&self, step: f64, state: &OdeState, err: &OdeState) -> f64 {
        let eps = self.options.epsilon_rel_max;
        let err_pos_sq = err.pos.norm_squared() / (eps * step).powi(2);
        let err_mom_sq = err.mom.norm_squared() / state.mom.norm_squared() / (eps * eps);
        err_pos_sq.max(err_mom_sq)
    }
}

impl<S: Stepper> Driver for FieldDriver<S> {
    fn advance(&self, step: f64, state: &OdeState) -> DriverResult {
        debug_assert!(step > 0.0);
        if step <= self.options.minimum_step {
            let result = self.stepper.step(step, state);
            return DriverResult {
                step,
                state: result.end_state,
            };
        }

        let mut next = self.find_next_chord(step, state);
        debug_assert!(next.end.step <= step);
        if next.err_sq > 1.0 {
            // Redo the chord-limited step with error control
            next.end = self.accurate_advance(next.end.step, state, 0.5 * next.end.step);
        }
        debug_assert!(next.end.step > 0.0 && next.end.step <= step);
        next.end
    }

    fn minimum_step(&self) -> f64 {
        self.options.minimum_step
    }

    fn delta_intersection(&self) -> f64 {
        self.options.delta_intersection
    }
}
