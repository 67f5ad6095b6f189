use crate::field::{calc_miss_distance, is_intercept_close, make_chord, OdeState};
use crate::traits::Driver;
use helix_geo::math::{make_unit_vector, soft_zero};
use helix_geo::{GeoTrack, Propagation};
use tracing::trace;

/// Upper bound on curved substeps per propagation.
pub const MAX_SUBSTEPS: u32 = 128;

/// Moves a charged track along a curved trajectory, stopping at the first
/// boundary the trajectory crosses.
///
/// Each substep is integrated by the driver and the chord between its ends is
/// intersected with the geometry. A substep whose chord hits a boundary is
/// shortened in proportion to the hit distance until the intercept lies within
/// `delta_intersection` of the curve. The geometry track always sits at the
/// current integrated position between substeps.
pub struct FieldPropagator<'g, D, G> {
    driver: D,
    geo: &'g mut G,
    state: OdeState,
}

impl<'g, D: Driver, G: GeoTrack> FieldPropagator<'g, D, G> {
    /// Start from the geometry's position and direction with momentum
    /// magnitude `momentum` in MeV/c.
    pub fn new(driver: D, momentum: f64, geo: &'g mut G) -> Self {
        debug_assert!(momentum > 0.0);
        let state = OdeState::new(geo.pos(), geo.dir() * momentum);
        Self { driver, geo, state }
    }

    /// Distance to move when no progress is possible.
    pub fn bump_distance(&self) -> f64 {
        self.driver.minimum_step()
    }

    /// Current position and momentum.
    pub fn state(&self) -> &OdeState {
        &self.state
    }

    /// Propagate up to a curved length `step`.
    pub fn propagate(&mut self, step: f64) -> Propagation {
        debug_assert!(step > 0.0);

        let mut result = Propagation {
            distance: 0.0,
            boundary: self.geo.is_on_boundary(),
        };
        let mut remaining = step;
        let mut substeps_left = MAX_SUBSTEPS;

        loop {
            debug_assert!(soft_zero((self.state.pos - self.geo.pos()).norm()));
            debug_assert_eq!(result.boundary, self.geo.is_on_boundary());

            let substep = self.driver.advance(remaining, &self.state);
            debug_assert!(substep.step > 0.0 && substep.step <= remaining);

            let chord = make_chord(&self.state.pos, &substep.state.pos);
            self.geo.set_dir(&chord.dir);
            let linear = self
                .geo
                .find_next_step(chord.length + self.driver.delta_intersection());

            if !linear.boundary {
                // No boundary along the chord: commit the substep
                self.state = substep.state;
                result.boundary = false;
                result.distance += substep.step.min(remaining);
                remaining = step - result.distance;
                self.geo.move_internal_to(&self.state.pos);
                substeps_left -= 1;
            } else if result.boundary && linear.distance < self.bump_distance() {
                // Probably turning back into the volume just left
                trace!(distance = linear.distance, "halving substep near boundary");
                remaining = 0.5 * substep.step;
            } else if substep.step * linear.distance
                <= self.driver.minimum_step() * chord.length
            {
                // Next trial step would be below the minimum: hop to the boundary
                result.boundary = true;
                result.distance += linear.distance.min(remaining);
                self.state.mom = substep.state.mom;
                remaining = 0.0;
            } else if is_intercept_close(
                &self.state.pos,
                &chord.dir,
                linear.distance,
                &substep.state.pos,
                self.driver.delta_intersection(),
            ) {
                // Intercept is close enough to the curve to count as the crossing
                let miss = calc_miss_distance(
                    &self.state.pos,
                    &chord.dir,
                    linear.distance,
                    &substep.state.pos,
                );
                debug_assert!(miss >= 0.0 && miss < substep.step);
                result.distance += substep.step - miss;
                self.state.mom = substep.state.mom;
                result.boundary = true;
                remaining = 0.0;
            } else {
                // Shrink toward the intercept and retry
                remaining = substep.step * linear.distance / chord.length;
            }

            if !(remaining >= self.driver.minimum_step() && substeps_left > 0) {
                break;
            }
        }

        if result.distance > 0.0 {
            if result.boundary {
                self.geo.move_to_boundary();
                self.state.pos = self.geo.pos();
            } else if substeps_left > 0 {
                // Remainder is below the minimum step: charge it without moving
                result.distance = (result.distance + remaining).min(step);
            }
        }

        let dir = make_unit_vector(&self.state.mom);
        self.geo.set_dir(&dir);

        if result.distance == 0.0 {
            // No progress was made: bump forward
            result.distance = self.bump_distance().min(step);
            result.boundary = false;
            self.state.pos += dir * result.distance;
            self.geo.move_internal_to(&self.state.pos);
            trace!(distance = result.distance, "bumped stuck track");
        }

        debug_assert!(result.distance > 0.0 && result.distance <= step);
        debug_assert_eq!(result.boundary, self.geo.is_on_boundary());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{
        DormandPrinceStepper, FieldDriver, FieldDriverOptions, LinearPropagator, MagFieldEquation,
        UniformField, LORENTZ_COEFFICIENT,
    };
    use helix_geo::{GeoParams, GeoStateStore, Real3, ThreadId};

    const BOX: &str = r#"{
        "universes": [{"type": "simple", "label": "world",
            "surfaces": [
                {"type": "px", "data": [-10.0]}, {"type": "px", "data": [10.0]},
                {"type": "py", "data": [-10.0]}, {"type": "py", "data": [10.0]},
                {"type": "pz", "data": [-10.0]}, {"type": "pz", "data": [10.0]}
            ],
            "volumes": [
                {"label": "[OUTSIDE]", "logic": "0 ~ 1 & 2 ~ & 3 & 4 ~ & 5 & ~"},
                {"label": "inside", "logic": "0 ~ 1 & 2 ~ & 3 & 4 ~ & 5 &"}
            ]}]
    }"#;

    type UniformDriver = FieldDriver<DormandPrinceStepper<MagFieldEquation<UniformField>>>;

    fn driver(field: Real3, charge: f64) -> UniformDriver {
        driver_with(FieldDriverOptions::default(), field, charge)
    }

    fn driver_with(options: FieldDriverOptions, field: Real3, charge: f64) -> UniformDriver {
        let equation = MagFieldEquation::new(UniformField::new(field), charge);
        FieldDriver::new(options, DormandPrinceStepper::new(equation)).unwrap()
    }

    #[test]
    fn half_circle_in_uniform_field() {
        let params = GeoParams::from_json(BOX).unwrap();
        let mut store = GeoStateStore::new(&params, 1);
        let mut geo = store.track_mut(&params, ThreadId(0));
        geo.initialize(&Real3::zeros(), &Real3::new(1.0, 0.0, 0.0));

        // Radius 1 cm counterclockwise about (0, 1, 0)
        let radius = 1.0;
        let momentum = LORENTZ_COEFFICIENT * radius;
        let mut propagator =
            FieldPropagator::new(driver(Real3::new(0.0, 0.0, 1.0), -1.0), momentum, &mut geo);
        let step = std::f64::consts::PI * radius;
        let result = propagator.propagate(step);

        assert!(!result.boundary);
        assert!(result.distance <= step);
        assert!((result.distance - step).abs() < 1e-10);
        let state = *propagator.state();
        assert!((state.pos - Real3::new(0.0, 2.0 * radius, 0.0)).norm() < 1e-3);
        assert!((state.mom.norm() - momentum).abs() < 1e-5 * momentum);
        assert!((geo.pos() - state.pos).norm() < 1e-12);
        assert!((geo.dir() - Real3::new(-1.0, 0.0, 0.0)).norm() < 1e-3);
    }

    #[test]
    fn straight_track_stops_at_the_wall() {
        let params = GeoParams::from_json(BOX).unwrap();
        let mut store = GeoStateStore::new(&params, 1);
        let mut geo = store.track_mut(&params, ThreadId(0));
        geo.initialize(&Real3::new(1.0, 2.0, 3.0), &Real3::new(0.0, 1.0, 0.0));

        let mut propagator = FieldPropagator::new(driver(Real3::zeros(), 1.0), 5.0, &mut geo);
        let result = propagator.propagate(100.0);
        assert!(result.boundary);
        assert!((result.distance - 8.0).abs() < 1e-6);
        assert!(geo.is_on_boundary());
        assert!((geo.pos() - Real3::new(1.0, 10.0, 3.0)).norm() < 1e-12);
    }

    #[test]
    fn curved_track_finds_the_wall() {
        let params = GeoParams::from_json(BOX).unwrap();
        let mut store = GeoStateStore::new(&params, 1);
        let mut geo = store.track_mut(&params, ThreadId(0));
        geo.initialize(&Real3::new(0.0, 9.0, 0.0), &Real3::new(0.0, 1.0, 0.0));

        // Radius 5 cm bending toward -x: the wall y = 10 is hit after an arc
        // of 5 * asin(1/5)
        let momentum = LORENTZ_COEFFICIENT * 5.0;
        let mut propagator =
            FieldPropagator::new(driver(Real3::new(0.0, 0.0, 1.0), -1.0), momentum, &mut geo);
        let result = propagator.propagate(10.0);
        assert!(result.boundary);
        let expected = 5.0 * (0.2f64).asin();
        assert!((result.distance - expected).abs() < 1e-4);
        assert!((geo.pos().y - 10.0).abs() < 1e-12);
        assert!(geo.is_on_boundary());
        // Still heading out of the box
        assert!(geo.dir().y > 0.0);
    }

    #[test]
    fn turning_back_on_a_boundary_bumps_the_track() {
        let params = GeoParams::from_json(BOX).unwrap();
        let mut store = GeoStateStore::new(&params, 1);
        let mut geo = store.track_mut(&params, ThreadId(0));
        geo.initialize(&Real3::zeros(), &Real3::new(1.0, 0.0, 0.0));
        let to_wall = LinearPropagator::new(&mut geo).propagate(20.0);
        assert!(to_wall.boundary);
        geo.set_dir(&Real3::new(-1.0, 0.0, 0.0));

        let mut propagator = FieldPropagator::new(driver(Real3::zeros(), 1.0), 1.0, &mut geo);
        let bump = propagator.propagate(1.0);
        assert!(!bump.boundary);
        assert_eq!(bump.distance, FieldDriverOptions::default().minimum_step);
        let after = propagator.propagate(5.0);
        assert!(!after.boundary);
        assert!((after.distance - 5.0).abs() < 1e-12);

        assert!(!geo.is_on_boundary());
        assert_eq!(geo.volume_label(), "inside");
        assert!((geo.pos().x - (5.0 - 1e-5)).abs() < 1e-9);
    }

    #[test]
    fn nearby_wall_is_reached_in_one_hop() {
        let params = GeoParams::from_json(BOX).unwrap();
        let mut store = GeoStateStore::new(&params, 1);
        let mut geo = store.track_mut(&params, ThreadId(0));
        geo.initialize(&Real3::new(0.0, 10.0 - 1e-7, 0.0), &Real3::new(0.0, 1.0, 0.0));

        // Radius 5 cm: the first substep is about 1 cm long, so the wall
        // lies far below a minimum step along its chord
        let momentum = LORENTZ_COEFFICIENT * 5.0;
        let mut propagator =
            FieldPropagator::new(driver(Real3::new(0.0, 0.0, 1.0), -1.0), momentum, &mut geo);
        let result = propagator.propagate(2.0);
        assert!(result.boundary);
        assert!(result.distance > 1e-7 && result.distance < 1.1e-7, "{}", result.distance);
        let mom = propagator.state().mom;
        assert!((mom.norm() - momentum).abs() < 1e-6 * momentum);

        assert!(geo.is_on_boundary());
        assert!((geo.pos().y - 10.0).abs() < 1e-12);
        // Momentum is taken from the end of the whole substep
        assert!(geo.dir().x < -0.05, "{:?}", geo.dir());
        assert!(geo.dir().y > 0.0);
    }

    #[test]
    fn running_out_of_substeps_stops_short() {
        let params = GeoParams::from_json(BOX).unwrap();
        let mut store = GeoStateStore::new(&params, 1);
        let mut geo = store.track_mut(&params, ThreadId(0));
        geo.initialize(&Real3::zeros(), &Real3::new(1.0, 0.0, 0.0));

        // Sagitta limit keeps each substep near 2 * acos(1 - 1e-4) cm
        let options = FieldDriverOptions {
            delta_chord: 1e-4,
            ..FieldDriverOptions::default()
        };
        let max_substep = 2.0 * (1.0 - options.delta_chord).acos();
        let momentum = LORENTZ_COEFFICIENT;
        let field = Real3::new(0.0, 0.0, 1.0);
        let mut propagator =
            FieldPropagator::new(driver_with(options, field, -1.0), momentum, &mut geo);
        let step = 5.0;
        let result = propagator.propagate(step);

        assert!(!result.boundary);
        assert!(result.distance > 0.0);
        assert!(result.distance <= MAX_SUBSTEPS as f64 * max_substep * (1.0 + 1e-6));
        assert!(result.distance < step);

        // The reported length is the arc actually travelled on the unit circle
        let state = *propagator.state();
        let arc = result.distance;
        let expected = Real3::new(arc.sin(), 1.0 - arc.cos(), 0.0);
        assert!((state.pos - expected).norm() < 1e-6, "{:?}", state.pos);
        assert!((state.mom.norm() - momentum).abs() < 1e-7 * momentum);
        assert!(!geo.is_on_boundary());
        assert!((geo.pos() - state.pos).norm() < 1e-12);
    }
}
