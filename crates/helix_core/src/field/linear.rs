use helix_geo::{GeoTrack, Propagation};

/// Moves a track in a straight line, stopping at the next boundary.
pub struct LinearPropagator<'g, G> {
    geo: &'g mut G,
}

impl<'g, G: GeoTrack> LinearPropagator<'g, G> {
    pub fn new(geo: &'g mut G) -> Self {
        Self { geo }
    }

    /// Move up to `dist`.
    pub fn propagate(&mut self, dist: f64) -> Propagation {
        debug_assert!(dist > 0.0);
        let result = self.geo.find_next_step(dist);
        if result.boundary {
            self.geo.move_to_boundary();
        } else {
            self.geo.move_internal(result.distance);
        }
        result
    }

    /// Move to the next boundary, if there is one.
    pub fn propagate_to_boundary(&mut self) -> Propagation {
        let result = self.geo.find_next_step(f64::INFINITY);
        if result.boundary {
            self.geo.move_to_boundary();
        }
        result
    }
}
