//! Per-universe trackers.
//!
//! Each universe kind answers the same five queries in its own frame. The
//! navigator picks the kind with a `match` on the universe type rather than
//! through a trait object.

mod rect_array;
mod simple_unit;

pub use rect_array::RectArrayTracker;
pub use simple_unit::{SimpleUnitTracker, ZERO_CROSSING_DISTANCE};

use crate::math::Real3;
use crate::types::{
    Initialization, Intersection, LocalState, LocalSurfaceId, LocalVolumeId, Scratch,
};

pub enum Tracker<'a> {
    Simple(SimpleUnitTracker<'a>),
    RectArray(RectArrayTracker<'a>),
}

impl<'a> Tracker<'a> {
    /// Find the local volume containing a point.
    pub fn initialize(&self, state: &LocalState, scratch: &mut Scratch<'_>) -> Initialization {
        match self {
            Tracker::Simple(t) => t.initialize(state, scratch),
            Tracker::RectArray(t) => t.initialize(state),
        }
    }

    /// Find the local volume entered by a track sitting on its parent cell's
    /// boundary. Points on a grid plane are resolved by direction.
    pub fn enter(&self, state: &LocalState, scratch: &mut Scratch<'_>) -> Initialization {
        match self {
            Tracker::Simple(t) => t.initialize(state, scratch),
            Tracker::RectArray(t) => t.enter(state),
        }
    }

    /// Find the volume on the other side of `state.surface`, whose sense has
    /// already been flipped.
    pub fn cross_boundary(&self, state: &LocalState, scratch: &mut Scratch<'_>) -> Initialization {
        match self {
            Tracker::Simple(t) => t.cross_boundary(state, scratch),
            Tracker::RectArray(t) => t.cross_boundary(state),
        }
    }

    /// Nearest exiting crossing of the current volume within `max_dist`.
    pub fn intersect(
        &self,
        state: &LocalState,
        max_dist: f64,
        scratch: &mut Scratch<'_>,
    ) -> Intersection {
        match self {
            Tracker::Simple(t) => t.intersect(state, max_dist, scratch),
            Tracker::RectArray(t) => t.intersect(state, max_dist),
        }
    }

    /// Lower bound on the distance to the volume's boundary.
    pub fn safety(&self, pos: &Real3, volume: LocalVolumeId) -> f64 {
        match self {
            Tracker::Simple(t) => t.safety(pos, volume),
            Tracker::RectArray(t) => t.safety(pos, volume),
        }
    }

    pub fn normal(&self, pos: &Real3, surface: LocalSurfaceId) -> Real3 {
        match self {
            Tracker::Simple(t) => t.normal(pos, surface),
            Tracker::RectArray(t) => t.normal(surface),
        }
    }
}
