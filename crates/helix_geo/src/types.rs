//! Identifiers and small value types shared by the trackers and navigator.

use crate::math::Real3;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Define a strongly typed integer index.
///
/// "Null" ids are expressed as `Option<Id>` rather than a sentinel value.
#[macro_export]
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            Default,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            pub fn new(index: usize) -> Self {
                debug_assert!(index <= u32::MAX as usize);
                Self(index as u32)
            }

            pub fn get(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Global volume index; volume 0 of the root universe is the exterior.
    VolumeId
);
define_id!(
    /// Global surface index.
    SurfaceId
);
define_id!(UniverseId);
define_id!(
    /// Volume index within a single universe.
    LocalVolumeId
);
define_id!(
    /// Surface index within a single universe.
    LocalSurfaceId
);
define_id!(
    /// Index of a surface within a volume's face list.
    FaceId
);
define_id!(DaughterId);
define_id!(
    /// Nesting depth; 0 is the outermost universe.
    LevelId
);
define_id!(
    /// Slot of a track in the state arrays.
    ThreadId
);

/// Side of a surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sense {
    #[default]
    Inside,
    Outside,
}

impl Sense {
    pub fn from_inside(inside: bool) -> Self {
        if inside {
            Sense::Inside
        } else {
            Sense::Outside
        }
    }

    pub fn is_inside(self) -> bool {
        self == Sense::Inside
    }

    pub fn flip(self) -> Self {
        match self {
            Sense::Inside => Sense::Outside,
            Sense::Outside => Sense::Inside,
        }
    }
}

/// Sense of a point evaluated without knowing whether it is logically on
/// the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignedSense {
    Inside,
    On,
    Outside,
}

impl SignedSense {
    pub fn from_value(value: f64) -> Self {
        if value < 0.0 {
            SignedSense::Inside
        } else if value > 0.0 {
            SignedSense::Outside
        } else {
            SignedSense::On
        }
    }

    /// Points exactly on a surface count as inside it.
    pub fn to_sense(self) -> Sense {
        match self {
            SignedSense::Inside | SignedSense::On => Sense::Inside,
            SignedSense::Outside => Sense::Outside,
        }
    }
}

/// Latched decision about a pending boundary crossing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundaryIntent {
    #[default]
    Exiting,
    Reentrant,
}

impl BoundaryIntent {
    pub fn flip(self) -> Self {
        match self {
            BoundaryIntent::Exiting => BoundaryIntent::Reentrant,
            BoundaryIntent::Reentrant => BoundaryIntent::Exiting,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// The two axes perpendicular to this one, in cyclic order.
    pub fn perpendicular(self) -> (usize, usize) {
        match self {
            Axis::X => (1, 2),
            Axis::Y => (2, 0),
            Axis::Z => (0, 1),
        }
    }

    pub fn unit_vector(self) -> Real3 {
        let mut result = Real3::zeros();
        result[self.index()] = 1.0;
        result
    }
}

/// Half-open range of indices into one of the flat parameter arrays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemRange {
    start: u32,
    stop: u32,
}

impl ItemRange {
    pub fn new(start: usize, stop: usize) -> Self {
        debug_assert!(start <= stop);
        Self {
            start: start as u32,
            stop: stop as u32,
        }
    }

    pub fn start(&self) -> usize {
        self.start as usize
    }

    pub fn len(&self) -> usize {
        (self.stop - self.start) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.stop
    }

    pub fn range(&self) -> Range<usize> {
        self.start as usize..self.stop as usize
    }
}

/// A surface together with the side of it the track is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnSurface<S> {
    pub id: S,
    pub sense: Sense,
}

/// Result of a straight-line boundary search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Propagation {
    pub distance: f64,
    pub boundary: bool,
}

/// Result of locating a point within a single universe.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Initialization {
    pub volume: Option<LocalVolumeId>,
    pub surface: Option<OnSurface<LocalSurfaceId>>,
}

/// Nearest exiting face of a volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    pub distance: f64,
    /// Surface hit and the sense *before* crossing it; `None` if no surface
    /// lies within the search distance.
    pub surface: Option<OnSurface<LocalSurfaceId>>,
}

impl Intersection {
    pub fn miss(max_dist: f64) -> Self {
        Self {
            distance: max_dist,
            surface: None,
        }
    }

    pub fn is_hit(&self) -> bool {
        self.surface.is_some()
    }
}

/// Track state expressed in a single universe's frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalState {
    pub pos: Real3,
    pub dir: Real3,
    pub volume: Option<LocalVolumeId>,
    pub surface: Option<OnSurface<LocalSurfaceId>>,
}

/// Candidate face crossing used by complex-cell intersection.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FaceIntersection {
    pub distance: f64,
    pub face: FaceId,
}

/// Per-track scratch space handed to a tracker for one query.
pub struct Scratch<'s> {
    pub senses: &'s mut [Sense],
    pub intersections: &'s mut [FaceIntersection],
}

impl<'s> Scratch<'s> {
    pub fn reborrow(&mut self) -> Scratch<'_> {
        Scratch {
            senses: &mut *self.senses,
            intersections: &mut *self.intersections,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_sense_on_surface_counts_as_inside() {
        assert_eq!(SignedSense::from_value(0.0).to_sense(), Sense::Inside);
        assert_eq!(SignedSense::from_value(-1.0), SignedSense::Inside);
        assert_eq!(SignedSense::from_value(2.0).to_sense(), Sense::Outside);
    }

    #[test]
    fn ids_round_trip_through_serde() {
        let id = VolumeId::new(42);
        let text = serde_json::to_string(&id).expect("id should serialize");
        assert_eq!(text, "42");
        let back: VolumeId = serde_json::from_str(&text).expect("id should deserialize");
        assert_eq!(back, id);
        assert_eq!(back.get(), 42);
    }

    #[test]
    fn axis_perpendicular_is_cyclic() {
        assert_eq!(Axis::X.perpendicular(), (1, 2));
        assert_eq!(Axis::Y.perpendicular(), (2, 0));
        assert_eq!(Axis::Z.unit_vector(), Real3::new(0.0, 0.0, 1.0));
    }
}
