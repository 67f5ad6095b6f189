use crate::logic;
use crate::math::Real3;
use crate::params::{GeoParams, SimpleUnitRecord, VolumeRecord};
use crate::surfaces::Surface;
use crate::types::{
    FaceId, FaceIntersection, Initialization, Intersection, LocalState, LocalSurfaceId,
    LocalVolumeId, OnSurface, Scratch, Sense, SignedSense, SurfaceId,
};

/// Distance reported for a surface the track sits exactly on and is leaving.
pub const ZERO_CROSSING_DISTANCE: f64 = 1e-13;

/// Tracker for cells bounded by CSG combinations of quadric surfaces.
pub struct SimpleUnitTracker<'a> {
    params: &'a GeoParams,
    unit: &'a SimpleUnitRecord,
}

impl<'a> SimpleUnitTracker<'a> {
    pub fn new(params: &'a GeoParams, unit: &'a SimpleUnitRecord) -> Self {
        Self { params, unit }
    }

    pub fn num_volumes(&self) -> usize {
        self.unit.volumes.len()
    }

    fn global_surface(&self, surface: LocalSurfaceId) -> SurfaceId {
        SurfaceId::new(self.unit.surfaces.start() + surface.get())
    }

    fn surface(&self, surface: LocalSurfaceId) -> &'a Surface {
        self.params.surface(self.global_surface(surface))
    }

    fn record(&self, volume: LocalVolumeId) -> &'a VolumeRecord {
        self.params.volume_record(self.unit, volume)
    }

    pub fn initialize(&self, state: &LocalState, scratch: &mut Scratch<'_>) -> Initialization {
        (0..self.num_volumes())
            .map(LocalVolumeId::new)
            .find(|&volume| self.is_inside(volume, &state.pos, None, scratch.senses))
            .map(|volume| Initialization {
                volume: Some(volume),
                surface: None,
            })
            .unwrap_or_default()
    }

    pub fn cross_boundary(&self, state: &LocalState, scratch: &mut Scratch<'_>) -> Initialization {
        let Some(on) = state.surface else {
            debug_assert!(false, "cross_boundary requires a current surface");
            return Initialization::default();
        };
        let volume = self
            .params
            .connectivity(self.global_surface(on.id))
            .iter()
            .copied()
            .filter(|&v| Some(v) != state.volume)
            .find(|&v| self.is_inside(v, &state.pos, Some(on), scratch.senses));
        Initialization {
            volume,
            surface: Some(on),
        }
    }

    pub fn intersect(
        &self,
        state: &LocalState,
        max_dist: f64,
        scratch: &mut Scratch<'_>,
    ) -> Intersection {
        debug_assert!(max_dist > 0.0);
        let Some(volume) = state.volume else {
            debug_assert!(false, "intersect requires a volume");
            return Intersection::miss(max_dist);
        };
        let record = self.record(volume);
        if record.is_conjunction {
            self.intersect_simple(record, state, max_dist)
        } else {
            self.intersect_complex(record, state, max_dist, scratch)
        }
    }

    /// Nearest face crossing; valid when every face crossing exits the cell.
    fn intersect_simple(
        &self,
        record: &VolumeRecord,
        state: &LocalState,
        max_dist: f64,
    ) -> Intersection {
        let mut result = Intersection::miss(max_dist);
        let mut nearest = f64::INFINITY;
        for &face in self.params.faces(record.faces) {
            let (distances, sense) = self.face_crossings(face, state);
            // Faces are sorted, so strict comparison favors lower ids on ties
            if distances[0] < nearest {
                nearest = distances[0];
                if nearest <= max_dist {
                    result = Intersection {
                        distance: nearest,
                        surface: Some(OnSurface { id: face, sense }),
                    };
                }
            }
        }
        result
    }

    /// Walk crossings in order, flipping senses until the cell logic fails.
    fn intersect_complex(
        &self,
        record: &VolumeRecord,
        state: &LocalState,
        max_dist: f64,
        scratch: &mut Scratch<'_>,
    ) -> Intersection {
        let faces = self.params.faces(record.faces);
        let senses = &mut scratch.senses[..faces.len()];
        let mut count = 0;
        for (i, &face) in faces.iter().enumerate() {
            let (distances, sense) = self.face_crossings(face, state);
            senses[i] = sense;
            for distance in distances {
                if distance <= max_dist && distance.is_finite() {
                    scratch.intersections[count] = FaceIntersection {
                        distance,
                        face: FaceId::new(i),
                    };
                    count += 1;
                }
            }
        }

        let candidates = &mut scratch.intersections[..count];
        candidates.sort_unstable_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.face.cmp(&b.face))
        });

        let logic = self.params.logic(record.logic);
        for candidate in candidates.iter() {
            let face = candidate.face.get();
            let before = senses[face];
            senses[face] = before.flip();
            if !logic::evaluate(logic, senses) {
                return Intersection {
                    distance: candidate.distance,
                    surface: Some(OnSurface {
                        id: faces[face],
                        sense: before,
                    }),
                };
            }
        }
        Intersection::miss(max_dist)
    }

    /// Positive crossing distances of one face and the track's sense
    /// relative to it.
    fn face_crossings(&self, face: LocalSurfaceId, state: &LocalState) -> ([f64; 2], Sense) {
        let surface = self.surface(face);
        if let Some(on) = state.surface.filter(|s| s.id == face) {
            return (
                surface.calc_intersections(&state.pos, &state.dir, true),
                on.sense,
            );
        }
        match surface.calc_sense(&state.pos) {
            SignedSense::On => {
                let other = surface.calc_intersections(&state.pos, &state.dir, true);
                if surface.gradient(&state.pos).dot(&state.dir) > 0.0 {
                    // Leaving the inside of a surface the point lies exactly on
                    ([ZERO_CROSSING_DISTANCE, other[0]], Sense::Inside)
                } else {
                    (other, Sense::Inside)
                }
            }
            signed => (
                surface.calc_intersections(&state.pos, &state.dir, false),
                signed.to_sense(),
            ),
        }
    }

    fn is_inside(
        &self,
        volume: LocalVolumeId,
        pos: &Real3,
        on_surface: Option<OnSurface<LocalSurfaceId>>,
        senses: &mut [Sense],
    ) -> bool {
        let record = self.record(volume);
        let faces = self.params.faces(record.faces);
        let senses = &mut senses[..faces.len()];
        for (sense, &face) in senses.iter_mut().zip(faces) {
            *sense = match on_surface {
                Some(on) if on.id == face => on.sense,
                _ => self.surface(face).calc_sense(pos).to_sense(),
            };
        }
        logic::evaluate(self.params.logic(record.logic), senses)
    }

    pub fn safety(&self, pos: &Real3, volume: LocalVolumeId) -> f64 {
        let record = self.record(volume);
        let mut result = f64::INFINITY;
        for &face in self.params.faces(record.faces) {
            match self.surface(face).safety_distance(pos) {
                Some(distance) => result = result.min(distance),
                // No cheap bound for this surface type
                None => return 0.0,
            }
        }
        result
    }

    pub fn normal(&self, pos: &Real3, surface: LocalSurfaceId) -> Real3 {
        self.surface(surface).calc_normal(pos)
    }
}
