//! Multi-level navigation for a single track.
//!
//! A track is described at every nesting level from the root universe down
//! to the deepest daughter containing it. Boundary searches run on all
//! levels, since a straight step may leave an outer cell before reaching any
//! surface of the inner universe. At most one level carries a surface at a
//! time: the level whose boundary the track was moved onto.

use crate::input::LostTrackPolicy;
use crate::math::{is_soft_unit_vector, Real3};
use crate::params::GeoParams;
use crate::state::{LevelSlices, NextSurface, TrackPhase, TrackScalars};
use crate::tracker::Tracker;
use crate::translator::Translator;
use crate::types::{
    BoundaryIntent, LevelId, LocalState, LocalSurfaceId, LocalVolumeId, OnSurface,
    Propagation, Scratch, Sense, SurfaceId, UniverseId, VolumeId,
};
use tracing::warn;

/// Root-level volume reserved for the space outside the world.
pub const EXTERIOR_VOLUME: VolumeId = VolumeId(0);

/// Navigation operations needed to move a track along a straight chord.
pub trait GeoTrack {
    /// Position in the root frame.
    fn pos(&self) -> Real3;
    fn dir(&self) -> Real3;
    fn is_on_boundary(&self) -> bool;
    /// Distance to the nearest boundary, up to `max_step`.
    fn find_next_step(&mut self, max_step: f64) -> Propagation;
    fn move_to_boundary(&mut self);
    fn move_internal(&mut self, step: f64);
    /// Jump to a nearby point in the current volume.
    fn move_internal_to(&mut self, pos: &Real3);
    fn set_dir(&mut self, dir: &Real3);
}

pub struct GeoTrackView<'a> {
    params: &'a GeoParams,
    levels: LevelSlices<'a>,
    scalars: &'a mut TrackScalars,
    scratch: Scratch<'a>,
}

impl<'a> GeoTrackView<'a> {
    pub(crate) fn new(
        params: &'a GeoParams,
        levels: LevelSlices<'a>,
        scalars: &'a mut TrackScalars,
        scratch: Scratch<'a>,
    ) -> Self {
        Self {
            params,
            levels,
            scalars,
            scratch,
        }
    }

    //// ACCESSORS ////

    pub fn level(&self) -> LevelId {
        self.scalars.level
    }

    pub fn phase(&self) -> TrackPhase {
        self.scalars.phase
    }

    pub fn pos(&self) -> Real3 {
        self.levels.pos[0]
    }

    pub fn dir(&self) -> Real3 {
        self.levels.dir[0]
    }

    /// Volume at the deepest level.
    pub fn volume_id(&self) -> VolumeId {
        self.levels.vol[self.scalars.level.get()]
    }

    /// Volume at a given level, if the track reaches that deep.
    pub fn volume_at(&self, level: LevelId) -> Option<VolumeId> {
        (level <= self.scalars.level).then(|| self.levels.vol[level.get()])
    }

    pub fn volume_label(&self) -> &'a str {
        self.params.volume_label(self.volume_id())
    }

    pub fn is_outside(&self) -> bool {
        self.levels.vol[0] == EXTERIOR_VOLUME
    }

    pub fn is_on_boundary(&self) -> bool {
        self.boundary_level().is_some()
    }

    pub fn surface_id(&self) -> Option<SurfaceId> {
        self.boundary_level().and_then(|k| self.levels.surf[k])
    }

    /// Side of the current surface the track is on.
    pub fn sense(&self) -> Option<Sense> {
        self.boundary_level().map(|k| self.levels.sense[k])
    }

    pub fn boundary_intent(&self) -> Option<BoundaryIntent> {
        self.boundary_level().map(|k| self.levels.intent[k])
    }

    pub fn has_next_step(&self) -> bool {
        self.scalars.next_step > 0.0
    }

    pub fn next_step(&self) -> f64 {
        self.scalars.next_step
    }

    /// Outward normal of the current surface in the root frame.
    pub fn normal(&self) -> Option<Real3> {
        let k = self.boundary_level()?;
        let surface = self.levels.surf[k]?;
        Some(self.local_normal(k, surface))
    }

    fn boundary_level(&self) -> Option<usize> {
        (0..=self.scalars.level.get()).find(|&k| self.levels.surf[k].is_some())
    }

    fn tracker(&self, level: usize) -> Tracker<'a> {
        self.params.tracker(self.levels.universe[level])
    }

    fn local_volume(&self, level: usize) -> LocalVolumeId {
        self.params
            .unit_indexer()
            .local_volume(self.levels.vol[level])
            .1
    }

    fn local_surface(&self, surface: SurfaceId) -> LocalSurfaceId {
        self.params.unit_indexer().local_surface(surface).1
    }

    fn local_state(&self, level: usize) -> LocalState {
        LocalState {
            pos: self.levels.pos[level],
            dir: self.levels.dir[level],
            volume: Some(self.local_volume(level)),
            surface: self.levels.surf[level].map(|s| OnSurface {
                id: self.local_surface(s),
                sense: self.levels.sense[level],
            }),
        }
    }

    fn local_normal(&self, level: usize, surface: SurfaceId) -> Real3 {
        self.tracker(level)
            .normal(&self.levels.pos[level], self.local_surface(surface))
    }

    fn is_reentrant(&self) -> bool {
        self.boundary_intent() == Some(BoundaryIntent::Reentrant)
    }

    //// OPERATIONS ////

    /// Locate a point by descending from the root universe.
    ///
    /// A point in no cell leaves the track in the exterior volume.
    pub fn initialize(&mut self, pos: &Real3, dir: &Real3) {
        debug_assert!(is_soft_unit_vector(dir), "direction must be a unit vector");
        self.levels.pos[0] = *pos;
        self.levels.dir[0] = *dir;
        self.levels.universe[0] = UniverseId::new(0);
        if !self.descend(0, false) {
            warn!(
                x = pos.x,
                y = pos.y,
                z = pos.z,
                "Failed to initialize geometry state: point is not in any cell"
            );
            self.make_exterior();
        }
        self.clear_next();
        self.scalars.phase = TrackPhase::Ready;
    }

    /// Fill levels `start..` by initializing in successive daughters. The
    /// position, direction and universe of `start` must already be set.
    /// `entering` marks a descent from a boundary just crossed.
    fn descend(&mut self, start: usize, entering: bool) -> bool {
        let mut level = start;
        loop {
            let universe = self.levels.universe[level];
            let local = LocalState {
                pos: self.levels.pos[level],
                dir: self.levels.dir[level],
                volume: None,
                surface: None,
            };
            let tracker = self.params.tracker(universe);
            let init = if entering {
                tracker.enter(&local, &mut self.scratch)
            } else {
                tracker.initialize(&local, &mut self.scratch)
            };
            let Some(volume) = init.volume else {
                return false;
            };
            let volume = self.params.unit_indexer().global_volume(universe, volume);
            self.set_level(level, volume);

            let Some(daughter) = self.params.daughter(volume) else {
                break;
            };
            debug_assert!(level + 1 < self.levels.vol.len(), "geometry is deeper than its state");
            let translator = Translator::new(daughter.translation);
            self.levels.pos[level + 1] = translator.to_local(&self.levels.pos[level]);
            self.levels.dir[level + 1] = self.levels.dir[level];
            self.levels.universe[level + 1] = daughter.universe;
            level += 1;
        }
        self.scalars.level = LevelId::new(level);
        true
    }

    fn set_level(&mut self, level: usize, volume: VolumeId) {
        self.levels.vol[level] = volume;
        self.levels.surf[level] = None;
        self.levels.sense[level] = Sense::Inside;
        self.levels.intent[level] = BoundaryIntent::Exiting;
    }

    fn make_exterior(&mut self) {
        self.levels.universe[0] = UniverseId::new(0);
        self.set_level(0, EXTERIOR_VOLUME);
        self.scalars.level = LevelId::new(0);
    }

    fn clear_next(&mut self) {
        self.scalars.next_step = 0.0;
        self.scalars.next_surface = None;
    }

    fn clear_surfaces(&mut self) {
        let level = self.scalars.level.get();
        for surf in &mut self.levels.surf[..=level] {
            *surf = None;
        }
    }

    fn advance(&mut self, distance: f64) {
        let level = self.scalars.level.get();
        for k in 0..=level {
            let dir = self.levels.dir[k];
            self.levels.pos[k] += dir * distance;
        }
    }

    /// Search every level for the nearest boundary within `max_step`.
    ///
    /// A track on a boundary that it has turned back from reports a zero
    /// step to that boundary without caching anything.
    pub fn find_next_step(&mut self, max_step: f64) -> Propagation {
        debug_assert!(max_step > 0.0);
        debug_assert_ne!(self.scalars.phase, TrackPhase::Uninitialized);

        if self.is_reentrant() {
            return Propagation {
                distance: 0.0,
                boundary: true,
            };
        }

        if self.scalars.next_step > max_step {
            // Cached boundary lies beyond the new limit
            self.scalars.phase = TrackPhase::Stepped;
            return Propagation {
                distance: max_step,
                boundary: false,
            };
        }
        if self.scalars.next_surface.is_none() && self.scalars.next_step < max_step {
            // Cached search was truncated short of the new limit
            self.clear_next();
        }

        if !self.has_next_step() {
            self.search_levels(max_step);
        }
        self.scalars.phase = TrackPhase::Stepped;
        Propagation {
            distance: self.scalars.next_step,
            boundary: self.scalars.next_surface.is_some(),
        }
    }

    /// Search with no distance limit.
    pub fn find_next_step_unbounded(&mut self) -> Propagation {
        self.find_next_step(f64::INFINITY)
    }

    fn search_levels(&mut self, max_step: f64) {
        let mut best: Option<(f64, OnSurface<LocalSurfaceId>, usize)> = None;
        for k in 0..=self.scalars.level.get() {
            let limit = best.map_or(max_step, |(distance, _, _)| distance);
            let local = self.local_state(k);
            let isect = self.tracker(k).intersect(&local, limit, &mut self.scratch);
            let Some(on) = isect.surface else {
                continue;
            };
            // Strict comparison keeps the outer level on ties
            if best.map_or(true, |(distance, _, _)| isect.distance < distance) {
                best = Some((isect.distance, on, k));
            }
        }

        match best {
            Some((distance, on, k)) => {
                let universe = self.levels.universe[k];
                self.scalars.next_step = distance;
                self.scalars.next_surface = Some(NextSurface {
                    surface: OnSurface {
                        id: self.params.unit_indexer().global_surface(universe, on.id),
                        sense: on.sense,
                    },
                    level: LevelId::new(k),
                });
            }
            None => {
                self.scalars.next_step = max_step;
                self.scalars.next_surface = None;
            }
        }
    }

    /// Move to the boundary found by the last search.
    pub fn move_to_boundary(&mut self) {
        if self.is_reentrant() {
            // Already on the boundary; the crossing will be a no-op
            debug_assert!(self.scalars.next_surface.is_none());
            self.scalars.phase = TrackPhase::OnBoundary;
            return;
        }
        debug_assert_eq!(self.scalars.phase, TrackPhase::Stepped);
        let Some(next) = self.scalars.next_surface else {
            debug_assert!(false, "move_to_boundary requires a cached boundary");
            return;
        };

        self.advance(self.scalars.next_step);
        self.clear_surfaces();
        let k = next.level.get();
        self.levels.surf[k] = Some(next.surface.id);
        self.levels.sense[k] = next.surface.sense;
        self.levels.intent[k] = BoundaryIntent::Exiting;
        self.clear_next();
        self.scalars.phase = TrackPhase::OnBoundary;
    }

    /// Move a distance along the current direction, stopping short of any
    /// boundary.
    pub fn move_internal(&mut self, step: f64) {
        debug_assert_eq!(self.scalars.phase, TrackPhase::Stepped);
        debug_assert!(step > 0.0 && step <= self.scalars.next_step);
        debug_assert!(
            step < self.scalars.next_step || self.scalars.next_surface.is_none(),
            "use move_to_boundary to reach a boundary"
        );

        self.advance(step);
        self.clear_surfaces();
        self.scalars.next_step -= step;
        if self.scalars.next_step <= 0.0 {
            self.clear_next();
        }
        self.scalars.phase = TrackPhase::Ready;
    }

    /// Jump to a nearby point in the current volume.
    ///
    /// The caller guarantees that `pos` lies in the current cell at every
    /// level, e.g. within the safety distance.
    pub fn move_internal_to(&mut self, pos: &Real3) {
        debug_assert_ne!(self.scalars.phase, TrackPhase::Uninitialized);
        self.levels.pos[0] = *pos;
        for k in 1..=self.scalars.level.get() {
            let Some(daughter) = self.params.daughter(self.levels.vol[k - 1]) else {
                debug_assert!(false, "level {k} has no parent daughter");
                break;
            };
            self.levels.pos[k] = Translator::new(daughter.translation).to_local(&self.levels.pos[k - 1]);
        }
        self.clear_surfaces();
        self.clear_next();
        self.scalars.phase = TrackPhase::Ready;
    }

    /// Move into the volume on the other side of the current surface.
    pub fn cross_boundary(&mut self) {
        debug_assert!(
            matches!(
                self.scalars.phase,
                TrackPhase::OnBoundary | TrackPhase::Ready
            ),
            "cross_boundary called in phase {:?}",
            self.scalars.phase
        );
        let Some(k) = self.boundary_level() else {
            debug_assert!(false, "cross_boundary requires a boundary");
            return;
        };
        self.clear_next();
        self.scalars.phase = TrackPhase::Ready;

        if self.levels.intent[k] == BoundaryIntent::Reentrant {
            // Turned back before crossing: stay in the current volume
            self.levels.intent[k] = BoundaryIntent::Exiting;
            return;
        }

        self.scalars.level = LevelId::new(k);
        self.levels.sense[k] = self.levels.sense[k].flip();
        let local = self.local_state(k);
        let init = self.tracker(k).cross_boundary(&local, &mut self.scratch);
        let universe = self.levels.universe[k];
        let Some(volume) = init.volume else {
            self.lost(k);
            return;
        };

        let volume = self.params.unit_indexer().global_volume(universe, volume);
        self.levels.vol[k] = volume;
        self.levels.intent[k] = BoundaryIntent::Exiting;
        if let Some(daughter) = self.params.daughter(volume) {
            let next = k + 1;
            self.levels.pos[next] = Translator::new(daughter.translation).to_local(&self.levels.pos[k]);
            self.levels.dir[next] = self.levels.dir[k];
            self.levels.universe[next] = daughter.universe;
            if !self.descend(next, true) {
                self.lost(k);
            }
        }
    }

    fn lost(&mut self, level: usize) {
        let pos = self.levels.pos[0];
        let surface = self.levels.surf[level]
            .map(|s| self.params.surface_label(s))
            .unwrap_or("<none>");
        let volume = self.params.volume_label(self.levels.vol[level]);
        match self.params.options().lost_track_policy {
            LostTrackPolicy::Abort => panic!(
                "Track lost crossing surface '{surface}' from volume '{volume}' at ({}, {}, {})",
                pos.x, pos.y, pos.z
            ),
            LostTrackPolicy::Exterior => {
                warn!(
                    surface,
                    volume,
                    x = pos.x,
                    y = pos.y,
                    z = pos.z,
                    "Track lost crossing a boundary; moving it to the exterior"
                );
                self.make_exterior();
            }
        }
    }

    /// Change direction, latching whether a pending crossing is undone.
    pub fn set_dir(&mut self, dir: &Real3) {
        debug_assert!(is_soft_unit_vector(dir), "direction must be a unit vector");
        debug_assert_ne!(self.scalars.phase, TrackPhase::Uninitialized);

        if let Some(k) = self.boundary_level() {
            if let Some(surface) = self.levels.surf[k] {
                let normal = self.local_normal(k, surface);
                let was_outward = normal.dot(&self.levels.dir[k]) >= 0.0;
                let is_outward = normal.dot(dir) >= 0.0;
                if was_outward != is_outward {
                    self.levels.intent[k] = self.levels.intent[k].flip();
                }
            }
        }
        for k in 0..=self.scalars.level.get() {
            self.levels.dir[k] = *dir;
        }
        self.clear_next();
        self.scalars.phase = TrackPhase::Ready;
    }

    /// Radius of a sphere around the track that is free of boundaries at
    /// every level.
    pub fn find_safety(&self) -> f64 {
        if self.is_on_boundary() {
            return 0.0;
        }
        (0..=self.scalars.level.get())
            .map(|k| {
                self.tracker(k)
                    .safety(&self.levels.pos[k], self.local_volume(k))
            })
            .fold(f64::INFINITY, f64::min)
    }
}

impl GeoTrack for GeoTrackView<'_> {
    fn pos(&self) -> Real3 {
        GeoTrackView::pos(self)
    }

    fn dir(&self) -> Real3 {
        GeoTrackView::dir(self)
    }

    fn is_on_boundary(&self) -> bool {
        GeoTrackView::is_on_boundary(self)
    }

    fn find_next_step(&mut self, max_step: f64) -> Propagation {
        GeoTrackView::find_next_step(self, max_step)
    }

    fn move_to_boundary(&mut self) {
        GeoTrackView::move_to_boundary(self)
    }

    fn move_internal(&mut self, step: f64) {
        GeoTrackView::move_internal(self, step)
    }

    fn move_internal_to(&mut self, pos: &Real3) {
        GeoTrackView::move_internal_to(self, pos)
    }

    fn set_dir(&mut self, dir: &Real3) {
        GeoTrackView::set_dir(self, dir)
    }
}
