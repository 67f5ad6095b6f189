//! Structure-of-arrays storage for per-track navigation state.
//!
//! Per-level quantities live in flat arrays indexed by
//! `thread * max_level + level`; each track also owns a slice of scratch
//! space sized for the largest volume in the geometry.

use crate::math::Real3;
use crate::navigator::GeoTrackView;
use crate::params::GeoParams;
use crate::types::{
    BoundaryIntent, FaceIntersection, LevelId, OnSurface, Scratch, Sense, SurfaceId, ThreadId,
    UniverseId, VolumeId,
};
use rayon::prelude::*;

/// Position of a track in the legal navigation sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrackPhase {
    #[default]
    Uninitialized,
    Ready,
    /// A boundary search has been cached.
    Stepped,
    OnBoundary,
}

/// Cached result of the last boundary search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NextSurface {
    pub surface: OnSurface<SurfaceId>,
    pub level: LevelId,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrackScalars {
    pub level: LevelId,
    /// Zero when no search is cached.
    pub next_step: f64,
    pub next_surface: Option<NextSurface>,
    pub phase: TrackPhase,
}

/// Mutable slices of the per-level arrays belonging to one track.
pub(crate) struct LevelSlices<'a> {
    pub vol: &'a mut [VolumeId],
    pub pos: &'a mut [Real3],
    pub dir: &'a mut [Real3],
    pub universe: &'a mut [UniverseId],
    pub surf: &'a mut [Option<SurfaceId>],
    pub sense: &'a mut [Sense],
    pub intent: &'a mut [BoundaryIntent],
}

#[derive(Debug, Clone)]
pub struct GeoStateStore {
    max_level: usize,
    max_faces: usize,
    max_intersections: usize,

    vol: Vec<VolumeId>,
    pos: Vec<Real3>,
    dir: Vec<Real3>,
    universe: Vec<UniverseId>,
    surf: Vec<Option<SurfaceId>>,
    sense: Vec<Sense>,
    intent: Vec<BoundaryIntent>,

    scalars: Vec<TrackScalars>,

    temp_sense: Vec<Sense>,
    temp_isect: Vec<FaceIntersection>,
}

impl GeoStateStore {
    pub fn new(params: &GeoParams, num_tracks: usize) -> Self {
        let scalars = params.scalars();
        let max_level = scalars.max_level.max(1);
        let max_faces = scalars.max_faces.max(1);
        let max_intersections = scalars.max_intersections.max(1);
        let num_levels = num_tracks * max_level;
        Self {
            max_level,
            max_faces,
            max_intersections,
            vol: vec![VolumeId::default(); num_levels],
            pos: vec![Real3::zeros(); num_levels],
            dir: vec![Real3::zeros(); num_levels],
            universe: vec![UniverseId::default(); num_levels],
            surf: vec![None; num_levels],
            sense: vec![Sense::default(); num_levels],
            intent: vec![BoundaryIntent::default(); num_levels],
            scalars: vec![TrackScalars::default(); num_tracks],
            temp_sense: vec![Sense::default(); num_tracks * max_faces],
            temp_isect: vec![FaceIntersection::default(); num_tracks * max_intersections],
        }
    }

    pub fn size(&self) -> usize {
        self.scalars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scalars.is_empty()
    }

    pub fn max_level(&self) -> usize {
        self.max_level
    }

    pub fn phase(&self, thread: ThreadId) -> TrackPhase {
        self.scalars[thread.get()].phase
    }

    /// Navigator view of a single track.
    pub fn track_mut<'a>(&'a mut self, params: &'a GeoParams, thread: ThreadId) -> GeoTrackView<'a> {
        let t = thread.get();
        debug_assert!(t < self.size(), "thread {t} out of range");
        let levels = t * self.max_level..(t + 1) * self.max_level;
        let faces = t * self.max_faces..(t + 1) * self.max_faces;
        let isect = t * self.max_intersections..(t + 1) * self.max_intersections;
        GeoTrackView::new(
            params,
            LevelSlices {
                vol: &mut self.vol[levels.clone()],
                pos: &mut self.pos[levels.clone()],
                dir: &mut self.dir[levels.clone()],
                universe: &mut self.universe[levels.clone()],
                surf: &mut self.surf[levels.clone()],
                sense: &mut self.sense[levels.clone()],
                intent: &mut self.intent[levels],
            },
            &mut self.scalars[t],
            Scratch {
                senses: &mut self.temp_sense[faces],
                intersections: &mut self.temp_isect[isect],
            },
        )
    }

    /// Run `f` on every track in parallel, each with its own disjoint view.
    pub fn par_for_each_track<F>(&mut self, params: &GeoParams, f: F)
    where
        F: Fn(ThreadId, GeoTrackView<'_>) + Sync + Send,
    {
        let l = self.max_level;
        (
            self.vol.par_chunks_mut(l),
            self.pos.par_chunks_mut(l),
            self.dir.par_chunks_mut(l),
            self.universe.par_chunks_mut(l),
            self.surf.par_chunks_mut(l),
            self.sense.par_chunks_mut(l),
            self.intent.par_chunks_mut(l),
            self.scalars.par_iter_mut(),
            self.temp_sense.par_chunks_mut(self.max_faces),
            self.temp_isect.par_chunks_mut(self.max_intersections),
        )
            .into_par_iter()
            .enumerate()
            .for_each(
                |(t, (vol, pos, dir, universe, surf, sense, intent, scalars, senses, isect))| {
                    let view = GeoTrackView::new(
                        params,
                        LevelSlices {
                            vol,
                            pos,
                            dir,
                            universe,
                            surf,
                            sense,
                            intent,
                        },
                        scalars,
                        Scratch {
                            senses,
                            intersections: isect,
                        },
                    );
                    f(ThreadId::new(t), view);
                },
            );
    }

    /// Overwrite the navigation state of `dst` with that of `src`.
    pub fn copy_track(&mut self, src: ThreadId, dst: ThreadId) {
        if src == dst {
            return;
        }
        let l = self.max_level;
        let from = src.get() * l..(src.get() + 1) * l;
        let to = dst.get() * l;
        self.vol.copy_within(from.clone(), to);
        self.pos.copy_within(from.clone(), to);
        self.dir.copy_within(from.clone(), to);
        self.universe.copy_within(from.clone(), to);
        self.surf.copy_within(from.clone(), to);
        self.sense.copy_within(from.clone(), to);
        self.intent.copy_within(from, to);
        self.scalars[dst.get()] = self.scalars[src.get()];
    }
}
