use crate::field::{
    DormandPrinceStepper, FieldDriver, FieldDriverOptions, FieldPropagator, LinearPropagator,
    MagFieldEquation,
};
use crate::track::{
    ParticleParams, ParticleTrackState, ParticleTrackView, SimTrackState, TrackId,
    TrackInitializer, TrackStatus,
};
use crate::traits::MagneticField;
use anyhow::Result;
use helix_geo::{GeoParams, GeoStateStore, GeoTrackView, Propagation, Real3, ThreadId};
use tracing::{debug, warn};

/// Fixed-capacity store of every per-track state.
pub struct TrackStates {
    geo: GeoStateStore,
    particle: Vec<ParticleTrackState>,
    sim: Vec<SimTrackState>,
}

impl TrackStates {
    pub fn new(geo_params: &GeoParams, num_tracks: usize) -> Self {
        Self {
            geo: GeoStateStore::new(geo_params, num_tracks),
            particle: vec![ParticleTrackState::default(); num_tracks],
            sim: vec![SimTrackState::default(); num_tracks],
        }
    }

    pub fn size(&self) -> usize {
        self.sim.len()
    }

    pub fn sim(&self, thread: ThreadId) -> &SimTrackState {
        &self.sim[thread.get()]
    }

    pub fn particle(&self, thread: ThreadId) -> &ParticleTrackState {
        &self.particle[thread.get()]
    }

    pub fn geo_store(&self) -> &GeoStateStore {
        &self.geo
    }

    pub fn geo_track<'a>(&'a mut self, geo_params: &'a GeoParams, thread: ThreadId) -> GeoTrackView<'a> {
        self.geo.track_mut(geo_params, thread)
    }

    pub fn num_alive(&self) -> usize {
        self.sim
            .iter()
            .filter(|s| s.status == TrackStatus::Alive)
            .count()
    }

    /// Fill empty slots with initializers taken from the back of the queue.
    ///
    /// Tracks that start outside the world are killed immediately. Returns the
    /// number of slots filled.
    pub fn initialize_tracks(
        &mut self,
        geo_params: &GeoParams,
        initializers: &mut Vec<TrackInitializer>,
    ) -> usize {
        let mut count = 0;
        for t in 0..self.size() {
            if self.sim[t].status != TrackStatus::Inactive {
                continue;
            }
            let Some(init) = initializers.pop() else {
                break;
            };
            self.sim[t] = init.sim;
            self.particle[t] = init.particle;

            let mut geo = self.geo.track_mut(geo_params, ThreadId::new(t));
            geo.initialize(&init.geo.pos, &init.geo.dir);
            if geo.is_outside() {
                warn!(
                    track = %init.sim.track_id,
                    pos = ?init.geo.pos,
                    "track started outside the geometry; killing it"
                );
                self.sim[t].status = TrackStatus::Killed;
            }
            count += 1;
        }
        debug!(count, remaining = initializers.len(), "initialized tracks");
        count
    }

    /// Start a secondary in the empty `slot` at the parent's location.
    ///
    /// The geometry state is copied from the parent and only the direction
    /// changes, so the secondary needs no volume search.
    pub fn initialize_secondary(
        &mut self,
        geo_params: &GeoParams,
        parent: ThreadId,
        slot: ThreadId,
        track_id: TrackId,
        particle: ParticleTrackState,
        dir: &Real3,
    ) {
        debug_assert_eq!(self.sim[parent.get()].status, TrackStatus::Alive);
        debug_assert_eq!(self.sim[slot.get()].status, TrackStatus::Inactive);

        self.geo.copy_track(parent, slot);
        self.geo.track_mut(geo_params, slot).set_dir(dir);

        let parent_sim = self.sim[parent.get()];
        self.sim[slot.get()] = SimTrackState {
            track_id,
            parent_id: Some(parent_sim.track_id),
            event_id: parent_sim.event_id,
            num_steps: 0,
            time: parent_sim.time,
            status: TrackStatus::Alive,
        };
        self.particle[slot.get()] = particle;
    }

    /// Take one step of at most `max_step` and cross any boundary reached.
    ///
    /// Neutral particles move in straight lines; charged ones follow the
    /// field. A track that leaves the world is killed.
    pub fn step_track<F: MagneticField>(
        &mut self,
        geo_params: &GeoParams,
        particles: &ParticleParams,
        field: &F,
        options: &FieldDriverOptions,
        thread: ThreadId,
        max_step: f64,
    ) -> Result<Propagation> {
        let t = thread.get();
        debug_assert_eq!(self.sim[t].status, TrackStatus::Alive);

        let particle = ParticleTrackView::new(particles, &self.particle[t]);
        let mut geo = self.geo.track_mut(geo_params, thread);
        let result = if particle.charge() == 0.0 {
            LinearPropagator::new(&mut geo).propagate(max_step)
        } else {
            let equation = MagFieldEquation::new(field, particle.charge());
            let driver = FieldDriver::new(*options, DormandPrinceStepper::new(equation))?;
            FieldPropagator::new(driver, particle.momentum(), &mut geo).propagate(max_step)
        };
        if result.boundary {
            geo.cross_boundary();
        }
        let outside = geo.is_outside();

        let sim = &mut self.sim[t];
        sim.num_steps += 1;
        sim.time += result.distance / particle.speed();
        if outside {
            debug!(track = %sim.track_id, steps = sim.num_steps, "track left the world");
            sim.status = TrackStatus::Killed;
        }
        Ok(result)
    }

    /// Free the slots of killed tracks.
    pub fn clear_killed(&mut self) -> usize {
        let mut count = 0;
        for sim in self.sim.iter_mut().filter(|s| s.status == TrackStatus::Killed) {
            sim.status = TrackStatus::Inactive;
            count += 1;
        }
        count
    }
}
