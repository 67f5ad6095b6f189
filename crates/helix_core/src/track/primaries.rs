use crate::track::{
    EventId, ParticleId, ParticleParams, ParticleTrackState, SimTrackState, TrackId, TrackStatus,
};
use anyhow::{bail, Result};
use helix_geo::math::is_soft_unit_vector;
use helix_geo::Real3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A particle supplied by an event generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Primary {
    pub particle_id: ParticleId,
    /// Kinetic energy in MeV.
    pub energy: f64,
    pub position: Real3,
    pub direction: Real3,
    pub time: f64,
    pub event_id: EventId,
    pub track_id: TrackId,
}

/// Starting point of a track in the geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoInitializer {
    pub pos: Real3,
    pub dir: Real3,
}

/// Everything needed to start a track in an empty slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackInitializer {
    pub sim: SimTrackState,
    pub geo: GeoInitializer,
    pub particle: ParticleTrackState,
}

impl TrackInitializer {
    fn from_primary(particles: &ParticleParams, primary: &Primary) -> Result<Self> {
        if !particles.contains(primary.particle_id) {
            bail!(
                "primary track {} has unknown particle id {}.",
                primary.track_id,
                primary.particle_id
            );
        }
        if !(primary.energy > 0.0 && primary.energy.is_finite()) {
            bail!(
                "primary track {} has invalid energy {}.",
                primary.track_id,
                primary.energy
            );
        }
        if !is_soft_unit_vector(&primary.direction) {
            bail!("primary track {} direction is not a unit vector.", primary.track_id);
        }
        if !(primary.time >= 0.0 && primary.time.is_finite()) {
            bail!("primary track {} has invalid time {}.", primary.track_id, primary.time);
        }

        Ok(Self {
            sim: SimTrackState {
                track_id: primary.track_id,
                parent_id: None,
                event_id: primary.event_id,
                num_steps: 0,
                time: primary.time,
                status: TrackStatus::Alive,
            },
            geo: GeoInitializer {
                pos: primary.position,
                dir: primary.direction,
            },
            particle: ParticleTrackState {
                particle_id: primary.particle_id,
                energy: primary.energy,
            },
        })
    }
}

/// Convert primaries into initializers appended in order after the existing
/// ones. Nothing is appended if any primary is invalid.
pub fn process_primaries(
    particles: &ParticleParams,
    primaries: &[Primary],
    initializers: &mut Vec<TrackInitializer>,
) -> Result<()> {
    let converted = primaries
        .par_iter()
        .map(|primary| TrackInitializer::from_primary(particles, primary))
        .collect::<Result<Vec<_>>>()?;

    debug!(count = converted.len(), queued = initializers.len(), "processed primaries");
    initializers.extend(converted);
    Ok(())
}
