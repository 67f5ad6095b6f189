//! Per-track state outside the geometry: particle type and energy, simulation
//! bookkeeping, and creation of tracks from primaries and secondaries.

mod particle;
mod primaries;
mod sim;
mod states;

pub use particle::{ParticleId, ParticleInput, ParticleParams, ParticleTrackState, ParticleTrackView, C_LIGHT};
pub use primaries::{process_primaries, GeoInitializer, Primary, TrackInitializer};
pub use sim::{EventId, SimTrackState, TrackId, TrackStatus};
pub use states::TrackStates;
