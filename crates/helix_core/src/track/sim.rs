use serde::{Deserialize, Serialize};

helix_geo::define_id!(TrackId);
helix_geo::define_id!(EventId);

/// Lifecycle of a track slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackStatus {
    /// Slot is empty and may receive a new track.
    #[default]
    Inactive,
    Alive,
    Killed,
}

/// Simulation bookkeeping for one track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SimTrackState {
    pub track_id: TrackId,
    /// `None` for primaries.
    pub parent_id: Option<TrackId>,
    pub event_id: EventId,
    pub num_steps: u32,
    /// Lab time in ns.
    pub time: f64,
    pub status: TrackStatus,
}
