pub mod error;
pub mod input;
pub mod logic;
pub mod math;
/// The `helix_geo` crate provides a multi-level constructive solid geometry
/// navigator for particle transport.
///
/// Key components:
/// - **Surfaces**: quadric primitives with sense, intersection, normal and safety queries.
/// - **Trackers**: per-universe queries for CSG "simple units" and rectilinear grids.
/// - **Params**: immutable flat tables built from a JSON geometry description.
/// - **Navigator**: the per-track state machine that walks nested universes.
pub mod navigator;
pub mod params;
pub mod state;
pub mod surfaces;
pub mod tracker;
pub mod translator;
pub mod types;
pub mod unit_indexer;

pub use error::GeoError;
pub use input::{GeoInput, GeoOptions, LostTrackPolicy};
pub use math::Real3;
pub use navigator::{GeoTrack, GeoTrackView, EXTERIOR_VOLUME};
pub use params::GeoParams;
pub use state::{GeoStateStore, TrackPhase};
pub use types::{Propagation, SurfaceId, ThreadId, VolumeId};
