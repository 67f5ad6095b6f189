//! Serializable geometry description.
//!
//! Universe 0 is the root. In the root universe, local volume 0 is the
//! exterior. Daughter universes are unbounded: the cell that holds a
//! daughter clips it.

use crate::surfaces::SurfaceType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeoInput {
    #[serde(default)]
    pub options: GeoOptions,
    pub universes: Vec<UniverseInput>,
}

/// What to do when a boundary crossing finds no neighbouring cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LostTrackPolicy {
    /// Log a warning and move the track to the exterior volume.
    #[default]
    Exterior,
    /// Panic with a description of the crossing.
    Abort,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GeoOptions {
    #[serde(default)]
    pub lost_track_policy: LostTrackPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UniverseInput {
    Simple(SimpleUnitInput),
    RectArray(RectArrayInput),
}

impl UniverseInput {
    pub fn label(&self) -> &str {
        match self {
            UniverseInput::Simple(u) => &u.label,
            UniverseInput::RectArray(u) => &u.label,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpleUnitInput {
    #[serde(default)]
    pub label: String,
    pub surfaces: Vec<SurfaceInput>,
    pub volumes: Vec<VolumeInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceInput {
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type")]
    pub kind: SurfaceType,
    pub data: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeInput {
    #[serde(default)]
    pub label: String,
    /// Postfix expression over local surface ids.
    pub logic: String,
    #[serde(default)]
    pub daughter: Option<DaughterInput>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DaughterInput {
    pub universe: usize,
    #[serde(default)]
    pub translation: [f64; 3],
}

/// Rectilinear grid of cells. Local volume 0 is the background outside the
/// grid; cell `(i, j, k)` is local volume `1 + (i * ny + j) * nz + k`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RectArrayInput {
    #[serde(default)]
    pub label: String,
    /// Grid plane positions along x, y and z.
    pub grid: [Vec<f64>; 3],
    /// Optional daughter per cell, in cell order.
    #[serde(default)]
    pub daughters: Vec<Option<DaughterInput>>,
}
