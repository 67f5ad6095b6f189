//! Errors raised while building geometry parameters.

use crate::surfaces::SurfaceType;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeoError {
    #[error("Geometry must define at least one universe")]
    NoUniverses,

    #[error("Root universe '{label}' must contain at least one volume (the exterior)")]
    EmptyRoot { label: String },

    #[error("Surface '{label}' of type {kind:?} expects {expected} parameters, got {got}")]
    SurfaceData {
        label: String,
        kind: SurfaceType,
        expected: usize,
        got: usize,
    },

    #[error("Invalid surface '{label}': {reason}")]
    InvalidSurface { label: String, reason: String },

    #[error("Volume '{label}' has a malformed logic expression '{expr}': {reason}")]
    Logic {
        label: String,
        expr: String,
        reason: String,
    },

    #[error("Volume '{label}' references surface {surface} but its universe has {num_surfaces}")]
    UnknownSurface {
        label: String,
        surface: usize,
        num_surfaces: usize,
    },

    #[error("Daughter of volume '{label}' references missing universe {universe}")]
    UnknownUniverse { label: String, universe: usize },

    #[error("Universe {universe} is placed inside itself")]
    DaughterCycle { universe: usize },

    #[error("Grid along the {axis} axis of '{label}' needs at least two strictly increasing finite values")]
    BadGrid { label: String, axis: char },

    #[error("Rect array '{label}' lists {got} daughters for {expected} cells")]
    DaughterCount {
        label: String,
        expected: usize,
        got: usize,
    },

    #[error("Failed to parse geometry input: {0}")]
    Json(#[from] serde_json::Error),
}
