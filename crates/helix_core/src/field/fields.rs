use crate::traits::MagneticField;
use anyhow::{bail, Result};
use helix_geo::Real3;
use serde::{Deserialize, Serialize};

/// Constant field everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UniformField {
    value: Real3,
}

impl UniformField {
    pub fn new(value: Real3) -> Self {
        Self { value }
    }
}

impl MagneticField for UniformField {
    fn field(&self, _pos: &Real3) -> Real3 {
        self.value
    }
}

/// Cylindrically symmetric field sampled on a regular (r, z) grid.
///
/// Values are stored row-major in z: index `iz * num_grid_r + ir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RzMapFieldInput {
    pub num_grid_r: usize,
    pub num_grid_z: usize,
    pub min_r: f64,
    pub max_r: f64,
    pub min_z: f64,
    pub max_z: f64,
    pub field_r: Vec<f64>,
    pub field_z: Vec<f64>,
}

/// Bilinear interpolation of an r-z field map; zero outside the grid.
#[derive(Debug, Clone)]
pub struct RzMapField {
    input: RzMapFieldInput,
    delta_r: f64,
    delta_z: f64,
}

impl RzMapField {
    pub fn new(input: RzMapFieldInput) -> Result<Self> {
        if input.num_grid_r < 2 || input.num_grid_z < 2 {
            bail!("field map needs at least two grid points per axis.");
        }
        if !(input.min_r >= 0.0 && input.max_r > input.min_r) {
            bail!("radial extent must be nonnegative and increasing.");
        }
        if !(input.max_z > input.min_z) {
            bail!("axial extent must be increasing.");
        }
        let expected = input.num_grid_r * input.num_grid_z;
        if input.field_r.len() != expected || input.field_z.len() != expected {
            bail!(
                "field map has {} radial and {} axial values; expected {}.",
                input.field_r.len(),
                input.field_z.len(),
                expected
            );
        }

        let delta_r = (input.max_r - input.min_r) / (input.num_grid_r - 1) as f64;
        let delta_z = (input.max_z - input.min_z) / (input.num_grid_z - 1) as f64;
        Ok(Self {
            input,
            delta_r,
            delta_z,
        })
    }

    /// Interpolated (B_r, B_z), or `None` outside the map.
    fn interpolate(&self, r: f64, z: f64) -> Option<(f64, f64)> {
        let inp = &self.input;
        if r < inp.min_r || r > inp.max_r || z < inp.min_z || z > inp.max_z {
            return None;
        }

        let (ir, fr) = cell_fraction(r - inp.min_r, self.delta_r, inp.num_grid_r);
        let (iz, fz) = cell_fraction(z - inp.min_z, self.delta_z, inp.num_grid_z);

        let idx = |jz: usize, jr: usize| jz * inp.num_grid_r + jr;
        let lerp2 = |values: &[f64]| {
            let low = values[idx(iz, ir)] * (1.0 - fr) + values[idx(iz, ir + 1)] * fr;
            let high = values[idx(iz + 1, ir)] * (1.0 - fr) + values[idx(iz + 1, ir + 1)] * fr;
            low * (1.0 - fz) + high * fz
        };
        Some((lerp2(&inp.field_r), lerp2(&inp.field_z)))
    }
}

/// Lower grid index and fractional offset, keeping the last point inside
/// the final cell.
fn cell_fraction(offset: f64, delta: f64, num_points: usize) -> (usize, f64) {
    let scaled = offset / delta;
    let index = (scaled.floor() as usize).min(num_points - 2);
    (index, scaled - index as f64)
}

impl MagneticField for RzMapField {
    fn field(&self, pos: &Real3) -> Real3 {
        let r = pos.x.hypot(pos.y);
        let Some((b_r, b_z)) = self.interpolate(r, pos.z) else {
            return Real3::zeros();
        };
        if r > 0.0 {
            Real3::new(b_r * pos.x / r, b_r * pos.y / r, b_z)
        } else {
            Real3::new(0.0, 0.0, b_z)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // B_r = 0.1 r, B_z = 1 + 0.5 z on r in [0, 2], z in [-1, 1]
    fn linear_map() -> RzMapFieldInput {
        let (nr, nz) = (3, 5);
        let mut field_r = Vec::new();
        let mut field_z = Vec::new();
        for iz in 0..nz {
            let z = -1.0 + 0.5 * iz as f64;
            for ir in 0..nr {
                let r = ir as f64;
                field_r.push(0.1 * r);
                field_z.push(1.0 + 0.5 * z);
            }
        }
        RzMapFieldInput {
            num_grid_r: nr,
            num_grid_z: nz,
            min_r: 0.0,
            max_r: 2.0,
            min_z: -1.0,
            max_z: 1.0,
            field_r,
            field_z,
        }
    }

    #[test]
    fn interpolates_linear_data_exactly() {
        let field = RzMapField::new(linear_map()).unwrap();
        let b = field.field(&Real3::new(0.6, 0.8, 0.3));
        assert!((b - Real3::new(0.06, 0.08, 1.15)).norm() < 1e-12);

        let on_axis = field.field(&Real3::new(0.0, 0.0, -1.0));
        assert!((on_axis - Real3::new(0.0, 0.0, 0.5)).norm() < 1e-12);

        let corner = field.field(&Real3::new(2.0, 0.0, 1.0));
        assert!((corner - Real3::new(0.2, 0.0, 1.5)).norm() < 1e-12);
    }

    #[test]
    fn zero_outside_the_map() {
        let field = RzMapField::new(linear_map()).unwrap();
        assert_eq!(field.field(&Real3::new(3.0, 0.0, 0.0)), Real3::zeros());
        assert_eq!(field.field(&Real3::new(0.0, 0.0, 1.5)), Real3::zeros());
    }

    #[test]
    fn rejects_mismatched_sizes() {
        let mut input = linear_map();
        input.field_z.pop();
        let err = RzMapField::new(input).unwrap_err();
        assert!(err.to_string().contains("expected 15"));
    }
}
