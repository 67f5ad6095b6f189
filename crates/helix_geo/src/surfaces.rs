//! Quadric surface primitives.
//!
//! Every surface is an implicit function `f(x)`: points with `f < 0` are
//! inside, `f > 0` outside, and the gradient points toward the outside.
//! The surfaces are plain data so that the same kernels serve any number of
//! tracks concurrently.

pub mod quadratic;

use crate::error::GeoError;
use crate::math::{make_unit_vector, Real3};
use crate::types::{Axis, SignedSense};
use quadratic::solve_quadratic;
use serde::{Deserialize, Serialize};

/// Surface kinds accepted in geometry input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceType {
    #[serde(rename = "px")]
    PlaneX,
    #[serde(rename = "py")]
    PlaneY,
    #[serde(rename = "pz")]
    PlaneZ,
    #[serde(rename = "cxc")]
    CylCenteredX,
    #[serde(rename = "cyc")]
    CylCenteredY,
    #[serde(rename = "czc")]
    CylCenteredZ,
    #[serde(rename = "sc")]
    SphereCentered,
    #[serde(rename = "cx")]
    CylX,
    #[serde(rename = "cy")]
    CylY,
    #[serde(rename = "cz")]
    CylZ,
    #[serde(rename = "p")]
    Plane,
    #[serde(rename = "s")]
    Sphere,
    #[serde(rename = "kx")]
    ConeX,
    #[serde(rename = "ky")]
    ConeY,
    #[serde(rename = "kz")]
    ConeZ,
    #[serde(rename = "sq")]
    SimpleQuadric,
    #[serde(rename = "gq")]
    GeneralQuadric,
}

impl SurfaceType {
    /// Number of real parameters in the input representation.
    pub fn num_data(self) -> usize {
        use SurfaceType::*;
        match self {
            PlaneX | PlaneY | PlaneZ => 1,
            CylCenteredX | CylCenteredY | CylCenteredZ | SphereCentered => 1,
            CylX | CylY | CylZ => 3,
            Plane | Sphere | ConeX | ConeY | ConeZ => 4,
            SimpleQuadric => 7,
            GeneralQuadric => 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Surface {
    PlaneAligned {
        axis: Axis,
        position: f64,
    },
    CylCentered {
        axis: Axis,
        radius: f64,
    },
    SphereCentered {
        radius: f64,
    },
    /// Cylinder parallel to an axis through `(u, v)` in the perpendicular
    /// coordinates.
    CylAligned {
        axis: Axis,
        origin: [f64; 2],
        radius: f64,
    },
    Plane {
        normal: Real3,
        displacement: f64,
    },
    Sphere {
        origin: Real3,
        radius: f64,
    },
    /// Double cone along an axis with apex at `origin`; `tangent` is the
    /// tangent of the half-opening angle.
    ConeAligned {
        axis: Axis,
        origin: Real3,
        tangent: f64,
    },
    /// `a x^2 + b y^2 + c z^2 + d x + e y + f z + g`
    SimpleQuadric {
        second: Real3,
        first: Real3,
        zeroth: f64,
    },
    /// `a x^2 + b y^2 + c z^2 + d xy + e yz + f zx + g x + h y + i z + j`
    GeneralQuadric {
        second: Real3,
        cross: Real3,
        first: Real3,
        zeroth: f64,
    },
}

impl Surface {
    pub fn from_data(kind: SurfaceType, data: &[f64], label: &str) -> Result<Self, GeoError> {
        if data.len() != kind.num_data() {
            return Err(GeoError::SurfaceData {
                label: label.to_string(),
                kind,
                expected: kind.num_data(),
                got: data.len(),
            });
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(invalid(label, "parameters must be finite"));
        }
        let positive = |value: f64, what: &str| {
            if value > 0.0 {
                Ok(value)
            } else {
                Err(invalid(label, &format!("{what} must be positive")))
            }
        };

        use SurfaceType::*;
        let surface = match kind {
            PlaneX | PlaneY | PlaneZ => Surface::PlaneAligned {
                axis: plane_axis(kind),
                position: data[0],
            },
            CylCenteredX | CylCenteredY | CylCenteredZ => Surface::CylCentered {
                axis: plane_axis(kind),
                radius: positive(data[0], "radius")?,
            },
            SphereCentered => Surface::SphereCentered {
                radius: positive(data[0], "radius")?,
            },
            CylX | CylY | CylZ => Surface::CylAligned {
                axis: plane_axis(kind),
                origin: [data[0], data[1]],
                radius: positive(data[2], "radius")?,
            },
            Plane => {
                let normal = Real3::new(data[0], data[1], data[2]);
                let norm = normal.norm();
                if norm == 0.0 {
                    return Err(invalid(label, "plane normal must be nonzero"));
                }
                Surface::Plane {
                    normal: normal / norm,
                    displacement: data[3] / norm,
                }
            }
            Sphere => Surface::Sphere {
                origin: Real3::new(data[0], data[1], data[2]),
                radius: positive(data[3], "radius")?,
            },
            ConeX | ConeY | ConeZ => Surface::ConeAligned {
                axis: plane_axis(kind),
                origin: Real3::new(data[0], data[1], data[2]),
                tangent: positive(data[3], "tangent")?,
            },
            SimpleQuadric => Surface::SimpleQuadric {
                second: Real3::new(data[0], data[1], data[2]),
                first: Real3::new(data[3], data[4], data[5]),
                zeroth: data[6],
            },
            GeneralQuadric => Surface::GeneralQuadric {
                second: Real3::new(data[0], data[1], data[2]),
                cross: Real3::new(data[3], data[4], data[5]),
                first: Real3::new(data[6], data[7], data[8]),
                zeroth: data[9],
            },
        };
        Ok(surface)
    }

    /// Value of the implicit function.
    pub fn eval(&self, pos: &Real3) -> f64 {
        match *self {
            Surface::PlaneAligned { axis, position } => pos[axis.index()] - position,
            Surface::CylCentered { axis, radius } => {
                let (u, v) = axis.perpendicular();
                pos[u] * pos[u] + pos[v] * pos[v] - radius * radius
            }
            Surface::SphereCentered { radius } => pos.norm_squared() - radius * radius,
            Surface::CylAligned {
                axis,
                origin,
                radius,
            } => {
                let (u, v) = axis.perpendicular();
                let du = pos[u] - origin[0];
                let dv = pos[v] - origin[1];
                du * du + dv * dv - radius * radius
            }
            Surface::Plane {
                normal,
                displacement,
            } => normal.dot(pos) - displacement,
            Surface::Sphere { origin, radius } => (pos - origin).norm_squared() - radius * radius,
            Surface::ConeAligned {
                axis,
                origin,
                tangent,
            } => {
                let rel = pos - origin;
                let (u, v) = axis.perpendicular();
                let w = rel[axis.index()];
                rel[u] * rel[u] + rel[v] * rel[v] - tangent * tangent * w * w
            }
            Surface::SimpleQuadric {
                second,
                first,
                zeroth,
            } => {
                second.dot(&pos.component_mul(pos)) + first.dot(pos) + zeroth
            }
            Surface::GeneralQuadric {
                second,
                cross,
                first,
                zeroth,
            } => {
                let (x, y, z) = (pos[0], pos[1], pos[2]);
                second.dot(&pos.component_mul(pos))
                    + cross[0] * x * y
                    + cross[1] * y * z
                    + cross[2] * z * x
                    + first.dot(pos)
                    + zeroth
            }
        }
    }

    pub fn calc_sense(&self, pos: &Real3) -> SignedSense {
        SignedSense::from_value(self.eval(pos))
    }

    /// Gradient of the implicit function (not normalized).
    pub fn gradient(&self, pos: &Real3) -> Real3 {
        match *self {
            Surface::PlaneAligned { axis, .. } => axis.unit_vector(),
            Surface::CylCentered { axis, .. } => {
                let (u, v) = axis.perpendicular();
                let mut result = Real3::zeros();
                result[u] = 2.0 * pos[u];
                result[v] = 2.0 * pos[v];
                result
            }
            Surface::SphereCentered { .. } => 2.0 * pos,
            Surface::CylAligned { axis, origin, .. } => {
                let (u, v) = axis.perpendicular();
                let mut result = Real3::zeros();
                result[u] = 2.0 * (pos[u] - origin[0]);
                result[v] = 2.0 * (pos[v] - origin[1]);
                result
            }
            Surface::Plane { normal, .. } => normal,
            Surface::Sphere { origin, .. } => 2.0 * (pos - origin),
            Surface::ConeAligned {
                axis,
                origin,
                tangent,
            } => {
                let mut result = 2.0 * (pos - origin);
                result[axis.index()] *= -tangent * tangent;
                result
            }
            Surface::SimpleQuadric { second, first, .. } => {
                2.0 * second.component_mul(pos) + first
            }
            Surface::GeneralQuadric {
                second,
                cross,
                first,
                ..
            } => {
                let (x, y, z) = (pos[0], pos[1], pos[2]);
                Real3::new(
                    2.0 * second[0] * x + cross[0] * y + cross[2] * z + first[0],
                    2.0 * second[1] * y + cross[0] * x + cross[1] * z + first[1],
                    2.0 * second[2] * z + cross[1] * y + cross[2] * x + first[2],
                )
            }
        }
    }

    /// Outward unit normal at a point on the surface.
    pub fn calc_normal(&self, pos: &Real3) -> Real3 {
        make_unit_vector(&self.gradient(pos))
    }

    /// Second-order coefficient of `f(pos + t dir)`.
    fn quadratic_coefficient(&self, dir: &Real3) -> f64 {
        match *self {
            Surface::PlaneAligned { .. } | Surface::Plane { .. } => 0.0,
            Surface::CylCentered { axis, .. } | Surface::CylAligned { axis, .. } => {
                let (u, v) = axis.perpendicular();
                dir[u] * dir[u] + dir[v] * dir[v]
            }
            Surface::SphereCentered { .. } | Surface::Sphere { .. } => dir.norm_squared(),
            Surface::ConeAligned { axis, tangent, .. } => {
                let (u, v) = axis.perpendicular();
                let w = dir[axis.index()];
                dir[u] * dir[u] + dir[v] * dir[v] - tangent * tangent * w * w
            }
            Surface::SimpleQuadric { second, .. } => second.dot(&dir.component_mul(dir)),
            Surface::GeneralQuadric { second, cross, .. } => {
                second.dot(&dir.component_mul(dir))
                    + cross[0] * dir[0] * dir[1]
                    + cross[1] * dir[1] * dir[2]
                    + cross[2] * dir[2] * dir[0]
            }
        }
    }

    /// Distances to the surface along a ray, sorted, padded with infinity.
    ///
    /// With `on_surface` the zero-distance root is suppressed.
    pub fn calc_intersections(&self, pos: &Real3, dir: &Real3, on_surface: bool) -> [f64; 2] {
        let mut result = [f64::INFINITY; 2];
        match *self {
            Surface::PlaneAligned { axis, position } => {
                let n = dir[axis.index()];
                if !on_surface && n != 0.0 {
                    let dist = (position - pos[axis.index()]) / n;
                    if dist > 0.0 {
                        result[0] = dist;
                    }
                }
                result
            }
            Surface::Plane {
                normal,
                displacement,
            } => {
                let n = normal.dot(dir);
                if !on_surface && n != 0.0 {
                    let dist = (displacement - normal.dot(pos)) / n;
                    if dist > 0.0 {
                        result[0] = dist;
                    }
                }
                result
            }
            _ => {
                let a = self.quadratic_coefficient(dir);
                let half_b = 0.5 * self.gradient(pos).dot(dir);
                let c = if on_surface { 0.0 } else { self.eval(pos) };
                solve_quadratic(a, half_b, c, on_surface)
            }
        }
    }

    /// Exact distance to the surface in any direction, if cheaply known.
    pub fn safety_distance(&self, pos: &Real3) -> Option<f64> {
        match *self {
            Surface::PlaneAligned { axis, position } => Some((pos[axis.index()] - position).abs()),
            Surface::Plane {
                normal,
                displacement,
            } => Some((normal.dot(pos) - displacement).abs()),
            Surface::CylCentered { axis, radius } => {
                let (u, v) = axis.perpendicular();
                Some((pos[u].hypot(pos[v]) - radius).abs())
            }
            Surface::CylAligned {
                axis,
                origin,
                radius,
            } => {
                let (u, v) = axis.perpendicular();
                Some(((pos[u] - origin[0]).hypot(pos[v] - origin[1]) - radius).abs())
            }
            Surface::SphereCentered { radius } => Some((pos.norm() - radius).abs()),
            Surface::Sphere { origin, radius } => Some(((pos - origin).norm() - radius).abs()),
            Surface::ConeAligned { .. }
            | Surface::SimpleQuadric { .. }
            | Surface::GeneralQuadric { .. } => None,
        }
    }

    pub fn max_intersections(&self) -> usize {
        match self {
            Surface::PlaneAligned { .. } | Surface::Plane { .. } => 1,
            _ => 2,
        }
    }
}

fn plane_axis(kind: SurfaceType) -> Axis {
    use SurfaceType::*;
    match kind {
        PlaneX | CylCenteredX | CylX | ConeX => Axis::X,
        PlaneY | CylCenteredY | CylY | ConeY => Axis::Y,
        _ => Axis::Z,
    }
}

fn invalid(label: &str, reason: &str) -> GeoError {
    GeoError::InvalidSurface {
        label: label.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(kind: SurfaceType, data: &[f64]) -> Surface {
        Surface::from_data(kind, data, "test").expect("surface data should be valid")
    }

    #[test]
    fn plane_intersection_and_sense() {
        let px = build(SurfaceType::PlaneX, &[3.0]);
        let pos = Real3::new(-1.0, 0.5, 0.0);
        assert_eq!(px.calc_sense(&pos), SignedSense::Inside);
        let dist = px.calc_intersections(&pos, &Real3::new(1.0, 0.0, 0.0), false);
        assert!((dist[0] - 4.0).abs() < 1e-12);
        let back = px.calc_intersections(&pos, &Real3::new(-1.0, 0.0, 0.0), false);
        assert_eq!(back[0], f64::INFINITY);
        assert_eq!(px.calc_normal(&pos), Real3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn sphere_intersections_from_inside_and_outside() {
        let sphere = build(SurfaceType::Sphere, &[1.0, 0.0, 0.0, 2.0]);
        let dir = Real3::new(1.0, 0.0, 0.0);

        let inside = sphere.calc_intersections(&Real3::new(1.0, 0.0, 0.0), &dir, false);
        assert!((inside[0] - 2.0).abs() < 1e-12);
        assert_eq!(inside[1], f64::INFINITY);

        let outside = sphere.calc_intersections(&Real3::new(-5.0, 0.0, 0.0), &dir, false);
        assert!((outside[0] - 4.0).abs() < 1e-12);
        assert!((outside[1] - 8.0).abs() < 1e-12);

        let on = sphere.calc_intersections(&Real3::new(-1.0, 0.0, 0.0), &dir, true);
        assert!((on[0] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn centered_cylinder_ignores_axial_direction() {
        let cyl = build(SurfaceType::CylCenteredZ, &[2.0]);
        let pos = Real3::new(0.0, 0.0, 5.0);
        let axial = cyl.calc_intersections(&pos, &Real3::new(0.0, 0.0, 1.0), false);
        assert_eq!(axial, [f64::INFINITY; 2]);
        let radial = cyl.calc_intersections(&pos, &Real3::new(0.0, 1.0, 0.0), false);
        assert!((radial[0] - 2.0).abs() < 1e-12);
        assert_eq!(cyl.safety_distance(&Real3::new(0.5, 0.0, 0.0)), Some(1.5));
    }

    #[test]
    fn general_plane_is_normalized() {
        let plane = build(SurfaceType::Plane, &[0.0, 2.0, 0.0, 4.0]);
        assert!(plane.eval(&Real3::new(0.0, 2.0, 0.0)).abs() < 1e-12);
        let dist = plane.calc_intersections(&Real3::zeros(), &Real3::new(0.0, 1.0, 0.0), false);
        assert!((dist[0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn cone_intersection_along_radial_line() {
        // 45-degree cone along z with apex at the origin
        let cone = build(SurfaceType::ConeZ, &[0.0, 0.0, 0.0, 1.0]);
        let pos = Real3::new(0.0, 0.0, 2.0);
        assert_eq!(cone.calc_sense(&pos), SignedSense::Inside);
        let dist = cone.calc_intersections(&pos, &Real3::new(1.0, 0.0, 0.0), false);
        assert!((dist[0] - 2.0).abs() < 1e-12);
        assert_eq!(cone.safety_distance(&pos), None);
    }

    #[test]
    fn general_quadric_matches_equivalent_sphere() {
        let gq = build(
            SurfaceType::GeneralQuadric,
            &[1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, -4.0],
        );
        let sphere = build(SurfaceType::SphereCentered, &[2.0]);
        let pos = Real3::new(0.5, -0.25, 0.1);
        let dir = Real3::new(0.0, 0.6, 0.8);
        let expected = sphere.calc_intersections(&pos, &dir, false);
        let actual = gq.calc_intersections(&pos, &dir, false);
        assert!((expected[0] - actual[0]).abs() < 1e-12);
        let normal = gq.calc_normal(&Real3::new(0.0, 2.0, 0.0));
        assert!((normal - Real3::new(0.0, 1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn simple_quadric_ellipsoid_sense() {
        // x^2/4 + y^2 + z^2 - 1
        let sq = build(
            SurfaceType::SimpleQuadric,
            &[0.25, 1.0, 1.0, 0.0, 0.0, 0.0, -1.0],
        );
        assert_eq!(sq.calc_sense(&Real3::new(1.9, 0.0, 0.0)), SignedSense::Inside);
        assert_eq!(sq.calc_sense(&Real3::new(0.0, 1.1, 0.0)), SignedSense::Outside);
        let dist = sq.calc_intersections(&Real3::zeros(), &Real3::new(1.0, 0.0, 0.0), false);
        assert!((dist[0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn from_data_rejects_wrong_arity_and_bad_radius() {
        let err = Surface::from_data(SurfaceType::Sphere, &[1.0, 2.0], "ball")
            .expect_err("sphere needs four parameters");
        assert!(format!("{err}").contains("ball"));
        let err = Surface::from_data(SurfaceType::SphereCentered, &[-1.0], "ball")
            .expect_err("negative radius should be rejected");
        assert!(format!("{err}").contains("radius must be positive"));
    }
}
