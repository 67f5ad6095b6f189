use crate::field::{Chord, OdeState};
use helix_geo::Real3;

/// Straight segment from `src` to `dst`.
pub fn make_chord(src: &Real3, dst: &Real3) -> Chord {
    let diff = dst - src;
    let length = diff.norm();
    debug_assert!(length > 0.0, "chord endpoints coincide");
    Chord {
        length,
        dir: diff / length,
    }
}

/// Whether the point `distance` along the ray lies within `tolerance` of
/// `target`.
pub fn is_intercept_close(
    pos: &Real3,
    dir: &Real3,
    distance: f64,
    target: &Real3,
    tolerance: f64,
) -> bool {
    let intercept = pos + dir * distance;
    (intercept - target).norm_squared() < tolerance * tolerance
}

/// Distance between the point `distance` along the ray and `target`.
pub fn calc_miss_distance(pos: &Real3, dir: &Real3, distance: f64, target: &Real3) -> f64 {
    let intercept = pos + dir * distance;
    (intercept - target).norm()
}

/// Distance from the midpoint of a step to the chord joining its endpoints.
pub fn distance_chord(beg: &OdeState, mid: &OdeState, end: &OdeState) -> f64 {
    let beg_mid = mid.pos - beg.pos;
    let beg_end = end.pos - beg.pos;
    let cross = beg_end.cross(&beg_mid);
    (cross.norm_squared() / beg_end.norm_squared()).sqrt()
}
