/// Positive roots of `a t^2 + 2 b' t + c = 0` along a ray.
///
/// Unused entries are `f64::INFINITY`. When the ray starts on the surface
/// (`c == 0` logically) the zero root is dropped and only the other root is
/// reported.
pub fn solve_quadratic(a: f64, half_b: f64, c: f64, on_surface: bool) -> [f64; 2] {
    let mut result = [f64::INFINITY; 2];

    if a.abs() < QUADRATIC_EPSILON {
        // Degenerate: the ray is (nearly) parallel to the surface's
        // asymptote, so only the linear term remains.
        if !on_surface && half_b != 0.0 {
            let root = -c / (2.0 * half_b);
            if root > 0.0 {
                result[0] = root;
            }
        }
        return result;
    }

    if on_surface {
        let root = -2.0 * half_b / a;
        if root > 0.0 {
            result[0] = root;
        }
        return result;
    }

    let discriminant = half_b * half_b - a * c;
    if discriminant <= 0.0 {
        // Missing or grazing
        return result;
    }
    let sqrt_disc = discriminant.sqrt();
    // Both terms of q share a sign, so neither root cancels
    let q = -(half_b + half_b.signum() * sqrt_disc);
    let mut roots = [q / a, c / q];
    if roots[0] > roots[1] {
        roots.swap(0, 1);
    }
    let mut count = 0;
    for root in roots {
        if root > 0.0 {
            result[count] = root;
            count += 1;
        }
    }
    result
}

const QUADRATIC_EPSILON: f64 = 1e-14;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solve_quadratic_returns_sorted_positive_roots() {
        // Unit sphere from x=-3 heading +x: a=1, b'=-3, c=8
        let roots = solve_quadratic(1.0, -3.0, 8.0, false);
        assert!((roots[0] - 2.0).abs() < 1e-12);
        assert!((roots[1] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn solve_quadratic_drops_zero_root_on_surface() {
        // On unit sphere at x=-1 heading +x: b'=-1
        let roots = solve_quadratic(1.0, -1.0, 0.0, true);
        assert!((roots[0] - 2.0).abs() < 1e-12);
        assert_eq!(roots[1], f64::INFINITY);

        // Heading outward: no crossing
        let roots = solve_quadratic(1.0, 1.0, 0.0, true);
        assert_eq!(roots, [f64::INFINITY; 2]);
    }

    #[test]
    fn solve_quadratic_keeps_precision_for_the_near_root() {
        // Huge sphere just ahead of the ray: the near root is about c / (2 |b'|)
        let roots = solve_quadratic(1.0, -1e8, 1.0, false);
        assert!((roots[0] - 5e-9).abs() < 1e-20, "{}", roots[0]);
        assert!((roots[1] - 2e8).abs() < 1e-6);

        // Mirrored signs give the same roots
        let roots = solve_quadratic(-1.0, 1e8, -1.0, false);
        assert!((roots[0] - 5e-9).abs() < 1e-20, "{}", roots[0]);
        assert!((roots[1] - 2e8).abs() < 1e-6);
    }

    #[test]
    fn solve_quadratic_ignores_grazing_rays() {
        // Tangent to the unit sphere
        let roots = solve_quadratic(1.0, -3.0, 9.0, false);
        assert_eq!(roots, [f64::INFINITY; 2]);
    }

    #[test]
    fn solve_quadratic_handles_linear_degenerate_case() {
        let roots = solve_quadratic(0.0, -0.5, 2.0, false);
        assert!((roots[0] - 2.0).abs() < 1e-12);
    }
}
