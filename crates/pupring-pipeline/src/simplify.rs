//! Polygon simplification using the Ramer-Douglas-Peucker algorithm.
//!
//! Reduces point count by removing points that are within a given
//! tolerance of the line between their neighbors. The result only keeps
//! input points (in ring order for closed chains), so simplification
//! never adds points and never moves the boundary by more than the
//! tolerance.

use crate::types::Point;

/// Simplify an open chain.
///
/// Points within `tolerance` pixels of the segment between their
/// retained neighbors are removed; both endpoints are kept. A tolerance
/// of 0.0 removes only exactly collinear points. Chains with fewer than
/// 3 points are returned unchanged.
#[must_use = "returns the simplified points"]
pub fn simplify(points: &[Point], tolerance: f64) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let mut kept = vec![false; points.len()];
    kept[0] = true;
    kept[points.len() - 1] = true;

    rdp_recurse(points, 0, points.len() - 1, tolerance, &mut kept);

    points
        .iter()
        .zip(&kept)
        .filter(|&(_, k)| *k)
        .map(|(&p, _)| p)
        .collect()
}

/// Simplify a closed chain (the last point connects back to the first).
///
/// The ring is split at a pair of far-apart points: the point farthest
/// from the first point, and the point farthest from that one. Both
/// halves are simplified as open chains, so the starting point of the
/// trace survives only if it is a real vertex. The result starts at the
/// first split point.
#[must_use = "returns the simplified points"]
pub fn simplify_closed(points: &[Point], tolerance: f64) -> Vec<Point> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }
    let a = farthest_from(points, points[0]);
    let b = farthest_from(points, points[a]);
    if a == b {
        return vec![points[0]];
    }

    let ring: Vec<Point> = points[a..].iter().chain(&points[..a]).copied().collect();
    let split = (b + n - a) % n;

    let mut result = simplify(&ring[..=split], tolerance);
    let mut back: Vec<Point> = ring[split..].to_vec();
    back.push(ring[0]);
    let back = simplify(&back, tolerance);
    result.extend_from_slice(&back[1..back.len() - 1]);
    result
}

/// Index of the point farthest from `origin`; the first one on ties.
fn farthest_from(points: &[Point], origin: Point) -> usize {
    let mut best = 0;
    let mut best_dist = -1.0;
    for (i, &p) in points.iter().enumerate() {
        let d = p.distance(origin);
        if d > best_dist {
            best_dist = d;
            best = i;
        }
    }
    best
}

/// Recursive step of the Ramer-Douglas-Peucker algorithm.
///
/// Finds the point between `start` and `end` that is farthest from the
/// line segment between them. If that distance exceeds `tolerance`, the
/// point is kept and both sub-segments are processed recursively.
fn rdp_recurse(points: &[Point], start: usize, end: usize, tolerance: f64, kept: &mut [bool]) {
    if end <= start + 1 {
        return;
    }

    let mut max_dist = 0.0;
    let mut max_idx = start;

    for i in (start + 1)..end {
        let d = perpendicular_distance(points[i], points[start], points[end]);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist > tolerance {
        kept[max_idx] = true;
        rdp_recurse(points, start, max_idx, tolerance, kept);
        rdp_recurse(points, max_idx, end, tolerance, kept);
    }
}

/// Perpendicular distance from point `p` to the line defined by `a` and `b`.
///
/// Uses the formula: |cross(b-a, p-a)| / |b-a|.
/// When `a` and `b` coincide, returns the distance from `p` to `a`.
fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    if a == b {
        return p.distance(a);
    }

    let dx = f64::from(b.x) - f64::from(a.x);
    let dy = f64::from(b.y) - f64::from(a.y);
    let length_sq = dx.mul_add(dx, dy * dy);

    let cross = dx.mul_add(
        f64::from(a.y) - f64::from(p.y),
        -(dy * (f64::from(a.x) - f64::from(p.x))),
    );
    cross.abs() / length_sq.sqrt()
}
