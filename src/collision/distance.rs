//! Closest-point queries on points, lines, segments, triangles and planes.

use glam::{Vec2, Vec3};

use crate::geometry::{barycentric_segment, barycentric_triangle, Plane};
use crate::math::solve22;
use crate::settings::LINEAR_SLOP;

/// Lines whose directions have a sine below this, scaled by both lengths,
/// are treated as parallel.
const PARALLEL_TOLERANCE: f32 = 0.005;

#[inline]
pub fn closest_point_on_plane(q: Vec3, plane: &Plane) -> Vec3 {
    plane.project(q)
}

/// Closest point to `q` on segment `ab`. A degenerate segment yields `a`.
pub fn closest_point_on_segment(q: Vec3, a: Vec3, b: Vec3) -> Vec3 {
    let w = barycentric_segment(a, b, q);
    if w[1] <= 0.0 {
        return a;
    }
    if w[0] <= 0.0 {
        return b;
    }
    (w[0] * a + w[1] * b) / w[2]
}

/// Closest point to `q` on triangle `abc`, by Voronoi region.
pub fn closest_point_on_triangle(q: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let w_ab = barycentric_segment(a, b, q);
    let w_bc = barycentric_segment(b, c, q);
    let w_ca = barycentric_segment(c, a, q);

    // Vertex regions
    if w_ab[1] <= 0.0 && w_ca[0] <= 0.0 {
        return a;
    }
    if w_ab[0] <= 0.0 && w_bc[1] <= 0.0 {
        return b;
    }
    if w_bc[0] <= 0.0 && w_ca[1] <= 0.0 {
        return c;
    }

    let w_abc = barycentric_triangle(a, b, c, q);

    // Edge regions
    if w_ab[0] > 0.0 && w_ab[1] > 0.0 && w_abc[2] <= 0.0 {
        return (w_ab[0] * a + w_ab[1] * b) / w_ab[2];
    }
    if w_bc[0] > 0.0 && w_bc[1] > 0.0 && w_abc[0] <= 0.0 {
        return (w_bc[0] * b + w_bc[1] * c) / w_bc[2];
    }
    if w_ca[0] > 0.0 && w_ca[1] > 0.0 && w_abc[1] <= 0.0 {
        return (w_ca[0] * c + w_ca[1] * a) / w_ca[2];
    }

    if w_abc[3] <= 0.0 {
        return a;
    }

    (w_abc[0] * a + w_abc[1] * b + w_abc[2] * c) / w_abc[3]
}

/// Closest points between the lines `p1 + s·e1` and `p2 + t·e2`.
/// Parallel lines yield `(p1, p2)`.
pub fn closest_points_on_lines(p1: Vec3, e1: Vec3, p2: Vec3, e2: Vec3) -> (Vec3, Vec3) {
    let r = p1 - p2;
    let a = e1.dot(e1);
    let b = e1.dot(e2);
    let e = e2.dot(e2);
    let c = e1.dot(r);
    let f = e2.dot(r);

    let denom = a * e - b * b;
    if denom <= f32::EPSILON * a * e {
        return (p1, p2);
    }

    let x = solve22(Vec2::new(a, b), Vec2::new(-b, -e), Vec2::new(-c, -f));
    (p1 + x.x * e1, p2 + x.y * e2)
}

/// [`closest_points_on_lines`] for unit direction vectors.
pub fn closest_points_on_normalized_lines(
    p1: Vec3,
    n1: Vec3,
    p2: Vec3,
    n2: Vec3,
) -> (Vec3, Vec3) {
    let b = n1.dot(n2);
    let denom = 1.0 - b * b;
    if denom <= f32::EPSILON {
        return (p1, p2);
    }

    let r = p1 - p2;
    let c = n1.dot(r);
    let f = n2.dot(r);
    let s = (b * f - c) / denom;
    let t = (f - b * c) / denom;
    (p1 + s * n1, p2 + t * n2)
}

/// Closest points between segments `p1q1` and `p2q2`.
///
/// Segments shorter than [`LINEAR_SLOP`] are treated as points. Nearly
/// parallel segments start from `p1`. The line solution is then clamped onto
/// the first segment, projected onto the second and back, which lands on
/// the segment-segment optimum.
pub fn closest_points_on_segments(p1: Vec3, q1: Vec3, p2: Vec3, q2: Vec3) -> (Vec3, Vec3) {
    let e1 = q1 - p1;
    let e2 = q2 - p2;
    let l1 = e1.length();
    let l2 = e2.length();

    if l1 < LINEAR_SLOP && l2 < LINEAR_SLOP {
        return (p1, p2);
    }
    if l1 < LINEAR_SLOP {
        return (p1, closest_point_on_segment(p1, p2, q2));
    }
    if l2 < LINEAR_SLOP {
        return (closest_point_on_segment(p2, p1, q1), p2);
    }

    let (c1, _) = if e1.cross(e2).length() < PARALLEL_TOLERANCE * l1 * l2 {
        (p1, p2)
    } else {
        closest_points_on_normalized_lines(p1, e1 / l1, p2, e2 / l2)
    };

    let c1 = closest_point_on_segment(c1, p1, q1);
    let c2 = closest_point_on_segment(c1, p2, q2);
    let c1 = closest_point_on_segment(c2, p1, q1);
    (c1, c2)
}
