//! Planes and barycentric coordinates.
//!
//! Barycentric helpers return unnormalized weights followed by their sum
//! (the divisor). Callers test signs on the raw weights and divide only
//! after the Voronoi region is known, so degenerate inputs never divide by
//! zero inside these functions.

use glam::Vec3;

use crate::math::Transform;

/// The plane `dot(normal, x) == offset`. `normal` is unit length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub offset: f32,
}

impl Plane {
    pub fn new(normal: Vec3, offset: f32) -> Self {
        Self { normal, offset }
    }

    /// Plane through `point` with the given unit normal.
    pub fn from_point(normal: Vec3, point: Vec3) -> Self {
        Self {
            normal,
            offset: normal.dot(point),
        }
    }

    /// Signed distance from `point` to the plane.
    #[inline]
    pub fn distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) - self.offset
    }

    /// Orthogonal projection of `point` onto the plane.
    #[inline]
    pub fn project(&self, point: Vec3) -> Vec3 {
        point - self.distance(point) * self.normal
    }

    /// The plane expressed in the parent frame of `xf`.
    pub fn transformed(&self, xf: &Transform) -> Plane {
        let normal = xf.transform_vector(self.normal);
        Plane {
            normal,
            offset: self.offset + normal.dot(xf.position),
        }
    }
}

/// Barycentric coordinates of `q` with respect to segment `ab`.
pub fn barycentric_segment(a: Vec3, b: Vec3, q: Vec3) -> [f32; 3] {
    let ab = b - a;
    let u = (b - q).dot(ab);
    let v = (q - a).dot(ab);
    [u, v, u + v]
}

/// Barycentric coordinates of `q` with respect to triangle `abc`.
pub fn barycentric_triangle(a: Vec3, b: Vec3, c: Vec3, q: Vec3) -> [f32; 4] {
    let qa = a - q;
    let qb = b - q;
    let qc = c - q;
    let n = (b - a).cross(c - a);

    let u = qb.cross(qc).dot(n);
    let v = qc.cross(qa).dot(n);
    let w = qa.cross(qb).dot(n);
    [u, v, w, u + v + w]
}

/// Barycentric coordinates of `q` with respect to tetrahedron `abcd`.
/// The weights are scaled by the sign of the volume so the divisor is
/// non-negative.
pub fn barycentric_tetrahedron(a: Vec3, b: Vec3, c: Vec3, d: Vec3, q: Vec3) -> [f32; 5] {
    let ab = b - a;
    let ac = c - a;
    let ad = d - a;

    let qa = a - q;
    let qb = b - q;
    let qc = c - q;
    let qd = d - q;

    let divisor = ab.dot(ac.cross(ad));
    let sign = if divisor < 0.0 { -1.0 } else { 1.0 };

    let u = sign * qb.dot(qc.cross(qd));
    let v = sign * qa.dot(qd.cross(qc));
    let w = sign * qa.dot(qb.cross(qd));
    let x = sign * qa.dot(qc.cross(qb));
    [u, v, w, x, sign * divisor]
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn test_plane_distance_and_project() {
        let plane = Plane::from_point(Vec3::Y, Vec3::new(0.0, 2.0, 0.0));
        let p = Vec3::new(1.0, 5.0, -1.0);
        assert!((plane.distance(p) - 3.0).abs() < 1e-6);
        let q = plane.project(p);
        assert!((q - Vec3::new(1.0, 2.0, -1.0)).length() < 1e-6);
    }

    #[test]
    fn test_plane_transformed() {
        let plane = Plane::new(Vec3::X, 1.0);
        let xf = Transform::new(
            Vec3::new(0.0, 0.0, 3.0),
            Quat::from_axis_angle(Vec3::Z, std::f32::consts::FRAC_PI_2),
        );
        let world = plane.transformed(&xf);
        // Local (1, 0, 0) lies on the plane; it maps to (0, 1, 3).
        let p = xf.transform_point(Vec3::X);
        assert!(world.distance(p).abs() < 1e-5);
        assert!((world.normal - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_barycentric_segment_midpoint() {
        let w = barycentric_segment(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 0.0));
        assert!((w[0] / w[2] - 0.5).abs() < 1e-6);
        assert!((w[1] / w[2] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_barycentric_triangle_centroid() {
        let a = Vec3::ZERO;
        let b = Vec3::X;
        let c = Vec3::Y;
        let q = (a + b + c) / 3.0;
        let w = barycentric_triangle(a, b, c, q);
        for i in 0..3 {
            assert!((w[i] / w[3] - 1.0 / 3.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_barycentric_tetrahedron_reconstructs_point() {
        let a = Vec3::ZERO;
        let b = Vec3::X;
        // Negative orientation exercises the sign flip.
        let c = Vec3::Z;
        let d = Vec3::Y;
        let q = Vec3::new(0.1, 0.2, 0.3);
        let w = barycentric_tetrahedron(a, b, c, d, q);
        assert!(w[4] > 0.0);
        let p = (w[0] * a + w[1] * b + w[2] * c + w[3] * d) / w[4];
        assert!((p - q).length() < 1e-5);
        assert!(w[..4].iter().all(|&x| x > 0.0));
    }
}
