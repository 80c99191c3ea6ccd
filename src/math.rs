//! Rigid transforms and small closed-form linear algebra helpers.

use std::ops::Mul;

use glam::{Mat3, Quat, Vec2, Vec3};

/// A rigid transform: rotation followed by translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// Map a local point into world space.
    #[inline]
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.rotation * p + self.position
    }

    /// Map a local direction into world space.
    #[inline]
    pub fn transform_vector(&self, v: Vec3) -> Vec3 {
        self.rotation * v
    }

    /// Map a world point into local space.
    #[inline]
    pub fn inverse_transform_point(&self, p: Vec3) -> Vec3 {
        self.rotation.inverse() * (p - self.position)
    }

    /// Map a world direction into local space.
    #[inline]
    pub fn inverse_transform_vector(&self, v: Vec3) -> Vec3 {
        self.rotation.inverse() * v
    }

    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        Self {
            position: rotation * -self.position,
            rotation,
        }
    }

    /// Transform that maps frame `other` into this frame's local space,
    /// i.e. `self⁻¹ · other`.
    pub fn inverse_mul(&self, other: &Transform) -> Self {
        let inv = self.rotation.inverse();
        Self {
            position: inv * (other.position - self.position),
            rotation: (inv * other.rotation).normalize(),
        }
    }
}

impl Mul for Transform {
    type Output = Transform;

    fn mul(self, rhs: Transform) -> Transform {
        Transform {
            position: self.transform_point(rhs.position),
            rotation: (self.rotation * rhs.rotation).normalize(),
        }
    }
}

/// Cross-product matrix: `skew(a) * b == a.cross(b)`.
#[inline]
pub fn skew(v: Vec3) -> Mat3 {
    Mat3::from_cols(
        Vec3::new(0.0, v.z, -v.y),
        Vec3::new(-v.z, 0.0, v.x),
        Vec3::new(v.y, -v.x, 0.0),
    )
}

/// Inverse of `m`, or the zero matrix when `m` is singular.
pub fn inverse_or_zero(m: Mat3) -> Mat3 {
    let det = m.determinant();
    if det.abs() <= f32::EPSILON * f32::EPSILON {
        return Mat3::ZERO;
    }
    m.inverse()
}

/// Solve `A x = b` for a 2×2 matrix given by columns. Returns zero when
/// `A` is singular.
pub fn solve22(col1: Vec2, col2: Vec2, b: Vec2) -> Vec2 {
    let mut det = col1.x * col2.y - col2.x * col1.y;
    if det != 0.0 {
        det = 1.0 / det;
    }
    Vec2::new(
        det * (col2.y * b.x - col2.x * b.y),
        det * (col1.x * b.y - col1.y * b.x),
    )
}

/// Solve `A x = b` for a 3×3 matrix by Cramer's rule. Returns zero when `A`
/// is singular.
pub fn solve33(a: Mat3, b: Vec3) -> Vec3 {
    let mut det = a.x_axis.dot(a.y_axis.cross(a.z_axis));
    if det != 0.0 {
        det = 1.0 / det;
    }
    Vec3::new(
        det * b.dot(a.y_axis.cross(a.z_axis)),
        det * a.x_axis.dot(b.cross(a.z_axis)),
        det * a.x_axis.dot(a.y_axis.cross(b)),
    )
}

/// Advance an orientation by angular velocity `w` over `dt`.
pub fn integrate_rotation(q: Quat, w: Vec3, dt: f32) -> Quat {
    let spin = Quat::from_xyzw(w.x, w.y, w.z, 0.0) * q;
    let q = Quat::from_xyzw(
        q.x + 0.5 * dt * spin.x,
        q.y + 0.5 * dt * spin.y,
        q.z + 0.5 * dt * spin.z,
        q.w + 0.5 * dt * spin.w,
    );
    q.normalize()
}

/// World-space inverse inertia: `R · I⁻¹ · Rᵀ`.
pub fn rotate_inertia(rotation: Quat, local: Mat3) -> Mat3 {
    let r = Mat3::from_quat(rotation);
    r * local * r.transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skew_matches_cross() {
        let a = Vec3::new(1.0, -2.0, 3.0);
        let b = Vec3::new(-4.0, 0.5, 2.0);
        let lhs = skew(a) * b;
        let rhs = a.cross(b);
        assert!((lhs - rhs).length() < 1e-6);
    }

    #[test]
    fn test_transform_inverse_round_trip() {
        let xf = Transform::new(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_axis_angle(Vec3::Y, 0.7),
        );
        let p = Vec3::new(-0.3, 4.0, 2.5);
        let back = xf.inverse_transform_point(xf.transform_point(p));
        assert!((back - p).length() < 1e-5);

        let composed = xf.inverse() * xf;
        assert!(composed.position.length() < 1e-5);
    }

    #[test]
    fn test_inverse_or_zero_singular() {
        let m = Mat3::from_cols(Vec3::X, Vec3::X, Vec3::Z);
        assert_eq!(inverse_or_zero(m), Mat3::ZERO);

        let m = Mat3::from_diagonal(Vec3::new(2.0, 4.0, 8.0));
        let inv = inverse_or_zero(m);
        assert!((inv.x_axis.x - 0.5).abs() < 1e-6);
        assert!((inv.z_axis.z - 0.125).abs() < 1e-6);
    }

    #[test]
    fn test_solve22_singular_returns_zero() {
        let x = solve22(Vec2::new(1.0, 2.0), Vec2::new(2.0, 4.0), Vec2::new(1.0, 1.0));
        assert_eq!(x, Vec2::ZERO);

        let x = solve22(Vec2::new(2.0, 0.0), Vec2::new(0.0, 4.0), Vec2::new(2.0, 2.0));
        assert!((x - Vec2::new(1.0, 0.5)).length() < 1e-6);
    }

    #[test]
    fn test_solve33() {
        let a = Mat3::from_cols(
            Vec3::new(2.0, 0.0, 1.0),
            Vec3::new(0.0, 3.0, 0.0),
            Vec3::new(1.0, 0.0, 2.0),
        );
        let x = Vec3::new(1.0, -1.0, 0.5);
        let b = a * x;
        assert!((solve33(a, b) - x).length() < 1e-5);
    }

    #[test]
    fn test_integrate_rotation_stays_normalized() {
        let mut q = Quat::IDENTITY;
        for _ in 0..100 {
            q = integrate_rotation(q, Vec3::new(0.0, 3.0, 1.0), 1.0 / 60.0);
        }
        assert!((q.length() - 1.0).abs() < 1e-5);
    }
}
