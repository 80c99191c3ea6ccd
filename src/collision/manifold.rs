//! Contact manifolds: up to four points sharing one normal.

use glam::{Vec2, Vec3};

use super::clip::{make_key, FeaturePair};
use crate::math::Transform;
use crate::settings::MAX_MANIFOLD_POINTS;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ManifoldPoint {
    /// Contact point on A's surface, in A's frame.
    pub local_point_a: Vec3,
    /// Contact point on B's surface, in B's frame.
    pub local_point_b: Vec3,
    /// Midpoint of the two surface points, world space.
    pub position: Vec3,
    /// Signed gap along the normal. Negative when penetrating.
    pub separation: f32,
    /// Accumulated normal impulse, kept for warm starting.
    pub normal_impulse: f32,
    /// Accumulated friction impulse along the two tangents.
    pub tangent_impulse: Vec2,
    /// Packed feature pair identifying this point across steps.
    pub key: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Manifold {
    pub points: [ManifoldPoint; MAX_MANIFOLD_POINTS],
    pub point_count: usize,
    /// World normal pointing from A to B.
    pub normal: Vec3,
    /// The normal in A's frame, used to re-evaluate separation as bodies move.
    pub local_normal_a: Vec3,
}

impl Manifold {
    pub fn new(xf_a: &Transform, normal: Vec3) -> Self {
        Self {
            normal,
            local_normal_a: xf_a.inverse_transform_vector(normal),
            ..Self::default()
        }
    }

    #[inline]
    pub fn points(&self) -> &[ManifoldPoint] {
        &self.points[..self.point_count]
    }

    #[inline]
    pub fn points_mut(&mut self) -> &mut [ManifoldPoint] {
        &mut self.points[..self.point_count]
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.point_count == 0
    }

    /// Add a contact from surface points on A and B, both in world space.
    /// Points past capacity are dropped.
    pub fn add_point(
        &mut self,
        xf_a: &Transform,
        xf_b: &Transform,
        point_a: Vec3,
        point_b: Vec3,
        key: u32,
    ) {
        if self.point_count == MAX_MANIFOLD_POINTS {
            return;
        }
        self.points[self.point_count] = ManifoldPoint {
            local_point_a: xf_a.inverse_transform_point(point_a),
            local_point_b: xf_b.inverse_transform_point(point_b),
            position: 0.5 * (point_a + point_b),
            separation: (point_b - point_a).dot(self.normal),
            normal_impulse: 0.0,
            tangent_impulse: Vec2::ZERO,
            key,
        };
        self.point_count += 1;
    }

    /// The same contact seen with A and B exchanged. `xf_a` is the transform
    /// of the new A.
    pub fn flipped(&self, xf_a: &Transform) -> Manifold {
        let mut out = Manifold::new(xf_a, -self.normal);
        out.point_count = self.point_count;
        for (dst, src) in out.points.iter_mut().zip(self.points()) {
            *dst = ManifoldPoint {
                local_point_a: src.local_point_b,
                local_point_b: src.local_point_a,
                key: make_key(FeaturePair::from_key(src.key).swapped()),
                ..*src
            };
        }
        out
    }

    /// Carry accumulated impulses over from the previous step's manifold,
    /// matching points by feature key. Unmatched points start cold.
    pub fn transfer_impulses(&mut self, old: &Manifold) {
        for point in self.points_mut() {
            if let Some(prev) = old.points().iter().find(|p| p.key == point.key) {
                point.normal_impulse = prev.normal_impulse;
                point.tangent_impulse = prev.tangent_impulse;
            }
        }
    }

    /// Deepest separation, or `f32::MAX` when empty.
    pub fn min_separation(&self) -> f32 {
        self.points()
            .iter()
            .map(|p| p.separation)
            .fold(f32::MAX, f32::min)
    }
}
