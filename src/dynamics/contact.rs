//! Persistent contact between two bodies.

use tracing::trace;

use super::body::Body;
use crate::collision::collide::collide;
use crate::collision::gjk::SimplexCache;
use crate::collision::manifold::Manifold;

/// Contact state for one body pair. Survives across steps while the pair's
/// bounding boxes overlap, carrying the GJK cache and the accumulated
/// impulses of each manifold point.
#[derive(Debug, Clone)]
pub struct Contact {
    pub body_a: usize,
    pub body_b: usize,
    pub friction: f32,
    pub restitution: f32,
    pub manifold: Manifold,
    pub cache: SimplexCache,
}

impl Contact {
    pub fn new(body_a: usize, body_b: usize, a: &Body, b: &Body) -> Self {
        Self {
            body_a,
            body_b,
            friction: (a.friction + b.friction) * 0.5,
            restitution: (a.restitution + b.restitution) * 0.5,
            manifold: Manifold::default(),
            cache: SimplexCache::default(),
        }
    }

    /// Whether the last update produced contact points.
    #[inline]
    pub fn is_touching(&self) -> bool {
        !self.manifold.is_empty()
    }

    /// Recompute the manifold from the bodies' current poses and carry over
    /// impulses from matching points.
    pub fn update(&mut self, a: &Body, b: &Body) {
        let old = self.manifold;
        self.manifold = collide(
            &a.transform,
            &a.shape,
            &b.transform,
            &b.shape,
            &mut self.cache,
        );
        self.manifold.transfer_impulses(&old);

        if old.is_empty() != self.manifold.is_empty() {
            trace!(
                body_a = self.body_a,
                body_b = self.body_b,
                touching = self.is_touching(),
                "contact state changed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::shapes::Shape;
    use glam::Vec3;

    #[test]
    fn test_update_keeps_impulses() {
        let ground = Body::new_static(Shape::cuboid(Vec3::new(5.0, 0.5, 5.0)))
            .with_position(Vec3::new(0.0, -0.5, 0.0));
        let block = Body::new_dynamic(Shape::cuboid(Vec3::splat(0.5)), 1.0)
            .with_position(Vec3::new(0.0, 0.49, 0.0));

        let mut contact = Contact::new(0, 1, &ground, &block);
        contact.update(&ground, &block);
        assert!(contact.is_touching());
        for p in contact.manifold.points_mut() {
            p.normal_impulse = 1.5;
        }

        contact.update(&ground, &block);
        assert!(contact
            .manifold
            .points()
            .iter()
            .all(|p| (p.normal_impulse - 1.5).abs() < 1e-6));
    }

    #[test]
    fn test_material_mixing() {
        let a = Body::new_static(Shape::sphere(1.0)).with_friction(0.2).with_restitution(0.0);
        let b = Body::new_dynamic(Shape::sphere(1.0), 1.0)
            .with_friction(0.6)
            .with_restitution(0.5);
        let contact = Contact::new(0, 1, &a, &b);
        assert!((contact.friction - 0.4).abs() < 1e-6);
        assert!((contact.restitution - 0.25).abs() < 1e-6);
    }
}
