//! Collision shapes and their bounding boxes and mass properties.
//!
//! Shapes are expressed in the body frame. The body origin is treated as
//! the center of mass.

use std::f32::consts::PI;
use std::sync::Arc;

use glam::{Mat3, Vec3};

use super::gjk::GjkProxy;
use super::hull::Hull;
use crate::math::Transform;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

/// A segment swept by a sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capsule {
    pub vertices: [Vec3; 2],
    pub radius: f32,
}

impl Capsule {
    /// A capsule centered at the origin along the Y axis.
    pub fn new_y(half_height: f32, radius: f32) -> Self {
        Self {
            vertices: [Vec3::new(0.0, -half_height, 0.0), Vec3::new(0.0, half_height, 0.0)],
            radius,
        }
    }
}

/// Collider shape attached to a body.
#[derive(Debug, Clone)]
pub enum Shape {
    Sphere(Sphere),
    Capsule(Capsule),
    Hull(Arc<Hull>),
}

impl Shape {
    pub fn sphere(radius: f32) -> Self {
        Shape::Sphere(Sphere {
            center: Vec3::ZERO,
            radius,
        })
    }

    pub fn capsule(half_height: f32, radius: f32) -> Self {
        Shape::Capsule(Capsule::new_y(half_height, radius))
    }

    pub fn cuboid(half_extents: Vec3) -> Self {
        Shape::Hull(Arc::new(Hull::cuboid(half_extents)))
    }

    /// Rounding radius around the core geometry.
    pub fn radius(&self) -> f32 {
        match self {
            Shape::Sphere(s) => s.radius,
            Shape::Capsule(c) => c.radius,
            Shape::Hull(_) => 0.0,
        }
    }

    /// World-space bounding box.
    pub fn compute_aabb(&self, xf: &Transform) -> Aabb {
        match self {
            Shape::Sphere(s) => {
                let c = xf.transform_point(s.center);
                Aabb {
                    min: c - Vec3::splat(s.radius),
                    max: c + Vec3::splat(s.radius),
                }
            }
            Shape::Capsule(c) => {
                let a = xf.transform_point(c.vertices[0]);
                let b = xf.transform_point(c.vertices[1]);
                Aabb {
                    min: a.min(b) - Vec3::splat(c.radius),
                    max: a.max(b) + Vec3::splat(c.radius),
                }
            }
            Shape::Hull(h) => {
                let mut min = Vec3::splat(f32::MAX);
                let mut max = Vec3::splat(f32::MIN);
                for v in &h.vertices {
                    let p = xf.transform_point(*v);
                    min = min.min(p);
                    max = max.max(p);
                }
                Aabb { min, max }
            }
        }
    }

    /// Mass and inertia about the body origin for the given density.
    pub fn mass_properties(&self, density: f32) -> (f32, Mat3) {
        match self {
            Shape::Sphere(s) => {
                let mass = density * 4.0 / 3.0 * PI * s.radius.powi(3);
                let inertia = Mat3::from_diagonal(Vec3::splat(0.4 * mass * s.radius * s.radius));
                (mass, inertia + steiner(mass, s.center))
            }
            Shape::Capsule(c) => capsule_mass_properties(c, density),
            Shape::Hull(h) => h.mass_properties(density),
        }
    }

    /// Shape as a GJK proxy.
    pub fn proxy(&self) -> &dyn GjkProxy {
        match self {
            Shape::Sphere(s) => s,
            Shape::Capsule(c) => c,
            Shape::Hull(h) => h.as_ref(),
        }
    }
}

fn capsule_mass_properties(c: &Capsule, density: f32) -> (f32, Mat3) {
    let axis = c.vertices[1] - c.vertices[0];
    let length = axis.length();
    let r = c.radius;
    let r2 = r * r;

    let cylinder = density * PI * r2 * length;
    let caps = density * 4.0 / 3.0 * PI * r2 * r;
    let mass = cylinder + caps;

    let along = cylinder * r2 * 0.5 + caps * 0.4 * r2;
    let across = cylinder * (length * length / 12.0 + r2 * 0.25)
        + caps * (0.4 * r2 + length * length * 0.25 + 0.375 * length * r);

    let u = axis.try_normalize().unwrap_or(Vec3::Y);
    let uu = Mat3::from_cols(u * u.x, u * u.y, u * u.z);
    let inertia = Mat3::from_diagonal(Vec3::splat(across)) + uu * (along - across);

    let center = 0.5 * (c.vertices[0] + c.vertices[1]);
    (mass, inertia + steiner(mass, center))
}

/// Parallel axis shift of inertia by `offset`.
fn steiner(mass: f32, offset: Vec3) -> Mat3 {
    let dd = offset.length_squared();
    let oo = Mat3::from_cols(offset * offset.x, offset * offset.y, offset * offset.z);
    (Mat3::from_diagonal(Vec3::splat(dd)) - oo) * mass
}

/// Axis-aligned bounding box used to filter candidate pairs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    pub fn inflated(&self, margin: f32) -> Aabb {
        Aabb {
            min: self.min - Vec3::splat(margin),
            max: self.max + Vec3::splat(margin),
        }
    }
}
