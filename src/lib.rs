//! Rein Physics
//!
//! A 3D rigid-body physics core: convex collision detection and a
//! sequential-impulse constraint solver.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! 1. **math** / **geometry** - Transforms, planes, barycentric coordinates, small solves
//! 2. **settings** - Tolerances and solver tunables
//! 3. **collision** - Shapes, GJK, clipping and contact manifolds
//! 4. **dynamics** - Bodies, contacts, joints and the island solver
//! 5. **world** - Pair search, island building and the fixed-step loop
//!
//! # Example
//!
//! ```
//! use rein_physics::{Body, PhysicsConfig, PhysicsWorld, Shape};
//! use rein_physics::glam::Vec3;
//!
//! let mut world = PhysicsWorld::new(PhysicsConfig::default());
//! world.create_body(
//!     Body::new_static(Shape::cuboid(Vec3::new(5.0, 0.5, 5.0)))
//!         .with_position(Vec3::new(0.0, -0.5, 0.0)),
//! );
//! let id = world.create_body(
//!     Body::new_dynamic(Shape::cuboid(Vec3::splat(0.5)), 1.0)
//!         .with_position(Vec3::new(0.0, 2.0, 0.0)),
//! );
//!
//! for _ in 0..60 {
//!     world.step(1.0 / 60.0);
//! }
//! assert!(world.body(id).unwrap().transform.position.y < 2.0);
//! ```

pub mod collision;
pub mod dynamics;
pub mod error;
pub mod geometry;
pub mod math;
pub mod settings;
pub mod world;

// Re-export commonly used types
pub use collision::{collide, gjk, Aabb, Capsule, GjkOutput, Hull, Manifold, Shape, Sphere};
pub use dynamics::{
    Body, BodyType, Contact, DistanceJointDef, Joint, MouseJointDef, SphereJointDef,
};
pub use error::{PhysicsError, Result};
pub use geometry::Plane;
pub use math::Transform;
pub use world::{PhysicsConfig, PhysicsWorld};

// Re-export glam for convenience
pub use glam;
