//! Collision detection.
//!
//! # Architecture
//!
//! 1. **shapes** - Sphere, capsule and convex hull shapes with bounds and mass
//! 2. **hull** - Half-edge convex polyhedra
//! 3. **distance** - Closest-point queries on planes, segments and triangles
//! 4. **gjk** - Distance between convex proxies with a warm-startable simplex cache
//! 5. **clip** - Sutherland-Hodgman clipping with feature-pair bookkeeping
//! 6. **manifold** - Contact manifolds and impulse transfer
//! 7. **collide** - Per-pair manifold generators

pub mod clip;
pub mod collide;
pub mod distance;
pub mod gjk;
pub mod hull;
pub mod manifold;
pub mod shapes;

pub use collide::collide;
pub use gjk::{gjk, gjk_cached, GjkOutput, GjkProxy, SimplexCache};
pub use hull::Hull;
pub use manifold::{Manifold, ManifoldPoint};
pub use shapes::{Aabb, Capsule, Shape, Sphere};
