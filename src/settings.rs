//! Global tunables shared by collision and the solver.
//!
//! Lengths are in meters, angles in radians.

use std::f32::consts::PI;

/// Collision and constraint tolerance. Chosen to be small relative to the
/// smallest expected body size.
pub const LINEAR_SLOP: f32 = 0.01;

/// Angular counterpart of [`LINEAR_SLOP`].
pub const ANGULAR_SLOP: f32 = 2.0 / 180.0 * PI;

/// Fraction of positional error removed per step.
pub const BAUMGARTE: f32 = 0.1;

/// Relative normal velocity below which collisions are treated as inelastic.
pub const VELOCITY_THRESHOLD: f32 = 1.0;

/// Maximum translation of a body per step.
pub const MAX_TRANSLATION: f32 = 2.0;
pub const MAX_TRANSLATION_SQUARED: f32 = MAX_TRANSLATION * MAX_TRANSLATION;

/// Maximum rotation of a body per step.
pub const MAX_ROTATION: f32 = 0.5 * PI;
pub const MAX_ROTATION_SQUARED: f32 = MAX_ROTATION * MAX_ROTATION;

/// Maximum linear position correction in one position iteration.
pub const MAX_LINEAR_CORRECTION: f32 = 0.2;

/// Maximum angular position correction in one position iteration.
pub const MAX_ANGULAR_CORRECTION: f32 = 8.0 / 180.0 * PI;

/// Contact points are produced up to this separation so the solver can
/// stop approaching bodies before they touch.
pub const SPECULATIVE_DISTANCE: f32 = 4.0 * LINEAR_SLOP;

/// Maximum number of points in a contact manifold.
pub const MAX_MANIFOLD_POINTS: usize = 4;

/// Hull features are addressed with `u8`, with `0xFF` reserved.
pub const MAX_HULL_FEATURES: usize = 255;

/// GJK iteration cap.
pub const GJK_MAX_ITERATIONS: u32 = 20;

/// Minimum progress along the search direction before GJK stops.
pub const GJK_TOLERANCE: f32 = 1.0e-6;

/// Time a body must rest before it is put to sleep.
pub const TIME_TO_SLEEP: f32 = 0.2;

/// Linear speed below which a body counts as resting.
pub const SLEEP_LINEAR_TOLERANCE: f32 = 0.05;

/// Angular speed below which a body counts as resting.
pub const SLEEP_ANGULAR_TOLERANCE: f32 = 2.0 / 180.0 * PI;
