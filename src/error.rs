//! Error types for fallible construction APIs.
//!
//! The numeric core never fails: degenerate geometry falls back to a
//! well-defined answer. Errors only surface when building hulls, bodies and
//! joints from user input.

use thiserror::Error;

/// Errors reported by hull builders, the world and joint constructors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PhysicsError {
    /// A hull needs more vertices, edges or faces than `u8` indices can name.
    #[error("hull has {count} {feature}, at most {max} are supported")]
    HullTooComplex {
        /// Which feature overflowed ("vertices", "half-edges" or "faces").
        feature: &'static str,
        count: usize,
        max: usize,
    },

    /// The hull input cannot bound a volume.
    #[error("degenerate hull: {details}")]
    DegenerateHull {
        /// Description of the degeneracy.
        details: String,
    },

    /// An edge is used by only one face.
    #[error("open hull: edge {from} -> {to} has no twin")]
    OpenHull { from: usize, to: usize },

    /// An edge is used by more than two faces, or twice in the same direction.
    #[error("non-manifold hull: edge {from} -> {to} is shared more than once")]
    NonManifoldEdge { from: usize, to: usize },

    /// A half-edge breaks a topological invariant.
    #[error("invalid half-edge {edge}: {reason}")]
    InvalidHalfEdge { edge: usize, reason: &'static str },

    /// A body index does not name a body in the world.
    #[error("body {index} out of range ({count} bodies)")]
    BodyOutOfRange { index: usize, count: usize },

    /// A joint definition is rejected.
    #[error("invalid joint: {0}")]
    InvalidJoint(&'static str),
}

/// Result type for physics construction APIs.
pub type Result<T> = std::result::Result<T, PhysicsError>;
