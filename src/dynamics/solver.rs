//! Island-local solver state and the constraint contract.
//!
//! Bodies are addressed by island-local index into flat position and
//! velocity arrays. Constraints never hold references to bodies.

use glam::{Mat3, Quat, Vec3};

/// Body pose: center of mass and orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: Vec3,
    pub q: Quat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Velocity {
    pub v: Vec3,
    pub w: Vec3,
}

/// Mass data frozen for the duration of a step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverBody {
    pub inv_mass: f32,
    /// World-space inverse inertia at the start of the step.
    pub inv_inertia: Mat3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeStep {
    pub dt: f32,
    pub inv_dt: f32,
    pub velocity_iterations: u32,
    pub position_iterations: u32,
    pub warm_starting: bool,
}

impl TimeStep {
    pub fn new(dt: f32, velocity_iterations: u32, position_iterations: u32) -> Self {
        Self {
            dt,
            inv_dt: if dt > 0.0 { 1.0 / dt } else { 0.0 },
            velocity_iterations,
            position_iterations,
            warm_starting: true,
        }
    }
}

/// Sentinel for bodies that are not part of the island.
pub const NOT_IN_ISLAND: usize = usize::MAX;

/// Everything a constraint may touch during one island step.
pub struct SolverData<'a> {
    pub step: TimeStep,
    pub positions: &'a mut [Position],
    pub velocities: &'a mut [Velocity],
    pub bodies: &'a [SolverBody],
    /// Maps world body ids to island-local indices.
    pub island_index: &'a [usize],
}

impl SolverData<'_> {
    /// Island-local index of world body `body`.
    #[inline]
    pub fn index_of(&self, body: usize) -> usize {
        let index = self.island_index[body];
        debug_assert!(index != NOT_IN_ISLAND, "body {body} is not in the island");
        index
    }
}

/// The four phases every constraint goes through in one step.
///
/// The island calls them in order: initialize, warm start, velocity
/// iterations, then position iterations until every constraint reports it
/// is satisfied.
pub trait Constraint {
    /// Cache anchors and effective masses for this step.
    fn initialize_constraints(&mut self, data: &SolverData);

    /// Apply the impulse accumulated in the previous step.
    fn warm_start(&mut self, data: &mut SolverData);

    fn solve_velocity_constraints(&mut self, data: &mut SolverData);

    /// Returns true when the positional error is within tolerance.
    fn solve_position_constraints(&mut self, data: &mut SolverData) -> bool;
}
