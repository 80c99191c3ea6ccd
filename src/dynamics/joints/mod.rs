//! Joints between bodies, or between a body and the world.

mod distance;
mod mouse;
mod sphere;

pub use distance::{DistanceJoint, DistanceJointDef};
pub use mouse::{MouseJoint, MouseJointDef};
pub use sphere::{SphereJoint, SphereJointDef};

use super::solver::{Constraint, SolverData};

#[derive(Debug, Clone)]
pub enum Joint {
    Mouse(MouseJoint),
    Sphere(SphereJoint),
    Distance(DistanceJoint),
}

impl Joint {
    /// Bodies the joint connects. Single-body joints report the body twice.
    pub fn bodies(&self) -> (usize, usize) {
        match self {
            Joint::Mouse(j) => (j.body(), j.body()),
            Joint::Sphere(j) => j.bodies(),
            Joint::Distance(j) => j.bodies(),
        }
    }

    pub fn as_mouse(&self) -> Option<&MouseJoint> {
        match self {
            Joint::Mouse(j) => Some(j),
            _ => None,
        }
    }

    pub fn as_mouse_mut(&mut self) -> Option<&mut MouseJoint> {
        match self {
            Joint::Mouse(j) => Some(j),
            _ => None,
        }
    }
}

impl Constraint for Joint {
    fn initialize_constraints(&mut self, data: &SolverData) {
        match self {
            Joint::Mouse(j) => j.initialize_constraints(data),
            Joint::Sphere(j) => j.initialize_constraints(data),
            Joint::Distance(j) => j.initialize_constraints(data),
        }
    }

    fn warm_start(&mut self, data: &mut SolverData) {
        match self {
            Joint::Mouse(j) => j.warm_start(data),
            Joint::Sphere(j) => j.warm_start(data),
            Joint::Distance(j) => j.warm_start(data),
        }
    }

    fn solve_velocity_constraints(&mut self, data: &mut SolverData) {
        match self {
            Joint::Mouse(j) => j.solve_velocity_constraints(data),
            Joint::Sphere(j) => j.solve_velocity_constraints(data),
            Joint::Distance(j) => j.solve_velocity_constraints(data),
        }
    }

    fn solve_position_constraints(&mut self, data: &mut SolverData) -> bool {
        match self {
            Joint::Mouse(j) => j.solve_position_constraints(data),
            Joint::Sphere(j) => j.solve_position_constraints(data),
            Joint::Distance(j) => j.solve_position_constraints(data),
        }
    }
}
