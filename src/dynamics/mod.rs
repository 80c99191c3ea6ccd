//! Rigid bodies, contacts, joints and the island solver.

pub mod body;
pub mod contact;
pub mod contact_solver;
pub mod island;
pub mod joints;
pub mod solver;

pub use body::{Body, BodyType};
pub use contact::Contact;
pub use contact_solver::ContactSolver;
pub use island::{Island, IslandReport};
pub use joints::{
    DistanceJoint, DistanceJointDef, Joint, MouseJoint, MouseJointDef, SphereJoint, SphereJointDef,
};
pub use solver::{Constraint, Position, SolverBody, SolverData, TimeStep, Velocity};
