//! Drags one body's anchor toward a world target with bounded force.

use glam::{Mat3, Vec3};

use crate::dynamics::body::Body;
use crate::dynamics::solver::{Constraint, SolverData};
use crate::error::{PhysicsError, Result};
use crate::math::{inverse_or_zero, skew};
use crate::settings::BAUMGARTE;

#[derive(Debug, Clone, Copy)]
pub struct MouseJointDef {
    pub body: usize,
    /// World point grabbed on the body. Also the initial target.
    pub target: Vec3,
    /// Upper bound on the force the joint may apply.
    pub max_force: f32,
}

#[derive(Debug, Clone)]
pub struct MouseJoint {
    body: usize,
    target: Vec3,
    local_anchor: Vec3,
    max_force: f32,
    impulse: Vec3,

    // Per-step solver state.
    index: usize,
    inv_mass: f32,
    inv_inertia: Mat3,
    r: Vec3,
    c: Vec3,
    mass: Mat3,
}

impl MouseJoint {
    pub fn new(def: &MouseJointDef, body: &Body) -> Result<Self> {
        if !def.max_force.is_finite() || def.max_force < 0.0 {
            return Err(PhysicsError::InvalidJoint(
                "mouse joint max force must be finite and non-negative",
            ));
        }
        Ok(Self {
            body: def.body,
            target: def.target,
            local_anchor: body.transform.inverse_transform_point(def.target),
            max_force: def.max_force,
            impulse: Vec3::ZERO,
            index: 0,
            inv_mass: 0.0,
            inv_inertia: Mat3::ZERO,
            r: Vec3::ZERO,
            c: Vec3::ZERO,
            mass: Mat3::ZERO,
        })
    }

    #[inline]
    pub fn body(&self) -> usize {
        self.body
    }

    #[inline]
    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn set_target(&mut self, target: Vec3) {
        self.target = target;
    }

    #[inline]
    pub fn max_force(&self) -> f32 {
        self.max_force
    }

    /// Anchor in the body frame.
    #[inline]
    pub fn local_anchor(&self) -> Vec3 {
        self.local_anchor
    }

    /// Anchor in world space for the given body pose.
    pub fn anchor(&self, body: &Body) -> Vec3 {
        body.transform.transform_point(self.local_anchor)
    }

    /// Accumulated impulse of the last step.
    #[inline]
    pub fn impulse(&self) -> Vec3 {
        self.impulse
    }

    pub fn reaction_force(&self, inv_dt: f32) -> Vec3 {
        inv_dt * self.impulse
    }
}

impl Constraint for MouseJoint {
    fn initialize_constraints(&mut self, data: &SolverData) {
        self.index = data.index_of(self.body);
        let body = &data.bodies[self.index];
        self.inv_mass = body.inv_mass;
        self.inv_inertia = body.inv_inertia;

        let pos = data.positions[self.index];
        let anchor = pos.x + pos.q * self.local_anchor;
        self.c = anchor - self.target;
        self.r = anchor - pos.x;

        let rs = skew(self.r);
        let k = Mat3::from_diagonal(Vec3::splat(self.inv_mass))
            + rs * self.inv_inertia * rs.transpose();
        self.mass = inverse_or_zero(k);

        if !data.step.warm_starting {
            self.impulse = Vec3::ZERO;
        }
    }

    fn warm_start(&mut self, data: &mut SolverData) {
        let vel = &mut data.velocities[self.index];
        vel.v += self.inv_mass * self.impulse;
        vel.w += self.inv_inertia * self.r.cross(self.impulse);
    }

    fn solve_velocity_constraints(&mut self, data: &mut SolverData) {
        let mut vel = data.velocities[self.index];

        let cdot = vel.v + vel.w.cross(self.r);
        let bias = BAUMGARTE * data.step.inv_dt * self.c;
        let impulse = self.mass * -(cdot + bias);

        let old = self.impulse;
        self.impulse += impulse;
        let max_impulse = data.step.dt * self.max_force;
        let length_sq = self.impulse.length_squared();
        if length_sq > max_impulse * max_impulse {
            self.impulse *= max_impulse / length_sq.sqrt();
        }
        let impulse = self.impulse - old;

        vel.v += self.inv_mass * impulse;
        vel.w += self.inv_inertia * self.r.cross(impulse);
        data.velocities[self.index] = vel;
    }

    fn solve_position_constraints(&mut self, _data: &mut SolverData) -> bool {
        true
    }
}
