//! Keeps two anchors at a fixed distance.

use glam::{Mat3, Vec3};

use crate::dynamics::body::Body;
use crate::dynamics::solver::{Constraint, SolverData};
use crate::error::{PhysicsError, Result};
use crate::math::integrate_rotation;
use crate::settings::{LINEAR_SLOP, MAX_LINEAR_CORRECTION};

#[derive(Debug, Clone, Copy)]
pub struct DistanceJointDef {
    pub body_a: usize,
    pub body_b: usize,
    /// World anchor on A at creation time.
    pub anchor_a: Vec3,
    /// World anchor on B at creation time.
    pub anchor_b: Vec3,
}

#[derive(Debug, Clone)]
pub struct DistanceJoint {
    body_a: usize,
    body_b: usize,
    local_anchor_a: Vec3,
    local_anchor_b: Vec3,
    length: f32,
    impulse: f32,

    index_a: usize,
    index_b: usize,
    inv_mass_a: f32,
    inv_mass_b: f32,
    inv_inertia_a: Mat3,
    inv_inertia_b: Mat3,
    r_a: Vec3,
    r_b: Vec3,
    u: Vec3,
    mass: f32,
}

fn axial_mass(
    m_a: f32,
    i_a: &Mat3,
    r_a: Vec3,
    m_b: f32,
    i_b: &Mat3,
    r_b: Vec3,
    u: Vec3,
) -> f32 {
    let ra_u = r_a.cross(u);
    let rb_u = r_b.cross(u);
    let k = m_a + m_b + ra_u.dot(*i_a * ra_u) + rb_u.dot(*i_b * rb_u);
    if k > 0.0 {
        1.0 / k
    } else {
        0.0
    }
}

impl DistanceJoint {
    /// The rest length is the distance between the two anchors.
    pub fn new(def: &DistanceJointDef, a: &Body, b: &Body) -> Result<Self> {
        if def.body_a == def.body_b {
            return Err(PhysicsError::InvalidJoint("joint connects a body to itself"));
        }
        let length = def.anchor_a.distance(def.anchor_b);
        if !length.is_finite() || length < LINEAR_SLOP {
            return Err(PhysicsError::InvalidJoint("distance joint length must be positive"));
        }
        Ok(Self {
            body_a: def.body_a,
            body_b: def.body_b,
            local_anchor_a: a.transform.inverse_transform_point(def.anchor_a),
            local_anchor_b: b.transform.inverse_transform_point(def.anchor_b),
            length,
            impulse: 0.0,
            index_a: 0,
            index_b: 0,
            inv_mass_a: 0.0,
            inv_mass_b: 0.0,
            inv_inertia_a: Mat3::ZERO,
            inv_inertia_b: Mat3::ZERO,
            r_a: Vec3::ZERO,
            r_b: Vec3::ZERO,
            u: Vec3::ZERO,
            mass: 0.0,
        })
    }

    #[inline]
    pub fn bodies(&self) -> (usize, usize) {
        (self.body_a, self.body_b)
    }

    #[inline]
    pub fn length(&self) -> f32 {
        self.length
    }

    pub fn anchor_a(&self, a: &Body) -> Vec3 {
        a.transform.transform_point(self.local_anchor_a)
    }

    pub fn anchor_b(&self, b: &Body) -> Vec3 {
        b.transform.transform_point(self.local_anchor_b)
    }

    #[inline]
    pub fn impulse(&self) -> f32 {
        self.impulse
    }
}

impl Constraint for DistanceJoint {
    fn initialize_constraints(&mut self, data: &SolverData) {
        self.index_a = data.index_of(self.body_a);
        self.index_b = data.index_of(self.body_b);
        self.inv_mass_a = data.bodies[self.index_a].inv_mass;
        self.inv_mass_b = data.bodies[self.index_b].inv_mass;
        self.inv_inertia_a = data.bodies[self.index_a].inv_inertia;
        self.inv_inertia_b = data.bodies[self.index_b].inv_inertia;

        let pos_a = data.positions[self.index_a];
        let pos_b = data.positions[self.index_b];
        self.r_a = pos_a.q * self.local_anchor_a;
        self.r_b = pos_b.q * self.local_anchor_b;

        let d = pos_b.x + self.r_b - pos_a.x - self.r_a;
        self.u = d.normalize_or_zero();

        self.mass = axial_mass(
            self.inv_mass_a,
            &self.inv_inertia_a,
            self.r_a,
            self.inv_mass_b,
            &self.inv_inertia_b,
            self.r_b,
            self.u,
        );

        if !data.step.warm_starting {
            self.impulse = 0.0;
        }
    }

    fn warm_start(&mut self, data: &mut SolverData) {
        let p = self.impulse * self.u;
        let vel_a = &mut data.velocities[self.index_a];
        vel_a.v -= self.inv_mass_a * p;
        vel_a.w -= self.inv_inertia_a * self.r_a.cross(p);
        let vel_b = &mut data.velocities[self.index_b];
        vel_b.v += self.inv_mass_b * p;
        vel_b.w += self.inv_inertia_b * self.r_b.cross(p);
    }

    fn solve_velocity_constraints(&mut self, data: &mut SolverData) {
        let mut vel_a = data.velocities[self.index_a];
        let mut vel_b = data.velocities[self.index_b];

        let dv = vel_b.v + vel_b.w.cross(self.r_b) - vel_a.v - vel_a.w.cross(self.r_a);
        let impulse = -self.mass * dv.dot(self.u);
        self.impulse += impulse;

        let p = impulse * self.u;
        vel_a.v -= self.inv_mass_a * p;
        vel_a.w -= self.inv_inertia_a * self.r_a.cross(p);
        vel_b.v += self.inv_mass_b * p;
        vel_b.w += self.inv_inertia_b * self.r_b.cross(p);

        data.velocities[self.index_a] = vel_a;
        data.velocities[self.index_b] = vel_b;
    }

    fn solve_position_constraints(&mut self, data: &mut SolverData) -> bool {
        let mut pos_a = data.positions[self.index_a];
        let mut pos_b = data.positions[self.index_b];

        let r_a = pos_a.q * self.local_anchor_a;
        let r_b = pos_b.q * self.local_anchor_b;
        let d = pos_b.x + r_b - pos_a.x - r_a;
        let current = d.length();
        let u = d.normalize_or_zero();

        let error = current - self.length;
        let c = error.clamp(-MAX_LINEAR_CORRECTION, MAX_LINEAR_CORRECTION);
        let mass = axial_mass(
            self.inv_mass_a,
            &self.inv_inertia_a,
            r_a,
            self.inv_mass_b,
            &self.inv_inertia_b,
            r_b,
            u,
        );
        let p = (-mass * c) * u;

        pos_a.x -= self.inv_mass_a * p;
        pos_a.q = integrate_rotation(pos_a.q, -(self.inv_inertia_a * r_a.cross(p)), 1.0);
        pos_b.x += self.inv_mass_b * p;
        pos_b.q = integrate_rotation(pos_b.q, self.inv_inertia_b * r_b.cross(p), 1.0);

        data.positions[self.index_a] = pos_a;
        data.positions[self.index_b] = pos_b;

        error.abs() < LINEAR_SLOP
    }
}
