//! Point-to-point joint: an anchor on each body held at the same place.

use glam::{Mat3, Vec3};

use crate::dynamics::body::Body;
use crate::dynamics::solver::{Constraint, SolverData};
use crate::error::{PhysicsError, Result};
use crate::math::{integrate_rotation, inverse_or_zero, skew, solve33};
use crate::settings::LINEAR_SLOP;

#[derive(Debug, Clone, Copy)]
pub struct SphereJointDef {
    pub body_a: usize,
    pub body_b: usize,
    /// Shared world anchor at creation time.
    pub anchor: Vec3,
}

#[derive(Debug, Clone)]
pub struct SphereJoint {
    body_a: usize,
    body_b: usize,
    local_anchor_a: Vec3,
    local_anchor_b: Vec3,
    impulse: Vec3,

    index_a: usize,
    index_b: usize,
    inv_mass_a: f32,
    inv_mass_b: f32,
    inv_inertia_a: Mat3,
    inv_inertia_b: Mat3,
    r_a: Vec3,
    r_b: Vec3,
    mass: Mat3,
}

/// `K = (mA + mB)·I + [rA]·IA·[rA]ᵀ + [rB]·IB·[rB]ᵀ`
fn point_mass_matrix(m_a: f32, i_a: &Mat3, r_a: Vec3, m_b: f32, i_b: &Mat3, r_b: Vec3) -> Mat3 {
    let ra = skew(r_a);
    let rb = skew(r_b);
    Mat3::from_diagonal(Vec3::splat(m_a + m_b))
        + ra * *i_a * ra.transpose()
        + rb * *i_b * rb.transpose()
}

impl SphereJoint {
    pub fn new(def: &SphereJointDef, a: &Body, b: &Body) -> Result<Self> {
        if def.body_a == def.body_b {
            return Err(PhysicsError::InvalidJoint("joint connects a body to itself"));
        }
        Ok(Self {
            body_a: def.body_a,
            body_b: def.body_b,
            local_anchor_a: a.transform.inverse_transform_point(def.anchor),
            local_anchor_b: b.transform.inverse_transform_point(def.anchor),
            impulse: Vec3::ZERO,
            index_a: 0,
            index_b: 0,
            inv_mass_a: 0.0,
            inv_mass_b: 0.0,
            inv_inertia_a: Mat3::ZERO,
            inv_inertia_b: Mat3::ZERO,
            r_a: Vec3::ZERO,
            r_b: Vec3::ZERO,
            mass: Mat3::ZERO,
        })
    }

    #[inline]
    pub fn bodies(&self) -> (usize, usize) {
        (self.body_a, self.body_b)
    }

    pub fn anchor_a(&self, a: &Body) -> Vec3 {
        a.transform.transform_point(self.local_anchor_a)
    }

    pub fn anchor_b(&self, b: &Body) -> Vec3 {
        b.transform.transform_point(self.local_anchor_b)
    }

    #[inline]
    pub fn impulse(&self) -> Vec3 {
        self.impulse
    }
}

impl Constraint for SphereJoint {
    fn initialize_constraints(&mut self, data: &SolverData) {
        self.index_a = data.index_of(self.body_a);
        self.index_b = data.index_of(self.body_b);
        self.inv_mass_a = data.bodies[self.index_a].inv_mass;
        self.inv_mass_b = data.bodies[self.index_b].inv_mass;
        self.inv_inertia_a = data.bodies[self.index_a].inv_inertia;
        self.inv_inertia_b = data.bodies[self.index_b].inv_inertia;

        let q_a = data.positions[self.index_a].q;
        let q_b = data.positions[self.index_b].q;
        self.r_a = q_a * self.local_anchor_a;
        self.r_b = q_b * self.local_anchor_b;

        self.mass = inverse_or_zero(point_mass_matrix(
            self.inv_mass_a,
            &self.inv_inertia_a,
            self.r_a,
            self.inv_mass_b,
            &self.inv_inertia_b,
            self.r_b,
        ));

        if !data.step.warm_starting {
            self.impulse = Vec3::ZERO;
        }
    }

    fn warm_start(&mut self, data: &mut SolverData) {
        let p = self.impulse;
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

        let cdot = vel_b.v + vel_b.w.cross(self.r_b) - vel_a.v - vel_a.w.cross(self.r_a);
        let impulse = self.mass * -cdot;
        self.impulse += impulse;

        vel_a.v -= self.inv_mass_a * impulse;
        vel_a.w -= self.inv_inertia_a * self.r_a.cross(impulse);
        vel_b.v += self.inv_mass_b * impulse;
        vel_b.w += self.inv_inertia_b * self.r_b.cross(impulse);

        data.velocities[self.index_a] = vel_a;
        data.velocities[self.index_b] = vel_b;
    }

    fn solve_position_constraints(&mut self, data: &mut SolverData) -> bool {
        let mut pos_a = data.positions[self.index_a];
        let mut pos_b = data.positions[self.index_b];

        let r_a = pos_a.q * self.local_anchor_a;
        let r_b = pos_b.q * self.local_anchor_b;
        let c = pos_b.x + r_b - pos_a.x - r_a;

        let k = point_mass_matrix(
            self.inv_mass_a,
            &self.inv_inertia_a,
            r_a,
            self.inv_mass_b,
            &self.inv_inertia_b,
            r_b,
        );
        let impulse = -solve33(k, c);

        pos_a.x -= self.inv_mass_a * impulse;
        pos_a.q = integrate_rotation(pos_a.q, -(self.inv_inertia_a * r_a.cross(impulse)), 1.0);
        pos_b.x += self.inv_mass_b * impulse;
        pos_b.q = integrate_rotation(pos_b.q, self.inv_inertia_b * r_b.cross(impulse), 1.0);

        data.positions[self.index_a] = pos_a;
        data.positions[self.index_b] = pos_b;

        c.length() <= LINEAR_SLOP
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::shapes::Shape;
    use crate::dynamics::solver::{Position, SolverBody, TimeStep, Velocity};

    #[test]
    fn test_rejects_self_joint() {
        let body = Body::new_dynamic(Shape::sphere(0.5), 1.0);
        let def = SphereJointDef {
            body_a: 3,
            body_b: 3,
            anchor: Vec3::ZERO,
        };
        assert!(SphereJoint::new(&def, &body, &body).is_err());
    }

    #[test]
    fn test_anchors_start_coincident() {
        let a = Body::new_dynamic(Shape::sphere(0.5), 1.0);
        let b = Body::new_dynamic(Shape::sphere(0.5), 1.0).with_position(Vec3::new(2.0, 0.0, 0.0));
        let def = SphereJointDef {
            body_a: 0,
            body_b: 1,
            anchor: Vec3::new(1.0, 0.0, 0.0),
        };
        let joint = SphereJoint::new(&def, &a, &b).unwrap();
        assert!((joint.anchor_a(&a) - joint.anchor_b(&b)).length() < 1e-6);
    }

    #[test]
    fn test_position_pass_pulls_anchors_together() {
        let a = Body::new_dynamic(Shape::sphere(0.5), 1.0);
        let b = Body::new_dynamic(Shape::sphere(0.5), 1.0).with_position(Vec3::new(1.0, 0.0, 0.0));
        let def = SphereJointDef {
            body_a: 0,
            body_b: 1,
            anchor: Vec3::new(0.5, 0.0, 0.0),
        };
        let mut joint = SphereJoint::new(&def, &a, &b).unwrap();

        // Pull B away so the anchors separate.
        let mut positions = [
            Position {
                x: a.transform.position,
                q: a.transform.rotation,
            },
            Position {
                x: Vec3::new(1.0, 0.3, 0.0),
                q: b.transform.rotation,
            },
        ];
        let mut velocities = [Velocity::default(); 2];
        let bodies = [
            SolverBody {
                inv_mass: a.inv_mass,
                inv_inertia: a.world_inv_inertia(),
            },
            SolverBody {
                inv_mass: b.inv_mass,
                inv_inertia: b.world_inv_inertia(),
            },
        ];
        let island_index = [0, 1];
        let mut data = SolverData {
            step: TimeStep::new(1.0 / 60.0, 8, 3),
            positions: &mut positions,
            velocities: &mut velocities,
            bodies: &bodies,
            island_index: &island_index,
        };

        joint.initialize_constraints(&data);
        let mut satisfied = false;
        for _ in 0..10 {
            satisfied = joint.solve_position_constraints(&mut data);
            if satisfied {
                break;
            }
        }
        assert!(satisfied);

        let pa = data.positions[0];
        let pb = data.positions[1];
        let anchor_a = pa.x + pa.q * joint.local_anchor_a;
        let anchor_b = pb.x + pb.q * joint.local_anchor_b;
        assert!((anchor_a - anchor_b).length() < 2.0 * LINEAR_SLOP);
    }

    #[test]
    fn test_velocity_pass_removes_relative_velocity() {
        let a = Body::new_dynamic(Shape::sphere(0.5), 1.0);
        let b = Body::new_dynamic(Shape::sphere(0.5), 1.0).with_position(Vec3::new(1.0, 0.0, 0.0));
        let def = SphereJointDef {
            body_a: 0,
            body_b: 1,
            anchor: Vec3::new(0.5, 0.0, 0.0),
        };
        let mut joint = SphereJoint::new(&def, &a, &b).unwrap();

        let mut positions = [
            Position {
                x: a.transform.position,
                q: a.transform.rotation,
            },
            Position {
                x: b.transform.position,
                q: b.transform.rotation,
            },
        ];
        let mut velocities = [
            Velocity::default(),
            Velocity {
                v: Vec3::new(0.0, 2.0, 0.0),
                w: Vec3::ZERO,
            },
        ];
        let bodies = [
            SolverBody {
                inv_mass: a.inv_mass,
                inv_inertia: a.world_inv_inertia(),
            },
            SolverBody {
                inv_mass: b.inv_mass,
                inv_inertia: b.world_inv_inertia(),
            },
        ];
        let island_index = [0, 1];
        let mut data = SolverData {
            step: TimeStep::new(1.0 / 60.0, 8, 3),
            positions: &mut positions,
            velocities: &mut velocities,
            bodies: &bodies,
            island_index: &island_index,
        };

        joint.initialize_constraints(&data);
        joint.solve_velocity_constraints(&mut data);

        let (va, vb) = (data.velocities[0], data.velocities[1]);
        let cdot = vb.v + vb.w.cross(joint.r_b) - va.v - va.w.cross(joint.r_a);
        assert!(cdot.length() < 1e-4);
        // Momentum is conserved.
        assert!((va.v + vb.v - Vec3::new(0.0, 2.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_cold_step_discards_previous_impulse() {
        let a = Body::new_dynamic(Shape::sphere(0.5), 1.0);
        let b =
            Body::new_dynamic(Shape::sphere(0.5), 1.0).with_position(Vec3::new(1.0, 0.0, 0.0));
        let def = SphereJointDef {
            body_a: 0,
            body_b: 1,
            anchor: Vec3::new(0.5, 0.0, 0.0),
        };
        let mut joint = SphereJoint::new(&def, &a, &b).unwrap();
        joint.impulse = Vec3::new(0.0, 3.0, 0.0);

        let mut positions = [
            Position {
                x: a.transform.position,
                q: a.transform.rotation,
            },
            Position {
                x: b.transform.position,
                q: b.transform.rotation,
            },
        ];
        let mut velocities = [Velocity::default(); 2];
        let bodies = [
            SolverBody {
                inv_mass: a.inv_mass,
                inv_inertia: a.world_inv_inertia(),
            },
            SolverBody {
                inv_mass: b.inv_mass,
                inv_inertia: b.world_inv_inertia(),
            },
        ];
        let island_index = [0, 1];
        let mut step = TimeStep::new(1.0 / 60.0, 8, 3);
        step.warm_starting = false;
        let data = SolverData {
            step,
            positions: &mut positions,
            velocities: &mut velocities,
            bodies: &bodies,
            island_index: &island_index,
        };

        joint.initialize_constraints(&data);
        assert_eq!(joint.impulse(), Vec3::ZERO);
    }
}
