//! Sequential impulse solver for contact manifolds.
//!
//! Velocity pass: Coulomb friction on two tangents clamped to a circle,
//! then a non-negative normal impulse with restitution and a speculative
//! bias for points that have not touched yet. Position pass: pushes
//! penetration out with Baumgarte-scaled, clamped corrections.

use glam::{Mat3, Vec2, Vec3};

use super::contact::Contact;
use super::solver::{Constraint, SolverData};
use crate::math::integrate_rotation;
use crate::settings::{
    BAUMGARTE, LINEAR_SLOP, MAX_LINEAR_CORRECTION, MAX_MANIFOLD_POINTS, VELOCITY_THRESHOLD,
};

#[derive(Debug, Clone, Copy, Default)]
struct VelocityConstraintPoint {
    r_a: Vec3,
    r_b: Vec3,
    normal_impulse: f32,
    tangent_impulse: Vec2,
    normal_mass: f32,
    tangent_mass: Vec2,
    velocity_bias: f32,
}

#[derive(Debug, Clone)]
struct ContactVelocityConstraint {
    contact: usize,
    index_a: usize,
    index_b: usize,
    normal: Vec3,
    tangent1: Vec3,
    tangent2: Vec3,
    friction: f32,
    restitution: f32,
    points: [VelocityConstraintPoint; MAX_MANIFOLD_POINTS],
    point_count: usize,
}

#[derive(Debug, Clone)]
struct ContactPositionConstraint {
    index_a: usize,
    index_b: usize,
    local_normal_a: Vec3,
    local_points_a: [Vec3; MAX_MANIFOLD_POINTS],
    local_points_b: [Vec3; MAX_MANIFOLD_POINTS],
    point_count: usize,
}

/// Solver for every touching contact of one island.
#[derive(Debug, Default)]
pub struct ContactSolver {
    velocity_constraints: Vec<ContactVelocityConstraint>,
    position_constraints: Vec<ContactPositionConstraint>,
}

impl ContactSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy manifold data of the listed contacts into solver form.
    pub fn load(&mut self, contacts: &[Contact], ids: &[usize], data: &SolverData) {
        self.velocity_constraints.clear();
        self.position_constraints.clear();

        for &id in ids {
            let contact = &contacts[id];
            let manifold = &contact.manifold;
            let index_a = data.index_of(contact.body_a);
            let index_b = data.index_of(contact.body_b);

            let mut vc = ContactVelocityConstraint {
                contact: id,
                index_a,
                index_b,
                normal: manifold.normal,
                tangent1: Vec3::ZERO,
                tangent2: Vec3::ZERO,
                friction: contact.friction,
                restitution: contact.restitution,
                points: [VelocityConstraintPoint::default(); MAX_MANIFOLD_POINTS],
                point_count: manifold.point_count,
            };
            let mut pc = ContactPositionConstraint {
                index_a,
                index_b,
                local_normal_a: manifold.local_normal_a,
                local_points_a: [Vec3::ZERO; MAX_MANIFOLD_POINTS],
                local_points_b: [Vec3::ZERO; MAX_MANIFOLD_POINTS],
                point_count: manifold.point_count,
            };

            for (j, mp) in manifold.points().iter().enumerate() {
                let vcp = &mut vc.points[j];
                vcp.normal_impulse = if data.step.warm_starting { mp.normal_impulse } else { 0.0 };
                vcp.tangent_impulse = if data.step.warm_starting {
                    mp.tangent_impulse
                } else {
                    Vec2::ZERO
                };
                pc.local_points_a[j] = mp.local_point_a;
                pc.local_points_b[j] = mp.local_point_b;
            }

            self.velocity_constraints.push(vc);
            self.position_constraints.push(pc);
        }
    }

    /// Write accumulated impulses back into the manifolds for next step.
    pub fn store_impulses(&self, contacts: &mut [Contact]) {
        for vc in &self.velocity_constraints {
            let manifold = &mut contacts[vc.contact].manifold;
            for (mp, vcp) in manifold.points_mut().iter_mut().zip(&vc.points) {
                mp.normal_impulse = vcp.normal_impulse;
                mp.tangent_impulse = vcp.tangent_impulse;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.velocity_constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.velocity_constraints.is_empty()
    }
}

#[inline]
fn effective_mass(
    inv_mass: f32,
    inv_i_a: &Mat3,
    inv_i_b: &Mat3,
    r_a: Vec3,
    r_b: Vec3,
    axis: Vec3,
) -> f32 {
    let ra_x_n = r_a.cross(axis);
    let rb_x_n = r_b.cross(axis);
    let k = inv_mass + ra_x_n.dot(*inv_i_a * ra_x_n) + rb_x_n.dot(*inv_i_b * rb_x_n);
    if k > 0.0 {
        1.0 / k
    } else {
        0.0
    }
}

impl Constraint for ContactSolver {
    fn initialize_constraints(&mut self, data: &SolverData) {
        for (vc, pc) in self
            .velocity_constraints
            .iter_mut()
            .zip(&self.position_constraints)
        {
            let body_a = &data.bodies[vc.index_a];
            let body_b = &data.bodies[vc.index_b];
            let m_sum = body_a.inv_mass + body_b.inv_mass;

            let pos_a = data.positions[vc.index_a];
            let pos_b = data.positions[vc.index_b];
            let vel_a = data.velocities[vc.index_a];
            let vel_b = data.velocities[vc.index_b];

            let (t1, t2) = vc.normal.any_orthonormal_pair();
            vc.tangent1 = t1;
            vc.tangent2 = t2;

            for j in 0..vc.point_count {
                let p_a = pos_a.x + pos_a.q * pc.local_points_a[j];
                let p_b = pos_b.x + pos_b.q * pc.local_points_b[j];
                let point = 0.5 * (p_a + p_b);
                let separation = (p_b - p_a).dot(vc.normal);

                let vcp = &mut vc.points[j];
                vcp.r_a = point - pos_a.x;
                vcp.r_b = point - pos_b.x;

                let inv_i_a = &body_a.inv_inertia;
                let inv_i_b = &body_b.inv_inertia;
                vcp.normal_mass =
                    effective_mass(m_sum, inv_i_a, inv_i_b, vcp.r_a, vcp.r_b, vc.normal);
                vcp.tangent_mass = Vec2::new(
                    effective_mass(m_sum, inv_i_a, inv_i_b, vcp.r_a, vcp.r_b, t1),
                    effective_mass(m_sum, inv_i_a, inv_i_b, vcp.r_a, vcp.r_b, t2),
                );

                // Speculative points may close the gap within this step.
                vcp.velocity_bias = if separation > 0.0 {
                    -separation * data.step.inv_dt
                } else {
                    0.0
                };

                let dv = vel_b.v + vel_b.w.cross(vcp.r_b) - vel_a.v - vel_a.w.cross(vcp.r_a);
                let v_rel = dv.dot(vc.normal);
                if v_rel < -VELOCITY_THRESHOLD && vc.restitution > 0.0 {
                    vcp.velocity_bias = vcp.velocity_bias.max(-vc.restitution * v_rel);
                }
            }
        }
    }

    fn warm_start(&mut self, data: &mut SolverData) {
        for vc in &self.velocity_constraints {
            let m_a = data.bodies[vc.index_a].inv_mass;
            let i_a = data.bodies[vc.index_a].inv_inertia;
            let m_b = data.bodies[vc.index_b].inv_mass;
            let i_b = data.bodies[vc.index_b].inv_inertia;

            let mut vel_a = data.velocities[vc.index_a];
            let mut vel_b = data.velocities[vc.index_b];

            for vcp in &vc.points[..vc.point_count] {
                let p = vcp.normal_impulse * vc.normal
                    + vcp.tangent_impulse.x * vc.tangent1
                    + vcp.tangent_impulse.y * vc.tangent2;
                vel_a.v -= m_a * p;
                vel_a.w -= i_a * vcp.r_a.cross(p);
                vel_b.v += m_b * p;
                vel_b.w += i_b * vcp.r_b.cross(p);
            }

            data.velocities[vc.index_a] = vel_a;
            data.velocities[vc.index_b] = vel_b;
        }
    }

    fn solve_velocity_constraints(&mut self, data: &mut SolverData) {
        for vc in &mut self.velocity_constraints {
            let m_a = data.bodies[vc.index_a].inv_mass;
            let i_a = data.bodies[vc.index_a].inv_inertia;
            let m_b = data.bodies[vc.index_b].inv_mass;
            let i_b = data.bodies[vc.index_b].inv_inertia;

            let mut vel_a = data.velocities[vc.index_a];
            let mut vel_b = data.velocities[vc.index_b];

            let normal = vc.normal;
            let (t1, t2) = (vc.tangent1, vc.tangent2);

            for vcp in &mut vc.points[..vc.point_count] {
                // Friction first: its bound depends on the normal impulse.
                let dv = vel_b.v + vel_b.w.cross(vcp.r_b) - vel_a.v - vel_a.w.cross(vcp.r_a);
                let lambda = Vec2::new(
                    -vcp.tangent_mass.x * dv.dot(t1),
                    -vcp.tangent_mass.y * dv.dot(t2),
                );

                let max_friction = vc.friction * vcp.normal_impulse;
                let old = vcp.tangent_impulse;
                let mut accumulated = old + lambda;
                let length_sq = accumulated.length_squared();
                if length_sq > max_friction * max_friction {
                    accumulated = if length_sq > 0.0 {
                        accumulated * (max_friction / length_sq.sqrt())
                    } else {
                        Vec2::ZERO
                    };
                }
                vcp.tangent_impulse = accumulated;
                let lambda = accumulated - old;

                let p = lambda.x * t1 + lambda.y * t2;
                vel_a.v -= m_a * p;
                vel_a.w -= i_a * vcp.r_a.cross(p);
                vel_b.v += m_b * p;
                vel_b.w += i_b * vcp.r_b.cross(p);

                // Normal
                let dv = vel_b.v + vel_b.w.cross(vcp.r_b) - vel_a.v - vel_a.w.cross(vcp.r_a);
                let vn = dv.dot(normal);
                let lambda = -vcp.normal_mass * (vn - vcp.velocity_bias);

                let accumulated = (vcp.normal_impulse + lambda).max(0.0);
                let lambda = accumulated - vcp.normal_impulse;
                vcp.normal_impulse = accumulated;

                let p = lambda * normal;
                vel_a.v -= m_a * p;
                vel_a.w -= i_a * vcp.r_a.cross(p);
                vel_b.v += m_b * p;
                vel_b.w += i_b * vcp.r_b.cross(p);
            }

            data.velocities[vc.index_a] = vel_a;
            data.velocities[vc.index_b] = vel_b;
        }
    }

    fn solve_position_constraints(&mut self, data: &mut SolverData) -> bool {
        let mut min_separation = 0.0_f32;

        for pc in &self.position_constraints {
            let m_a = data.bodies[pc.index_a].inv_mass;
            let i_a = data.bodies[pc.index_a].inv_inertia;
            let m_b = data.bodies[pc.index_b].inv_mass;
            let i_b = data.bodies[pc.index_b].inv_inertia;

            let mut pos_a = data.positions[pc.index_a];
            let mut pos_b = data.positions[pc.index_b];

            for j in 0..pc.point_count {
                let normal = pos_a.q * pc.local_normal_a;
                let p_a = pos_a.x + pos_a.q * pc.local_points_a[j];
                let p_b = pos_b.x + pos_b.q * pc.local_points_b[j];
                let separation = (p_b - p_a).dot(normal);
                let point = 0.5 * (p_a + p_b);

                let r_a = point - pos_a.x;
                let r_b = point - pos_b.x;

                min_separation = min_separation.min(separation);

                // Leave a slop of penetration so contacts stay active.
                let c = (BAUMGARTE * (separation + LINEAR_SLOP)).clamp(-MAX_LINEAR_CORRECTION, 0.0);

                let k_mass = effective_mass(m_a + m_b, &i_a, &i_b, r_a, r_b, normal);
                let impulse = -k_mass * c;
                let p = impulse * normal;

                pos_a.x -= m_a * p;
                pos_a.q = integrate_rotation(pos_a.q, -(i_a * r_a.cross(p)), 1.0);
                pos_b.x += m_b * p;
                pos_b.q = integrate_rotation(pos_b.q, i_b * r_b.cross(p), 1.0);
            }

            data.positions[pc.index_a] = pos_a;
            data.positions[pc.index_b] = pos_b;
        }

        min_separation >= -3.0 * LINEAR_SLOP
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::shapes::Shape;
    use crate::dynamics::body::Body;
    use crate::dynamics::solver::{Position, SolverBody, TimeStep, Velocity};

    struct Scene {
        contacts: Vec<Contact>,
        positions: Vec<Position>,
        velocities: Vec<Velocity>,
        bodies: Vec<SolverBody>,
    }

    fn scene(block_velocity: Vec3, restitution: f32) -> Scene {
        let ground = Body::new_static(Shape::cuboid(Vec3::new(5.0, 0.5, 5.0)))
            .with_position(Vec3::new(0.0, -0.5, 0.0));
        let block = Body::new_dynamic(Shape::cuboid(Vec3::splat(0.5)), 1.0)
            .with_position(Vec3::new(0.0, 0.5, 0.0))
            .with_restitution(restitution * 2.0);

        let mut contact = Contact::new(0, 1, &ground, &block);
        contact.update(&ground, &block);
        assert_eq!(contact.manifold.point_count, 4);

        Scene {
            contacts: vec![contact],
            positions: [&ground, &block]
                .iter()
                .map(|b| Position {
                    x: b.transform.position,
                    q: b.transform.rotation,
                })
                .collect(),
            velocities: vec![
                Velocity::default(),
                Velocity {
                    v: block_velocity,
                    w: Vec3::ZERO,
                },
            ],
            bodies: vec![
                SolverBody {
                    inv_mass: 0.0,
                    inv_inertia: Mat3::ZERO,
                },
                SolverBody {
                    inv_mass: block.inv_mass,
                    inv_inertia: block.world_inv_inertia(),
                },
            ],
        }
    }

    fn solve_velocities(scene: &mut Scene, solver: &mut ContactSolver) {
        let island_index = [0, 1];
        let mut data = SolverData {
            step: TimeStep::new(1.0 / 60.0, 8, 3),
            positions: &mut scene.positions,
            velocities: &mut scene.velocities,
            bodies: &scene.bodies,
            island_index: &island_index,
        };
        solver.load(&scene.contacts, &[0], &data);
        solver.initialize_constraints(&data);
        solver.warm_start(&mut data);
        for _ in 0..8 {
            solver.solve_velocity_constraints(&mut data);
        }
        solver.store_impulses(&mut scene.contacts);
    }

    #[test]
    fn test_normal_impulse_stops_approach() {
        let mut scene = scene(Vec3::new(0.0, -2.0, 0.0), 0.0);
        let mut solver = ContactSolver::new();
        solve_velocities(&mut scene, &mut solver);

        assert_eq!(solver.len(), 1);
        assert!(scene.velocities[1].v.y.abs() < 0.05);
        let manifold = &scene.contacts[0].manifold;
        assert!(manifold.points().iter().all(|p| p.normal_impulse >= 0.0));
        let total: f32 = manifold.points().iter().map(|p| p.normal_impulse).sum();
        // Impulse removes the block's momentum.
        let mass = 1.0 / scene.bodies[1].inv_mass;
        assert!((total - 2.0 * mass).abs() < 0.1 * mass);
    }

    #[test]
    fn test_restitution_bounces() {
        let mut scene = scene(Vec3::new(0.0, -4.0, 0.0), 0.5);
        let mut solver = ContactSolver::new();
        solve_velocities(&mut scene, &mut solver);
        assert!((scene.velocities[1].v.y - 2.0).abs() < 0.1);
    }

    #[test]
    fn test_separating_bodies_get_no_impulse() {
        let mut scene = scene(Vec3::new(0.0, 3.0, 0.0), 0.0);
        let mut solver = ContactSolver::new();
        solve_velocities(&mut scene, &mut solver);
        assert!((scene.velocities[1].v.y - 3.0).abs() < 1e-5);
        assert!(scene.contacts[0].manifold.points().iter().all(|p| p.normal_impulse == 0.0));
    }

    #[test]
    fn test_friction_is_bounded_by_coulomb_cone() {
        let mut scene = scene(Vec3::new(5.0, -1.0, 0.0), 0.0);
        let mut solver = ContactSolver::new();
        solve_velocities(&mut scene, &mut solver);

        // Each point is clamped against its normal impulse of the previous
        // iteration, so allow for the last normal update.
        let friction = scene.contacts[0].friction;
        for p in scene.contacts[0].manifold.points() {
            assert!(p.tangent_impulse.length() <= friction * p.normal_impulse + 0.05);
        }
        // Friction slowed the slide but could not stop it.
        let vx = scene.velocities[1].v.x;
        assert!(vx > 0.0 && vx < 5.0);
    }
}
