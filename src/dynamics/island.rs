//! Island solve: one connected group of bodies, contacts and joints.
//!
//! Scratch arrays live on the island and are reused across steps.

use glam::Vec3;
use tracing::trace;

use super::body::Body;
use super::contact::Contact;
use super::contact_solver::ContactSolver;
use super::joints::Joint;
use super::solver::{
    Constraint, Position, SolverBody, SolverData, TimeStep, Velocity, NOT_IN_ISLAND,
};
use crate::math::integrate_rotation;
use crate::settings::{
    MAX_ROTATION, MAX_ROTATION_SQUARED, MAX_TRANSLATION, MAX_TRANSLATION_SQUARED,
    SLEEP_ANGULAR_TOLERANCE, SLEEP_LINEAR_TOLERANCE, TIME_TO_SLEEP,
};

/// Outcome of one island solve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IslandReport {
    pub bodies: usize,
    pub contacts: usize,
    pub joints: usize,
    /// Position iterations actually run.
    pub position_iterations: u32,
    /// Whether the position pass converged before the iteration cap.
    pub position_solved: bool,
    /// Whether the island was put to sleep.
    pub slept: bool,
}

#[derive(Debug, Default)]
pub struct Island {
    /// World body ids.
    pub bodies: Vec<usize>,
    /// Indices into the world's contact list.
    pub contacts: Vec<usize>,
    /// Indices into the world's joint list.
    pub joints: Vec<usize>,

    positions: Vec<Position>,
    velocities: Vec<Velocity>,
    solver_bodies: Vec<SolverBody>,
    island_index: Vec<usize>,
    contact_solver: ContactSolver,
}

impl Island {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.bodies.clear();
        self.contacts.clear();
        self.joints.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Integrate and solve the island, then write results back to `bodies`.
    pub fn solve(
        &mut self,
        bodies: &mut [Body],
        contacts: &mut [Contact],
        joints: &mut [Joint],
        step: &TimeStep,
        gravity: Vec3,
        allow_sleep: bool,
    ) -> IslandReport {
        let dt = step.dt;

        self.island_index.clear();
        self.island_index.resize(bodies.len(), NOT_IN_ISLAND);
        self.positions.clear();
        self.velocities.clear();
        self.solver_bodies.clear();

        // Integrate velocities.
        for (local, &id) in self.bodies.iter().enumerate() {
            self.island_index[id] = local;
            let body = &bodies[id];

            let mut v = body.linear_velocity;
            let mut w = body.angular_velocity;
            let inv_inertia = body.world_inv_inertia();

            if body.is_dynamic() {
                v += dt * (body.gravity_scale * gravity + body.inv_mass * body.force);
                w += dt * (inv_inertia * body.torque);

                v *= 1.0 / (1.0 + dt * body.linear_damping);
                w *= 1.0 / (1.0 + dt * body.angular_damping);
            }

            self.positions.push(Position {
                x: body.transform.position,
                q: body.transform.rotation,
            });
            self.velocities.push(Velocity { v, w });
            self.solver_bodies.push(if body.is_dynamic() {
                SolverBody {
                    inv_mass: body.inv_mass,
                    inv_inertia,
                }
            } else {
                SolverBody {
                    inv_mass: 0.0,
                    inv_inertia: glam::Mat3::ZERO,
                }
            });
        }

        let mut data = SolverData {
            step: *step,
            positions: &mut self.positions,
            velocities: &mut self.velocities,
            bodies: &self.solver_bodies,
            island_index: &self.island_index,
        };

        self.contact_solver.load(contacts, &self.contacts, &data);
        self.contact_solver.initialize_constraints(&data);
        for &id in &self.joints {
            joints[id].initialize_constraints(&data);
        }

        if step.warm_starting {
            self.contact_solver.warm_start(&mut data);
            for &id in &self.joints {
                joints[id].warm_start(&mut data);
            }
        }

        for _ in 0..step.velocity_iterations {
            for &id in &self.joints {
                joints[id].solve_velocity_constraints(&mut data);
            }
            self.contact_solver.solve_velocity_constraints(&mut data);
        }

        self.contact_solver.store_impulses(contacts);

        // Integrate positions.
        for (pos, vel) in data.positions.iter_mut().zip(data.velocities.iter_mut()) {
            let translation = dt * vel.v;
            let length_sq = translation.length_squared();
            if length_sq > MAX_TRANSLATION_SQUARED {
                vel.v *= MAX_TRANSLATION / length_sq.sqrt();
            }

            let rotation = dt * vel.w;
            let angle_sq = rotation.length_squared();
            if angle_sq > MAX_ROTATION_SQUARED {
                vel.w *= MAX_ROTATION / angle_sq.sqrt();
            }

            pos.x += dt * vel.v;
            pos.q = integrate_rotation(pos.q, vel.w, dt);
        }

        let mut position_iterations = 0;
        let mut position_solved = false;
        for _ in 0..step.position_iterations {
            position_iterations += 1;
            let contacts_ok = self.contact_solver.solve_position_constraints(&mut data);
            let mut joints_ok = true;
            for &id in &self.joints {
                joints_ok &= joints[id].solve_position_constraints(&mut data);
            }
            if contacts_ok && joints_ok {
                position_solved = true;
                break;
            }
        }

        // Write back.
        for (local, &id) in self.bodies.iter().enumerate() {
            let body = &mut bodies[id];
            if body.is_static() {
                continue;
            }
            body.transform.position = self.positions[local].x;
            body.transform.rotation = self.positions[local].q;
            body.linear_velocity = self.velocities[local].v;
            body.angular_velocity = self.velocities[local].w;
        }

        let slept = allow_sleep && self.update_sleep(bodies, dt);

        for &id in &self.bodies {
            self.island_index[id] = NOT_IN_ISLAND;
        }

        let report = IslandReport {
            bodies: self.bodies.len(),
            contacts: self.contacts.len(),
            joints: self.joints.len(),
            position_iterations,
            position_solved,
            slept,
        };
        trace!(?report, "island solved");
        report
    }

    /// Advance sleep timers. Puts every body to sleep once the slowest
    /// timer passes `TIME_TO_SLEEP`.
    fn update_sleep(&self, bodies: &mut [Body], dt: f32) -> bool {
        let linear_tol_sq = SLEEP_LINEAR_TOLERANCE * SLEEP_LINEAR_TOLERANCE;
        let angular_tol_sq = SLEEP_ANGULAR_TOLERANCE * SLEEP_ANGULAR_TOLERANCE;

        let mut min_sleep_time = f32::MAX;
        for &id in &self.bodies {
            let body = &mut bodies[id];
            if body.is_static() {
                continue;
            }
            if body.linear_velocity.length_squared() > linear_tol_sq
                || body.angular_velocity.length_squared() > angular_tol_sq
            {
                body.sleep_time = 0.0;
                min_sleep_time = 0.0;
            } else {
                body.sleep_time += dt;
                min_sleep_time = min_sleep_time.min(body.sleep_time);
            }
        }

        if min_sleep_time < TIME_TO_SLEEP {
            return false;
        }
        for &id in &self.bodies {
            let body = &mut bodies[id];
            if !body.is_static() {
                body.sleep();
            }
        }
        true
    }
}
