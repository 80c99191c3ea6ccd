//! Physics world: owns bodies, contacts and joints and steps them.
//!
//! # Pipeline
//!
//! Each fixed step runs:
//!
//! 1. Update contacts (AABB pair search, narrowphase, impulse transfer)
//! 2. Build islands from touching contacts and joints
//! 3. Solve each awake island (integrate, constrain, sleep)
//! 4. Clear force accumulators

use std::collections::HashMap;

use glam::Vec3;
use tracing::{debug, trace};

use crate::collision::shapes::Aabb;
use crate::dynamics::body::Body;
use crate::dynamics::contact::Contact;
use crate::dynamics::island::Island;
use crate::dynamics::joints::{
    DistanceJoint, DistanceJointDef, Joint, MouseJoint, MouseJointDef, SphereJoint, SphereJointDef,
};
use crate::dynamics::solver::TimeStep;
use crate::error::{PhysicsError, Result};
use crate::settings::SPECULATIVE_DISTANCE;

/// Configuration for the physics simulation.
#[derive(Debug, Clone)]
pub struct PhysicsConfig {
    /// Gravity vector. Default: (0, -9.81, 0).
    pub gravity: Vec3,
    /// Fixed timestep for physics updates in seconds. Default: 1/60.
    pub fixed_timestep: f64,
    /// Maximum number of sub-steps per frame. Default: 4.
    pub max_substeps: u32,
    /// Velocity solver iterations. Default: 8.
    pub velocity_iterations: u32,
    /// Position solver iterations. Default: 3.
    pub position_iterations: u32,
    /// Reuse last step's impulses as a starting guess. Default: true.
    pub warm_starting: bool,
    /// Let resting islands fall asleep. Default: true.
    pub allow_sleep: bool,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            fixed_timestep: 1.0 / 60.0,
            max_substeps: 4,
            velocity_iterations: 8,
            position_iterations: 3,
            warm_starting: true,
            allow_sleep: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Edge {
    Contact(usize),
    Joint(usize),
}

/// The main physics world managing simulation state.
#[derive(Debug, Default)]
pub struct PhysicsWorld {
    config: PhysicsConfig,
    accumulator: f64,
    bodies: Vec<Body>,
    contacts: Vec<Contact>,
    contact_lookup: HashMap<(usize, usize), usize>,
    joints: Vec<Joint>,

    // Scratch reused across steps.
    island: Island,
    aabbs: Vec<Aabb>,
    edges: Vec<Vec<Edge>>,
    stack: Vec<usize>,
    body_visited: Vec<bool>,
    contact_visited: Vec<bool>,
    joint_visited: Vec<bool>,
}

impl PhysicsWorld {
    /// Create a new physics world with the given configuration.
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut PhysicsConfig {
        &mut self.config
    }

    /// Add a body and return its id. Ids are dense and stable.
    pub fn create_body(&mut self, body: Body) -> usize {
        let id = self.bodies.len();
        debug!(id, body_type = ?body.body_type, "body created");
        self.bodies.push(body);
        id
    }

    pub fn body(&self, id: usize) -> Option<&Body> {
        self.bodies.get(id)
    }

    pub fn body_mut(&mut self, id: usize) -> Option<&mut Body> {
        self.bodies.get_mut(id)
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    /// Contacts whose bounding boxes overlapped during the last step.
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// The contact between two bodies, if their boxes overlapped last step.
    pub fn contact(&self, a: usize, b: usize) -> Option<&Contact> {
        let key = if a < b { (a, b) } else { (b, a) };
        self.contact_lookup.get(&key).map(|&i| &self.contacts[i])
    }

    pub fn joint(&self, id: usize) -> Option<&Joint> {
        self.joints.get(id)
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    fn check_body(&self, index: usize) -> Result<()> {
        if index < self.bodies.len() {
            Ok(())
        } else {
            Err(PhysicsError::BodyOutOfRange {
                index,
                count: self.bodies.len(),
            })
        }
    }

    fn add_joint(&mut self, joint: Joint) -> usize {
        let id = self.joints.len();
        let (a, b) = joint.bodies();
        self.bodies[a].wake();
        self.bodies[b].wake();
        debug!(id, body_a = a, body_b = b, "joint created");
        self.joints.push(joint);
        id
    }

    pub fn create_mouse_joint(&mut self, def: &MouseJointDef) -> Result<usize> {
        self.check_body(def.body)?;
        let joint = MouseJoint::new(def, &self.bodies[def.body])?;
        Ok(self.add_joint(Joint::Mouse(joint)))
    }

    pub fn create_sphere_joint(&mut self, def: &SphereJointDef) -> Result<usize> {
        self.check_body(def.body_a)?;
        self.check_body(def.body_b)?;
        let joint = SphereJoint::new(def, &self.bodies[def.body_a], &self.bodies[def.body_b])?;
        Ok(self.add_joint(Joint::Sphere(joint)))
    }

    pub fn create_distance_joint(&mut self, def: &DistanceJointDef) -> Result<usize> {
        self.check_body(def.body_a)?;
        self.check_body(def.body_b)?;
        let joint = DistanceJoint::new(def, &self.bodies[def.body_a], &self.bodies[def.body_b])?;
        Ok(self.add_joint(Joint::Distance(joint)))
    }

    /// Move a mouse joint's target and wake its body.
    pub fn set_mouse_target(&mut self, joint: usize, target: Vec3) -> Result<()> {
        let mouse = self
            .joints
            .get_mut(joint)
            .and_then(Joint::as_mouse_mut)
            .ok_or(PhysicsError::InvalidJoint("not a mouse joint"))?;
        mouse.set_target(target);
        let body = mouse.body();
        self.bodies[body].wake();
        Ok(())
    }

    pub fn wake_all(&mut self) {
        for body in &mut self.bodies {
            if !body.is_static() {
                body.wake();
            }
        }
    }

    /// Step the physics simulation forward by `delta_time` seconds.
    ///
    /// Uses a fixed timestep accumulator to ensure deterministic simulation.
    pub fn step(&mut self, delta_time: f64) {
        self.accumulator += delta_time;

        let mut substeps = 0u32;
        while self.accumulator >= self.config.fixed_timestep && substeps < self.config.max_substeps
        {
            self.fixed_step(self.config.fixed_timestep as f32);
            self.accumulator -= self.config.fixed_timestep;
            substeps += 1;
        }

        // Clamp accumulator to avoid spiral of death
        if self.accumulator > self.config.fixed_timestep * self.config.max_substeps as f64 {
            self.accumulator = 0.0;
        }
    }

    /// Advance exactly one step of `dt` seconds.
    pub fn fixed_step(&mut self, dt: f32) {
        let mut step = TimeStep::new(
            dt,
            self.config.velocity_iterations,
            self.config.position_iterations,
        );
        step.warm_starting = self.config.warm_starting;

        self.update_contacts();
        let islands = self.solve(&step);

        for body in &mut self.bodies {
            body.clear_forces();
        }

        debug!(
            bodies = self.bodies.len(),
            contacts = self.contacts.len(),
            joints = self.joints.len(),
            islands,
            "world step"
        );
    }

    /// Rebuild the contact list from overlapping boxes, keeping cached state
    /// for pairs that were already in contact.
    fn update_contacts(&mut self) {
        self.aabbs.clear();
        self.aabbs
            .extend(self.bodies.iter().map(|b| b.aabb().inflated(SPECULATIVE_DISTANCE)));

        let mut old: Vec<Option<Contact>> = std::mem::take(&mut self.contacts)
            .into_iter()
            .map(Some)
            .collect();
        let old_lookup = std::mem::take(&mut self.contact_lookup);

        let count = self.bodies.len();
        for i in 0..count {
            for j in (i + 1)..count {
                let (a, b) = (&self.bodies[i], &self.bodies[j]);
                if !a.is_dynamic() && !b.is_dynamic() {
                    continue;
                }
                if !self.aabbs[i].overlaps(&self.aabbs[j]) {
                    continue;
                }

                let mut contact = old_lookup
                    .get(&(i, j))
                    .and_then(|&k| old[k].take())
                    .unwrap_or_else(|| Contact::new(i, j, a, b));

                // Pairs with only sleeping or static bodies keep last step's manifold.
                let active = (a.awake && !a.is_static()) || (b.awake && !b.is_static());
                if active {
                    contact.update(a, b);
                }

                self.contact_lookup.insert((i, j), self.contacts.len());
                self.contacts.push(contact);
            }
        }
        trace!(contacts = self.contacts.len(), "contacts updated");
    }

    /// Build islands by depth-first search from awake bodies and solve each.
    /// Returns the number of islands solved.
    fn solve(&mut self, step: &TimeStep) -> usize {
        let count = self.bodies.len();

        for list in &mut self.edges {
            list.clear();
        }
        self.edges.resize_with(count, Vec::new);
        for (i, contact) in self.contacts.iter().enumerate() {
            if contact.is_touching() {
                self.edges[contact.body_a].push(Edge::Contact(i));
                self.edges[contact.body_b].push(Edge::Contact(i));
            }
        }
        for (i, joint) in self.joints.iter().enumerate() {
            let (a, b) = joint.bodies();
            self.edges[a].push(Edge::Joint(i));
            if b != a {
                self.edges[b].push(Edge::Joint(i));
            }
        }

        self.body_visited.clear();
        self.body_visited.resize(count, false);
        self.contact_visited.clear();
        self.contact_visited.resize(self.contacts.len(), false);
        self.joint_visited.clear();
        self.joint_visited.resize(self.joints.len(), false);

        let mut islands = 0;
        for seed in 0..count {
            let body = &self.bodies[seed];
            if self.body_visited[seed] || body.is_static() || !body.awake {
                continue;
            }

            self.island.clear();
            self.stack.clear();
            self.stack.push(seed);
            self.body_visited[seed] = true;

            while let Some(id) = self.stack.pop() {
                self.island.bodies.push(id);
                let body = &mut self.bodies[id];
                if !body.awake {
                    body.wake();
                }

                // Static bodies do not connect islands.
                if body.is_static() {
                    continue;
                }

                for edge in &self.edges[id] {
                    let other = match *edge {
                        Edge::Contact(c) => {
                            if self.contact_visited[c] {
                                continue;
                            }
                            self.contact_visited[c] = true;
                            self.island.contacts.push(c);
                            let contact = &self.contacts[c];
                            if contact.body_a == id {
                                contact.body_b
                            } else {
                                contact.body_a
                            }
                        }
                        Edge::Joint(j) => {
                            if self.joint_visited[j] {
                                continue;
                            }
                            self.joint_visited[j] = true;
                            self.island.joints.push(j);
                            let (a, b) = self.joints[j].bodies();
                            if a == id {
                                b
                            } else {
                                a
                            }
                        }
                    };

                    if !self.body_visited[other] {
                        self.body_visited[other] = true;
                        self.stack.push(other);
                    }
                }
            }

            let report = self.island.solve(
                &mut self.bodies,
                &mut self.contacts,
                &mut self.joints,
                step,
                self.config.gravity,
                self.config.allow_sleep,
            );
            if report.slept {
                debug!(island = islands, bodies = report.bodies, "island asleep");
            }
            islands += 1;

            // Static bodies may join other islands.
            for &id in &self.island.bodies {
                if self.bodies[id].is_static() {
                    self.body_visited[id] = false;
                }
            }
        }
        islands
    }
}
