//! Rigid bodies.

use glam::{Mat3, Quat, Vec3};

use crate::collision::shapes::{Aabb, Shape};
use crate::math::{inverse_or_zero, rotate_inertia, Transform};

/// Rigid body type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyType {
    /// Immovable.
    Static,
    /// Moved by its velocity only; pushes dynamic bodies.
    Kinematic,
    /// Affected by forces, contacts and joints.
    Dynamic,
}

#[derive(Debug, Clone)]
pub struct Body {
    pub body_type: BodyType,
    pub shape: Shape,
    /// Pose of the center of mass.
    pub transform: Transform,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub force: Vec3,
    pub torque: Vec3,
    pub mass: f32,
    pub inv_mass: f32,
    /// Inertia about the center of mass, body frame.
    pub local_inertia: Mat3,
    pub local_inv_inertia: Mat3,
    /// Linear damping factor (default: 0.01).
    pub linear_damping: f32,
    /// Angular damping factor (default: 0.01).
    pub angular_damping: f32,
    /// Coefficient of restitution (0.0 - 1.0).
    pub restitution: f32,
    /// Friction coefficient.
    pub friction: f32,
    /// Gravity scale (default: 1.0).
    pub gravity_scale: f32,
    pub awake: bool,
    /// Time spent below the sleep tolerances.
    pub sleep_time: f32,
}

impl Body {
    /// Create a dynamic body whose mass follows from the shape's volume.
    pub fn new_dynamic(shape: Shape, density: f32) -> Self {
        let (mass, inertia) = shape.mass_properties(density);
        let mut body = Self::with_type(BodyType::Dynamic, shape);
        body.linear_damping = 0.01;
        body.angular_damping = 0.01;
        body.gravity_scale = 1.0;
        body.set_mass(mass, inertia);
        body
    }

    /// Create a static body.
    pub fn new_static(shape: Shape) -> Self {
        Self::with_type(BodyType::Static, shape)
    }

    /// Create a kinematic body.
    pub fn new_kinematic(shape: Shape) -> Self {
        Self::with_type(BodyType::Kinematic, shape)
    }

    fn with_type(body_type: BodyType, shape: Shape) -> Self {
        Self {
            body_type,
            shape,
            transform: Transform::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            force: Vec3::ZERO,
            torque: Vec3::ZERO,
            mass: 0.0,
            inv_mass: 0.0,
            local_inertia: Mat3::ZERO,
            local_inv_inertia: Mat3::ZERO,
            linear_damping: 0.0,
            angular_damping: 0.0,
            restitution: 0.0,
            friction: 0.5,
            gravity_scale: 0.0,
            awake: true,
            sleep_time: 0.0,
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.transform.rotation = rotation.normalize();
        self
    }

    pub fn with_linear_velocity(mut self, velocity: Vec3) -> Self {
        self.linear_velocity = velocity;
        self
    }

    pub fn with_angular_velocity(mut self, velocity: Vec3) -> Self {
        self.angular_velocity = velocity;
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    /// Override mass and inertia. Ignored for non-dynamic bodies.
    pub fn set_mass(&mut self, mass: f32, inertia: Mat3) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        self.mass = mass.max(f32::EPSILON);
        self.inv_mass = 1.0 / self.mass;
        self.local_inertia = inertia;
        self.local_inv_inertia = inverse_or_zero(inertia);
    }

    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.body_type == BodyType::Dynamic
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.body_type == BodyType::Static
    }

    /// Inverse inertia in world space for the current orientation.
    pub fn world_inv_inertia(&self) -> Mat3 {
        rotate_inertia(self.transform.rotation, self.local_inv_inertia)
    }

    /// Accumulate a force at a world point for the next step.
    pub fn apply_force(&mut self, force: Vec3, point: Vec3) {
        if !self.is_dynamic() {
            return;
        }
        self.force += force;
        self.torque += (point - self.transform.position).cross(force);
        self.wake();
    }

    pub fn apply_force_to_center(&mut self, force: Vec3) {
        if !self.is_dynamic() {
            return;
        }
        self.force += force;
        self.wake();
    }

    pub fn apply_torque(&mut self, torque: Vec3) {
        if !self.is_dynamic() {
            return;
        }
        self.torque += torque;
        self.wake();
    }

    /// Change velocity immediately by an impulse at a world point.
    pub fn apply_linear_impulse(&mut self, impulse: Vec3, point: Vec3) {
        if !self.is_dynamic() {
            return;
        }
        self.linear_velocity += self.inv_mass * impulse;
        self.angular_velocity +=
            self.world_inv_inertia() * (point - self.transform.position).cross(impulse);
        self.wake();
    }

    pub fn clear_forces(&mut self) {
        self.force = Vec3::ZERO;
        self.torque = Vec3::ZERO;
    }

    pub fn wake(&mut self) {
        self.awake = true;
        self.sleep_time = 0.0;
    }

    /// Put the body to sleep and stop it.
    pub fn sleep(&mut self) {
        self.awake = false;
        self.sleep_time = 0.0;
        self.linear_velocity = Vec3::ZERO;
        self.angular_velocity = Vec3::ZERO;
        self.clear_forces();
    }

    pub fn aabb(&self) -> Aabb {
        self.shape.compute_aabb(&self.transform)
    }
}
