//! Interface to the rigid-body solver that owns bodies, shapes and constraints
//!
//! The vehicle core never touches the physics backend directly. It creates
//! and destroys bodies and constraints through [`RigidBodySolver`], reads
//! and writes their kinematic state, and steps the world once per tick. Every
//! accessor is tolerant of stale handles: reads return `None`, writes and
//! destroys are no-ops.

use nalgebra::{UnitQuaternion, Vector3};

use super::material::MaterialHandle;

/// Handle to a body owned by the solver
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BodyHandle {
    index: u32,
    generation: u32,
}

impl BodyHandle {
    pub fn from_raw_parts(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn into_raw_parts(self) -> (u32, u32) {
        (self.index, self.generation)
    }
}

/// Handle to a constraint owned by the solver
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConstraintHandle {
    index: u32,
    generation: u32,
}

impl ConstraintHandle {
    pub fn from_raw_parts(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn into_raw_parts(self) -> (u32, u32) {
        (self.index, self.generation)
    }
}

/// Collision shape of a body
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BodyShape {
    Ball { radius: f32 },
    Cuboid { half_extents: Vector3<f32> },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyKind {
    /// Moved by the solver
    Dynamic,
    /// Never moves (ground, walls)
    Fixed,
}

/// Everything the solver needs to create a body
#[derive(Clone, Debug, PartialEq)]
pub struct BodyDesc {
    pub shape: BodyShape,
    pub kind: BodyKind,
    /// Ignored for fixed bodies
    pub mass: f32,
    pub position: Vector3<f32>,
    pub orientation: UnitQuaternion<f32>,
    pub material: Option<MaterialHandle>,
}

impl BodyDesc {
    pub fn dynamic(shape: BodyShape, mass: f32) -> Self {
        Self {
            shape,
            kind: BodyKind::Dynamic,
            mass,
            position: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
            material: None,
        }
    }

    pub fn fixed(shape: BodyShape) -> Self {
        Self {
            kind: BodyKind::Fixed,
            mass: 0.0,
            ..Self::dynamic(shape, 0.0)
        }
    }

    pub fn with_position(mut self, position: Vector3<f32>) -> Self {
        self.position = position;
        self
    }

    pub fn with_orientation(mut self, orientation: UnitQuaternion<f32>) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_material(mut self, material: MaterialHandle) -> Self {
        self.material = Some(material);
        self
    }
}

/// Rigid-body world consumed by the vehicle core.
///
/// Only one tick may use a solver at a time; `&mut self` on every mutator
/// enforces this for callers sharing one world across vehicles.
pub trait RigidBodySolver {
    /// Create a body. `None` if the solver refuses the description.
    fn create_body(&mut self, desc: &BodyDesc) -> Option<BodyHandle>;

    /// Remove a body together with every constraint attached to it.
    /// Returns `false` if the handle was already gone.
    fn destroy_body(&mut self, body: BodyHandle) -> bool;

    /// Keep two bodies `rest_length` apart with the given stiffness
    fn create_distance_constraint(
        &mut self,
        body_a: BodyHandle,
        body_b: BodyHandle,
        rest_length: f32,
        stiffness: f32,
    ) -> Option<ConstraintHandle>;

    /// Pin `child`'s origin to a point fixed in `parent`'s local frame
    fn create_anchor_constraint(
        &mut self,
        parent: BodyHandle,
        local_anchor: Vector3<f32>,
        child: BodyHandle,
    ) -> Option<ConstraintHandle>;

    /// Returns `false` if the handle was already gone
    fn destroy_constraint(&mut self, constraint: ConstraintHandle) -> bool;

    /// Advance the world by `dt` seconds
    fn step(&mut self, dt: f32);

    fn position(&self, body: BodyHandle) -> Option<Vector3<f32>>;
    fn set_position(&mut self, body: BodyHandle, position: Vector3<f32>);

    fn orientation(&self, body: BodyHandle) -> Option<UnitQuaternion<f32>>;
    fn set_orientation(&mut self, body: BodyHandle, orientation: UnitQuaternion<f32>);

    fn velocity(&self, body: BodyHandle) -> Option<Vector3<f32>>;
    fn set_velocity(&mut self, body: BodyHandle, velocity: Vector3<f32>);

    fn set_angular_velocity(&mut self, body: BodyHandle, angular_velocity: Vector3<f32>);

    fn set_mass(&mut self, body: BodyHandle, mass: f32);

    /// Number of live bodies
    fn body_count(&self) -> usize;

    /// Number of live constraints
    fn constraint_count(&self) -> usize;

    fn contains_body(&self, body: BodyHandle) -> bool {
        self.position(body).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_desc_builders() {
        let desc = BodyDesc::dynamic(BodyShape::Ball { radius: 0.05 }, 10.0)
            .with_position(Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(desc.kind, BodyKind::Dynamic);
        assert_eq!(desc.mass, 10.0);
        assert_eq!(desc.position, Vector3::new(1.0, 2.0, 3.0));
        assert!(desc.material.is_none());

        let ground = BodyDesc::fixed(BodyShape::Cuboid {
            half_extents: Vector3::new(50.0, 0.1, 50.0),
        });
        assert_eq!(ground.kind, BodyKind::Fixed);
        assert_eq!(ground.mass, 0.0);
    }

    #[test]
    fn test_handle_raw_parts() {
        let handle = BodyHandle::from_raw_parts(7, 2);
        assert_eq!(handle.into_raw_parts(), (7, 2));

        let constraint = ConstraintHandle::from_raw_parts(3, 1);
        assert_eq!(constraint.into_raw_parts(), (3, 1));
    }
}
