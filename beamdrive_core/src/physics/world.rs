//! Rapier3D-backed rigid-body world
//!
//! Contacts between colliders that carry a material are re-resolved through
//! the [`ContactMaterialRegistry`] before the solver runs, so explicit
//! material pairs override the per-collider coefficients.

use nalgebra::{Point3, UnitQuaternion, Vector3};
use rapier3d::prelude::*;
use tracing::trace;

use super::material::{ContactMaterialRegistry, MaterialHandle};
use super::solver::{BodyDesc, BodyHandle, BodyKind, BodyShape, ConstraintHandle, RigidBodySolver};

/// Damping applied to beam distance constraints
const DEFAULT_CONSTRAINT_DAMPING: f32 = 0.0;

/// Physics world
pub struct PhysicsWorld {
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub gravity: Vector<f32>,
    pub integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    materials: ContactMaterialRegistry,
    constraint_damping: f32,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(ContactMaterialRegistry::driving())
    }
}

impl PhysicsWorld {
    pub fn new(materials: ContactMaterialRegistry) -> Self {
        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            gravity: vector![0.0, -9.81, 0.0],
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            materials,
            constraint_damping: DEFAULT_CONSTRAINT_DAMPING,
        }
    }

    pub fn with_gravity(mut self, gravity: Vector3<f32>) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_constraint_damping(mut self, damping: f32) -> Self {
        self.constraint_damping = damping;
        self
    }

    pub fn materials(&self) -> &ContactMaterialRegistry {
        &self.materials
    }

    /// Materials may only be added between steps
    pub fn materials_mut(&mut self) -> &mut ContactMaterialRegistry {
        &mut self.materials
    }

    /// Material assigned to a body's collider, if any
    pub fn body_material(&self, body: BodyHandle) -> Option<MaterialHandle> {
        let rb = self.rigid_body_set.get(to_rapier_body(body))?;
        let collider = self.collider_set.get(*rb.colliders().first()?)?;
        MaterialHandle::from_user_data(collider.user_data)
    }

    /// Mass of a body as currently configured on its collider
    pub fn body_mass(&self, body: BodyHandle) -> Option<f32> {
        let rb = self.rigid_body_set.get(to_rapier_body(body))?;
        let collider = self.collider_set.get(*rb.colliders().first()?)?;
        Some(collider.mass())
    }

    fn build_collider(&self, desc: &BodyDesc) -> Collider {
        let builder = match desc.shape {
            BodyShape::Ball { radius } => ColliderBuilder::ball(radius),
            BodyShape::Cuboid { half_extents } => {
                ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            }
        };

        let builder = match desc.kind {
            BodyKind::Dynamic => builder.mass(desc.mass),
            BodyKind::Fixed => builder,
        };

        match desc.material.and_then(|m| self.materials.get(m).map(|r| (m, r))) {
            Some((handle, record)) => builder
                .friction(record.friction)
                .restitution(record.restitution)
                .user_data(handle.to_user_data())
                .active_hooks(ActiveHooks::MODIFY_SOLVER_CONTACTS)
                .build(),
            None => builder.build(),
        }
    }
}

impl RigidBodySolver for PhysicsWorld {
    fn create_body(&mut self, desc: &BodyDesc) -> Option<BodyHandle> {
        if desc.kind == BodyKind::Dynamic && !(desc.mass.is_finite() && desc.mass > 0.0) {
            return None;
        }

        let builder = match desc.kind {
            BodyKind::Dynamic => RigidBodyBuilder::dynamic(),
            BodyKind::Fixed => RigidBodyBuilder::fixed(),
        };
        let rigid_body = builder
            .translation(desc.position)
            .rotation(desc.orientation.scaled_axis())
            .build();

        let collider = self.build_collider(desc);
        let rb_handle = self.rigid_body_set.insert(rigid_body);
        self.collider_set
            .insert_with_parent(collider, rb_handle, &mut self.rigid_body_set);

        Some(from_rapier_body(rb_handle))
    }

    fn destroy_body(&mut self, body: BodyHandle) -> bool {
        self.rigid_body_set
            .remove(
                to_rapier_body(body),
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true,
            )
            .is_some()
    }

    fn create_distance_constraint(
        &mut self,
        body_a: BodyHandle,
        body_b: BodyHandle,
        rest_length: f32,
        stiffness: f32,
    ) -> Option<ConstraintHandle> {
        let (a, b) = (to_rapier_body(body_a), to_rapier_body(body_b));
        if a == b || !self.rigid_body_set.contains(a) || !self.rigid_body_set.contains(b) {
            return None;
        }

        let joint = SpringJointBuilder::new(rest_length, stiffness, self.constraint_damping)
            .spring_model(MotorModel::AccelerationBased)
            .build();
        let handle = self.impulse_joint_set.insert(a, b, joint, true);
        Some(from_rapier_joint(handle))
    }

    fn create_anchor_constraint(
        &mut self,
        parent: BodyHandle,
        local_anchor: Vector3<f32>,
        child: BodyHandle,
    ) -> Option<ConstraintHandle> {
        let (a, b) = (to_rapier_body(parent), to_rapier_body(child));
        if a == b || !self.rigid_body_set.contains(a) || !self.rigid_body_set.contains(b) {
            return None;
        }

        // The child sits inside the parent's collider
        let joint = SphericalJointBuilder::new()
            .contacts_enabled(false)
            .local_anchor1(Point3::from(local_anchor))
            .local_anchor2(Point3::origin())
            .build();
        let handle = self.impulse_joint_set.insert(a, b, joint, true);
        Some(from_rapier_joint(handle))
    }

    fn destroy_constraint(&mut self, constraint: ConstraintHandle) -> bool {
        self.impulse_joint_set
            .remove(to_rapier_joint(constraint), true)
            .is_some()
    }

    fn step(&mut self, dt: f32) {
        if !(dt.is_finite() && dt > 0.0) {
            trace!("Skipping physics step with dt={}", dt);
            return;
        }
        self.integration_parameters.dt = dt;

        let hooks = MaterialContactHooks {
            materials: &self.materials,
        };

        let PhysicsWorld {
            ref mut physics_pipeline,
            ref gravity,
            ref integration_parameters,
            ref mut island_manager,
            ref mut broad_phase,
            ref mut narrow_phase,
            ref mut rigid_body_set,
            ref mut collider_set,
            ref mut impulse_joint_set,
            ref mut multibody_joint_set,
            ref mut ccd_solver,
            ..
        } = *self;

        physics_pipeline.step(
            gravity,
            integration_parameters,
            island_manager,
            broad_phase,
            narrow_phase,
            rigid_body_set,
            collider_set,
            impulse_joint_set,
            multibody_joint_set,
            ccd_solver,
            None,
            &hooks,
            &(),
        );
    }

    fn position(&self, body: BodyHandle) -> Option<Vector3<f32>> {
        self.rigid_body_set
            .get(to_rapier_body(body))
            .map(|rb| *rb.translation())
    }

    fn set_position(&mut self, body: BodyHandle, position: Vector3<f32>) {
        if let Some(rb) = self.rigid_body_set.get_mut(to_rapier_body(body)) {
            rb.set_translation(position, true);
        }
    }

    fn orientation(&self, body: BodyHandle) -> Option<UnitQuaternion<f32>> {
        self.rigid_body_set
            .get(to_rapier_body(body))
            .map(|rb| *rb.rotation())
    }

    fn set_orientation(&mut self, body: BodyHandle, orientation: UnitQuaternion<f32>) {
        if let Some(rb) = self.rigid_body_set.get_mut(to_rapier_body(body)) {
            rb.set_rotation(orientation, true);
        }
    }

    fn velocity(&self, body: BodyHandle) -> Option<Vector3<f32>> {
        self.rigid_body_set
            .get(to_rapier_body(body))
            .map(|rb| *rb.linvel())
    }

    fn set_velocity(&mut self, body: BodyHandle, velocity: Vector3<f32>) {
        if let Some(rb) = self.rigid_body_set.get_mut(to_rapier_body(body)) {
            rb.set_linvel(velocity, true);
        }
    }

    fn set_angular_velocity(&mut self, body: BodyHandle, angular_velocity: Vector3<f32>) {
        if let Some(rb) = self.rigid_body_set.get_mut(to_rapier_body(body)) {
            rb.set_angvel(angular_velocity, true);
        }
    }

    fn set_mass(&mut self, body: BodyHandle, mass: f32) {
        let Some(rb) = self.rigid_body_set.get(to_rapier_body(body)) else {
            return;
        };
        if !rb.is_dynamic() {
            return;
        }
        let colliders: Vec<ColliderHandle> = rb.colliders().to_vec();
        for handle in colliders {
            if let Some(collider) = self.collider_set.get_mut(handle) {
                collider.set_mass(mass);
            }
        }
    }

    fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }

    fn constraint_count(&self) -> usize {
        self.impulse_joint_set.len()
    }

    fn contains_body(&self, body: BodyHandle) -> bool {
        self.rigid_body_set.contains(to_rapier_body(body))
    }
}

/// Applies registry coefficients to every solver contact between two
/// material-tagged colliders
struct MaterialContactHooks<'a> {
    materials: &'a ContactMaterialRegistry,
}

impl PhysicsHooks for MaterialContactHooks<'_> {
    fn modify_solver_contacts(&self, context: &mut ContactModificationContext) {
        let (Some(co1), Some(co2)) = (
            context.colliders.get(context.collider1),
            context.colliders.get(context.collider2),
        ) else {
            return;
        };
        let (Some(m1), Some(m2)) = (
            MaterialHandle::from_user_data(co1.user_data),
            MaterialHandle::from_user_data(co2.user_data),
        ) else {
            return;
        };
        let Some(props) = self.materials.contact_properties(m1, m2) else {
            return;
        };

        for contact in context.solver_contacts.iter_mut() {
            contact.friction = props.friction;
            contact.restitution = props.restitution;
        }
    }
}

fn to_rapier_body(handle: BodyHandle) -> RigidBodyHandle {
    let (index, generation) = handle.into_raw_parts();
    RigidBodyHandle::from_raw_parts(index, generation)
}

fn from_rapier_body(handle: RigidBodyHandle) -> BodyHandle {
    let (index, generation) = handle.into_raw_parts();
    BodyHandle::from_raw_parts(index, generation)
}

fn to_rapier_joint(handle: ConstraintHandle) -> ImpulseJointHandle {
    let (index, generation) = handle.into_raw_parts();
    ImpulseJointHandle::from_raw_parts(index, generation)
}

fn from_rapier_joint(handle: ImpulseJointHandle) -> ConstraintHandle {
    let (index, generation) = handle.into_raw_parts();
    ConstraintHandle::from_raw_parts(index, generation)
}
