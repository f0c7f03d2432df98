//! One simulated vehicle: chassis body, kinematic controller, grip
//! correction and structural lattice, ticked in a fixed order against a
//! shared solver.

use nalgebra::{Isometry3, Translation3, Vector3};
use tracing::{debug, info};

use super::controller::{yaw_rotation, DriverInput, VehicleKinematicController, VehicleState};
use super::debug::{DebugOptions, StructureSnapshot};
use super::grip::LateralGripCorrector;
use super::lattice::{StructuralLattice, StructureReport};
use super::layout::{CageLayout, NodeRole};
use crate::config::SimulationConfig;
use crate::error::{BeamDriveError, Result};
use crate::physics::{
    BodyDesc, BodyHandle, BodyShape, ContactMaterialRegistry, MaterialHandle, RigidBodySolver,
};

/// Materials assigned to a vehicle's solver bodies
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VehicleMaterials {
    pub chassis: Option<MaterialHandle>,
    pub nodes: Option<MaterialHandle>,
}

impl VehicleMaterials {
    /// Use the registry's `vehicle_body` material for chassis and nodes
    pub fn from_registry(registry: &ContactMaterialRegistry) -> Self {
        let body = registry.handle_by_name("vehicle_body");
        Self {
            chassis: body,
            nodes: body,
        }
    }
}

/// A drivable, deformable vehicle
pub struct VehicleSimulation {
    config: SimulationConfig,
    chassis: Option<BodyHandle>,
    controller: VehicleKinematicController,
    grip: LateralGripCorrector,
    lattice: StructuralLattice,
    debug: DebugOptions,
    last_report: StructureReport,
}

impl VehicleSimulation {
    /// Spawn a vehicle with the passenger-car cage
    pub fn spawn<S: RigidBodySolver>(
        solver: &mut S,
        config: SimulationConfig,
        materials: VehicleMaterials,
    ) -> Result<Self> {
        Self::spawn_with_layout(solver, config, &CageLayout::passenger_car(), materials)
    }

    pub fn spawn_with_layout<S: RigidBodySolver>(
        solver: &mut S,
        config: SimulationConfig,
        layout: &CageLayout,
        materials: VehicleMaterials,
    ) -> Result<Self> {
        config.validate()?;
        layout.validate()?;

        let spawn = config.vehicle.spawn_position();
        let controller = VehicleKinematicController::new(&config.vehicle, spawn)?;
        let grip = LateralGripCorrector::from_config(&config.vehicle)?;

        let mut desc = BodyDesc::dynamic(
            BodyShape::Cuboid {
                half_extents: config.vehicle.chassis_half_extents(),
            },
            config.vehicle.chassis_mass,
        )
        .with_position(spawn);
        if let Some(material) = materials.chassis {
            desc = desc.with_material(material);
        }
        let chassis = solver
            .create_body(&desc)
            .ok_or(BeamDriveError::MissingBody("chassis"))?;

        let pose = Isometry3::from_parts(Translation3::from(spawn), yaw_rotation(0.0));
        let lattice = match StructuralLattice::new(
            solver,
            chassis,
            &pose,
            layout,
            config.lattice.clone(),
            materials.nodes,
        ) {
            Ok(lattice) => lattice,
            Err(err) => {
                solver.destroy_body(chassis);
                return Err(err);
            }
        };

        info!(
            "Spawned vehicle at ({:.2}, {:.2}, {:.2}) with {} nodes and {} beams",
            spawn.x,
            spawn.y,
            spawn.z,
            lattice.nodes().len(),
            lattice.beams().len()
        );

        let debug = config.debug;
        Ok(Self {
            config,
            chassis: Some(chassis),
            controller,
            grip,
            lattice,
            debug,
            last_report: StructureReport::default(),
        })
    }

    /// Advance the vehicle by `dt` seconds.
    ///
    /// Order: controller, solver step, grip correction and stabilization,
    /// structural step. No-op after [`dispose`](Self::dispose).
    pub fn tick<S: RigidBodySolver>(
        &mut self,
        solver: &mut S,
        dt: f32,
        throttle: f32,
        brake: f32,
        steer: f32,
    ) {
        self.tick_with_input(solver, dt, DriverInput::new(throttle, brake, steer));
    }

    pub fn tick_with_input<S: RigidBodySolver>(
        &mut self,
        solver: &mut S,
        dt: f32,
        input: DriverInput,
    ) {
        let Some(chassis) = self.chassis else {
            return;
        };

        // Start from wherever contacts left the body last tick
        if let (Some(position), Some(velocity)) =
            (solver.position(chassis), solver.velocity(chassis))
        {
            self.controller.sync_from_body(position, velocity);
        }

        self.controller.update(dt, input);
        let state = *self.controller.state();
        solver.set_position(chassis, state.position);
        solver.set_orientation(chassis, state.orientation());
        solver.set_velocity(chassis, state.velocity);

        solver.step(dt);

        let resolved = solver.velocity(chassis).unwrap_or(state.velocity);
        let corrected = self.grip.correct(state.yaw, resolved);
        solver.set_velocity(chassis, corrected);
        let position = self.stabilize(solver, chassis, state.yaw);
        self.controller.sync_from_body(position, corrected);

        let pose = Isometry3::from_parts(Translation3::from(position), state.orientation());
        let report = self.lattice.step_structure(solver, &pose);
        if report.newly_broken > 0 {
            debug!(
                "{} beams broke this tick, damage now {:.2}",
                report.newly_broken, report.damage
            );
        }
        self.last_report = report;
    }

    /// Lock the body upright on its heading and lift it back if it sank
    fn stabilize<S: RigidBodySolver>(
        &self,
        solver: &mut S,
        chassis: BodyHandle,
        yaw: f32,
    ) -> Vector3<f32> {
        solver.set_orientation(chassis, yaw_rotation(yaw));
        solver.set_angular_velocity(chassis, Vector3::zeros());

        let mut position = solver.position(chassis).unwrap_or(self.controller.state().position);
        if position.y < self.config.vehicle.ride_height_floor {
            position.y = self.config.vehicle.ride_height_reset;
            solver.set_position(chassis, position);
        }
        position
    }

    /// Chassis position and heading
    pub fn pose(&self) -> (Vector3<f32>, f32) {
        let state = self.controller.state();
        (state.position, state.yaw)
    }

    pub fn state(&self) -> &VehicleState {
        self.controller.state()
    }

    pub fn speed(&self) -> f32 {
        self.controller.state().speed
    }

    pub fn damage(&self) -> f32 {
        self.lattice.damage()
    }

    pub fn damage_percentage(&self) -> f32 {
        self.lattice.damage_percentage()
    }

    pub fn part_health(&self, role: NodeRole) -> f32 {
        self.lattice.part_health(role)
    }

    pub fn last_report(&self) -> StructureReport {
        self.last_report
    }

    pub fn lattice(&self) -> &StructuralLattice {
        &self.lattice
    }

    pub fn chassis(&self) -> Option<BodyHandle> {
        self.chassis
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn is_disposed(&self) -> bool {
        self.chassis.is_none()
    }

    /// Teleport the chassis and its cage to `position`, keeping heading and damage
    pub fn set_position<S: RigidBodySolver>(&mut self, solver: &mut S, position: Vector3<f32>) {
        let Some(chassis) = self.chassis else {
            return;
        };
        let offset = position - self.controller.state().position;
        self.controller.set_position(position);
        solver.set_position(chassis, position);
        solver.set_velocity(chassis, Vector3::zeros());

        for node in self.lattice.nodes() {
            if let Some(current) = solver.position(node.body) {
                solver.set_position(node.body, current + offset);
                solver.set_velocity(node.body, Vector3::zeros());
            }
        }
    }

    /// Return to the spawn state: controller, chassis and lattice
    pub fn reset<S: RigidBodySolver>(&mut self, solver: &mut S) {
        let Some(chassis) = self.chassis else {
            return;
        };
        let spawn = self.config.vehicle.spawn_position();
        self.controller.reset(spawn);

        let orientation = yaw_rotation(0.0);
        solver.set_position(chassis, spawn);
        solver.set_orientation(chassis, orientation);
        solver.set_velocity(chassis, Vector3::zeros());
        solver.set_angular_velocity(chassis, Vector3::zeros());

        let pose = Isometry3::from_parts(Translation3::from(spawn), orientation);
        self.lattice.reset(solver, &pose);
        self.last_report = StructureReport::default();
        info!("Vehicle reset to spawn");
    }

    /// Release every solver resource this vehicle owns. Safe to call more than once.
    pub fn dispose<S: RigidBodySolver>(&mut self, solver: &mut S) {
        self.lattice.destroy(solver);
        if let Some(chassis) = self.chassis.take() {
            solver.destroy_body(chassis);
            debug!("Vehicle disposed");
        }
    }

    pub fn debug_options(&self) -> DebugOptions {
        self.debug
    }

    pub fn set_debug_options(&mut self, options: DebugOptions) {
        self.debug = options;
    }

    pub fn toggle_structural_debug(&mut self) -> bool {
        self.debug.show_structural_debug = !self.debug.show_structural_debug;
        self.debug.show_structural_debug
    }

    /// Lattice overlay, only while structural debug is on
    pub fn structure_snapshot(&self) -> Option<StructureSnapshot> {
        if self.debug.show_structural_debug && !self.is_disposed() {
            Some(self.lattice.snapshot())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::PhysicsWorld;
    use approx::assert_relative_eq;

    const DT: f32 = 1.0 / 60.0;

    fn spawn(world: &mut PhysicsWorld) -> VehicleSimulation {
        let materials = VehicleMaterials::from_registry(world.materials());
        VehicleSimulation::spawn(world, SimulationConfig::default(), materials).unwrap()
    }

    #[test]
    fn test_spawn_creates_bodies() {
        let mut world = PhysicsWorld::default();
        let vehicle = spawn(&mut world);

        assert_eq!(world.body_count(), 21);
        assert_eq!(world.constraint_count(), 68);
        let (position, yaw) = vehicle.pose();
        assert_eq!(position, Vector3::new(0.0, 2.0, 0.0));
        assert_eq!(yaw, 0.0);
        assert_eq!(vehicle.damage(), 0.0);

        let chassis = vehicle.chassis().unwrap();
        assert!(world.body_material(chassis).is_some());
    }

    #[test]
    fn test_invalid_config_spawns_nothing() {
        let mut world = PhysicsWorld::default();
        let mut config = SimulationConfig::default();
        config.vehicle.wheel_base = -1.0;

        let result = VehicleSimulation::spawn(&mut world, config, VehicleMaterials::default());
        assert!(matches!(result, Err(BeamDriveError::Config(_))));
        assert_eq!(world.body_count(), 0);
    }

    #[test]
    fn test_tick_reports_pose() {
        let mut world = PhysicsWorld::default();
        let mut vehicle = spawn(&mut world);

        vehicle.tick(&mut world, DT, 1.0, 0.0, 1.0);
        let (position, yaw) = vehicle.pose();
        assert!(yaw > 0.0);
        assert_relative_eq!(yaw, 0.03846, epsilon = 1e-3);
        assert!(position.z < 0.0);
        assert!(vehicle.speed() > 0.0);
    }

    #[test]
    fn test_ride_height_is_restored() {
        let mut world = PhysicsWorld::default();
        let mut vehicle = spawn(&mut world);
        let chassis = vehicle.chassis().unwrap();

        world.set_position(chassis, Vector3::new(0.0, -3.0, 0.0));
        vehicle.tick(&mut world, DT, 0.0, 0.0, 0.0);

        let (position, _) = vehicle.pose();
        assert_relative_eq!(position.y, 1.0);
        assert_relative_eq!(world.position(chassis).unwrap().y, 1.0);
    }

    #[test]
    fn test_reset_and_dispose() {
        let mut world = PhysicsWorld::default();
        let mut vehicle = spawn(&mut world);

        for _ in 0..30 {
            vehicle.tick(&mut world, DT, 1.0, 0.0, 0.5);
        }
        vehicle.reset(&mut world);
        let (position, yaw) = vehicle.pose();
        assert_eq!(position, Vector3::new(0.0, 2.0, 0.0));
        assert_eq!(yaw, 0.0);
        assert_eq!(vehicle.damage(), 0.0);
        assert_eq!(vehicle.lattice().broken_beam_count(), 0);

        let bodies = world.body_count();
        let constraints = world.constraint_count();
        let masses: Vec<f32> = vehicle.lattice().nodes().iter().map(|n| n.mass).collect();
        assert_eq!(constraints, 68);

        // A second reset leaves nothing behind and creates nothing new
        vehicle.reset(&mut world);
        assert_eq!(vehicle.pose(), (position, yaw));
        assert_eq!(vehicle.damage(), 0.0);
        assert_eq!(world.body_count(), bodies);
        assert_eq!(world.constraint_count(), constraints);
        let masses_after: Vec<f32> = vehicle.lattice().nodes().iter().map(|n| n.mass).collect();
        assert_eq!(masses_after, masses);

        vehicle.dispose(&mut world);
        assert!(vehicle.is_disposed());
        assert_eq!(world.body_count(), 0);
        assert_eq!(world.constraint_count(), 0);

        vehicle.dispose(&mut world);
        vehicle.tick(&mut world, DT, 1.0, 0.0, 0.0);
        assert_eq!(world.body_count(), 0);
    }

    #[test]
    fn test_set_position_moves_cage() {
        let mut world = PhysicsWorld::default();
        let mut vehicle = spawn(&mut world);
        let node = vehicle.lattice().nodes()[0].body;
        let before = world.position(node).unwrap();

        vehicle.set_position(&mut world, Vector3::new(10.0, 2.0, 5.0));
        let after = world.position(node).unwrap();
        assert_relative_eq!(after - before, Vector3::new(10.0, 0.0, 5.0), epsilon = 1e-5);
        assert_eq!(vehicle.pose().0, Vector3::new(10.0, 2.0, 5.0));
    }

    #[test]
    fn test_structural_debug_toggle() {
        let mut world = PhysicsWorld::default();
        let mut vehicle = spawn(&mut world);

        assert!(vehicle.structure_snapshot().is_none());
        assert!(vehicle.toggle_structural_debug());
        let snapshot = vehicle.structure_snapshot().unwrap();
        assert_eq!(snapshot.nodes.len(), 20);
        assert_eq!(snapshot.beams.len(), 48);
        assert!(!vehicle.toggle_structural_debug());
    }
}
