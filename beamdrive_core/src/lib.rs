//! # beamdrive_core
//!
//! Arcade vehicle dynamics with a breakable node-beam body.
//!
//! A [`VehicleSimulation`] drives a chassis body with a kinematic bicycle
//! model, damps sideways sliding after each solver step and tracks a lattice
//! of point masses and stiff beams pinned to the chassis. Beams that stretch
//! or compress too far break for good; the accumulated stress becomes a
//! damage value that only [`VehicleSimulation::reset`] clears.
//!
//! All physics goes through the [`RigidBodySolver`] trait. [`PhysicsWorld`]
//! implements it on top of Rapier3D and owns the contact material registry.
//!
//! ```no_run
//! use beamdrive_core::{PhysicsWorld, SimulationConfig, VehicleMaterials, VehicleSimulation};
//!
//! let mut world = PhysicsWorld::default();
//! let materials = VehicleMaterials::from_registry(world.materials());
//! let mut car = VehicleSimulation::spawn(&mut world, SimulationConfig::default(), materials)?;
//!
//! for _ in 0..120 {
//!     car.tick(&mut world, 1.0 / 60.0, 1.0, 0.0, 0.3);
//! }
//! println!("damage: {:.1}%", car.damage_percentage());
//! # Ok::<(), beamdrive_core::BeamDriveError>(())
//! ```

pub mod config;
pub mod error;
pub mod physics;
pub mod vehicle;

pub use config::{LatticeConfig, SimulationConfig, VehicleConfig};
pub use error::{BeamDriveError, ConfigError, Result};
pub use physics::{
    BodyDesc, BodyHandle, BodyKind, BodyShape, ConstraintHandle, ContactMaterialRegistry,
    ContactProperties, MaterialHandle, MaterialPreset, PhysicsWorld, RigidBodySolver,
};
pub use vehicle::{
    CageLayout, DebugOptions, DriverInput, LateralGripCorrector, NodeRole, StructuralLattice,
    StructureSnapshot, VehicleKinematicController, VehicleMaterials, VehicleSimulation,
    VehicleState,
};
