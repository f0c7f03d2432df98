pub mod controller;
pub mod debug;
pub mod grip;
pub mod lattice;
pub mod layout;
pub mod simulation;

pub use controller::{wrap_angle, DriverInput, VehicleKinematicController, VehicleState};
pub use debug::{stress_color, BeamSegment, DebugOptions, NodeMarker, StructureSnapshot};
pub use grip::LateralGripCorrector;
pub use lattice::{Beam, BeamState, StructuralLattice, StructuralNode, StructureReport};
pub use layout::{CageLayout, NodeRole, NodeSpec};
pub use simulation::{VehicleMaterials, VehicleSimulation};
