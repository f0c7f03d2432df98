pub mod material;
pub mod solver;
pub mod world;

pub use material::{ContactMaterialRegistry, ContactProperties, MaterialHandle, MaterialPreset};
pub use solver::{BodyDesc, BodyHandle, BodyKind, BodyShape, ConstraintHandle, RigidBodySolver};
pub use world::PhysicsWorld;
