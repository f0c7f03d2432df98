//! Loading simulation configs from disk

use std::io::Write;

use beamdrive_core::{
    BeamDriveError, PhysicsWorld, SimulationConfig, VehicleMaterials, VehicleSimulation,
};
use tempfile::NamedTempFile;

fn temp_file(suffix: &str, contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_toml() {
    let file = temp_file(
        ".toml",
        r#"
[vehicle]
wheel_base = 2.8
spawn_position = [5.0, 3.0, -1.0]

[lattice]
break_threshold = 12000.0
"#,
    );

    let config = SimulationConfig::load(file.path()).unwrap();
    assert_eq!(config.vehicle.wheel_base, 2.8);
    assert_eq!(config.vehicle.spawn_position, [5.0, 3.0, -1.0]);
    assert_eq!(config.lattice.break_threshold, 12_000.0);
    assert!(!config.debug.show_structural_debug);
}

#[test]
fn test_load_yaml_and_spawn() {
    let file = temp_file(
        ".yaml",
        "vehicle:\n  chassis_mass: 1500.0\ndebug:\n  show_structural_debug: true\n",
    );

    let config = SimulationConfig::load(file.path()).unwrap();
    assert_eq!(config.vehicle.chassis_mass, 1500.0);

    let mut world = PhysicsWorld::default();
    let materials = VehicleMaterials::from_registry(world.materials());
    let car = VehicleSimulation::spawn(&mut world, config, materials).unwrap();
    assert!(car.structure_snapshot().is_some());
}

#[test]
fn test_unsupported_extension() {
    let file = temp_file(".json", "{}");
    let result = SimulationConfig::load(file.path());
    assert!(matches!(result, Err(BeamDriveError::UnsupportedFormat(ext)) if ext == "json"));
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = SimulationConfig::load(dir.path().join("missing.toml"));
    assert!(matches!(result, Err(BeamDriveError::Io { .. })));
}

#[test]
fn test_invalid_values_rejected() {
    let file = temp_file(".toml", "[lattice]\nmax_stress = -5.0\n");
    let result = SimulationConfig::load(file.path());
    assert!(matches!(result, Err(BeamDriveError::Config(_))));
}

#[test]
fn test_malformed_toml() {
    let file = temp_file(".toml", "[vehicle\nwheel_base = ");
    assert!(matches!(
        SimulationConfig::load(file.path()),
        Err(BeamDriveError::Toml(_))
    ));
}
