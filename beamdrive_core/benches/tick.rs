// Benchmark for full vehicle ticks
// Run with: cargo bench --bench tick

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::Vector3;

use beamdrive_core::{
    BodyDesc, BodyShape, PhysicsWorld, RigidBodySolver, SimulationConfig, VehicleMaterials,
    VehicleSimulation,
};

const DT: f32 = 1.0 / 60.0;

fn world_with_ground() -> PhysicsWorld {
    let mut world = PhysicsWorld::default();
    let ground = world.materials().handle_by_name("ground");
    let mut desc = BodyDesc::fixed(BodyShape::Cuboid {
        half_extents: Vector3::new(500.0, 0.1, 500.0),
    })
    .with_position(Vector3::new(0.0, -0.1, 0.0));
    if let Some(ground) = ground {
        desc = desc.with_material(ground);
    }
    world.create_body(&desc);
    world
}

fn spawn(world: &mut PhysicsWorld, x: f32) -> VehicleSimulation {
    let mut config = SimulationConfig::default();
    config.vehicle.spawn_position = [x, 2.0, 0.0];
    let materials = VehicleMaterials::from_registry(world.materials());
    VehicleSimulation::spawn(world, config, materials).unwrap()
}

fn benchmark_single_vehicle_tick(c: &mut Criterion) {
    let mut world = world_with_ground();
    let mut vehicle = spawn(&mut world, 0.0);

    c.bench_function("vehicle_tick_60hz", |b| {
        b.iter(|| {
            vehicle.tick(&mut world, DT, black_box(1.0), 0.0, black_box(0.4));
            black_box(vehicle.damage())
        });
    });
}

fn benchmark_structure_snapshot(c: &mut Criterion) {
    let mut world = world_with_ground();
    let mut vehicle = spawn(&mut world, 0.0);
    vehicle.tick(&mut world, DT, 0.0, 0.0, 0.0);

    c.bench_function("structure_snapshot", |b| {
        vehicle.set_debug_options(beamdrive_core::DebugOptions {
            show_structural_debug: true,
        });
        b.iter(|| black_box(vehicle.structure_snapshot()));
    });
}

fn benchmark_vehicle_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("vehicle_scaling");

    for count in [1usize, 4, 8].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let mut world = world_with_ground();
            let mut vehicles: Vec<_> = (0..count)
                .map(|i| spawn(&mut world, i as f32 * 10.0))
                .collect();
            b.iter(|| {
                for vehicle in &mut vehicles {
                    vehicle.tick(&mut world, DT, 1.0, 0.0, 0.0);
                }
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_single_vehicle_tick,
    benchmark_structure_snapshot,
    benchmark_vehicle_count
);
criterion_main!(benches);
