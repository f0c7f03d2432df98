//! # beamdrive_sim - Headless vehicle damage simulator
//!
//! Usage:
//!   beamdrive_sim                              # One car, default config
//!   beamdrive_sim --config car.toml            # Custom config (TOML or YAML)
//!   beamdrive_sim --script slalom --ticks 1800 # Scripted slalom for 30 s
//!   beamdrive_sim --barrier 25                 # Drive into a wall 25 m ahead

use std::path::PathBuf;

use anyhow::{Context, Result};
use beamdrive_core::{
    BodyDesc, BodyShape, DriverInput, NodeRole, PhysicsWorld, RigidBodySolver, SimulationConfig,
    VehicleMaterials, VehicleSimulation,
};
use clap::{Parser, ValueEnum};
use nalgebra::Vector3;
use tracing::{info, warn};

/// CLI arguments
#[derive(Parser)]
#[command(name = "beamdrive_sim")]
#[command(about = "Headless vehicle dynamics and structural damage simulator")]
struct Args {
    /// Simulation config file (TOML or YAML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of ticks to run
    #[arg(long, default_value = "600")]
    ticks: u32,

    /// Tick rate in Hz
    #[arg(long, default_value = "60")]
    rate: f32,

    /// Number of vehicles, spawned side by side
    #[arg(long, default_value = "1")]
    vehicles: usize,

    /// Input sequence fed to every vehicle
    #[arg(long, value_enum, default_value = "straight")]
    script: Script,

    /// Place a metal wall this many meters ahead of the spawn line
    #[arg(long)]
    barrier: Option<f32>,

    /// Log lattice snapshots once per second
    #[arg(long)]
    structural_debug: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Script {
    /// Full throttle, wheels straight
    Straight,
    /// Full throttle, full left lock
    Circle,
    /// Full throttle, steering flips every two seconds
    Slalom,
    /// Accelerate for three seconds, then brake
    Stop,
}

impl Script {
    fn input(self, tick: u32, rate: f32) -> DriverInput {
        let seconds = tick as f32 / rate;
        match self {
            Script::Straight => DriverInput::new(1.0, 0.0, 0.0),
            Script::Circle => DriverInput::new(1.0, 0.0, 1.0),
            Script::Slalom => {
                let steer = if (seconds / 2.0) as u32 % 2 == 0 { 0.6 } else { -0.6 };
                DriverInput::new(1.0, 0.0, steer)
            }
            Script::Stop => {
                if seconds < 3.0 {
                    DriverInput::new(1.0, 0.0, 0.0)
                } else {
                    DriverInput::new(0.0, 1.0, 0.0)
                }
            }
        }
    }
}

/// Spacing between vehicles along X
const LANE_WIDTH: f32 = 6.0;

fn build_world(barrier: Option<f32>, vehicles: usize) -> PhysicsWorld {
    let mut world = PhysicsWorld::default();

    let mut ground = BodyDesc::fixed(BodyShape::Cuboid {
        half_extents: Vector3::new(1000.0, 0.1, 1000.0),
    })
    .with_position(Vector3::new(0.0, -0.1, 0.0));
    if let Some(material) = world.materials().handle_by_name("ground") {
        ground = ground.with_material(material);
    }
    world.create_body(&ground);

    if let Some(distance) = barrier {
        let half_width = (vehicles as f32 * LANE_WIDTH).max(LANE_WIDTH);
        let mut wall = BodyDesc::fixed(BodyShape::Cuboid {
            half_extents: Vector3::new(half_width, 1.5, 0.5),
        })
        .with_position(Vector3::new(0.0, 1.5, -distance));
        if let Some(material) = world.materials().handle_by_name("metal") {
            wall = wall.with_material(material);
        }
        world.create_body(&wall);
        info!("Barrier placed {:.1} m ahead", distance);
    }

    world
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        "beamdrive_sim=debug,beamdrive_core=debug,info"
    } else {
        "beamdrive_sim=info,beamdrive_core=info"
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => SimulationConfig::default(),
    };
    if args.structural_debug {
        config.debug.show_structural_debug = true;
    }
    if !(args.rate.is_finite() && args.rate > 0.0) {
        anyhow::bail!("Tick rate must be positive (got {})", args.rate);
    }
    let dt = 1.0 / args.rate;
    let vehicle_count = args.vehicles.max(1);

    let mut world = build_world(args.barrier, vehicle_count);
    let materials = VehicleMaterials::from_registry(world.materials());

    let mut vehicles = Vec::with_capacity(vehicle_count);
    let base = config.vehicle.spawn_position;
    for index in 0..vehicle_count {
        let mut vehicle_config = config.clone();
        let lane = index as f32 - (vehicle_count - 1) as f32 / 2.0;
        vehicle_config.vehicle.spawn_position = [base[0] + lane * LANE_WIDTH, base[1], base[2]];
        let vehicle = VehicleSimulation::spawn(&mut world, vehicle_config, materials)
            .with_context(|| format!("Failed to spawn vehicle {}", index))?;
        vehicles.push(vehicle);
    }

    info!(
        "Running {} vehicle(s) for {} ticks at {} Hz ({:?})",
        vehicle_count, args.ticks, args.rate, args.script
    );

    let report_every = (args.rate.round() as u32).max(1);
    for tick in 0..args.ticks {
        let input = args.script.input(tick, args.rate);
        for vehicle in &mut vehicles {
            vehicle.tick_with_input(&mut world, dt, input);
        }

        if (tick + 1) % report_every == 0 {
            for (index, vehicle) in vehicles.iter().enumerate() {
                let (position, yaw) = vehicle.pose();
                info!(
                    "[{:>4}] car {} pos=({:.1}, {:.1}, {:.1}) yaw={:.2} speed={:.1} damage={:.1}%",
                    tick + 1,
                    index,
                    position.x,
                    position.y,
                    position.z,
                    yaw,
                    vehicle.speed(),
                    vehicle.damage_percentage()
                );
                if let Some(snapshot) = vehicle.structure_snapshot() {
                    let peak = snapshot.beams.iter().map(|b| b.stress).fold(0.0_f32, f32::max);
                    info!(
                        "       lattice: {} intact beams, {} broken, peak stress {:.0}",
                        snapshot.beams.len(),
                        snapshot.broken_beams,
                        peak
                    );
                }
            }
        }
    }

    for (index, vehicle) in vehicles.iter().enumerate() {
        let lattice = vehicle.lattice();
        info!(
            "Car {}: damage {:.1}%, {} of {} beams broken",
            index,
            vehicle.damage_percentage(),
            lattice.broken_beam_count(),
            lattice.beams().len()
        );
        for role in NodeRole::ALL {
            let health = vehicle.part_health(role);
            if health < 1.0 {
                warn!("       {} health {:.0}%", role.name(), health * 100.0);
            } else {
                info!("       {} intact", role.name());
            }
        }
    }

    for vehicle in &mut vehicles {
        vehicle.dispose(&mut world);
    }
    Ok(())
}
