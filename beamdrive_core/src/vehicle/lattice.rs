//! Node-beam structural lattice
//!
//! Each node is a small solver body pinned to the chassis at its layout
//! offset; each beam is a stiff distance constraint between two nodes.
//! After every solver step the lattice measures beam strain, converts it to
//! stress, breaks over-stressed beams and folds the total into a damage
//! metric that never decreases until [`StructuralLattice::reset`].
//!
//! Breaking is one-way within a lattice's lifetime. A broken beam releases
//! its constraint, halves both endpoint masses (floored at
//! `min_node_mass`) and is never re-evaluated.

use nalgebra::{Isometry3, Point3, Vector3};
use tracing::{debug, info, warn};

use super::debug::{stress_color, BeamSegment, NodeMarker, StructureSnapshot};
use super::layout::{CageLayout, NodeRole};
use crate::config::LatticeConfig;
use crate::error::{BeamDriveError, Result};
use crate::physics::{
    BodyDesc, BodyHandle, BodyShape, ConstraintHandle, MaterialHandle, RigidBodySolver,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BeamState {
    Intact,
    Broken,
}

/// Point mass of the lattice
#[derive(Clone, Debug)]
pub struct StructuralNode {
    pub local_offset: Vector3<f32>,
    pub role: NodeRole,
    pub body: BodyHandle,
    anchor: Option<ConstraintHandle>,
    /// Position read from the solver on the last structural step
    pub world_position: Vector3<f32>,
    initial_mass: f32,
    pub mass: f32,
    /// Indices of beams touching this node
    pub beams: Vec<usize>,
    /// Every beam touching this node has failed
    pub broken: bool,
    /// Highest stress among this node's beams on the last step
    pub stress: f32,
    /// Distance from the position the chassis pose implies
    pub displacement: f32,
    pub max_displacement: f32,
}

impl StructuralNode {
    pub fn initial_mass(&self) -> f32 {
        self.initial_mass
    }
}

/// Stiff connection between two nodes
#[derive(Clone, Debug)]
pub struct Beam {
    pub node_a: usize,
    pub node_b: usize,
    pub rest_length: f32,
    pub stress: f32,
    pub state: BeamState,
    constraint: Option<ConstraintHandle>,
}

impl Beam {
    pub fn is_broken(&self) -> bool {
        self.state == BeamState::Broken
    }
}

/// Outcome of one structural step
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StructureReport {
    pub total_stress: f32,
    pub newly_broken: usize,
    pub damage: f32,
}

pub struct StructuralLattice {
    config: LatticeConfig,
    chassis: BodyHandle,
    nodes: Vec<StructuralNode>,
    beams: Vec<Beam>,
    damage: f32,
    total_stress: f32,
    destroyed: bool,
}

impl StructuralLattice {
    /// Create node bodies, anchors and beams for `layout` around a chassis at `chassis_pose`.
    ///
    /// Configuration and layout are validated before the solver is touched.
    /// If the solver refuses any resource, everything created so far is
    /// released again.
    pub fn new<S: RigidBodySolver>(
        solver: &mut S,
        chassis: BodyHandle,
        chassis_pose: &Isometry3<f32>,
        layout: &CageLayout,
        config: LatticeConfig,
        material: Option<MaterialHandle>,
    ) -> Result<Self> {
        config.validate()?;
        layout.validate()?;

        let mut lattice = Self {
            config,
            chassis,
            nodes: Vec::with_capacity(layout.node_count()),
            beams: Vec::with_capacity(layout.beam_count()),
            damage: 0.0,
            total_stress: 0.0,
            destroyed: false,
        };

        if let Err(err) = lattice.build(solver, chassis_pose, layout, material) {
            lattice.destroy(solver);
            return Err(err);
        }

        debug!(
            "Built structural lattice: {} nodes, {} beams",
            lattice.nodes.len(),
            lattice.beams.len()
        );
        Ok(lattice)
    }

    fn build<S: RigidBodySolver>(
        &mut self,
        solver: &mut S,
        chassis_pose: &Isometry3<f32>,
        layout: &CageLayout,
        material: Option<MaterialHandle>,
    ) -> Result<()> {
        for spec in &layout.nodes {
            let position = chassis_pose * Point3::from(spec.offset);
            let mut desc = BodyDesc::dynamic(
                BodyShape::Ball {
                    radius: self.config.node_radius,
                },
                spec.mass,
            )
            .with_position(position.coords);
            if let Some(material) = material {
                desc = desc.with_material(material);
            }

            let body = solver
                .create_body(&desc)
                .ok_or(BeamDriveError::MissingBody("structural node"))?;
            self.nodes.push(StructuralNode {
                local_offset: spec.offset,
                role: spec.role,
                body,
                anchor: None,
                world_position: position.coords,
                initial_mass: spec.mass,
                mass: spec.mass,
                beams: Vec::new(),
                broken: false,
                stress: 0.0,
                displacement: 0.0,
                max_displacement: 0.0,
            });

            let anchor = solver
                .create_anchor_constraint(self.chassis, spec.offset, body)
                .ok_or(BeamDriveError::MissingBody("chassis"))?;
            if let Some(node) = self.nodes.last_mut() {
                node.anchor = Some(anchor);
            }
        }

        for &[a, b] in &layout.beams {
            let rest_length = (self.nodes[b].world_position - self.nodes[a].world_position).norm();
            let constraint = solver
                .create_distance_constraint(
                    self.nodes[a].body,
                    self.nodes[b].body,
                    rest_length,
                    self.config.beam_stiffness,
                )
                .ok_or(BeamDriveError::MissingBody("structural node"))?;

            let index = self.beams.len();
            self.beams.push(Beam {
                node_a: a,
                node_b: b,
                rest_length,
                stress: 0.0,
                state: BeamState::Intact,
                constraint: Some(constraint),
            });
            self.nodes[a].beams.push(index);
            self.nodes[b].beams.push(index);
        }

        Ok(())
    }

    /// Measure every intact beam, break the over-stressed ones and update damage.
    ///
    /// Must run after the solver step of the same tick.
    pub fn step_structure<S: RigidBodySolver>(
        &mut self,
        solver: &mut S,
        chassis_pose: &Isometry3<f32>,
    ) -> StructureReport {
        if self.destroyed {
            return StructureReport {
                damage: self.damage,
                ..Default::default()
            };
        }

        for node in &mut self.nodes {
            if let Some(position) = solver.position(node.body) {
                node.world_position = position;
            }
            let expected = chassis_pose * Point3::from(node.local_offset);
            node.displacement = (node.world_position - expected.coords).norm();
            node.max_displacement = node.max_displacement.max(node.displacement);
            node.stress = 0.0;
        }

        let mut total_stress = 0.0;
        let mut newly_broken = 0;
        for index in 0..self.beams.len() {
            let beam = &mut self.beams[index];
            if beam.is_broken() {
                continue;
            }

            let (a, b) = (beam.node_a, beam.node_b);
            let length = (self.nodes[b].world_position - self.nodes[a].world_position).norm();
            let strain = (length - beam.rest_length).abs() / beam.rest_length;
            let stress = strain * self.config.max_stress;
            beam.stress = stress;
            total_stress += stress;

            for node in [a, b] {
                self.nodes[node].stress = self.nodes[node].stress.max(stress);
            }

            if stress > self.config.break_threshold {
                self.break_beam(solver, index);
                newly_broken += 1;
            }
        }

        self.total_stress = total_stress;
        self.damage = self.damage.max(self.damage_for(total_stress));

        StructureReport {
            total_stress,
            newly_broken,
            damage: self.damage,
        }
    }

    fn damage_for(&self, total_stress: f32) -> f32 {
        if self.beams.is_empty() {
            return 0.0;
        }
        let beam_count = self.beams.len() as f32;
        (total_stress / (beam_count * self.config.damage_scale)).min(self.config.max_damage_cap)
    }

    fn break_beam<S: RigidBodySolver>(&mut self, solver: &mut S, index: usize) {
        let beam = &mut self.beams[index];
        beam.state = BeamState::Broken;
        if let Some(constraint) = beam.constraint.take() {
            solver.destroy_constraint(constraint);
        }
        let (a, b, stress) = (beam.node_a, beam.node_b, beam.stress);

        info!("Beam {} ({} <-> {}) broke at stress {:.0}", index, a, b, stress);

        for node_index in [a, b] {
            let floor = self.config.min_node_mass;
            let node = &mut self.nodes[node_index];
            let reduced = (node.mass * self.config.mass_loss_factor).max(floor.min(node.mass));
            if reduced <= floor && node.mass > floor {
                warn!("Node {} reached minimum mass {}", node_index, floor);
            }
            node.mass = reduced;
            solver.set_mass(node.body, reduced);

            let beams = &self.beams;
            node.broken = node.beams.iter().all(|&beam| beams[beam].is_broken());
        }
    }

    /// Put every node back at its offset from `chassis_pose`, restore masses,
    /// rebuild broken beams and clear damage. No-op after [`destroy`](Self::destroy).
    pub fn reset<S: RigidBodySolver>(&mut self, solver: &mut S, chassis_pose: &Isometry3<f32>) {
        if self.destroyed {
            return;
        }

        for node in &mut self.nodes {
            let position = (chassis_pose * Point3::from(node.local_offset)).coords;
            solver.set_position(node.body, position);
            solver.set_velocity(node.body, Vector3::zeros());
            solver.set_angular_velocity(node.body, Vector3::zeros());
            solver.set_mass(node.body, node.initial_mass);

            node.world_position = position;
            node.mass = node.initial_mass;
            node.broken = false;
            node.stress = 0.0;
            node.displacement = 0.0;
            node.max_displacement = 0.0;
        }

        let mut rebuilt = 0;
        for beam in &mut self.beams {
            beam.state = BeamState::Intact;
            beam.stress = 0.0;
            if beam.constraint.is_none() {
                beam.constraint = solver.create_distance_constraint(
                    self.nodes[beam.node_a].body,
                    self.nodes[beam.node_b].body,
                    beam.rest_length,
                    self.config.beam_stiffness,
                );
                rebuilt += 1;
            }
        }

        self.damage = 0.0;
        self.total_stress = 0.0;
        debug!("Lattice reset, {} beams rebuilt", rebuilt);
    }

    /// Release every constraint and node body. Safe to call more than once.
    pub fn destroy<S: RigidBodySolver>(&mut self, solver: &mut S) {
        if self.destroyed {
            return;
        }
        for beam in &mut self.beams {
            if let Some(constraint) = beam.constraint.take() {
                solver.destroy_constraint(constraint);
            }
        }
        for node in &mut self.nodes {
            if let Some(anchor) = node.anchor.take() {
                solver.destroy_constraint(anchor);
            }
            solver.destroy_body(node.body);
        }
        self.destroyed = true;
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Running maximum of the per-tick damage, in [0, max_damage_cap]
    pub fn damage(&self) -> f32 {
        self.damage
    }

    /// Damage as a share of the cap, in [0, 100]
    pub fn damage_percentage(&self) -> f32 {
        self.damage / self.config.max_damage_cap * 100.0
    }

    /// Summed stress of the intact beams on the last step
    pub fn total_stress(&self) -> f32 {
        self.total_stress
    }

    pub fn broken_beam_count(&self) -> usize {
        self.beams.iter().filter(|b| b.is_broken()).count()
    }

    /// Fraction of `role` nodes still attached by at least one beam.
    /// 1.0 when the layout has no node of that role.
    pub fn part_health(&self, role: NodeRole) -> f32 {
        let (total, intact) = self
            .nodes
            .iter()
            .filter(|n| n.role == role)
            .fold((0usize, 0usize), |(total, intact), n| {
                (total + 1, intact + usize::from(!n.broken))
            });
        if total == 0 {
            1.0
        } else {
            intact as f32 / total as f32
        }
    }

    pub fn nodes(&self) -> &[StructuralNode] {
        &self.nodes
    }

    pub fn beams(&self) -> &[Beam] {
        &self.beams
    }

    pub fn config(&self) -> &LatticeConfig {
        &self.config
    }

    pub fn snapshot(&self) -> StructureSnapshot {
        let nodes = self
            .nodes
            .iter()
            .map(|n| NodeMarker {
                position: n.world_position,
                role: n.role,
                stress: n.stress,
                broken: n.broken,
            })
            .collect();

        let beams = self
            .beams
            .iter()
            .filter(|b| !b.is_broken())
            .map(|b| BeamSegment {
                start: self.nodes[b.node_a].world_position,
                end: self.nodes[b.node_b].world_position,
                stress: b.stress,
                color: stress_color(b.stress, self.config.max_stress),
            })
            .collect();

        StructureSnapshot {
            nodes,
            beams,
            broken_beams: self.broken_beam_count(),
            damage: self.damage,
        }
    }
}
