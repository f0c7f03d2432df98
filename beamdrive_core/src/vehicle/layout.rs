//! Node/beam layouts for the structural lattice
//!
//! A layout is pure data: node offsets in the chassis frame, their masses and
//! body regions, and the node pairs connected by beams. Rest lengths are not
//! stored; the lattice derives them from the offsets at construction.

use nalgebra::Vector3;

use crate::error::ConfigError;

/// Body region a node belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeRole {
    /// Load-bearing floor rails
    Frame,
    /// Front and rear crush zones
    Crumple,
    /// Beltline above the floor rails
    Upper,
    Roof,
}

impl NodeRole {
    pub const ALL: [NodeRole; 4] = [
        NodeRole::Frame,
        NodeRole::Crumple,
        NodeRole::Upper,
        NodeRole::Roof,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NodeRole::Frame => "frame",
            NodeRole::Crumple => "crumple",
            NodeRole::Upper => "upper",
            NodeRole::Roof => "roof",
        }
    }
}

/// One node of a layout
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeSpec {
    /// Offset from the chassis origin, in the chassis frame
    pub offset: Vector3<f32>,
    pub mass: f32,
    pub role: NodeRole,
}

/// Nodes plus the beams between them
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CageLayout {
    pub nodes: Vec<NodeSpec>,
    pub beams: Vec<[usize; 2]>,
}

impl CageLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node and return its index
    pub fn add_node(&mut self, offset: Vector3<f32>, mass: f32, role: NodeRole) -> usize {
        self.nodes.push(NodeSpec { offset, mass, role });
        self.nodes.len() - 1
    }

    /// Add a beam between two node indices
    pub fn connect(&mut self, node_a: usize, node_b: usize) {
        self.beams.push([node_a, node_b]);
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn beam_count(&self) -> usize {
        self.beams.len()
    }

    /// Rest length of a beam, if both endpoints exist
    pub fn rest_length(&self, beam: usize) -> Option<f32> {
        let [a, b] = *self.beams.get(beam)?;
        let a = self.nodes.get(a)?;
        let b = self.nodes.get(b)?;
        Some((b.offset - a.offset).norm())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nodes.is_empty() {
            return Err(ConfigError::EmptyLayout);
        }

        for (index, node) in self.nodes.iter().enumerate() {
            if !(node.mass.is_finite() && node.mass > 0.0) {
                return Err(ConfigError::InvalidNodeMass {
                    index,
                    mass: node.mass,
                });
            }
            for coordinate in node.offset.iter() {
                if !coordinate.is_finite() {
                    return Err(ConfigError::NotFinite {
                        field: "node offset",
                        value: *coordinate,
                    });
                }
            }
        }

        let count = self.nodes.len();
        for (beam, &[a, b]) in self.beams.iter().enumerate() {
            for node in [a, b] {
                if node >= count {
                    return Err(ConfigError::NodeOutOfBounds { beam, node, count });
                }
            }
            if a == b {
                return Err(ConfigError::SelfConnectedBeam { beam, node: a });
            }
            if (self.nodes[b].offset - self.nodes[a].offset).norm() <= f32::EPSILON {
                return Err(ConfigError::ZeroRestLength { beam, a, b });
            }
        }

        Ok(())
    }

    /// Twenty-node passenger car cage: front crush zone, two floor and
    /// beltline sections, rear crush zone, and a four-node roof tied to the
    /// beltline and the crush-zone tops by pillars.
    pub fn passenger_car() -> Self {
        let mut layout = Self::new();

        // Front: 0-3
        layout.add_node(Vector3::new(-0.8, -0.3, -2.0), 10.0, NodeRole::Crumple);
        layout.add_node(Vector3::new(0.8, -0.3, -2.0), 10.0, NodeRole::Crumple);
        layout.add_node(Vector3::new(-0.8, 0.5, -1.8), 5.0, NodeRole::Crumple);
        layout.add_node(Vector3::new(0.8, 0.5, -1.8), 5.0, NodeRole::Crumple);

        // Front of cabin: 4-7
        layout.add_node(Vector3::new(-0.9, -0.3, -0.5), 15.0, NodeRole::Frame);
        layout.add_node(Vector3::new(0.9, -0.3, -0.5), 15.0, NodeRole::Frame);
        layout.add_node(Vector3::new(-0.9, 0.7, -0.5), 8.0, NodeRole::Upper);
        layout.add_node(Vector3::new(0.9, 0.7, -0.5), 8.0, NodeRole::Upper);

        // Rear of cabin: 8-11
        layout.add_node(Vector3::new(-0.9, -0.3, 0.5), 15.0, NodeRole::Frame);
        layout.add_node(Vector3::new(0.9, -0.3, 0.5), 15.0, NodeRole::Frame);
        layout.add_node(Vector3::new(-0.9, 0.7, 0.5), 8.0, NodeRole::Upper);
        layout.add_node(Vector3::new(0.9, 0.7, 0.5), 8.0, NodeRole::Upper);

        // Rear: 12-15
        layout.add_node(Vector3::new(-0.8, -0.3, 2.0), 10.0, NodeRole::Crumple);
        layout.add_node(Vector3::new(0.8, -0.3, 2.0), 10.0, NodeRole::Crumple);
        layout.add_node(Vector3::new(-0.8, 0.5, 1.8), 5.0, NodeRole::Crumple);
        layout.add_node(Vector3::new(0.8, 0.5, 1.8), 5.0, NodeRole::Crumple);

        // Roof: 16-19
        layout.add_node(Vector3::new(-0.7, 1.2, -0.3), 3.0, NodeRole::Roof);
        layout.add_node(Vector3::new(0.7, 1.2, -0.3), 3.0, NodeRole::Roof);
        layout.add_node(Vector3::new(-0.7, 1.2, 0.3), 3.0, NodeRole::Roof);
        layout.add_node(Vector3::new(0.7, 1.2, 0.3), 3.0, NodeRole::Roof);

        #[rustfmt::skip]
        const BEAMS: [[usize; 2]; 48] = [
            // Front box with cross bracing
            [0, 1], [2, 3], [0, 2], [1, 3], [0, 3], [1, 2],
            [0, 4], [1, 5], [2, 6], [3, 7],
            // Cabin front section
            [4, 5], [6, 7], [4, 6], [5, 7], [4, 7], [5, 6],
            [4, 8], [5, 9], [6, 10], [7, 11],
            [8, 9], [10, 11], [8, 10], [9, 11],
            [8, 12], [9, 13], [10, 14], [11, 15],
            // Rear box
            [12, 13], [14, 15], [12, 14], [13, 15], [12, 15], [13, 14],
            // Roof
            [6, 16], [7, 17], [10, 18], [11, 19],
            [16, 17], [18, 19], [16, 18], [17, 19], [16, 19], [17, 18],
            // Pillars
            [2, 16], [3, 17], [14, 18], [15, 19],
        ];
        for [a, b] in BEAMS {
            layout.connect(a, b);
        }

        layout
    }
}
