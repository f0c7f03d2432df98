//! Structural debug snapshots
//!
//! The lattice exports node positions and beam segments coloured by stress
//! so a renderer can overlay the cage on the vehicle. Nothing here draws;
//! consumers decide how to present the snapshot.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::layout::NodeRole;

/// Debug output toggles
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugOptions {
    /// Export lattice snapshots every tick
    pub show_structural_debug: bool,
}

/// One node as seen by the debug overlay
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeMarker {
    pub position: Vector3<f32>,
    pub role: NodeRole,
    pub stress: f32,
    /// Every beam touching this node has failed
    pub broken: bool,
}

/// One intact beam as seen by the debug overlay
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BeamSegment {
    pub start: Vector3<f32>,
    pub end: Vector3<f32>,
    pub stress: f32,
    pub color: [f32; 3],
}

/// Lattice state for one tick
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StructureSnapshot {
    pub nodes: Vec<NodeMarker>,
    pub beams: Vec<BeamSegment>,
    pub broken_beams: usize,
    pub damage: f32,
}

/// Green at rest, yellow at half `max_stress`, red at or above it
pub fn stress_color(stress: f32, max_stress: f32) -> [f32; 3] {
    let t = (stress / max_stress).clamp(0.0, 1.0);
    if max_stress <= 0.0 || t.is_nan() {
        return [1.0, 0.0, 0.0];
    }
    if t < 0.5 {
        [t * 2.0, 1.0, 0.0]
    } else {
        [1.0, (1.0 - t) * 2.0, 0.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stress_color_ramp() {
        assert_eq!(stress_color(0.0, 10_000.0), [0.0, 1.0, 0.0]);
        assert_eq!(stress_color(5_000.0, 10_000.0), [1.0, 1.0, 0.0]);
        assert_eq!(stress_color(10_000.0, 10_000.0), [1.0, 0.0, 0.0]);
        assert_eq!(stress_color(50_000.0, 10_000.0), [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_stress_color_degenerate_scale() {
        assert_eq!(stress_color(1.0, 0.0), [1.0, 0.0, 0.0]);
        assert_eq!(stress_color(f32::NAN, 1.0), [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_debug_disabled_by_default() {
        assert!(!DebugOptions::default().show_structural_debug);
    }
}
