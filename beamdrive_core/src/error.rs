//! Error types for vehicle and lattice construction
//!
//! Only construction can fail. Ticking, resetting and disposing a vehicle
//! are infallible: beam failure and mass loss are state transitions, and
//! releasing an already-released solver handle is a no-op.

use std::path::PathBuf;
use thiserror::Error;

/// Invalid configuration detected before any solver resource is created
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("'{field}' must be finite and positive (got {value})")]
    NotPositive { field: &'static str, value: f32 },

    #[error("'{field}' must lie in [{min}, {max}] (got {value})")]
    OutOfRange {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("'{field}' must be finite and non-negative (got {value})")]
    Negative { field: &'static str, value: f32 },

    #[error("'{field}' must be finite (got {value})")]
    NotFinite { field: &'static str, value: f32 },

    #[error("Cage layout has no nodes")]
    EmptyLayout,

    #[error("Node {index} has non-positive mass {mass}")]
    InvalidNodeMass { index: usize, mass: f32 },

    #[error("Beam {beam} references node {node} but the layout has {count} nodes")]
    NodeOutOfBounds { beam: usize, node: usize, count: usize },

    #[error("Beam {beam} connects node {node} to itself")]
    SelfConnectedBeam { beam: usize, node: usize },

    #[error("Beam {beam} has zero rest length (nodes {a} and {b} coincide)")]
    ZeroRestLength { beam: usize, a: usize, b: usize },
}

impl ConfigError {
    /// Check that `value` is finite and strictly positive
    pub fn check_positive(field: &'static str, value: f32) -> std::result::Result<(), ConfigError> {
        if value.is_finite() && value > 0.0 {
            Ok(())
        } else {
            Err(ConfigError::NotPositive { field, value })
        }
    }

    /// Check that `value` is finite and within `[min, max]`
    pub fn check_range(
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    ) -> std::result::Result<(), ConfigError> {
        if value.is_finite() && (min..=max).contains(&value) {
            Ok(())
        } else {
            Err(ConfigError::OutOfRange {
                field,
                value,
                min,
                max,
            })
        }
    }

    /// Check that `value` is finite and not below zero
    pub fn check_non_negative(
        field: &'static str,
        value: f32,
    ) -> std::result::Result<(), ConfigError> {
        if value.is_finite() && value >= 0.0 {
            Ok(())
        } else {
            Err(ConfigError::Negative { field, value })
        }
    }
}

/// Top-level error for the beamdrive core
#[derive(Debug, Error)]
pub enum BeamDriveError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Unsupported config format '{0}' (expected .toml, .yaml or .yml)")]
    UnsupportedFormat(String),

    #[error("Solver refused to create the {0} body")]
    MissingBody(&'static str),
}

/// Result type for beamdrive operations
pub type Result<T> = std::result::Result<T, BeamDriveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_positive() {
        assert!(ConfigError::check_positive("wheel_base", 2.6).is_ok());
        assert_eq!(
            ConfigError::check_positive("wheel_base", 0.0),
            Err(ConfigError::NotPositive {
                field: "wheel_base",
                value: 0.0
            })
        );
        assert!(ConfigError::check_positive("wheel_base", -1.0).is_err());
        assert!(ConfigError::check_positive("wheel_base", f32::INFINITY).is_err());
        assert!(ConfigError::check_positive("wheel_base", f32::NAN).is_err());
    }

    #[test]
    fn test_check_range() {
        assert!(ConfigError::check_range("brake_strength", 0.4, 0.0, 1.0).is_ok());
        assert!(ConfigError::check_range("brake_strength", 1.0, 0.0, 1.0).is_ok());
        assert!(ConfigError::check_range("brake_strength", 1.5, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_check_non_negative() {
        assert!(ConfigError::check_non_negative("damping", 0.0).is_ok());
        assert_eq!(
            ConfigError::check_non_negative("damping", -0.5),
            Err(ConfigError::Negative {
                field: "damping",
                value: -0.5
            })
        );
    }

    #[test]
    fn test_check_helpers_propagate_into_crate_result() {
        fn load_brake(value: f32) -> Result<f32> {
            ConfigError::check_range("brake_strength", value, 0.0, 1.0)?;
            ConfigError::check_positive("brake_strength", value)?;
            Ok(value)
        }

        assert_eq!(load_brake(0.4).unwrap(), 0.4);
        assert!(matches!(
            load_brake(2.0),
            Err(BeamDriveError::Config(ConfigError::OutOfRange { value, .. })) if value == 2.0
        ));
        assert!(matches!(
            load_brake(0.0),
            Err(BeamDriveError::Config(ConfigError::NotPositive { .. }))
        ));
    }

    #[test]
    fn test_error_messages() {
        let err = ConfigError::SelfConnectedBeam { beam: 3, node: 7 };
        assert_eq!(err.to_string(), "Beam 3 connects node 7 to itself");

        let wrapped: BeamDriveError = err.into();
        assert!(wrapped.to_string().starts_with("Invalid configuration"));
    }
}
