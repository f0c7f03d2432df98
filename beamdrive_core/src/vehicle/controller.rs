//! Kinematic bicycle-model controller
//!
//! Throttle moves the body directly along the front-wheel direction and
//! overrides its velocity; releasing throttle stops the body dead. There is
//! no coasting or inertia in this model.

use std::f32::consts::{PI, TAU};

use nalgebra::{UnitQuaternion, Vector3};

use crate::config::VehicleConfig;
use crate::error::ConfigError;

/// Driver commands for one tick
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DriverInput {
    /// [0, 1]
    pub throttle: f32,
    /// [0, 1]
    pub brake: f32,
    /// [-1, 1], positive steers towards +yaw
    pub steer: f32,
}

impl DriverInput {
    pub fn new(throttle: f32, brake: f32, steer: f32) -> Self {
        Self {
            throttle,
            brake,
            steer,
        }
    }

    /// Inputs forced into their valid ranges; non-finite values become zero
    pub fn clamped(self) -> Self {
        Self {
            throttle: sanitize(self.throttle).clamp(0.0, 1.0),
            brake: sanitize(self.brake).clamp(0.0, 1.0),
            steer: sanitize(self.steer).clamp(-1.0, 1.0),
        }
    }
}

fn sanitize(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Kinematic state of one vehicle, owned by its controller
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VehicleState {
    pub position: Vector3<f32>,
    /// Radians, always in (-PI, PI]
    pub yaw: f32,
    pub velocity: Vector3<f32>,
    /// |velocity|
    pub speed: f32,
    pub steer: f32,
    /// Radians, bounded by the configured maximum steer angle
    pub front_wheel_angle: f32,
    pub throttle: f32,
    pub brake: f32,
}

impl VehicleState {
    /// At rest at `position`, facing yaw 0
    pub fn at(position: Vector3<f32>) -> Self {
        Self {
            position,
            yaw: 0.0,
            velocity: Vector3::zeros(),
            speed: 0.0,
            steer: 0.0,
            front_wheel_angle: 0.0,
            throttle: 0.0,
            brake: 0.0,
        }
    }

    pub fn forward(&self) -> Vector3<f32> {
        forward_axis(self.yaw)
    }

    pub fn orientation(&self) -> UnitQuaternion<f32> {
        yaw_rotation(self.yaw)
    }
}

/// Unit vector the vehicle faces at `yaw` (yaw 0 faces -Z)
pub fn forward_axis(yaw: f32) -> Vector3<f32> {
    Vector3::new(yaw.sin(), 0.0, -yaw.cos())
}

/// Unit vector to the vehicle's right at `yaw`
pub fn right_axis(yaw: f32) -> Vector3<f32> {
    Vector3::new(yaw.cos(), 0.0, yaw.sin())
}

/// Body orientation for a heading. Positive yaw turns forward (-Z) towards +X,
/// which is a negative rotation about +Y.
pub fn yaw_rotation(yaw: f32) -> UnitQuaternion<f32> {
    UnitQuaternion::from_axis_angle(&Vector3::y_axis(), -yaw)
}

/// Wrap an angle into (-PI, PI]
pub fn wrap_angle(angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

/// Turns driver input into position, yaw and velocity changes
#[derive(Clone, Debug)]
pub struct VehicleKinematicController {
    wheel_base: f32,
    max_steer_angle: f32,
    speed_per_unit_throttle: f32,
    reference_rate: f32,
    brake_strength: f32,
    steer_epsilon: f32,
    speed_epsilon: f32,
    state: VehicleState,
}

impl VehicleKinematicController {
    pub fn new(config: &VehicleConfig, position: Vector3<f32>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            wheel_base: config.wheel_base,
            max_steer_angle: config.max_steer_angle,
            speed_per_unit_throttle: config.speed_per_unit_throttle,
            reference_rate: config.reference_rate,
            brake_strength: config.brake_strength,
            steer_epsilon: config.steer_epsilon,
            speed_epsilon: config.speed_epsilon,
            state: VehicleState::at(position),
        })
    }

    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    pub fn wheel_base(&self) -> f32 {
        self.wheel_base
    }

    pub fn max_steer_angle(&self) -> f32 {
        self.max_steer_angle
    }

    /// Advance one tick: steering, then throttle, then braking
    pub fn update(&mut self, dt: f32, input: DriverInput) {
        let input = input.clamped();
        self.state.throttle = input.throttle;
        self.state.brake = input.brake;

        self.apply_steering(input.steer);
        self.apply_throttle(input.throttle, dt);
        self.apply_brake(input.brake);
        self.state.speed = self.state.velocity.norm();
    }

    pub fn apply_steering(&mut self, steer: f32) {
        self.state.steer = steer;
        self.state.front_wheel_angle =
            (steer * self.max_steer_angle).clamp(-self.max_steer_angle, self.max_steer_angle);
    }

    fn apply_throttle(&mut self, throttle: f32, dt: f32) {
        if throttle <= 0.0 {
            self.state.velocity = Vector3::zeros();
            return;
        }

        // Distance per reference frame
        let speed = throttle * self.speed_per_unit_throttle;
        let front_wheel_angle = self.state.front_wheel_angle;
        let direction = forward_axis(self.state.yaw + front_wheel_angle);

        self.state.position += direction * speed;

        if front_wheel_angle.abs() > self.steer_epsilon && speed > self.speed_epsilon {
            let angular_velocity =
                (speed * self.reference_rate) * front_wheel_angle.sin() / self.wheel_base;
            self.state.yaw += angular_velocity * dt;
        }
        self.state.yaw = wrap_angle(self.state.yaw);

        self.state.velocity = direction * speed * self.reference_rate;
    }

    /// Scale the current velocity: Z is treated as forward, X as lateral
    fn apply_brake(&mut self, brake: f32) {
        if brake <= 0.0 {
            return;
        }
        let reduction = brake * self.brake_strength;
        self.state.velocity.z *= 1.0 - reduction;
        self.state.velocity.x *= 1.0 - reduction * 0.5;
    }

    /// Adopt the body's settled position and velocity after the solver step
    pub fn sync_from_body(&mut self, position: Vector3<f32>, velocity: Vector3<f32>) {
        self.state.position = position;
        self.state.velocity = velocity;
        self.state.speed = velocity.norm();
    }

    pub fn set_position(&mut self, position: Vector3<f32>) {
        self.state.position = position;
        self.state.velocity = Vector3::zeros();
        self.state.speed = 0.0;
    }

    pub fn reset(&mut self, position: Vector3<f32>) {
        self.state = VehicleState::at(position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_6;

    const DT: f32 = 1.0 / 60.0;

    fn controller() -> VehicleKinematicController {
        VehicleKinematicController::new(&VehicleConfig::default(), Vector3::zeros()).unwrap()
    }

    #[test]
    fn test_wrap_angle() {
        assert_relative_eq!(wrap_angle(0.5), 0.5);
        assert_relative_eq!(wrap_angle(PI), PI);
        assert_relative_eq!(wrap_angle(-PI), PI);
        assert_relative_eq!(wrap_angle(3.0 * PI / 2.0), -PI / 2.0, epsilon = 1e-5);
        assert_relative_eq!(wrap_angle(-3.0 * PI / 2.0), PI / 2.0, epsilon = 1e-5);
        assert_eq!(wrap_angle(f32::NAN), 0.0);

        for i in -200..200 {
            let angle = i as f32 * 0.37;
            let wrapped = wrap_angle(angle);
            assert!(wrapped > -PI && wrapped <= PI, "{} -> {}", angle, wrapped);
        }
    }

    #[test]
    fn test_axes_are_orthonormal() {
        for yaw in [0.0, 0.3, -1.2, PI] {
            let f = forward_axis(yaw);
            let r = right_axis(yaw);
            assert_relative_eq!(f.norm(), 1.0, epsilon = 1e-6);
            assert_relative_eq!(r.norm(), 1.0, epsilon = 1e-6);
            assert_relative_eq!(f.dot(&r), 0.0, epsilon = 1e-6);
        }
        assert_eq!(forward_axis(0.0), Vector3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_yaw_rotation_matches_forward_axis() {
        let yaw = 0.7;
        let rotated = yaw_rotation(yaw) * Vector3::new(0.0, 0.0, -1.0);
        assert_relative_eq!(rotated, forward_axis(yaw), epsilon = 1e-6);
    }

    #[test]
    fn test_reference_full_lock_tick() {
        let mut ctrl = controller();
        ctrl.update(DT, DriverInput::new(1.0, 0.0, 1.0));

        let state = ctrl.state();
        assert_relative_eq!(state.front_wheel_angle, FRAC_PI_6, epsilon = 1e-4);
        assert_relative_eq!(state.front_wheel_angle, 0.5236, epsilon = 1e-4);

        // 12 * sin(30deg) / 2.6 rad/s over one 60 Hz frame
        let angular_velocity = 12.0 * FRAC_PI_6.sin() / 2.6;
        assert_relative_eq!(angular_velocity, 2.308, epsilon = 1e-3);
        assert_relative_eq!(state.yaw, 0.03846, epsilon = 1e-4);

        // Moved 0.2 units along the front-wheel direction
        assert_relative_eq!(state.position.norm(), 0.2, epsilon = 1e-5);
        assert_relative_eq!(state.speed, 12.0, epsilon = 1e-4);
    }

    #[test]
    fn test_straight_line_does_not_turn() {
        let mut ctrl = controller();
        for _ in 0..10 {
            ctrl.update(DT, DriverInput::new(1.0, 0.0, 0.0));
        }
        let state = ctrl.state();
        assert_eq!(state.yaw, 0.0);
        assert_relative_eq!(state.position.z, -2.0, epsilon = 1e-4);
        assert_relative_eq!(state.position.x, 0.0);
        assert_relative_eq!(state.velocity, Vector3::new(0.0, 0.0, -12.0), epsilon = 1e-4);
    }

    #[test]
    fn test_small_speed_skips_yaw() {
        let mut ctrl = controller();
        // 0.04 * 0.2 = 0.008 per frame, below the speed epsilon
        ctrl.update(DT, DriverInput::new(0.04, 0.0, 1.0));
        assert_eq!(ctrl.state().yaw, 0.0);
        assert!(ctrl.state().position.norm() > 0.0);
    }

    #[test]
    fn test_front_wheel_angle_is_bounded() {
        let mut ctrl = controller();
        for steer in [-5.0, -1.0, -0.3, 0.0, 0.8, 1.0, 7.5] {
            ctrl.update(DT, DriverInput::new(0.0, 0.0, steer));
            assert!(ctrl.state().front_wheel_angle.abs() <= ctrl.max_steer_angle());
        }

        ctrl.apply_steering(3.0);
        assert_relative_eq!(ctrl.state().front_wheel_angle, ctrl.max_steer_angle());
    }

    #[test]
    fn test_no_throttle_no_movement() {
        let mut ctrl = controller();
        ctrl.update(DT, DriverInput::new(1.0, 0.0, 0.5));
        let before = ctrl.state().position;

        ctrl.update(DT, DriverInput::new(0.0, 0.0, 0.5));
        let state = ctrl.state();
        assert_eq!(state.position, before);
        assert_eq!(state.velocity, Vector3::zeros());
        assert_eq!(state.speed, 0.0);
    }

    #[test]
    fn test_yaw_stays_wrapped() {
        let mut ctrl = controller();
        for _ in 0..5_000 {
            ctrl.update(0.05, DriverInput::new(1.0, 0.0, -1.0));
            let yaw = ctrl.state().yaw;
            assert!(yaw > -PI && yaw <= PI);
        }
    }

    #[test]
    fn test_brake_scales_velocity() {
        let mut ctrl = controller();
        ctrl.sync_from_body(Vector3::zeros(), Vector3::new(4.0, 1.0, -10.0));
        ctrl.apply_brake(1.0);

        let velocity = ctrl.state().velocity;
        assert_relative_eq!(velocity.z, -6.0, epsilon = 1e-5); // 1 - 0.4
        assert_relative_eq!(velocity.x, 3.2, epsilon = 1e-5); // 1 - 0.2
        assert_relative_eq!(velocity.y, 1.0);
    }

    #[test]
    fn test_brake_applies_with_throttle() {
        let mut ctrl = controller();
        ctrl.update(DT, DriverInput::new(1.0, 0.5, 0.0));
        // -12 * (1 - 0.5 * 0.4)
        assert_relative_eq!(ctrl.state().velocity.z, -9.6, epsilon = 1e-4);
        assert_relative_eq!(ctrl.state().speed, 9.6, epsilon = 1e-4);
    }

    #[test]
    fn test_inputs_are_clamped() {
        let input = DriverInput::new(2.0, -1.0, f32::NAN).clamped();
        assert_eq!(input, DriverInput::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut ctrl = controller();
        for _ in 0..30 {
            ctrl.update(DT, DriverInput::new(1.0, 0.0, 1.0));
        }
        ctrl.reset(Vector3::new(0.0, 2.0, 0.0));
        assert_eq!(*ctrl.state(), VehicleState::at(Vector3::new(0.0, 2.0, 0.0)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = VehicleConfig::default().with_wheel_base(0.0);
        assert!(VehicleKinematicController::new(&config, Vector3::zeros()).is_err());
    }
}
