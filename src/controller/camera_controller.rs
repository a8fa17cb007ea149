use glam::Vec3;

use crate::config::{MovementConfig, OrbitConfig};
use crate::controller::input::{GamepadSnapshot, Handedness, KeyAction};
use crate::model::Camera;

/// Left stick horizontal / vertical axis on xr-standard gamepads
pub const LEFT_STICK_X: usize = 2;
pub const LEFT_STICK_Y: usize = 3;
/// Right controller push / pull buttons
pub const PUSH_BUTTON: usize = 0;
pub const PULL_BUTTON: usize = 1;

/// Keeps the polar angle off the poles, inside `Camera::set_look_at`'s pitch clamp
const MIN_POLAR: f32 = 0.2;

/// Maps key presses and controller state to camera displacement.
/// All movement is along world axes; orientation is never changed here.
pub struct CameraController {
    pub key_step: f32,
    pub xr_speed: f32,
}

impl CameraController {
    pub fn new() -> Self {
        Self::from_config(&MovementConfig::default())
    }

    pub fn from_config(config: &MovementConfig) -> Self {
        Self {
            key_step: config.key_step,
            xr_speed: config.xr_speed,
        }
    }

    pub fn key_delta(&self, action: KeyAction) -> Vec3 {
        let s = self.key_step;
        match action {
            KeyAction::Forward => Vec3::new(0.0, 0.0, -s),
            KeyAction::Backward => Vec3::new(0.0, 0.0, s),
            KeyAction::Left => Vec3::new(-s, 0.0, 0.0),
            KeyAction::Right => Vec3::new(s, 0.0, 0.0),
            KeyAction::Up => Vec3::new(0.0, s, 0.0),
            KeyAction::Down => Vec3::new(0.0, -s, 0.0),
        }
    }

    /// Apply one key press
    pub fn apply_key(&self, camera: &mut Camera, action: KeyAction) {
        camera.eye += self.key_delta(action);
    }

    /// Per-tick displacement from one controller
    pub fn gamepad_delta(&self, pad: &GamepadSnapshot) -> Vec3 {
        match pad.handedness {
            Handedness::Left => Vec3::new(
                pad.axis(LEFT_STICK_X) * self.xr_speed,
                0.0,
                pad.axis(LEFT_STICK_Y) * self.xr_speed,
            ),
            Handedness::Right => {
                let mut dz = 0.0;
                if pad.is_pressed(PUSH_BUTTON) {
                    dz -= self.xr_speed;
                }
                if pad.is_pressed(PULL_BUTTON) {
                    dz += self.xr_speed;
                }
                Vec3::new(0.0, 0.0, dz)
            }
            Handedness::None => Vec3::ZERO,
        }
    }

    /// Apply every controller's contribution for this tick
    pub fn apply_gamepads(&self, camera: &mut Camera, pads: &[GamepadSnapshot]) {
        let delta: Vec3 = pads.iter().map(|p| self.gamepad_delta(p)).sum();
        camera.eye += delta;
    }
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new()
    }
}

/// Mouse orbit: drag swings the eye around a fixed target, the wheel dollies toward it
pub struct OrbitController {
    pub target: Vec3,
    pub rotate_speed: f32,
    pub zoom_scale: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl OrbitController {
    pub fn new(target: Vec3, config: &OrbitConfig) -> Self {
        Self {
            target,
            rotate_speed: config.rotate_speed,
            zoom_scale: config.zoom_scale,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
        }
    }

    /// Rotate by a drag of (dx, dy) pixels. Distance to the target is preserved.
    pub fn rotate(&self, camera: &mut Camera, dx: f32, dy: f32) {
        let offset = camera.eye - self.target;
        let radius = offset.length();
        if radius <= f32::EPSILON {
            return;
        }

        let theta = offset.z.atan2(offset.x) + dx * self.rotate_speed;
        let phi = ((offset.y / radius).clamp(-1.0, 1.0).acos() - dy * self.rotate_speed)
            .clamp(MIN_POLAR, std::f32::consts::PI - MIN_POLAR);

        camera.eye = self.target + spherical(radius, theta, phi);
        camera.set_look_at(self.target);
    }

    /// Positive `delta_y` (scrolling toward the user) backs away from the target
    pub fn dolly(&self, camera: &mut Camera, delta_y: f32) {
        let offset = camera.eye - self.target;
        let radius = offset.length();
        if radius <= f32::EPSILON || delta_y == 0.0 || !delta_y.is_finite() {
            return;
        }

        let scaled = if delta_y > 0.0 {
            radius / self.zoom_scale
        } else {
            radius * self.zoom_scale
        };
        camera.eye = self.target + offset / radius * scaled.clamp(self.min_distance, self.max_distance);
        camera.set_look_at(self.target);
    }
}

/// y-up spherical coordinates, `phi` measured from +y
fn spherical(radius: f32, theta: f32, phi: f32) -> Vec3 {
    Vec3::new(
        radius * phi.sin() * theta.cos(),
        radius * phi.cos(),
        radius * phi.sin() * theta.sin(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn camera_at_origin() -> Camera {
        let mut camera = Camera::new(800, 600);
        camera.eye = Vec3::ZERO;
        camera
    }

    #[test]
    fn each_key_moves_exactly_one_axis_by_one_step() {
        let controller = CameraController::new();
        let cases = [
            (KeyAction::Forward, Vec3::new(0.0, 0.0, -1.0)),
            (KeyAction::Backward, Vec3::new(0.0, 0.0, 1.0)),
            (KeyAction::Left, Vec3::new(-1.0, 0.0, 0.0)),
            (KeyAction::Right, Vec3::new(1.0, 0.0, 0.0)),
            (KeyAction::Up, Vec3::new(0.0, 1.0, 0.0)),
            (KeyAction::Down, Vec3::new(0.0, -1.0, 0.0)),
        ];
        for (action, expected) in cases {
            let mut camera = camera_at_origin();
            controller.apply_key(&mut camera, action);
            assert_eq!(camera.eye, expected, "{action:?}");
        }
    }

    #[test]
    fn left_stick_moves_horizontal_and_depth() {
        let controller = CameraController::new();
        let mut camera = camera_at_origin();
        let pad = GamepadSnapshot::new(Handedness::Left, vec![0.0, 0.0, 0.5, -0.5], vec![]);
        controller.apply_gamepads(&mut camera, &[pad]);
        assert_relative_eq!(camera.eye.x, 0.05, epsilon = 1e-6);
        assert_relative_eq!(camera.eye.z, -0.05, epsilon = 1e-6);
        assert_eq!(camera.eye.y, 0.0);
    }

    #[test]
    fn right_buttons_push_and_pull() {
        let controller = CameraController::new();
        let push = GamepadSnapshot::new(Handedness::Right, vec![], vec![true, false]);
        let pull = GamepadSnapshot::new(Handedness::Right, vec![], vec![false, true]);
        let both = GamepadSnapshot::new(Handedness::Right, vec![], vec![true, true]);

        assert_relative_eq!(controller.gamepad_delta(&push).z, -0.1);
        assert_relative_eq!(controller.gamepad_delta(&pull).z, 0.1);
        assert_eq!(controller.gamepad_delta(&both), Vec3::ZERO);
    }

    #[test]
    fn right_stick_and_unhanded_pads_are_ignored() {
        let controller = CameraController::new();
        let right_stick = GamepadSnapshot::new(Handedness::Right, vec![0.0, 0.0, 1.0, 1.0], vec![]);
        let unhanded = GamepadSnapshot::new(Handedness::None, vec![0.0, 0.0, 1.0, 1.0], vec![true, true]);
        assert_eq!(controller.gamepad_delta(&right_stick), Vec3::ZERO);
        assert_eq!(controller.gamepad_delta(&unhanded), Vec3::ZERO);
    }

    fn orbit() -> OrbitController {
        OrbitController::new(Vec3::new(0.0, 20.0, 0.0), &OrbitConfig::default())
    }

    fn assert_looks_at(camera: &Camera, target: Vec3) {
        let to_target = (target - camera.eye).normalize();
        assert_relative_eq!(camera.forward().dot(to_target), 1.0, epsilon = 1e-4);
    }

    #[test]
    fn horizontal_drag_circles_the_target_at_fixed_distance() {
        let orbit = orbit();
        let mut camera = Camera::new(800, 600);
        camera.eye = Vec3::new(75.0, 20.0, 0.0);

        // quarter turn
        orbit.rotate(&mut camera, std::f32::consts::FRAC_PI_2 / orbit.rotate_speed, 0.0);

        assert_relative_eq!(camera.eye.distance(orbit.target), 75.0, epsilon = 1e-3);
        assert_relative_eq!(camera.eye.x, 0.0, epsilon = 1e-3);
        assert_relative_eq!(camera.eye.y, 20.0, epsilon = 1e-3);
        assert_relative_eq!(camera.eye.z, 75.0, epsilon = 1e-3);
        assert_looks_at(&camera, orbit.target);
    }

    #[test]
    fn vertical_drag_stops_short_of_the_pole() {
        let orbit = orbit();
        let mut camera = Camera::new(800, 600);
        camera.eye = Vec3::new(10.0, 20.0, 0.0);

        orbit.rotate(&mut camera, 0.0, 10_000.0);

        let offset = camera.eye - orbit.target;
        assert_relative_eq!(offset.length(), 10.0, epsilon = 1e-3);
        assert_relative_eq!((offset.y / 10.0).acos(), MIN_POLAR, epsilon = 1e-4);
        assert_looks_at(&camera, orbit.target);
    }

    #[test]
    fn wheel_dollies_along_the_view_ray_within_limits() {
        let orbit = orbit();
        let mut camera = Camera::new(800, 600);
        camera.eye = Vec3::new(20.0, 20.0, 0.0);

        orbit.dolly(&mut camera, -100.0);
        assert_relative_eq!(camera.eye.x, 19.0, epsilon = 1e-4);
        orbit.dolly(&mut camera, 100.0);
        assert_relative_eq!(camera.eye.x, 20.0, epsilon = 1e-4);

        for _ in 0..200 {
            orbit.dolly(&mut camera, -100.0);
        }
        assert_relative_eq!(camera.eye.distance(orbit.target), orbit.min_distance, epsilon = 1e-4);
        assert_eq!(camera.eye.y, 20.0);
    }

    #[test]
    fn orbit_at_the_target_is_a_no_op() {
        let orbit = orbit();
        let mut camera = Camera::new(800, 600);
        camera.eye = orbit.target;
        orbit.rotate(&mut camera, 30.0, 30.0);
        orbit.dolly(&mut camera, 1.0);
        assert_eq!(camera.eye, orbit.target);
    }

    #[test]
    fn short_axis_list_reads_as_centered() {
        let controller = CameraController::new();
        let pad = GamepadSnapshot::new(Handedness::Left, vec![0.3, 0.3], vec![]);
        assert_eq!(controller.gamepad_delta(&pad), Vec3::ZERO);
    }
}
