use glam::{Mat4, Vec3};

use crate::config::CameraConfig;

/// Camera pose plus projection
pub struct Camera {
    pub eye: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub up: Vec3,
    pub fov_y: f32,
    pub aspect: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self::from_config(&CameraConfig::default(), width, height)
    }

    pub fn from_config(config: &CameraConfig, width: u32, height: u32) -> Self {
        let mut camera = Self {
            eye: config.position,
            yaw: 0.0,
            pitch: 0.0,
            up: Vec3::Y,
            fov_y: config.fov_y_degrees.to_radians(),
            aspect: 1.0,
            z_near: config.z_near,
            z_far: config.z_far,
        };
        camera.set_aspect(width, height);
        camera.set_look_at(config.target);
        camera
    }

    pub fn forward(&self) -> Vec3 {
        let cy = self.yaw;
        let cp = self.pitch.clamp(-1.5533, 1.5533); // Slightly less than π/2 to avoid gimbal lock
        Vec3::new(cy.cos() * cp.cos(), cp.sin(), cy.sin() * cp.cos()).normalize()
    }

    pub fn target(&self) -> Vec3 { self.eye + self.forward() }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target(), self.up)
    }

    pub fn view_proj(&self) -> Mat4 {
        let proj = Mat4::perspective_rh(self.fov_y, self.aspect, self.z_near, self.z_far);
        proj * self.view()
    }

    /// Point in camera-local space (x right, y up, -z forward) expressed in world space
    pub fn local_to_world(&self, local: Vec3) -> Vec3 {
        self.view().inverse().transform_point3(local)
    }

    pub fn set_look_at(&mut self, target: Vec3) {
        let delta = target - self.eye;
        if delta.length_squared() <= f32::EPSILON {
            return;
        }
        let dir = delta.normalize();
        self.yaw = dir.z.atan2(dir.x);
        self.pitch = dir.y.asin().clamp(-1.4, 1.4);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn default_camera_looks_down_negative_x() {
        let camera = Camera::new(1600, 900);
        let f = camera.forward();
        assert_relative_eq!(f.x, -1.0, epsilon = 1e-5);
        assert_relative_eq!(f.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(f.z, 0.0, epsilon = 1e-5);
        assert_eq!(camera.eye, Vec3::new(75.0, 20.0, 0.0));
    }

    #[test]
    fn zero_sized_surface_keeps_aspect() {
        let mut camera = Camera::new(800, 400);
        camera.set_aspect(0, 600);
        assert_relative_eq!(camera.aspect, 2.0);
    }

    #[test]
    fn local_forward_is_in_front_of_eye() {
        let camera = Camera::new(800, 600);
        let p = camera.local_to_world(Vec3::new(0.0, 0.0, -3.0));
        let expected = camera.eye + camera.forward() * 3.0;
        assert_relative_eq!(p.x, expected.x, epsilon = 1e-4);
        assert_relative_eq!(p.y, expected.y, epsilon = 1e-4);
        assert_relative_eq!(p.z, expected.z, epsilon = 1e-4);
    }
}
