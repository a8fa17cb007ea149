use glam::{Mat3, Mat4, Quat, Vec3};

use crate::config::SceneConfig;
use crate::model::Camera;
use crate::utils::{self, Mesh};

const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
const GREY: [f32; 4] = [0.5, 0.5, 0.5, 1.0];
const BLACK: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

pub const GROUND_SIZE: f32 = 100.0;
pub const BOX_SIZE: f32 = 2.0;

/// Sun position, shining towards the origin
pub const SUN_POSITION: Vec3 = Vec3::new(20.0, 100.0, 10.0);
/// Roughly 0x101010
pub const AMBIENT: f32 = 0.0625;

/// splitmix64, enough to scatter a handful of boxes reproducibly
struct SceneRng(u64);

impl SceneRng {
    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in [0, 1)
    fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxInstance {
    pub center: Vec3,
    pub color: [f32; 4],
}

/// Static content of the demo world
pub struct DemoScene {
    pub boxes: Vec<BoxInstance>,
    pub sun_dir: Vec3,
}

impl DemoScene {
    pub fn new(config: &SceneConfig) -> Self {
        let mut rng = SceneRng(config.seed);
        let mut boxes = vec![BoxInstance { center: Vec3::new(0.0, 1.0, 0.0), color: WHITE }];

        let half = config.grid_half_extent;
        for x in -half..half {
            for z in -half..half {
                let center = Vec3::new(
                    rng.next_f32() + x as f32 * config.spacing,
                    rng.next_f32() * 4.0 + 2.0,
                    rng.next_f32() + z as f32 * config.spacing,
                );
                boxes.push(BoxInstance { center, color: GREY });
            }
        }

        Self {
            boxes,
            sun_dir: SUN_POSITION.normalize(),
        }
    }

    /// Ground and boxes merged into one static mesh
    pub fn build_mesh(&self) -> Mesh {
        let mut mesh = utils::create_ground_mesh(GROUND_SIZE, GROUND_SIZE, WHITE);
        for b in &self.boxes {
            let mut cube = utils::create_box_mesh(Vec3::splat(BOX_SIZE), b.color);
            cube.translate(b.center);
            mesh.append(&cube);
        }
        mesh
    }
}

/// Black plane hovering in front of the camera, carrying the debug readout
pub struct DebugPanel {
    pub position: Vec3,
    pub rotation: Quat,
    pub width: f32,
    pub height: f32,
}

impl DebugPanel {
    /// Camera-local offset the panel is held at
    pub const OFFSET: Vec3 = Vec3::new(0.0, 0.0, -3.0);

    pub fn new() -> Self {
        Self {
            position: Vec3::new(0.0, 2.0, -3.0),
            rotation: Quat::IDENTITY,
            width: 2.0,
            height: 1.0,
        }
    }

    pub fn mesh(&self) -> Mesh {
        utils::create_panel_mesh(self.width, self.height, BLACK)
    }

    /// Re-anchor in front of the camera and turn the panel's +Z towards the eye
    pub fn follow(&mut self, camera: &Camera) {
        self.position = camera.local_to_world(Self::OFFSET);

        let back = camera.eye - self.position;
        if back.length_squared() <= f32::EPSILON {
            return;
        }
        let back = back.normalize();
        let mut right = Vec3::Y.cross(back);
        if right.length_squared() <= 1e-6 {
            right = Vec3::X;
        }
        let right = right.normalize();
        let up = back.cross(right);
        self.rotation = Quat::from_mat3(&Mat3::from_cols(right, up, back));
    }

    pub fn transform(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position)
    }
}

impl Default for DebugPanel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn grid_has_one_box_per_cell_plus_centre() {
        let scene = DemoScene::new(&SceneConfig::default());
        assert_eq!(scene.boxes.len(), 1 + 16 * 16);
        assert_eq!(scene.boxes[0].center, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn box_layout_is_reproducible_per_seed() {
        let config = SceneConfig::default();
        let a = DemoScene::new(&config);
        let b = DemoScene::new(&config);
        assert_eq!(a.boxes, b.boxes);

        let other = DemoScene::new(&SceneConfig { seed: config.seed + 1, ..config });
        assert_ne!(a.boxes, other.boxes);
    }

    #[test]
    fn grid_boxes_stay_in_their_cells() {
        let scene = DemoScene::new(&SceneConfig::default());
        for b in &scene.boxes[1..] {
            assert!(b.center.y >= 2.0 && b.center.y < 6.0, "height out of range: {}", b.center.y);
            let fx = b.center.x / 5.0;
            assert!(fx - fx.floor() < 0.2 + 1e-4, "x jitter too large: {}", b.center.x);
        }
    }

    #[test]
    fn scene_mesh_contains_ground_and_boxes() {
        let scene = DemoScene::new(&SceneConfig::default());
        let mesh = scene.build_mesh();
        assert_eq!(mesh.vertices.len(), 4 + 24 * scene.boxes.len());
        assert_eq!(mesh.indices.len(), 6 + 36 * scene.boxes.len());
    }

    #[test]
    fn panel_faces_camera_three_units_ahead() {
        let camera = Camera::new(800, 600);
        let mut panel = DebugPanel::new();
        panel.follow(&camera);

        assert_relative_eq!(panel.position.distance(camera.eye), 3.0, epsilon = 1e-4);
        let facing = panel.rotation * Vec3::Z;
        let to_eye = (camera.eye - panel.position).normalize();
        assert_relative_eq!(facing.dot(to_eye), 1.0, epsilon = 1e-4);
    }
}
