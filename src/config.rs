use glam::Vec3;

/// Initial camera placement and projection
#[derive(Clone, Copy, Debug)]
pub struct CameraConfig {
    pub position: Vec3,
    pub target: Vec3,
    pub fov_y_degrees: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(75.0, 20.0, 0.0),
            target: Vec3::new(0.0, 20.0, 0.0),
            fov_y_degrees: 60.0,
            z_near: 1.0,
            z_far: 1000.0,
        }
    }
}

/// Displacement constants for keyboard and controller movement
#[derive(Clone, Copy, Debug)]
pub struct MovementConfig {
    /// World units moved per key press
    pub key_step: f32,
    /// World units per tick at full stick deflection, also the per-tick button push/pull
    pub xr_speed: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            key_step: 1.0,
            xr_speed: 0.1,
        }
    }
}

/// Pointer orbit around `CameraConfig::target`
#[derive(Clone, Copy, Debug)]
pub struct OrbitConfig {
    /// Radians per pixel of drag
    pub rotate_speed: f32,
    /// Distance multiplier per wheel notch toward the target
    pub zoom_scale: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            rotate_speed: 0.005,
            zoom_scale: 0.95,
            min_distance: 1.0,
            max_distance: 500.0,
        }
    }
}

/// Key names as reported by `KeyboardEvent.key`
#[derive(Clone, Debug)]
pub struct KeyBindings {
    pub forward: String,
    pub backward: String,
    pub left: String,
    pub right: String,
    pub up: String,
    pub down: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: "ArrowUp".to_string(),
            backward: "ArrowDown".to_string(),
            left: "ArrowLeft".to_string(),
            right: "ArrowRight".to_string(),
            up: "w".to_string(),
            down: "s".to_string(),
        }
    }
}

/// Layout of the box grid
#[derive(Clone, Copy, Debug)]
pub struct SceneConfig {
    /// Grid spans `-half..half` on both x and z
    pub grid_half_extent: i32,
    pub spacing: f32,
    pub seed: u64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            grid_half_extent: 8,
            spacing: 5.0,
            seed: 0x5eed_b0c5,
        }
    }
}

/// Top-level demo configuration
///
/// Usage:
///   let mut config = DemoConfig::default();
///   config.movement.xr_speed = 0.2;   // faster stick movement
///   config.scene.seed = 42;           // different box layout
#[derive(Clone, Debug)]
pub struct DemoConfig {
    pub camera: CameraConfig,
    pub movement: MovementConfig,
    pub orbit: OrbitConfig,
    pub bindings: KeyBindings,
    pub scene: SceneConfig,
    /// Lines kept in the in-scene console
    pub console_capacity: usize,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            movement: MovementConfig::default(),
            orbit: OrbitConfig::default(),
            bindings: KeyBindings::default(),
            scene: SceneConfig::default(),
            console_capacity: 32,
        }
    }
}

impl DemoConfig {
    /// Defaults with overrides from the environment (`XRWORLD_SEED`)
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var("XRWORLD_SEED") {
            match raw.trim().parse::<u64>() {
                Ok(seed) => config.scene.seed = seed,
                Err(e) => tracing::warn!("ignoring XRWORLD_SEED={raw:?}: {e}"),
            }
        }
        config
    }
}
