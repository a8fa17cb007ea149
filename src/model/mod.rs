// MODEL: Camera pose and scene content
pub mod camera;
pub mod scene;

pub use camera::Camera;
pub use scene::{DemoScene, DebugPanel, BoxInstance};
