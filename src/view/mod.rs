// VIEW: Rendering and graphics
pub mod render;
pub mod gpu_init;

pub use render::{WgpuRenderer, CameraResources, ModelResources};
pub use gpu_init::GpuContext;
