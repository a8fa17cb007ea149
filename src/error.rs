use thiserror::Error;

/// Everything that can go wrong outside of input handling
#[derive(Debug, Error)]
pub enum AppError {
    #[error("WebXR is not available in this browser")]
    XrUnavailable,

    #[error("XR session failed: {0}")]
    XrSession(String),

    #[error("no suitable GPU adapter: {0}")]
    Adapter(String),

    #[error("GPU device request failed: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("surface creation failed: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("surface ran out of memory")]
    SurfaceOutOfMemory,

    #[error("window setup failed: {0}")]
    Window(String),
}

#[cfg(target_arch = "wasm32")]
impl From<AppError> for wasm_bindgen::JsValue {
    fn from(err: AppError) -> Self {
        wasm_bindgen::JsValue::from_str(&err.to_string())
    }
}
