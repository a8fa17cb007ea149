// CONTROLLER: Input, XR session and the frame update loop
pub mod input;
pub mod camera_controller;
pub mod xr;
pub mod frame_loop;

pub use input::{InputEvent, InputState, InputProcessor, GamepadSnapshot, GamepadSource, Handedness, MouseButton, NoGamepads};
pub use camera_controller::{CameraController, OrbitController};
pub use xr::{ConsoleLog, XrSessionState};
pub use frame_loop::{FrameLoop, FrameView, Renderer};
