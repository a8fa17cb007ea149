/// Platform-agnostic input handling system
use std::collections::HashSet;

use crate::config::KeyBindings;

/// Platform-independent input events
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    // Keyboard events
    KeyDown { key: String, repeat: bool },
    KeyUp(String),

    // Mouse events
    MouseMove { dx: f32, dy: f32 },
    MouseClick { button: MouseButton, is_down: bool },
    MouseWheel { delta_y: f32 },

    // Window events
    FocusLost,
    Resized { width: u32, height: u32 },

    // XR events
    XrSessionStarted,
    XrSessionEnded,
    XrSelect { controller: usize, phase: SelectPhase },
    XrFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    pub fn from_web_button(button: i16) -> Self {
        match button {
            1 => MouseButton::Middle,
            2 => MouseButton::Right,
            _ => MouseButton::Left,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectPhase {
    Start,
    End,
}

impl SelectPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectPhase::Start => "selectstart",
            SelectPhase::End => "selectend",
        }
    }
}

/// Which hand an XR input source belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handedness {
    None,
    Left,
    Right,
}

impl Handedness {
    pub fn from_label(label: &str) -> Self {
        match label {
            "left" => Handedness::Left,
            "right" => Handedness::Right,
            _ => Handedness::None,
        }
    }
}

/// One controller's gamepad state, sampled once per frame
#[derive(Debug, Clone, PartialEq)]
pub struct GamepadSnapshot {
    pub handedness: Handedness,
    pub axes: Vec<f32>,
    pub buttons: Vec<bool>,
}

impl GamepadSnapshot {
    pub fn new(handedness: Handedness, axes: Vec<f32>, buttons: Vec<bool>) -> Self {
        Self { handedness, axes, buttons }
    }

    /// Axis value in [-1, 1]; missing or non-finite axes read as 0
    pub fn axis(&self, index: usize) -> f32 {
        match self.axes.get(index) {
            Some(v) if v.is_finite() => v.clamp(-1.0, 1.0),
            _ => 0.0,
        }
    }

    pub fn is_pressed(&self, index: usize) -> bool {
        self.buttons.get(index).copied().unwrap_or(false)
    }
}

/// Supplier of controller snapshots for the current frame
pub trait GamepadSource {
    fn poll(&mut self) -> Vec<GamepadSnapshot>;
}

/// Source for hosts without an XR runtime
pub struct NoGamepads;

impl GamepadSource for NoGamepads {
    fn poll(&mut self) -> Vec<GamepadSnapshot> {
        Vec::new()
    }
}

/// Camera moves a key can trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

/// Keys currently held, used to turn key-down streams into single edges
pub struct InputState {
    pub pressed_keys: HashSet<String>,
    /// Left button held over the scene
    pub dragging: bool,
}

/// Letters are held case-insensitively so Shift between down and up can't strand a key
fn held_key(key: &str) -> String {
    if key.chars().count() == 1 {
        key.to_lowercase()
    } else {
        key.to_string()
    }
}

impl InputState {
    pub fn new() -> Self {
        Self {
            pressed_keys: HashSet::new(),
            dragging: false,
        }
    }

    /// Record a key-down; true only for a fresh press (not auto-repeat, not already held)
    pub fn press(&mut self, key: &str, repeat: bool) -> bool {
        let fresh = self.pressed_keys.insert(held_key(key));
        fresh && !repeat
    }

    pub fn release(&mut self, key: &str) {
        self.pressed_keys.remove(&held_key(key));
    }

    /// Forget held keys and any drag in progress
    pub fn reset(&mut self) {
        self.pressed_keys.clear();
        self.dragging = false;
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves key names to camera actions
#[derive(Clone)]
pub struct InputProcessor {
    bindings: KeyBindings,
}

impl InputProcessor {
    pub fn new(bindings: KeyBindings) -> Self {
        Self { bindings }
    }

    pub fn action_for(&self, key: &str) -> Option<KeyAction> {
        let b = &self.bindings;
        [
            (&b.forward, KeyAction::Forward),
            (&b.backward, KeyAction::Backward),
            (&b.left, KeyAction::Left),
            (&b.right, KeyAction::Right),
            (&b.up, KeyAction::Up),
            (&b.down, KeyAction::Down),
        ]
        .into_iter()
        .find(|(bound, _)| Self::matches(bound, key))
        .map(|(_, action)| action)
    }

    /// Single letters match either case, named keys match exactly
    fn matches(bound: &str, key: &str) -> bool {
        if bound.chars().count() == 1 {
            bound.eq_ignore_ascii_case(key)
        } else {
            bound == key
        }
    }
}

impl Default for InputProcessor {
    fn default() -> Self {
        Self::new(KeyBindings::default())
    }
}

#[cfg(target_arch = "wasm32")]
pub mod wasm {
    use super::*;
    use web_sys::{Event, KeyboardEvent, MouseEvent};

    pub fn keyboard_event_to_input(e: &KeyboardEvent, is_down: bool) -> InputEvent {
        let key = e.key();
        if is_down {
            InputEvent::KeyDown { key, repeat: e.repeat() }
        } else {
            InputEvent::KeyUp(key)
        }
    }

    pub fn is_navigation_key(key: &str) -> bool {
        matches!(key, "ArrowUp" | "ArrowDown" | "ArrowLeft" | "ArrowRight")
    }

    pub fn mouse_move_to_input(e: &MouseEvent) -> InputEvent {
        InputEvent::MouseMove {
            dx: e.movement_x() as f32,
            dy: e.movement_y() as f32,
        }
    }

    pub fn mouse_click_to_input(e: &MouseEvent, is_down: bool) -> InputEvent {
        InputEvent::MouseClick {
            button: MouseButton::from_web_button(e.button()),
            is_down,
        }
    }

    pub fn mouse_wheel_to_input(e: &Event) -> Option<InputEvent> {
        let js_val = wasm_bindgen::JsValue::from(e.clone());
        let delta_y = js_sys::Reflect::get(&js_val, &wasm_bindgen::JsValue::from_str("deltaY")).ok()?;
        delta_y.as_f64().map(|dy| InputEvent::MouseWheel { delta_y: dy as f32 })
    }

    /// Same DOM event in egui's terms; positions are CSS pixels, which egui treats as points
    pub fn mouse_to_egui(e: &MouseEvent, pressed: Option<bool>) -> egui::Event {
        let pos = egui::pos2(e.client_x() as f32, e.client_y() as f32);
        match pressed {
            None => egui::Event::PointerMoved(pos),
            Some(pressed) => egui::Event::PointerButton {
                pos,
                button: match MouseButton::from_web_button(e.button()) {
                    MouseButton::Left => egui::PointerButton::Primary,
                    MouseButton::Right => egui::PointerButton::Secondary,
                    MouseButton::Middle => egui::PointerButton::Middle,
                },
                pressed,
                modifiers: egui::Modifiers::default(),
            },
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub mod native {
    use super::*;
    use winit::dpi::PhysicalPosition;
    use winit::event::{ElementState, KeyEvent, MouseScrollDelta};
    use winit::keyboard::{Key, NamedKey};

    /// Translate a winit key event into the browser's key naming
    pub fn key_event_to_input(event: &KeyEvent) -> Option<InputEvent> {
        let key = match &event.logical_key {
            Key::Named(NamedKey::ArrowUp) => "ArrowUp".to_string(),
            Key::Named(NamedKey::ArrowDown) => "ArrowDown".to_string(),
            Key::Named(NamedKey::ArrowLeft) => "ArrowLeft".to_string(),
            Key::Named(NamedKey::ArrowRight) => "ArrowRight".to_string(),
            Key::Named(NamedKey::Escape) => "Escape".to_string(),
            Key::Character(c) => c.to_string(),
            _ => return None,
        };
        Some(match event.state {
            ElementState::Pressed => InputEvent::KeyDown { key, repeat: event.repeat },
            ElementState::Released => InputEvent::KeyUp(key),
        })
    }

    pub fn mouse_button_to_input(state: ElementState, button: winit::event::MouseButton) -> Option<InputEvent> {
        let button = match button {
            winit::event::MouseButton::Left => MouseButton::Left,
            winit::event::MouseButton::Right => MouseButton::Right,
            winit::event::MouseButton::Middle => MouseButton::Middle,
            _ => return None,
        };
        Some(InputEvent::MouseClick { button, is_down: state == ElementState::Pressed })
    }

    /// Cursor motion since the previous position; None for the first sample
    pub fn cursor_to_input(last: Option<PhysicalPosition<f64>>, now: PhysicalPosition<f64>) -> Option<InputEvent> {
        let last = last?;
        Some(InputEvent::MouseMove {
            dx: (now.x - last.x) as f32,
            dy: (now.y - last.y) as f32,
        })
    }

    /// Browser sign convention: positive `delta_y` scrolls toward the user
    pub fn wheel_to_input(delta: &MouseScrollDelta) -> InputEvent {
        let delta_y = match delta {
            MouseScrollDelta::LineDelta(_, y) => -y * 100.0,
            MouseScrollDelta::PixelDelta(p) => -p.y as f32,
        };
        InputEvent::MouseWheel { delta_y }
    }
}
