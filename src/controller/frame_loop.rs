use std::fmt::Write as _;

use tracing::{debug, info, warn};

use crate::config::DemoConfig;
use crate::controller::camera_controller::{CameraController, OrbitController};
use crate::controller::input::{GamepadSource, InputEvent, InputProcessor, InputState, MouseButton, SelectPhase};
use crate::controller::xr::{ConsoleLog, XrSessionState};
use crate::error::AppError;
use crate::model::{Camera, DebugPanel};
use crate::ui::DebugText;

/// Console lines mirrored into the debug readout
const READOUT_CONSOLE_LINES: usize = 4;

/// Everything a renderer needs to draw one frame
pub struct FrameView<'a> {
    pub camera: &'a Camera,
    pub panel: &'a DebugPanel,
    pub debug_text: &'a DebugText,
    pub session: XrSessionState,
}

/// Draws frames; owns the display surface
pub trait Renderer {
    fn render(&mut self, frame: &FrameView<'_>) -> Result<(), AppError>;

    fn resize(&mut self, width: u32, height: u32);
}

/// Per-frame state and update logic. One instance per running demo,
/// owned by whoever drives the display refresh.
pub struct FrameLoop {
    pub camera: Camera,
    pub session: XrSessionState,
    pub panel: DebugPanel,
    pub debug_text: DebugText,
    pub console: ConsoleLog,
    camera_controller: CameraController,
    orbit: OrbitController,
    input_processor: InputProcessor,
    input_state: InputState,
    frame_count: u64,
}

impl FrameLoop {
    pub fn new(config: &DemoConfig, width: u32, height: u32) -> Self {
        let camera = Camera::from_config(&config.camera, width, height);
        let mut panel = DebugPanel::new();
        panel.follow(&camera);

        Self {
            camera,
            session: XrSessionState::default(),
            panel,
            debug_text: DebugText::new(),
            console: ConsoleLog::new(config.console_capacity),
            camera_controller: CameraController::from_config(&config.movement),
            orbit: OrbitController::new(config.camera.target, &config.orbit),
            input_processor: InputProcessor::new(config.bindings.clone()),
            input_state: InputState::new(),
            frame_count: 0,
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Dispatch one platform event
    pub fn handle_event<R: Renderer + ?Sized>(&mut self, event: InputEvent, renderer: &mut R) {
        match event {
            InputEvent::KeyDown { key, repeat } => {
                if self.input_state.press(&key, repeat) {
                    self.on_key_down(&key);
                }
            }
            InputEvent::KeyUp(key) => self.input_state.release(&key),
            InputEvent::FocusLost => self.input_state.reset(),
            InputEvent::MouseClick { button: MouseButton::Left, is_down } => {
                self.input_state.dragging = is_down && !self.session.is_active();
            }
            InputEvent::MouseClick { .. } => {}
            InputEvent::MouseMove { dx, dy } => self.on_pointer_drag(dx, dy),
            InputEvent::MouseWheel { delta_y } => self.on_wheel(delta_y),
            InputEvent::Resized { width, height } => {
                if width > 0 && height > 0 {
                    self.camera.set_aspect(width, height);
                    renderer.resize(width, height);
                }
            }
            InputEvent::XrSessionStarted => self.on_xr_session_start(),
            InputEvent::XrSessionEnded => self.on_xr_session_end(),
            InputEvent::XrSelect { controller, phase } => self.on_select(controller, phase),
            InputEvent::XrFailed(reason) => self.on_xr_failed(&reason),
        }
    }

    /// One key press. Ignored while an XR session drives the camera.
    pub fn on_key_down(&mut self, key: &str) {
        let Some(action) = self.input_processor.action_for(key) else {
            return;
        };
        if self.session.is_active() {
            debug!("ignoring key {key:?} during XR session");
            return;
        }
        self.camera_controller.apply_key(&mut self.camera, action);
        debug!("key {key:?} -> {action:?}, eye now {:?}", self.camera.eye);
    }

    /// Orbit around the configured target while the left button is held
    pub fn on_pointer_drag(&mut self, dx: f32, dy: f32) {
        if !self.input_state.dragging || self.session.is_active() {
            return;
        }
        self.orbit.rotate(&mut self.camera, dx, dy);
    }

    pub fn on_wheel(&mut self, delta_y: f32) {
        if self.session.is_active() {
            return;
        }
        self.orbit.dolly(&mut self.camera, delta_y);
    }

    pub fn on_xr_session_start(&mut self) {
        if self.session.start() {
            self.input_state.reset();
            info!("XR session started");
        }
    }

    pub fn on_xr_session_end(&mut self) {
        if self.session.end() {
            info!("XR session ended");
        }
    }

    /// Controller trigger press/release, logged to the in-scene console
    pub fn on_select(&mut self, controller: usize, phase: SelectPhase) {
        let line = format!("Controller {}: {}", controller + 1, phase.as_str());
        info!("{line}");
        self.console.push(line);
    }

    pub fn on_xr_failed(&mut self, reason: &str) {
        warn!("XR unavailable: {reason}");
        self.console.push(format!("XR unavailable: {reason}"));
    }

    /// Advance one frame: sample controllers, move the camera, refresh the readout, draw
    pub fn tick<G, R>(&mut self, gamepads: &mut G, renderer: &mut R) -> Result<(), AppError>
    where
        G: GamepadSource + ?Sized,
        R: Renderer + ?Sized,
    {
        if self.session.is_active() {
            let pads = gamepads.poll();
            self.camera_controller.apply_gamepads(&mut self.camera, &pads);
        }

        self.panel.follow(&self.camera);
        let readout = self.readout();
        if self.debug_text.set(readout) {
            debug!("debug readout regenerated (generation {})", self.debug_text.generation());
        }

        self.frame_count += 1;
        renderer.render(&FrameView {
            camera: &self.camera,
            panel: &self.panel,
            debug_text: &self.debug_text,
            session: self.session,
        })
    }

    fn readout(&self) -> String {
        let eye = self.camera.eye;
        let mut text = format!(
            "pos: {:.2} {:.2} {:.2}\nsession: {}",
            eye.x, eye.y, eye.z, self.session.label()
        );
        for line in self.console.tail(READOUT_CONSOLE_LINES) {
            let _ = write!(text, "\n{line}");
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::input::{GamepadSnapshot, Handedness};
    use approx::assert_relative_eq;
    use glam::Vec3;

    #[derive(Default)]
    struct CountingRenderer {
        frames: usize,
        resizes: Vec<(u32, u32)>,
        last_eye: Option<Vec3>,
    }

    impl Renderer for CountingRenderer {
        fn render(&mut self, frame: &FrameView<'_>) -> Result<(), AppError> {
            self.frames += 1;
            self.last_eye = Some(frame.camera.eye);
            Ok(())
        }

        fn resize(&mut self, width: u32, height: u32) {
            self.resizes.push((width, height));
        }
    }

    struct ScriptedPads {
        pads: Vec<GamepadSnapshot>,
        polls: usize,
    }

    impl ScriptedPads {
        fn new(pads: Vec<GamepadSnapshot>) -> Self {
            Self { pads, polls: 0 }
        }
    }

    impl GamepadSource for ScriptedPads {
        fn poll(&mut self) -> Vec<GamepadSnapshot> {
            self.polls += 1;
            self.pads.clone()
        }
    }

    fn frame_loop_at_origin() -> FrameLoop {
        let mut fl = FrameLoop::new(&DemoConfig::default(), 800, 600);
        fl.camera.eye = Vec3::ZERO;
        fl
    }

    fn key(fl: &mut FrameLoop, name: &str) {
        let mut renderer = CountingRenderer::default();
        fl.handle_event(InputEvent::KeyDown { key: name.to_string(), repeat: false }, &mut renderer);
        fl.handle_event(InputEvent::KeyUp(name.to_string()), &mut renderer);
    }

    #[test]
    fn mapped_keys_move_one_axis_by_one_step() {
        let cases = [
            ("ArrowUp", Vec3::new(0.0, 0.0, -1.0)),
            ("ArrowDown", Vec3::new(0.0, 0.0, 1.0)),
            ("ArrowLeft", Vec3::new(-1.0, 0.0, 0.0)),
            ("ArrowRight", Vec3::new(1.0, 0.0, 0.0)),
            ("w", Vec3::new(0.0, 1.0, 0.0)),
            ("s", Vec3::new(0.0, -1.0, 0.0)),
        ];
        for (name, expected) in cases {
            let mut fl = frame_loop_at_origin();
            key(&mut fl, name);
            assert_eq!(fl.camera.eye, expected, "{name}");
        }
    }

    #[test]
    fn unmapped_key_is_a_no_op() {
        let mut fl = frame_loop_at_origin();
        key(&mut fl, "q");
        key(&mut fl, "Enter");
        assert_eq!(fl.camera.eye, Vec3::ZERO);
    }

    #[test]
    fn held_key_moves_once() {
        let mut fl = frame_loop_at_origin();
        let mut renderer = CountingRenderer::default();
        fl.handle_event(InputEvent::KeyDown { key: "ArrowUp".into(), repeat: false }, &mut renderer);
        for _ in 0..5 {
            fl.handle_event(InputEvent::KeyDown { key: "ArrowUp".into(), repeat: true }, &mut renderer);
        }
        let mut pads = ScriptedPads::new(vec![]);
        for _ in 0..3 {
            fl.tick(&mut pads, &mut renderer).unwrap();
        }
        assert_eq!(fl.camera.eye, Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn keyboard_is_ignored_during_xr_session() {
        let mut fl = frame_loop_at_origin();
        fl.on_xr_session_start();
        key(&mut fl, "ArrowRight");
        assert_eq!(fl.camera.eye, Vec3::ZERO);

        fl.on_xr_session_end();
        key(&mut fl, "ArrowRight");
        assert_eq!(fl.camera.eye, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn idle_tick_never_polls_gamepads() {
        let mut fl = frame_loop_at_origin();
        let mut pads = ScriptedPads::new(vec![GamepadSnapshot::new(
            Handedness::Left,
            vec![0.0, 0.0, 1.0, 1.0],
            vec![],
        )]);
        let mut renderer = CountingRenderer::default();
        assert!(fl.tick(&mut pads, &mut renderer).is_ok());
        assert_eq!(pads.polls, 0);
        assert_eq!(fl.camera.eye, Vec3::ZERO);
        assert_eq!(renderer.frames, 1);
    }

    #[test]
    fn left_stick_moves_camera_each_tick() {
        let mut fl = frame_loop_at_origin();
        fl.on_xr_session_start();
        let mut pads = ScriptedPads::new(vec![GamepadSnapshot::new(
            Handedness::Left,
            vec![0.0, 0.0, 0.5, -0.5],
            vec![],
        )]);
        let mut renderer = CountingRenderer::default();
        fl.tick(&mut pads, &mut renderer).unwrap();

        assert_eq!(pads.polls, 1);
        assert_relative_eq!(fl.camera.eye.x, 0.05, epsilon = 1e-6);
        assert_relative_eq!(fl.camera.eye.z, -0.05, epsilon = 1e-6);
        assert_eq!(fl.camera.eye.y, 0.0);

        fl.tick(&mut pads, &mut renderer).unwrap();
        assert_relative_eq!(fl.camera.eye.x, 0.1, epsilon = 1e-6);
        assert_eq!(renderer.last_eye, Some(fl.camera.eye));
    }

    #[test]
    fn right_buttons_push_pull_and_cancel() {
        let cases = [
            (vec![true, false], -0.1),
            (vec![false, true], 0.1),
            (vec![true, true], 0.0),
        ];
        for (buttons, dz) in cases {
            let mut fl = frame_loop_at_origin();
            fl.on_xr_session_start();
            let mut pads = ScriptedPads::new(vec![GamepadSnapshot::new(Handedness::Right, vec![], buttons)]);
            fl.tick(&mut pads, &mut CountingRenderer::default()).unwrap();
            assert_relative_eq!(fl.camera.eye.z, dz, epsilon = 1e-6);
            assert_eq!(fl.camera.eye.x, 0.0);
            assert_eq!(fl.camera.eye.y, 0.0);
        }
    }

    #[test]
    fn session_end_is_idempotent() {
        let mut fl = frame_loop_at_origin();
        assert_eq!(fl.session, XrSessionState::Idle);
        fl.on_xr_session_start();
        fl.on_xr_session_end();
        assert_eq!(fl.session, XrSessionState::Idle);
        fl.on_xr_session_end();
        fl.handle_event(InputEvent::XrSessionEnded, &mut CountingRenderer::default());
        assert_eq!(fl.session, XrSessionState::Idle);
    }

    #[test]
    fn tick_renders_exactly_once() {
        let mut fl = frame_loop_at_origin();
        let mut renderer = CountingRenderer::default();
        let mut pads = ScriptedPads::new(vec![]);
        fl.tick(&mut pads, &mut renderer).unwrap();
        fl.tick(&mut pads, &mut renderer).unwrap();
        assert_eq!(renderer.frames, 2);
        assert_eq!(fl.frame_count(), 2);
    }

    #[test]
    fn readout_regenerates_only_on_change() {
        let mut fl = frame_loop_at_origin();
        let mut renderer = CountingRenderer::default();
        let mut pads = ScriptedPads::new(vec![]);

        fl.tick(&mut pads, &mut renderer).unwrap();
        let first = fl.debug_text.generation();
        fl.tick(&mut pads, &mut renderer).unwrap();
        assert_eq!(fl.debug_text.generation(), first);

        key(&mut fl, "w");
        fl.tick(&mut pads, &mut renderer).unwrap();
        assert_eq!(fl.debug_text.generation(), first + 1);
        assert!(fl.debug_text.text().starts_with("pos: 0.00 1.00 0.00"));
    }

    #[test]
    fn select_events_reach_the_console() {
        let mut fl = frame_loop_at_origin();
        let mut renderer = CountingRenderer::default();
        fl.handle_event(InputEvent::XrSelect { controller: 0, phase: SelectPhase::Start }, &mut renderer);
        fl.handle_event(InputEvent::XrSelect { controller: 1, phase: SelectPhase::End }, &mut renderer);
        let lines: Vec<_> = fl.console.lines().collect();
        assert_eq!(lines, vec!["Controller 1: selectstart", "Controller 2: selectend"]);

        fl.tick(&mut ScriptedPads::new(vec![]), &mut renderer).unwrap();
        assert!(fl.debug_text.text().contains("Controller 2: selectend"));
    }

    #[test]
    fn resize_updates_aspect_and_renderer() {
        let mut fl = frame_loop_at_origin();
        let mut renderer = CountingRenderer::default();
        fl.handle_event(InputEvent::Resized { width: 1000, height: 500 }, &mut renderer);
        fl.handle_event(InputEvent::Resized { width: 0, height: 500 }, &mut renderer);
        assert_relative_eq!(fl.camera.aspect, 2.0);
        assert_eq!(renderer.resizes, vec![(1000, 500)]);
    }

    #[test]
    fn focus_loss_rearms_held_keys() {
        let mut fl = frame_loop_at_origin();
        let mut renderer = CountingRenderer::default();
        fl.handle_event(InputEvent::KeyDown { key: "w".into(), repeat: false }, &mut renderer);
        fl.handle_event(InputEvent::FocusLost, &mut renderer);
        fl.handle_event(InputEvent::KeyDown { key: "w".into(), repeat: false }, &mut renderer);
        assert_eq!(fl.camera.eye, Vec3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn shifted_release_does_not_strand_a_letter() {
        let mut fl = frame_loop_at_origin();
        let mut renderer = CountingRenderer::default();
        fl.handle_event(InputEvent::KeyDown { key: "w".into(), repeat: false }, &mut renderer);
        fl.handle_event(InputEvent::KeyUp("W".into()), &mut renderer);
        fl.handle_event(InputEvent::KeyDown { key: "w".into(), repeat: false }, &mut renderer);
        assert_eq!(fl.camera.eye, Vec3::new(0.0, 2.0, 0.0));
    }

    fn drag(fl: &mut FrameLoop, dx: f32, dy: f32) {
        let mut renderer = CountingRenderer::default();
        fl.handle_event(InputEvent::MouseClick { button: MouseButton::Left, is_down: true }, &mut renderer);
        fl.handle_event(InputEvent::MouseMove { dx, dy }, &mut renderer);
        fl.handle_event(InputEvent::MouseClick { button: MouseButton::Left, is_down: false }, &mut renderer);
    }

    #[test]
    fn left_drag_orbits_around_the_configured_target() {
        let mut fl = FrameLoop::new(&DemoConfig::default(), 800, 600);
        let target = DemoConfig::default().camera.target;
        drag(&mut fl, 100.0, 0.0);

        assert_relative_eq!(fl.camera.eye.distance(target), 75.0, epsilon = 1e-3);
        assert_relative_eq!(fl.camera.eye.y, 20.0, epsilon = 1e-3);
        assert!(fl.camera.eye.z.abs() > 1.0);
        let to_target = (target - fl.camera.eye).normalize();
        assert_relative_eq!(fl.camera.forward().dot(to_target), 1.0, epsilon = 1e-4);
    }

    #[test]
    fn pointer_motion_without_a_held_button_is_ignored() {
        let mut fl = FrameLoop::new(&DemoConfig::default(), 800, 600);
        let mut renderer = CountingRenderer::default();
        let start = fl.camera.eye;
        fl.handle_event(InputEvent::MouseMove { dx: 50.0, dy: 50.0 }, &mut renderer);
        fl.handle_event(InputEvent::MouseClick { button: MouseButton::Right, is_down: true }, &mut renderer);
        fl.handle_event(InputEvent::MouseMove { dx: 50.0, dy: 50.0 }, &mut renderer);
        assert_eq!(fl.camera.eye, start);

        fl.handle_event(InputEvent::MouseClick { button: MouseButton::Left, is_down: true }, &mut renderer);
        fl.handle_event(InputEvent::FocusLost, &mut renderer);
        fl.handle_event(InputEvent::MouseMove { dx: 50.0, dy: 50.0 }, &mut renderer);
        assert_eq!(fl.camera.eye, start);
    }

    #[test]
    fn wheel_dollies_and_xr_session_freezes_the_mouse() {
        let mut fl = FrameLoop::new(&DemoConfig::default(), 800, 600);
        let mut renderer = CountingRenderer::default();
        fl.handle_event(InputEvent::MouseWheel { delta_y: -100.0 }, &mut renderer);
        assert_relative_eq!(fl.camera.eye.x, 75.0 * 0.95, epsilon = 1e-3);

        fl.on_xr_session_start();
        let before = fl.camera.eye;
        fl.handle_event(InputEvent::MouseWheel { delta_y: 100.0 }, &mut renderer);
        drag(&mut fl, 100.0, 0.0);
        assert_eq!(fl.camera.eye, before);
    }

    #[test]
    fn xr_failure_is_shown_and_keeps_session_idle() {
        let mut fl = frame_loop_at_origin();
        let mut renderer = CountingRenderer::default();
        fl.handle_event(InputEvent::XrFailed("NotSupportedError".into()), &mut renderer);
        assert_eq!(fl.session, XrSessionState::Idle);

        fl.tick(&mut ScriptedPads::new(vec![]), &mut renderer).unwrap();
        assert!(fl.debug_text.text().contains("XR unavailable: NotSupportedError"));
    }

    #[test]
    fn panel_tracks_camera() {
        let mut fl = frame_loop_at_origin();
        key(&mut fl, "ArrowRight");
        fl.tick(&mut ScriptedPads::new(vec![]), &mut CountingRenderer::default()).unwrap();
        assert_relative_eq!(fl.panel.position.distance(fl.camera.eye), 3.0, epsilon = 1e-4);
    }
}
