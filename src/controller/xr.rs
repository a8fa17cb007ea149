/// XR session state, controller console and (on the web) WebXR glue
use std::collections::VecDeque;

/// Two-state session machine; starts `Idle`, never terminates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XrSessionState {
    #[default]
    Idle,
    XrActive,
}

impl XrSessionState {
    pub fn is_active(&self) -> bool {
        matches!(self, XrSessionState::XrActive)
    }

    /// Returns true when this call changed the state
    pub fn start(&mut self) -> bool {
        let changed = !self.is_active();
        *self = XrSessionState::XrActive;
        changed
    }

    /// Returns true when this call changed the state
    pub fn end(&mut self) -> bool {
        let changed = self.is_active();
        *self = XrSessionState::Idle;
        changed
    }

    pub fn label(&self) -> &'static str {
        match self {
            XrSessionState::Idle => "idle",
            XrSessionState::XrActive => "xr active",
        }
    }
}

/// Bounded log of controller messages shown on the debug panel
pub struct ConsoleLog {
    lines: VecDeque<String>,
    capacity: usize,
}

impl ConsoleLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }
        while self.lines.len() >= self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.into());
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// Newest `n` lines, oldest first
    pub fn tail(&self, n: usize) -> impl Iterator<Item = &str> {
        self.lines.iter().skip(self.lines.len().saturating_sub(n)).map(String::as_str)
    }
}

#[cfg(all(target_arch = "wasm32", web_sys_unstable_apis))]
pub mod wasm {
    use std::cell::RefCell;
    use std::rc::Rc;

    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::{JsCast, JsValue};
    use wasm_bindgen_futures::JsFuture;
    use web_sys::{
        Event, Gamepad, GamepadButton, HtmlCanvasElement, WebGl2RenderingContext, XrHandedness, XrInputSourceEvent,
        XrRenderStateInit, XrSession, XrSessionMode, XrSystem, XrWebGlLayer,
    };

    use crate::controller::input::{GamepadSnapshot, GamepadSource, Handedness, InputEvent, SelectPhase};
    use crate::error::AppError;

    pub type SharedSession = Rc<RefCell<Option<XrSession>>>;
    pub type EventQueue = Rc<RefCell<Vec<InputEvent>>>;
    /// Called with each newly started session, before any XR frame
    pub type SessionHook = Rc<dyn Fn(&XrSession)>;

    fn session_error(e: JsValue) -> AppError {
        AppError::XrSession(format!("{e:?}"))
    }

    /// Reads `inputSources[*].gamepad` of the live session
    pub struct WebXrGamepads {
        session: SharedSession,
    }

    impl WebXrGamepads {
        pub fn new(session: SharedSession) -> Self {
            Self { session }
        }
    }

    impl GamepadSource for WebXrGamepads {
        fn poll(&mut self) -> Vec<GamepadSnapshot> {
            let session = self.session.borrow();
            let Some(session) = session.as_ref() else {
                return Vec::new();
            };
            let sources = session.input_sources();
            (0..sources.length())
                .filter_map(|i| sources.get(i))
                .filter_map(|source| {
                    let gamepad = source.gamepad()?;
                    Some(snapshot(handedness(source.handedness()), &gamepad))
                })
                .collect()
        }
    }

    fn handedness(h: XrHandedness) -> Handedness {
        match h {
            XrHandedness::Left => Handedness::Left,
            XrHandedness::Right => Handedness::Right,
            _ => Handedness::None,
        }
    }

    fn snapshot(handedness: Handedness, gamepad: &Gamepad) -> GamepadSnapshot {
        let axes = gamepad
            .axes()
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        let buttons = gamepad
            .buttons()
            .iter()
            .map(|b| b.dyn_into::<GamepadButton>().map(|b| b.pressed()).unwrap_or(false))
            .collect();
        GamepadSnapshot::new(handedness, axes, buttons)
    }

    /// `navigator.xr`, if the browser exposes it
    pub fn xr_system(window: &web_sys::Window) -> Result<XrSystem, AppError> {
        let navigator = window.navigator();
        let xr = js_sys::Reflect::get(&navigator, &JsValue::from_str("xr")).map_err(session_error)?;
        if xr.is_undefined() || xr.is_null() {
            return Err(AppError::XrUnavailable);
        }
        xr.dyn_into::<XrSystem>().map_err(|_| AppError::XrUnavailable)
    }

    /// Ask for an immersive VR session
    pub async fn request_immersive_session(window: &web_sys::Window) -> Result<XrSession, AppError> {
        let xr = xr_system(window)?;
        let session = JsFuture::from(xr.request_session(XrSessionMode::ImmersiveVr))
            .await
            .map_err(session_error)?;
        session
            .dyn_into::<XrSession>()
            .map_err(|_| AppError::XrSession("request did not yield an XRSession".into()))
    }

    /// Give the session an XR-compatible WebGL layer. Without a base layer the
    /// session never produces frames, so gamepads would never update.
    pub fn attach_base_layer(window: &web_sys::Window, session: &XrSession) -> Result<(), AppError> {
        let document = window
            .document()
            .ok_or_else(|| AppError::XrSession("no document for the XR layer".into()))?;
        let canvas = document
            .create_element("canvas")
            .map_err(session_error)?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| AppError::XrSession("failed to create XR canvas".into()))?;

        let options = js_sys::Object::new();
        js_sys::Reflect::set(&options, &JsValue::from_str("xrCompatible"), &JsValue::TRUE).map_err(session_error)?;
        let gl = canvas
            .get_context_with_context_options("webgl2", &options)
            .map_err(session_error)?
            .ok_or_else(|| AppError::XrSession("webgl2 unavailable for the XR layer".into()))?
            .dyn_into::<WebGl2RenderingContext>()
            .map_err(|_| AppError::XrSession("unexpected XR layer context".into()))?;

        let layer = XrWebGlLayer::new_with_web_gl2_rendering_context(session, &gl).map_err(session_error)?;
        let state = XrRenderStateInit::new();
        state.set_base_layer(Some(&layer));
        session.update_render_state_with_state(&state);
        Ok(())
    }

    /// Forward `end`, `selectstart` and `selectend` to the event queue
    pub fn attach_session_listeners(
        session: &XrSession,
        shared: SharedSession,
        events: EventQueue,
    ) -> Result<(), AppError> {
        {
            let events = events.clone();
            let end = Closure::wrap(Box::new(move |_e: Event| {
                shared.borrow_mut().take();
                events.borrow_mut().push(InputEvent::XrSessionEnded);
            }) as Box<dyn FnMut(Event)>);
            session
                .add_event_listener_with_callback("end", end.as_ref().unchecked_ref())
                .map_err(session_error)?;
            end.forget();
        }

        for phase in [SelectPhase::Start, SelectPhase::End] {
            let events = events.clone();
            let session_for_index = session.clone();
            let select = Closure::wrap(Box::new(move |e: Event| {
                let Ok(e) = e.dyn_into::<XrInputSourceEvent>() else { return };
                let target = e.input_source();
                let sources = session_for_index.input_sources();
                let controller = (0..sources.length())
                    .position(|i| sources.get(i).is_some_and(|s| js_sys::Object::is(&s, &target)))
                    .unwrap_or(0);
                events.borrow_mut().push(InputEvent::XrSelect { controller, phase });
            }) as Box<dyn FnMut(Event)>);
            session
                .add_event_listener_with_callback(phase.as_str(), select.as_ref().unchecked_ref())
                .map_err(session_error)?;
            select.forget();
        }

        Ok(())
    }

    /// Start a session (or end the running one), reporting the outcome through the queue
    pub async fn toggle_session(
        window: web_sys::Window,
        shared: SharedSession,
        events: EventQueue,
        on_start: SessionHook,
    ) {
        let running = shared.borrow().clone();
        if let Some(session) = running {
            if let Err(e) = JsFuture::from(session.end()).await {
                events.borrow_mut().push(InputEvent::XrFailed(format!("{e:?}")));
            }
            return;
        }

        let result = async {
            let session = request_immersive_session(&window).await?;
            if let Err(e) = attach_base_layer(&window, &session)
                .and_then(|()| attach_session_listeners(&session, shared.clone(), events.clone()))
            {
                let _ = session.end();
                return Err(e);
            }
            Ok::<_, AppError>(session)
        }
        .await;

        match result {
            Ok(session) => {
                *shared.borrow_mut() = Some(session.clone());
                events.borrow_mut().push(InputEvent::XrSessionStarted);
                on_start(&session);
            }
            Err(e) => events.borrow_mut().push(InputEvent::XrFailed(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_starts_idle() {
        assert_eq!(XrSessionState::default(), XrSessionState::Idle);
        assert!(!XrSessionState::default().is_active());
    }

    #[test]
    fn start_then_end_round_trips() {
        let mut state = XrSessionState::default();
        assert!(state.start());
        assert!(state.is_active());
        assert!(!state.start());
        assert!(state.end());
        assert_eq!(state, XrSessionState::Idle);
        assert!(!state.end());
        assert!(!state.end());
        assert_eq!(state, XrSessionState::Idle);
    }

    #[test]
    fn console_drops_oldest_lines() {
        let mut log = ConsoleLog::new(2);
        log.push("a");
        log.push("b");
        log.push("c");
        assert_eq!(log.lines().collect::<Vec<_>>(), vec!["b", "c"]);
        assert_eq!(log.tail(1).collect::<Vec<_>>(), vec!["c"]);
        assert_eq!(log.tail(5).count(), 2);
    }

    #[test]
    fn zero_capacity_console_stays_empty() {
        let mut log = ConsoleLog::new(0);
        log.push("ignored");
        assert_eq!(log.lines().count(), 0);
    }
}
