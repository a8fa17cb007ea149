// Re-export all public modules so they can be used from main.rs
pub mod logging;
pub mod config;
pub mod error;
pub mod utils;
pub mod ui;

// MVC Architecture
pub mod model;
pub mod view;
pub mod controller;

#[cfg(target_arch = "wasm32")]
use std::cell::RefCell;
#[cfg(target_arch = "wasm32")]
use std::rc::Rc;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::closure::Closure;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::{JsCast, JsValue, prelude::wasm_bindgen};
#[cfg(target_arch = "wasm32")]
use web_sys::{Document, Event, HtmlCanvasElement, KeyboardEvent, MouseEvent, Window};

#[cfg(target_arch = "wasm32")]
use config::DemoConfig;
#[cfg(target_arch = "wasm32")]
use controller::{FrameLoop, GamepadSource, InputEvent};
#[cfg(target_arch = "wasm32")]
use error::AppError;
#[cfg(target_arch = "wasm32")]
use model::DemoScene;
#[cfg(target_arch = "wasm32")]
use view::{GpuContext, WgpuRenderer};

#[cfg(target_arch = "wasm32")]
type EventQueue = Rc<RefCell<Vec<InputEvent>>>;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn start() -> Result<(), JsValue> {
    logging::init();
    let (window, document, canvas) = init_canvas()?;
    setup_app(&window, &document, &canvas).await?;
    Ok(())
}

/// Main application setup for WASM
#[cfg(target_arch = "wasm32")]
async fn setup_app(
    window: &Window,
    document: &Document,
    canvas: &HtmlCanvasElement,
) -> Result<(), AppError> {
    let (width, height) = window_size(window);
    let gpu = GpuContext::new(canvas, width, height).await?;

    let config = DemoConfig::default();
    let scene = DemoScene::new(&config.scene);
    let mut frame_loop = FrameLoop::new(&config, width, height);
    let mut renderer = WgpuRenderer::new(gpu, &scene, &frame_loop.panel);
    tracing::info!("scene ready: {} boxes", scene.boxes.len());

    let events: EventQueue = Rc::new(RefCell::new(Vec::new()));
    let egui_events: Rc<RefCell<Vec<egui::Event>>> = Rc::new(RefCell::new(Vec::new()));
    setup_input_listeners(document, window, canvas, events.clone(), egui_events.clone())?;

    let xr = XrHost::default();
    let mut gamepads = xr.gamepads();

    // One frame body, driven by window rAF or by the XR session's rAF while it runs
    let frames = RcCellCallback::new(window.clone(), {
        let window_for_loop = window.clone();
        let events = events.clone();

        move || {
            let pointer_on_ui = renderer.egui_ctx().wants_pointer_input();
            let pending: Vec<InputEvent> = events.borrow_mut().drain(..).collect();
            for event in pending {
                let starts_on_ui = matches!(
                    event,
                    InputEvent::MouseClick { is_down: true, .. } | InputEvent::MouseWheel { .. }
                );
                if pointer_on_ui && starts_on_ui {
                    continue;
                }
                frame_loop.handle_event(event, &mut renderer);
            }

            // The canvas is sized in CSS pixels, so one egui point per pixel
            let mut raw_input = egui::RawInput::default();
            raw_input.time = window_for_loop.performance().map(|p| p.now() / 1000.0);
            raw_input.events.extend(egui_events.borrow_mut().drain(..));
            renderer.set_ui_input(raw_input, 1.0);

            if let Err(e) = frame_loop.tick(gamepads.as_mut(), &mut renderer) {
                tracing::error!("frame {} failed: {e}", frame_loop.frame_count());
            }
        }
    });

    setup_xr(window, document, events, &xr, frames.clone())?;
    frames.start(move || xr.is_presenting());

    Ok(())
}

/// WebXR session shared by the VR button, the gamepad reader and the frame scheduler
#[cfg(target_arch = "wasm32")]
#[derive(Clone, Default)]
struct XrHost {
    #[cfg(web_sys_unstable_apis)]
    session: controller::xr::wasm::SharedSession,
}

#[cfg(target_arch = "wasm32")]
impl XrHost {
    fn gamepads(&self) -> Box<dyn GamepadSource> {
        #[cfg(web_sys_unstable_apis)]
        let source: Box<dyn GamepadSource> =
            Box::new(controller::xr::wasm::WebXrGamepads::new(self.session.clone()));
        #[cfg(not(web_sys_unstable_apis))]
        let source: Box<dyn GamepadSource> = Box::new(controller::NoGamepads);
        source
    }

    /// True while an immersive session owns the frame clock
    fn is_presenting(&self) -> bool {
        #[cfg(web_sys_unstable_apis)]
        let presenting = self.session.borrow().is_some();
        #[cfg(not(web_sys_unstable_apis))]
        let presenting = false;
        presenting
    }
}

#[cfg(all(target_arch = "wasm32", web_sys_unstable_apis))]
fn setup_xr(
    window: &Window,
    document: &Document,
    events: EventQueue,
    xr: &XrHost,
    frames: RcCellCallback,
) -> Result<(), AppError> {
    use controller::xr::wasm::{toggle_session, xr_system, SessionHook};
    use web_sys::XrSession;

    if let Err(e) = xr_system(window) {
        tracing::warn!("{e}");
        events.borrow_mut().push(InputEvent::XrFailed(e.to_string()));
        return Ok(());
    }

    let body = document.body().ok_or_else(|| AppError::Window("no body on document".into()))?;
    let button = document.create_element("button").map_err(js_window_error)?;
    button.set_text_content(Some("ENTER VR"));
    button
        .set_attribute(
            "style",
            "position:absolute;bottom:20px;left:calc(50% - 50px);width:100px;padding:12px 6px;",
        )
        .map_err(js_window_error)?;
    body.append_child(&button).map_err(js_window_error)?;

    // Switch the frame clock to the session and keep the label in step with it
    let on_start: SessionHook = {
        let button = button.clone();
        Rc::new(move |session: &XrSession| {
            button.set_text_content(Some("EXIT VR"));
            frames.start_on_session(session);

            let button = button.clone();
            let end = Closure::wrap(Box::new(move |_e: Event| {
                button.set_text_content(Some("ENTER VR"));
            }) as Box<dyn FnMut(Event)>);
            if let Err(e) = session.add_event_listener_with_callback("end", end.as_ref().unchecked_ref()) {
                tracing::warn!("could not watch XR session end: {e:?}");
            }
            end.forget();
        })
    };

    {
        let window = window.clone();
        let session = xr.session.clone();
        let click = Closure::wrap(Box::new(move |_e: Event| {
            wasm_bindgen_futures::spawn_local(toggle_session(
                window.clone(),
                session.clone(),
                events.clone(),
                on_start.clone(),
            ));
        }) as Box<dyn FnMut(Event)>);
        button
            .add_event_listener_with_callback("click", click.as_ref().unchecked_ref())
            .map_err(js_window_error)?;
        click.forget();
    }

    Ok(())
}

#[cfg(all(target_arch = "wasm32", not(web_sys_unstable_apis)))]
fn setup_xr(
    _window: &Window,
    _document: &Document,
    events: EventQueue,
    _xr: &XrHost,
    _frames: RcCellCallback,
) -> Result<(), AppError> {
    tracing::warn!("built without web_sys_unstable_apis, WebXR disabled");
    events.borrow_mut().push(InputEvent::XrFailed(AppError::XrUnavailable.to_string()));
    Ok(())
}

/// Keyboard, mouse, focus and resize listeners feeding the event queues
#[cfg(target_arch = "wasm32")]
fn setup_input_listeners(
    document: &Document,
    window: &Window,
    canvas: &HtmlCanvasElement,
    events: EventQueue,
    egui_events: Rc<RefCell<Vec<egui::Event>>>,
) -> Result<(), AppError> {
    use controller::input::wasm::{
        is_navigation_key, keyboard_event_to_input, mouse_click_to_input, mouse_move_to_input, mouse_to_egui,
        mouse_wheel_to_input,
    };

    // Keyboard down
    {
        let events = events.clone();
        let keydown = Closure::wrap(Box::new(move |e: KeyboardEvent| {
            if is_navigation_key(&e.key()) {
                e.prevent_default();
            }
            events.borrow_mut().push(keyboard_event_to_input(&e, true));
        }) as Box<dyn FnMut(KeyboardEvent)>);
        document
            .add_event_listener_with_callback("keydown", keydown.as_ref().unchecked_ref())
            .map_err(js_window_error)?;
        keydown.forget();
    }

    // Keyboard up
    {
        let events = events.clone();
        let keyup = Closure::wrap(Box::new(move |e: KeyboardEvent| {
            events.borrow_mut().push(keyboard_event_to_input(&e, false));
        }) as Box<dyn FnMut(KeyboardEvent)>);
        document
            .add_event_listener_with_callback("keyup", keyup.as_ref().unchecked_ref())
            .map_err(js_window_error)?;
        keyup.forget();
    }

    // Focus loss and hidden tab - forget held keys
    let focus_targets: [(&web_sys::EventTarget, &str); 2] =
        [(window.as_ref(), "blur"), (document.as_ref(), "visibilitychange")];
    for (target, name) in focus_targets {
        let events = events.clone();
        let lost = Closure::wrap(Box::new(move |_e: Event| {
            events.borrow_mut().push(InputEvent::FocusLost);
        }) as Box<dyn FnMut(Event)>);
        target
            .add_event_listener_with_callback(name, lost.as_ref().unchecked_ref())
            .map_err(js_window_error)?;
        lost.forget();
    }

    // Mouse down on the scene starts an orbit drag
    {
        let events = events.clone();
        let egui_events = egui_events.clone();
        let mousedown = Closure::wrap(Box::new(move |e: MouseEvent| {
            events.borrow_mut().push(mouse_click_to_input(&e, true));
            egui_events.borrow_mut().push(mouse_to_egui(&e, Some(true)));
        }) as Box<dyn FnMut(MouseEvent)>);
        canvas
            .add_event_listener_with_callback("mousedown", mousedown.as_ref().unchecked_ref())
            .map_err(js_window_error)?;
        mousedown.forget();
    }

    // Mouse up anywhere ends it
    {
        let events = events.clone();
        let egui_events = egui_events.clone();
        let mouseup = Closure::wrap(Box::new(move |e: MouseEvent| {
            events.borrow_mut().push(mouse_click_to_input(&e, false));
            egui_events.borrow_mut().push(mouse_to_egui(&e, Some(false)));
        }) as Box<dyn FnMut(MouseEvent)>);
        document
            .add_event_listener_with_callback("mouseup", mouseup.as_ref().unchecked_ref())
            .map_err(js_window_error)?;
        mouseup.forget();
    }

    // Mouse move
    {
        let events = events.clone();
        let mm = Closure::wrap(Box::new(move |e: MouseEvent| {
            events.borrow_mut().push(mouse_move_to_input(&e));
            egui_events.borrow_mut().push(mouse_to_egui(&e, None));
        }) as Box<dyn FnMut(MouseEvent)>);
        document
            .add_event_listener_with_callback("mousemove", mm.as_ref().unchecked_ref())
            .map_err(js_window_error)?;
        mm.forget();
    }

    // Mouse wheel
    {
        let events = events.clone();
        let wheel = Closure::wrap(Box::new(move |e: Event| {
            if let Some(event) = mouse_wheel_to_input(&e) {
                events.borrow_mut().push(event);
                e.prevent_default();
            }
        }) as Box<dyn FnMut(Event)>);
        canvas
            .add_event_listener_with_callback("wheel", wheel.as_ref().unchecked_ref())
            .map_err(js_window_error)?;
        wheel.forget();
    }

    // Window resize
    {
        let window_for_size = window.clone();
        let canvas = canvas.clone();
        let resize = Closure::wrap(Box::new(move |_e: Event| {
            let (width, height) = window_size(&window_for_size);
            canvas.set_width(width);
            canvas.set_height(height);
            events.borrow_mut().push(InputEvent::Resized { width, height });
        }) as Box<dyn FnMut(Event)>);
        window
            .add_event_listener_with_callback("resize", resize.as_ref().unchecked_ref())
            .map_err(js_window_error)?;
        resize.forget();
    }

    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn window_size(window: &Window) -> (u32, u32) {
    let w = window.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(800.0);
    let h = window.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(600.0);
    (w.max(1.0) as u32, h.max(1.0) as u32)
}

#[cfg(target_arch = "wasm32")]
fn init_canvas() -> Result<(Window, Document, HtmlCanvasElement), AppError> {
    let window = web_sys::window().ok_or_else(|| AppError::Window("no global `window`".into()))?;
    let document = window.document().ok_or_else(|| AppError::Window("no document on window".into()))?;
    let body = document.body().ok_or_else(|| AppError::Window("no body on document".into()))?;
    let canvas_el = document
        .create_element("canvas")
        .map_err(js_window_error)?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| AppError::Window("failed to create canvas".into()))?;
    let (width, height) = window_size(&window);
    canvas_el.set_width(width);
    canvas_el.set_height(height);
    body.append_child(&canvas_el).map_err(js_window_error)?;
    Ok((window, document, canvas_el))
}

#[cfg(target_arch = "wasm32")]
fn js_window_error(e: JsValue) -> AppError {
    AppError::Window(format!("{e:?}"))
}

#[cfg(target_arch = "wasm32")]
#[derive(Clone)]
struct RcCellCallback {
    inner: Rc<RefCell<Box<dyn FnMut()>>>,
    window: Window,
}

#[cfg(target_arch = "wasm32")]
impl RcCellCallback {
    fn new(window: Window, f: impl FnMut() + 'static) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Box::new(f))),
            window,
        }
    }

    /// Window-driven loop. Frames where `paused` holds belong to the XR session loop.
    fn start(&self, paused: impl Fn() -> bool + 'static) {
        let inner = self.inner.clone();
        let window = self.window.clone();

        let callback = Rc::new(RefCell::new(None::<Closure<dyn FnMut()>>));
        let callback_clone = callback.clone();

        *callback.borrow_mut() = Some(Closure::wrap(Box::new(move || {
            if !paused() {
                inner.borrow_mut().as_mut()();
            }

            // Recursively schedule next frame
            if let Some(cb) = callback_clone.borrow().as_ref() {
                if let Err(e) = window.request_animation_frame(cb.as_ref().unchecked_ref()) {
                    tracing::error!("requestAnimationFrame failed: {e:?}");
                }
            }
        }) as Box<dyn FnMut()>));

        if let Some(cb) = callback.borrow().as_ref() {
            if let Err(e) = self.window.request_animation_frame(cb.as_ref().unchecked_ref()) {
                tracing::error!("requestAnimationFrame start failed: {e:?}");
            }
        }

        // Leak the closure to keep it alive
        std::mem::forget(callback);
    }

    /// Run the same body on the session's frame clock. An ended session stops
    /// calling back, which ends this loop.
    #[cfg(web_sys_unstable_apis)]
    fn start_on_session(&self, session: &web_sys::XrSession) {
        let inner = self.inner.clone();
        let session_for_loop = session.clone();

        let callback = Rc::new(RefCell::new(None::<Closure<dyn FnMut()>>));
        let callback_clone = callback.clone();

        *callback.borrow_mut() = Some(Closure::wrap(Box::new(move || {
            inner.borrow_mut().as_mut()();

            if let Some(cb) = callback_clone.borrow().as_ref() {
                session_for_loop.request_animation_frame(cb.as_ref().unchecked_ref());
            }
        }) as Box<dyn FnMut()>));

        if let Some(cb) = callback.borrow().as_ref() {
            session.request_animation_frame(cb.as_ref().unchecked_ref());
        }

        std::mem::forget(callback);
    }
}
