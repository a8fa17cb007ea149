use winit::{
    event::*,
    event_loop::EventLoop,
    window::Window,
};
use std::sync::Arc;

// Import from the library crate
use xrworld::{
    config, logging,
    model, view, controller,
};

use config::DemoConfig;
use controller::{FrameLoop, InputEvent, NoGamepads};
use controller::input::native::{cursor_to_input, key_event_to_input, mouse_button_to_input, wheel_to_input};
use model::DemoScene;
use view::{GpuContext, WgpuRenderer};
use xrworld::error::AppError;

struct App {
    window: Arc<Window>,
    renderer: WgpuRenderer,
    frame_loop: FrameLoop,
    gamepads: NoGamepads,
    last_cursor: Option<winit::dpi::PhysicalPosition<f64>>,

    // egui
    egui_state: egui_winit::State,
}

impl App {
    async fn new(window: Arc<Window>, config: &DemoConfig) -> Result<Self, AppError> {
        let size = window.inner_size();
        let gpu = GpuContext::new_native(window.clone()).await?;

        let scene = DemoScene::new(&config.scene);
        let frame_loop = FrameLoop::new(config, size.width, size.height);
        let renderer = WgpuRenderer::new(gpu, &scene, &frame_loop.panel);
        tracing::info!("scene ready: {} boxes", scene.boxes.len());

        let egui_state = egui_winit::State::new(
            renderer.egui_ctx().clone(),
            egui::ViewportId::ROOT,
            &window,
            None,
            None,
            None,
        );

        Ok(Self {
            window,
            renderer,
            frame_loop,
            gamepads: NoGamepads,
            last_cursor: None,
            egui_state,
        })
    }

    fn input(&mut self, event: &WindowEvent) -> bool {
        // Button releases always reach the scene so a drag can't outlive the press
        if let WindowEvent::MouseInput { state: ElementState::Released, button, .. } = event {
            if let Some(release) = mouse_button_to_input(ElementState::Released, *button) {
                self.frame_loop.handle_event(release, &mut self.renderer);
            }
        }
        if let WindowEvent::CursorMoved { position, .. } = event {
            let last = self.last_cursor.replace(*position);
            if let Some(motion) = cursor_to_input(last, *position) {
                self.frame_loop.handle_event(motion, &mut self.renderer);
            }
        }

        // Then let egui process the event
        let egui_captured = self.egui_state.on_window_event(self.window.as_ref(), event).consumed;
        if egui_captured {
            return true;
        }

        let translated = match event {
            WindowEvent::KeyboardInput { event, .. } => key_event_to_input(event),
            WindowEvent::MouseInput { state: ElementState::Pressed, button, .. } => {
                mouse_button_to_input(ElementState::Pressed, *button)
            }
            WindowEvent::MouseWheel { delta, .. } => Some(wheel_to_input(delta)),
            WindowEvent::Focused(false) => Some(InputEvent::FocusLost),
            _ => None,
        };
        match translated {
            Some(input) => {
                self.frame_loop.handle_event(input, &mut self.renderer);
                true
            }
            None => false,
        }
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        self.frame_loop.handle_event(
            InputEvent::Resized { width: new_size.width, height: new_size.height },
            &mut self.renderer,
        );
    }

    fn redraw(&mut self) -> Result<(), AppError> {
        let raw_input = self.egui_state.take_egui_input(&self.window);
        self.renderer.set_ui_input(raw_input, self.window.scale_factor() as f32);

        let result = self.frame_loop.tick(&mut self.gamepads, &mut self.renderer);

        if let Some(platform_output) = self.renderer.take_platform_output() {
            self.egui_state.handle_platform_output(&self.window, platform_output);
        }
        result
    }
}

fn main() {
    logging::init();

    if let Err(e) = run() {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    let config = DemoConfig::from_env();

    let event_loop = EventLoop::new().map_err(|e| AppError::Window(e.to_string()))?;
    let window_attributes = Window::default_attributes()
        .with_title("xrworld")
        .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
    #[allow(deprecated)]
    let window = event_loop
        .create_window(window_attributes)
        .map_err(|e| AppError::Window(e.to_string()))?;
    let window = Arc::new(window);

    let mut app = pollster::block_on(App::new(window, &config))?;

    #[allow(deprecated)]
    event_loop.run(move |event, elwt| {
        match event {
            Event::WindowEvent {
                ref event,
                window_id,
            } if window_id == app.window.id() => {
                if !app.input(event) {
                    match event {
                        WindowEvent::CloseRequested => elwt.exit(),
                        WindowEvent::Resized(physical_size) => {
                            app.resize(*physical_size);
                        }
                        WindowEvent::RedrawRequested => match app.redraw() {
                            Ok(()) => {}
                            Err(AppError::SurfaceOutOfMemory) => {
                                tracing::error!("surface out of memory, exiting");
                                elwt.exit();
                            }
                            Err(e) => tracing::warn!("frame skipped: {e}"),
                        },
                        _ => {}
                    }
                }
            }
            Event::AboutToWait => {
                app.window.request_redraw();
            }
            _ => {}
        }
    }).map_err(|e| AppError::Window(e.to_string()))
}
