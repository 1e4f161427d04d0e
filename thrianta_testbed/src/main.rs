//! Thrianta testbed
//!
//! Opens a window, brings up the Vulkan device and the frame orchestrator,
//! and clears the screen every frame until the window is closed.
//!
//! Exit codes: 0 on a clean shutdown, 1 when a frame fails, small negative
//! values when a startup stage fails.

use std::cell::Cell;
use std::rc::Rc;

use winit::application::ApplicationHandler;
use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use thrianta_engine::thrianta::event::{EventBus, EventContext, ListenerId, SystemEventCode};
use thrianta_engine::thrianta::input::{keys, InputState, MouseButton};
use thrianta_engine::thrianta::render::{RenderPacket, RendererConfig};
use thrianta_engine::thrianta::{Clock, Renderer};
use thrianta_engine::{engine_error, engine_info};
use thrianta_engine_renderer_vulkan::{print_validation_stats_report, VulkanGraphicsDevice};

const SOURCE: &str = "thrianta::testbed";

const EXIT_RUNTIME_FAILURE: i32 = 1;
const EXIT_EVENT_LOOP: i32 = -1;
const EXIT_WINDOW: i32 = -2;
const EXIT_DEVICE: i32 = -3;
const EXIT_RENDERER: i32 = -4;

const APP_LISTENER: ListenerId = 1;
const RENDERER_LISTENER: ListenerId = 2;

const LETTERS: [KeyCode; 26] = [
    KeyCode::KeyA, KeyCode::KeyB, KeyCode::KeyC, KeyCode::KeyD, KeyCode::KeyE, KeyCode::KeyF,
    KeyCode::KeyG, KeyCode::KeyH, KeyCode::KeyI, KeyCode::KeyJ, KeyCode::KeyK, KeyCode::KeyL,
    KeyCode::KeyM, KeyCode::KeyN, KeyCode::KeyO, KeyCode::KeyP, KeyCode::KeyQ, KeyCode::KeyR,
    KeyCode::KeyS, KeyCode::KeyT, KeyCode::KeyU, KeyCode::KeyV, KeyCode::KeyW, KeyCode::KeyX,
    KeyCode::KeyY, KeyCode::KeyZ,
];

const DIGITS: [KeyCode; 10] = [
    KeyCode::Digit0, KeyCode::Digit1, KeyCode::Digit2, KeyCode::Digit3, KeyCode::Digit4,
    KeyCode::Digit5, KeyCode::Digit6, KeyCode::Digit7, KeyCode::Digit8, KeyCode::Digit9,
];

const FUNCTION_KEYS: [KeyCode; 12] = [
    KeyCode::F1, KeyCode::F2, KeyCode::F3, KeyCode::F4, KeyCode::F5, KeyCode::F6,
    KeyCode::F7, KeyCode::F8, KeyCode::F9, KeyCode::F10, KeyCode::F11, KeyCode::F12,
];

/// Engine key code for a physical key, if the engine knows it
fn engine_key(key: PhysicalKey) -> Option<u8> {
    let PhysicalKey::Code(code) = key else {
        return None;
    };
    let offset = |table: &[KeyCode], base: u8| {
        table.iter().position(|&k| k == code).map(|i| base + i as u8)
    };

    match code {
        KeyCode::Backspace => Some(keys::BACKSPACE),
        KeyCode::Tab => Some(keys::TAB),
        KeyCode::Enter => Some(keys::ENTER),
        KeyCode::ShiftLeft | KeyCode::ShiftRight => Some(keys::SHIFT),
        KeyCode::ControlLeft | KeyCode::ControlRight => Some(keys::CONTROL),
        KeyCode::Escape => Some(keys::ESCAPE),
        KeyCode::Space => Some(keys::SPACE),
        KeyCode::ArrowLeft => Some(keys::LEFT),
        KeyCode::ArrowUp => Some(keys::UP),
        KeyCode::ArrowRight => Some(keys::RIGHT),
        KeyCode::ArrowDown => Some(keys::DOWN),
        _ => offset(&LETTERS, keys::A)
            .or_else(|| offset(&DIGITS, keys::DIGIT_0))
            .or_else(|| offset(&FUNCTION_KEYS, keys::F1)),
    }
}

fn engine_button(button: winit::event::MouseButton) -> Option<MouseButton> {
    match button {
        winit::event::MouseButton::Left => Some(MouseButton::Left),
        winit::event::MouseButton::Right => Some(MouseButton::Right),
        winit::event::MouseButton::Middle => Some(MouseButton::Middle),
        _ => None,
    }
}

struct App {
    config: RendererConfig,
    // Declared before the window: the surface must go first
    renderer: Option<Renderer>,
    window: Option<Window>,
    events: EventBus,
    input: InputState,
    quit_requested: Rc<Cell<bool>>,
    clock: Clock,
    last_time: f64,
    exit_code: i32,
}

impl App {
    fn new(config: RendererConfig) -> Self {
        let mut events = EventBus::new();
        let quit_requested = Rc::new(Cell::new(false));
        let flag = Rc::clone(&quit_requested);
        events.register(SystemEventCode::ApplicationQuit, APP_LISTENER, move |_, _| {
            flag.set(true);
            true
        });
        let flag = Rc::clone(&quit_requested);
        events.register(SystemEventCode::KeyPressed, APP_LISTENER, move |_, context| {
            if *context == EventContext::Key(u32::from(keys::ESCAPE)) {
                flag.set(true);
                return true;
            }
            false
        });

        Self {
            config,
            renderer: None,
            window: None,
            events,
            input: InputState::new(),
            quit_requested,
            clock: Clock::new(),
            last_time: 0.0,
            exit_code: 0,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, code: i32) {
        self.exit_code = code;
        self.shutdown();
        event_loop.exit();
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<(), i32> {
        let attributes = Window::default_attributes()
            .with_title(self.config.app_name.as_str())
            .with_inner_size(winit::dpi::PhysicalSize::new(1280, 720));
        let window = event_loop.create_window(attributes).map_err(|e| {
            engine_error!(SOURCE, "Failed to create window: {}", e);
            EXIT_WINDOW
        })?;

        let size = window.inner_size();
        let device = VulkanGraphicsDevice::new(&window, &self.config, size.width, size.height)
            .map_err(|e| {
                engine_error!(SOURCE, "Failed to create the Vulkan device: {}", e);
                EXIT_DEVICE
            })?;
        engine_info!(SOURCE, "Running on '{}'", device.adapter_info().name);

        let renderer = Renderer::new(Box::new(device), &self.config).map_err(|e| {
            engine_error!(SOURCE, "Failed to create the renderer: {}", e);
            EXIT_RENDERER
        })?;
        renderer.framebuffer_size().listen(&mut self.events, RENDERER_LISTENER);

        self.renderer = Some(renderer);
        self.window = Some(window);
        self.clock.start();
        self.last_time = 0.0;
        Ok(())
    }

    fn draw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };

        self.clock.update();
        let now = self.clock.elapsed();
        let packet = RenderPacket { delta_time: (now - self.last_time) as f32 };
        self.last_time = now;

        if let Err(e) = renderer.draw_frame(&packet) {
            engine_error!(SOURCE, "Frame failed: {}", e);
            self.fail(event_loop, EXIT_RUNTIME_FAILURE);
            return;
        }
        self.input.update();
    }

    fn shutdown(&mut self) {
        self.events.unregister(SystemEventCode::Resized, RENDERER_LISTENER);
        if let Some(mut renderer) = self.renderer.take() {
            if let Err(e) = renderer.shutdown() {
                engine_error!(SOURCE, "Renderer shutdown failed: {}", e);
            }
            engine_info!(SOURCE, "Presented {} frames", renderer.frame_number());
        }
        self.clock.stop();
        self.window = None;
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(code) = self.start(event_loop) {
            self.fail(event_loop, code);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                self.events.fire(SystemEventCode::ApplicationQuit, EventContext::None);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let Some(key) = engine_key(event.physical_key) {
                    let pressed = event.state == ElementState::Pressed;
                    self.input.process_key(&mut self.events, key, pressed);
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if let Some(button) = engine_button(button) {
                    let pressed = state == ElementState::Pressed;
                    self.input.process_button(&mut self.events, button, pressed);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.input
                    .process_mouse_move(&mut self.events, position.x as i32, position.y as i32);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let delta = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(position) => position.y as f32,
                };
                if delta != 0.0 {
                    self.input.process_mouse_wheel(&mut self.events, delta.signum());
                }
            }
            WindowEvent::Resized(size) => {
                self.events.fire(
                    SystemEventCode::Resized,
                    EventContext::Resized { width: size.width, height: size.height },
                );
            }
            WindowEvent::RedrawRequested => self.draw(event_loop),
            _ => {}
        }

        if self.quit_requested.get() {
            engine_info!(SOURCE, "Quit requested");
            self.shutdown();
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shutdown();
    }
}

fn run() -> i32 {
    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            engine_error!(SOURCE, "Failed to create the event loop: {}", e);
            return EXIT_EVENT_LOOP;
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let config = RendererConfig {
        app_name: "Thrianta Testbed".to_string(),
        ..RendererConfig::default()
    };
    let validation = config.enable_validation;
    let mut app = App::new(config);

    if let Err(e) = event_loop.run_app(&mut app) {
        engine_error!(SOURCE, "Event loop failed: {}", e);
        return EXIT_EVENT_LOOP;
    }

    if validation {
        print_validation_stats_report();
    }
    app.exit_code
}

fn main() {
    std::process::exit(run());
}
