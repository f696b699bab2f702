mod desktop;
mod orchestrator;
pub(crate) mod runtime_loop;
pub mod subsystems;

pub use desktop::DesktopBuilder;
pub use orchestrator::Orchestrator;
pub use runtime_loop::FrameTick;

use anyhow::{Context, Result};
use log::{error, info};
use winit::application::ApplicationHandler;
use winit::event::{DeviceEvent, DeviceId, ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::WindowId;

use crate::config::{AppConfig, AppConfigOverrides};
use crate::renderer::Renderer;

pub async fn run() -> Result<()> {
    run_with_overrides(AppConfigOverrides::default()).await
}

pub async fn run_with_overrides(overrides: AppConfigOverrides) -> Result<()> {
    let mut config = AppConfig::load_or_default(overrides.config_path());
    if !overrides.is_empty() {
        info!("[config] command line overrides: {}", overrides.applied_fields().join(", "));
    }
    config.apply_overrides(&overrides);
    let event_loop = EventLoop::new().context("Failed to create winit event loop")?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app).context("Event loop execution failed")?;
    match app.failure.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// winit host. Owns the orchestrator once the window exists and turns window events into
/// frames, resizes and input.
struct App {
    config: AppConfig,
    orchestrator: Option<Orchestrator<DesktopBuilder>>,
    occluded: bool,
    failure: Option<anyhow::Error>,
}

impl App {
    fn new(config: AppConfig) -> Self {
        Self { config, orchestrator: None, occluded: false, failure: None }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<Orchestrator<DesktopBuilder>> {
        let window = Renderer::open_window(event_loop, &self.config.window)?;
        let builder = DesktopBuilder::new(window, self.config.clone());
        pollster::block_on(Orchestrator::init(builder))
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!("{err:#}");
        self.failure = Some(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.orchestrator.is_some() || self.failure.is_some() {
            return;
        }
        match self.start(event_loop) {
            Ok(orchestrator) => {
                orchestrator.request_next_frame();
                self.orchestrator = Some(orchestrator);
            }
            Err(err) => self.fail(event_loop, err.context("Startup failed")),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(orchestrator) = self.orchestrator.as_mut() else {
            return;
        };
        match &event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event: KeyEvent { logical_key: Key::Named(NamedKey::Escape), state: ElementState::Pressed, .. },
                ..
            } => {
                info!("[app] closing after {} frames", orchestrator.frame_count());
                event_loop.exit();
                return;
            }
            WindowEvent::RedrawRequested => {
                // schedule the next cycle first; a hidden window stops asking
                if !self.occluded {
                    orchestrator.request_next_frame();
                }
                if let Err(err) = orchestrator.frame() {
                    self.fail(event_loop, err);
                }
                return;
            }
            WindowEvent::Resized(size) => orchestrator.resize(*size),
            WindowEvent::Occluded(occluded) => {
                self.occluded = *occluded;
                if !*occluded {
                    orchestrator.request_next_frame();
                }
            }
            _ => {}
        }
        orchestrator.handle_window_event(&event);
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device: DeviceId, event: DeviceEvent) {
        if let Some(orchestrator) = self.orchestrator.as_mut() {
            orchestrator.handle_device_event(&event);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(orchestrator) = self.orchestrator.as_mut() {
            orchestrator.pump_settings();
        }
    }
}
