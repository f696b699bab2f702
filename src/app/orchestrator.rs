use std::time::Instant;

use anyhow::{Context, Result};
use log::{debug, info};
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, ElementState, WindowEvent};

use super::runtime_loop::{FrameClock, FrameTick};
use super::subsystems::{
    AudioSystem, CameraControl, EnvironmentSystem, InstallationBuilder, PlantSystem, RenderSurface, UiSystem,
};
use crate::camera3d::Camera3D;
use crate::events::{SettingsChannel, SettingsEvent, SettingsSubscriber};
use crate::placement::load_plants;
use crate::scene::Scene;
use crate::time::Time;

/// Owns every subsystem and drives them through the frame cycle.
///
/// An `Orchestrator` only exists once `init` has brought up every handle, so nothing
/// in the frame cycle or the settings dispatcher has to check for missing subsystems.
pub struct Orchestrator<B: InstallationBuilder> {
    renderer: B::Renderer,
    scene: Scene,
    camera: Camera3D,
    environment: B::Environment,
    plants: B::Plants,
    audio: B::Audio,
    controller: B::Controller,
    ui: B::Ui,
    settings: SettingsSubscriber,
    clock: FrameClock,
}

impl<B: InstallationBuilder> Orchestrator<B> {
    /// Brings the installation up in dependency order and places the plants.
    /// Any failure aborts startup.
    pub async fn init(mut builder: B) -> Result<Self> {
        let mut renderer = builder.create_renderer().context("Failed to create renderer")?;
        let mut scene = builder.create_scene().context("Failed to create scene")?;
        let surface = renderer.size();
        let mut camera = builder.create_camera(surface).context("Failed to create camera")?;
        camera.set_viewport(surface);
        camera.update_projection_matrix();
        info!("[init] renderer {}x{}, scene and camera ready", surface.width, surface.height);

        let environment =
            builder.create_environment(&mut scene, &mut renderer).context("Failed to create environment")?;
        let mut plants = builder.create_plants(&mut scene).context("Failed to create plant manager")?;
        let audio = builder.create_audio().context("Failed to create audio system")?;
        let controller = builder
            .create_camera_controller(&camera, &renderer)
            .context("Failed to create camera controller")?;
        let (publisher, settings) = SettingsChannel::open();
        let ui = builder.create_ui(&renderer, publisher).context("Failed to create UI")?;
        info!("[init] subsystems ready");

        let layout = environment.plant_layout();
        load_plants(&mut plants, &mut scene, &layout).await.context("Plant placement failed")?;

        let clock = FrameClock::new(Time::new(builder.max_frame_delta()));
        info!("[init] starting frame loop");
        Ok(Self { renderer, scene, camera, environment, plants, audio, controller, ui, settings, clock })
    }

    pub fn request_next_frame(&self) {
        self.renderer.request_redraw();
    }

    pub fn frame(&mut self) -> Result<FrameTick> {
        self.frame_at(Instant::now())
    }

    /// One update-then-render cycle. The order below is load-bearing: the camera moves
    /// before anything reads its position, and rendering comes last.
    pub fn frame_at(&mut self, now: Instant) -> Result<FrameTick> {
        let tick = self.clock.tick_at(now);
        self.controller.update(&mut self.camera, tick.dt);
        let observer = self.camera.position;
        self.plants.update(&mut self.scene, tick.dt, observer);
        self.audio.update();
        self.ui.update();
        self.environment.update(&mut self.scene, tick.elapsed);
        let overlay = self.ui.take_overlay();
        self.renderer
            .render(&self.scene, &self.camera, overlay.as_ref())
            .with_context(|| format!("Render failed on frame {}", tick.frame))?;
        Ok(tick)
    }

    /// Dispatches every queued settings event. Returns how many were handled.
    pub fn pump_settings(&mut self) -> usize {
        let events = self.settings.drain();
        let count = events.len();
        for event in events {
            self.dispatch(event);
        }
        count
    }

    pub fn dispatch(&mut self, event: SettingsEvent) {
        debug!("[settings] {event}");
        match event {
            SettingsEvent::MouseSensitivity(value) => self.controller.set_mouse_sensitivity(value),
            SettingsEvent::MoveSpeed(value) => self.controller.set_move_speed(value),
            SettingsEvent::AudioVolume(value) => {
                self.plants.set_audio_volume(value);
                self.audio.set_master_volume(value);
            }
        }
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.camera.set_viewport(size);
        self.camera.update_projection_matrix();
        self.renderer.resize(size);
    }

    /// The UI sees events first. Releases and focus loss always reach the controller too,
    /// so a button let go over the panel cannot leave it stuck down.
    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        let consumed = self.ui.handle_window_event(event);
        if !consumed || releases_held_input(event) {
            self.controller.handle_window_event(event);
        }
    }

    pub fn handle_device_event(&mut self, event: &DeviceEvent) {
        self.controller.handle_device_event(event);
    }

    pub fn frame_count(&self) -> u64 {
        self.clock.frames()
    }

    pub fn camera(&self) -> &Camera3D {
        &self.camera
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn renderer(&self) -> &B::Renderer {
        &self.renderer
    }

    pub fn plants(&self) -> &B::Plants {
        &self.plants
    }

    pub fn controller(&self) -> &B::Controller {
        &self.controller
    }
}

fn releases_held_input(event: &WindowEvent) -> bool {
    match event {
        WindowEvent::MouseInput { state, .. } => *state == ElementState::Released,
        WindowEvent::KeyboardInput { event, .. } => event.state == ElementState::Released,
        WindowEvent::Focused(focused) => !focused,
        _ => false,
    }
}
