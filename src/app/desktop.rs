use std::rc::Rc;
use std::sync::Arc;

use anyhow::Result;
use log::{info, warn};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::subsystems::InstallationBuilder;
use crate::audio::{AudioDevice, AudioPoetrySystem};
use crate::camera3d::Camera3D;
use crate::camera_controller::FirstPersonController;
use crate::config::AppConfig;
use crate::environment::CemeteryEnvironment;
use crate::events::SettingsPublisher;
use crate::input::Input;
use crate::plants::PlantSceneManager;
use crate::renderer::Renderer;
use crate::scene::Scene;
use crate::ui::{SettingsPanel, SliderValues};

/// Builds the real installation: a winit window with wgpu, rodio audio and an egui panel.
pub struct DesktopBuilder {
    window: Arc<Window>,
    config: AppConfig,
    audio_device: Option<Option<Rc<AudioDevice>>>,
}

impl DesktopBuilder {
    /// `window` is opened by the host; winit only hands out windows inside its event loop.
    pub fn new(window: Arc<Window>, config: AppConfig) -> Self {
        Self { window, config, audio_device: None }
    }

    /// The output stream is opened once and shared; without a device everything plays silent.
    fn audio_device(&mut self) -> Option<Rc<AudioDevice>> {
        self.audio_device
            .get_or_insert_with(|| match AudioDevice::open() {
                Ok(device) => Some(Rc::new(device)),
                Err(err) => {
                    warn!("[audio] running silent: {err:#}");
                    None
                }
            })
            .clone()
    }
}

impl InstallationBuilder for DesktopBuilder {
    type Renderer = Renderer;
    type Environment = CemeteryEnvironment;
    type Plants = PlantSceneManager;
    type Audio = AudioPoetrySystem;
    type Controller = FirstPersonController;
    type Ui = SettingsPanel;

    fn create_renderer(&mut self) -> Result<Renderer> {
        Renderer::new(self.window.clone(), self.config.window.vsync)
    }

    fn create_camera(&mut self, _surface: PhysicalSize<u32>) -> Result<Camera3D> {
        let cfg = &self.config.camera;
        Ok(Camera3D::new(cfg.start_position, cfg.look_at, cfg.fov_degrees.to_radians(), cfg.near, cfg.far))
    }

    fn create_environment(&mut self, scene: &mut Scene, _renderer: &mut Renderer) -> Result<CemeteryEnvironment> {
        Ok(CemeteryEnvironment::new(self.config.environment.clone(), scene))
    }

    fn create_plants(&mut self, _scene: &mut Scene) -> Result<PlantSceneManager> {
        let device = self.audio_device();
        Ok(PlantSceneManager::new(self.config.plants.clone(), device))
    }

    fn create_audio(&mut self) -> Result<AudioPoetrySystem> {
        let device = self.audio_device();
        Ok(AudioPoetrySystem::new(&self.config.audio, device))
    }

    fn create_camera_controller(&mut self, camera: &Camera3D, _renderer: &Renderer) -> Result<FirstPersonController> {
        let input = match self.config.input_bindings.as_ref() {
            Some(path) => {
                info!("[input] bindings from {}", path.display());
                Input::from_config(path)
            }
            None => Input::new(),
        };
        Ok(FirstPersonController::new(camera, input, &self.config.camera))
    }

    fn create_ui(&mut self, renderer: &Renderer, settings: SettingsPublisher) -> Result<SettingsPanel> {
        Ok(SettingsPanel::new(
            renderer.window().clone(),
            renderer.pixels_per_point(),
            SliderValues::from_config(&self.config),
            settings,
        ))
    }

    fn max_frame_delta(&self) -> f32 {
        self.config.frame.max_delta_seconds
    }
}
