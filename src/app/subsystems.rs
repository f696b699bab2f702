//! Narrow contracts the orchestrator drives. Subsystems never see each other; the
//! orchestrator lends them the shared scene and camera for the length of one call.

use std::future::Future;

use anyhow::Result;
use glam::Vec3;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, WindowEvent};

use crate::camera3d::Camera3D;
use crate::events::SettingsPublisher;
use crate::placement::{PlantDescriptor, PlantPlacement};
use crate::scene::Scene;
use crate::ui::UiOverlay;

pub trait RenderSurface {
    fn size(&self) -> PhysicalSize<u32>;

    fn resize(&mut self, size: PhysicalSize<u32>);

    fn render(&mut self, scene: &Scene, camera: &Camera3D, overlay: Option<&UiOverlay>) -> Result<()>;

    /// Asks the host for one more frame at the next display refresh.
    fn request_redraw(&self) {}
}

pub trait EnvironmentSystem {
    /// Ordered plant positions for the placement phase.
    fn plant_layout(&self) -> Vec<PlantPlacement>;

    fn update(&mut self, scene: &mut Scene, elapsed: f32);
}

pub trait PlantSystem {
    /// Resolves once the plant's node and audio are ready for the next update.
    fn add_plant(&mut self, scene: &mut Scene, descriptor: PlantDescriptor) -> impl Future<Output = Result<()>>;

    fn update(&mut self, scene: &mut Scene, dt: f32, observer: Vec3);

    fn set_audio_volume(&mut self, volume: f32);
}

pub trait AudioSystem {
    fn update(&mut self);

    /// Master volume from the settings panel, applied on top of the configured level.
    fn set_master_volume(&mut self, _volume: f32) {}
}

pub trait CameraControl {
    fn update(&mut self, camera: &mut Camera3D, dt: f32);

    fn set_mouse_sensitivity(&mut self, sensitivity: f32);

    fn set_move_speed(&mut self, speed: f32);

    fn handle_window_event(&mut self, _event: &WindowEvent) {}

    fn handle_device_event(&mut self, _event: &DeviceEvent) {}
}

pub trait UiSystem {
    fn update(&mut self);

    /// Paint output of the last `update`, if any.
    fn take_overlay(&mut self) -> Option<UiOverlay> {
        None
    }

    /// Returns true when the UI consumed the event.
    fn handle_window_event(&mut self, _event: &WindowEvent) -> bool {
        false
    }
}

/// Constructs the subsystems. `Orchestrator::init` calls these in dependency order.
pub trait InstallationBuilder {
    type Renderer: RenderSurface;
    type Environment: EnvironmentSystem;
    type Plants: PlantSystem;
    type Audio: AudioSystem;
    type Controller: CameraControl;
    type Ui: UiSystem;

    fn create_renderer(&mut self) -> Result<Self::Renderer>;

    fn create_scene(&mut self) -> Result<Scene> {
        Ok(Scene::new())
    }

    fn create_camera(&mut self, surface: PhysicalSize<u32>) -> Result<Camera3D>;

    fn create_environment(
        &mut self,
        scene: &mut Scene,
        renderer: &mut Self::Renderer,
    ) -> Result<Self::Environment>;

    fn create_plants(&mut self, scene: &mut Scene) -> Result<Self::Plants>;

    fn create_audio(&mut self) -> Result<Self::Audio>;

    fn create_camera_controller(
        &mut self,
        camera: &Camera3D,
        renderer: &Self::Renderer,
    ) -> Result<Self::Controller>;

    fn create_ui(&mut self, renderer: &Self::Renderer, settings: SettingsPublisher) -> Result<Self::Ui>;

    /// Upper bound on a single frame delta, in seconds.
    fn max_frame_delta(&self) -> f32 {
        0.25
    }
}
