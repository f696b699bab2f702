mod egui_pass;
mod scene_pass;
mod window_surface;

use std::sync::Arc;

use anyhow::Result;
use egui_wgpu::{Renderer as EguiRenderer, RendererOptions};
use log::info;
use winit::dpi::PhysicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::Window;

use crate::app::subsystems::RenderSurface;
use crate::camera3d::Camera3D;
use crate::config::WindowConfig;
use crate::scene::Scene;
use crate::ui::UiOverlay;

use egui_pass::GpuTextures;
use scene_pass::ScenePass;
use window_surface::WindowSurface;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Draws the scene as lit, fogged boxes and paints the UI overlay on top.
pub struct Renderer {
    surface: WindowSurface,
    scene_pass: ScenePass,
    egui: EguiRenderer,
}

impl Renderer {
    pub fn open_window(event_loop: &ActiveEventLoop, window_cfg: &WindowConfig) -> Result<Arc<Window>> {
        WindowSurface::open_window(event_loop, window_cfg)
    }

    pub fn new(window: Arc<Window>, vsync: bool) -> Result<Self> {
        let surface = WindowSurface::create(window, vsync)?;
        let format = surface.surface_format();
        let scene_pass = ScenePass::new(surface.device(), format);
        let egui = EguiRenderer::new(surface.device(), format, RendererOptions::default());
        let size = surface.size();
        info!("[renderer] {}x{} surface, {format:?}", size.width, size.height);
        Ok(Self { surface, scene_pass, egui })
    }

    pub fn window(&self) -> &Arc<Window> {
        self.surface.window()
    }

    pub fn pixels_per_point(&self) -> f32 {
        self.surface.pixels_per_point()
    }
}

impl RenderSurface for Renderer {
    fn size(&self) -> PhysicalSize<u32> {
        self.surface.size()
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        self.surface.resize(size);
    }

    fn render(&mut self, scene: &Scene, camera: &Camera3D, overlay: Option<&UiOverlay>) -> Result<()> {
        if let Some(overlay) = overlay {
            let mut textures =
                GpuTextures { painter: &mut self.egui, device: self.surface.device(), queue: self.surface.queue() };
            egui_pass::upload_textures(&mut textures, &overlay.textures_delta);
        }
        let Some(frame) = self.surface.acquire_surface_frame()? else {
            // skipped frame: texture uploads still have to reach the gpu
            let (device, queue) = (self.surface.device(), self.surface.queue());
            queue.submit(std::iter::empty());
            if let Some(overlay) = overlay {
                let mut textures = GpuTextures { painter: &mut self.egui, device, queue };
                egui_pass::free_textures(&mut textures, &overlay.textures_delta);
            }
            return Ok(());
        };
        let device = self.surface.device();
        let queue = self.surface.queue();
        let mut encoder =
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("Frame Encoder") });
        self.scene_pass.draw(device, queue, &mut encoder, frame.view(), self.surface.depth_view(), scene, camera);

        let size = self.surface.size();
        let mut commands = match overlay {
            Some(overlay) => egui_pass::render(
                device,
                queue,
                &mut encoder,
                &mut self.egui,
                overlay,
                frame.view(),
                [size.width, size.height],
            ),
            None => Vec::new(),
        };
        commands.push(encoder.finish());
        queue.submit(commands);
        if let Some(overlay) = overlay {
            let mut textures = GpuTextures { painter: &mut self.egui, device, queue };
            egui_pass::free_textures(&mut textures, &overlay.textures_delta);
        }
        frame.present();
        Ok(())
    }

    fn request_redraw(&self) {
        self.surface.window().request_redraw();
    }
}
