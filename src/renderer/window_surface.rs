use crate::config::WindowConfig;
use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use std::sync::Arc;
use winit::dpi::PhysicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Fullscreen, Window};

use super::DEPTH_FORMAT;

pub struct SurfaceFrame {
    view: wgpu::TextureView,
    surface: wgpu::SurfaceTexture,
}

impl SurfaceFrame {
    fn new(surface: wgpu::SurfaceTexture) -> Self {
        let view = surface.texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { view, surface }
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn present(self) {
        self.surface.present();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SurfaceErrorAction {
    Reconfigure,
    SkipFrame,
    Fatal,
}

/// GPU state bound to one window.
pub struct WindowSurface {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    depth_view: wgpu::TextureView,
}

impl WindowSurface {
    pub fn open_window(event_loop: &ActiveEventLoop, window_cfg: &WindowConfig) -> Result<Arc<Window>> {
        let size = PhysicalSize::new(window_cfg.width.max(1), window_cfg.height.max(1));
        let mut attrs = Window::default_attributes().with_title(window_cfg.title.clone()).with_inner_size(size);
        if window_cfg.fullscreen {
            attrs = attrs.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }
        Ok(Arc::new(event_loop.create_window(attrs).context("Failed to create window")?))
    }

    pub fn create(window: Arc<Window>, vsync: bool) -> Result<Self> {
        pollster::block_on(Self::init_wgpu(window, vsync))
    }

    async fn init_wgpu(window: Arc<Window>, vsync: bool) -> Result<Self> {
        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(window.clone()).context("Failed to create WGPU surface")?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("Failed to request WGPU adapter")?;
        let info = adapter.get_info();
        info!("[renderer] adapter '{}' ({:?})", info.name, info.backend);
        let required_limits = wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits());
        let device_desc = wgpu::DeviceDescriptor {
            label: Some("Device"),
            required_features: wgpu::Features::empty(),
            required_limits,
            experimental_features: wgpu::ExperimentalFeatures::default(),
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::default(),
        };
        let (device, queue) =
            adapter.request_device(&device_desc).await.context("Failed to request WGPU device")?;

        let caps = surface.get_capabilities(&adapter);
        let format = choose_surface_format(&caps.formats).context("Surface reports no formats")?;
        let alpha_mode = caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let size = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: select_present_mode(vsync, &caps.present_modes),
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        let depth_view = create_depth_view(&device, size);

        Ok(Self { window, surface, device, queue, config, size, depth_view })
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth_view
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn pixels_per_point(&self) -> f32 {
        self.window.scale_factor() as f32
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.size = new_size;
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.depth_view = create_depth_view(&self.device, new_size);
    }

    /// Next swapchain image, or `None` when this frame should be skipped.
    pub fn acquire_surface_frame(&mut self) -> Result<Option<SurfaceFrame>> {
        if self.size.width == 0 || self.size.height == 0 {
            return Ok(None);
        }
        match self.surface.get_current_texture() {
            Ok(frame) => Ok(Some(SurfaceFrame::new(frame))),
            Err(err) => match surface_error_action(&err) {
                SurfaceErrorAction::Reconfigure => {
                    warn!("[renderer] surface lost or outdated, reconfiguring");
                    self.resize(self.size);
                    Ok(None)
                }
                SurfaceErrorAction::SkipFrame => Ok(None),
                SurfaceErrorAction::Fatal => Err(anyhow!("Surface acquisition failed: {err}")),
            },
        }
    }
}

fn surface_error_action(error: &wgpu::SurfaceError) -> SurfaceErrorAction {
    match error {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => SurfaceErrorAction::Reconfigure,
        wgpu::SurfaceError::Timeout => SurfaceErrorAction::SkipFrame,
        wgpu::SurfaceError::OutOfMemory | wgpu::SurfaceError::Other => SurfaceErrorAction::Fatal,
    }
}

fn select_present_mode(vsync: bool, modes: &[wgpu::PresentMode]) -> wgpu::PresentMode {
    if vsync {
        wgpu::PresentMode::Fifo
    } else {
        modes.iter().copied().find(|mode| *mode != wgpu::PresentMode::Fifo).unwrap_or(wgpu::PresentMode::Fifo)
    }
}

fn choose_surface_format(formats: &[wgpu::TextureFormat]) -> Option<wgpu::TextureFormat> {
    formats.iter().copied().find(|f| f.is_srgb()).or_else(|| formats.first().copied())
}

fn create_depth_view(device: &wgpu::Device, size: PhysicalSize<u32>) -> wgpu::TextureView {
    let extent =
        wgpu::Extent3d { width: size.width.max(1), height: size.height.max(1), depth_or_array_layers: 1 };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: extent,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn present_mode_respects_vsync_flag() {
        let modes = vec![wgpu::PresentMode::Immediate, wgpu::PresentMode::Fifo];
        assert_eq!(select_present_mode(false, &modes), wgpu::PresentMode::Immediate);
        assert_eq!(select_present_mode(true, &modes), wgpu::PresentMode::Fifo);
        assert_eq!(select_present_mode(false, &[wgpu::PresentMode::Fifo]), wgpu::PresentMode::Fifo);
    }

    #[test]
    fn surface_error_action_matches_variants() {
        assert_eq!(surface_error_action(&wgpu::SurfaceError::Lost), SurfaceErrorAction::Reconfigure);
        assert_eq!(surface_error_action(&wgpu::SurfaceError::Outdated), SurfaceErrorAction::Reconfigure);
        assert_eq!(surface_error_action(&wgpu::SurfaceError::Timeout), SurfaceErrorAction::SkipFrame);
        assert_eq!(surface_error_action(&wgpu::SurfaceError::OutOfMemory), SurfaceErrorAction::Fatal);
        assert_eq!(surface_error_action(&wgpu::SurfaceError::Other), SurfaceErrorAction::Fatal);
    }

    #[test]
    fn prefers_srgb_surface_formats() {
        let formats = [wgpu::TextureFormat::Bgra8Unorm, wgpu::TextureFormat::Bgra8UnormSrgb];
        assert_eq!(choose_surface_format(&formats), Some(wgpu::TextureFormat::Bgra8UnormSrgb));
        assert_eq!(choose_surface_format(&formats[..1]), Some(wgpu::TextureFormat::Bgra8Unorm));
        assert_eq!(choose_surface_format(&[]), None);
    }
}
