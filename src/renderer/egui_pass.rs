use egui::epaint::ImageDelta;
use egui::{TextureId, TexturesDelta};
use egui_wgpu::{Renderer as EguiRenderer, ScreenDescriptor};

use crate::ui::UiOverlay;

/// Where egui texture deltas land. egui sends each delta once, so every delta must be
/// applied even on frames that never reach the screen.
pub trait TextureTarget {
    fn set_texture(&mut self, id: TextureId, delta: &ImageDelta);

    fn free_texture(&mut self, id: &TextureId);
}

pub struct GpuTextures<'a> {
    pub painter: &'a mut EguiRenderer,
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
}

impl TextureTarget for GpuTextures<'_> {
    fn set_texture(&mut self, id: TextureId, delta: &ImageDelta) {
        self.painter.update_texture(self.device, self.queue, id, delta);
    }

    fn free_texture(&mut self, id: &TextureId) {
        self.painter.free_texture(id);
    }
}

pub fn upload_textures(target: &mut impl TextureTarget, textures: &TexturesDelta) {
    for (id, delta) in &textures.set {
        target.set_texture(*id, delta);
    }
}

pub fn free_textures(target: &mut impl TextureTarget, textures: &TexturesDelta) {
    for id in &textures.free {
        target.free_texture(id);
    }
}

/// Uploads the overlay's geometry and paints it over `view`. Textures must already be
/// uploaded. Returns the command buffers egui needs submitted ahead of the main encoder.
pub fn render(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    encoder: &mut wgpu::CommandEncoder,
    painter: &mut EguiRenderer,
    overlay: &UiOverlay,
    view: &wgpu::TextureView,
    size_in_pixels: [u32; 2],
) -> Vec<wgpu::CommandBuffer> {
    let screen = ScreenDescriptor { size_in_pixels, pixels_per_point: overlay.pixels_per_point };
    let extra_cmd = painter.update_buffers(device, queue, encoder, &overlay.primitives, &screen);

    {
        let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Egui Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations { load: wgpu::LoadOp::Load, store: wgpu::StoreOp::Store },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        let mut pass = pass.forget_lifetime();
        painter.render(&mut pass, &overlay.primitives, &screen);
    }
    extra_cmd
}
