use glam::Vec3;
use wgpu::util::DeviceExt;

use super::DEPTH_FORMAT;
use crate::camera3d::Camera3D;
use crate::scene::{Atmosphere, Scene};

const LIGHT_DIR: Vec3 = Vec3::new(-0.35, -0.8, -0.45);

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub(super) struct SceneGlobals {
    pub view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    pub light_dir: [f32; 4],
    pub fog_color: [f32; 4],
    pub fog_params: [f32; 4],
}

impl SceneGlobals {
    pub fn new(camera: &Camera3D, atmosphere: &Atmosphere) -> Self {
        Self {
            view_proj: camera.view_projection().to_cols_array_2d(),
            camera_pos: camera.position.extend(1.0).to_array(),
            light_dir: LIGHT_DIR.normalize().extend(0.0).to_array(),
            fog_color: atmosphere.fog_color.extend(1.0).to_array(),
            fog_params: [atmosphere.fog_near, atmosphere.fog_far, 0.0, 0.0],
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub(super) struct SceneInstance {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
}

/// One unit-box instance per visible node.
pub(super) fn collect_instances(scene: &Scene) -> Vec<SceneInstance> {
    scene
        .nodes()
        .iter()
        .filter(|node| node.visible)
        .map(|node| SceneInstance {
            model: node.transform.matrix().to_cols_array_2d(),
            color: node.color.extend(node.glow).to_array(),
        })
        .collect()
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
}

fn unit_box() -> (Vec<Vertex>, Vec<u16>) {
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
        ([-1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]),
        ([0.0, -1.0, 0.0], [0.0, 0.0, -1.0], [1.0, 0.0, 0.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, u, v) in faces {
        let (n, u, v) = (Vec3::from(normal), Vec3::from(u), Vec3::from(v));
        let base = vertices.len() as u16;
        for (su, sv) in [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)] {
            let p = n * 0.5 + u * su + v * sv;
            vertices.push(Vertex { position: p.to_array(), normal });
        }
        // wind counter-clockwise seen from outside
        if u.cross(v).dot(n) > 0.0 {
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        } else {
            indices.extend_from_slice(&[base, base + 2, base + 1, base, base + 3, base + 2]);
        }
    }
    (vertices, indices)
}

pub(super) struct ScenePass {
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    globals_buf: wgpu::Buffer,
    globals_bg: wgpu::BindGroup,
    instance_buffer: Option<wgpu::Buffer>,
    instance_capacity: usize,
}

impl ScenePass {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../assets/shaders/scene.wgsl").into()),
        });

        let globals_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Scene Globals BGL"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let globals_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene Globals Buffer"),
            size: std::mem::size_of::<SceneGlobals>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let globals_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Globals BG"),
            layout: &globals_bgl,
            entries: &[wgpu::BindGroupEntry { binding: 0, resource: globals_buf.as_entire_binding() }],
        });

        let (vertices, indices) = unit_box();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Unit Box VB"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Unit Box IB"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&globals_bgl],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Scene Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<Vertex>() as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &[
                            wgpu::VertexAttribute { shader_location: 0, format: wgpu::VertexFormat::Float32x3, offset: 0 },
                            wgpu::VertexAttribute { shader_location: 1, format: wgpu::VertexFormat::Float32x3, offset: 12 },
                        ],
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<SceneInstance>() as u64,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &[
                            wgpu::VertexAttribute { shader_location: 2, format: wgpu::VertexFormat::Float32x4, offset: 0 },
                            wgpu::VertexAttribute { shader_location: 3, format: wgpu::VertexFormat::Float32x4, offset: 16 },
                            wgpu::VertexAttribute { shader_location: 4, format: wgpu::VertexFormat::Float32x4, offset: 32 },
                            wgpu::VertexAttribute { shader_location: 5, format: wgpu::VertexFormat::Float32x4, offset: 48 },
                            wgpu::VertexAttribute { shader_location: 6, format: wgpu::VertexFormat::Float32x4, offset: 64 },
                        ],
                    },
                ],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            globals_buf,
            globals_bg,
            instance_buffer: None,
            instance_capacity: 0,
        }
    }

    fn ensure_instance_capacity(&mut self, device: &wgpu::Device, count: usize) {
        if self.instance_capacity >= count && self.instance_buffer.is_some() {
            return;
        }
        let mut new_cap = self.instance_capacity.max(64);
        while new_cap < count {
            new_cap *= 2;
        }
        self.instance_buffer = Some(device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene Instance Buffer"),
            size: (new_cap * std::mem::size_of::<SceneInstance>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.instance_capacity = new_cap;
    }

    #[allow(clippy::too_many_arguments)]
    pub fn draw(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        depth: &wgpu::TextureView,
        scene: &Scene,
        camera: &Camera3D,
    ) {
        let instances = collect_instances(scene);
        self.ensure_instance_capacity(device, instances.len());
        queue.write_buffer(&self.globals_buf, 0, bytemuck::bytes_of(&SceneGlobals::new(camera, &scene.atmosphere)));
        let Some(instance_buffer) = self.instance_buffer.as_ref() else {
            return;
        };
        if !instances.is_empty() {
            queue.write_buffer(instance_buffer, 0, bytemuck::cast_slice(&instances));
        }

        let sky = scene.atmosphere.sky;
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color { r: sky.x as f64, g: sky.y as f64, b: sky.z as f64, a: 1.0 }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth,
                depth_ops: Some(wgpu::Operations { load: wgpu::LoadOp::Clear(1.0), store: wgpu::StoreOp::Store }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        if instances.is_empty() {
            return;
        }
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.globals_bg, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_vertex_buffer(1, instance_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        pass.draw_indexed(0..self.index_count, 0, 0..instances.len() as u32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{NodeKind, SceneNode, Transform};

    #[test]
    fn hidden_nodes_are_not_drawn() {
        let mut scene = Scene::new();
        scene.add_node(SceneNode::new("terrain", NodeKind::Terrain, Transform::default(), Vec3::ONE));
        let stone = scene.add_node(SceneNode::new("stone", NodeKind::Headstone, Transform::default(), Vec3::ONE));
        let mut plant = SceneNode::new("Ruda", NodeKind::Plant, Transform::default(), Vec3::new(0.2, 0.4, 0.2));
        plant.glow = 0.5;
        scene.add_node(plant);
        if let Some(node) = scene.node_mut(stone) {
            node.visible = false;
        }
        let instances = collect_instances(&scene);
        assert_eq!(instances.len(), 2);
        assert_eq!(instances[1].color, [0.2, 0.4, 0.2, 0.5]);
    }

    #[test]
    fn unit_box_faces_point_outward() {
        let (vertices, indices) = unit_box();
        assert_eq!((vertices.len(), indices.len()), (24, 36));
        for tri in indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| Vec3::from(vertices[i as usize].position));
            let normal = Vec3::from(vertices[tri[0] as usize].normal);
            assert!((b - a).cross(c - a).dot(normal) > 0.0);
        }
    }

    #[test]
    fn globals_carry_fog_and_camera() {
        let camera = Camera3D::new(Vec3::new(0.0, 1.7, 5.0), Vec3::ZERO, 1.2, 0.1, 100.0);
        let atmosphere = Atmosphere::default();
        let globals = SceneGlobals::new(&camera, &atmosphere);
        assert_eq!(globals.camera_pos, [0.0, 1.7, 5.0, 1.0]);
        assert_eq!(globals.fog_params[..2], [atmosphere.fog_near, atmosphere.fog_far]);
    }
}
