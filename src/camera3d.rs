use glam::{Mat4, Vec3};
use winit::dpi::PhysicalSize;

const DEFAULT_UP: Vec3 = Vec3::Y;

/// Perspective camera with a cached projection matrix.
#[derive(Debug, Clone)]
pub struct Camera3D {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_radians: f32,
    pub near: f32,
    pub far: f32,
    aspect: f32,
    projection: Mat4,
}

impl Camera3D {
    pub fn new(position: Vec3, target: Vec3, fov_y_radians: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            position,
            target,
            up: DEFAULT_UP,
            fov_y_radians,
            near,
            far,
            aspect: 1.0,
            projection: Mat4::IDENTITY,
        };
        camera.update_projection_matrix();
        camera
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Sets the aspect ratio from a viewport. A zero-height viewport keeps the previous ratio.
    pub fn set_viewport(&mut self, viewport: PhysicalSize<u32>) {
        if viewport.height > 0 && viewport.width > 0 {
            self.aspect = viewport.width as f32 / viewport.height as f32;
        }
    }

    pub fn update_projection_matrix(&mut self) {
        self.projection = Mat4::perspective_rh(self.fov_y_radians, self.aspect.max(0.0001), self.near, self.far);
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view_matrix()
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or_zero()
    }
}
