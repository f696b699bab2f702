use glam::{EulerRot, Quat, Vec3};
use winit::event::{DeviceEvent, WindowEvent};

use crate::app::subsystems::CameraControl;
use crate::camera3d::Camera3D;
use crate::config::CameraConfig;
use crate::input::{Input, InputEvent};
use crate::wrap_angle;

const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

/// Walking camera: right-drag to look, WASD to move, Shift to hurry.
pub struct FirstPersonController {
    input: Input,
    yaw: f32,
    pitch: f32,
    mouse_sensitivity: f32,
    move_speed: f32,
    boost_multiplier: f32,
    eye_height: f32,
}

impl FirstPersonController {
    pub fn new(camera: &Camera3D, input: Input, config: &CameraConfig) -> Self {
        let forward = camera.forward();
        let yaw = (-forward.x).atan2(-forward.z);
        let pitch = forward.y.clamp(-1.0, 1.0).asin().clamp(-PITCH_LIMIT, PITCH_LIMIT);
        Self {
            input,
            yaw,
            pitch,
            mouse_sensitivity: config.mouse_sensitivity,
            move_speed: config.move_speed,
            boost_multiplier: config.boost_multiplier.max(1.0),
            eye_height: config.eye_height,
        }
    }

    pub fn mouse_sensitivity(&self) -> f32 {
        self.mouse_sensitivity
    }

    pub fn move_speed(&self) -> f32 {
        self.move_speed
    }

    pub fn input_mut(&mut self) -> &mut Input {
        &mut self.input
    }

    fn orientation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0)
    }

    fn look_direction(&self) -> Vec3 {
        self.orientation() * Vec3::NEG_Z
    }
}

impl CameraControl for FirstPersonController {
    fn update(&mut self, camera: &mut Camera3D, dt: f32) {
        let (dx, dy) = self.input.take_mouse_delta();
        self.yaw = wrap_angle(self.yaw - dx * self.mouse_sensitivity);
        self.pitch = (self.pitch - dy * self.mouse_sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);

        // Walking stays on the ground plane regardless of pitch.
        let flat_forward = Quat::from_rotation_y(self.yaw) * Vec3::NEG_Z;
        let flat_right = Quat::from_rotation_y(self.yaw) * Vec3::X;
        let (strafe, lift, advance) = self.input.walk_axes();
        let wish = flat_forward * advance + flat_right * strafe + Vec3::Y * lift;
        if wish.length_squared() > 0.0 {
            let speed = if self.input.boost_held() { self.move_speed * self.boost_multiplier } else { self.move_speed };
            camera.position += wish.normalize() * speed * dt;
        }
        camera.position.y = camera.position.y.max(self.eye_height);
        camera.target = camera.position + self.look_direction();
        camera.up = Vec3::Y;
    }

    fn set_mouse_sensitivity(&mut self, sensitivity: f32) {
        self.mouse_sensitivity = sensitivity;
    }

    fn set_move_speed(&mut self, speed: f32) {
        self.move_speed = speed;
    }

    fn handle_window_event(&mut self, event: &WindowEvent) {
        self.input.push(InputEvent::from_window_event(event));
    }

    fn handle_device_event(&mut self, event: &DeviceEvent) {
        self.input.push(InputEvent::from_device_event(event));
    }
}
