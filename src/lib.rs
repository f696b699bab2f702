pub mod app;
pub mod audio;
pub mod camera3d;
pub mod camera_controller;
pub mod cli;
pub mod config;
pub mod environment;
pub mod events;
pub mod input;
pub mod placement;
pub mod plants;
pub mod renderer;
pub mod scene;
pub mod time;
pub mod ui;

pub use app::{run, run_with_overrides, Orchestrator};

pub(crate) fn wrap_angle(mut radians: f32) -> f32 {
    let two_pi = 2.0 * std::f32::consts::PI;
    while radians > std::f32::consts::PI {
        radians -= two_pi;
    }
    while radians < -std::f32::consts::PI {
        radians += two_pi;
    }
    radians
}
