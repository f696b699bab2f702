use std::sync::Arc;

use log::debug;
use winit::event::WindowEvent;
use winit::window::Window;

use crate::app::subsystems::UiSystem;
use crate::config::AppConfig;
use crate::events::{SettingsEvent, SettingsKind, SettingsPublisher};

pub const MOUSE_SENSITIVITY_RANGE: std::ops::RangeInclusive<f32> = 0.0005..=0.01;
pub const MOVE_SPEED_RANGE: std::ops::RangeInclusive<f32> = 0.5..=15.0;
pub const VOLUME_RANGE: std::ops::RangeInclusive<f32> = 0.0..=1.0;

/// Tessellated egui output for one frame, ready for the renderer.
pub struct UiOverlay {
    pub primitives: Vec<egui::ClippedPrimitive>,
    pub textures_delta: egui::TexturesDelta,
    pub pixels_per_point: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliderValues {
    pub mouse_sensitivity: f32,
    pub move_speed: f32,
    pub volume: f32,
}

impl SliderValues {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            mouse_sensitivity: config.camera.mouse_sensitivity,
            move_speed: config.camera.move_speed,
            volume: config.plants.volume,
        }
    }

    pub fn get(&self, kind: SettingsKind) -> f32 {
        match kind {
            SettingsKind::MouseSensitivity => self.mouse_sensitivity,
            SettingsKind::MoveSpeed => self.move_speed,
            SettingsKind::AudioVolume => self.volume,
        }
    }

    /// One event per slider that moved since `before`, in panel order.
    pub fn changes_since(&self, before: &SliderValues) -> Vec<SettingsEvent> {
        SettingsKind::ALL
            .iter()
            .filter(|kind| self.get(**kind) != before.get(**kind))
            .map(|kind| SettingsEvent::new(*kind, self.get(*kind)))
            .collect()
    }
}

/// Settings window drawn over the garden. Slider changes go out on the settings channel;
/// the panel never touches the subsystems it configures.
pub struct SettingsPanel {
    ctx: egui::Context,
    state: egui_winit::State,
    window: Arc<Window>,
    values: SliderValues,
    publisher: SettingsPublisher,
    overlay: Option<UiOverlay>,
}

impl SettingsPanel {
    pub fn new(window: Arc<Window>, pixels_per_point: f32, values: SliderValues, publisher: SettingsPublisher) -> Self {
        let ctx = egui::Context::default();
        let state = egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            window.as_ref(),
            Some(pixels_per_point),
            window.theme(),
            None,
        );
        Self { ctx, state, window, values, publisher, overlay: None }
    }

    pub fn values(&self) -> SliderValues {
        self.values
    }
}

impl UiSystem for SettingsPanel {
    fn update(&mut self) {
        let raw_input = self.state.take_egui_input(&self.window);
        let before = self.values;
        let mut values = self.values;
        let full_output = self.ctx.run(raw_input, |ctx| {
            egui::Window::new("Settings").default_pos([16.0, 16.0]).resizable(false).show(ctx, |ui| {
                ui.add(
                    egui::Slider::new(&mut values.mouse_sensitivity, MOUSE_SENSITIVITY_RANGE)
                        .logarithmic(true)
                        .text(SettingsKind::MouseSensitivity.label()),
                );
                ui.add(egui::Slider::new(&mut values.move_speed, MOVE_SPEED_RANGE).text(SettingsKind::MoveSpeed.label()));
                ui.add(egui::Slider::new(&mut values.volume, VOLUME_RANGE).text(SettingsKind::AudioVolume.label()));
                ui.separator();
                ui.label("Hold the right mouse button to look around.");
                ui.label("WASD to walk, Shift to hurry, Esc to leave.");
            });
        });
        self.values = values;
        for event in values.changes_since(&before) {
            debug!("[ui] {event}");
            self.publisher.publish(event);
        }

        self.state.handle_platform_output(&self.window, full_output.platform_output);
        let pixels_per_point = full_output.pixels_per_point;
        let primitives = self.ctx.tessellate(full_output.shapes, pixels_per_point);
        self.overlay = Some(UiOverlay { primitives, textures_delta: full_output.textures_delta, pixels_per_point });
    }

    fn take_overlay(&mut self) -> Option<UiOverlay> {
        self.overlay.take()
    }

    fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        self.state.on_window_event(&self.window, event).consumed
    }
}
