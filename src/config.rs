use crate::placement::PlantPlacement;
use anyhow::{Context, Result};
use glam::Vec3;
use log::warn;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/app.json";

#[derive(Debug, Clone, Deserialize)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
    pub fullscreen: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FrameConfig {
    #[serde(default = "FrameConfig::default_max_delta_seconds")]
    pub max_delta_seconds: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "CameraConfig::default_fov_degrees")]
    pub fov_degrees: f32,
    #[serde(default = "CameraConfig::default_near")]
    pub near: f32,
    #[serde(default = "CameraConfig::default_far")]
    pub far: f32,
    #[serde(default = "CameraConfig::default_start_position")]
    pub start_position: Vec3,
    #[serde(default = "CameraConfig::default_look_at")]
    pub look_at: Vec3,
    #[serde(default = "CameraConfig::default_eye_height")]
    pub eye_height: f32,
    #[serde(default = "CameraConfig::default_mouse_sensitivity")]
    pub mouse_sensitivity: f32,
    #[serde(default = "CameraConfig::default_move_speed")]
    pub move_speed: f32,
    #[serde(default = "CameraConfig::default_boost_multiplier")]
    pub boost_multiplier: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentConfig {
    #[serde(default = "EnvironmentConfig::default_sky_color")]
    pub sky_color: Vec3,
    #[serde(default = "EnvironmentConfig::default_horizon_color")]
    pub horizon_color: Vec3,
    #[serde(default = "EnvironmentConfig::default_fog_color")]
    pub fog_color: Vec3,
    #[serde(default = "EnvironmentConfig::default_fog_near")]
    pub fog_near: f32,
    #[serde(default = "EnvironmentConfig::default_fog_far")]
    pub fog_far: f32,
    #[serde(default = "EnvironmentConfig::default_drift_period_seconds")]
    pub drift_period_seconds: f32,
    #[serde(default = "EnvironmentConfig::default_terrain_extent")]
    pub terrain_extent: f32,
    #[serde(default = "EnvironmentConfig::default_headstone_rows")]
    pub headstone_rows: u32,
    #[serde(default = "EnvironmentConfig::default_headstone_columns")]
    pub headstone_columns: u32,
    #[serde(default = "EnvironmentConfig::default_headstone_spacing")]
    pub headstone_spacing: f32,
    #[serde(default = "EnvironmentConfig::default_seed")]
    pub seed: u64,
    /// Plant layout in placement order. Empty means the built-in garden.
    #[serde(default)]
    pub plants: Vec<PlantPlacement>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlantsConfig {
    #[serde(default = "PlantsConfig::default_audio_dir")]
    pub audio_dir: PathBuf,
    #[serde(default = "PlantsConfig::default_bloom_inner_radius")]
    pub bloom_inner_radius: f32,
    #[serde(default = "PlantsConfig::default_bloom_outer_radius")]
    pub bloom_outer_radius: f32,
    #[serde(default = "PlantsConfig::default_reference_distance")]
    pub reference_distance: f32,
    #[serde(default = "PlantsConfig::default_max_distance")]
    pub max_distance: f32,
    #[serde(default = "PlantsConfig::default_volume")]
    pub volume: f32,
    #[serde(default)]
    pub require_audio: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoemVerse {
    pub title: String,
    pub file: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "AudioConfig::default_poem_dir")]
    pub poem_dir: PathBuf,
    #[serde(default)]
    pub verses: Vec<PoemVerse>,
    #[serde(default = "AudioConfig::default_verse_gap_seconds")]
    pub verse_gap_seconds: f32,
    #[serde(default = "AudioConfig::default_volume")]
    pub volume: f32,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub frame: FrameConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub environment: EnvironmentConfig,
    #[serde(default)]
    pub plants: PlantsConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub input_bindings: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct AppConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub vsync: Option<bool>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { title: "Camposanto".to_string(), width: 1280, height: 720, vsync: true, fullscreen: false }
    }
}

impl FrameConfig {
    const fn default_max_delta_seconds() -> f32 {
        0.25
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self { max_delta_seconds: Self::default_max_delta_seconds() }
    }
}

impl CameraConfig {
    const fn default_fov_degrees() -> f32 {
        70.0
    }

    const fn default_near() -> f32 {
        0.05
    }

    const fn default_far() -> f32 {
        400.0
    }

    fn default_start_position() -> Vec3 {
        Vec3::new(0.0, 1.7, 14.0)
    }

    fn default_look_at() -> Vec3 {
        Vec3::new(0.0, 1.2, 0.0)
    }

    const fn default_eye_height() -> f32 {
        1.7
    }

    const fn default_mouse_sensitivity() -> f32 {
        0.0025
    }

    const fn default_move_speed() -> f32 {
        3.0
    }

    const fn default_boost_multiplier() -> f32 {
        2.5
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: Self::default_fov_degrees(),
            near: Self::default_near(),
            far: Self::default_far(),
            start_position: Self::default_start_position(),
            look_at: Self::default_look_at(),
            eye_height: Self::default_eye_height(),
            mouse_sensitivity: Self::default_mouse_sensitivity(),
            move_speed: Self::default_move_speed(),
            boost_multiplier: Self::default_boost_multiplier(),
        }
    }
}

impl EnvironmentConfig {
    fn default_sky_color() -> Vec3 {
        Vec3::new(0.09, 0.10, 0.16)
    }

    fn default_horizon_color() -> Vec3 {
        Vec3::new(0.32, 0.27, 0.30)
    }

    fn default_fog_color() -> Vec3 {
        Vec3::new(0.20, 0.20, 0.24)
    }

    const fn default_fog_near() -> f32 {
        8.0
    }

    const fn default_fog_far() -> f32 {
        60.0
    }

    const fn default_drift_period_seconds() -> f32 {
        180.0
    }

    const fn default_terrain_extent() -> f32 {
        120.0
    }

    const fn default_headstone_rows() -> u32 {
        6
    }

    const fn default_headstone_columns() -> u32 {
        9
    }

    const fn default_headstone_spacing() -> f32 {
        3.2
    }

    const fn default_seed() -> u64 {
        0x5EED_CA11
    }
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            sky_color: Self::default_sky_color(),
            horizon_color: Self::default_horizon_color(),
            fog_color: Self::default_fog_color(),
            fog_near: Self::default_fog_near(),
            fog_far: Self::default_fog_far(),
            drift_period_seconds: Self::default_drift_period_seconds(),
            terrain_extent: Self::default_terrain_extent(),
            headstone_rows: Self::default_headstone_rows(),
            headstone_columns: Self::default_headstone_columns(),
            headstone_spacing: Self::default_headstone_spacing(),
            seed: Self::default_seed(),
            plants: Vec::new(),
        }
    }
}

impl PlantsConfig {
    fn default_audio_dir() -> PathBuf {
        PathBuf::from("assets/audio/plants")
    }

    const fn default_bloom_inner_radius() -> f32 {
        1.5
    }

    const fn default_bloom_outer_radius() -> f32 {
        7.0
    }

    const fn default_reference_distance() -> f32 {
        1.0
    }

    const fn default_max_distance() -> f32 {
        18.0
    }

    const fn default_volume() -> f32 {
        0.8
    }
}

impl Default for PlantsConfig {
    fn default() -> Self {
        Self {
            audio_dir: Self::default_audio_dir(),
            bloom_inner_radius: Self::default_bloom_inner_radius(),
            bloom_outer_radius: Self::default_bloom_outer_radius(),
            reference_distance: Self::default_reference_distance(),
            max_distance: Self::default_max_distance(),
            volume: Self::default_volume(),
            require_audio: false,
        }
    }
}

impl AudioConfig {
    fn default_poem_dir() -> PathBuf {
        PathBuf::from("assets/audio/poems")
    }

    const fn default_verse_gap_seconds() -> f32 {
        12.0
    }

    const fn default_volume() -> f32 {
        0.6
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            poem_dir: Self::default_poem_dir(),
            verses: Vec::new(),
            verse_gap_seconds: Self::default_verse_gap_seconds(),
            volume: Self::default_volume(),
        }
    }
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                warn!("Config load error: {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &AppConfigOverrides) {
        if let Some(width) = overrides.width {
            self.window.width = width;
        }
        if let Some(height) = overrides.height {
            self.window.height = height;
        }
        if let Some(vsync) = overrides.vsync {
            self.window.vsync = vsync;
        }
    }
}

impl AppConfigOverrides {
    pub fn config_path(&self) -> &Path {
        self.config_path.as_deref().unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH))
    }

    pub fn is_empty(&self) -> bool {
        self.width.is_none() && self.height.is_none() && self.vsync.is_none()
    }

    pub fn applied_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.width.is_some() {
            fields.push("width");
        }
        if self.height.is_some() {
            fields.push("height");
        }
        if self.vsync.is_some() {
            fields.push("vsync");
        }
        fields
    }
}
