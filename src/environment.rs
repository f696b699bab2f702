use glam::{Quat, Vec3};
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::app::subsystems::EnvironmentSystem;
use crate::config::EnvironmentConfig;
use crate::placement::PlantPlacement;
use crate::scene::{Atmosphere, NodeKind, Scene, SceneNode, Transform};

const TERRAIN_THICKNESS: f32 = 0.2;
const FOG_BREATH: f32 = 0.18;
const GROUND_COLOR: Vec3 = Vec3::new(0.16, 0.19, 0.12);
const STONE_COLOR: Vec3 = Vec3::new(0.46, 0.45, 0.43);

/// Garden planted when the config supplies no layout of its own.
pub fn default_garden() -> Vec<PlantPlacement> {
    vec![
        PlantPlacement::new("Lavanda", Vec3::new(1.0, 0.0, 2.0), 1.0),
        PlantPlacement::new("Romero", Vec3::new(-3.0, 0.0, 4.0), 0.8),
        PlantPlacement::new("Ruda", Vec3::new(4.6, 0.0, -2.4), 0.7),
        PlantPlacement::new("Salvia", Vec3::new(-5.2, 0.0, -1.1), 0.9),
        PlantPlacement::new("Hierba Buena", Vec3::new(0.4, 0.0, -6.3), 0.6),
        PlantPlacement::new("Manzanilla", Vec3::new(7.8, 0.0, 5.5), 0.5),
        PlantPlacement::new("Cempasúchil", Vec3::new(-8.1, 0.0, 6.9), 1.1),
        PlantPlacement::new("Toronjil", Vec3::new(-1.9, 0.0, -11.2), 0.75),
    ]
}

/// Ground, headstones and a slowly drifting dusk atmosphere.
pub struct CemeteryEnvironment {
    config: EnvironmentConfig,
    layout: Vec<PlantPlacement>,
}

impl CemeteryEnvironment {
    pub fn new(config: EnvironmentConfig, scene: &mut Scene) -> Self {
        let layout = if config.plants.is_empty() { default_garden() } else { config.plants.clone() };
        let environment = Self { config, layout };
        environment.build(scene);
        environment
    }

    fn build(&self, scene: &mut Scene) {
        let extent = self.config.terrain_extent.max(1.0);
        scene.add_node(SceneNode::new(
            "terrain",
            NodeKind::Terrain,
            Transform::from_translation_scale(
                Vec3::new(0.0, -TERRAIN_THICKNESS * 0.5, 0.0),
                Vec3::new(extent, TERRAIN_THICKNESS, extent),
            ),
            GROUND_COLOR,
        ));

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let rows = self.config.headstone_rows;
        let cols = self.config.headstone_columns;
        let spacing = self.config.headstone_spacing;
        let origin_x = -(cols.saturating_sub(1) as f32) * spacing * 0.5;
        let origin_z = -(rows.saturating_sub(1) as f32) * spacing * 0.5;
        let mut placed = 0;
        for row in 0..rows {
            for col in 0..cols {
                let base = Vec3::new(origin_x + col as f32 * spacing, 0.0, origin_z + row as f32 * spacing);
                // keep a clear patch of ground around every plant
                if self.layout.iter().any(|p| flat_distance(p.position, base) < spacing * 0.45) {
                    continue;
                }
                let jitter = Vec3::new(rng.gen_range(-0.3..0.3), 0.0, rng.gen_range(-0.3..0.3));
                let height: f32 = rng.gen_range(0.7..1.3);
                let size = Vec3::new(rng.gen_range(0.55..0.8), height, rng.gen_range(0.12..0.2));
                let mut transform = Transform::from_translation_scale(base + jitter + Vec3::Y * height * 0.5, size);
                transform.rotation = Quat::from_rotation_y(rng.gen_range(-0.12..0.12))
                    * Quat::from_rotation_x(rng.gen_range(-0.06..0.06));
                let shade: f32 = rng.gen_range(0.8..1.1);
                scene.add_node(SceneNode::new(
                    format!("headstone-{row}-{col}"),
                    NodeKind::Headstone,
                    transform,
                    STONE_COLOR * shade,
                ));
                placed += 1;
            }
        }
        scene.atmosphere = atmosphere_at(&self.config, 0.0);
        info!("[environment] terrain {extent:.0}m, {placed} headstones, {} plant sites", self.layout.len());
    }
}

impl EnvironmentSystem for CemeteryEnvironment {
    fn plant_layout(&self) -> Vec<PlantPlacement> {
        self.layout.clone()
    }

    fn update(&mut self, scene: &mut Scene, elapsed: f32) {
        scene.atmosphere = atmosphere_at(&self.config, elapsed);
    }
}

fn flat_distance(a: Vec3, b: Vec3) -> f32 {
    let d = a - b;
    (d.x * d.x + d.z * d.z).sqrt()
}

/// Atmosphere at `elapsed` seconds: fog breathes in and out and the sky warms toward the
/// horizon color over one drift period.
pub fn atmosphere_at(config: &EnvironmentConfig, elapsed: f32) -> Atmosphere {
    let period = config.drift_period_seconds.max(1.0);
    let phase = (elapsed / period) * std::f32::consts::TAU;
    let breath = phase.sin();
    let warmth = 0.5 - 0.5 * phase.cos();
    let fog_far = (config.fog_far * (1.0 + FOG_BREATH * breath)).max(config.fog_near + 1.0);
    Atmosphere {
        sky: config.sky_color.lerp(config.horizon_color, warmth * 0.35),
        horizon: config.horizon_color,
        fog_color: config.fog_color.lerp(config.horizon_color, warmth * 0.2),
        fog_near: config.fog_near,
        fog_far,
    }
}
