use std::f32::consts::TAU;
use std::rc::Rc;

use anyhow::{bail, Result};
use glam::{Quat, Vec3};
use log::{debug, warn};
use rodio::SpatialSink;

use crate::app::subsystems::PlantSystem;
use crate::audio::{open_looped, AudioDevice};
use crate::config::PlantsConfig;
use crate::placement::PlantDescriptor;
use crate::scene::{NodeId, NodeKind, Scene, SceneNode, Transform};

const PLANT_HEIGHT: f32 = 0.9;
const PLANT_WIDTH: f32 = 0.5;
const LEAF_COLOR: Vec3 = Vec3::new(0.18, 0.42, 0.20);
const BLOSSOM_COLOR: Vec3 = Vec3::new(0.78, 0.62, 0.86);
const BLOOM_RATE: f32 = 2.5;
const EAR_OFFSET: Vec3 = Vec3::new(0.09, 0.0, 0.0);

struct PlantInstance {
    descriptor: PlantDescriptor,
    node: NodeId,
    voice: Option<SpatialSink>,
    phase: f32,
    bloom: f32,
}

/// Placed plants. Each one opens toward a nearby observer and sings through its own
/// spatial voice, louder the closer the observer stands.
pub struct PlantSceneManager {
    config: PlantsConfig,
    device: Option<Rc<AudioDevice>>,
    plants: Vec<PlantInstance>,
    volume: f32,
    time: f32,
}

impl PlantSceneManager {
    pub fn new(config: PlantsConfig, device: Option<Rc<AudioDevice>>) -> Self {
        let volume = config.volume;
        Self { config, device, plants: Vec::new(), volume, time: 0.0 }
    }

    pub fn len(&self) -> usize {
        self.plants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plants.is_empty()
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn bloom(&self, name: &str) -> Option<f32> {
        self.plants.iter().find(|p| p.descriptor.name == name).map(|p| p.bloom)
    }

    fn open_voice(&self, descriptor: &PlantDescriptor) -> Result<Option<SpatialSink>> {
        let Some(device) = self.device.as_ref() else {
            if self.config.require_audio {
                bail!("no audio output for '{}'", descriptor.name);
            }
            return Ok(None);
        };
        let path = self.config.audio_dir.join(&descriptor.audio_file);
        let source = match open_looped(&path) {
            Ok(source) => source,
            Err(err) if !self.config.require_audio => {
                warn!("[plants] '{}' stays silent: {err:#}", descriptor.name);
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        let at = descriptor.position.to_array();
        let sink = SpatialSink::try_new(device.handle(), at, at, at)?;
        sink.set_volume(0.0);
        sink.append(source);
        Ok(Some(sink))
    }
}

impl PlantSystem for PlantSceneManager {
    async fn add_plant(&mut self, scene: &mut Scene, descriptor: PlantDescriptor) -> Result<()> {
        let voice = self.open_voice(&descriptor)?;
        let node = scene.add_node(SceneNode::new(
            descriptor.name.clone(),
            NodeKind::Plant,
            plant_transform(&descriptor, 0.0, 0.0),
            LEAF_COLOR,
        ));
        // golden-ratio phases keep neighbours from swaying in lockstep
        let phase = (self.plants.len() as f32 * 0.618_034).fract() * TAU;
        debug!("[plants] '{}' ready (voice: {})", descriptor.name, voice.is_some());
        self.plants.push(PlantInstance { descriptor, node, voice, phase, bloom: 0.0 });
        Ok(())
    }

    fn update(&mut self, scene: &mut Scene, dt: f32, observer: Vec3) {
        self.time += dt;
        let ease = 1.0 - (-dt * BLOOM_RATE).exp();
        for plant in &mut self.plants {
            let distance = plant.descriptor.position.distance(observer);
            let target = bloom_factor(distance, self.config.bloom_inner_radius, self.config.bloom_outer_radius);
            plant.bloom += (target - plant.bloom) * ease;
            let sway = (self.time * 1.3 + plant.phase).sin() * 0.05 * (1.0 + plant.bloom);
            if let Some(node) = scene.node_mut(plant.node) {
                node.transform = plant_transform(&plant.descriptor, plant.bloom, sway);
                node.color = LEAF_COLOR.lerp(BLOSSOM_COLOR, plant.bloom);
                node.glow = plant.bloom;
            }
            if let Some(voice) = plant.voice.as_ref() {
                voice.set_emitter_position(plant.descriptor.position.to_array());
                voice.set_left_ear_position((observer - EAR_OFFSET).to_array());
                voice.set_right_ear_position((observer + EAR_OFFSET).to_array());
                let gain = distance_gain(distance, self.config.reference_distance, self.config.max_distance);
                voice.set_volume(self.volume * gain);
            }
        }
    }

    fn set_audio_volume(&mut self, volume: f32) {
        self.volume = volume.max(0.0);
    }
}

fn plant_transform(descriptor: &PlantDescriptor, bloom: f32, sway: f32) -> Transform {
    let height = descriptor.scale * PLANT_HEIGHT * (1.0 + 0.15 * bloom);
    let width = descriptor.scale * PLANT_WIDTH * (1.0 + 0.25 * bloom);
    Transform {
        translation: descriptor.position + Vec3::Y * height * 0.5,
        rotation: Quat::from_rotation_z(sway),
        scale: Vec3::new(width, height, width),
    }
}

/// 1 inside `inner`, 0 beyond `outer`, smooth in between.
pub fn bloom_factor(distance: f32, inner: f32, outer: f32) -> f32 {
    if outer <= inner {
        return if distance <= inner { 1.0 } else { 0.0 };
    }
    let t = ((outer - distance) / (outer - inner)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Linear rolloff from full gain at `reference` to silence at `max`.
pub fn distance_gain(distance: f32, reference: f32, max: f32) -> f32 {
    if distance <= reference {
        return 1.0;
    }
    if max <= reference {
        return 0.0;
    }
    (1.0 - (distance - reference) / (max - reference)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::GROUND_CLEARANCE;
    use pollster::block_on;

    fn descriptor(name: &str, x: f32, z: f32) -> PlantDescriptor {
        PlantDescriptor {
            name: name.to_string(),
            position: Vec3::new(x, GROUND_CLEARANCE, z),
            audio_file: format!("{}.wav", name.to_lowercase()),
            scale: 1.0,
        }
    }

    #[test]
    fn bloom_and_gain_fall_off_with_distance() {
        assert_eq!(bloom_factor(0.5, 1.5, 7.0), 1.0);
        assert_eq!(bloom_factor(9.0, 1.5, 7.0), 0.0);
        let mid = bloom_factor(4.25, 1.5, 7.0);
        assert!((mid - 0.5).abs() < 1e-5);
        assert_eq!(distance_gain(0.2, 1.0, 18.0), 1.0);
        assert_eq!(distance_gain(30.0, 1.0, 18.0), 0.0);
        assert!((distance_gain(9.5, 1.0, 18.0) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn silent_plants_are_placed_without_a_device() {
        let mut scene = Scene::new();
        let mut manager = PlantSceneManager::new(PlantsConfig::default(), None);
        block_on(manager.add_plant(&mut scene, descriptor("Romero", -3.0, 4.0))).expect("place plant");
        assert_eq!(manager.len(), 1);
        let node = scene.node(scene.find("Romero").expect("plant node")).expect("node");
        assert_eq!(node.kind, NodeKind::Plant);
        assert!((node.transform.translation.y - (GROUND_CLEARANCE + PLANT_HEIGHT * 0.5)).abs() < 1e-5);
    }

    #[test]
    fn required_audio_without_device_fails_placement() {
        let config = PlantsConfig { require_audio: true, ..PlantsConfig::default() };
        let mut manager = PlantSceneManager::new(config, None);
        let result = block_on(manager.add_plant(&mut Scene::new(), descriptor("Ruda", 0.0, 0.0)));
        assert!(result.is_err());
        assert!(manager.is_empty());
    }

    #[test]
    fn nearby_observer_makes_plants_bloom() {
        let mut scene = Scene::new();
        let mut manager = PlantSceneManager::new(PlantsConfig::default(), None);
        block_on(manager.add_plant(&mut scene, descriptor("Salvia", 0.0, 0.0))).expect("near");
        block_on(manager.add_plant(&mut scene, descriptor("Ruda", 40.0, 0.0))).expect("far");
        for _ in 0..120 {
            manager.update(&mut scene, 1.0 / 30.0, Vec3::new(0.0, 1.7, 0.5));
        }
        assert!(manager.bloom("Salvia").expect("salvia") > 0.9);
        assert!(manager.bloom("Ruda").expect("ruda") < 1e-3);
        let salvia = scene.node(scene.find("Salvia").expect("salvia node")).expect("node");
        assert!(salvia.glow > 0.9);
    }

    #[test]
    fn volume_setting_is_stored_for_the_next_update() {
        let mut manager = PlantSceneManager::new(PlantsConfig::default(), None);
        manager.set_audio_volume(0.35);
        assert!((manager.volume() - 0.35).abs() < f32::EPSILON);
    }
}
