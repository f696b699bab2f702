//! Turns the environment's named plant positions into descriptors and registers them.

use crate::app::subsystems::PlantSystem;
use crate::scene::Scene;
use anyhow::{Context, Result};
use glam::Vec3;
use log::{debug, info};
use serde::Deserialize;
use std::collections::HashSet;
use thiserror::Error;

/// Height every plant is lifted to so it sits just above the terrain surface.
pub const GROUND_CLEARANCE: f32 = 0.02;

/// Plant whose recorded sample replaces the derived audio key.
pub const RECORDED_PLANT_NAME: &str = "Lavanda";
pub const RECORDED_PLANT_AUDIO: &str = "lavanda.mp3";

pub const DERIVED_AUDIO_EXTENSION: &str = "wav";

/// Named position supplied by the environment layout.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlantPlacement {
    pub name: String,
    pub position: Vec3,
    pub scale: f32,
}

impl PlantPlacement {
    pub fn new(name: impl Into<String>, position: Vec3, scale: f32) -> Self {
        Self { name: name.into(), position, scale }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlantDescriptor {
    pub name: String,
    pub position: Vec3,
    pub audio_file: String,
    pub scale: f32,
}

#[derive(Debug, Error, PartialEq)]
pub enum PlacementError {
    #[error("plant '{name}' has invalid scale {scale}")]
    InvalidScale { name: String, scale: f32 },
    #[error("plant '{name}' has a non-finite position")]
    InvalidPosition { name: String },
    #[error("plant '{name}' is placed more than once")]
    DuplicateName { name: String },
}

impl PlantDescriptor {
    pub fn from_placement(placement: &PlantPlacement) -> Result<Self, PlacementError> {
        if !placement.scale.is_finite() || placement.scale <= 0.0 {
            return Err(PlacementError::InvalidScale { name: placement.name.clone(), scale: placement.scale });
        }
        if !placement.position.is_finite() {
            return Err(PlacementError::InvalidPosition { name: placement.name.clone() });
        }
        let position = Vec3::new(placement.position.x, GROUND_CLEARANCE, placement.position.z);
        Ok(Self {
            name: placement.name.clone(),
            position,
            audio_file: audio_key_for(&placement.name),
            scale: placement.scale,
        })
    }
}

/// Audio resource key for a plant name.
pub fn audio_key_for(name: &str) -> String {
    if name == RECORDED_PLANT_NAME {
        return RECORDED_PLANT_AUDIO.to_string();
    }
    let stem = name.to_lowercase().split_whitespace().collect::<Vec<_>>().join("_");
    format!("{stem}.{DERIVED_AUDIO_EXTENSION}")
}

/// Registers every placement in order, one at a time. The first failure aborts the rest.
pub async fn load_plants<P: PlantSystem>(
    plants: &mut P,
    scene: &mut Scene,
    placements: &[PlantPlacement],
) -> Result<usize> {
    let mut seen = HashSet::with_capacity(placements.len());
    for placement in placements {
        if !seen.insert(placement.name.as_str()) {
            return Err(PlacementError::DuplicateName { name: placement.name.clone() }.into());
        }
        let descriptor = PlantDescriptor::from_placement(placement)?;
        debug!("[plants] placing '{}' with audio '{}'", descriptor.name, descriptor.audio_file);
        plants
            .add_plant(scene, descriptor)
            .await
            .with_context(|| format!("Failed to place plant '{}'", placement.name))?;
    }
    info!("[plants] placed {} plants", placements.len());
    Ok(placements.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_plant_keeps_its_literal_sample() {
        assert_eq!(audio_key_for("Lavanda"), "lavanda.mp3");
    }

    #[test]
    fn derived_keys_are_lowercase_with_underscores() {
        assert_eq!(audio_key_for("Romero"), "romero.wav");
        assert_eq!(audio_key_for("Hierba Buena"), "hierba_buena.wav");
        assert_eq!(audio_key_for("Flor  de\tMuerto"), "flor_de_muerto.wav");
        assert_eq!(audio_key_for("lavanda"), "lavanda.wav", "override matches the exact name only");
    }

    #[test]
    fn descriptor_forces_ground_clearance() {
        let placement = PlantPlacement::new("Salvia", Vec3::new(4.0, -3.0, 1.5), 1.2);
        let descriptor = PlantDescriptor::from_placement(&placement).expect("valid placement");
        assert_eq!(descriptor.position, Vec3::new(4.0, GROUND_CLEARANCE, 1.5));
        assert_eq!(descriptor.audio_file, "salvia.wav");
        assert!((descriptor.scale - 1.2).abs() < f32::EPSILON);
    }

    #[test]
    fn rejects_non_positive_scale() {
        let placement = PlantPlacement::new("Ruda", Vec3::ZERO, 0.0);
        assert_eq!(
            PlantDescriptor::from_placement(&placement),
            Err(PlacementError::InvalidScale { name: "Ruda".into(), scale: 0.0 })
        );
    }
}
