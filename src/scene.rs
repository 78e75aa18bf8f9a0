//! Scene loading, parsing, and validation.
//!
//! A scene file describes one simulation run: the physical objects, the
//! channel model variant to drive, the transmissions to fan out, and
//! optional overrides for the per-variant settings. Scenes are JSON;
//! loading failures and malformed content surface as [`SceneLoadError`]
//! before the run starts, never during it.

use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::settings::{CellularSettings, DirectSettings, SimpleSettings};
use crate::types::{NetworkNode, NodeId, SimNanos};

/// Error type for scene loading failures.
#[derive(Debug)]
pub enum SceneLoadError {
    FileReadError(String),
    ParseError(String),
    ValidationError(String),
}

impl std::fmt::Display for SceneLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SceneLoadError::FileReadError(msg) => write!(f, "Failed to read file: {}", msg),
            SceneLoadError::ParseError(msg) => write!(f, "Failed to parse JSON: {}", msg),
            SceneLoadError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for SceneLoadError {}

/// Which channel model variant drives the run.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Simple,
    Direct,
    Cellular,
}

/// One transmission the runner fans out to every other node.
#[derive(Debug, Deserialize, Clone)]
pub struct ScheduledTransmission {
    pub sender: NodeId,
    /// Simulated start time in nanoseconds.
    pub start_time: SimNanos,
    /// Payload length in bits.
    pub length_bits: u32,
    /// Base-station backhaul transmission, bypassing the radio model.
    #[serde(default)]
    pub wired: bool,
}

/// Root structure representing one simulation run.
#[derive(Debug, Deserialize)]
pub struct Scene {
    pub model: ModelKind,
    /// Seed for the channel model's random draws. Runs with the same seed
    /// reproduce the same outcomes.
    #[serde(default)]
    pub seed: u64,
    /// All network-capable objects present in the scene.
    pub objects: Vec<NetworkNode>,
    pub transmissions: Vec<ScheduledTransmission>,
    #[serde(default)]
    pub simple: SimpleSettings,
    #[serde(default)]
    pub direct: DirectSettings,
    #[serde(default)]
    pub cellular: CellularSettings,
}

/// Load and validate a scene from a JSON file.
pub fn load_scene(path: &Path) -> Result<Scene, SceneLoadError> {
    let data = fs::read_to_string(path).map_err(|e| SceneLoadError::FileReadError(e.to_string()))?;
    let scene: Scene = serde_json::from_str(&data).map_err(|e| SceneLoadError::ParseError(e.to_string()))?;
    validate_scene(&scene).map_err(SceneLoadError::ValidationError)?;
    Ok(scene)
}

/// Validate a parsed scene, rejecting inputs that would cause runtime
/// problems.
///
/// Checks for:
/// - Empty object lists and duplicate node ids
/// - Non-finite positions or velocities
/// - Transmissions referencing unknown senders or carrying zero payload
/// - Modulation table overrides that leave the default index dangling
pub fn validate_scene(scene: &Scene) -> Result<(), String> {
    if scene.objects.is_empty() {
        return Err("Scene must contain at least one object".to_string());
    }

    let mut ids = HashSet::new();
    for object in &scene.objects {
        if !ids.insert(object.id) {
            return Err(format!("Duplicate node id found: {}", object.id));
        }
        let finite = object.position.x.is_finite()
            && object.position.y.is_finite()
            && object.velocity.x.is_finite()
            && object.velocity.y.is_finite();
        if !finite {
            return Err(format!("Node {} has a non-finite position or velocity", object.id));
        }
    }

    for (idx, tx) in scene.transmissions.iter().enumerate() {
        if !ids.contains(&tx.sender) {
            return Err(format!("Transmission {} references unknown sender {}", idx, tx.sender));
        }
        if tx.length_bits == 0 {
            return Err(format!("Transmission {} has a zero-length payload", idx));
        }
    }

    match scene.model {
        ModelKind::Simple => {
            if scene.simple.default_modulation_index >= scene.simple.modulation.len() {
                return Err("Simple settings: default modulation index out of range".to_string());
            }
        }
        ModelKind::Direct => {
            if scene.direct.default_modulation_index >= scene.direct.modulation.len() {
                return Err("Direct settings: default modulation index out of range".to_string());
            }
            if scene.direct.channels.is_empty() {
                return Err("Direct settings: channel table is empty".to_string());
            }
            if scene.direct.clear_range <= 0.0 || !scene.direct.clear_range.is_finite() {
                return Err("Direct settings: invalid clear range".to_string());
            }
        }
        ModelKind::Cellular => {
            let settings = &scene.cellular;
            if settings.channels_per_group == 0 {
                return Err("Cellular settings: channels_per_group must be positive".to_string());
            }
            // Base stations draw from the upper table half.
            let half = settings.modulation.len() / 2;
            if settings.modulation.is_empty() || settings.default_modulation_index + half >= settings.modulation.len() {
                return Err("Cellular settings: default modulation index out of range for the downlink half".to_string());
            }
            if settings.handover_offset < 0.0 || !settings.handover_offset.is_finite() {
                return Err("Cellular settings: invalid handover offset".to_string());
            }
        }
    }

    Ok(())
}
