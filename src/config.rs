//! Simulation settings.
//!
//! Every tunable of the demo lives here. [`SimConfig::default`] reproduces the shipped
//! game feel; a TOML document can override any subset of the values:
//!
//! ```toml
//! [physics]
//! gravity = -9.81
//!
//! [character]
//! run_speed = 12.0
//! ```

use std::f32::consts::PI;

use anyhow::Context;
use serde::Deserialize;

/// Root of the configuration tree.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub physics: PhysicsConfig,
    pub character: CharacterConfig,
    pub controls: ControlsConfig,
    pub terrain: TerrainConfig,
    pub ball: BallConfig,
    pub camera: CameraConfig,
    pub assets: AssetsConfig,
}

impl SimConfig {
    /// Parse a (possibly partial) TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> anyhow::Result<Self> {
        toml::from_str(source).context("invalid simulation config")
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Vertical acceleration in m/s², negative is down.
    pub gravity: f32,
    /// Length of one internal simulation step in seconds.
    pub fixed_time_step: f32,
    /// Upper bound of internal steps taken for a single frame.
    pub max_sub_steps: u32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: -9.5,
            fixed_time_step: 1.0 / 60.0,
            max_sub_steps: 10,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CharacterConfig {
    pub walk_speed: f32,
    pub run_speed: f32,
    /// Fraction of the remaining rotation applied to the body each update.
    pub body_slerp_factor: f32,
    /// Yaw difference (radians) the idle body tolerates before turning towards the head.
    pub idle_yaw_threshold: f32,
    /// Seconds a crossfade between two states takes.
    pub crossfade_duration: f32,
    pub mesh_scale: f32,
    pub spawn_height: f32,
    pub body_radius: f32,
    pub body_mass: f32,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            walk_speed: 3.25,
            run_speed: 10.0,
            body_slerp_factor: 0.1,
            idle_yaw_threshold: PI / 5.0,
            crossfade_duration: 0.5,
            mesh_scale: 0.02,
            spawn_height: 1.0,
            body_radius: 1.0,
            body_mass: 1.0,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    pub sensitivity: f32,
    /// Pitch is clamped to `[-pitch_limit, pitch_limit]` radians.
    pub pitch_limit: f32,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            sensitivity: 10.0,
            pitch_limit: PI / 4.0,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// World size is the height texture size divided by this value.
    pub size_divisor: f32,
    /// Mesh subdivisions per texture pixel.
    pub subdivision_multiplier: u32,
    /// Vertices scanned per batch when searching the largest planar coordinate.
    pub scan_chunk_size: usize,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            size_divisor: 2.0,
            subdivision_multiplier: 1,
            scan_chunk_size: 100_000,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BallConfig {
    pub radius: f32,
    pub position: [f32; 3],
    pub mass: f32,
    pub friction: f32,
    pub rolling_friction: f32,
}

impl Default for BallConfig {
    fn default() -> Self {
        Self {
            radius: 2.0,
            position: [7.0, 5.0, 7.0],
            mass: 1.0,
            friction: 4.0,
            rolling_friction: 1.0,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
    pub position: [f32; 3],
    /// Sky colour handed to the render surface.
    pub background: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fovy: 90.0,
            znear: 0.1,
            zfar: 1000.0,
            position: [0.0, 2.5, 4.0],
            // #83C8E4
            background: [0x83 as f32 / 255.0, 0xC8 as f32 / 255.0, 0xE4 as f32 / 255.0],
        }
    }
}

/// Asset paths, relative to the `assets` directory (native) or `<origin>/assets` (web).
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    pub heightmap: String,
    pub character_model: String,
    /// `(state or clip name, file)` pairs requested for the character.
    pub animations: Vec<(String, String)>,
    /// Clip the character enters as soon as it is bound.
    pub default_animation: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        let animations = [
            ("walk", "models/main_character/animations/walk.glb"),
            ("idle", "models/main_character/animations/idle.glb"),
            ("fight", "models/main_character/animations/fight.glb"),
            ("dance", "models/main_character/animations/dance.glb"),
            ("run", "models/main_character/animations/run.glb"),
        ]
        .into_iter()
        .map(|(name, file)| (name.to_string(), file.to_string()))
        .collect();
        Self {
            heightmap: "iceland_heightmap.png".to_string(),
            character_model: "models/main_character/main.glb".to_string(),
            animations,
            default_animation: "idle".to_string(),
        }
    }
}
