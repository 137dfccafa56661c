//! terrain-walker
//!
//! Real-time simulation core of a small third person demo: a ball and a character on a terrain
//! generated from a height texture. The crate builds for native hosts and for the browser
//! (WASM). Drawing is left to whatever implements [`driver::RenderSurface`]; the core hands it
//! transforms, the camera and the character's blended pose once per frame.
//!
//! High-level modules
//! - `config`: every tunable with its default, loadable from TOML
//! - `data_structures`: height samples, grid meshes, instances and the scene graph
//! - `terrain`: height texture to surface mesh and collision shape
//! - `physics`: the physics world, fixed-step stepping and body/visual sync
//! - `animation`: actions, crossfades and pose blending
//! - `character`: the character and its idle/walk/run state machine
//! - `controls`: pointer look, keyboard edges and the first person camera
//! - `resources`: async loaders for height textures, glTF models and clips
//! - `driver`: the per-frame pass tying everything together
//! - `flow`: winit event loop hosting the driver
//!

pub mod animation;
pub mod character;
pub mod config;
pub mod controls;
pub mod data_structures;
pub mod driver;
pub mod flow;
pub mod physics;
pub mod resources;
pub mod terrain;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
pub use winit::event::DeviceEvent;
pub use winit::event::WindowEvent;
