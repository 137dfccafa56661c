//! Simulation data structures: height samples, meshes, scene graphs, and instances.
//!
//! - `heightmap` holds the height samples decoded from a texture
//! - `mesh` contains the CPU-side grid geometry of the terrain surface
//! - `instance` holds per-object transformation data
//! - `scene_graph` enables hierarchical scene organization

pub mod heightmap;
pub mod instance;
pub mod mesh;
pub mod scene_graph;
