//! Heightfield generation.
//!
//! One [`HeightGrid`] feeds two consumers: the visible surface, a subdivided plane whose
//! vertices are lifted to the sampled height, and the collision shape, which takes the raw
//! samples directly. Both derive deterministically from the grid and the requested size.

use cgmath::Vector3;

use crate::{
    config::TerrainConfig,
    data_structures::{
        heightmap::HeightGrid,
        mesh::{GridMesh, GridVertex},
    },
};

/// World footprint and subdivisions of a terrain surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TerrainSize {
    pub width: f32,
    pub depth: f32,
    pub width_segments: u32,
    pub depth_segments: u32,
}

impl TerrainSize {
    /// The size used for a height texture: the texture dimensions divided by
    /// `size_divisor`, one subdivision per pixel times `subdivision_multiplier`.
    pub fn for_grid(grid: &HeightGrid, config: &TerrainConfig) -> Self {
        Self {
            width: grid.cols() as f32 / config.size_divisor,
            depth: grid.rows() as f32 / config.size_divisor,
            width_segments: grid.cols() as u32 * config.subdivision_multiplier,
            depth_segments: grid.rows() as u32 * config.subdivision_multiplier,
        }
    }
}

/// Largest `|x|` or `|z|` over all vertices.
///
/// The scan walks the vertices in batches of `chunk_size` and folds each batch maximum into a
/// running maximum, so no intermediate buffer grows with the vertex count.
pub fn max_planar_extent(vertices: &[GridVertex], chunk_size: usize) -> f32 {
    vertices
        .chunks(chunk_size.max(1))
        .map(|chunk| {
            chunk
                .iter()
                .map(|v| v.position[0].abs().max(v.position[2].abs()))
                .fold(0.0_f32, f32::max)
        })
        .fold(0.0_f32, f32::max)
}

/// Map a planar coordinate onto a 0-based grid index along an axis with `len` samples.
///
/// The coordinate range `[-max, max]` is stretched over `len` cells, rounded up to a
/// 1-based index, clamped to `1..=len` and shifted to 0-based. Never out of bounds.
pub fn sample_index(len: usize, max: f32, coord: f32) -> usize {
    let scaled = (len as f32 / (max * 2.0 + 1.0)) * (coord + max + 1.0);
    // A NaN casts to 0 and lands on the lower clamp.
    let one_based = (scaled.ceil() as i64).clamp(1, len as i64);
    (one_based - 1) as usize
}

/// Lift every vertex of `mesh` to the height sampled under it, then rebuild the normals.
pub fn deform(mesh: &mut GridMesh, grid: &HeightGrid, chunk_size: usize) {
    let max = max_planar_extent(&mesh.vertices, chunk_size);
    for vertex in mesh.vertices.iter_mut() {
        let [x, _, z] = vertex.position;
        let row = sample_index(grid.rows(), max, z);
        let col = sample_index(grid.cols(), max, x);
        // row/col are clamped into the grid, the lookup cannot miss
        let height = grid.get(row, col).unwrap_or_default();
        vertex.position = [x, height, z];
    }
    mesh.compute_vertex_normals();
}

/// Build the visible terrain surface for `grid`.
pub fn generate_mesh(grid: &HeightGrid, size: TerrainSize, chunk_size: usize) -> GridMesh {
    let mut mesh = GridMesh::plane(size.width, size.depth, size.width_segments, size.depth_segments);
    deform(&mut mesh, grid, chunk_size);
    mesh
}

/// A height-field collision shape in the layout rigid-body engines expect.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightfieldShape {
    pub rows: usize,
    pub cols: usize,
    /// Row-major samples, copied straight from the grid.
    pub heights: Vec<f32>,
    pub min_height: f32,
    pub max_height: f32,
    pub height_scale: f32,
    /// Per-cell scale: spacing between samples along x, height factor, spacing along z.
    pub local_scaling: Vector3<f32>,
}

impl HeightfieldShape {
    /// Total extent of the shape in world units.
    pub fn footprint(&self) -> Vector3<f32> {
        Vector3::new(
            self.local_scaling.x * cell_count(self.cols),
            self.local_scaling.y * self.height_scale,
            self.local_scaling.z * cell_count(self.rows),
        )
    }
}

// A single-sample axis still spans one cell.
fn cell_count(samples: usize) -> f32 {
    (samples.max(2) - 1) as f32
}

/// Build the collision shape for `grid` so that it covers `world_width` x `world_depth`.
pub fn collision_shape(grid: &HeightGrid, world_width: f32, world_depth: f32) -> HeightfieldShape {
    HeightfieldShape {
        rows: grid.rows(),
        cols: grid.cols(),
        heights: grid.as_slice().to_vec(),
        min_height: HeightGrid::MIN_HEIGHT,
        max_height: HeightGrid::MAX_HEIGHT,
        height_scale: 1.0,
        local_scaling: Vector3::new(
            world_width / cell_count(grid.cols()),
            1.0,
            world_depth / cell_count(grid.rows()),
        ),
    }
}

/// Surface and collision shape generated from one height texture.
#[derive(Clone, Debug)]
pub struct Terrain {
    pub size: TerrainSize,
    pub mesh: GridMesh,
    pub shape: HeightfieldShape,
}

impl Terrain {
    pub fn generate(grid: &HeightGrid, config: &TerrainConfig) -> Self {
        let size = TerrainSize::for_grid(grid, config);
        let mesh = generate_mesh(grid, size, config.scan_chunk_size);
        let shape = collision_shape(grid, size.width, size.depth);
        log::info!(
            "terrain {}x{} samples -> {}x{} world units, {} vertices",
            grid.cols(),
            grid.rows(),
            size.width,
            size.depth,
            mesh.vertices.len()
        );
        Self { size, mesh, shape }
    }
}
