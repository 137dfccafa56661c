//! CPU-side plane geometry used for the terrain surface.

use cgmath::{InnerSpace, Vector3, Zero};

/// Vertex layout handed to the render surface.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GridVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

/// An indexed triangle mesh laid out as a regular grid on the XZ plane.
#[derive(Clone, Debug, PartialEq)]
pub struct GridMesh {
    pub vertices: Vec<GridVertex>,
    pub indices: Vec<u32>,
    width_segments: u32,
    depth_segments: u32,
}

impl GridMesh {
    /// A flat plane of `width` x `depth` centred on the origin, facing +Y.
    ///
    /// Vertices are emitted line by line from `-depth/2` to `depth/2`, each line from
    /// `-width/2` to `width/2`.
    pub fn plane(width: f32, depth: f32, width_segments: u32, depth_segments: u32) -> Self {
        let width_segments = width_segments.max(1);
        let depth_segments = depth_segments.max(1);
        let grid_x1 = width_segments + 1;
        let grid_z1 = depth_segments + 1;
        let segment_width = width / width_segments as f32;
        let segment_depth = depth / depth_segments as f32;

        let mut vertices = Vec::with_capacity((grid_x1 * grid_z1) as usize);
        for iz in 0..grid_z1 {
            let z = iz as f32 * segment_depth - depth / 2.0;
            for ix in 0..grid_x1 {
                let x = ix as f32 * segment_width - width / 2.0;
                vertices.push(GridVertex {
                    position: [x, 0.0, z],
                    tex_coords: [
                        ix as f32 / width_segments as f32,
                        1.0 - iz as f32 / depth_segments as f32,
                    ],
                    normal: [0.0, 1.0, 0.0],
                });
            }
        }

        let mut indices = Vec::with_capacity((width_segments * depth_segments * 6) as usize);
        for iz in 0..depth_segments {
            for ix in 0..width_segments {
                let a = ix + grid_x1 * iz;
                let b = ix + grid_x1 * (iz + 1);
                let c = (ix + 1) + grid_x1 * (iz + 1);
                let d = (ix + 1) + grid_x1 * iz;
                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }

        Self {
            vertices,
            indices,
            width_segments,
            depth_segments,
        }
    }

    pub fn width_segments(&self) -> u32 {
        self.width_segments
    }

    pub fn depth_segments(&self) -> u32 {
        self.depth_segments
    }

    /// Area-weighted smooth normals from the current positions.
    pub fn compute_vertex_normals(&mut self) {
        let mut normals = vec![Vector3::<f32>::zero(); self.vertices.len()];
        for triangle in self.indices.chunks_exact(3) {
            let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize);
            let pa: Vector3<f32> = self.vertices[a].position.into();
            let pb: Vector3<f32> = self.vertices[b].position.into();
            let pc: Vector3<f32> = self.vertices[c].position.into();
            let face = (pc - pb).cross(pa - pb);
            normals[a] += face;
            normals[b] += face;
            normals[c] += face;
        }
        for (vertex, normal) in self.vertices.iter_mut().zip(normals) {
            let length = normal.magnitude();
            vertex.normal = if length > 0.0 {
                (normal / length).into()
            } else {
                [0.0; 3]
            };
        }
    }

    /// Raw vertex bytes, ready for a vertex buffer upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}
