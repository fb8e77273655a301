//! CPU-side mesh buffers for the terrain surface and the water layer
//!
//! The terrain mesh holds 4 vertices and 2 triangles per tile, enumerated
//! chunk-major so each chunk maps to one contiguous sub-mesh index range.
//! Buffers are plain `Pod` data; uploading them is the renderer's concern.

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};

use crate::core::types::{IVec2, UVec2, Vec3};
use super::geometry::TileGeometry;
use super::grid::{CHUNK_DIMENSION, TILES_PER_CHUNK};
use super::tile::{tile_world_position, Tile, TILE_SIZE};

/// Blend textures repeat every this many tiles
pub const BLEND_TEXTURE_DIMENSION: u32 = 4;

/// How many water tile instances one batch mesh holds
pub const WATER_TILE_BATCH_SIZE: usize = 64;

/// Vertex layout of the terrain mesh
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct TerrainVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    /// Tiles across each chunk-local 4x4 tile block, samples blend textures
    pub blend_uv: [f32; 2],
    /// Spans the whole terrain, samples the control texture
    pub control_uv: [f32; 2],
}

/// Vertex layout of the instanced water tile mesh
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct WaterVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    /// Index into the per-batch instance arrays
    pub instance: f32,
}

/// One chunk's draw range in the terrain index buffer
#[derive(Clone, Copy, Debug)]
pub struct SubMesh {
    pub index_offset: u32,
    pub index_count: u32,
}

/// Generated terrain mesh, partitioned into per-chunk sub-meshes
pub struct TerrainMesh {
    dimension: UVec2,
    vertices: Vec<TerrainVertex>,
    indices: Vec<u32>,
    chunks: Vec<SubMesh>,
}

impl TerrainMesh {
    /// Allocate the mesh for a terrain of `dimension` tiles and write the
    /// static per-tile texture coordinates. Positions, normals and indices
    /// are filled by `update_geometry`.
    pub fn new(dimension: UVec2) -> Self {
        let tile_count = (dimension.x * dimension.y) as usize;
        let chunk_count = tile_count / TILES_PER_CHUNK;

        let mut vertices = vec![TerrainVertex::default(); tile_count * 4];
        let indices = vec![0u32; tile_count * 6];

        let chunks = (0..chunk_count)
            .map(|chunk| SubMesh {
                index_offset: (chunk * TILES_PER_CHUNK * 6) as u32,
                index_count: (TILES_PER_CHUNK * 6) as u32,
            })
            .collect();

        // Texture coordinates of the 4 tile corners, in the same order as
        // the tile geometry vertices.
        let blend_stride = 1.0 / BLEND_TEXTURE_DIMENSION as f32;
        let blend_corners = [
            [0.0, 0.0],
            [blend_stride, 0.0],
            [0.0, blend_stride],
            [blend_stride, blend_stride],
        ];
        let control_stride_u = 1.0 / dimension.x as f32;
        let control_stride_v = 1.0 / dimension.y as f32;
        let control_corners = [
            [0.0, 0.0],
            [control_stride_u, 0.0],
            [0.0, control_stride_v],
            [control_stride_u, control_stride_v],
        ];

        for chunk in 0..chunk_count {
            for tile_in_chunk in 0..TILES_PER_CHUNK {
                let location = tile_location(dimension, chunk, tile_in_chunk);
                let global_tile = chunk * TILES_PER_CHUNK + tile_in_chunk;

                for corner in 0..4 {
                    let vertex = &mut vertices[global_tile * 4 + corner];
                    vertex.blend_uv = [
                        blend_corners[corner][0] + location.x as f32 * blend_stride,
                        blend_corners[corner][1] + location.y as f32 * blend_stride,
                    ];
                    vertex.control_uv = [
                        control_corners[corner][0] + location.x as f32 * control_stride_u,
                        control_corners[corner][1] + location.y as f32 * control_stride_v,
                    ];
                }
            }
        }

        Self { dimension, vertices, indices, chunks }
    }

    /// Rewrite vertex positions and triangle indices from the tiles data,
    /// then recompute smoothed normals.
    pub fn update_geometry(&mut self, tiles: &[Tile]) {
        let chunk_count = self.chunks.len();

        for chunk in 0..chunk_count {
            for tile_in_chunk in 0..TILES_PER_CHUNK {
                let location = tile_location(self.dimension, chunk, tile_in_chunk);
                let global_tile = chunk * TILES_PER_CHUNK + tile_in_chunk;

                let tile_index = (location.y * self.dimension.x as i32 + location.x) as usize;
                let tile = &tiles[tile_index];
                let geometry = TileGeometry::of(tile.kind);

                for i in 0..6 {
                    self.indices[global_tile * 6 + i] =
                        global_tile as u32 * 4 + geometry.indices[i];
                }

                let mut origin = tile_world_position(location);
                origin.y = tile.altitude();
                for corner in 0..4 {
                    let position = geometry.vertices[corner] + origin;
                    self.vertices[global_tile * 4 + corner].position = position.to_array();
                }
            }
        }

        self.compute_smooth_normals();
    }

    /// Average face normals across position-welded vertices so ramp seams
    /// between neighboring tiles shade continuously.
    fn compute_smooth_normals(&mut self) {
        // Tile corners of adjacent tiles coincide exactly when their levels
        // agree; quantizing positions to a hundredth of a unit welds them.
        const WELD_SCALE: f32 = 100.0;
        let key = |p: [f32; 3]| {
            (
                (p[0] * WELD_SCALE).round() as i64,
                (p[1] * WELD_SCALE).round() as i64,
                (p[2] * WELD_SCALE).round() as i64,
            )
        };

        let mut accumulated: HashMap<(i64, i64, i64), Vec3> = HashMap::new();

        for face in self.indices.chunks_exact(3) {
            let v0 = Vec3::from_array(self.vertices[face[0] as usize].position);
            let v1 = Vec3::from_array(self.vertices[face[1] as usize].position);
            let v2 = Vec3::from_array(self.vertices[face[2] as usize].position);

            // Area-weighted face normal
            let normal = (v1 - v0).cross(v2 - v0);
            for &i in face {
                *accumulated
                    .entry(key(self.vertices[i as usize].position))
                    .or_insert(Vec3::ZERO) += normal;
            }
        }

        for vertex in &mut self.vertices {
            let sum = accumulated[&key(vertex.position)];
            vertex.normal = sum.normalize_or(Vec3::Y).to_array();
        }
    }

    pub fn dimension(&self) -> UVec2 {
        self.dimension
    }

    pub fn vertices(&self) -> &[TerrainVertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Per-chunk sub-mesh draw ranges
    pub fn chunks(&self) -> &[SubMesh] {
        &self.chunks
    }
}

/// Location of a tile from its chunk-major enumeration
fn tile_location(dimension: UVec2, chunk: usize, tile_in_chunk: usize) -> IVec2 {
    let row_chunks = (dimension.x / CHUNK_DIMENSION) as usize;
    let chunk_dim = CHUNK_DIMENSION as usize;
    IVec2::new(
        (chunk % row_chunks * chunk_dim + tile_in_chunk % chunk_dim) as i32,
        (chunk / row_chunks * chunk_dim + tile_in_chunk / chunk_dim) as i32,
    )
}

/// Build the shared water mesh: `WATER_TILE_BATCH_SIZE` unit tile quads,
/// each vertex tagged with its instance index so a shader can offset it by
/// the per-instance position and texture coordinate arrays.
pub fn water_batch_mesh() -> (Vec<WaterVertex>, Vec<u16>) {
    let half = TILE_SIZE * 0.5;

    let corners = [
        ([-half, 0.0, -half], [0.0, 0.0]),
        ([-half, 0.0, half], [1.0, 0.0]),
        ([half, 0.0, half], [1.0, 1.0]),
        ([half, 0.0, -half], [0.0, 1.0]),
    ];

    let mut vertices = Vec::with_capacity(WATER_TILE_BATCH_SIZE * 4);
    let mut indices = Vec::with_capacity(WATER_TILE_BATCH_SIZE * 6);

    for instance in 0..WATER_TILE_BATCH_SIZE {
        for (position, uv) in corners {
            vertices.push(WaterVertex {
                position,
                uv,
                instance: instance as f32,
            });
        }

        let base = (instance * 4) as u16;
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    (vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::tile::{TileType, HEIGHT_PER_LEVEL};

    fn flat_tiles(dimension: UVec2) -> Vec<Tile> {
        vec![Tile::default(); (dimension.x * dimension.y) as usize]
    }

    #[test]
    fn test_buffer_sizes() {
        let dimension = UVec2::new(16, 8);
        let mesh = TerrainMesh::new(dimension);
        assert_eq!(mesh.vertices().len(), 16 * 8 * 4);
        assert_eq!(mesh.indices().len(), 16 * 8 * 6);
        assert_eq!(mesh.chunks().len(), 2);
        assert_eq!(mesh.chunks()[1].index_offset, 64 * 6);
    }

    #[test]
    fn test_control_uv_spans_terrain() {
        let dimension = UVec2::new(8, 8);
        let mesh = TerrainMesh::new(dimension);

        // First tile's first corner at the control texture origin, last
        // tile's last corner at (1, 1).
        assert_eq!(mesh.vertices()[0].control_uv, [0.0, 0.0]);
        let last = mesh.vertices().last().unwrap();
        assert!((last.control_uv[0] - 1.0).abs() < 1e-5);
        assert!((last.control_uv[1] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_flat_terrain_has_up_normals() {
        let dimension = UVec2::new(8, 8);
        let mut mesh = TerrainMesh::new(dimension);
        mesh.update_geometry(&flat_tiles(dimension));

        for vertex in mesh.vertices() {
            assert!((vertex.normal[1] - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_altitude_moves_positions_up() {
        let dimension = UVec2::new(8, 8);
        let mut tiles = flat_tiles(dimension);
        for tile in &mut tiles {
            tile.level = 2;
        }

        let mut mesh = TerrainMesh::new(dimension);
        mesh.update_geometry(&tiles);

        for vertex in mesh.vertices() {
            assert!((vertex.position[1] - 2.0 * HEIGHT_PER_LEVEL).abs() < 1e-4);
        }
    }

    #[test]
    fn test_seam_normals_are_shared() {
        // A single ramp in a flat field: vertices welded at the ramp foot
        // must agree on their normal across the two tiles.
        let dimension = UVec2::new(8, 8);
        let mut tiles = flat_tiles(dimension);
        tiles[27].kind = TileType::SouthWest;

        let mut mesh = TerrainMesh::new(dimension);
        mesh.update_geometry(&tiles);

        // The ramp tilts some normals away from straight up.
        let tilted = mesh
            .vertices()
            .iter()
            .filter(|v| (v.normal[1] - 1.0).abs() > 1e-4)
            .count();
        assert!(tilted > 0);
    }

    #[test]
    fn test_water_batch_mesh_layout() {
        let (vertices, indices) = water_batch_mesh();
        assert_eq!(vertices.len(), WATER_TILE_BATCH_SIZE * 4);
        assert_eq!(indices.len(), WATER_TILE_BATCH_SIZE * 6);
        assert_eq!(vertices[4].instance, 1.0);
        assert_eq!(indices[6], 4);
    }
}
