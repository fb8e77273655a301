//! Per-frame draw lists gathered from the terrain's spatial trees
//!
//! A draw list is plain data the renderer turns into draw calls: chunk
//! indices for the terrain surface, and instance arrays for the batched
//! water tiles.

use crate::core::types::{Vec2, Vec3};
use crate::math::Frustum;
use crate::terrain::grid::Terrain;
use crate::terrain::mesh::WATER_TILE_BATCH_SIZE;
use crate::terrain::tile::tile_world_position;
use super::texture::{TerrainTextures, TextureHandle, WAVE_TEXTURE_SLOTS};

/// Texture coordinate offset between neighboring water tiles, so the wave
/// normal maps tile seamlessly across the water surface
pub const WATER_TILE_TEXCOORD_SIZE: f32 = 0.2;

/// Terrain chunks to draw this frame, in quad-tree traversal order
#[derive(Clone, Debug)]
pub struct TerrainDrawList {
    /// Texture slots bound for every chunk in the list
    pub textures: TerrainTextures,
    pub chunks: Vec<u32>,
}

impl TerrainDrawList {
    pub fn gather(terrain: &Terrain, frustum: &Frustum) -> TerrainDrawList {
        TerrainDrawList {
            textures: *terrain.textures(),
            chunks: terrain.visible_chunks(frustum),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Instance data for up to `WATER_TILE_BATCH_SIZE` water tiles drawn with
/// one call against the shared batch mesh
#[derive(Clone, Debug)]
pub struct WaterBatch {
    /// Per-instance world position of the tile center at water altitude
    pub positions: Vec<Vec3>,
    /// Per-instance texture coordinate offset
    pub texcoords: Vec<Vec2>,
}

impl WaterBatch {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Water batches to draw this frame
#[derive(Clone, Debug)]
pub struct WaterDrawList {
    /// Animation time in seconds, scrolls the wave normal maps
    pub time: f32,
    /// Wave normal-map frames for the water material
    pub wave_textures: [Option<TextureHandle>; WAVE_TEXTURE_SLOTS],
    pub batches: Vec<WaterBatch>,
}

impl WaterDrawList {
    pub fn gather(terrain: &Terrain, frustum: &Frustum, time: f32) -> WaterDrawList {
        let visible = terrain.visible_water_tiles(frustum);

        let batches = visible
            .chunks(WATER_TILE_BATCH_SIZE)
            .map(|tiles| {
                let mut positions = Vec::with_capacity(tiles.len());
                let mut texcoords = Vec::with_capacity(tiles.len());

                for &tile in tiles {
                    let location = terrain.tile_location(tile);
                    let mut position = tile_world_position(location);
                    position.y = terrain.tiles()[tile as usize].water_altitude;
                    positions.push(position);
                    texcoords.push(Vec2::new(
                        location.x as f32 * WATER_TILE_TEXCOORD_SIZE,
                        location.y as f32 * WATER_TILE_TEXCOORD_SIZE,
                    ));
                }

                WaterBatch { positions, texcoords }
            })
            .collect();

        WaterDrawList {
            time,
            wave_textures: [terrain.textures().wave_texture(0), terrain.textures().wave_texture(1)],
            batches,
        }
    }

    /// Total water tile instances across all batches
    pub fn tile_count(&self) -> usize {
        self.batches.iter().map(WaterBatch::len).sum()
    }
}
