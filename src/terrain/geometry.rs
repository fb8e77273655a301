//! Local-space geometry for the 15 tile types

use crate::core::types::Vec3;
use crate::math::Ray;
use super::tile::{TileType, HEIGHT_PER_LEVEL, TILE_SIZE, TILE_TYPE_COUNT};

/// Geometry of one tile: a quad of 4 vertices split into 2 triangles.
///
/// Vertex order is fixed: 0 = (-x,-z), 1 = (-x,+z), 2 = (+x,-z), 3 = (+x,+z)
/// around the tile center; raised corners sit one `HEIGHT_PER_LEVEL` up.
#[derive(Clone, Copy, Debug)]
pub struct TileGeometry {
    pub vertices: [Vec3; 4],
    pub indices: [u32; 6],
}

const HALF: f32 = TILE_SIZE * 0.5;
const LEVEL: f32 = HEIGHT_PER_LEVEL;

/// Diagonal from vertex 1 to vertex 2
const SPLIT_02: [u32; 6] = [0, 1, 2, 2, 1, 3];
/// Diagonal from vertex 0 to vertex 3
const SPLIT_13: [u32; 6] = [0, 1, 3, 0, 3, 2];

const fn quad(heights: [f32; 4], indices: [u32; 6]) -> TileGeometry {
    TileGeometry {
        vertices: [
            Vec3::new(-HALF, heights[0], -HALF),
            Vec3::new(-HALF, heights[1], HALF),
            Vec3::new(HALF, heights[2], -HALF),
            Vec3::new(HALF, heights[3], HALF),
        ],
        indices,
    }
}

/// Local geometry for every tile type, indexed by `TileType::index()`.
///
/// The triangle split diagonal is chosen per type so the ridge/valley line
/// follows the ramp shape.
pub static TILE_GEOMETRIES: [TileGeometry; TILE_TYPE_COUNT] = [
    // Flat
    quad([0.0, 0.0, 0.0, 0.0], SPLIT_02),
    // SouthA
    quad([LEVEL, 0.0, 0.0, 0.0], SPLIT_02),
    // WestA
    quad([0.0, LEVEL, 0.0, 0.0], SPLIT_13),
    // NorthA
    quad([0.0, 0.0, 0.0, LEVEL], SPLIT_02),
    // EastA
    quad([0.0, 0.0, LEVEL, 0.0], SPLIT_13),
    // SouthWest
    quad([LEVEL, LEVEL, 0.0, 0.0], SPLIT_02),
    // NorthWest
    quad([0.0, LEVEL, 0.0, LEVEL], SPLIT_02),
    // NorthEast
    quad([0.0, 0.0, LEVEL, LEVEL], SPLIT_02),
    // SouthEast
    quad([LEVEL, 0.0, LEVEL, 0.0], SPLIT_02),
    // SouthB
    quad([LEVEL, LEVEL, LEVEL, 0.0], SPLIT_02),
    // WestB
    quad([LEVEL, LEVEL, 0.0, LEVEL], SPLIT_13),
    // NorthB
    quad([0.0, LEVEL, LEVEL, LEVEL], SPLIT_02),
    // EastB
    quad([LEVEL, 0.0, LEVEL, LEVEL], SPLIT_13),
    // VWestToEast
    quad([0.0, LEVEL, LEVEL, 0.0], SPLIT_13),
    // VSouthToNorth
    quad([LEVEL, 0.0, 0.0, LEVEL], SPLIT_02),
];

impl TileGeometry {
    /// Look up the geometry for a tile type
    pub fn of(kind: TileType) -> &'static TileGeometry {
        &TILE_GEOMETRIES[kind.index()]
    }

    /// Cast a ray against the two triangles of this tile placed at
    /// `tile_pos` in world space.
    ///
    /// Writes up to 2 hit distances into `distances` and returns the count.
    pub fn raycast(&self, tile_pos: Vec3, ray: &Ray, distances: &mut [f32; 2]) -> usize {
        let world: [Vec3; 4] = [
            self.vertices[0] + tile_pos,
            self.vertices[1] + tile_pos,
            self.vertices[2] + tile_pos,
            self.vertices[3] + tile_pos,
        ];

        let mut hit_count = 0;
        for tri in 0..2 {
            let v0 = world[self.indices[tri * 3] as usize];
            let v1 = world[self.indices[tri * 3 + 1] as usize];
            let v2 = world[self.indices[tri * 3 + 2] as usize];

            if let Some(t) = ray.intersect_triangle(v0, v1, v2) {
                distances[hit_count] = t;
                hit_count += 1;
            }
        }

        hit_count
    }
}
