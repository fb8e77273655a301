//! The terrain itself: tile storage, mesh and the two spatial trees

use log::error;

use crate::core::error::Error;
use crate::core::types::{IVec2, Result, UVec2, Vec3};
use crate::math::{Frustum, Ray};
use crate::render::texture::TerrainTextures;
use super::geometry::TileGeometry;
use super::mesh::TerrainMesh;
use super::quadtree::QuadTree;
use super::tile::{tile_world_position, Tile};

/// Side length of one mesh chunk in tiles
pub const CHUNK_DIMENSION: u32 = 8;

/// Tiles per chunk
pub const TILES_PER_CHUNK: usize = (CHUNK_DIMENSION * CHUNK_DIMENSION) as usize;

/// One intersection of a ray with the terrain surface
#[derive(Clone, Copy, Debug)]
pub struct RaycastHit {
    /// Distance from the ray origin
    pub distance: f32,
    /// World-space intersection point
    pub position: Vec3,
    /// Grid location of the hit tile
    pub location: IVec2,
}

/// A chunked isometric terrain.
///
/// Tile data is row-major, `dimension.x` tiles per row. Both dimensions must
/// be non-zero multiples of `CHUNK_DIMENSION`. The mesh and the spatial trees
/// are derived state, rebuilt whenever the tiles change.
pub struct Terrain {
    dimension: UVec2,
    tiles: Vec<Tile>,
    mesh: TerrainMesh,
    terrain_tree: QuadTree,
    water_tree: QuadTree,
    textures: TerrainTextures,
}

impl Terrain {
    /// Create a terrain from tile data.
    ///
    /// Fails when either dimension is zero or not a multiple of
    /// `CHUNK_DIMENSION`, or when the tile count does not match.
    pub fn new(dimension: UVec2, tiles: Vec<Tile>) -> Result<Terrain> {
        if dimension.x == 0
            || dimension.y == 0
            || dimension.x % CHUNK_DIMENSION != 0
            || dimension.y % CHUNK_DIMENSION != 0
        {
            error!(
                "terrain dimension {}x{} is not a multiple of {}",
                dimension.x, dimension.y, CHUNK_DIMENSION
            );
            return Err(Error::Terrain(format!(
                "dimension {}x{} must be a non-zero multiple of {}",
                dimension.x, dimension.y, CHUNK_DIMENSION
            )));
        }

        let expected = (dimension.x * dimension.y) as usize;
        if tiles.len() != expected {
            error!("expected {} tiles, got {}", expected, tiles.len());
            return Err(Error::Terrain(format!(
                "expected {expected} tiles, got {}",
                tiles.len()
            )));
        }

        let mut mesh = TerrainMesh::new(dimension);
        mesh.update_geometry(&tiles);
        let terrain_tree = QuadTree::build_terrain(dimension, &tiles);
        let water_tree = QuadTree::build_water(dimension, &tiles);

        Ok(Terrain {
            dimension,
            tiles,
            mesh,
            terrain_tree,
            water_tree,
            textures: TerrainTextures::default(),
        })
    }

    /// Create a terrain with every tile set to `tile`
    pub fn filled(dimension: UVec2, tile: Tile) -> Result<Terrain> {
        let count = (dimension.x * dimension.y) as usize;
        Self::new(dimension, vec![tile; count])
    }

    /// Replace the tile data and rebuild the derived mesh and trees.
    ///
    /// The slice length must match the terrain's tile count exactly.
    pub fn set_tiles_data(&mut self, tiles: &[Tile]) {
        assert_eq!(
            tiles.len(),
            self.tiles.len(),
            "tiles data length does not match terrain dimension"
        );

        self.tiles.copy_from_slice(tiles);
        self.mesh.update_geometry(&self.tiles);
        self.terrain_tree = QuadTree::build_terrain(self.dimension, &self.tiles);
        self.water_tree = QuadTree::build_water(self.dimension, &self.tiles);
    }

    pub fn dimension(&self) -> UVec2 {
        self.dimension
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Tile at a grid location, None when out of bounds
    pub fn tile(&self, location: IVec2) -> Option<&Tile> {
        if location.x < 0
            || location.y < 0
            || location.x >= self.dimension.x as i32
            || location.y >= self.dimension.y as i32
        {
            return None;
        }
        Some(&self.tiles[(location.y * self.dimension.x as i32 + location.x) as usize])
    }

    pub fn mesh(&self) -> &TerrainMesh {
        &self.mesh
    }

    pub fn textures(&self) -> &TerrainTextures {
        &self.textures
    }

    pub fn textures_mut(&mut self) -> &mut TerrainTextures {
        &mut self.textures
    }

    /// Grid location of a tile index
    pub fn tile_location(&self, tile: u32) -> IVec2 {
        IVec2::new(
            (tile % self.dimension.x) as i32,
            (tile / self.dimension.x) as i32,
        )
    }

    /// Mesh chunk indices at least partially inside the frustum
    pub fn visible_chunks(&self, frustum: &Frustum) -> Vec<u32> {
        self.terrain_tree.visible_chunks(frustum)
    }

    /// Tile indices of visible water tiles inside the frustum
    pub fn visible_water_tiles(&self, frustum: &Frustum) -> Vec<u32> {
        self.water_tree
            .visible_tiles(frustum, |tile| self.tiles[tile as usize].is_water_visible())
    }

    /// Nearest intersection of a ray with the terrain surface
    pub fn raycast(&self, ray: &Ray) -> Option<RaycastHit> {
        let mut nearest: Option<RaycastHit> = None;
        self.raycast_tiles(ray, |hit| {
            if nearest.is_none_or(|n| hit.distance < n.distance) {
                nearest = Some(hit);
            }
        });
        nearest
    }

    /// All intersections of a ray with the terrain surface, nearest first
    pub fn raycast_all(&self, ray: &Ray) -> Vec<RaycastHit> {
        let mut hits = Vec::new();
        self.raycast_tiles(ray, |hit| hits.push(hit));
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    fn raycast_tiles<F>(&self, ray: &Ray, mut on_hit: F)
    where
        F: FnMut(RaycastHit),
    {
        self.terrain_tree.raycast_leaves(ray, |tile| {
            let location = self.tile_location(tile);
            let data = &self.tiles[tile as usize];

            let mut origin = tile_world_position(location);
            origin.y = data.altitude();

            let mut distances = [0.0f32; 2];
            let count = TileGeometry::of(data.kind).raycast(origin, ray, &mut distances);
            for &distance in &distances[..count] {
                on_hit(RaycastHit {
                    distance,
                    position: ray.at(distance),
                    location,
                });
            }
        });
    }
}
