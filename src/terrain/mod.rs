//! Chunked isometric terrain: tiles, mesh, spatial queries and editing

pub mod tile;
pub mod geometry;
pub mod quadtree;
pub mod mesh;
pub mod grid;
pub mod modifier;

pub use tile::{Tile, TileType, HEIGHT_PER_LEVEL, TILE_SIZE};
pub use grid::{RaycastHit, Terrain, CHUNK_DIMENSION};
pub use modifier::TerrainModifier;
