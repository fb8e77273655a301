//! Render-facing data: texture bindings and per-frame draw lists

pub mod texture;
pub mod draw;

pub use draw::{TerrainDrawList, WaterBatch, WaterDrawList, WATER_TILE_TEXCOORD_SIZE};
pub use texture::{TerrainTextures, TextureHandle};
