//! Tile data: ramp types and per-tile properties

use serde::{Deserialize, Serialize};

use crate::core::types::{IVec2, Vec3};

/// Tile side length in world units
pub const TILE_SIZE: f32 = 45.255;

/// World height of one altitude level
pub const HEIGHT_PER_LEVEL: f32 = 18.475;

/// The 15 ramp shapes a tile can take.
///
/// Ramps are named after the sides of the tile that sit at the raised level:
/// `SouthA..EastA` raise a single corner, `SouthWest..SouthEast` raise a whole
/// edge, `SouthB..EastB` raise three corners (leaving one low corner), and the
/// two V-shapes raise two opposite corners.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileType {
    Flat,
    SouthA,
    WestA,
    NorthA,
    EastA,
    SouthWest,
    NorthWest,
    NorthEast,
    SouthEast,
    SouthB,
    WestB,
    NorthB,
    EastB,
    VWestToEast,
    VSouthToNorth,
}

/// Number of tile types
pub const TILE_TYPE_COUNT: usize = 15;

impl TileType {
    /// All tile types in table order
    pub const ALL: [TileType; TILE_TYPE_COUNT] = [
        TileType::Flat,
        TileType::SouthA,
        TileType::WestA,
        TileType::NorthA,
        TileType::EastA,
        TileType::SouthWest,
        TileType::NorthWest,
        TileType::NorthEast,
        TileType::SouthEast,
        TileType::SouthB,
        TileType::WestB,
        TileType::NorthB,
        TileType::EastB,
        TileType::VWestToEast,
        TileType::VSouthToNorth,
    ];

    /// Index of this type into the geometry and production tables
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Properties of one terrain tile
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    /// Ramp shape
    pub kind: TileType,
    /// Altitude level; world height is `level * HEIGHT_PER_LEVEL`
    pub level: i32,
    /// Whether this tile carries a water plane
    pub has_water: bool,
    /// World height of the water plane
    pub water_altitude: f32,
}

impl Tile {
    /// Create a tile
    pub fn new(kind: TileType, level: i32, has_water: bool, water_altitude: f32) -> Self {
        Self { kind, level, has_water, water_altitude }
    }

    /// Base altitude in world units
    pub fn altitude(&self) -> f32 {
        self.level as f32 * HEIGHT_PER_LEVEL
    }

    /// Water is visible only if the tile has water and the water plane is
    /// above the tile's base altitude.
    pub fn is_water_visible(&self) -> bool {
        self.has_water && self.water_altitude > self.altitude()
    }
}

impl Default for Tile {
    fn default() -> Self {
        Self::new(TileType::Flat, 0, false, 0.0)
    }
}

/// World-space center of a tile at ground level.
///
/// The isometric mapping runs grid y along world X and grid x along world Z.
pub fn tile_world_position(location: IVec2) -> Vec3 {
    Vec3::new(TILE_SIZE * location.y as f32, 0.0, TILE_SIZE * location.x as f32)
}
