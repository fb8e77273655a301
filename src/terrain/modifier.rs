//! Staged terrain editing with automatic ramp selection
//!
//! The modifier works on a copy of the terrain's tile data. Elevation edits
//! propagate outward from the edited tile, rewriting neighbor ramp types via
//! the produce tables so the surface stays continuous. Nothing touches the
//! terrain until `update_terrain` pushes the staged tiles back.

use crate::core::types::IVec2;
use super::grid::Terrain;
use super::tile::{Tile, TileType, TILE_TYPE_COUNT};

/// What a pair of meeting ramp types resolves to; None when the pair has no
/// defined produce and the tile must be flattened at the next level instead
type ProduceTable = [[Option<TileType>; TILE_TYPE_COUNT]; TILE_TYPE_COUNT];

#[derive(Clone, Copy, PartialEq, Eq)]
enum Method {
    Raise,
    Lower,
}

/// Bit masks for the 4 cardinal expansion directions; diagonals are the OR
/// of their two adjacent cardinals
const CARDINAL_MASKS: [u8; 4] = [1, 2, 4, 8];
const CARDINAL_DELTAS: [IVec2; 4] = [
    IVec2::new(0, 1),
    IVec2::new(-1, 0),
    IVec2::new(0, -1),
    IVec2::new(1, 0),
];
const DIAGONAL_MASKS: [u8; 4] = [8 | 1, 1 | 2, 2 | 4, 4 | 8];
const DIAGONAL_DELTAS: [IVec2; 4] = [
    IVec2::new(1, 1),
    IVec2::new(-1, 1),
    IVec2::new(-1, -1),
    IVec2::new(1, -1),
];

/// Ramp types desired on the 8 neighbors of a raised tile, in cardinal then
/// diagonal delta order
const RAISE_NEIGHBORS: [TileType; 8] = [
    TileType::SouthWest,
    TileType::NorthWest,
    TileType::NorthEast,
    TileType::SouthEast,
    TileType::SouthA,
    TileType::WestA,
    TileType::NorthA,
    TileType::EastA,
];

/// Ramp types desired on the 8 neighbors of a lowered tile
const LOWER_NEIGHBORS: [TileType; 8] = [
    TileType::NorthEast,
    TileType::SouthEast,
    TileType::SouthWest,
    TileType::NorthWest,
    TileType::NorthB,
    TileType::EastB,
    TileType::SouthB,
    TileType::WestB,
];

/// Staged editor over a terrain's tile data
pub struct TerrainModifier {
    dimension: IVec2,
    tiles: Vec<Tile>,
    raising_table: ProduceTable,
    lowering_table: ProduceTable,
}

impl TerrainModifier {
    /// Snapshot the terrain's tiles for editing
    pub fn new(terrain: &Terrain) -> TerrainModifier {
        TerrainModifier {
            dimension: terrain.dimension().as_ivec2(),
            tiles: terrain.tiles().to_vec(),
            raising_table: raising_table(),
            lowering_table: lowering_table(),
        }
    }

    /// The staged tile data
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Raise the ground at `location` by one level, propagating ramps to
    /// the surrounding tiles.
    pub fn raise_ground(&mut self, location: IVec2) {
        let level = self.tiles[self.tile_index(location)].level + 1;
        self.modify_recursively(location, 0b1111, TileType::Flat, level, Method::Raise);
    }

    /// Lower the ground at `location` by one level, propagating ramps to
    /// the surrounding tiles.
    pub fn lower_ground(&mut self, location: IVec2) {
        // A ramp's raised corners reach one level above its base, so for the
        // lowering pass ramps are treated at their raised level.
        for tile in &mut self.tiles {
            if tile.kind != TileType::Flat {
                tile.level += 1;
            }
        }

        let level = self.tiles[self.tile_index(location)].level - 1;
        self.modify_recursively(location, 0b1111, TileType::Flat, level, Method::Lower);

        for tile in &mut self.tiles {
            if tile.kind != TileType::Flat {
                tile.level -= 1;
            }
        }
    }

    /// Raise a single tile's level without touching its neighbors
    pub fn raise_tile(&mut self, location: IVec2) {
        let index = self.tile_index(location);
        self.tiles[index].level += 1;
    }

    /// Lower a single tile's level without touching its neighbors
    pub fn lower_tile(&mut self, location: IVec2) {
        let index = self.tile_index(location);
        self.tiles[index].level -= 1;
    }

    /// Push the staged tiles back to the terrain, rebuilding its mesh and
    /// spatial trees.
    pub fn update_terrain(&self, terrain: &mut Terrain) {
        terrain.set_tiles_data(&self.tiles);
    }

    fn tile_index(&self, location: IVec2) -> usize {
        (location.y * self.dimension.x + location.x) as usize
    }

    fn in_bounds(&self, location: IVec2) -> bool {
        location.x >= 0
            && location.y >= 0
            && location.x < self.dimension.x
            && location.y < self.dimension.y
    }

    /// Resolve what an incoming desired ramp turns an existing tile into.
    ///
    /// A desired tile strictly above (raising) or below (lowering) the
    /// existing one simply overrides it; at equal levels the produce table
    /// decides, and an undefined pair yields None.
    fn produce_tile(
        &self,
        desired: TileType,
        desired_level: i32,
        original: TileType,
        original_level: i32,
        method: Method,
    ) -> Option<TileType> {
        match method {
            Method::Raise => {
                if desired_level > original_level {
                    Some(desired)
                } else {
                    self.raising_table[desired.index()][original.index()]
                }
            }
            Method::Lower => {
                if desired_level < original_level {
                    Some(desired)
                } else {
                    self.lowering_table[desired.index()][original.index()]
                }
            }
        }
    }

    fn modify_recursively(
        &mut self,
        location: IVec2,
        mask: u8,
        desired: TileType,
        level: i32,
        method: Method,
    ) {
        let index = self.tile_index(location);
        let current = self.tiles[index];

        // The edit attenuates by one level per tile; once it falls short of
        // (raising) or overshoots (lowering) the existing ground it can no
        // longer affect it.
        match method {
            Method::Raise if level < current.level => return,
            Method::Lower if level > current.level => return,
            _ => {}
        }

        let mut mask = mask;
        let mut level = level;
        let produce = match self.produce_tile(desired, level, current.kind, current.level, method) {
            Some(kind) => kind,
            None => {
                // No defined produce for this pair: flatten the tile at the
                // next level and push the edit out in every direction.
                mask = 0b1111;
                level = match method {
                    Method::Raise => level + 1,
                    Method::Lower => level - 1,
                };
                TileType::Flat
            }
        };

        self.tiles[index].kind = produce;
        self.tiles[index].level = level;

        let neighbor_level = match method {
            Method::Raise => level - 1,
            Method::Lower => level + 1,
        };
        let neighbors = match method {
            Method::Raise => &RAISE_NEIGHBORS,
            Method::Lower => &LOWER_NEIGHBORS,
        };

        // Cardinal neighbors first; flags records which directions stayed in
        // bounds so diagonals only run between two expanded cardinals.
        let mut flags = 0u8;
        for i in 0..4 {
            let next = location + CARDINAL_DELTAS[i];
            if mask & CARDINAL_MASKS[i] != 0 && self.in_bounds(next) {
                self.modify_recursively(next, CARDINAL_MASKS[i], neighbors[i], neighbor_level, method);
                flags |= CARDINAL_MASKS[i];
            }
        }

        for i in 0..4 {
            if flags & DIAGONAL_MASKS[i] == DIAGONAL_MASKS[i] {
                let next = location + DIAGONAL_DELTAS[i];
                self.modify_recursively(next, DIAGONAL_MASKS[i], neighbors[4 + i], neighbor_level, method);
            }
        }
    }
}

/// Produce table shared scaffolding: the Flat row is the identity and every
/// type meeting itself produces itself
fn base_table() -> ProduceTable {
    let mut table = [[None; TILE_TYPE_COUNT]; TILE_TYPE_COUNT];
    for (i, kind) in TileType::ALL.into_iter().enumerate() {
        table[TileType::Flat.index()][i] = Some(kind);
        table[i][i] = Some(kind);
    }
    table
}

/// Mirror the upper triangle across the diagonal so lookup order of the two
/// meeting types does not matter
fn mirror(table: &mut ProduceTable) {
    for i in 0..TILE_TYPE_COUNT {
        for j in 0..i {
            table[i][j] = table[j][i];
        }
    }
}

fn apply_rules(table: &mut ProduceTable, rules: &[(TileType, TileType, TileType)]) {
    for &(a, b, out) in rules {
        table[a.index()][b.index()] = Some(out);
    }
}

fn raising_table() -> ProduceTable {
    use TileType::*;

    let mut table = base_table();
    apply_rules(
        &mut table,
        &[
            (SouthWest, NorthWest, WestB),
            (SouthWest, SouthEast, SouthB),
            (SouthA, SouthWest, SouthWest),
            (WestA, SouthWest, SouthWest),
            (NorthWest, NorthEast, NorthB),
            (WestA, NorthWest, NorthWest),
            (NorthA, NorthWest, NorthWest),
            (NorthEast, SouthEast, EastB),
            (NorthA, NorthEast, NorthEast),
            (EastA, NorthEast, NorthEast),
            (SouthA, SouthEast, SouthEast),
            (EastA, SouthEast, SouthEast),
            (SouthA, WestA, SouthWest),
            (SouthA, NorthA, VSouthToNorth),
            (SouthA, EastA, SouthEast),
            (WestA, NorthA, NorthWest),
            (WestA, EastA, VWestToEast),
            (NorthA, EastA, NorthEast),
            (SouthA, VWestToEast, SouthB),
            (WestA, VSouthToNorth, WestB),
            (NorthA, VWestToEast, NorthB),
            (EastA, VSouthToNorth, EastB),
            (SouthWest, SouthB, SouthB),
            (SouthWest, WestB, WestB),
            (NorthWest, NorthB, NorthB),
            (NorthWest, WestB, WestB),
            (NorthEast, NorthB, NorthB),
            (NorthEast, EastB, EastB),
            (SouthEast, SouthB, SouthB),
            (SouthEast, EastB, EastB),
        ],
    );

    // A one-corner ramp meeting any three-corner ramp yields the latter.
    for a in SouthA.index()..=EastA.index() {
        for b in SouthB.index()..=EastB.index() {
            table[a][b] = Some(TileType::ALL[b]);
        }
    }

    mirror(&mut table);
    table
}

fn lowering_table() -> ProduceTable {
    use TileType::*;

    let mut table = base_table();
    apply_rules(
        &mut table,
        &[
            (SouthWest, NorthWest, WestA),
            (SouthWest, SouthEast, SouthA),
            (SouthWest, SouthB, SouthWest),
            (SouthWest, WestB, SouthWest),
            (NorthWest, NorthEast, NorthA),
            (NorthWest, WestB, NorthWest),
            (NorthWest, NorthB, NorthWest),
            (NorthEast, SouthEast, EastA),
            (NorthEast, NorthB, NorthEast),
            (NorthEast, EastB, NorthEast),
            (SouthEast, SouthB, SouthEast),
            (SouthEast, EastB, SouthEast),
            (SouthB, WestB, SouthWest),
            (SouthB, EastB, SouthEast),
            (WestB, NorthB, NorthWest),
            (NorthB, EastB, NorthEast),
            (SouthB, VWestToEast, SouthA),
            (WestB, VSouthToNorth, WestA),
            (NorthB, VWestToEast, NorthA),
            (EastB, VSouthToNorth, EastA),
            (SouthA, SouthWest, SouthA),
            (WestA, SouthWest, WestA),
            (NorthA, NorthWest, NorthA),
            (WestA, NorthWest, WestA),
            (NorthA, NorthEast, NorthA),
            (EastA, NorthEast, EastA),
            (SouthA, SouthEast, SouthA),
            (EastA, SouthEast, EastA),
        ],
    );

    // A one-corner ramp meeting any three-corner ramp yields the former.
    for a in SouthA.index()..=EastA.index() {
        for b in SouthB.index()..=EastB.index() {
            table[a][b] = Some(TileType::ALL[a]);
        }
    }

    mirror(&mut table);
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::UVec2;

    fn flat_terrain(dimension: UVec2) -> Terrain {
        Terrain::filled(dimension, Tile::default()).unwrap()
    }

    fn tile_at(modifier: &TerrainModifier, x: i32, y: i32) -> Tile {
        modifier.tiles[modifier.tile_index(IVec2::new(x, y))]
    }

    #[test]
    fn test_tables_are_symmetric() {
        let raising = raising_table();
        let lowering = lowering_table();
        for i in 0..TILE_TYPE_COUNT {
            for j in 0..TILE_TYPE_COUNT {
                assert_eq!(raising[i][j], raising[j][i]);
                assert_eq!(lowering[i][j], lowering[j][i]);
            }
        }
    }

    #[test]
    fn test_flat_row_is_identity() {
        let raising = raising_table();
        for (i, kind) in TileType::ALL.into_iter().enumerate() {
            assert_eq!(raising[TileType::Flat.index()][i], Some(kind));
            assert_eq!(raising[i][TileType::Flat.index()], Some(kind));
        }
    }

    #[test]
    fn test_diagonal_is_identity() {
        // A type meeting itself always produces itself, in both tables.
        let raising = raising_table();
        let lowering = lowering_table();
        for (i, kind) in TileType::ALL.into_iter().enumerate() {
            assert_eq!(raising[i][i], Some(kind));
            assert_eq!(lowering[i][i], Some(kind));
        }
    }

    #[test]
    fn test_matching_neighbor_is_left_unchanged() {
        // (3, 4) already holds exactly the ramp a raise at (3, 3) wants
        // there; the self-identity produce must leave it as is.
        let dimension = UVec2::new(8, 8);
        let mut tiles = vec![Tile::default(); 64];
        tiles[4 * 8 + 3] = Tile::new(TileType::SouthWest, 0, false, 0.0);
        let terrain = Terrain::new(dimension, tiles).unwrap();

        let mut modifier = TerrainModifier::new(&terrain);
        modifier.raise_ground(IVec2::new(3, 3));

        assert_eq!(tile_at(&modifier, 3, 4).kind, TileType::SouthWest);
        assert_eq!(tile_at(&modifier, 3, 4).level, 0);
    }

    #[test]
    fn test_propagation_stays_bounded_on_flat_grid() {
        // Worst case on an all-flat grid: one edit reaches the edited tile
        // and its 8 neighbors, nothing further. A corner edit reaches 4.
        let terrain = flat_terrain(UVec2::new(64, 64));
        let mut modifier = TerrainModifier::new(&terrain);
        modifier.raise_ground(IVec2::new(0, 0));
        modifier.raise_ground(IVec2::new(32, 32));

        let changed = modifier
            .tiles()
            .iter()
            .filter(|t| **t != Tile::default())
            .count();
        assert_eq!(changed, 4 + 9);
    }

    #[test]
    fn test_raise_on_flat_field_forms_a_plateau() {
        let terrain = flat_terrain(UVec2::new(8, 8));
        let mut modifier = TerrainModifier::new(&terrain);
        modifier.raise_ground(IVec2::new(3, 3));

        let center = tile_at(&modifier, 3, 3);
        assert_eq!(center.kind, TileType::Flat);
        assert_eq!(center.level, 1);

        // Cardinal neighbors become edge ramps at ground level.
        assert_eq!(tile_at(&modifier, 3, 4).kind, TileType::SouthWest);
        assert_eq!(tile_at(&modifier, 2, 3).kind, TileType::NorthWest);
        assert_eq!(tile_at(&modifier, 3, 2).kind, TileType::NorthEast);
        assert_eq!(tile_at(&modifier, 4, 3).kind, TileType::SouthEast);

        // Diagonal neighbors become single-corner ramps.
        assert_eq!(tile_at(&modifier, 4, 4).kind, TileType::SouthA);
        assert_eq!(tile_at(&modifier, 2, 4).kind, TileType::WestA);
        assert_eq!(tile_at(&modifier, 2, 2).kind, TileType::NorthA);
        assert_eq!(tile_at(&modifier, 4, 2).kind, TileType::EastA);

        for (x, y) in [(3, 4), (2, 3), (3, 2), (4, 3), (4, 4), (2, 4), (2, 2), (4, 2)] {
            assert_eq!(tile_at(&modifier, x, y).level, 0);
        }

        // Tiles two steps out are untouched.
        assert_eq!(tile_at(&modifier, 3, 5), Tile::default());
        assert_eq!(tile_at(&modifier, 5, 5), Tile::default());
    }

    #[test]
    fn test_second_raise_extends_the_slope() {
        let terrain = flat_terrain(UVec2::new(16, 16));
        let mut modifier = TerrainModifier::new(&terrain);
        modifier.raise_ground(IVec2::new(5, 5));
        modifier.raise_ground(IVec2::new(5, 5));

        let center = tile_at(&modifier, 5, 5);
        assert_eq!(center.kind, TileType::Flat);
        assert_eq!(center.level, 2);

        // The first ring climbs to level 1, a second ring forms below it.
        let first_ring = tile_at(&modifier, 5, 6);
        assert_eq!(first_ring.kind, TileType::SouthWest);
        assert_eq!(first_ring.level, 1);
        let second_ring = tile_at(&modifier, 5, 7);
        assert_eq!(second_ring.kind, TileType::SouthWest);
        assert_eq!(second_ring.level, 0);
    }

    #[test]
    fn test_raise_at_corner_stays_in_bounds() {
        let terrain = flat_terrain(UVec2::new(8, 8));
        let mut modifier = TerrainModifier::new(&terrain);
        modifier.raise_ground(IVec2::new(0, 0));

        assert_eq!(tile_at(&modifier, 0, 0).kind, TileType::Flat);
        assert_eq!(tile_at(&modifier, 0, 0).level, 1);
        assert_eq!(tile_at(&modifier, 0, 1).kind, TileType::SouthWest);
        assert_eq!(tile_at(&modifier, 1, 0).kind, TileType::SouthEast);
        // The diagonal still expands because both of its cardinals did.
        assert_eq!(tile_at(&modifier, 1, 1).kind, TileType::SouthA);
    }

    #[test]
    fn test_lower_on_flat_field_digs_a_pit() {
        let terrain = flat_terrain(UVec2::new(8, 8));
        let mut modifier = TerrainModifier::new(&terrain);
        modifier.lower_ground(IVec2::new(3, 3));

        let center = tile_at(&modifier, 3, 3);
        assert_eq!(center.kind, TileType::Flat);
        assert_eq!(center.level, -1);

        // The pit walls slope down toward the center.
        assert_eq!(tile_at(&modifier, 3, 4).kind, TileType::NorthEast);
        assert_eq!(tile_at(&modifier, 2, 3).kind, TileType::SouthEast);
        assert_eq!(tile_at(&modifier, 3, 2).kind, TileType::SouthWest);
        assert_eq!(tile_at(&modifier, 4, 3).kind, TileType::NorthWest);
        assert_eq!(tile_at(&modifier, 4, 4).kind, TileType::NorthB);
        assert_eq!(tile_at(&modifier, 2, 4).kind, TileType::EastB);
        assert_eq!(tile_at(&modifier, 2, 2).kind, TileType::SouthB);
        assert_eq!(tile_at(&modifier, 4, 2).kind, TileType::WestB);

        // Ramp bases sit one level below ground so their raised corners
        // meet the surrounding surface.
        assert_eq!(tile_at(&modifier, 3, 4).level, -1);
        assert_eq!(tile_at(&modifier, 4, 4).level, -1);
    }

    #[test]
    fn test_single_tile_edits_do_not_propagate() {
        let terrain = flat_terrain(UVec2::new(8, 8));
        let mut modifier = TerrainModifier::new(&terrain);
        modifier.raise_tile(IVec2::new(2, 2));
        modifier.lower_tile(IVec2::new(5, 5));

        assert_eq!(tile_at(&modifier, 2, 2).level, 1);
        assert_eq!(tile_at(&modifier, 5, 5).level, -1);
        assert_eq!(tile_at(&modifier, 2, 3), Tile::default());
        assert_eq!(tile_at(&modifier, 3, 2), Tile::default());
    }

    #[test]
    fn test_edits_are_staged_until_update() {
        let mut terrain = flat_terrain(UVec2::new(8, 8));
        let mut modifier = TerrainModifier::new(&terrain);
        modifier.raise_ground(IVec2::new(3, 3));

        // The terrain still holds the old data.
        assert!(terrain.tiles().iter().all(|t| *t == Tile::default()));

        modifier.update_terrain(&mut terrain);
        assert_eq!(terrain.tiles(), modifier.tiles());
        assert_eq!(terrain.tile(IVec2::new(3, 3)).unwrap().level, 1);
    }
}
