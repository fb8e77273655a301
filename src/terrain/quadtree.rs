//! Spatial quad-tree over the terrain grid
//!
//! The tree spans the smallest power-of-two chunk-count square covering the
//! terrain, anchored at the terrain origin, and is subdivided down to single
//! tiles. Quadrants falling entirely outside the real (non-padded) terrain
//! rectangle produce no node. Nodes live in a single arena and reference
//! their children by index.

use crate::core::types::{IVec2, UVec2, Vec3};
use crate::math::{Aabb, Containment, Frustum, Ray};
use super::grid::CHUNK_DIMENSION;
use super::tile::{tile_world_position, Tile, TileType, HEIGHT_PER_LEVEL, TILE_SIZE};

/// One quad-tree node
#[derive(Clone, Copy, Debug)]
pub struct Node {
    /// Arena indices of the 4 children; `None` for off-terrain quadrants
    /// and for leaf nodes
    pub children: [Option<u32>; 4],
    /// World-space bounds of the subtree
    pub aabb: Aabb,
    /// Mesh chunk index, set only on nodes exactly covering one chunk
    pub chunk: Option<u32>,
    /// Tile index, set only on single-tile leaf nodes
    pub tile: Option<u32>,
    /// Whether this subtree contains visible water (water tree only)
    pub has_water: bool,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            children: [None; 4],
            aabb: Aabb::default(),
            chunk: None,
            tile: None,
            has_water: false,
        }
    }
}

impl Node {
    /// Leaf nodes cover exactly one tile
    pub fn is_leaf(&self) -> bool {
        self.tile.is_some()
    }
}

/// Integer rectangle in tile coordinates
#[derive(Clone, Copy, Debug)]
struct Rect {
    pos: IVec2,
    size: IVec2,
}

impl Rect {
    fn new(pos: IVec2, size: IVec2) -> Self {
        Self { pos, size }
    }

    /// Area of the intersection of two rectangles, 0 when disjoint
    fn intersection_area(a: Rect, b: Rect) -> i32 {
        let min = a.pos.max(b.pos);
        let max = (a.pos + a.size).min(b.pos + b.size);
        let overlap = (max - min).max(IVec2::ZERO);
        overlap.x * overlap.y
    }

    /// The 4 equal quadrants in top-left, top-right, bottom-left,
    /// bottom-right order
    fn quadrants(&self) -> [Rect; 4] {
        let half = self.size / 2;
        [
            Rect::new(self.pos, half),
            Rect::new(self.pos + IVec2::new(half.x, 0), half),
            Rect::new(self.pos + IVec2::new(0, half.y), half),
            Rect::new(self.pos + half, half),
        ]
    }
}

/// Quad-tree arena with a dedicated build mode for the terrain surface and
/// the water layer
pub struct QuadTree {
    nodes: Vec<Node>,
    root: Option<u32>,
}

/// Side length in tiles of the power-of-two padded square the tree spans
pub fn padded_dimension(dimension: UVec2) -> i32 {
    let long_side_chunks = dimension.x.max(dimension.y) / CHUNK_DIMENSION;
    (long_side_chunks.next_power_of_two() * CHUNK_DIMENSION) as i32
}

/// Closed-form maximum node count for a padded square of `n` tiles.
///
/// Every level of a full 4-ary tree over n leaves sums to (n-1)/3 internal
/// nodes plus the n leaves.
fn max_node_count(n: i64) -> usize {
    ((1 - n) / -3 + n) as usize
}

impl QuadTree {
    /// Build the terrain-surface tree.
    ///
    /// Leaf bounds are derived from each tile's ramp geometry and altitude;
    /// nodes exactly covering one mesh chunk are stamped with the chunk
    /// index.
    pub fn build_terrain(dimension: UVec2, tiles: &[Tile]) -> QuadTree {
        let side = padded_dimension(dimension);
        let mut nodes = Vec::with_capacity(max_node_count(side as i64 * side as i64));

        let root_rect = Rect::new(IVec2::ZERO, IVec2::splat(side));
        let root = Self::build_terrain_node(&mut nodes, root_rect, dimension, tiles);

        QuadTree { nodes, root }
    }

    /// Build the water-layer tree.
    ///
    /// Geometrically identical to the terrain tree, but leaf bounds sit at
    /// the water altitude and a subtree only contributes to its parent's
    /// bounds when it contains visible water.
    pub fn build_water(dimension: UVec2, tiles: &[Tile]) -> QuadTree {
        let side = padded_dimension(dimension);
        let mut nodes = Vec::with_capacity(max_node_count(side as i64 * side as i64));

        let root_rect = Rect::new(IVec2::ZERO, IVec2::splat(side));
        let root = Self::build_water_node(&mut nodes, root_rect, dimension, tiles);

        QuadTree { nodes, root }
    }

    fn build_terrain_node(
        nodes: &mut Vec<Node>,
        rect: Rect,
        dimension: UVec2,
        tiles: &[Tile],
    ) -> Option<u32> {
        let terrain_rect = Rect::new(IVec2::ZERO, dimension.as_ivec2());
        if Rect::intersection_area(terrain_rect, rect) == 0 {
            return None;
        }

        let index = nodes.len() as u32;
        nodes.push(Node::default());

        if rect.size.x * rect.size.y == 1 {
            let tile_index = rect.pos.y * dimension.x as i32 + rect.pos.x;
            let tile = &tiles[tile_index as usize];

            nodes[index as usize].tile = Some(tile_index as u32);
            nodes[index as usize].aabb = terrain_leaf_aabb(rect.pos, tile);
        } else {
            if rect.size.x == CHUNK_DIMENSION as i32 {
                let chunk_pos = rect.pos / CHUNK_DIMENSION as i32;
                let row_chunks = (dimension.x / CHUNK_DIMENSION) as i32;
                nodes[index as usize].chunk =
                    Some((chunk_pos.y * row_chunks + chunk_pos.x) as u32);
            }

            for (slot, quadrant) in rect.quadrants().into_iter().enumerate() {
                let child = Self::build_terrain_node(nodes, quadrant, dimension, tiles);
                nodes[index as usize].children[slot] = child;
            }

            // The first quadrant shares the region's origin corner with the
            // terrain, so it is never None here.
            let mut aabb = nodes[nodes[index as usize].children[0].unwrap() as usize].aabb;
            for slot in 1..4 {
                if let Some(child) = nodes[index as usize].children[slot] {
                    aabb = aabb.merged(&nodes[child as usize].aabb);
                }
            }
            nodes[index as usize].aabb = aabb;
        }

        Some(index)
    }

    fn build_water_node(
        nodes: &mut Vec<Node>,
        rect: Rect,
        dimension: UVec2,
        tiles: &[Tile],
    ) -> Option<u32> {
        let terrain_rect = Rect::new(IVec2::ZERO, dimension.as_ivec2());
        if Rect::intersection_area(terrain_rect, rect) == 0 {
            return None;
        }

        let index = nodes.len() as u32;
        nodes.push(Node::default());

        if rect.size.x * rect.size.y == 1 {
            let tile_index = rect.pos.y * dimension.x as i32 + rect.pos.x;
            let tile = &tiles[tile_index as usize];

            let mut pos = tile_world_position(rect.pos);
            pos.y = tile.water_altitude;
            let half = Vec3::new(TILE_SIZE * 0.5, 0.0, TILE_SIZE * 0.5);

            let node = &mut nodes[index as usize];
            node.tile = Some(tile_index as u32);
            node.aabb = Aabb::new(pos - half, pos + half);
            node.has_water = tile.is_water_visible();
        } else {
            for (slot, quadrant) in rect.quadrants().into_iter().enumerate() {
                let child = Self::build_water_node(nodes, quadrant, dimension, tiles);
                nodes[index as usize].children[slot] = child;
            }

            // Only subtrees containing visible water contribute to the
            // parent bounds; a dry node keeps a placeholder box that is
            // never unioned upward.
            let children = nodes[index as usize].children;
            let mut aabb: Option<Aabb> = None;
            let mut has_water = false;
            for child in children.into_iter().flatten() {
                let child_node = &nodes[child as usize];
                if child_node.has_water {
                    has_water = true;
                    aabb = Some(match aabb {
                        Some(a) => a.merged(&child_node.aabb),
                        None => child_node.aabb,
                    });
                }
            }

            let fallback = nodes[children[0].unwrap() as usize].aabb;
            let node = &mut nodes[index as usize];
            node.aabb = aabb.unwrap_or(fallback);
            node.has_water = has_water;
        }

        Some(index)
    }

    /// Arena index of the root node, None for an empty tree
    pub fn root(&self) -> Option<u32> {
        self.root
    }

    /// Access a node by arena index
    pub fn node(&self, index: u32) -> &Node {
        &self.nodes[index as usize]
    }

    /// Number of allocated nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Collect the chunk indices of all chunk nodes at least partially
    /// inside the frustum, in natural traversal order.
    pub fn visible_chunks(&self, frustum: &Frustum) -> Vec<u32> {
        let mut chunks = Vec::new();
        if let Some(root) = self.root {
            self.gather_chunks(root, frustum, false, &mut chunks);
        }
        chunks
    }

    fn gather_chunks(&self, index: u32, frustum: &Frustum, parent_inside: bool, out: &mut Vec<u32>) {
        let node = &self.nodes[index as usize];

        let mut containment = Containment::Inside;
        if !parent_inside {
            containment = frustum.classify_aabb(&node.aabb);
            if containment == Containment::Outside {
                return;
            }
        }

        if let Some(chunk) = node.chunk {
            out.push(chunk);
        } else {
            let inside = containment == Containment::Inside;
            for child in node.children.into_iter().flatten() {
                self.gather_chunks(child, frustum, inside, out);
            }
        }
    }

    /// Collect the tile indices of all leaf nodes inside the frustum that
    /// pass the visibility predicate, in natural traversal order.
    pub fn visible_tiles<F>(&self, frustum: &Frustum, is_visible: F) -> Vec<u32>
    where
        F: Fn(u32) -> bool,
    {
        let mut tiles = Vec::new();
        if let Some(root) = self.root {
            self.gather_tiles(root, frustum, false, &is_visible, &mut tiles);
        }
        tiles
    }

    fn gather_tiles<F>(
        &self,
        index: u32,
        frustum: &Frustum,
        parent_inside: bool,
        is_visible: &F,
        out: &mut Vec<u32>,
    ) where
        F: Fn(u32) -> bool,
    {
        let node = &self.nodes[index as usize];

        let mut containment = Containment::Inside;
        if !parent_inside {
            containment = frustum.classify_aabb(&node.aabb);
            if containment == Containment::Outside {
                return;
            }
        }

        if let Some(tile) = node.tile {
            if is_visible(tile) {
                out.push(tile);
            }
        } else {
            let inside = containment == Containment::Inside;
            for child in node.children.into_iter().flatten() {
                self.gather_tiles(child, frustum, inside, is_visible, out);
            }
        }
    }

    /// Walk the tree along a ray, invoking the callback with the tile index
    /// of every leaf whose bounds the ray enters.
    pub fn raycast_leaves<F>(&self, ray: &Ray, mut on_leaf: F)
    where
        F: FnMut(u32),
    {
        if let Some(root) = self.root {
            self.raycast_node(root, ray, &mut on_leaf);
        }
    }

    fn raycast_node<F>(&self, index: u32, ray: &Ray, on_leaf: &mut F)
    where
        F: FnMut(u32),
    {
        let node = &self.nodes[index as usize];

        if ray.intersects_aabb(&node.aabb).is_none() {
            return;
        }

        if let Some(tile) = node.tile {
            on_leaf(tile);
        } else {
            for child in node.children.into_iter().flatten() {
                self.raycast_node(child, ray, on_leaf);
            }
        }
    }
}

/// Bounds of a single terrain tile: a `TILE_SIZE` square at the tile's base
/// altitude, with one level of headroom when the tile is not flat.
fn terrain_leaf_aabb(location: IVec2, tile: &Tile) -> Aabb {
    let mut pos = tile_world_position(location);
    pos.y = tile.altitude();

    let half = Vec3::new(TILE_SIZE * 0.5, 0.0, TILE_SIZE * 0.5);
    let mut aabb = Aabb::new(pos - half, pos + half);

    if tile.kind != TileType::Flat {
        aabb.max.y = pos.y + HEIGHT_PER_LEVEL;
    }

    aabb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Plane;

    fn flat_tiles(dimension: UVec2) -> Vec<Tile> {
        vec![Tile::default(); (dimension.x * dimension.y) as usize]
    }

    /// Frustum accepting everything
    fn open_frustum() -> Frustum {
        Frustum::new([Plane::new(Vec3::Y, 1.0e9); 4])
    }

    /// Frustum clamping world x and z to [min, max]
    fn rect_frustum(min: f32, max: f32) -> Frustum {
        Frustum::new([
            Plane::new(Vec3::X, -min),
            Plane::new(-Vec3::X, max),
            Plane::new(Vec3::Z, -min),
            Plane::new(-Vec3::Z, max),
        ])
    }

    #[test]
    fn test_padded_dimension_rounds_up() {
        assert_eq!(padded_dimension(UVec2::new(8, 8)), 8);
        assert_eq!(padded_dimension(UVec2::new(16, 8)), 16);
        assert_eq!(padded_dimension(UVec2::new(24, 16)), 32);
        assert_eq!(padded_dimension(UVec2::new(64, 40)), 64);
    }

    #[test]
    fn test_every_tile_has_exactly_one_leaf() {
        let dimension = UVec2::new(24, 16);
        let tiles = flat_tiles(dimension);
        let tree = QuadTree::build_terrain(dimension, &tiles);

        let mut leaf_count = vec![0u32; tiles.len()];
        for i in 0..tree.len() {
            if let Some(tile) = tree.node(i as u32).tile {
                leaf_count[tile as usize] += 1;
            }
        }
        assert!(leaf_count.iter().all(|&c| c == 1));
    }

    #[test]
    fn test_parent_aabb_contains_children() {
        let dimension = UVec2::new(16, 8);
        let mut tiles = flat_tiles(dimension);
        tiles[3].kind = TileType::NorthWest;
        tiles[3].level = 2;
        tiles[100].level = 5;
        let tree = QuadTree::build_terrain(dimension, &tiles);

        for i in 0..tree.len() {
            let node = tree.node(i as u32);
            for child in node.children.into_iter().flatten() {
                assert!(
                    node.aabb.contains(&tree.node(child).aabb),
                    "node {i} does not contain child {child}"
                );
            }
        }
    }

    #[test]
    fn test_padded_quadrants_produce_no_nodes() {
        // 8x8 terrain in a 16x16 padded square: only the top-left chunk
        // quadrant of the root intersects the terrain.
        let dimension = UVec2::new(8, 8);
        let tiles = flat_tiles(dimension);
        let tree = QuadTree::build_terrain(UVec2::new(8, 16), &flat_tiles(UVec2::new(8, 16)));
        assert!(tree.root().is_some());

        let tree = QuadTree::build_terrain(dimension, &tiles);
        let root = tree.node(tree.root().unwrap());
        // 8x8 root region is exactly one chunk
        assert_eq!(root.chunk, Some(0));
    }

    #[test]
    fn test_non_square_terrain_has_null_children() {
        let dimension = UVec2::new(16, 8);
        let tiles = flat_tiles(dimension);
        let tree = QuadTree::build_terrain(dimension, &tiles);

        let root = tree.node(tree.root().unwrap());
        // Bottom half of the 16x16 padded square is off-terrain.
        assert!(root.children[0].is_some());
        assert!(root.children[1].is_some());
        assert!(root.children[2].is_none());
        assert!(root.children[3].is_none());
    }

    #[test]
    fn test_node_count_stays_within_reserve() {
        let dimension = UVec2::new(24, 16);
        let tiles = flat_tiles(dimension);
        let tree = QuadTree::build_terrain(dimension, &tiles);

        let side = padded_dimension(dimension) as i64;
        assert!(tree.len() <= max_node_count(side * side));
    }

    #[test]
    fn test_all_chunks_visible_in_open_frustum() {
        let dimension = UVec2::new(16, 16);
        let tiles = flat_tiles(dimension);
        let tree = QuadTree::build_terrain(dimension, &tiles);

        let mut chunks = tree.visible_chunks(&open_frustum());
        chunks.sort_unstable();
        assert_eq!(chunks, (0..4).collect::<Vec<u32>>());
    }

    #[test]
    fn test_restrictive_frustum_culls_far_chunks() {
        let dimension = UVec2::new(16, 16);
        let tiles = flat_tiles(dimension);
        let tree = QuadTree::build_terrain(dimension, &tiles);

        // A view clamped near the terrain origin overlaps only chunk 0.
        let near = TILE_SIZE * 1.5;
        let chunks = tree.visible_chunks(&rect_frustum(-near, near));
        assert_eq!(chunks, vec![0]);
    }

    #[test]
    fn test_restrictive_frustum_culls_far_water_tiles() {
        let dimension = UVec2::new(16, 16);
        let mut tiles = flat_tiles(dimension);
        for &i in &[0usize, 255] {
            tiles[i].has_water = true;
            tiles[i].water_altitude = 5.0;
        }
        let tree = QuadTree::build_water(dimension, &tiles);

        // The frustum fully contains the origin 8x8 quadrant, so traversal
        // below it runs on the parent-inside short-circuit; the far corner
        // tile is culled.
        let frustum = rect_frustum(-TILE_SIZE, TILE_SIZE * 8.0);
        let visible =
            tree.visible_tiles(&frustum, |t| tiles[t as usize].is_water_visible());
        assert_eq!(visible, vec![0]);
    }

    #[test]
    fn test_water_tree_tracks_visible_water() {
        let dimension = UVec2::new(8, 8);
        let mut tiles = flat_tiles(dimension);
        tiles[10].has_water = true;
        tiles[10].water_altitude = 12.0;
        let tree = QuadTree::build_water(dimension, &tiles);

        let root = tree.node(tree.root().unwrap());
        assert!(root.has_water);
        // Root bounds collapse to the single wet tile's plane.
        assert!((root.aabb.min.y - 12.0).abs() < 1e-5);
        assert!((root.aabb.max.y - 12.0).abs() < 1e-5);

        let visible = tree.visible_tiles(&open_frustum(), |t| tiles[t as usize].is_water_visible());
        assert_eq!(visible, vec![10]);
    }

    #[test]
    fn test_raycast_leaves_prunes_far_tiles() {
        let dimension = UVec2::new(8, 8);
        let tiles = flat_tiles(dimension);
        let tree = QuadTree::build_terrain(dimension, &tiles);

        // Straight down onto tile (2, 3): world x = SIZE*3, z = SIZE*2.
        let origin = Vec3::new(TILE_SIZE * 3.0, 100.0, TILE_SIZE * 2.0);
        let ray = Ray::new(origin, -Vec3::Y);

        let mut reached = Vec::new();
        tree.raycast_leaves(&ray, |tile| reached.push(tile));

        let expected = 3 * dimension.x + 2;
        assert!(reached.contains(&expected));
        // A vertical ray crosses at most the 4 tiles around the target
        // corner.
        assert!(reached.len() <= 4);
    }
}
