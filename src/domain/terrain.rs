/// Terrain model: tile grid + dig/fill overlay + pickup set + exit.
///
/// ## Layers
///
///   - `tiles`    : the effective grid. A dug cell reads `Tile::Hole`.
///   - `concealed`: the tile kind hidden under each dug cell.
///                   An entry exists iff the cell currently reads `Hole`.
///   - `pickups`  : overlay set, independent of tiles.
///   - `exit` / `exit_revealed`: overlay, revealed once pickups run out.
///
/// ## Support
///
/// ┌──────────────────────────────┬───────────┐
/// │ Condition                    │ Support?  │
/// ├──────────────────────────────┼───────────┤
/// │ below is Brick/Stone/Ladder  │ YES       │
/// │ here is Ladder               │ YES       │
/// │ out-of-bounds below (Stone)  │ YES       │
/// │ Otherwise                    │ NO        │
/// └──────────────────────────────┴───────────┘
///
/// Out-of-bounds queries read `Stone`, so the map edge is always solid.

use std::collections::{BTreeSet, HashMap};

use super::entity::GridPos;
use super::tile::Tile;

#[derive(Clone, Debug)]
pub struct Terrain {
    width: usize,
    height: usize,
    tiles: Vec<Vec<Tile>>,
    concealed: HashMap<GridPos, Tile>,
    pickups: BTreeSet<GridPos>,
    total_pickups: usize,
    exit: GridPos,
    exit_revealed: bool,
}

impl Terrain {
    /// Build from a row-major grid. Rows shorter than `width` (or missing)
    /// are padded with `Empty`; extra cells are dropped.
    pub fn new(
        width: usize,
        height: usize,
        rows: Vec<Vec<Tile>>,
        pickups: impl IntoIterator<Item = GridPos>,
        exit: GridPos,
    ) -> Self {
        let mut tiles = vec![vec![Tile::Empty; width]; height];
        for (y, row) in rows.into_iter().take(height).enumerate() {
            for (x, tile) in row.into_iter().take(width).enumerate() {
                tiles[y][x] = tile;
            }
        }
        let pickups: BTreeSet<GridPos> = pickups.into_iter().collect();
        Terrain {
            width,
            height,
            tiles,
            concealed: HashMap::new(),
            total_pickups: pickups.len(),
            pickups,
            exit,
            exit_revealed: false,
        }
    }

    /// A 0×0 terrain: every query reads Stone. Used before any level loads.
    pub fn empty() -> Self {
        Terrain::new(0, 0, vec![], [], GridPos::default())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn in_bounds(&self, pos: GridPos) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as usize) < self.width && (pos.y as usize) < self.height
    }

    // ── Tile queries ──

    #[inline]
    pub fn tile_at(&self, pos: GridPos) -> Tile {
        if !self.in_bounds(pos) {
            return Tile::Stone; // out of bounds = wall
        }
        self.tiles[pos.y as usize][pos.x as usize]
    }

    pub fn is_walkable(&self, pos: GridPos) -> bool {
        self.tile_at(pos).is_walkable()
    }

    pub fn is_climbable(&self, pos: GridPos) -> bool {
        self.tile_at(pos).is_climbable()
    }

    pub fn is_hangable(&self, pos: GridPos) -> bool {
        self.tile_at(pos).is_hangable()
    }

    pub fn is_diggable(&self, pos: GridPos) -> bool {
        self.tile_at(pos).is_diggable()
    }

    pub fn is_hole(&self, pos: GridPos) -> bool {
        self.tile_at(pos) == Tile::Hole
    }

    /// See the support table above.
    pub fn has_support(&self, pos: GridPos) -> bool {
        if self.tile_at(pos.below()).is_walkable() {
            return true;
        }
        self.is_climbable(pos)
    }

    /// Row-major copy of the effective grid.
    pub fn rows(&self) -> Vec<Vec<Tile>> {
        self.tiles.clone()
    }

    /// Tile hidden under an active hole, if any.
    pub fn concealed_at(&self, pos: GridPos) -> Option<Tile> {
        self.concealed.get(&pos).copied()
    }

    // ── Dig / fill ──

    /// Excavate a brick. Returns false (no mutation) unless diggable.
    pub fn dig_hole(&mut self, pos: GridPos) -> bool {
        if !self.is_diggable(pos) {
            return false;
        }
        let (x, y) = (pos.x as usize, pos.y as usize);
        self.concealed.insert(pos, self.tiles[y][x]);
        self.tiles[y][x] = Tile::Hole;
        true
    }

    /// Restore the concealed tile. No-op if nothing is concealed at `pos`.
    pub fn fill_hole(&mut self, pos: GridPos) {
        if let Some(original) = self.concealed.remove(&pos) {
            self.tiles[pos.y as usize][pos.x as usize] = original;
        }
    }

    // ── Pickups / exit ──

    pub fn has_pickup(&self, pos: GridPos) -> bool {
        self.pickups.contains(&pos)
    }

    /// Avatar collects a pickup. Reveals the exit once the set empties.
    pub fn collect_pickup(&mut self, pos: GridPos) -> bool {
        if !self.pickups.remove(&pos) {
            return false;
        }
        if self.pickups.is_empty() {
            self.reveal_exit();
        }
        true
    }

    /// An agent carries a pickup away. The pickup is still in play, so the
    /// exit stays as it is.
    pub fn take_pickup(&mut self, pos: GridPos) -> bool {
        self.pickups.remove(&pos)
    }

    /// Put a pickup back (dropped by an agent). Hides a revealed exit.
    pub fn add_pickup(&mut self, pos: GridPos) {
        if self.pickups.insert(pos) && self.exit_revealed {
            self.exit_revealed = false;
        }
    }

    pub fn reveal_exit(&mut self) {
        self.exit_revealed = true;
    }

    pub fn is_exit_revealed(&self) -> bool {
        self.exit_revealed
    }

    pub fn exit(&self) -> GridPos {
        self.exit
    }

    pub fn remaining_pickups(&self) -> usize {
        self.pickups.len()
    }

    /// Fixed at construction.
    pub fn total_pickups(&self) -> usize {
        self.total_pickups
    }

    /// Pickup positions in (x, y) order.
    pub fn pickups(&self) -> Vec<GridPos> {
        self.pickups.iter().copied().collect()
    }
}
