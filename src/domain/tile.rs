/// Tile kinds and their properties.
/// Properties are queried via methods, not stored as flags,
/// so tile semantics are centralized here.
///
/// Pickups and the exit are NOT tiles: they live in overlay sets on
/// `Terrain` so they can come and go without touching the grid.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum Tile {
    #[default]
    Empty,
    Brick,  // Solid + Diggable
    Stone,  // Solid only
    Ladder, // Climbable, also a floor
    Bar,    // Hangable (horizontal bar)
    Hole,   // Dug brick, concealed tile kept by Terrain
}

impl Tile {
    /// Decode one level-grid character. Markers (`$`, `E`) and anything
    /// unknown decode to `Empty`; the caller handles marker overlays.
    pub fn from_char(ch: char) -> Tile {
        match ch {
            '#' => Tile::Brick,
            'X' => Tile::Stone,
            'H' => Tile::Ladder,
            '-' => Tile::Bar,
            _ => Tile::Empty,
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Tile::Empty => '.',
            Tile::Brick => '#',
            Tile::Stone => 'X',
            Tile::Ladder => 'H',
            Tile::Bar => '-',
            Tile::Hole => 'O',
        }
    }

    /// Can an entity stand on top of this tile?
    pub fn is_walkable(self) -> bool {
        matches!(self, Tile::Brick | Tile::Stone | Tile::Ladder)
    }

    /// Brick or Stone: blocks a drop from a bar.
    pub fn is_solid(self) -> bool {
        matches!(self, Tile::Brick | Tile::Stone)
    }

    pub fn is_diggable(self) -> bool {
        matches!(self, Tile::Brick)
    }

    pub fn is_climbable(self) -> bool {
        matches!(self, Tile::Ladder)
    }

    pub fn is_hangable(self) -> bool {
        matches!(self, Tile::Bar)
    }
}
