/// Shared entity vocabulary: grid/continuous positions, facing, input direction.
///
/// Terrain and pathfinding work on `GridPos` (integer cells).
/// Avatar and agents move on `Position` (f32, sub-tile); the floor of a
/// `Position` is the cell it occupies.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub const fn new(x: i32, y: i32) -> Self {
        GridPos { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        GridPos { x: self.x + dx, y: self.y + dy }
    }

    pub fn above(self) -> Self {
        self.offset(0, -1)
    }

    pub fn below(self) -> Self {
        self.offset(0, 1)
    }

    /// Continuous position of the cell's top-left corner.
    pub fn to_position(self) -> Position {
        Position::new(self.x as f32, self.y as f32)
    }
}

#[derive(Clone, Copy, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32) -> Self {
        Position { x, y }
    }

    pub fn grid(self) -> GridPos {
        GridPos::new(self.x.floor() as i32, self.y.floor() as i32)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Facing {
    Left,
    Right,
}

/// Movement / dig direction. "No input" is `Option::<Direction>::None`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    /// Horizontal component as a facing; `None` for Up/Down.
    pub fn facing(self) -> Option<Facing> {
        match self {
            Direction::Left => Some(Facing::Left),
            Direction::Right => Some(Facing::Right),
            Direction::Up | Direction::Down => None,
        }
    }
}
