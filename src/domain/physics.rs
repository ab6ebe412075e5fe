/// Fall physics: shared by avatar and agents.
///
/// An actor FALLS if none of these hold:
///   - standing on a ladder (climbable tile at current cell)
///   - hanging on a bar (hangable tile at current cell AND already Hanging)
///   - terrain support at current cell (see `Terrain::has_support`)
///
/// A falling actor drops at a constant rate. Landing is checked against
/// the row it has fallen into; on landing the row snaps to an integer.
/// The column used for the landing check is the one the fall started in.

use super::entity::{GridPos, Position};
use super::terrain::Terrain;

pub fn should_fall(terrain: &Terrain, pos: Position, hanging: bool) -> bool {
    let cell = pos.grid();
    if terrain.is_climbable(cell) {
        return false;
    }
    if hanging && terrain.is_hangable(cell) {
        return false;
    }
    !terrain.has_support(cell)
}

/// Result of one fall step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FallStep {
    pub pos: Position,
    pub landed: bool,
}

/// Advance a fall by `rate * dt`, snapping onto the first supported row.
pub fn fall_step(terrain: &Terrain, pos: Position, rate: f32, dt: f32) -> FallStep {
    let column = pos.grid().x;
    let mut next = Position::new(pos.x, pos.y + rate * dt);
    let row = next.y.floor();
    if terrain.has_support(GridPos::new(column, row as i32)) {
        next.y = row;
        return FallStep { pos: next, landed: true };
    }
    FallStep { pos: next, landed: false }
}
