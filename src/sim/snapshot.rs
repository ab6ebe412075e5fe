/// Read-only frame view for a presentation layer.
///
/// A `Snapshot` owns copies of everything it shows. Holding or mutating
/// one never reaches back into the session.

use crate::domain::agent::AgentState;
use crate::domain::avatar::AvatarState;
use crate::domain::entity::GridPos;
use crate::domain::tile::Tile;

use super::world::{Phase, WorldState};

#[derive(Clone, Debug, PartialEq)]
pub struct HoleView {
    pub pos: GridPos,
    pub remaining: f32,
    pub warning: bool,
}

#[derive(Clone, Debug)]
pub struct Snapshot {
    // ── HUD ──
    pub phase: Phase,
    pub lives: u32,
    pub elapsed: f32,
    pub level_id: u32,
    pub level_name: String,
    pub par: f32,
    pub collected: u32,
    pub total_pickups: usize,

    // ── Board ──
    pub width: usize,
    pub height: usize,
    pub tiles: Vec<Vec<Tile>>,
    pub pickups: Vec<GridPos>,
    pub exit: GridPos,
    pub exit_revealed: bool,
    pub holes: Vec<HoleView>,

    // ── Actors ──
    pub avatar: AvatarState,
    pub agents: Vec<AgentState>,
}

impl Snapshot {
    pub fn capture(world: &WorldState) -> Self {
        let terrain = &world.terrain;
        Snapshot {
            phase: world.phase,
            lives: world.lives,
            elapsed: world.elapsed,
            level_id: world.level_id,
            level_name: world.level_name.clone(),
            par: world.par,
            collected: world.collected,
            total_pickups: terrain.total_pickups(),
            width: terrain.width(),
            height: terrain.height(),
            tiles: terrain.rows(),
            pickups: terrain.pickups(),
            exit: terrain.exit(),
            exit_revealed: terrain.is_exit_revealed(),
            holes: world
                .holes
                .holes()
                .iter()
                .map(|h| HoleView { pos: h.pos(), remaining: h.remaining(), warning: h.is_warning() })
                .collect(),
            avatar: world.avatar.clone(),
            agents: world.agents.clone(),
        }
    }

    /// Tile at `pos`; Stone off the board, matching terrain queries.
    pub fn tile_at(&self, pos: GridPos) -> Tile {
        if pos.x < 0 || pos.y < 0 {
            return Tile::Stone;
        }
        self.tiles
            .get(pos.y as usize)
            .and_then(|row| row.get(pos.x as usize))
            .copied()
            .unwrap_or(Tile::Stone)
    }

    pub fn hole_at(&self, pos: GridPos) -> Option<&HoleView> {
        self.holes.iter().find(|h| h.pos == pos)
    }

    /// First agent (spawn order) whose cell is `pos`.
    pub fn agent_at(&self, pos: GridPos) -> Option<&AgentState> {
        self.agents.iter().find(|a| a.grid() == pos)
    }
}
