/// WorldState: everything one session owns.
///
/// ## Ownership
///
/// The world is the single owner of the terrain, the avatar, every agent
/// and the hole manager. Entity states are values: `step` takes one out,
/// runs a transition, and writes the successor back. Nothing outside
/// `sim` holds a reference across a tick; readers get copies (see
/// `snapshot`).
///
/// ## Phases
///
///   Title ──load──▶ Playing ◀──pause/resume──▶ Paused
///                      │
///                      ├── avatar on revealed exit ──▶ Win   (terminal)
///                      └── lives reach zero ─────────▶ Lose  (terminal)
///
/// Terminal phases only leave through a reload or restart.

use crate::config::SimConfig;
use crate::domain::agent::AgentState;
use crate::domain::avatar::AvatarState;
use crate::domain::entity::GridPos;
use crate::domain::hole::HoleManager;
use crate::domain::terrain::Terrain;

use super::level::{LevelData, LEVEL_HEIGHT, LEVEL_WIDTH};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Title,
    Playing,
    Paused,
    Win,
    Lose,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Win | Phase::Lose)
    }
}

#[derive(Clone, Debug)]
pub struct WorldState {
    // ── Session ──
    pub phase: Phase,
    pub lives: u32,
    pub elapsed: f32,
    /// 0 until a level has been loaded.
    pub level_id: u32,
    pub level_name: String,
    pub par: f32,
    pub collected: u32,

    // ── Simulation ──
    pub terrain: Terrain,
    pub avatar: AvatarState,
    pub agents: Vec<AgentState>,
    pub holes: HoleManager,
    pub spawn: GridPos,

    pub config: SimConfig,
}

impl WorldState {
    /// The pre-game session: Title phase, no terrain, nothing to tick.
    pub fn new(config: SimConfig) -> Self {
        WorldState {
            phase: Phase::Title,
            lives: config.lives,
            elapsed: 0.0,
            level_id: 0,
            level_name: String::new(),
            par: 0.0,
            collected: 0,
            terrain: Terrain::empty(),
            avatar: AvatarState::spawn(GridPos::default()),
            agents: vec![],
            holes: HoleManager::new(config.timing.hole_timeout, config.timing.hole_warning),
            spawn: GridPos::default(),
            config,
        }
    }

    /// A fresh Playing session for `level`. The record must already have
    /// passed `LevelData::validate`.
    pub fn from_level(level: &LevelData, config: SimConfig) -> Self {
        let replan = config.timing.replan_interval;
        let agents = level
            .agent_spawns
            .iter()
            .enumerate()
            .map(|(id, &at)| AgentState::spawn(id, at, replan))
            .collect();
        WorldState {
            phase: Phase::Playing,
            lives: config.lives,
            elapsed: 0.0,
            level_id: level.id,
            level_name: level.name.clone(),
            par: level.par,
            collected: 0,
            terrain: level.build_terrain(LEVEL_WIDTH, LEVEL_HEIGHT),
            avatar: AvatarState::spawn(level.avatar_spawn),
            agents,
            holes: HoleManager::new(config.timing.hole_timeout, config.timing.hole_warning),
            spawn: level.avatar_spawn,
            config,
        }
    }

    pub fn avatar_cell(&self) -> GridPos {
        self.avatar.grid()
    }
}
