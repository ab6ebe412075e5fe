/// Pursuit agent state machine: chase, trap, death.
///
/// ## Per-advance flow
///
/// ┌──────────┬──────────────────────────────────────────────────┐
/// │ Mode     │ Behaviour                                        │
/// ├──────────┼──────────────────────────────────────────────────┤
/// │ Dead     │ respawn countdown → back at spawn, Idle          │
/// │ Trapped  │ stuck countdown → escape one row up, Idle,       │
/// │          │ report (and clear) a carried pickup              │
/// │ active   │ 1. on a live hole cell → Trapped, route dropped  │
/// │          │ 2. should fall → Falling; landing → Idle         │
/// │          │ 3. replan if due, then follow the route          │
/// │          │ 4. nothing to follow → Idle                      │
/// └──────────┴──────────────────────────────────────────────────┘
///
/// Stepping sideways onto a Bar cell puts the agent in Hanging, so bars
/// hold agents the same way they hold the avatar. Any vertical stride
/// reads as Climbing.
///
/// Like `AvatarState`, the state is a value: `advance` consumes it and
/// returns the successor plus an optional `AgentEvent` for the caller.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::{SpeedConfig, TimingConfig};

use super::ai::{Replanner, Route};
use super::entity::{Facing, GridPos, Position};
use super::path;
use super::physics;
use super::terrain::Terrain;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum AgentMode {
    Idle,
    Running,
    Climbing,
    Hanging,
    Falling,
    Trapped,
    Dead,
}

/// Something the orchestrator may need to react to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AgentEvent {
    Trapped,
    /// Left a hole. `dropped_pickup` means a carried pickup was let go at
    /// the hole cell and must be put back into the terrain.
    Escaped { dropped_pickup: bool },
    Respawned,
    Landed,
}

/// Read-only world view for one advance.
pub struct AgentEnv<'a> {
    pub terrain: &'a Terrain,
    pub holes: &'a HashSet<GridPos>,
    /// Grid cell being chased (the avatar's).
    pub target: GridPos,
    pub speed: &'a SpeedConfig,
    pub timing: &'a TimingConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    /// Spawn order within the level.
    pub id: usize,
    pub pos: Position,
    pub spawn: GridPos,
    pub mode: AgentMode,
    pub facing: Facing,
    pub carrying: bool,
    pub stuck_timer: f32,
    pub respawn_timer: f32,
    pub replanner: Replanner,
    pub route: Route,
}

impl AgentState {
    pub fn spawn(id: usize, at: GridPos, replan_interval: f32) -> Self {
        AgentState {
            id,
            pos: at.to_position(),
            spawn: at,
            mode: AgentMode::Idle,
            facing: Facing::Left,
            carrying: false,
            stuck_timer: 0.0,
            respawn_timer: 0.0,
            replanner: Replanner::new(replan_interval),
            route: Route::default(),
        }
    }

    pub fn grid(&self) -> GridPos {
        self.pos.grid()
    }

    pub fn is_trapped(&self) -> bool {
        self.mode == AgentMode::Trapped
    }

    pub fn is_dead(&self) -> bool {
        self.mode == AgentMode::Dead
    }

    /// Neither Trapped nor Dead: can chase, collide, and pick things up.
    pub fn is_active(&self) -> bool {
        !self.is_trapped() && !self.is_dead()
    }

    pub fn advance(self, env: &AgentEnv<'_>, dt: f32) -> (Self, Option<AgentEvent>) {
        match self.mode {
            AgentMode::Dead => self.count_down_respawn(dt),
            AgentMode::Trapped => self.count_down_stuck(dt),
            _ => self.chase(env, dt),
        }
    }

    fn count_down_respawn(mut self, dt: f32) -> (Self, Option<AgentEvent>) {
        self.respawn_timer -= dt;
        if self.respawn_timer > 0.0 {
            return (self, None);
        }
        (self.respawned(), Some(AgentEvent::Respawned))
    }

    fn count_down_stuck(mut self, dt: f32) -> (Self, Option<AgentEvent>) {
        self.stuck_timer -= dt;
        if self.stuck_timer > 0.0 {
            return (self, None);
        }
        let dropped_pickup = self.carrying;
        self.carrying = false;
        self.mode = AgentMode::Idle;
        self.stuck_timer = 0.0;
        self.pos.y -= 1.0;
        (self, Some(AgentEvent::Escaped { dropped_pickup }))
    }

    fn chase(mut self, env: &AgentEnv<'_>, dt: f32) -> (Self, Option<AgentEvent>) {
        let cell = self.grid();
        if env.holes.contains(&cell) {
            self.mode = AgentMode::Trapped;
            self.stuck_timer = env.timing.stuck_time;
            self.route.clear();
            return (self, Some(AgentEvent::Trapped));
        }

        let hanging = self.mode == AgentMode::Hanging;
        if physics::should_fall(env.terrain, self.pos, hanging) {
            self.mode = AgentMode::Falling;
            let step = physics::fall_step(env.terrain, self.pos, env.speed.fall, dt);
            self.pos = step.pos;
            if step.landed {
                self.mode = AgentMode::Idle;
                return (self, Some(AgentEvent::Landed));
            }
            return (self, None);
        }

        if self.replanner.due(dt, self.route.is_empty()) {
            let path = path::find_path(cell, env.target, env.terrain, env.holes);
            trace!(agent = self.id, from = ?cell, to = ?env.target, len = path.len(), "replan");
            self.route.replace(path);
        }

        match self.route.follow(self.pos, env.speed.chase, dt) {
            Some(stride) => {
                self.pos = stride.pos;
                if let Some(facing) = stride.horizontal {
                    self.facing = facing;
                    self.mode = if env.terrain.is_hangable(stride.pos.grid()) {
                        AgentMode::Hanging
                    } else {
                        AgentMode::Running
                    };
                }
                if stride.vertical {
                    self.mode = AgentMode::Climbing;
                }
            }
            None => self.mode = AgentMode::Idle,
        }
        (self, None)
    }

    /// Force Dead and start the respawn countdown. The flag is whether a
    /// pickup was being carried; the caller drops it into the terrain.
    pub fn died(mut self, respawn_time: f32) -> (Self, bool) {
        let dropped = self.carrying;
        self.mode = AgentMode::Dead;
        self.respawn_timer = respawn_time;
        self.stuck_timer = 0.0;
        self.carrying = false;
        self.route.clear();
        (self, dropped)
    }

    pub fn picked_up(mut self) -> Self {
        self.carrying = true;
        self
    }

    pub fn respawned(mut self) -> Self {
        self.pos = self.spawn.to_position();
        self.mode = AgentMode::Idle;
        self.stuck_timer = 0.0;
        self.respawn_timer = 0.0;
        self.route.clear();
        self.replanner.reset();
        self
    }
}
