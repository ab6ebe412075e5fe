/// Avatar state machine: movement and digging.
///
/// `AvatarState` is a plain value. Every transition takes the state by
/// value and hands back the next one; the orchestrator owns the only copy.
///
/// ## Movement truth table
///
/// ┌─────────────────────────────┬────────────────────────────────────────┐
/// │ Condition (priority order)  │ Result                                 │
/// ├─────────────────────────────┼────────────────────────────────────────┤
/// │ mode = Dead / Digging       │ unchanged, input ignored               │
/// │ should fall                 │ Falling, drop at fall rate; land→Idle  │
/// │ Left / Right                │ face that way; Running, or Hanging on  │
/// │                             │ a bar (hang speed); edges block        │
/// │ Up,   here is Ladder        │ Climbing, move up                      │
/// │ Up,   Bar directly above    │ snap onto bar, Hanging                 │
/// │ Down, Ladder here or below  │ Climbing, move down                    │
/// │ Down, Hanging               │ let go → Falling                       │
/// │ no input                    │ Idle (Hanging persists)                │
/// └─────────────────────────────┴────────────────────────────────────────┘
///
/// Position is clamped to the grid after every call.
///
/// Horizontal moves are only stopped by the grid edge, never by the
/// destination tile. The avatar can run through brick at its own row.
///
/// ## Dig rules
///
///   1. Not Dead/Digging/Falling/Climbing/Hanging
///   2. Supported at the current cell
///   3. Direction is Left or Right
///   4. Target (one column over, one row down) is Brick

use serde::{Deserialize, Serialize};

use crate::config::{SpeedConfig, TimingConfig};

use super::entity::{Direction, Facing, GridPos, Position};
use super::physics;
use super::terrain::Terrain;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum AvatarMode {
    Idle,
    Running,
    Climbing,
    Hanging,
    Falling,
    Digging,
    Dead,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AvatarState {
    pub pos: Position,
    pub mode: AvatarMode,
    pub facing: Facing,
    pub dig_timer: f32,
    pub dig_target: Option<GridPos>,
}

impl AvatarState {
    pub fn spawn(at: GridPos) -> Self {
        AvatarState {
            pos: at.to_position(),
            mode: AvatarMode::Idle,
            facing: Facing::Right,
            dig_timer: 0.0,
            dig_target: None,
        }
    }

    pub fn grid(&self) -> GridPos {
        self.pos.grid()
    }

    pub fn is_dead(&self) -> bool {
        self.mode == AvatarMode::Dead
    }

    pub fn is_digging(&self) -> bool {
        self.mode == AvatarMode::Digging
    }

    // ── Movement ──

    /// Apply one movement call. `dir == None` means no directional input.
    pub fn moved(
        mut self,
        dir: Option<Direction>,
        terrain: &Terrain,
        speed: &SpeedConfig,
        dt: f32,
    ) -> Self {
        if matches!(self.mode, AvatarMode::Dead | AvatarMode::Digging) {
            return self;
        }

        let hanging = self.mode == AvatarMode::Hanging;
        if physics::should_fall(terrain, self.pos, hanging) {
            self.mode = AvatarMode::Falling;
            let step = physics::fall_step(terrain, self.pos, speed.fall, dt);
            self.pos = step.pos;
            if step.landed {
                self.mode = AvatarMode::Idle;
            }
            return self.clamped(terrain);
        }

        let cell = self.grid();
        match dir {
            Some(Direction::Left) => self.run(-1, terrain, speed, dt),
            Some(Direction::Right) => self.run(1, terrain, speed, dt),
            Some(Direction::Up) => {
                if terrain.is_climbable(cell) {
                    self.mode = AvatarMode::Climbing;
                    self.pos.y -= speed.climb * dt;
                } else if terrain.is_hangable(cell.above()) {
                    self.mode = AvatarMode::Hanging;
                    self.pos.y = cell.above().y as f32;
                }
            }
            Some(Direction::Down) => {
                if terrain.is_climbable(cell) || terrain.is_climbable(cell.below()) {
                    self.mode = AvatarMode::Climbing;
                    self.pos.y += speed.climb * dt;
                } else if self.mode == AvatarMode::Hanging {
                    self.mode = AvatarMode::Falling;
                }
            }
            None => {
                if self.mode != AvatarMode::Hanging {
                    self.mode = AvatarMode::Idle;
                }
            }
        }

        self.clamped(terrain)
    }

    fn run(&mut self, dx: i32, terrain: &Terrain, speed: &SpeedConfig, dt: f32) {
        self.facing = if dx < 0 { Facing::Left } else { Facing::Right };
        let cell = self.grid();
        if !can_move_horizontal(terrain, cell.offset(dx, 0)) {
            return;
        }
        self.mode = if terrain.is_hangable(cell) { AvatarMode::Hanging } else { AvatarMode::Running };
        let rate = if self.mode == AvatarMode::Hanging { speed.hang } else { speed.run };
        self.pos.x += dx as f32 * rate * dt;
    }

    fn clamped(mut self, terrain: &Terrain) -> Self {
        let max_x = terrain.width().saturating_sub(1) as f32;
        let max_y = terrain.height().saturating_sub(1) as f32;
        self.pos.x = self.pos.x.clamp(0.0, max_x);
        self.pos.y = self.pos.y.clamp(0.0, max_y);
        self
    }

    // ── Digging ──

    /// Target cell a dig in `dir` would open, if the dig is legal now.
    pub fn dig_target_for(&self, dir: Direction, terrain: &Terrain) -> Option<GridPos> {
        if matches!(
            self.mode,
            AvatarMode::Dead
                | AvatarMode::Digging
                | AvatarMode::Falling
                | AvatarMode::Climbing
                | AvatarMode::Hanging
        ) {
            return None;
        }
        let cell = self.grid();
        if !terrain.has_support(cell) {
            return None;
        }
        let dx = match dir.facing()? {
            Facing::Left => -1,
            Facing::Right => 1,
        };
        let target = cell.offset(dx, 1);
        terrain.is_diggable(target).then_some(target)
    }

    pub fn can_dig(&self, dir: Direction, terrain: &Terrain) -> bool {
        self.dig_target_for(dir, terrain).is_some()
    }

    /// Begin digging. `None` if the dig is not legal (state unchanged).
    pub fn start_dig(mut self, dir: Direction, terrain: &Terrain, timing: &TimingConfig) -> Option<Self> {
        let target = self.dig_target_for(dir, terrain)?;
        self.facing = dir.facing()?;
        self.mode = AvatarMode::Digging;
        self.dig_timer = timing.dig_duration;
        self.dig_target = Some(target);
        Some(self)
    }

    /// Count down an in-progress dig. Yields the target exactly once,
    /// on the call that finishes it.
    pub fn advance_dig(mut self, dt: f32) -> (Self, Option<GridPos>) {
        if self.mode != AvatarMode::Digging {
            return (self, None);
        }
        let Some(target) = self.dig_target else {
            return (self, None);
        };
        self.dig_timer -= dt;
        if self.dig_timer > 0.0 {
            return (self, None);
        }
        self.mode = AvatarMode::Idle;
        self.dig_timer = 0.0;
        self.dig_target = None;
        (self, Some(target))
    }

    // ── Life cycle ──

    pub fn died(mut self) -> Self {
        self.mode = AvatarMode::Dead;
        self.dig_timer = 0.0;
        self.dig_target = None;
        self
    }

    pub fn respawned(self, at: GridPos) -> Self {
        AvatarState::spawn(at)
    }
}

/// Horizontal legality: only the grid edge blocks. The destination tile is
/// not consulted.
fn can_move_horizontal(terrain: &Terrain, target: GridPos) -> bool {
    target.x >= 0 && (target.x as usize) < terrain.width()
}
