/// Game: the surface a presentation shell talks to.
///
/// Wraps one `WorldState` plus the level catalog. All input arrives as
/// discrete calls; every query hands back plain values or copies.
///
/// ## Input gating
///
/// ┌───────────────────────┬──────────┬──────────┬──────────────────┐
/// │ Call                  │ Playing  │ Paused   │ Title/Win/Lose   │
/// ├───────────────────────┼──────────┼──────────┼──────────────────┤
/// │ tick / move / dig     │ applied  │ ignored  │ ignored          │
/// │ pause                 │ → Paused │ -        │ -                │
/// │ resume                │ -        │ → Playing│ -                │
/// │ restart               │ reload   │ reload   │ reload (if any)  │
/// │ load(id)              │ replaces the session when id is known  │
/// └───────────────────────┴──────────┴──────────┴──────────────────┘

use tracing::{debug, warn};

use crate::config::GameConfig;
use crate::domain::agent::AgentState;
use crate::domain::avatar::{AvatarMode, AvatarState};
use crate::domain::entity::Direction;
use crate::domain::terrain::Terrain;

use super::event::SimEvent;
use super::level::{LevelCatalog, LEVEL_HEIGHT, LEVEL_WIDTH};
use super::snapshot::Snapshot;
use super::step;
use super::world::{Phase, WorldState};

/// One discrete player action.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum InputAction {
    Move(Option<Direction>),
    Dig(Direction),
    /// Toggles between Playing and Paused.
    Pause,
    Restart,
}

pub struct Game {
    catalog: LevelCatalog,
    config: GameConfig,
    world: WorldState,
}

impl Game {
    pub fn new(catalog: LevelCatalog, config: GameConfig) -> Self {
        let world = WorldState::new(config.sim.clone());
        Game { catalog, config, world }
    }

    /// Built-in levels and default settings.
    pub fn with_defaults() -> Self {
        Game::new(LevelCatalog::builtin(), GameConfig::default())
    }

    // ── Session control ──

    /// Start `id` from scratch. Unknown or invalid ids leave the current
    /// session untouched.
    pub fn load(&mut self, id: u32) -> bool {
        let Some(level) = self.catalog.get(id) else {
            warn!(id, "no such level");
            return false;
        };
        if let Err(e) = level.validate(LEVEL_WIDTH, LEVEL_HEIGHT) {
            warn!(id, "rejecting level: {e}");
            return false;
        }
        self.world = WorldState::from_level(level, self.config.sim.clone());
        debug!(id, name = %level.name, agents = level.agent_spawns.len(), "level loaded");
        true
    }

    pub fn tick(&mut self, dt: f32) -> Vec<SimEvent> {
        step::step(&mut self.world, dt)
    }

    /// Apply one movement call to the avatar. `false` when the session is
    /// not Playing or the avatar cannot take input (Dead/Digging).
    pub fn move_avatar(&mut self, dir: Option<Direction>, dt: f32) -> bool {
        if self.world.phase != Phase::Playing {
            return false;
        }
        if matches!(self.world.avatar.mode, AvatarMode::Dead | AvatarMode::Digging) {
            return false;
        }
        let world = &mut self.world;
        world.avatar = world.avatar.clone().moved(dir, &world.terrain, &world.config.speed, dt);
        true
    }

    pub fn start_dig(&mut self, dir: Direction) -> bool {
        if self.world.phase != Phase::Playing {
            return false;
        }
        let world = &mut self.world;
        match world.avatar.clone().start_dig(dir, &world.terrain, &world.config.timing) {
            Some(avatar) => {
                world.avatar = avatar;
                true
            }
            None => false,
        }
    }

    pub fn pause(&mut self) {
        if self.world.phase == Phase::Playing {
            self.world.phase = Phase::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.world.phase == Phase::Paused {
            self.world.phase = Phase::Playing;
        }
    }

    /// Reload the current level. No-op before anything was loaded.
    pub fn restart(&mut self) {
        if self.world.level_id > 0 {
            self.load(self.world.level_id);
        }
    }

    pub fn handle_input(&mut self, action: InputAction) {
        match action {
            InputAction::Pause => match self.world.phase {
                Phase::Playing => self.pause(),
                Phase::Paused => self.resume(),
                _ => {}
            },
            InputAction::Restart => self.restart(),
            InputAction::Move(dir) => {
                self.move_avatar(dir, self.config.driver.input_step);
            }
            InputAction::Dig(dir) => {
                self.start_dig(dir);
            }
        }
    }

    // ── Queries ──

    pub fn phase(&self) -> Phase {
        self.world.phase
    }

    pub fn lives(&self) -> u32 {
        self.world.lives
    }

    pub fn elapsed(&self) -> f32 {
        self.world.elapsed
    }

    pub fn level_name(&self) -> &str {
        &self.world.level_name
    }

    /// 0 before the first load.
    pub fn level_id(&self) -> u32 {
        self.world.level_id
    }

    pub fn pickups_collected(&self) -> u32 {
        self.world.collected
    }

    pub fn pickups_total(&self) -> usize {
        self.world.terrain.total_pickups()
    }

    pub fn is_exit_revealed(&self) -> bool {
        self.world.terrain.is_exit_revealed()
    }

    pub fn agent_count(&self) -> usize {
        self.world.agents.len()
    }

    pub fn level_count(&self) -> usize {
        self.catalog.len()
    }

    /// Catalog ids in ascending order.
    pub fn level_ids(&self) -> Vec<u32> {
        self.catalog.ids()
    }

    /// Id after the current one in catalog order.
    pub fn next_level_id(&self) -> Option<u32> {
        let current = self.world.level_id;
        self.catalog.ids().into_iter().find(|&id| id > current)
    }

    // ── Copies ──

    pub fn avatar(&self) -> AvatarState {
        self.world.avatar.clone()
    }

    pub fn agents(&self) -> Vec<AgentState> {
        self.world.agents.clone()
    }

    pub fn terrain(&self) -> Terrain {
        self.world.terrain.clone()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::{GridPos, Position};
    use crate::domain::tile::Tile;
    use crate::sim::level::LevelData;

    fn p(x: i32, y: i32) -> GridPos {
        GridPos::new(x, y)
    }

    fn level(id: u32, rows: &[&str], spawn: GridPos, agents: Vec<GridPos>, exit: GridPos) -> LevelData {
        LevelData {
            id,
            name: format!("case {id}"),
            grid: rows.join("\n"),
            avatar_spawn: spawn,
            agent_spawns: agents,
            pickups: vec![],
            exit,
            par: 30.0,
        }
    }

    fn game_with(levels: Vec<LevelData>) -> Game {
        let mut catalog = LevelCatalog::new();
        for l in levels {
            catalog.insert(l).unwrap();
        }
        Game::new(catalog, GameConfig::default())
    }

    #[test]
    fn starts_on_title() {
        let mut g = Game::with_defaults();
        assert_eq!(g.phase(), Phase::Title);
        assert_eq!(g.level_id(), 0);
        assert_eq!(g.level_count(), 3);
        assert!(g.tick(1.0).is_empty());
        assert!(!g.move_avatar(Some(Direction::Left), 0.1));
        g.restart();
        assert_eq!(g.phase(), Phase::Title);
    }

    #[test]
    fn load_unknown_level_keeps_session() {
        let mut g = Game::with_defaults();
        assert!(g.load(2));
        g.tick(0.5);
        assert!(!g.load(99));
        assert_eq!(g.level_id(), 2);
        assert_eq!(g.elapsed(), 0.5);
        assert_eq!(g.level_name(), "Sentry");
        assert_eq!(g.agent_count(), 2);
    }

    #[test]
    fn load_rejects_invalid_record() {
        let mut g = game_with(vec![level(5, &["..."], p(40, 0), vec![], p(1, 0))]);
        assert!(!g.load(5));
        assert_eq!(g.phase(), Phase::Title);
    }

    #[test]
    fn pickup_at_spawn_reveals_exit_on_first_tick() {
        let mut g = game_with(vec![level(1, &["$..E", "####"], p(0, 0), vec![], p(3, 0))]);
        assert!(g.load(1));
        assert_eq!(g.pickups_total(), 1);
        assert_eq!(g.agent_count(), 0);

        let events = g.tick(0.0);
        assert_eq!(g.pickups_collected(), 1);
        assert!(g.is_exit_revealed());
        assert_eq!(g.phase(), Phase::Playing);
        assert!(events.contains(&SimEvent::ExitRevealed));
    }

    #[test]
    fn run_to_exit_and_win() {
        let mut g = game_with(vec![level(1, &["$..E", "####"], p(0, 0), vec![], p(3, 0))]);
        g.load(1);
        g.tick(0.0);
        for _ in 0..20 {
            g.move_avatar(Some(Direction::Right), 0.05);
            if g.tick(0.05).iter().any(|e| matches!(e, SimEvent::LevelWon { .. })) {
                break;
            }
        }
        assert_eq!(g.phase(), Phase::Win);
        let won_at = g.elapsed();
        g.tick(1.0);
        assert_eq!(g.elapsed(), won_at);
    }

    #[test]
    fn pause_blocks_ticks_and_input() {
        let mut g = Game::with_defaults();
        g.load(1);
        g.handle_input(InputAction::Pause);
        assert_eq!(g.phase(), Phase::Paused);
        assert!(g.tick(1.0).is_empty());
        assert_eq!(g.elapsed(), 0.0);
        assert!(!g.start_dig(Direction::Left));

        let before = g.avatar();
        g.handle_input(InputAction::Move(Some(Direction::Right)));
        assert_eq!(g.avatar(), before);

        g.handle_input(InputAction::Pause);
        assert_eq!(g.phase(), Phase::Playing);
        g.resume();
        assert_eq!(g.phase(), Phase::Playing);
    }

    #[test]
    fn move_action_uses_input_step() {
        let mut g = game_with(vec![level(1, &["....", "####"], p(0, 0), vec![], p(3, 0))]);
        g.load(1);
        g.handle_input(InputAction::Move(Some(Direction::Right)));
        let step = GameConfig::default().driver.input_step;
        assert_eq!(g.avatar().pos, Position::new(4.0 * step, 0.0));
    }

    #[test]
    fn dig_through_surface_and_reject_while_digging() {
        let mut g = game_with(vec![level(1, &["....", "####"], p(1, 0), vec![], p(3, 0))]);
        g.load(1);
        assert!(!g.start_dig(Direction::Up));
        assert!(g.start_dig(Direction::Left));
        assert!(!g.start_dig(Direction::Right));
        assert!(!g.move_avatar(Some(Direction::Right), 0.1));

        let events = g.tick(0.3);
        assert_eq!(events, vec![SimEvent::HoleDug { pos: p(0, 1) }]);
        assert_eq!(g.terrain().tile_at(p(0, 1)), Tile::Hole);
        assert_eq!(g.snapshot().holes.len(), 1);
    }

    #[test]
    fn restart_reloads_current_level() {
        let mut g = Game::with_defaults();
        g.load(3);
        g.tick(1.0);
        g.start_dig(Direction::Left);
        g.handle_input(InputAction::Restart);
        assert_eq!(g.level_id(), 3);
        assert_eq!(g.elapsed(), 0.0);
        assert_eq!(g.lives(), 3);
        assert_eq!(g.avatar().mode, AvatarMode::Idle);
    }

    #[test]
    fn copies_do_not_alias_the_session() {
        let mut g = Game::with_defaults();
        g.load(2);
        let mut terrain = g.terrain();
        assert!(terrain.dig_hole(p(0, 2)));
        let mut agents = g.agents();
        agents.clear();
        assert_eq!(g.terrain().tile_at(p(0, 2)), Tile::Brick);
        assert_eq!(g.agent_count(), 2);
    }

    #[test]
    fn next_level_follows_catalog_order() {
        let mut g = Game::with_defaults();
        assert_eq!(g.level_ids(), vec![1, 2, 3]);
        assert_eq!(g.next_level_id(), Some(1));
        g.load(1);
        assert_eq!(g.next_level_id(), Some(2));
        g.load(3);
        assert_eq!(g.next_level_id(), None);
    }

    #[test]
    fn three_agent_contacts_end_the_game() {
        let mut g = game_with(vec![level(
            1,
            &["......", "######"],
            p(0, 0),
            vec![p(1, 0)],
            p(5, 0),
        )]);
        g.load(1);
        let mut deaths = 0;
        for _ in 0..600 {
            let events = g.tick(1.0 / 60.0);
            deaths += events.iter().filter(|e| matches!(e, SimEvent::AvatarDied { .. })).count();
            if g.phase() == Phase::Lose {
                break;
            }
        }
        assert_eq!(deaths, 3);
        assert_eq!(g.phase(), Phase::Lose);
        assert_eq!(g.lives(), 0);

        let avatar = g.avatar();
        let agents = g.agents();
        for _ in 0..30 {
            assert!(g.tick(1.0 / 60.0).is_empty());
        }
        assert_eq!(g.lives(), 0);
        assert_eq!(g.avatar(), avatar);
        assert_eq!(g.agents(), agents);
    }
}
