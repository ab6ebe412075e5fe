/// The step function: advances the world by one tick of `dt` seconds.
///
/// Processing order (fixed; it decides which edge cases win):
///   1. Only while Playing
///   2. Elapsed time
///   3. Hole expiry: refill terrain, bury whoever is inside
///   4. Avatar dig countdown → new hole
///   5. Avatar pickup collection
///   6. Win check (revealed exit under the avatar)
///   7. Agents in spawn order: advance, escapes, avatar contact, pickups
///   8. Agent/agent contact: a trapped agent and any live agent on the
///      same cell both die
///
/// Steps 3, 6 and 7 can end the tick early. Every resolver that can
/// returns `true` when it did.
///
/// Avatar death: one life lost; at zero the phase becomes Lose and the
/// avatar stays Dead, otherwise it respawns at the level spawn.

use tracing::{debug, info};

use crate::domain::agent::{AgentEnv, AgentEvent};
use crate::domain::entity::GridPos;
use crate::domain::terrain::Terrain;
use super::event::SimEvent;
use super::world::{Phase, WorldState};

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut WorldState, dt: f32) -> Vec<SimEvent> {
    if world.phase != Phase::Playing { return vec![]; }

    let mut events: Vec<SimEvent> = Vec::new();
    world.elapsed += dt;

    if resolve_holes(world, dt, &mut events) { return events; }
    resolve_dig(world, dt, &mut events);
    resolve_pickup(world, &mut events);
    if resolve_exit(world, &mut events) { return events; }
    if resolve_agents(world, dt, &mut events) { return events; }
    resolve_agent_contacts(world, &mut events);

    events
}

// ══════════════════════════════════════════════════════════════
// Holes
// ══════════════════════════════════════════════════════════════

fn resolve_holes(world: &mut WorldState, dt: f32, events: &mut Vec<SimEvent>) -> bool {
    for pos in world.holes.tick(dt) {
        world.terrain.fill_hole(pos);
        events.push(SimEvent::HoleFilled { pos });
        debug!(?pos, "hole filled");

        if world.avatar_cell() == pos {
            avatar_die(world, events);
            return true;
        }
        // Everyone in the cell is forced Dead, restarting any countdown
        // already running.
        for i in 0..world.agents.len() {
            if world.agents[i].grid() == pos {
                kill_agent(world, i, events);
            }
        }
    }
    false
}

// ══════════════════════════════════════════════════════════════
// Avatar
// ══════════════════════════════════════════════════════════════

fn resolve_dig(world: &mut WorldState, dt: f32, events: &mut Vec<SimEvent>) {
    let (avatar, done) = world.avatar.clone().advance_dig(dt);
    world.avatar = avatar;
    let Some(target) = done else { return };
    if world.terrain.dig_hole(target) {
        world.holes.create(target);
        events.push(SimEvent::HoleDug { pos: target });
        debug!(pos = ?target, "hole dug");
    }
}

fn resolve_pickup(world: &mut WorldState, events: &mut Vec<SimEvent>) {
    let cell = world.avatar_cell();
    if !world.terrain.has_pickup(cell) { return; }
    let was_revealed = world.terrain.is_exit_revealed();
    if world.terrain.collect_pickup(cell) {
        world.collected += 1;
        events.push(SimEvent::PickupCollected { pos: cell });
        if !was_revealed && world.terrain.is_exit_revealed() {
            events.push(SimEvent::ExitRevealed);
            debug!(exit = ?world.terrain.exit(), "exit revealed");
        }
    }
}

fn resolve_exit(world: &mut WorldState, events: &mut Vec<SimEvent>) -> bool {
    if !world.terrain.is_exit_revealed() || world.avatar_cell() != world.terrain.exit() {
        return false;
    }
    world.phase = Phase::Win;
    events.push(SimEvent::LevelWon { elapsed: world.elapsed });
    info!(level = world.level_id, elapsed = world.elapsed, "level won");
    true
}

fn avatar_die(world: &mut WorldState, events: &mut Vec<SimEvent>) {
    world.lives = world.lives.saturating_sub(1);
    events.push(SimEvent::AvatarDied { lives_left: world.lives });
    if world.lives == 0 {
        world.avatar = world.avatar.clone().died();
        world.phase = Phase::Lose;
        events.push(SimEvent::GameOver);
        info!(level = world.level_id, "game over");
    } else {
        world.avatar = world.avatar.clone().respawned(world.spawn);
        debug!(lives = world.lives, "avatar died, respawning");
    }
}

// ══════════════════════════════════════════════════════════════
// Agents
// ══════════════════════════════════════════════════════════════

fn resolve_agents(world: &mut WorldState, dt: f32, events: &mut Vec<SimEvent>) -> bool {
    let target = world.avatar_cell();
    let holes = world.holes.position_set();

    for i in 0..world.agents.len() {
        let before = world.agents[i].grid();
        let (agent, event) = {
            let env = AgentEnv {
                terrain: &world.terrain,
                holes: &holes,
                target,
                speed: &world.config.speed,
                timing: &world.config.timing,
            };
            world.agents[i].clone().advance(&env, dt)
        };
        let id = agent.id;

        match event {
            Some(AgentEvent::Trapped) => {
                events.push(SimEvent::AgentTrapped { id, pos: agent.grid() });
                debug!(agent = id, pos = ?agent.grid(), "agent trapped");
            }
            Some(AgentEvent::Escaped { dropped_pickup }) => {
                events.push(SimEvent::AgentEscaped { id, pos: agent.grid() });
                if dropped_pickup {
                    drop_pickup(&mut world.terrain, before, events);
                }
            }
            Some(AgentEvent::Respawned) => events.push(SimEvent::AgentRespawned { id }),
            Some(AgentEvent::Landed) | None => {}
        }

        let cell = agent.grid();
        if agent.is_active() && cell == target {
            world.agents[i] = agent;
            avatar_die(world, events);
            return true;
        }

        let agent = if world.config.agents_carry_pickups
            && agent.is_active()
            && !agent.carrying
            && !holes.contains(&cell)
            && world.terrain.take_pickup(cell)
        {
            events.push(SimEvent::PickupTaken { id, pos: cell });
            agent.picked_up()
        } else {
            agent
        };
        world.agents[i] = agent;
    }
    false
}

fn resolve_agent_contacts(world: &mut WorldState, events: &mut Vec<SimEvent>) {
    let n = world.agents.len();
    let mut doomed = vec![false; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let (a, b) = (&world.agents[i], &world.agents[j]);
            if a.grid() != b.grid() { continue; }
            if (a.is_trapped() && !b.is_dead()) || (b.is_trapped() && !a.is_dead()) {
                doomed[i] = true;
                doomed[j] = true;
            }
        }
    }
    for (i, hit) in doomed.into_iter().enumerate() {
        if hit {
            kill_agent(world, i, events);
        }
    }
}

fn kill_agent(world: &mut WorldState, i: usize, events: &mut Vec<SimEvent>) {
    let pos = world.agents[i].grid();
    let (agent, dropped) = world.agents[i].clone().died(world.config.timing.respawn_time);
    events.push(SimEvent::AgentKilled { id: agent.id, pos });
    debug!(agent = agent.id, ?pos, "agent killed");
    world.agents[i] = agent;
    if dropped {
        drop_pickup(&mut world.terrain, pos, events);
    }
}

// ══════════════════════════════════════════════════════════════
// Dropped pickups
// ══════════════════════════════════════════════════════════════

/// Put a dropped pickup back into play at the dropping agent's cell.
fn drop_pickup(terrain: &mut Terrain, pos: GridPos, events: &mut Vec<SimEvent>) {
    terrain.add_pickup(pos);
    events.push(SimEvent::PickupDropped { pos });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::domain::agent::{AgentMode, AgentState};
    use crate::domain::avatar::{AvatarMode, AvatarState};
    use crate::domain::entity::{Direction, Position};
    use crate::domain::tile::Tile;
    use crate::sim::level::{LevelData, LEVEL_WIDTH};

    fn p(x: i32, y: i32) -> GridPos {
        GridPos::new(x, y)
    }

    /// Level on the top rows of a 28×16 grid, with 'P'/'A' markers for
    /// the avatar and agents and 'E' for the exit.
    fn world(rows: &[&str]) -> WorldState {
        world_with(rows, SimConfig::default())
    }

    fn world_with(rows: &[&str], config: SimConfig) -> WorldState {
        let mut spawn = p(0, 0);
        let mut agents = vec![];
        let mut exit = p(LEVEL_WIDTH as i32 - 1, 0);
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                match ch {
                    'P' => spawn = p(x as i32, y as i32),
                    'A' => agents.push(p(x as i32, y as i32)),
                    'E' => exit = p(x as i32, y as i32),
                    _ => {}
                }
            }
        }
        let level = LevelData {
            id: 1,
            name: "test".into(),
            grid: rows.join("\n"),
            avatar_spawn: spawn,
            agent_spawns: agents,
            pickups: vec![],
            exit,
            par: 0.0,
        };
        WorldState::from_level(&level, config)
    }

    fn no_carry() -> SimConfig {
        SimConfig { agents_carry_pickups: false, ..SimConfig::default() }
    }

    // ── Phase gating ──

    #[test]
    fn only_playing_ticks() {
        let mut w = world(&[
            "P...",
            "####",
        ]);
        w.phase = Phase::Paused;
        assert!(step(&mut w, 1.0).is_empty());
        assert_eq!(w.elapsed, 0.0);

        w.phase = Phase::Playing;
        step(&mut w, 0.5);
        assert_eq!(w.elapsed, 0.5);
    }

    // ── Pickups and exit ──

    #[test]
    fn pickup_at_spawn_collected_on_zero_tick() {
        let mut w = world(&[
            "$...",
            "####",
        ]);
        let events = step(&mut w, 0.0);
        assert_eq!(w.collected, 1);
        assert!(w.terrain.is_exit_revealed());
        assert_eq!(w.phase, Phase::Playing);
        assert_eq!(events, vec![SimEvent::PickupCollected { pos: p(0, 0) }, SimEvent::ExitRevealed]);
    }

    #[test]
    fn revealed_exit_under_avatar_wins() {
        let mut w = world(&[
            "P$E.",
            "####",
        ]);
        step(&mut w, 0.0);
        assert_eq!(w.phase, Phase::Playing);

        w.avatar.pos = Position::new(1.0, 0.0);
        step(&mut w, 0.1);
        assert!(w.terrain.is_exit_revealed());
        assert_eq!(w.phase, Phase::Playing);

        w.avatar.pos = Position::new(2.0, 0.0);
        let events = step(&mut w, 0.1);
        assert_eq!(w.phase, Phase::Win);
        assert!(matches!(events.last(), Some(SimEvent::LevelWon { .. })));

        // terminal
        assert!(step(&mut w, 0.1).is_empty());
    }

    #[test]
    fn hidden_exit_does_not_win() {
        let mut w = world(&[
            "PE.$",
            "####",
        ]);
        w.avatar.pos = Position::new(1.0, 0.0);
        step(&mut w, 0.1);
        assert_eq!(w.phase, Phase::Playing);
    }

    // ── Digging ──

    #[test]
    fn dig_completes_into_hole_then_refills() {
        let mut w = world(&[
            "P...",
            "####",
        ]);
        w.avatar = w.avatar.clone().start_dig(Direction::Right, &w.terrain, &w.config.timing).unwrap();

        let events = step(&mut w, 0.3);
        assert_eq!(events, vec![SimEvent::HoleDug { pos: p(1, 1) }]);
        assert_eq!(w.terrain.tile_at(p(1, 1)), Tile::Hole);
        assert!(w.holes.contains(p(1, 1)));
        assert_eq!(w.avatar.mode, AvatarMode::Idle);

        let events = step(&mut w, 5.0);
        assert!(events.contains(&SimEvent::HoleFilled { pos: p(1, 1) }));
        assert_eq!(w.terrain.tile_at(p(1, 1)), Tile::Brick);
        assert!(w.holes.is_empty());
    }

    #[test]
    fn refill_on_avatar_costs_a_life() {
        let mut w = world(&[
            "P...",
            "####",
            "####",
        ]);
        assert!(w.terrain.dig_hole(p(1, 1)));
        w.holes.create(p(1, 1));
        w.avatar.pos = Position::new(1.0, 1.0);

        let events = step(&mut w, 5.0);
        assert_eq!(w.lives, 2);
        assert_eq!(w.avatar_cell(), p(0, 0));
        assert_eq!(w.avatar.mode, AvatarMode::Idle);
        assert_eq!(
            events,
            vec![SimEvent::HoleFilled { pos: p(1, 1) }, SimEvent::AvatarDied { lives_left: 2 }]
        );
    }

    // ── Agents ──

    #[test]
    fn agent_contact_costs_a_life() {
        let mut w = world(&[
            "PA..",
            "####",
        ]);
        w.agents[0].pos = Position::new(0.0, 0.0);
        let events = step(&mut w, 0.01);
        assert_eq!(w.lives, 2);
        assert!(events.contains(&SimEvent::AvatarDied { lives_left: 2 }));
    }

    #[test]
    fn three_contacts_lose_and_freeze() {
        let mut w = world(&[
            "P..A",
            "####",
        ]);
        for lives_left in [2, 1] {
            w.agents[0].pos = w.avatar.pos;
            step(&mut w, 0.01);
            assert_eq!(w.lives, lives_left);
            assert_eq!(w.phase, Phase::Playing);
        }
        w.agents[0].pos = w.avatar.pos;
        let events = step(&mut w, 0.01);
        assert_eq!(w.lives, 0);
        assert_eq!(w.phase, Phase::Lose);
        assert_eq!(w.avatar.mode, AvatarMode::Dead);
        assert!(events.contains(&SimEvent::GameOver));

        let frozen_pos = w.avatar.pos;
        let frozen_agent = w.agents[0].clone();
        for _ in 0..10 {
            assert!(step(&mut w, 0.5).is_empty());
        }
        assert_eq!(w.lives, 0);
        assert_eq!(w.avatar.pos, frozen_pos);
        assert_eq!(w.agents[0], frozen_agent);
    }

    #[test]
    fn agent_trapped_in_hole_then_escapes() {
        let mut w = world_with(&[
            "P.......",
            "###.####",
            "########",
        ], no_carry());
        assert!(w.terrain.dig_hole(p(5, 1)));
        w.holes.create(p(5, 1));
        w.agents.push(AgentState::spawn(0, p(5, 1), 0.5));

        let events = step(&mut w, 0.5);
        assert_eq!(events, vec![SimEvent::AgentTrapped { id: 0, pos: p(5, 1) }]);
        assert_eq!(w.agents[0].mode, AgentMode::Trapped);

        for _ in 0..5 {
            step(&mut w, 0.5);
            assert!(w.agents[0].is_trapped());
        }
        let events = step(&mut w, 0.5);
        assert!(events.contains(&SimEvent::AgentEscaped { id: 0, pos: p(5, 0) }));
        assert_eq!(w.agents[0].pos, Position::new(5.0, 0.0));
    }

    #[test]
    fn escape_with_pickup_drops_it_in_the_hole() {
        let mut w = world(&[
            "P.......",
            "########",
            "########",
        ]);
        assert!(w.terrain.dig_hole(p(5, 1)));
        w.holes.create(p(5, 1));
        w.agents.push(AgentState::spawn(0, p(5, 1), 0.5).picked_up());
        w.terrain.add_pickup(p(7, 0)); // keep the exit hidden

        step(&mut w, 0.0);
        assert!(w.agents[0].is_trapped());
        let events = step(&mut w, 3.0);
        assert!(events.contains(&SimEvent::PickupDropped { pos: p(5, 1) }));
        assert!(w.terrain.has_pickup(p(5, 1)));
        assert!(!w.agents[0].carrying);
    }

    #[test]
    fn refill_kills_agent_and_drops_its_pickup_in_place() {
        let mut config = SimConfig::default();
        config.timing.stuck_time = 10.0;
        let mut w = world_with(&[
            "P.......",
            "########",
            "########",
        ], config);
        assert!(w.terrain.dig_hole(p(5, 1)));
        w.holes.create(p(5, 1));
        w.agents.push(AgentState::spawn(0, p(5, 1), 0.5).picked_up());

        step(&mut w, 0.0);
        assert!(w.agents[0].is_trapped());
        step(&mut w, 4.5);
        assert!(w.agents[0].is_trapped());
        let events = step(&mut w, 0.5);
        assert!(events.contains(&SimEvent::AgentKilled { id: 0, pos: p(5, 1) }));
        assert!(events.contains(&SimEvent::PickupDropped { pos: p(5, 1) }));
        assert!(w.agents[0].is_dead());
        assert!(w.terrain.has_pickup(p(5, 1)));
        assert!(!w.terrain.has_pickup(p(5, 0)));
        assert_eq!(w.terrain.tile_at(p(5, 1)), Tile::Brick);
    }

    #[test]
    fn refill_restarts_a_dead_agents_countdown() {
        let mut w = world(&[
            "P.......",
            "########",
        ]);
        assert!(w.terrain.dig_hole(p(5, 1)));
        w.holes.create(p(5, 1));
        let (dead, _) = AgentState::spawn(0, p(5, 1), 0.5).died(3.0);
        w.agents.push(dead);

        // One second of countdown left when the hole refills on top: the
        // refill restarts it, so two more seconds leave it still dead.
        w.holes.tick(3.0);
        w.agents[0].respawn_timer = 1.0;
        let events = step(&mut w, 2.0);
        assert!(events.contains(&SimEvent::AgentKilled { id: 0, pos: p(5, 1) }));
        assert!(w.agents[0].is_dead());
        assert_eq!(w.agents[0].respawn_timer, 1.0);
    }

    #[test]
    fn carried_last_pickup_keeps_exit_hidden_until_dropped() {
        let mut w = world(&[
            "P...$.E.",
            "########",
        ]);
        w.agents.push(AgentState::spawn(0, p(4, 0), 0.5));

        let events = step(&mut w, 0.0);
        assert!(events.contains(&SimEvent::PickupTaken { id: 0, pos: p(4, 0) }));
        assert_eq!(w.terrain.remaining_pickups(), 0);
        assert!(!w.terrain.is_exit_revealed());

        // Standing on the hidden exit does not win.
        w.avatar = AvatarState::spawn(p(6, 0));
        step(&mut w, 0.0);
        assert_eq!(w.phase, Phase::Playing);

        let mut events = vec![];
        kill_agent(&mut w, 0, &mut events);
        assert!(events.contains(&SimEvent::PickupDropped { pos: p(4, 0) }));
        assert!(w.terrain.has_pickup(p(4, 0)));
        assert!(!w.terrain.is_exit_revealed());

        w.avatar = AvatarState::spawn(p(4, 0));
        let events = step(&mut w, 0.0);
        assert!(events.contains(&SimEvent::ExitRevealed));
    }

    #[test]
    fn agent_takes_pickup_it_walks_over() {
        let mut w = world(&[
            "P.......",
            "########",
        ]);
        w.agents.push(AgentState::spawn(0, p(5, 0), 0.5));
        w.terrain.add_pickup(p(5, 0));

        let events = step(&mut w, 0.0);
        assert!(events.contains(&SimEvent::PickupTaken { id: 0, pos: p(5, 0) }));
        assert!(w.agents[0].carrying);
        assert!(!w.terrain.has_pickup(p(5, 0)));
        assert!(!w.terrain.is_exit_revealed());
    }

    #[test]
    fn carrying_can_be_disabled() {
        let mut w = world_with(&[
            "P.......",
            "########",
        ], no_carry());
        w.agents.push(AgentState::spawn(0, p(5, 0), 0.5));
        w.terrain.add_pickup(p(5, 0));
        step(&mut w, 0.0);
        assert!(!w.agents[0].carrying);
        assert!(w.terrain.has_pickup(p(5, 0)));
    }

    #[test]
    fn trapped_agent_and_visitor_both_die() {
        let mut w = world_with(&[
            "P.......",
            "########",
            "########",
        ], no_carry());
        assert!(w.terrain.dig_hole(p(5, 1)));
        w.holes.create(p(5, 1));
        w.agents.push(AgentState::spawn(0, p(5, 1), 0.5));
        step(&mut w, 0.0);
        assert!(w.agents[0].is_trapped());

        // a second agent drops in on top of it
        let mut visitor = AgentState::spawn(1, p(5, 0), 0.5);
        visitor.pos = Position::new(5.0, 0.95);
        w.agents.push(visitor);
        let events = step(&mut w, 0.02);
        let killed: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, SimEvent::AgentKilled { .. }))
            .collect();
        assert_eq!(killed.len(), 2);
        assert!(w.agents.iter().all(|a| a.is_dead()));
    }
}
