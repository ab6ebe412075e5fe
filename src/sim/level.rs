/// Level records and the built-in catalog.
///
/// A level arrives as an already-parsed `LevelData` record. The grid is a
/// block of ASCII rows; explicit fields carry spawns, pickups and the exit.
///
/// ## Grid legend
///   '.' = Empty     '#' = Brick     'X' = Stone
///   'H' = Ladder    '-' = Bar
///   '$' = pickup marker (unioned with the explicit pickup list)
///   'E' = exit marker (decorative; the explicit `exit` field wins)
///   anything else, and any missing cell, = Empty
///
/// Built-in levels additionally mark the avatar spawn with 'P' and agent
/// spawns with 'A'; `make_builtin` lifts those markers into the record.
///
/// Records must pass `validate` against the fixed grid size before a
/// session is built from them.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::entity::GridPos;
use crate::domain::terrain::Terrain;
use crate::domain::tile::Tile;

pub const LEVEL_WIDTH: usize = 28;
pub const LEVEL_HEIGHT: usize = 16;

#[derive(Debug, Error, PartialEq)]
pub enum LevelError {
    #[error("{what} at ({}, {}) is outside the grid", pos.x, pos.y)]
    OutOfBounds { what: &'static str, pos: GridPos },
    #[error("grid is {width}x{height}, larger than the level size")]
    GridTooLarge { width: usize, height: usize },
    #[error("duplicate level id {0}")]
    DuplicateId(u32),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelData {
    pub id: u32,
    pub name: String,
    /// Newline-separated rows.
    pub grid: String,
    pub avatar_spawn: GridPos,
    #[serde(default)]
    pub agent_spawns: Vec<GridPos>,
    #[serde(default)]
    pub pickups: Vec<GridPos>,
    pub exit: GridPos,
    /// Target time in seconds. Only external scoring reads it.
    #[serde(default)]
    pub par: f32,
}

impl LevelData {
    fn rows(&self) -> impl Iterator<Item = &str> {
        self.grid.lines()
    }

    /// Caller-side checks: grid fits, and every declared position is inside it.
    pub fn validate(&self, width: usize, height: usize) -> Result<(), LevelError> {
        let grid_h = self.rows().count();
        let grid_w = self.rows().map(|r| r.chars().count()).max().unwrap_or(0);
        if grid_w > width || grid_h > height {
            return Err(LevelError::GridTooLarge { width: grid_w, height: grid_h });
        }

        let inside = |p: GridPos| p.x >= 0 && p.y >= 0 && (p.x as usize) < width && (p.y as usize) < height;
        let check = |what: &'static str, pos: GridPos| {
            if inside(pos) { Ok(()) } else { Err(LevelError::OutOfBounds { what, pos }) }
        };
        check("avatar spawn", self.avatar_spawn)?;
        check("exit", self.exit)?;
        for &pos in &self.agent_spawns {
            check("agent spawn", pos)?;
        }
        for &pos in &self.pickups {
            check("pickup", pos)?;
        }
        Ok(())
    }

    /// Decode the grid into tiles plus the `$` marker positions.
    pub fn decode(&self, width: usize, height: usize) -> (Vec<Vec<Tile>>, Vec<GridPos>) {
        let mut tiles = vec![vec![Tile::Empty; width]; height];
        let mut markers = vec![];
        for (y, row) in self.rows().take(height).enumerate() {
            for (x, ch) in row.chars().take(width).enumerate() {
                if ch == '$' {
                    markers.push(GridPos::new(x as i32, y as i32));
                }
                tiles[y][x] = Tile::from_char(ch);
            }
        }
        (tiles, markers)
    }

    pub fn build_terrain(&self, width: usize, height: usize) -> Terrain {
        let (tiles, markers) = self.decode(width, height);
        let pickups: BTreeSet<GridPos> = markers.into_iter().chain(self.pickups.iter().copied()).collect();
        Terrain::new(width, height, tiles, pickups, self.exit)
    }
}

// ══════════════════════════════════════════════════════════════
// Catalog
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug, Default)]
pub struct LevelCatalog {
    levels: BTreeMap<u32, LevelData>,
}

impl LevelCatalog {
    pub fn new() -> Self {
        LevelCatalog::default()
    }

    pub fn builtin() -> Self {
        LevelCatalog { levels: builtin_levels().into_iter().map(|l| (l.id, l)).collect() }
    }

    pub fn insert(&mut self, level: LevelData) -> Result<(), LevelError> {
        if self.levels.contains_key(&level.id) {
            return Err(LevelError::DuplicateId(level.id));
        }
        self.levels.insert(level.id, level);
        Ok(())
    }

    pub fn get(&self, id: u32) -> Option<&LevelData> {
        self.levels.get(&id)
    }

    /// Ids in ascending order.
    pub fn ids(&self) -> Vec<u32> {
        self.levels.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

// ══════════════════════════════════════════════════════════════
// Built-in levels
// ══════════════════════════════════════════════════════════════

fn builtin_levels() -> Vec<LevelData> {
    vec![
        make_builtin(1, "Groundwork", 60.0, &[
            "............................",
            "............................",
            "..E.......$.........$.......",
            "######H#############H#######",
            "......H.............H.......",
            "......H.........--------....",
            "......H$........H......H....",
            "####H####.......H......H####",
            "....H...........H......H....",
            "....H...$.......H...$..H....",
            "####H#######H###H###########",
            "............H...............",
            "............H...............",
            "............H...............",
            ".P..$.......H.........$.....",
            "XXXXXXXXXXXXXXXXXXXXXXXXXXXX",
        ]),
        make_builtin(2, "Sentry", 90.0, &[
            "............................",
            ".E.....................$....",
            "###H######H######H#######H##",
            "...H......H......H.......H..",
            "...H......H--------......H..",
            "...H..$...H.......H...$..H..",
            "#######H###.......H#########",
            ".......H..........H.........",
            ".......H..$.......H....A....",
            "..H#########XXX#########H...",
            "..H.....................H...",
            "..H--------.............H...",
            "..H.......H.............H...",
            "..H.......H.....#####...H...",
            ".P....$...H.....$.......H.A.",
            "XXXXXXXXXXXXXXXXXXXXXXXXXXXX",
        ]),
        make_builtin(3, "Crossfire", 120.0, &[
            "..............E.............",
            "..............H.............",
            "..$...........H..........$..",
            "####H#########H#########H###",
            "....H.........H.........H...",
            "....H..A......H......A..H...",
            "#########H####X####H########",
            ".........H.........H........",
            "..$......H---------H.....$..",
            "..#######H.........H#######.",
            "......H##########H#####H....",
            "......H..........H.....H....",
            "......H..$.......H..$..H....",
            "..H########...#########H....",
            "..H..P..................A...",
            "XXXXXXXXXXXXXXXXXXXXXXXXXXXX",
        ]),
    ]
}

/// Build a record from a marked-up map. 'P', 'A' and 'E' become the
/// avatar spawn, agent spawns (in reading order) and exit.
fn make_builtin(id: u32, name: &str, par: f32, map: &[&str]) -> LevelData {
    let mut avatar_spawn = GridPos::default();
    let mut agent_spawns = vec![];
    let mut exit = GridPos::default();
    for (y, row) in map.iter().enumerate() {
        for (x, ch) in row.chars().enumerate() {
            let pos = GridPos::new(x as i32, y as i32);
            match ch {
                'P' => avatar_spawn = pos,
                'A' => agent_spawns.push(pos),
                'E' => exit = pos,
                _ => {}
            }
        }
    }
    LevelData {
        id,
        name: name.to_string(),
        grid: map.join("\n"),
        avatar_spawn,
        agent_spawns,
        pickups: vec![],
        exit,
        par,
    }
}
