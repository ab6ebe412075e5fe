/// Test helper: build a `Terrain` from a string diagram.
/// Legend:  '#'=Brick  'X'=Stone  'H'=Ladder  '-'=Bar
///          '$'=pickup on Empty  'E'=exit on Empty  '.'/' '=Empty

use super::entity::GridPos;
use super::terrain::Terrain;
use super::tile::Tile;

pub fn map_from(rows: &[&str]) -> Terrain {
    let height = rows.len();
    let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    let mut tiles = vec![vec![Tile::Empty; width]; height];
    let mut pickups = vec![];
    let mut exit = GridPos::default();
    for (y, row) in rows.iter().enumerate() {
        for (x, ch) in row.chars().enumerate() {
            let pos = GridPos::new(x as i32, y as i32);
            match ch {
                '$' => pickups.push(pos),
                'E' => exit = pos,
                _ => {}
            }
            tiles[y][x] = Tile::from_char(ch);
        }
    }
    Terrain::new(width, height, tiles, pickups, exit)
}
