/// Grid pathfinding: A* over terrain + live holes.
///
/// Stateless: every call searches from scratch against the current
/// terrain, so holes opening and closing never leave a stale graph.
///
/// ## Neighbour rules
///
/// Any candidate cell that holds a live hole is skipped outright.
///
///   - Horizontal ±1: (here is Ladder/Bar OR dest is Empty/Ladder/Bar/pickup)
///     AND (dest is Bar/Ladder OR dest has support).
///   - On a Ladder: up into Ladder/Empty/Bar/pickup, down into
///     Ladder/Empty/pickup.
///   - A Ladder directly above can always be grabbed.
///   - On a Bar: drop down unless the cell below is Brick/Stone.
///
/// ## Ordering
///
/// Unit step cost, Manhattan heuristic. The open set is a min-heap keyed
/// on (f, h, discovery order), so equal-f ties go to the node closer to the
/// goal and then to whichever was discovered first. Results are therefore
/// reproducible regardless of hash iteration order.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use super::entity::GridPos;
use super::terrain::Terrain;
use super::tile::Tile;

/// Manhattan distance. Admissible for 4-way unit moves.
pub fn heuristic(a: GridPos, b: GridPos) -> u32 {
    a.x.abs_diff(b.x) + a.y.abs_diff(b.y)
}

/// Cells reachable in one step from `pos`.
pub fn neighbors(pos: GridPos, terrain: &Terrain, holes: &HashSet<GridPos>) -> Vec<GridPos> {
    let mut out: Vec<GridPos> = Vec::with_capacity(4);
    let mut push = |p: GridPos| {
        if !holes.contains(&p) && !out.contains(&p) {
            out.push(p);
        }
    };

    let here = terrain.tile_at(pos);
    let open_cell = |p: GridPos| {
        matches!(terrain.tile_at(p), Tile::Empty | Tile::Ladder | Tile::Bar) || terrain.has_pickup(p)
    };

    // Horizontal
    for dx in [-1, 1] {
        let next = pos.offset(dx, 0);
        if next.x < 0 || next.x as usize >= terrain.width() {
            continue;
        }
        let dest = terrain.tile_at(next);
        let may_leave = here.is_climbable() || here.is_hangable() || open_cell(next);
        let held = dest.is_hangable() || dest.is_climbable() || terrain.has_support(next);
        if may_leave && held {
            push(next);
        }
    }

    // Climbing a ladder
    if here.is_climbable() {
        let up = pos.above();
        if pos.y > 0 && open_cell(up) {
            push(up);
        }
        let down = pos.below();
        let below = terrain.tile_at(down);
        if (pos.y as usize) + 1 < terrain.height()
            && (matches!(below, Tile::Empty | Tile::Ladder) || terrain.has_pickup(down))
        {
            push(down);
        }
    }

    // Grab a ladder overhead
    if pos.y > 0 && terrain.is_climbable(pos.above()) {
        push(pos.above());
    }

    // Let go of a bar
    if here.is_hangable() && (pos.y as usize) + 1 < terrain.height() {
        let down = pos.below();
        if !terrain.tile_at(down).is_solid() {
            push(down);
        }
    }

    out
}

/// Shortest path from `start` to `goal`, start-exclusive and goal-inclusive.
/// Empty when `start == goal` or the goal cannot be reached.
pub fn find_path(
    start: GridPos,
    goal: GridPos,
    terrain: &Terrain,
    holes: &HashSet<GridPos>,
) -> Vec<GridPos> {
    if start == goal || !terrain.in_bounds(start) || !terrain.in_bounds(goal) {
        return vec![];
    }

    // (f, h, discovery seq, pos)
    let mut open: BinaryHeap<Reverse<(u32, u32, u64, GridPos)>> = BinaryHeap::new();
    let mut g_score: HashMap<GridPos, u32> = HashMap::new();
    let mut discovered: HashMap<GridPos, u64> = HashMap::new();
    let mut parent: HashMap<GridPos, GridPos> = HashMap::new();
    let mut closed: HashSet<GridPos> = HashSet::new();
    let mut seq: u64 = 0;

    let h0 = heuristic(start, goal);
    g_score.insert(start, 0);
    discovered.insert(start, seq);
    open.push(Reverse((h0, h0, seq, start)));

    while let Some(Reverse((_, _, _, current))) = open.pop() {
        if !closed.insert(current) {
            continue; // stale heap entry
        }
        if current == goal {
            return reconstruct(&parent, start, goal);
        }

        let g = g_score[&current];
        for next in neighbors(current, terrain, holes) {
            if closed.contains(&next) {
                continue;
            }
            let tentative = g + 1;
            if g_score.get(&next).is_some_and(|&known| known <= tentative) {
                continue;
            }
            g_score.insert(next, tentative);
            parent.insert(next, current);
            let order = *discovered.entry(next).or_insert_with(|| {
                seq += 1;
                seq
            });
            let h = heuristic(next, goal);
            open.push(Reverse((tentative + h, h, order, next)));
        }
    }

    vec![]
}

fn reconstruct(parent: &HashMap<GridPos, GridPos>, start: GridPos, goal: GridPos) -> Vec<GridPos> {
    let mut path = vec![goal];
    let mut cur = goal;
    while let Some(&prev) = parent.get(&cur) {
        if prev == start {
            break;
        }
        path.push(prev);
        cur = prev;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::testutil::map_from;

    fn p(x: i32, y: i32) -> GridPos {
        GridPos::new(x, y)
    }

    fn no_holes() -> HashSet<GridPos> {
        HashSet::new()
    }

    // ── heuristic ──

    #[test]
    fn heuristic_symmetric_and_zero_on_self() {
        let pts = [p(0, 0), p(3, 7), p(-2, 5), p(27, 15), p(10, 0)];
        for &a in &pts {
            assert_eq!(heuristic(a, a), 0);
            for &b in &pts {
                assert_eq!(heuristic(a, b), heuristic(b, a));
            }
        }
        assert_eq!(heuristic(p(0, 0), p(3, 4)), 7);
    }

    // ── neighbours ──

    #[test]
    fn walk_along_floor() {
        let t = map_from(&[
            "...",
            "###",
        ]);
        assert_eq!(neighbors(p(1, 0), &t, &no_holes()), vec![p(0, 0), p(2, 0)]);
    }

    #[test]
    fn no_walking_into_air() {
        let t = map_from(&[
            "...",
            "##.",
        ]);
        // (2,0) has nothing under it
        assert_eq!(neighbors(p(1, 0), &t, &no_holes()), vec![p(0, 0)]);
    }

    #[test]
    fn walk_onto_bar_over_air() {
        let t = map_from(&[
            ".-",
            "#.",
            "##",
        ]);
        assert_eq!(neighbors(p(0, 0), &t, &no_holes()), vec![p(1, 0)]);
    }

    #[test]
    fn ladder_up_and_down() {
        let t = map_from(&[
            ".",
            "H",
            "H",
            ".",
            "#",
        ]);
        let n = neighbors(p(0, 1), &t, &no_holes());
        assert!(n.contains(&p(0, 0)));
        assert!(n.contains(&p(0, 2)));
        // bottom rung: down into empty air is allowed
        assert!(neighbors(p(0, 2), &t, &no_holes()).contains(&p(0, 3)));
    }

    #[test]
    fn ladder_down_blocked_by_brick() {
        let t = map_from(&[
            "H",
            "#",
        ]);
        assert!(neighbors(p(0, 0), &t, &no_holes()).is_empty());
    }

    #[test]
    fn grab_ladder_overhead_from_air() {
        let t = map_from(&[
            "H.",
            "..",
            "##",
        ]);
        assert!(neighbors(p(0, 1), &t, &no_holes()).contains(&p(0, 0)));
    }

    #[test]
    fn drop_from_bar() {
        let t = map_from(&[
            "-",
            ".",
            "#",
        ]);
        assert_eq!(neighbors(p(0, 0), &t, &no_holes()), vec![p(0, 1)]);

        let blocked = map_from(&[
            "-",
            "X",
        ]);
        assert!(neighbors(p(0, 0), &blocked, &no_holes()).is_empty());
    }

    #[test]
    fn holes_are_never_neighbours() {
        let t = map_from(&[
            "...",
            "###",
        ]);
        let holes: HashSet<GridPos> = [p(2, 0)].into_iter().collect();
        assert_eq!(neighbors(p(1, 0), &t, &holes), vec![p(0, 0)]);
    }

    #[test]
    fn pickup_cell_is_open() {
        let t = map_from(&[
            ".$",
            "##",
        ]);
        assert_eq!(neighbors(p(0, 0), &t, &no_holes()), vec![p(1, 0)]);
    }

    // ── find_path ──

    #[test]
    fn path_to_self_is_empty() {
        let t = map_from(&[
            "...",
            "###",
        ]);
        assert!(find_path(p(1, 0), p(1, 0), &t, &no_holes()).is_empty());
    }

    #[test]
    fn straight_corridor() {
        let t = map_from(&[
            ".....",
            "#####",
        ]);
        assert_eq!(
            find_path(p(0, 0), p(4, 0), &t, &no_holes()),
            vec![p(1, 0), p(2, 0), p(3, 0), p(4, 0)]
        );
    }

    #[test]
    fn climbs_ladder_to_upper_floor() {
        let t = map_from(&[
            "...H",
            "###H",
            "....",
            "####",
        ]);
        let path = find_path(p(0, 2), p(0, 0), &t, &no_holes());
        assert_eq!(
            path,
            vec![p(1, 2), p(2, 2), p(3, 2), p(3, 1), p(3, 0), p(2, 0), p(1, 0), p(0, 0)]
        );
    }

    #[test]
    fn enclosed_goal_unreachable() {
        let t = map_from(&[
            "..XXX",
            "..X.X",
            "..XXX",
            "#####",
        ]);
        assert!(find_path(p(0, 2), p(3, 1), &t, &no_holes()).is_empty());
    }

    #[test]
    fn out_of_bounds_goal_unreachable() {
        let t = map_from(&[
            "...",
            "###",
        ]);
        assert!(find_path(p(0, 0), p(9, 0), &t, &no_holes()).is_empty());
    }

    #[test]
    fn path_avoids_live_holes_and_ends_at_goal() {
        let t = map_from(&[
            "H.....",
            "H.....",
            "H#####",
            "......",
            "######",
        ]);
        // Direct route along row 3 is cut by a hole at (3,3)
        let holes: HashSet<GridPos> = [p(3, 3)].into_iter().collect();
        let direct = find_path(p(5, 3), p(0, 3), &t, &no_holes());
        assert_eq!(direct.last(), Some(&p(0, 3)));

        let path = find_path(p(5, 3), p(0, 3), &t, &holes);
        assert!(path.is_empty() || !path.iter().any(|c| holes.contains(c)));
        if let Some(last) = path.last() {
            assert_eq!(*last, p(0, 3));
        }
    }

    #[test]
    fn hole_reroutes_over_the_top() {
        let t = map_from(&[
            "H...H",
            "H###H",
            "H...H",
            "#####",
        ]);
        let holes: HashSet<GridPos> = [p(2, 2)].into_iter().collect();
        let path = find_path(p(1, 2), p(3, 2), &t, &holes);
        assert!(!path.is_empty());
        assert!(!path.contains(&p(2, 2)));
        assert_eq!(path.last(), Some(&p(3, 2)));
        // goes out via the left ladder, across the top, down the right
        assert!(path.contains(&p(2, 0)));
    }

    #[test]
    fn equal_cost_routes_resolve_the_same_way_every_time() {
        let t = map_from(&[
            "H...H",
            "H...H",
            "H...H",
            "#####",
        ]);
        let first = find_path(p(0, 2), p(4, 0), &t, &no_holes());
        for _ in 0..10 {
            assert_eq!(find_path(p(0, 2), p(4, 0), &t, &no_holes()), first);
        }
        assert_eq!(first.len(), 6);
        assert_eq!(first.last(), Some(&p(4, 0)));
    }
}
