/// Agent navigation: when to replan, and how to walk a planned route.
///
/// Two independent pieces:
///   1. **Replanner**: time policy. Counts down between searches; a
///      search is due when the countdown runs out or there is nothing
///      left to follow.
///   2. **Route**: movement policy. Holds the waypoints from the last
///      search and moves a position toward the first one, per axis.
///
/// Neither touches terrain; the agent feeds one into the other.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::entity::{Facing, GridPos, Position};

/// Movement along an axis only happens when farther than this.
const AXIS_DEADZONE: f32 = 0.1;
/// A waypoint is reached when within this on both axes.
const ARRIVE_TOLERANCE: f32 = 0.2;

// ── Replanning ──

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Replanner {
    interval: f32,
    countdown: f32,
}

impl Replanner {
    /// A fresh replanner is due on its first check.
    pub fn new(interval: f32) -> Self {
        Replanner { interval, countdown: 0.0 }
    }

    /// Count down by `dt`. Returns true (and rearms) when a search is due.
    pub fn due(&mut self, dt: f32, route_empty: bool) -> bool {
        self.countdown -= dt;
        if self.countdown <= 0.0 || route_empty {
            self.countdown = self.interval;
            return true;
        }
        false
    }

    /// Make the next check due regardless of the countdown.
    pub fn reset(&mut self) {
        self.countdown = 0.0;
    }

    pub fn countdown(&self) -> f32 {
        self.countdown
    }
}

// ── Waypoint following ──

/// Outcome of one `Route::follow` call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stride {
    pub pos: Position,
    /// Set when the x axis moved.
    pub horizontal: Option<Facing>,
    /// True when the y axis moved.
    pub vertical: bool,
    /// True when the head waypoint was reached and popped.
    pub arrived: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    waypoints: VecDeque<GridPos>,
}

impl Route {
    pub fn replace(&mut self, path: Vec<GridPos>) {
        self.waypoints = path.into();
    }

    pub fn clear(&mut self) {
        self.waypoints.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn next(&self) -> Option<GridPos> {
        self.waypoints.front().copied()
    }

    pub fn waypoints(&self) -> Vec<GridPos> {
        self.waypoints.iter().copied().collect()
    }

    /// Move `pos` toward the head waypoint by at most `speed * dt` on each
    /// axis. `None` when the route is empty.
    pub fn follow(&mut self, pos: Position, speed: f32, dt: f32) -> Option<Stride> {
        let target = self.next()?.to_position();
        let step = speed * dt;
        let mut stride = Stride { pos, horizontal: None, vertical: false, arrived: false };

        let dx = target.x - pos.x;
        if dx.abs() > AXIS_DEADZONE {
            stride.pos.x += dx.signum() * step.min(dx.abs());
            stride.horizontal = Some(if dx > 0.0 { Facing::Right } else { Facing::Left });
        }
        let dy = target.y - pos.y;
        if dy.abs() > AXIS_DEADZONE {
            stride.pos.y += dy.signum() * step.min(dy.abs());
            stride.vertical = true;
        }

        if (stride.pos.x - target.x).abs() < ARRIVE_TOLERANCE
            && (stride.pos.y - target.y).abs() < ARRIVE_TOLERANCE
        {
            stride.pos = target;
            stride.arrived = true;
            self.waypoints.pop_front();
        }
        Some(stride)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: i32, y: i32) -> GridPos {
        GridPos::new(x, y)
    }

    #[test]
    fn replanner_due_first_then_on_interval() {
        let mut r = Replanner::new(0.5);
        assert!(r.due(0.0, false));
        assert!(!r.due(0.25, false));
        assert!(r.due(0.25, false));
        assert!(!r.due(0.125, false));
    }

    #[test]
    fn replanner_due_when_route_empty() {
        let mut r = Replanner::new(0.5);
        assert!(r.due(0.0, false));
        assert!(r.due(0.0, true));
        assert_eq!(r.countdown(), 0.5);
    }

    #[test]
    fn replanner_reset_forces_due() {
        let mut r = Replanner::new(0.5);
        r.due(0.0, false);
        r.reset();
        assert!(r.due(0.0, false));
    }

    #[test]
    fn empty_route_yields_nothing() {
        let mut route = Route::default();
        assert_eq!(route.follow(Position::new(0.0, 0.0), 3.0, 0.1), None);
    }

    #[test]
    fn steps_toward_waypoint_and_faces_it() {
        let mut route = Route::default();
        route.replace(vec![p(1, 0)]);
        let s = route.follow(Position::new(0.0, 0.0), 2.0, 0.25).unwrap();
        assert_eq!(s.pos, Position::new(0.5, 0.0));
        assert_eq!(s.horizontal, Some(Facing::Right));
        assert!(!s.vertical);
        assert!(!s.arrived);
        assert_eq!(route.len(), 1);
    }

    #[test]
    fn snaps_and_pops_within_tolerance() {
        let mut route = Route::default();
        route.replace(vec![p(1, 0), p(2, 0)]);
        let s = route.follow(Position::new(0.5, 0.0), 2.0, 0.2).unwrap();
        // 0.5 + 0.4 = 0.9, within 0.2 of 1.0
        assert!(s.arrived);
        assert_eq!(s.pos, Position::new(1.0, 0.0));
        assert_eq!(route.next(), Some(p(2, 0)));
    }

    #[test]
    fn never_overshoots() {
        let mut route = Route::default();
        route.replace(vec![p(0, 3)]);
        let s = route.follow(Position::new(0.0, 2.5), 10.0, 1.0).unwrap();
        assert_eq!(s.pos, Position::new(0.0, 3.0));
        assert!(s.vertical);
        assert_eq!(s.horizontal, None);
        assert!(route.is_empty());
    }

    #[test]
    fn moves_both_axes_independently() {
        let mut route = Route::default();
        route.replace(vec![p(0, 0)]);
        let s = route.follow(Position::new(1.0, 1.0), 2.0, 0.25).unwrap();
        assert_eq!(s.pos, Position::new(0.5, 0.5));
        assert_eq!(s.horizontal, Some(Facing::Left));
        assert!(s.vertical);
    }
}
