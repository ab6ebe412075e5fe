/// Hole lifecycle: timed holes, owned independently of terrain tiles.
///
/// A hole counts down from `timeout`. Once it has lived `warning`
/// seconds (remaining ≤ timeout − warning) the warning flag latches on.
/// When remaining reaches 0 the hole expires exactly once; the manager
/// drops it and reports the position so the caller can refill terrain.
///
/// The manager keeps at most one hole per cell, in creation order.

use std::collections::HashSet;

use super::entity::GridPos;

#[derive(Clone, Debug, PartialEq)]
pub struct Hole {
    pos: GridPos,
    remaining: f32,
    timeout: f32,
    warning_threshold: f32,
    warning: bool,
    expired: bool,
}

impl Hole {
    pub fn new(pos: GridPos, timeout: f32, warning_threshold: f32) -> Self {
        Hole {
            pos,
            remaining: timeout,
            timeout,
            warning_threshold,
            warning: false,
            expired: false,
        }
    }

    pub fn pos(&self) -> GridPos {
        self.pos
    }

    pub fn remaining(&self) -> f32 {
        self.remaining.max(0.0)
    }

    pub fn is_warning(&self) -> bool {
        self.warning
    }

    /// Advance by `dt`. Returns true only on the call that expires the hole.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.remaining -= dt;
        if !self.warning && self.remaining <= self.timeout - self.warning_threshold {
            self.warning = true;
        }
        if self.expired || self.remaining > 0.0 {
            return false;
        }
        self.expired = true;
        true
    }
}

#[derive(Clone, Debug)]
pub struct HoleManager {
    holes: Vec<Hole>,
    timeout: f32,
    warning_threshold: f32,
}

impl HoleManager {
    pub fn new(timeout: f32, warning_threshold: f32) -> Self {
        HoleManager { holes: vec![], timeout, warning_threshold }
    }

    /// Open a hole at `pos`. Ignored if one is already there.
    pub fn create(&mut self, pos: GridPos) {
        if self.contains(pos) {
            return;
        }
        self.holes.push(Hole::new(pos, self.timeout, self.warning_threshold));
    }

    /// Advance every live hole; returns the positions that expired this call.
    pub fn tick(&mut self, dt: f32) -> Vec<GridPos> {
        let mut filled = vec![];
        self.holes.retain_mut(|h| {
            if h.tick(dt) {
                filled.push(h.pos);
                false
            } else {
                true
            }
        });
        filled
    }

    pub fn get(&self, pos: GridPos) -> Option<&Hole> {
        self.holes.iter().find(|h| h.pos == pos)
    }

    pub fn contains(&self, pos: GridPos) -> bool {
        self.get(pos).is_some()
    }

    pub fn holes(&self) -> &[Hole] {
        &self.holes
    }

    pub fn positions(&self) -> Vec<GridPos> {
        self.holes.iter().map(|h| h.pos).collect()
    }

    /// Live positions as a set, for O(1) membership during search.
    pub fn position_set(&self) -> HashSet<GridPos> {
        self.holes.iter().map(|h| h.pos).collect()
    }

    pub fn len(&self) -> usize {
        self.holes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holes.is_empty()
    }

    pub fn clear(&mut self) {
        self.holes.clear();
    }
}
