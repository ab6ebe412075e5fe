/// Keyboard state tracker.
///
/// Tracks which keys are currently held down, enabling:
///   - Continuous movement while a key is held
///   - Edge-triggered dig, pause and restart (fire on the initial press only)
///
/// Terminals that report key Release events get exact hold tracking.
/// Everywhere else a key counts as released once no Press/Repeat has
/// arrived for `HOLD_TIMEOUT`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use digger::domain::entity::Direction;

/// After this long without a Press/Repeat, a key is considered released.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

// ── Key bindings ──

const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
const KEYS_DIG_L: &[KeyCode] = &[KeyCode::Char('q'), KeyCode::Char('z'), KeyCode::Char('Z')];
const KEYS_DIG_R: &[KeyCode] = &[KeyCode::Char('e'), KeyCode::Char('E'), KeyCode::Char('x'), KeyCode::Char('X')];
const KEYS_PAUSE: &[KeyCode] = &[KeyCode::Char('p'), KeyCode::Char('P'), KeyCode::F(1)];
const KEYS_RESTART: &[KeyCode] = &[KeyCode::Char('r'), KeyCode::Char('R')];
const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter, KeyCode::Char(' ')];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Char('Q')];

pub struct InputState {
    /// Timestamp of the last Press/Repeat for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that went from "not held" to "held" during the most recent
    /// `drain_events` call.
    fresh_presses: Vec<KeyCode>,

    /// Raw key events from the most recent drain, for Ctrl combinations.
    raw_events: Vec<KeyEvent>,

    /// Honor Release events. Only set once keyboard enhancement is
    /// confirmed.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Read every pending terminal event without blocking. Call once per
    /// frame, before the simulation runs.
    pub fn drain_events(&mut self) {
        self.begin_frame();

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.record(key, Instant::now());
            }
        }

        self.expire(Instant::now());
    }

    // ── Bindings ──

    /// Movement direction from held keys. Horizontal wins over vertical,
    /// and opposing keys cancel.
    pub fn held_direction(&self) -> Option<Direction> {
        let left = self.any_held(KEYS_LEFT);
        let right = self.any_held(KEYS_RIGHT);
        let up = self.any_held(KEYS_UP);
        let down = self.any_held(KEYS_DOWN);
        match (left, right, up, down) {
            (true, false, _, _) => Some(Direction::Left),
            (false, true, _, _) => Some(Direction::Right),
            (_, _, true, false) => Some(Direction::Up),
            (_, _, false, true) => Some(Direction::Down),
            _ => None,
        }
    }

    pub fn dig_pressed(&self) -> Option<Direction> {
        if self.any_pressed(KEYS_DIG_L) {
            Some(Direction::Left)
        } else if self.any_pressed(KEYS_DIG_R) {
            Some(Direction::Right)
        } else {
            None
        }
    }

    pub fn pause_pressed(&self) -> bool {
        self.any_pressed(KEYS_PAUSE)
    }

    pub fn restart_pressed(&self) -> bool {
        self.any_pressed(KEYS_RESTART)
    }

    pub fn confirm_pressed(&self) -> bool {
        self.any_pressed(KEYS_CONFIRM)
    }

    pub fn escape_pressed(&self) -> bool {
        self.any_pressed(&[KeyCode::Esc])
    }

    /// Ctrl+C or Shift+Q.
    pub fn quit_pressed(&self) -> bool {
        let ctrl_c = self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && matches!(k.code, KeyCode::Char('c') | KeyCode::Char('C'))
        });
        ctrl_c || self.any_pressed(KEYS_QUIT)
    }

    // ── Internal ──

    fn begin_frame(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();
    }

    fn record(&mut self, key: KeyEvent, now: Instant) {
        self.raw_events.push(key);
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            // Without enhancement, releases are unreliable; the timeout
            // handles them.
            KeyEventKind::Release => {}
            _ => {
                let was_held = self.is_held_at(key.code, now);
                self.last_active.insert(key.code, now);
                if !was_held {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    fn expire(&mut self, now: Instant) {
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.last_active.contains_key(c))
    }

    fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.fresh_presses.contains(c))
    }

    fn is_held_at(&self, code: KeyCode, now: Instant) -> bool {
        self.last_active
            .get(&code)
            .map(|t| now.duration_since(*t) < HOLD_TIMEOUT)
            .unwrap_or(false)
    }
}
